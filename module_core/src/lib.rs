// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Core module substrate of the engine.
//!
//! Provides the [`EventBus`] every module communicates over, the
//! [`Module`] trait for the per-module run loops, the one-shot
//! [`async_result::AsyncResult`] cells used by the asynchronous storage
//! and REST operations, and a small [`timer::Timer`].

use common::{position::GpsFix, timestamp::Timestamp, track::TrackData};
use std::sync::{
    Arc,
    atomic::{self, AtomicUsize},
};
use strum_macros::EnumDiscriminants;
use tracing::info;

pub mod async_result;
pub mod test_helper;
pub mod timer;

/// Represents a high-level event in the system.
///
/// Each `Event` wraps an [`EventKind`], which defines the actual type
/// and data carried by the event. Events are passed through an
/// [`EventBus`] between asynchronous modules.
#[derive(Clone, Debug)]
pub struct Event {
    /// The inner event type and associated data.
    pub kind: EventKind,
}

impl Event {
    /// Returns the high-level type of this event.
    ///
    /// Useful for grouping or filtering events by category without
    /// looking at the payload.
    pub fn event_type(&self) -> EventKindType {
        EventKindType::from(&self.kind)
    }
}

/// A thread-safe, reference-counted pointer to a [`GpsFix`].
///
/// GPS fixes are published at a high rate; sharing them avoids one copy
/// per subscriber.
pub type GpsFixPtr = Arc<GpsFix>;

/// A thread-safe, shared pointer to a [`Timestamp`] payload.
pub type TimestampPtr = Arc<Timestamp>;

/// A thread-safe, shared pointer to a [`TrackData`] payload.
pub type TrackDataPtr = Arc<TrackData>;

/// A thread-safe, shared pointer to a download completion payload.
pub type DownloadFinishedPtr = Arc<DownloadFinished>;

/// Outcome of a REST download operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadResult {
    Ok,
    Error,
}

/// Completion payload of a per-index session or metadata download.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadFinished {
    /// The session index the download was started for.
    pub index: usize,
    /// The outcome of the download.
    pub result: DownloadResult,
}

/// Generic helper macro to extract enum payloads
#[macro_export]
macro_rules! payload_ref {
    ($enum_val:expr, $pattern:path) => {
        if let $pattern(ref payload) = $enum_val {
            Some(payload)
        } else {
            None
        }
    };
}

/// Enumerates the different kinds of events that can be emitted
/// and transmitted via the [`EventBus`].
#[derive(Clone, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(Hash))]
#[strum_discriminants(name(EventKindType))]
pub enum EventKind {
    /// Indicates that a module shall terminate.
    QuitEvent,

    /// A GPS position update.
    ///
    /// This event carries the full fix, so subscribers have the
    /// position, time of day, date and velocity of the sample.
    GpsFixEvent(GpsFixPtr),

    /// Indicates that a new lap has started.
    LapStartedEvent,

    /// Indicates that a sector has been completed.
    /// Carries the finished sector's time.
    SectorFinishedEvent(TimestampPtr),

    /// Indicates that a lap has finished.
    /// Carries the finished lap's time.
    LapFinishedEvent(TimestampPtr),

    /// Live value of the running lap clock.
    CurrentLaptimeEvent(TimestampPtr),

    /// Live value of the running sector clock.
    CurrentSectorTimeEvent(TimestampPtr),

    /// Requests that track detection starts classifying incoming fixes.
    TrackDetectionStartEvent,

    /// Requests that track detection stops classifying incoming fixes.
    TrackDetectionStopEvent,

    /// Emitted when a candidate track matches the current position.
    /// Carries the detected track.
    TrackDetectedEvent(TrackDataPtr),

    /// Requests that the active-session workflow starts a session.
    ActiveSessionStartEvent,

    /// Requests that the active-session workflow stops the session.
    ActiveSessionStopEvent,

    /// A session row appeared in the store. Carries the session index.
    SessionAddedEvent(usize),

    /// Laps were appended to a stored session. Carries the session index.
    SessionUpdatedEvent(usize),

    /// A session row left the store. Carries the index the session had.
    SessionDeletedEvent(usize),

    /// A track appeared in the track store. Carries the track index.
    TrackAddedEvent(usize),

    /// A track left the track store. Carries the index the track had.
    TrackDeletedEvent(usize),

    /// The REST workflow finished fetching the session count.
    SessionCountFetchedEvent(DownloadResult),

    /// The REST workflow finished downloading one session.
    SessionDownloadFinishedEvent(DownloadFinishedPtr),

    /// The REST workflow finished downloading one session's metadata.
    SessionMetadataDownloadFinishedEvent(DownloadFinishedPtr),
}

/// A simple asynchronous event bus for publishing and subscribing to [`Event`]s.
///
/// The event bus uses a [`tokio::sync::broadcast::channel`] under the hood,
/// allowing multiple receivers to listen for the same stream of events.
///
/// Each published event is cloned and distributed to all active subscribers.
/// If no subscribers exist at the time of publication, the event is discarded
/// silently. Events published from one task arrive at every subscriber in
/// publication order.
pub struct EventBus {
    id: usize,
    /// The broadcast sender used internally to distribute events.
    sender: tokio::sync::broadcast::Sender<Event>,
}

/// Global counter used to assign unique, monotonically increasing IDs to bus
/// instances.
static BUS_ID: AtomicUsize = AtomicUsize::new(0);

impl EventBus {
    /// Creates a new [`EventBus`] with a fixed buffer capacity of 100 messages.
    ///
    /// When the buffer is full, the oldest messages are dropped automatically
    /// as new ones are published.
    pub fn new() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(100);
        let id = BUS_ID.fetch_add(1, atomic::Ordering::Relaxed);
        info!("Creating EventBus with id {}", id);
        EventBus { id, sender }
    }

    /// Subscribes to the event bus and returns a [`tokio::sync::broadcast::Receiver`].
    ///
    /// The returned receiver will receive all future events published after the
    /// subscription is created.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publishes an [`Event`] to all active subscribers.
    ///
    /// This method clones the event and attempts to send it to each receiver.
    /// If no subscribers exist, the event is discarded silently.
    pub fn publish(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }

    /// Creates a [`ModuleCtx`] bound to this [`EventBus`].
    ///
    /// The returned context can be used by modules implementing [`Module`]
    /// to send and receive events within their execution scope.
    pub fn context(&self) -> ModuleCtx {
        ModuleCtx::new(self)
    }

    /// Returns the numeric identifier for this event bus.
    pub fn id(&self) -> usize {
        self.id
    }
}

/// Provides a default instance of [`EventBus`].
impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Defines the common interface for an asynchronous module
/// that can be executed and communicate via the [`EventBus`].
#[async_trait::async_trait]
pub trait Module {
    /// Runs the module asynchronously until completion.
    ///
    /// This function typically contains the module's main event loop,
    /// reacting to messages received through the [`ModuleCtx`].
    async fn run(&mut self) -> Result<(), ()>;
}

/// Provides a module-scoped context for interacting with the [`EventBus`].
///
/// Each `ModuleCtx` owns both a sender and a receiver, allowing the module
/// to both publish and listen for events concurrently.
#[derive(Debug)]
pub struct ModuleCtx {
    /// Unique identifier of the event bus that this context belongs to.
    id: usize,

    /// The broadcast sender used to publish events.
    pub sender: tokio::sync::broadcast::Sender<Event>,

    /// The broadcast receiver used to listen for events.
    pub receiver: tokio::sync::broadcast::Receiver<Event>,
}

#[derive(Debug)]
pub enum ModuleCtxError {
    PublishError(String),
}

impl ModuleCtx {
    pub(crate) fn new(event_bus: &EventBus) -> Self {
        ModuleCtx {
            id: event_bus.id(),
            sender: event_bus.sender.clone(),
            receiver: event_bus.subscribe(),
        }
    }

    /// Publishes an event kind on the bus of this context.
    pub fn publish_event(&self, event: EventKind) -> Result<(), ModuleCtxError> {
        self.sender
            .send(Event { kind: event })
            .map(|_| ())
            .map_err(|e| ModuleCtxError::PublishError(format!("Failed to publish event: {}", e)))
    }

    /// Returns a new broadcast receiver subscribed to this event bus.
    ///
    /// This creates an independent subscription using `resubscribe()`. The
    /// returned receiver:
    /// - Only receives events published after this call (no replay).
    /// - Does not affect other receivers or advance any internal cursor.
    /// - May yield `tokio::sync::broadcast::error::RecvError::Lagged(_)`
    ///   if the consumer falls behind.
    pub fn receiver(&mut self) -> tokio::sync::broadcast::Receiver<Event> {
        self.receiver.resubscribe()
    }

    /// Returns the unique identifier of the event bus that this module context
    /// belongs to. The ID is stable for the lifetime of the context and can be
    /// used for logging.
    pub fn bus_id(&self) -> usize {
        self.id
    }
}

impl Clone for ModuleCtx {
    fn clone(&self) -> Self {
        ModuleCtx {
            id: self.id,
            sender: self.sender.clone(),
            receiver: self.receiver.resubscribe(),
        }
    }
}
