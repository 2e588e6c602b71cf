// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{Event, EventBus, EventKind, EventKindType};
use core::panic;
use tokio::time::timeout;

/// Sends a quit signal to a running module and waits for it to stop
/// gracefully.
///
/// Publishes a [`QuitEvent`](EventKind::QuitEvent) through the given
/// [`EventBus`] and waits for the module's task to finish within a fixed
/// timeout.
///
/// # Panics
/// Panics if the module does not stop within the timeout or if the task
/// returns an error.
pub async fn stop_module(
    event_bus: &EventBus,
    handle: &mut tokio::task::JoinHandle<Result<(), ()>>,
) {
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    let _ = timeout(std::time::Duration::from_millis(100), handle)
        .await
        .expect("Module doesn't handle quit event in timeout")
        .unwrap();
}

/// Waits asynchronously for a specific type of [`Event`] to be received on
/// a [`tokio::sync::broadcast::Receiver`] within a given duration.
///
/// Only the variant type is compared; payload data is ignored. Events of
/// other kinds received while waiting are skipped.
///
/// # Panics
/// Panics if no matching event is received within `duration`.
pub async fn wait_for_event(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    duration: std::time::Duration,
    exp_event: EventKindType,
) -> Event {
    let steps = duration.as_millis() / 10;
    let step_duration = duration / 10;
    for _ in 0..steps {
        if let Ok(Ok(event)) = timeout(step_duration, rx.recv()).await
            && EventKindType::from(&event.kind) == exp_event
        {
            return event;
        }
    }
    panic!("Failed to receive event of type {:?}", exp_event);
}

/// Asserts that no event of the given type arrives within `duration`.
///
/// # Panics
/// Panics when a matching event shows up.
pub async fn expect_no_event(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    duration: std::time::Duration,
    event: EventKindType,
) {
    let steps = duration.as_millis() / 10;
    let step_duration = duration / 10;
    for _ in 0..steps {
        if let Ok(Ok(received)) = timeout(step_duration, rx.recv()).await
            && EventKindType::from(&received.kind) == event
        {
            panic!("Received unexpected event of type {:?}", event);
        }
    }
}
