// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::test_helper::track::{
    get_assen_track, get_oschersleben_track, get_oschersleben_track_without_startline,
};
use module_core::async_result::AsyncState;
use module_core::test_helper::{expect_no_event, wait_for_event};
use module_core::{EventBus, EventKind, EventKindType};
use std::time::Duration;
use storage::TrackDatabase;

mod helper;
use helper::setup_database;

const TIMEOUT: Duration = Duration::from_millis(500);

#[test_log::test(tokio::test)]
pub async fn save_and_read_back_a_track() {
    let (cache, db_file) = setup_database("save_and_read_back_a_track").await;
    let event_bus = EventBus::default();
    let database = TrackDatabase::new(&cache, &db_file, event_bus.context())
        .await
        .unwrap();

    let track = get_oschersleben_track();
    let result = database.save_track(&track);
    assert_eq!(result.wait_for_finished().await, AsyncState::Ok);

    assert_eq!(database.get_track_count(), 1);
    let tracks = database.get_tracks().await.unwrap();
    assert_eq!(tracks, vec![track]);
}

#[test_log::test(tokio::test)]
pub async fn track_without_startline_reads_back_unset() {
    let (cache, db_file) = setup_database("track_without_startline_reads_back_unset").await;
    let event_bus = EventBus::default();
    let database = TrackDatabase::new(&cache, &db_file, event_bus.context())
        .await
        .unwrap();

    let track = get_oschersleben_track_without_startline();
    database.save_track(&track).wait_for_finished().await;

    let tracks = database.get_tracks().await.unwrap();
    assert_eq!(tracks, vec![track]);
    assert!(!tracks[0].has_startline());
}

#[test_log::test(tokio::test)]
pub async fn count_and_read_tracks_on_worker_tasks() {
    let (cache, db_file) = setup_database("count_and_read_tracks_on_worker_tasks").await;
    let event_bus = EventBus::default();
    let database = TrackDatabase::new(&cache, &db_file, event_bus.context())
        .await
        .unwrap();

    for track in [&get_oschersleben_track(), &get_assen_track()] {
        database.save_track(track).wait_for_finished().await;
    }

    let count_result = database.get_track_count_async();
    assert_eq!(count_result.wait_for_finished().await, AsyncState::Ok);
    assert_eq!(count_result.value(), Some(2));

    let tracks_result = database.get_tracks_async();
    assert_eq!(tracks_result.wait_for_finished().await, AsyncState::Ok);
    let tracks = tracks_result.value().expect("missing tracks value");
    assert_eq!(tracks, vec![get_oschersleben_track(), get_assen_track()]);
}

#[test_log::test(tokio::test)]
pub async fn track_added_fires_on_every_handle_of_the_file() {
    let (cache, db_file) = setup_database("track_added_fires_on_every_handle").await;
    let event_bus1 = EventBus::default();
    let event_bus2 = EventBus::default();
    let mut receiver1 = event_bus1.subscribe();
    let mut receiver2 = event_bus2.subscribe();
    let _database1 = TrackDatabase::new(&cache, &db_file, event_bus1.context())
        .await
        .unwrap();
    let database2 = TrackDatabase::new(&cache, &db_file, event_bus2.context())
        .await
        .unwrap();

    database2
        .save_track(&get_oschersleben_track())
        .wait_for_finished()
        .await;

    for receiver in [&mut receiver1, &mut receiver2] {
        let added = wait_for_event(receiver, TIMEOUT, EventKindType::TrackAddedEvent).await;
        assert!(matches!(added.kind, EventKind::TrackAddedEvent(0)));
        expect_no_event(receiver, TIMEOUT, EventKindType::TrackAddedEvent).await;
    }
}

#[test_log::test(tokio::test)]
pub async fn delete_a_track_by_index() {
    let (cache, db_file) = setup_database("delete_a_track_by_index").await;
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let database = TrackDatabase::new(&cache, &db_file, event_bus.context())
        .await
        .unwrap();

    database
        .save_track(&get_oschersleben_track())
        .wait_for_finished()
        .await;
    database
        .save_track(&get_assen_track())
        .wait_for_finished()
        .await;

    database.delete_track(0).await.unwrap();
    assert_eq!(database.get_track_count(), 1);
    let tracks = database.get_tracks().await.unwrap();
    assert_eq!(tracks, vec![get_assen_track()]);

    let deleted = wait_for_event(&mut receiver, TIMEOUT, EventKindType::TrackDeletedEvent).await;
    assert!(matches!(deleted.kind, EventKind::TrackDeletedEvent(0)));
}

#[test_log::test(tokio::test)]
pub async fn deleting_an_unknown_track_reports_not_found() {
    let (cache, db_file) = setup_database("deleting_an_unknown_track").await;
    let event_bus = EventBus::default();
    let database = TrackDatabase::new(&cache, &db_file, event_bus.context())
        .await
        .unwrap();
    assert!(matches!(
        database.delete_track(3).await,
        Err(storage::StorageError::NotFound)
    ));
}

#[test_log::test(tokio::test)]
pub async fn cascading_track_delete_announces_the_sessions() {
    let (cache, db_file) = setup_database("cascading_track_delete").await;
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let track_db = TrackDatabase::new(&cache, &db_file, event_bus.context())
        .await
        .unwrap();
    let session_db = storage::SessionDatabase::new(&cache, &db_file, event_bus.context())
        .await
        .unwrap();

    track_db
        .save_track(&get_oschersleben_track())
        .wait_for_finished()
        .await;
    session_db
        .store_session(&common::test_helper::session::get_session())
        .wait_for_finished()
        .await;
    assert_eq!(session_db.get_session_count(), 1);

    // removing the track takes its sessions with it
    track_db.delete_track(0).await.unwrap();
    assert_eq!(session_db.get_session_count(), 0);
    let deleted = wait_for_event(&mut receiver, TIMEOUT, EventKindType::SessionDeletedEvent).await;
    assert!(matches!(deleted.kind, EventKind::SessionDeletedEvent(0)));
}

#[test_log::test(tokio::test)]
pub async fn delete_all_tracks_empties_the_store() {
    let (cache, db_file) = setup_database("delete_all_tracks_empties_the_store").await;
    let event_bus = EventBus::default();
    let database = TrackDatabase::new(&cache, &db_file, event_bus.context())
        .await
        .unwrap();

    database
        .save_track(&get_oschersleben_track())
        .wait_for_finished()
        .await;
    database
        .save_track(&get_assen_track())
        .wait_for_finished()
        .await;

    database.delete_all_tracks().await.unwrap();
    assert_eq!(database.get_track_count(), 0);
    assert!(database.get_tracks().await.unwrap().is_empty());
}
