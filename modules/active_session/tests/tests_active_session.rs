// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use active_session::ActiveSessionWorkflow;
use common::position::GpsFix;
use common::test_helper::{positions::*, track::get_oschersleben_track};
use common::timestamp::Timestamp;
use laptimer::SimpleLaptimer;
use module_core::test_helper::wait_for_event;
use module_core::{EventBus, EventKind, EventKindType, Module};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storage::{ConnectionCache, SessionDatabase};

const TIMEOUT: Duration = Duration::from_millis(500);

async fn setup_database(test_name: &str) -> (ConnectionCache, PathBuf) {
    let db_file = std::env::temp_dir().join(format!("rapid_active_{test_name}.db"));
    for suffix in ["", "-wal", "-shm"] {
        let mut file = db_file.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
    let cache = ConnectionCache::new();
    let connection = cache.connection(&db_file).await.unwrap();
    storage::run_migrations(connection.pool()).await.unwrap();
    (cache, db_file)
}

fn initial_fix() -> GpsFix {
    GpsFix::new(
        get_oschersleben_camp_position(),
        "13:00:00.000".parse().unwrap(),
        "01.01.1970".parse().unwrap(),
        common::velocity::Velocity::from_kmh(0.0),
    )
}

fn lap_fixes() -> Vec<GpsFix> {
    let mut fixes = Vec::new();
    fixes.extend(quartet_as_fixes(
        get_finishline_quartet(),
        "15:05:10.234".parse().unwrap(),
    ));
    fixes.extend(quartet_as_fixes(
        get_sector1_quartet(),
        "15:06:10.234".parse().unwrap(),
    ));
    fixes.extend(quartet_as_fixes(
        get_sector2_quartet(),
        "15:07:10.234".parse().unwrap(),
    ));
    fixes.extend(quartet_as_fixes(
        get_finishline_quartet(),
        "15:08:10.234".parse().unwrap(),
    ));
    fixes
}

#[test_log::test(tokio::test)]
pub async fn one_lap_ends_up_in_the_store() {
    let (cache, db_file) = setup_database("one_lap_ends_up_in_the_store").await;
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let database = Arc::new(
        SessionDatabase::new(&cache, &db_file, event_bus.context())
            .await
            .unwrap(),
    );
    let mut workflow = ActiveSessionWorkflow::new(
        event_bus.context(),
        SimpleLaptimer::new(event_bus.context()),
        database.clone(),
    );
    let state = workflow.state();

    workflow.set_track(get_oschersleben_track());
    workflow.update_position(&initial_fix());
    workflow.start_active_session();

    let session = workflow.get_session().expect("session not started");
    assert_eq!(session.date, "01.01.1970".parse().unwrap());
    assert_eq!(session.time, "13:00:00.000".parse().unwrap());
    assert_eq!(session.lap_count(), 0);

    for fix in lap_fixes() {
        workflow.update_position(&fix);
    }

    wait_for_event(&mut receiver, TIMEOUT, EventKindType::SessionAddedEvent).await;
    assert_eq!(database.get_session_count(), 1);
    let stored = database.get_session_by_index(0).await.unwrap();
    assert_eq!(stored.lap_count(), 1);
    let exp_sector: Timestamp = "00:01:00.000".parse().unwrap();
    assert_eq!(stored.laps[0].sectors, vec![exp_sector; 3]);
    assert!(!stored.laps[0].log_points.is_empty());
    assert_eq!(stored.laps[0].laptime(), "00:03:00.000".parse().unwrap());

    let state = state.read().unwrap();
    assert_eq!(state.lap_count, 1);
    assert_eq!(state.last_laptime, "00:03:00.000".parse().unwrap());
    assert_eq!(state.last_sector_time, exp_sector);
}

#[test_log::test(tokio::test)]
pub async fn fixes_are_ignored_without_a_started_session() {
    let (cache, db_file) = setup_database("fixes_are_ignored_without_session").await;
    let event_bus = EventBus::default();
    let database = Arc::new(
        SessionDatabase::new(&cache, &db_file, event_bus.context())
            .await
            .unwrap(),
    );
    let mut workflow = ActiveSessionWorkflow::new(
        event_bus.context(),
        SimpleLaptimer::new(event_bus.context()),
        database.clone(),
    );
    workflow.set_track(get_oschersleben_track());

    for fix in lap_fixes() {
        workflow.update_position(&fix);
    }

    assert!(workflow.get_session().is_none());
    assert_eq!(database.get_session_count(), 0);
}

#[test_log::test(tokio::test)]
pub async fn stopping_drops_the_in_memory_session() {
    let (cache, db_file) = setup_database("stopping_drops_the_session").await;
    let event_bus = EventBus::default();
    let database = Arc::new(
        SessionDatabase::new(&cache, &db_file, event_bus.context())
            .await
            .unwrap(),
    );
    let mut workflow = ActiveSessionWorkflow::new(
        event_bus.context(),
        SimpleLaptimer::new(event_bus.context()),
        database.clone(),
    );
    workflow.set_track(get_oschersleben_track());
    workflow.update_position(&initial_fix());
    workflow.start_active_session();
    assert!(workflow.get_session().is_some());

    workflow.stop_active_session();
    assert!(workflow.get_session().is_none());

    // fixes after the stop no longer reach the store
    for fix in lap_fixes() {
        workflow.update_position(&fix);
    }
    assert_eq!(database.get_session_count(), 0);
}

#[test_log::test(tokio::test)]
pub async fn module_records_a_lap_from_the_bus() {
    let (cache, db_file) = setup_database("module_records_a_lap_from_the_bus").await;
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let database = Arc::new(
        SessionDatabase::new(&cache, &db_file, event_bus.context())
            .await
            .unwrap(),
    );
    let mut workflow = ActiveSessionWorkflow::new(
        event_bus.context(),
        SimpleLaptimer::new(event_bus.context()),
        database.clone(),
    );
    let mut handle = tokio::spawn(async move { workflow.run().await });

    event_bus.publish(&module_core::Event {
        kind: EventKind::TrackDetectedEvent(Arc::new(get_oschersleben_track())),
    });
    event_bus.publish(&module_core::Event {
        kind: EventKind::GpsFixEvent(Arc::new(initial_fix())),
    });
    event_bus.publish(&module_core::Event {
        kind: EventKind::ActiveSessionStartEvent,
    });
    for fix in lap_fixes() {
        event_bus.publish(&module_core::Event {
            kind: EventKind::GpsFixEvent(Arc::new(fix)),
        });
    }

    wait_for_event(&mut receiver, TIMEOUT, EventKindType::SessionAddedEvent).await;
    let stored = database.get_session_by_index(0).await.unwrap();
    assert_eq!(stored.lap_count(), 1);
    assert_eq!(stored.time, "13:00:00.000".parse().unwrap());

    module_core::test_helper::stop_module(&event_bus, &mut handle).await;
}
