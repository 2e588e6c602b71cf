use common::test_helper::positions::get_oschersleben_camp_position;
use common::{date::Date, position::GpsFix, timestamp::Timestamp, velocity::Velocity};
use module_core::*;
use std::sync::Arc;

#[tokio::test]
pub async fn events_delivered() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    let event = Event {
        kind: EventKind::QuitEvent,
    };
    event_bus.publish(&event);
    let received_event =
        tokio::time::timeout(std::time::Duration::from_millis(100), receiver.recv())
            .await
            .expect("Failed to receive event in required time")
            .unwrap();
    assert_eq!(received_event.event_type(), event.event_type());
}

#[tokio::test]
pub async fn events_delivered_in_publication_order() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    let fix = Arc::new(GpsFix::new(
        get_oschersleben_camp_position(),
        Timestamp::new(13, 0, 0, 0),
        Date::new(1970, 1, 1),
        Velocity::from_mps(10.0),
    ));
    event_bus.publish(&Event {
        kind: EventKind::GpsFixEvent(fix.clone()),
    });
    event_bus.publish(&Event {
        kind: EventKind::LapStartedEvent,
    });
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });

    let exp_order = [
        EventKindType::GpsFixEvent,
        EventKindType::LapStartedEvent,
        EventKindType::QuitEvent,
    ];
    for exp_type in exp_order {
        let received =
            tokio::time::timeout(std::time::Duration::from_millis(100), receiver.recv())
                .await
                .expect("Failed to receive event in required time")
                .unwrap();
        assert_eq!(received.event_type(), exp_type);
    }
}

#[tokio::test]
pub async fn payload_shared_between_subscribers() {
    let event_bus = EventBus::new();
    let mut receiver1 = event_bus.subscribe();
    let mut receiver2 = event_bus.subscribe();
    let laptime = Arc::new(Timestamp::new(0, 3, 0, 0));
    event_bus.publish(&Event {
        kind: EventKind::LapFinishedEvent(laptime.clone()),
    });

    for receiver in [&mut receiver1, &mut receiver2] {
        let received =
            tokio::time::timeout(std::time::Duration::from_millis(100), receiver.recv())
                .await
                .expect("Failed to receive event in required time")
                .unwrap();
        let payload = payload_ref!(received.kind, EventKind::LapFinishedEvent).unwrap();
        assert_eq!(**payload, *laptime);
    }
}
