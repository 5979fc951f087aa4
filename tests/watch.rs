//! Watch semantics: seeding, replay, expiry, backpressure.

mod fixtures;

use std::collections::BTreeSet;

use statehub::{Error, EventKind, Limits, ResourceEvent, WatchOptions};

use fixtures::{Harness, Widget, expect_no_event, next_event, widget};

#[test]
fn fresh_watch_seeds_the_current_snapshot_then_goes_live() {
    let h = Harness::new();
    h.create_zone("prod");
    for name in ["a", "b", "c"] {
        h.create_widget("prod", name);
    }

    let watch = h
        .client
        .watch::<Widget>(&h.cx, WatchOptions::default().in_namespace("prod"))
        .unwrap();

    // Three Added events, in some order, matching a List with the same options.
    let listed: BTreeSet<String> = h
        .client
        .list::<Widget>(&h.cx, &statehub::ListOptions::default().in_namespace("prod"))
        .unwrap()
        .into_iter()
        .map(|w| w.meta.name)
        .collect();
    let mut seeded = BTreeSet::new();
    for _ in 0..3 {
        let event = next_event(&watch);
        assert_eq!(event.kind(), EventKind::Added);
        seeded.insert(event.object().unwrap().meta.name.clone());
    }
    assert_eq!(seeded, listed);

    // Then only later events.
    h.create_widget("prod", "d");
    let live = next_event(&watch);
    assert_eq!(live.kind(), EventKind::Added);
    assert_eq!(live.object().unwrap().meta.name, "d");
}

#[test]
fn seeding_applies_namespace_and_label_filters() {
    let h = Harness::new();
    h.create_zone("prod");
    h.create_zone("staging");

    let mut labeled = widget("prod", "api");
    labeled.meta.labels.insert("tier".into(), "backend".into());
    h.client.create(&h.cx, &mut labeled).unwrap();
    h.create_widget("prod", "web");
    h.create_widget("staging", "api");

    let watch = h
        .client
        .watch::<Widget>(
            &h.cx,
            WatchOptions::default()
                .in_namespace("prod")
                .match_labels([("tier", "backend")]),
        )
        .unwrap();

    let event = next_event(&watch);
    assert_eq!(event.object().unwrap().meta.name, "api");
    assert_eq!(event.object().unwrap().meta.namespace, "prod");
    expect_no_event(&watch);
}

#[test]
fn a_record_committed_after_registration_arrives_exactly_once() {
    let h = Harness::new();
    h.create_zone("prod");
    h.create_widget("prod", "existing");

    let watch = h
        .client
        .watch::<Widget>(&h.cx, WatchOptions::default())
        .unwrap();
    assert_eq!(next_event(&watch).object().unwrap().meta.name, "existing");

    h.create_widget("prod", "fresh");
    assert_eq!(next_event(&watch).object().unwrap().meta.name, "fresh");
    expect_no_event(&watch);
}

#[test]
fn resume_delivers_only_events_after_the_given_version() {
    let h = Harness::new();
    h.create_zone("prod");

    let first = h.create_widget("prod", "a");
    h.create_widget("prod", "b");
    let mut a = first.clone();
    a.spec.size = 7;
    h.client.update(&h.cx, &mut a).unwrap();

    let watch = h
        .client
        .watch::<Widget>(
            &h.cx,
            WatchOptions::default().resume_from(first.meta.resource_version.clone()),
        )
        .unwrap();

    let replay1 = next_event(&watch);
    assert_eq!(replay1.kind(), EventKind::Added);
    assert_eq!(replay1.object().unwrap().meta.name, "b");
    let replay2 = next_event(&watch);
    assert_eq!(replay2.kind(), EventKind::Modified);
    assert_eq!(replay2.object().unwrap().meta.name, "a");
    expect_no_event(&watch);

    // Live events continue after the replay.
    h.create_widget("prod", "c");
    assert_eq!(next_event(&watch).object().unwrap().meta.name, "c");
}

#[test]
fn resume_at_the_newest_version_yields_an_empty_replay() {
    let h = Harness::new();
    h.create_zone("prod");
    let created = h.create_widget("prod", "a");

    let watch = h
        .client
        .watch::<Widget>(
            &h.cx,
            WatchOptions::default().resume_from(created.meta.resource_version.clone()),
        )
        .unwrap();
    expect_no_event(&watch);

    h.create_widget("prod", "b");
    assert_eq!(next_event(&watch).object().unwrap().meta.name, "b");
}

#[test]
fn resume_behind_the_ring_fails_expired_without_events() {
    let limits = Limits {
        event_ring_capacity: 4,
        ..Default::default()
    };
    let h = Harness::with_limits(limits);
    h.create_zone("prod");

    let mut obj = h.create_widget("prod", "a");
    for _ in 0..6 {
        obj.spec.size += 1;
        h.client.update(&h.cx, &mut obj).unwrap();
    }

    let err = h
        .client
        .watch::<Widget>(&h.cx, WatchOptions::default().resume_from("1"))
        .unwrap_err();
    assert!(matches!(err, Error::Expired { .. }));
}

#[test]
fn malformed_resume_token_is_a_bad_request() {
    let h = Harness::new();
    let err = h
        .client
        .watch::<Widget>(&h.cx, WatchOptions::default().resume_from("not-a-number"))
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}

#[test]
fn lagging_subscribers_are_closed_not_waited_for() {
    let limits = Limits {
        subscriber_queue_capacity: 2,
        ..Default::default()
    };
    let h = Harness::with_limits(limits);
    h.create_zone("prod");

    let watch = h
        .client
        .watch::<Widget>(&h.cx, WatchOptions::default())
        .unwrap();

    // Never drain; the third live event overflows the queue and evicts us.
    for name in ["a", "b", "c", "d"] {
        h.create_widget("prod", name);
    }

    let mut received = 0;
    while let Ok(event) = watch.events().recv_timeout(fixtures::EVENT_TIMEOUT) {
        assert!(matches!(event, ResourceEvent::Added(_)));
        received += 1;
    }
    assert!(received <= 2, "only the buffered prefix should arrive");
    // Writers were never blocked: all four records are stored.
    let all: Vec<Widget> = h.client.list(&h.cx, &Default::default()).unwrap();
    assert_eq!(all.len(), 4);
}

#[test]
fn close_is_idempotent_and_ends_the_stream() {
    let h = Harness::new();
    h.create_zone("prod");

    let watch = h
        .client
        .watch::<Widget>(&h.cx, WatchOptions::default())
        .unwrap();
    watch.close();
    watch.close();

    // The stream drains and disconnects; later commits are not delivered.
    h.create_widget("prod", "after-close");
    while let Ok(_event) = watch.events().recv_timeout(fixtures::NO_EVENT_TIMEOUT) {}
    assert!(watch.events().recv_timeout(fixtures::NO_EVENT_TIMEOUT).is_err());
}

#[test]
fn watchers_of_one_type_do_not_see_other_types() {
    let h = Harness::new();
    h.create_zone("prod");

    let zone_watch = h
        .client
        .watch::<fixtures::Zone>(&h.cx, WatchOptions::default())
        .unwrap();
    // Seed: the one zone.
    assert_eq!(next_event(&zone_watch).kind(), EventKind::Added);

    h.create_widget("prod", "api");
    expect_no_event(&zone_watch);
}
