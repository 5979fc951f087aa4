//! Shared test types and harness.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use statehub::{
    Client, Context, Limits, NamespacedName, Object, ObjectMeta, ResourceEvent, Router, Scope,
    WatchHandle,
};

/// The namespace type for tests.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Zone {
    pub meta: ObjectMeta,
    pub spec: ZoneSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneSpec {
    pub description: String,
}

impl Object for Zone {
    fn type_name() -> &'static str {
        "statehub.test.Zone"
    }
    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
}

/// A namespaced record with spec and status.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Widget {
    pub meta: ObjectMeta,
    pub spec: WidgetSpec,
    pub status: Option<WidgetStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSpec {
    pub size: i64,
    pub color: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetStatus {
    pub ready: bool,
    pub observed_size: i64,
}

impl Object for Widget {
    fn type_name() -> &'static str {
        "statehub.test.Widget"
    }
    fn meta(&self) -> &ObjectMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ObjectMeta {
        &mut self.meta
    }
    fn set_status_from(&mut self, other: &Self) {
        self.status = other.status.clone();
    }
}

/// A routed client over fresh in-memory stores.
pub struct Harness {
    pub client: Client,
    pub cx: Context,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_limits(Limits::default())
    }

    pub fn with_limits(limits: Limits) -> Self {
        let router = Router::builder::<Zone>(limits)
            .register::<Widget>(Scope::Namespaced)
            .build();
        Self {
            client: Client::new(Arc::new(router)),
            cx: Context::background(),
        }
    }

    pub fn create_zone(&self, name: &str) -> Zone {
        let mut zone = Zone {
            meta: ObjectMeta {
                name: name.into(),
                ..Default::default()
            },
            ..Default::default()
        };
        self.client.create(&self.cx, &mut zone).expect("create zone");
        zone
    }

    pub fn create_widget(&self, namespace: &str, name: &str) -> Widget {
        let mut widget = widget(namespace, name);
        self.client
            .create(&self.cx, &mut widget)
            .expect("create widget");
        widget
    }

    pub fn get_widget(&self, namespace: &str, name: &str) -> statehub::Result<Widget> {
        self.client
            .get(&self.cx, &NamespacedName::new(namespace, name))
    }
}

pub fn widget(namespace: &str, name: &str) -> Widget {
    Widget {
        meta: ObjectMeta {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        },
        spec: WidgetSpec {
            size: 1,
            color: "blue".into(),
        },
        ..Default::default()
    }
}

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
pub const NO_EVENT_TIMEOUT: Duration = Duration::from_millis(200);

/// Next event or panic; mutations have already rendezvoused with the hub, so
/// delivery is at most one loop iteration away.
pub fn next_event<T: Object>(watch: &WatchHandle<T>) -> ResourceEvent<T> {
    watch
        .events()
        .recv_timeout(EVENT_TIMEOUT)
        .expect("expected a watch event")
}

pub fn expect_no_event<T: Object>(watch: &WatchHandle<T>) {
    assert!(
        watch.events().recv_timeout(NO_EVENT_TIMEOUT).is_err(),
        "expected no watch event"
    );
}
