//! Structured log events emitted by observers.

use std::sync::{Arc, Mutex};

use pathwatch::PathObserver;
use pathwatch::testing::{Counter, Leaf, Node};
use tracing::field::{Field, Visit};
use tracing::{Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Captured {
    level: Level,
    message: String,
    path: Option<String>,
}

struct Capture {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        #[derive(Default)]
        struct Fields {
            message: Option<String>,
            path: Option<String>,
        }
        impl Visit for Fields {
            fn record_str(&mut self, field: &Field, value: &str) {
                match field.name() {
                    "message" => self.message = Some(value.to_owned()),
                    "path" => self.path = Some(value.to_owned()),
                    _ => {}
                }
            }

            fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
                let text = format!("{value:?}").trim_matches('"').to_owned();
                match field.name() {
                    "message" => self.message = Some(text),
                    "path" => self.path = Some(text),
                    _ => {}
                }
            }
        }

        let mut fields = Fields::default();
        event.record(&mut fields);
        self.events.lock().expect("capture lock").push(Captured {
            level: *event.metadata().level(),
            message: fields.message.unwrap_or_default(),
            path: fields.path,
        });
    }
}

fn capture<T>(f: impl FnOnce() -> T) -> (T, Vec<Captured>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(Capture {
        events: Arc::clone(&events),
    });
    let out = tracing::subscriber::with_default(subscriber, f);
    let events = events.lock().expect("capture lock").clone();
    (out, events)
}

#[test]
fn rewalk_failure_is_logged_as_warning() {
    let root = Node::with_leaf(1);
    let counter = Counter::new();
    let observer =
        PathObserver::new(root.clone(), Node::leaf_value_path().into_path(), counter.callback())
            .unwrap();

    let ((), events) = capture(|| root.set_leaf(Some(Leaf::silent(2))));

    assert_eq!(counter.get(), 1);
    assert_eq!(observer.attached_nodes(), 1);
    let warning = events
        .iter()
        .find(|e| e.level == Level::WARN)
        .expect("a warning for the failed re-walk");
    assert_eq!(warning.message, "failed to re-attach path after change");
    assert_eq!(warning.path.as_deref(), Some("owner.Leaf.Value"));

    // A later observable replacement repopulates the chain.
    root.set_leaf(Some(Leaf::new(3)));
    assert_eq!(observer.attached_nodes(), 2);
}

#[test]
fn lifecycle_is_logged_at_debug() {
    let root = Node::with_leaf(1);
    let (observer, events) = capture(|| {
        let observer =
            PathObserver::new(root.clone(), Node::leaf_value_path().into_path(), || {}).unwrap();
        observer.dispose();
        observer
    });
    assert!(observer.is_disposed());

    let messages: Vec<&str> = events
        .iter()
        .filter(|e| e.level == Level::DEBUG)
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec!["observer subscribed", "observer unsubscribed", "observer disposed"]
    );
    assert!(events.iter().all(|e| e.level != Level::WARN));
}
