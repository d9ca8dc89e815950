//! # Non-blocking event fan-out to multiple subscribers.
//!
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **Per-subscriber FIFO**: each subscriber sees events in publish order
//! - **Overflow**: event dropped for that subscriber only, `SubscriberOverflow` published
//! - **Non-blocking**: `emit()` uses `try_send`
//! - **Isolation**: a panicking subscriber is reported and keeps receiving events
//! - **No feedback**: a `SubscriberPanicked` report skips the subscriber it names, and a
//!   panic while handling a report is logged, not republished

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    else {
                        continue;
                    };
                    let info = panic_message(panic_err.as_ref());
                    if is_subscriber_report(&ev) {
                        tracing::error!(subscriber = sub.name(), info, "subscriber panicked on a subscriber report");
                    } else {
                        worker_bus.publish(Event::subscriber_panicked(sub.name(), info));
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Emits an event to all subscribers without waiting for them.
    ///
    /// Overflow events are not re-published when they themselves overflow.
    pub fn emit(&self, event: &Event) {
        let event = Arc::new(event.clone());
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);
        let panicked = match event.kind {
            EventKind::SubscriberPanicked => event.plugin.as_deref(),
            _ => None,
        };

        for channel in &self.channels {
            if panicked == Some(channel.name) {
                continue;
            }
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Drops all queues and waits for workers to drain them.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }
}

/// Reports produced by the set itself; a panic while handling one is never republished.
fn is_subscriber_report(ev: &Event) -> bool {
    matches!(
        ev.kind,
        EventKind::SubscriberPanicked | EventKind::SubscriberOverflow
    )
}

fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.seen.lock().unwrap().push(event.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Exploding;

    #[async_trait]
    impl Subscribe for Exploding {
        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "exploding"
        }
    }

    #[tokio::test]
    async fn delivers_in_order_to_every_subscriber() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone()], bus);

        set.emit(&Event::new(EventKind::PluginStarting));
        set.emit(&Event::new(EventKind::PluginStarted));
        set.shutdown().await;

        assert_eq!(
            *rec.seen.lock().unwrap(),
            vec![EventKind::PluginStarting, EventKind::PluginStarted]
        );
    }

    #[tokio::test]
    async fn panic_is_reported_on_the_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Exploding)], bus);

        set.emit(&Event::new(EventKind::NoDevices));
        set.shutdown().await;

        let ev = rx.recv().await.expect("panic event");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.plugin.as_deref(), Some("exploding"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn panic_while_handling_a_report_is_not_republished() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Exploding)], bus);

        set.emit(&Event::subscriber_panicked("other", "boom".into()));
        set.emit(&Event::subscriber_overflow("other", "full"));
        set.shutdown().await;

        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn panic_report_skips_the_subscriber_it_names() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone()], bus);

        set.emit(&Event::subscriber_panicked("recorder", "boom".into()));
        set.emit(&Event::subscriber_panicked("other", "boom".into()));
        set.shutdown().await;

        assert_eq!(*rec.seen.lock().unwrap(), vec![EventKind::SubscriberPanicked]);
    }
}
