//! Filters source events and dispatches them to the relay engine.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    dashmap::DashMap,
    tokio::{sync::oneshot, task::JoinHandle},
    tracing::{Instrument, debug, info_span},
};

use crate::{
    engine::{RelayEngine, RelayOutcome},
    event::SourceEvent,
    mapper::MessageKey,
};

/// Why an event was dropped before reaching the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Posted by the relay itself; mirroring it would loop.
    SelfAuthored,
    /// The source channel is not mirrored.
    UnmappedChannel,
}

/// Result of routing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Ignored(IgnoreReason),
    Handled(RelayOutcome),
}

/// Entry point for source platform notifications.
///
/// Spawned events for the same source message run one after another in the
/// order [`EventRouter::spawn`] was called.
pub struct EventRouter {
    engine: Arc<RelayEngine>,
    /// Latest queued turn per message: its ticket and its completion signal.
    turns: DashMap<MessageKey, (u64, oneshot::Receiver<()>)>,
    next_ticket: AtomicU64,
}

/// A place in one message's queue. Dropping it lets the next event run.
struct Turn {
    router: Arc<EventRouter>,
    key: MessageKey,
    ticket: u64,
    _done: oneshot::Sender<()>,
}

impl Drop for Turn {
    fn drop(&mut self) {
        let ticket = self.ticket;
        self.router
            .turns
            .remove_if(&self.key, |_, (latest, _)| *latest == ticket);
    }
}

impl EventRouter {
    pub fn new(engine: Arc<RelayEngine>) -> Self {
        Self {
            engine,
            turns: DashMap::new(),
            next_ticket: AtomicU64::new(0),
        }
    }

    pub fn engine(&self) -> &RelayEngine {
        &self.engine
    }

    /// Whether events from this source channel would be relayed at all.
    pub fn mirrors(&self, source_channel_id: &str) -> bool {
        self.engine.channels().is_mirrored(source_channel_id)
    }

    pub fn filter(&self, event: &SourceEvent) -> Option<IgnoreReason> {
        if event.is_self() {
            Some(IgnoreReason::SelfAuthored)
        } else if !self.mirrors(event.channel_id()) {
            Some(IgnoreReason::UnmappedChannel)
        } else {
            None
        }
    }

    /// Filter and handle one event to completion.
    pub async fn route(&self, event: SourceEvent) -> Dispatch {
        if let Some(reason) = self.filter(&event) {
            debug!(
                kind = event.kind(),
                channel_id = %event.channel_id(),
                ?reason,
                "event ignored"
            );
            return Dispatch::Ignored(reason);
        }

        let outcome = match &event {
            SourceEvent::Created(created) => self.engine.handle_create(&created.message).await,
            SourceEvent::Edited(edited) => self.engine.handle_edit(&edited.message).await,
            SourceEvent::Deleted(deleted) => self.engine.handle_delete(deleted).await,
        };
        Dispatch::Handled(outcome)
    }

    /// Handle an event on its own task so a failure there cannot reach others.
    ///
    /// The event's place in its message's queue is taken before the task
    /// starts, so a delete spawned right after a create waits for it.
    pub fn spawn(self: &Arc<Self>, event: SourceEvent) -> JoinHandle<Dispatch> {
        let span = info_span!(
            "relay",
            kind = event.kind(),
            channel_id = %event.channel_id(),
            message_id = %event.message_id(),
        );
        let queued = self.filter(&event).is_none().then(|| self.take_turn(&event));
        let router = Arc::clone(self);
        tokio::spawn(
            async move {
                let _turn = match queued {
                    Some((turn, previous)) => {
                        if let Some(previous) = previous {
                            // Resolves when the previous turn is dropped, even on panic.
                            let _ = previous.await;
                        }
                        Some(turn)
                    },
                    None => None,
                };
                router.route(event).await
            }
            .instrument(span),
        )
    }

    fn take_turn(self: &Arc<Self>, event: &SourceEvent) -> (Turn, Option<oneshot::Receiver<()>>) {
        let key = MessageKey::new(event.channel_id(), event.message_id());
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (done, waiter) = oneshot::channel();
        let previous = self
            .turns
            .insert(key.clone(), (ticket, waiter))
            .map(|(_, previous)| previous);
        let turn = Turn {
            router: Arc::clone(self),
            key,
            ticket,
            _done: done,
        };
        (turn, previous)
    }
}
