//! Typed, double-buffered event queue
//!
//! Events of any `Send + Sync + 'static` type are pushed into a pending
//! buffer from any thread. [`EventQueue::process`] swaps that buffer out and
//! dispatches it, so events pushed by handlers during a flush are only seen
//! by the next flush. A handler can therefore never observe an event it
//! emitted in the same tick.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resources::{Resource, ResourceGroup};

/// Error returned by a failing handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one handler invocation
pub type HandlerResult = Result<(), HandlerError>;

/// Identifies a registered handler for later removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// What happens to the rest of a flush when a handler fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Abort the flush and return the error
    #[default]
    Fatal,
    /// Log the error and keep dispatching
    LogAndContinue,
}

/// Event queue errors
#[derive(Debug, Error)]
pub enum EventError {
    /// A handler failed while the queue was in [`ErrorPolicy::Fatal`] mode
    #[error("Handler for `{event}` failed")]
    Handler {
        /// Type name of the event being dispatched
        event: &'static str,
        /// Handler failure
        #[source]
        source: HandlerError,
    },

    /// `process` was called while a flush was already running
    #[error("Event queue is already being processed")]
    ReentrantProcess,
}

struct QueuedEvent {
    type_id: TypeId,
    type_name: &'static str,
    payload: Box<dyn Any + Send + Sync>,
}

type ErasedHandler = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> HandlerResult + Send + Sync>;

/// Resets the processing flag even if a handler panics
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Queued publish/subscribe bus
pub struct EventQueue {
    pending: Mutex<Vec<QueuedEvent>>,
    spare: Mutex<Vec<QueuedEvent>>,
    handlers: RwLock<HashMap<TypeId, Vec<(HandlerId, ErasedHandler)>>>,
    next_handler: AtomicU64,
    processing: AtomicBool,
    policy: Mutex<ErrorPolicy>,
}

impl Resource for EventQueue {
    const GROUP: ResourceGroup = ResourceGroup::Events;
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::with_policy(ErrorPolicy::default())
    }
}

impl EventQueue {
    /// Create an empty queue with the given handler error policy
    pub fn with_policy(policy: ErrorPolicy) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            spare: Mutex::new(Vec::new()),
            handlers: RwLock::new(HashMap::new()),
            next_handler: AtomicU64::new(0),
            processing: AtomicBool::new(false),
            policy: Mutex::new(policy),
        }
    }

    /// Current handler error policy
    pub fn error_policy(&self) -> ErrorPolicy {
        *self.policy.lock()
    }

    /// Change the handler error policy
    pub fn set_error_policy(&self, policy: ErrorPolicy) {
        *self.policy.lock() = policy;
    }

    /// Queue an event for the next flush; callable from any thread
    pub fn push<E: Send + Sync + 'static>(&self, event: E) {
        self.pending.lock().push(QueuedEvent {
            type_id: TypeId::of::<E>(),
            type_name: type_name::<E>(),
            payload: Box::new(event),
        });
    }

    /// Register a fallible handler for events of type `E`
    pub fn add_handler<E, F>(&self, handler: F) -> HandlerId
    where
        E: Send + Sync + 'static,
        F: Fn(&E) -> HandlerResult + Send + Sync + 'static,
    {
        let id = HandlerId(self.next_handler.fetch_add(1, Ordering::Relaxed));
        let erased: ErasedHandler = Arc::new(move |payload: &(dyn Any + Send + Sync)| {
            payload.downcast_ref::<E>().map_or(Ok(()), &handler)
        });
        self.handlers
            .write()
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, erased));
        log::trace!("Added handler {:?} for `{}`", id, type_name::<E>());
        id
    }

    /// Register a handler that cannot fail
    pub fn add_listener<E, F>(&self, listener: F) -> HandlerId
    where
        E: Send + Sync + 'static,
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.add_handler(move |event: &E| {
            listener(event);
            Ok(())
        })
    }

    /// Remove a handler; removing an unknown or already removed id is a no-op
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        for list in handlers.values_mut() {
            if let Some(position) = list.iter().position(|(handler, _)| *handler == id) {
                list.remove(position);
                return true;
            }
        }
        false
    }

    /// Events waiting for the next flush
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drop every pending event without dispatching it
    pub fn clear(&self) {
        self.pending.lock().clear();
    }

    /// Dispatch every event pushed before this call.
    ///
    /// Handlers run in registration order. Returns the number of dispatched
    /// events. With [`ErrorPolicy::Fatal`] the first handler error aborts the
    /// flush; the undelivered remainder of the batch is discarded.
    pub fn process(&self) -> Result<usize, EventError> {
        if self.processing.swap(true, Ordering::AcqRel) {
            return Err(EventError::ReentrantProcess);
        }
        let _guard = ProcessingGuard(&self.processing);

        let mut batch = std::mem::take(&mut *self.spare.lock());
        std::mem::swap(&mut *self.pending.lock(), &mut batch);

        let result = self.dispatch(&batch);
        let count = batch.len();

        batch.clear();
        *self.spare.lock() = batch;
        result.map(|()| count)
    }

    fn dispatch(&self, batch: &[QueuedEvent]) -> Result<(), EventError> {
        let policy = self.error_policy();

        for (index, event) in batch.iter().enumerate() {
            let handlers = match self.handlers.read().get(&event.type_id) {
                Some(list) if !list.is_empty() => list.clone(),
                _ => continue,
            };

            for (id, handler) in handlers {
                let Err(source) = handler(event.payload.as_ref()) else {
                    continue;
                };
                match policy {
                    ErrorPolicy::Fatal => {
                        log::error!(
                            "Handler {:?} for `{}` failed: {}; discarding {} queued events",
                            id,
                            event.type_name,
                            source,
                            batch.len() - index - 1
                        );
                        return Err(EventError::Handler {
                            event: event.type_name,
                            source,
                        });
                    }
                    ErrorPolicy::LogAndContinue => {
                        log::error!("Handler {:?} for `{}` failed: {}", id, event.type_name, source);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Weak;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[derive(Debug)]
    struct Other;

    fn recorder(queue: &EventQueue) -> Arc<Mutex<Vec<u32>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        queue.add_listener(move |ping: &Ping| sink.lock().push(ping.0));
        seen
    }

    #[test]
    fn test_handlers_see_events_in_push_order() {
        let queue = EventQueue::default();
        let seen = recorder(&queue);

        queue.push(Ping(1));
        queue.push(Other);
        queue.push(Ping(2));
        assert_eq!(queue.process().unwrap(), 3);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_events_pushed_during_flush_wait_for_next_flush() {
        let queue = Arc::new(EventQueue::default());
        let seen = recorder(&queue);

        let weak: Weak<EventQueue> = Arc::downgrade(&queue);
        queue.add_listener(move |ping: &Ping| {
            if let Some(queue) = weak.upgrade() {
                queue.push(Ping(ping.0 + 1));
            }
        });

        queue.push(Ping(0));
        queue.process().unwrap();
        assert_eq!(*seen.lock(), vec![0]);
        assert_eq!(queue.pending_count(), 1);

        queue.process().unwrap();
        assert_eq!(*seen.lock(), vec![0, 1]);
    }

    #[test]
    fn test_remove_handler_is_idempotent() {
        let queue = EventQueue::default();
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        let id = queue.add_listener(move |_: &Ping| *sink.lock() += 1);

        assert!(queue.remove_handler(id));
        assert!(!queue.remove_handler(id));

        queue.push(Ping(1));
        queue.process().unwrap();
        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn test_fatal_policy_aborts_remaining_handlers() {
        let queue = EventQueue::default();
        queue.add_handler(|_: &Ping| Err("broken handler".into()));
        let seen = recorder(&queue);

        queue.push(Ping(7));
        queue.push(Ping(8));
        let error = queue.process().unwrap_err();

        assert!(matches!(error, EventError::Handler { .. }));
        assert!(seen.lock().is_empty());
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_log_and_continue_keeps_dispatching() {
        let queue = EventQueue::with_policy(ErrorPolicy::LogAndContinue);
        queue.add_handler(|_: &Ping| Err("broken handler".into()));
        let seen = recorder(&queue);

        queue.push(Ping(7));
        queue.push(Ping(8));
        assert_eq!(queue.process().unwrap(), 2);
        assert_eq!(*seen.lock(), vec![7, 8]);
    }

    #[test]
    fn test_reentrant_process_is_rejected() {
        let queue = Arc::new(EventQueue::default());
        let outcome = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&queue);
        let sink = outcome.clone();
        queue.add_listener(move |_: &Ping| {
            if let Some(queue) = weak.upgrade() {
                *sink.lock() = Some(matches!(queue.process(), Err(EventError::ReentrantProcess)));
            }
        });

        queue.push(Ping(0));
        queue.process().unwrap();
        assert_eq!(*outcome.lock(), Some(true));
    }

    #[test]
    fn test_push_from_other_threads() {
        let queue = Arc::new(EventQueue::default());
        let seen = recorder(&queue);

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        queue.push(Ping(worker * 10 + i));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(queue.process().unwrap(), 40);
        assert_eq!(seen.lock().len(), 40);
    }
}
