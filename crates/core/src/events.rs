//! Progress Reporting
//!
//! Stages report what they are doing through a `ProgressSink`. The default
//! sink forwards to `tracing`; the `EventBus` fans events out to subscribers
//! so callers (and tests) can observe a run.

use parking_lot::RwLock;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Success,
    Warn,
    Error,
}

/// Receives progress messages. Never fails and returns nothing.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, severity: Severity, message: &str);

    fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }

    fn success(&self, message: &str) {
        self.emit(Severity::Success, message);
    }

    fn warn(&self, message: &str) {
        self.emit(Severity::Warn, message);
    }

    fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }
}

/// Sink that writes to the global tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => debug!("{}", message),
            Severity::Info => info!("{}", message),
            Severity::Success => info!("✓ {}", message),
            Severity::Warn => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }
}

/// Events emitted while a release runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseEvent {
    /// A pipeline stage started
    StageStarted(String),
    /// A pipeline stage finished successfully
    StageCompleted(String),
    /// A pipeline stage failed
    StageFailed { stage: String, message: String },
    /// Free-form progress message
    Log { severity: Severity, message: String },
}

/// Subscriber handle for receiving events
#[derive(Clone)]
pub struct EventSubscription {
    receiver: Receiver<ReleaseEvent>,
}

impl EventSubscription {
    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Result<ReleaseEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain every event received so far
    pub fn drain(&self) -> Vec<ReleaseEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Event bus for publish/subscribe pattern
pub struct EventBus {
    subscribers: RwLock<Vec<Sender<ReleaseEvent>>>,
    forward_to_tracing: bool,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            forward_to_tracing: false,
        }
    }

    /// Also log every message through `TracingSink`
    pub fn with_tracing(mut self) -> Self {
        self.forward_to_tracing = true;
        self
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = unbounded();
        self.subscribers.write().push(sender);
        EventSubscription { receiver }
    }

    /// Publish an event to all subscribers, dropping disconnected ones
    pub fn publish(&self, event: ReleaseEvent) -> usize {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn stage_started(&self, stage: &str) {
        self.emit(Severity::Info, &format!("Starting {}...", stage));
        self.publish(ReleaseEvent::StageStarted(stage.to_string()));
    }

    pub fn stage_completed(&self, stage: &str) {
        self.publish(ReleaseEvent::StageCompleted(stage.to_string()));
    }

    pub fn stage_failed(&self, stage: &str, message: &str) {
        self.emit(Severity::Error, &format!("{} failed: {}", stage, message));
        self.publish(ReleaseEvent::StageFailed {
            stage: stage.to_string(),
            message: message.to_string(),
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for EventBus {
    fn emit(&self, severity: Severity, message: &str) {
        if self.forward_to_tracing {
            TracingSink.emit(severity, message);
        }
        self.publish(ReleaseEvent::Log {
            severity,
            message: message.to_string(),
        });
    }
}
