//! UI-wide toggle events published over a narrow channel.
//!
//! Section components subscribe once and react to events instead of reading
//! shared mutable flags.

use std::sync::mpsc::{self, Receiver, Sender};

/// Shell-level toggle broadcast to every subscribed section view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent {
    /// Collapse every section body (a section drag started).
    CollapseAll,
    /// Return every section to its own collapse state (the drag finished).
    RestoreCollapse,
    /// Explicit user toggle from the shell toolbar.
    SetAllCollapsed(bool),
}

/// Fan-out publisher for [`ShellEvent`]s.
#[derive(Debug, Default)]
pub struct ShellBus {
    subscribers: Vec<Sender<ShellEvent>>,
}

impl ShellBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber; dropping the receiver unsubscribes it.
    pub fn subscribe(&mut self) -> Receiver<ShellEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Sends `event` to every live subscriber and returns how many received it.
    pub fn publish(&mut self, event: ShellEvent) -> usize {
        self.subscribers
            .retain(|subscriber| subscriber.send(event).is_ok());
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
