use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::domain::current_timestamp;

/// One-directional progress stream from the worker to the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEvent {
    Line { at: String, text: String },
    Finished { checked: u32, found: u32 },
}

#[derive(Clone)]
pub struct EventSender {
    sender: UnboundedSender<ConsoleEvent>,
}

impl EventSender {
    /// Timestamped progress line. A closed receiver is not an error; the
    /// worker keeps going even if nobody is watching.
    pub fn line(&self, text: impl Into<String>) {
        let _ = self.sender.send(ConsoleEvent::Line {
            at: current_timestamp(),
            text: text.into(),
        });
    }

    pub fn finished(&self, checked: u32, found: u32) {
        let _ = self.sender.send(ConsoleEvent::Finished { checked, found });
    }
}

pub fn event_channel() -> (EventSender, UnboundedReceiver<ConsoleEvent>) {
    let (sender, receiver) = unbounded_channel();
    (EventSender { sender }, receiver)
}
