//! Synthetic DOM events
//!
//! Events carry just enough state for page listeners to react: kind,
//! target, an optional key, and a `preventDefault` flag.

use std::cell::Cell;

use super::NodeId;

/// Event types the engine dispatches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseDown,
    MouseUp,
    Click,
    Focus,
    Blur,
    KeyDown,
    KeyPress,
    KeyUp,
    Input,
    Change,
}

impl EventKind {
    /// DOM event type name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MouseDown => "mousedown",
            EventKind::MouseUp => "mouseup",
            EventKind::Click => "click",
            EventKind::Focus => "focus",
            EventKind::Blur => "blur",
            EventKind::KeyDown => "keydown",
            EventKind::KeyPress => "keypress",
            EventKind::KeyUp => "keyup",
            EventKind::Input => "input",
            EventKind::Change => "change",
        }
    }

    /// Focus and blur do not bubble
    pub fn bubbles(&self) -> bool {
        !matches!(self, EventKind::Focus | EventKind::Blur)
    }
}

/// An event in flight
#[derive(Debug)]
pub struct Event {
    pub kind: EventKind,
    pub target: NodeId,
    /// Key value for keyboard events
    pub key: Option<String>,
    default_prevented: Cell<bool>,
}

impl Event {
    pub fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            key: None,
            default_prevented: Cell::new(false),
        }
    }

    pub fn with_key(kind: EventKind, target: NodeId, key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(kind, target)
        }
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

/// Log entry for a dispatched event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub kind: EventKind,
    pub target: NodeId,
    pub key: Option<String>,
}
