//! Document Model
//!
//! An arena-backed model of a live page: elements, text, open and closed
//! shadow roots, layout boxes, form ownership, event dispatch with page
//! listeners, and deferred page tasks (animations, async re-renders).
//!
//! The host populates a [`Document`] from whatever it observes (a content
//! script bridge, a headless harness, a test) and the engine reads and
//! mutates it through the same operations a content script would use.

pub mod document;
pub mod events;

pub use document::{Document, ElementBuilder};
pub use events::{Event, EventKind, EventRecord};

use serde::{Deserialize, Serialize};

/// Handle to a node in a [`Document`] arena
///
/// Handles are non-owning: the document owns the node, the handle only
/// addresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Shadow root encapsulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowMode {
    Open,
    /// Closed roots refuse traversal from outside
    Closed,
}

/// Axis-aligned layout box in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Zero width or zero height
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.x < other.right() && other.x < self.right()
    }

    pub fn overlaps_vertically(&self, other: &Rect) -> bool {
        self.y < other.bottom() && other.y < self.bottom()
    }

    /// True if any part of this box lies inside `other`
    pub fn intersects(&self, other: &Rect) -> bool {
        self.overlaps_horizontally(other) && self.overlaps_vertically(other)
    }

    /// Get the center point of the box
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Element state
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in insertion order
    pub attrs: Vec<(String, String)>,
    /// Current `value` property (inputs, textareas, selects)
    pub value: String,
    /// Current `checked` property (radios, checkboxes)
    pub checked: bool,
    /// Current `selected` property (options)
    pub selected: bool,
    /// Layout box
    pub rect: Rect,
    /// Whether the element generates a box (has an offset parent)
    pub rendered: bool,
    /// A page framework replaced the `value` property setter; writes through
    /// the property are swallowed and only the native setter reaches the node
    pub value_override: bool,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            value: String::new(),
            checked: false,
            selected: false,
            rect: Rect::new(0.0, 0.0, 160.0, 24.0),
            rendered: true,
            value_override: false,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attrs
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(pos).1)
    }

    /// Lowercased `type` attribute for inputs ("text" when absent)
    pub fn input_type(&self) -> Option<String> {
        if self.tag != "input" {
            return None;
        }
        Some(
            self.attr("type")
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string()),
        )
    }

    /// Lowercased `role` attribute
    pub fn role(&self) -> Option<String> {
        self.attr("role").map(|r| r.trim().to_ascii_lowercase())
    }
}

/// What a node is
#[derive(Debug, Clone)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    ShadowRoot { host: NodeId, mode: ShadowMode },
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    /// Shadow root attached to this element, if any
    pub shadow_root: Option<NodeId>,
}

/// Elements a form keeps in its controls list
pub const LISTED_ELEMENTS: &[&str] = &[
    "button", "fieldset", "input", "object", "output", "select", "textarea",
];
