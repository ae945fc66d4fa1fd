//! Arena document
//!
//! Owns every node of one browsing context. Node handles are plain indices;
//! detached nodes stay in the arena but are no longer connected.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use super::events::{Event, EventKind, EventRecord};
use super::{ElementData, Node, NodeId, NodeKind, Rect, ShadowMode, LISTED_ELEMENTS};
use crate::error::{Error, Result};

/// Page event listener
pub type Listener = Rc<dyn Fn(&mut Document, &Event)>;

/// Work the page scheduled for a later frame (animations, re-renders)
struct DeferredTask {
    remaining: u32,
    run: Box<dyn FnOnce(&mut Document)>,
}

/// A browsing context's DOM
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    listeners: HashMap<(NodeId, EventKind), Vec<Listener>>,
    tasks: VecDeque<DeferredTask>,
    event_log: Vec<EventRecord>,
    active_element: Option<NodeId>,
    viewport: Rect,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("listeners", &self.listeners.len())
            .field("pending_tasks", &self.tasks.len())
            .field("events", &self.event_log.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with `<html><body>` in place
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
                shadow_root: None,
            }],
            root: NodeId(0),
            body: NodeId(0),
            listeners: HashMap::new(),
            tasks: VecDeque::new(),
            event_log: Vec::new(),
            active_element: None,
            viewport: Rect::new(0.0, 0.0, 1280.0, 800.0),
        };
        let html = doc.create_element(doc.root, "html");
        doc.body = doc.create_element(html, "body");
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    // =========================================================================
    // Construction
    // =========================================================================

    fn push_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
            shadow_root: None,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    /// Append a new element with default layout
    pub fn create_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.insert_element(parent, ElementData::new(tag))
    }

    /// Append a prepared element
    pub fn insert_element(&mut self, parent: NodeId, data: ElementData) -> NodeId {
        self.push_node(Some(parent), NodeKind::Element(data))
    }

    /// Start building an element
    ///
    /// ```rust
    /// use memfill::dom::Document;
    ///
    /// let mut doc = Document::new();
    /// let body = doc.body();
    /// let email = doc
    ///     .build("input")
    ///     .attr("type", "email")
    ///     .attr("name", "email")
    ///     .append_to(body);
    /// assert_eq!(doc.attr(email, "name"), Some("email"));
    /// ```
    pub fn build(&mut self, tag: &str) -> ElementBuilder<'_> {
        ElementBuilder {
            doc: self,
            data: ElementData::new(tag),
            text: None,
        }
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push_node(Some(parent), NodeKind::Text(text.to_string()))
    }

    /// Attach a shadow root to `host`, returning the existing one if present
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowMode) -> NodeId {
        if let Some(existing) = self.nodes.get(host.0).and_then(|n| n.shadow_root) {
            return existing;
        }
        let root = self.push_node(None, NodeKind::ShadowRoot { host, mode });
        self.nodes[host.0].shadow_root = Some(root);
        root
    }

    /// Detach a node from its parent
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.parent(node) {
            self.nodes[parent.0].children.retain(|c| *c != node);
            self.nodes[node.0].parent = None;
        }
        if self.active_element == Some(node) {
            self.active_element = None;
        }
    }

    // =========================================================================
    // Node access
    // =========================================================================

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::NodeNotFound(id.0))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_or_err(&mut self, id: NodeId) -> Result<&mut ElementData> {
        if id.0 >= self.nodes.len() {
            return Err(Error::NodeNotFound(id.0));
        }
        self.element_mut(id).ok_or(Error::NotAnElement(id.0))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.element_or_err(id)?.set_attr(name, value);
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|el| el.remove_attr(name))
    }

    /// Lowercased `role` attribute
    pub fn role(&self, id: NodeId) -> Option<String> {
        self.element(id).and_then(ElementData::role)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|p| self.element(*p).is_some())
    }

    /// Exclusive ancestors within the same tree (stops at a shadow root)
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        matches!(
            self.nodes.get(id.0).map(|n| &n.kind),
            Some(NodeKind::ShadowRoot { .. })
        )
    }

    /// Host element of a shadow root
    pub fn host_of(&self, shadow_root: NodeId) -> Option<NodeId> {
        match self.nodes.get(shadow_root.0)?.kind {
            NodeKind::ShadowRoot { host, .. } => Some(host),
            _ => None,
        }
    }

    /// Shadow root of `host`; closed roots refuse access
    pub fn shadow_root(&self, host: NodeId) -> Result<Option<NodeId>> {
        let Some(root) = self.node(host)?.shadow_root else {
            return Ok(None);
        };
        match self.nodes[root.0].kind {
            NodeKind::ShadowRoot {
                mode: ShadowMode::Closed,
                ..
            } => Err(Error::shadow_inaccessible(self.tag(host).unwrap_or("?"))),
            _ => Ok(Some(root)),
        }
    }

    /// Root of the tree containing `id`: the document or a shadow root
    pub fn tree_root(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Whether the node is reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        let root = self.tree_root(id);
        if root == self.root {
            return true;
        }
        match self.host_of(root) {
            Some(host) => self.is_connected(host),
            None => false,
        }
    }

    /// Parent, stepping from a shadow root to its host
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if self.is_shadow_root(parent) {
            self.host_of(parent)
        } else {
            Some(parent)
        }
    }

    /// Inclusive containment within one tree
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Preorder descendants of `root` in its light tree, excluding `root`
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn descendant_elements(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.element(*n).is_some())
            .collect()
    }

    /// Preorder elements under `root`, descending into open shadow roots.
    /// Closed roots are skipped.
    pub fn composed_elements(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for node in self.descendant_elements(root) {
            out.push(node);
            if let Ok(Some(shadow)) = self.shadow_root(node) {
                out.extend(self.composed_elements(shadow));
            }
        }
        out
    }

    /// Nearest inclusive ancestor with the given tag
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.is_tag(*n, tag))
    }

    /// Nearest inclusive ancestor with the given role
    pub fn closest_role(&self, id: NodeId, role: &str) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.role(*n).as_deref() == Some(role))
    }

    /// `getElementById` scoped to the tree containing `scope`
    pub fn element_by_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        self.descendant_elements(self.tree_root(scope))
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    /// First element (through open shadow roots) carrying `name="value"`
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<NodeId> {
        self.composed_elements(self.root)
            .into_iter()
            .find(|n| self.attr(*n, name) == Some(value))
    }

    // =========================================================================
    // Text and layout
    // =========================================================================

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(_) => self
                .children(id)
                .iter()
                .map(|c| self.text_content(*c))
                .collect(),
            None => String::new(),
        }
    }

    /// Rendered text with whitespace collapsed
    pub fn visible_text(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        self.collect_visible_text(id, &mut parts);
        parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_visible_text(&self, id: NodeId, parts: &mut Vec<String>) {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => parts.push(text.clone()),
            Some(NodeKind::Element(el)) => {
                if !el.rendered || matches!(el.tag.as_str(), "script" | "style" | "template") {
                    return;
                }
                for child in self.children(id) {
                    self.collect_visible_text(*child, parts);
                }
            }
            Some(_) => {
                for child in self.children(id) {
                    self.collect_visible_text(*child, parts);
                }
            }
            None => {}
        }
    }

    /// Element and every composed ancestor generate a box
    pub fn is_rendered(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if let Some(el) = self.element(node) {
                if !el.rendered {
                    return false;
                }
            }
            cursor = self.composed_parent(node);
        }
        self.is_connected(id)
    }

    pub fn rect(&self, id: NodeId) -> Rect {
        self.element(id).map(|el| el.rect).unwrap_or_default()
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> Result<()> {
        self.element_or_err(id)?.rect = rect;
        Ok(())
    }

    pub fn set_rendered(&mut self, id: NodeId, rendered: bool) -> Result<()> {
        self.element_or_err(id)?.rendered = rendered;
        Ok(())
    }

    // =========================================================================
    // Forms
    // =========================================================================

    pub fn is_listed(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(|t| LISTED_ELEMENTS.contains(&t))
    }

    /// Form owner per the `form` attribute, else the nearest ancestor form
    pub fn form_owner(&self, id: NodeId) -> Option<NodeId> {
        if let Some(form_id) = self.attr(id, "form") {
            return self
                .element_by_id(id, form_id)
                .filter(|f| self.is_tag(*f, "form"));
        }
        self.ancestors(id).find(|n| self.is_tag(*n, "form"))
    }

    /// The form's controls list in tree order, including controls associated
    /// through the `form` attribute from outside the form subtree
    pub fn form_elements(&self, form: NodeId) -> Vec<NodeId> {
        self.descendant_elements(self.tree_root(form))
            .into_iter()
            .filter(|n| self.is_listed(*n) && self.form_owner(*n) == Some(form))
            .collect()
    }

    /// `<label>` elements associated with a control
    pub fn labels(&self, id: NodeId) -> Vec<NodeId> {
        let mut labels = Vec::new();
        if let Some(element_id) = self.attr(id, "id").filter(|v| !v.is_empty()) {
            labels.extend(
                self.descendant_elements(self.tree_root(id))
                    .into_iter()
                    .filter(|n| self.is_tag(*n, "label") && self.attr(*n, "for") == Some(element_id)),
            );
        }
        if let Some(wrapping) = self.ancestors(id).find(|n| self.is_tag(*n, "label")) {
            let targets_other = self
                .attr(wrapping, "for")
                .is_some_and(|f| Some(f) != self.attr(id, "id"));
            if !targets_other && !labels.contains(&wrapping) {
                labels.push(wrapping);
            }
        }
        labels
    }

    /// `<option>` elements of a select
    pub fn select_options(&self, select: NodeId) -> Vec<NodeId> {
        self.descendant_elements(select)
            .into_iter()
            .filter(|n| self.is_tag(*n, "option"))
            .collect()
    }

    /// Option value: the `value` attribute, else its text
    pub fn option_value(&self, option: NodeId) -> String {
        match self.attr(option, "value") {
            Some(v) => v.to_string(),
            None => self.visible_text(option),
        }
    }

    // =========================================================================
    // Control state
    // =========================================================================

    /// Current `value` property
    pub fn value(&self, id: NodeId) -> String {
        if self.is_tag(id, "select") {
            let options = self.select_options(id);
            if let Some(selected) = options
                .iter()
                .find(|o| self.element(**o).is_some_and(|el| el.selected))
            {
                return self.option_value(*selected);
            }
            if let Some(raw) = self.element(id).map(|el| el.value.clone()).filter(|v| !v.is_empty()) {
                return raw;
            }
            return options
                .first()
                .map(|o| self.option_value(*o))
                .unwrap_or_default();
        }
        self.element(id).map(|el| el.value.clone()).unwrap_or_default()
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| el.checked)
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<()> {
        self.element_or_err(id)?.checked = checked;
        Ok(())
    }

    /// Write through the prototype's native setter, bypassing any property
    /// override a page framework installed
    pub fn set_value_native(&mut self, id: NodeId, value: &str) -> Result<()> {
        if self.is_tag(id, "select") {
            let options = self.select_options(id);
            let mut matched = false;
            for option in options {
                let is_match = !matched && self.option_value(option) == value;
                matched |= is_match;
                if let Some(el) = self.element_mut(option) {
                    el.selected = is_match;
                }
            }
            let el = self.element_or_err(id)?;
            el.value = if matched { String::new() } else { value.to_string() };
            return Ok(());
        }
        self.element_or_err(id)?.value = value.to_string();
        Ok(())
    }

    /// Write through the element's `value` property. Returns false when a
    /// framework override swallowed the write.
    pub fn set_value_property(&mut self, id: NodeId, value: &str) -> Result<bool> {
        if self.element_or_err(id)?.value_override {
            return Ok(false);
        }
        self.set_value_native(id, value)?;
        Ok(true)
    }

    /// Insert typed text at the end of the value, honouring `maxlength`.
    /// Returns the number of characters inserted.
    pub fn insert_text(&mut self, id: NodeId, text: &str) -> Result<usize> {
        let el = self.element_or_err(id)?;
        let limit = el
            .attr("maxlength")
            .and_then(|m| m.trim().parse::<usize>().ok());
        let current = el.value.chars().count();
        let room = limit.map(|l| l.saturating_sub(current)).unwrap_or(usize::MAX);
        let inserted: String = text.chars().take(room).collect();
        let count = inserted.chars().count();
        el.value.push_str(&inserted);
        Ok(count)
    }

    pub fn focus(&mut self, id: NodeId) {
        self.active_element = Some(id);
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Register a page listener
    pub fn add_listener<F>(&mut self, id: NodeId, kind: EventKind, listener: F)
    where
        F: Fn(&mut Document, &Event) + 'static,
    {
        self.listeners
            .entry((id, kind))
            .or_default()
            .push(Rc::new(listener));
    }

    /// Dispatch an event of `kind` at `target`. Returns false if a listener
    /// called `preventDefault`.
    pub fn dispatch(&mut self, target: NodeId, kind: EventKind) -> bool {
        self.dispatch_event(Event::new(kind, target))
    }

    /// Dispatch a prepared event along the composed path
    pub fn dispatch_event(&mut self, event: Event) -> bool {
        self.event_log.push(EventRecord {
            kind: event.kind,
            target: event.target,
            key: event.key.clone(),
        });

        let mut cursor = Some(event.target);
        while let Some(node) = cursor {
            let listeners = self
                .listeners
                .get(&(node, event.kind))
                .cloned()
                .unwrap_or_default();
            for listener in listeners {
                listener(self, &event);
            }
            if !event.kind.bubbles() {
                break;
            }
            cursor = self.composed_parent(node);
        }

        !event.default_prevented()
    }

    pub fn event_log(&self) -> &[EventRecord] {
        &self.event_log
    }

    /// Event kinds dispatched at `target`, in order
    pub fn events_on(&self, target: NodeId) -> Vec<EventKind> {
        self.event_log
            .iter()
            .filter(|r| r.target == target)
            .map(|r| r.kind)
            .collect()
    }

    pub fn event_count(&self, target: NodeId, kind: EventKind) -> usize {
        self.event_log
            .iter()
            .filter(|r| r.target == target && r.kind == kind)
            .count()
    }

    pub fn clear_event_log(&mut self) {
        self.event_log.clear();
    }

    // =========================================================================
    // Deferred page work
    // =========================================================================

    /// Schedule page work to run after `ticks` further task turns
    pub fn defer<F>(&mut self, ticks: u32, task: F)
    where
        F: FnOnce(&mut Document) + 'static,
    {
        self.tasks.push_back(DeferredTask {
            remaining: ticks,
            run: Box::new(task),
        });
    }

    /// Run one task turn. Returns how many tasks ran.
    pub fn run_pending_tasks(&mut self) -> usize {
        let due = std::mem::take(&mut self.tasks);
        let mut waiting = VecDeque::with_capacity(due.len());
        let mut ran = 0;

        for mut task in due {
            if task.remaining == 0 {
                (task.run)(self);
                ran += 1;
            } else {
                task.remaining -= 1;
                waiting.push_back(task);
            }
        }

        // Work scheduled by the tasks that just ran goes after the survivors
        waiting.extend(self.tasks.drain(..));
        self.tasks = waiting;
        ran
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn clear_pending_tasks(&mut self) {
        self.tasks.clear();
    }
}

/// Fluent element construction
pub struct ElementBuilder<'a> {
    doc: &'a mut Document,
    data: ElementData,
    text: Option<String>,
}

impl ElementBuilder<'_> {
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if name.eq_ignore_ascii_case("value") {
            self.data.value = value.to_string();
        }
        if name.eq_ignore_ascii_case("checked") {
            self.data.checked = true;
        }
        if name.eq_ignore_ascii_case("selected") {
            self.data.selected = true;
        }
        self.data.set_attr(name, value);
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Text child; also the initial value of a textarea
    pub fn text(mut self, text: &str) -> Self {
        if self.data.tag == "textarea" {
            self.data.value = text.to_string();
        }
        self.text = Some(text.to_string());
        self
    }

    pub fn checked(mut self) -> Self {
        self.data.checked = true;
        self
    }

    pub fn rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.data.rect = Rect::new(x, y, width, height);
        self
    }

    /// No layout box (`display: none`)
    pub fn unrendered(mut self) -> Self {
        self.data.rendered = false;
        self
    }

    /// Page framework overrides the `value` property setter
    pub fn value_override(mut self) -> Self {
        self.data.value_override = true;
        self
    }

    pub fn append_to(self, parent: NodeId) -> NodeId {
        let Self { doc, data, text } = self;
        let id = doc.insert_element(parent, data);
        if let Some(text) = text {
            doc.append_text(id, &text);
        }
        id
    }
}
