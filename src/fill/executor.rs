//! Fill executor
//!
//! Applies `{fieldOpid, value}` mappings to the live document. Every field
//! is handled by the strategy its runtime shape calls for; a failure on one
//! field is logged and recorded, never propagated.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use super::poll::poll_until;
use super::typing::Typist;
use crate::classify::{framework_search_input, framework_value_input, option_label};
use crate::detect::FieldIndex;
use crate::dom::{Document, EventKind, NodeId};
use crate::error::{Error, Result};
use crate::identity::FieldOpId;
use crate::EngineConfig;

/// Values that check a checkbox
const TRUTHY: &[&str] = &["true", "on", "1", "yes", "checked"];

/// One value to write into one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillMapping {
    pub field_opid: FieldOpId,
    pub value: String,
}

impl FillMapping {
    pub fn new(field_opid: FieldOpId, value: impl Into<String>) -> Self {
        Self {
            field_opid,
            value: value.into(),
        }
    }
}

/// Matcher output; only `mappings` drives the fill
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub mappings: Vec<FillMapping>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl MatchResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A field left unfilled and why
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedField {
    pub field_opid: FieldOpId,
    pub reason: String,
    /// Expected on real pages (no matching option, widget never opened)
    pub soft: bool,
}

/// Outcome of a fill batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct FillReport {
    pub filled: Vec<FieldOpId>,
    pub skipped: Vec<SkippedField>,
}

impl FillReport {
    pub fn success_count(&self) -> usize {
        self.filled.len()
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: FillReport) {
        self.filled.extend(other.filled);
        self.skipped.extend(other.skipped);
    }
}

/// Runtime shape of a field element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldShape {
    Radio,
    Checkbox,
    Select,
    AriaRadioGroup,
    AriaCombobox,
    /// Custom select storing its value in a hidden native input
    FrameworkSelect { widget: NodeId, hidden: NodeId },
    Text,
}

impl FieldShape {
    fn of(doc: &Document, element: NodeId) -> Option<Self> {
        let el = doc.element(element)?;
        match el.tag.as_str() {
            "select" => return Some(FieldShape::Select),
            "textarea" => return Some(FieldShape::Text),
            "input" => {
                return match el.input_type().as_deref() {
                    Some("radio") => Some(FieldShape::Radio),
                    Some("checkbox") => Some(FieldShape::Checkbox),
                    _ => Some(
                        Self::enclosing_framework_select(doc, element).unwrap_or(FieldShape::Text),
                    ),
                };
            }
            _ => {}
        }
        match el.role().as_deref() {
            Some("radiogroup") => Some(FieldShape::AriaRadioGroup),
            Some("combobox" | "listbox") => Some(match framework_value_input(doc, element) {
                Some(hidden) => FieldShape::FrameworkSelect {
                    widget: element,
                    hidden,
                },
                None => FieldShape::AriaCombobox,
            }),
            _ => None,
        }
    }

    /// A search input inside a framework select fills through its widget
    fn enclosing_framework_select(doc: &Document, input: NodeId) -> Option<Self> {
        let widget = doc
            .ancestors(input)
            .find(|a| doc.role(*a).as_deref() == Some("combobox"))?;
        let hidden = framework_value_input(doc, widget).filter(|h| *h != input)?;
        Some(FieldShape::FrameworkSelect { widget, hidden })
    }
}

/// Lowercase, trim, collapse whitespace
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Letters and digits only; tolerates input masks that add punctuation
fn alnum(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Pick the candidate whose texts match `target`: exact first, then
/// containment either way
fn best_match(target: &str, candidates: &[(NodeId, Vec<String>)]) -> Option<NodeId> {
    let target = normalize(target);
    if target.is_empty() {
        return None;
    }
    let normalized: Vec<(NodeId, Vec<String>)> = candidates
        .iter()
        .map(|(node, texts)| {
            let texts = texts
                .iter()
                .map(|t| normalize(t))
                .filter(|t| !t.is_empty())
                .collect();
            (*node, texts)
        })
        .collect();

    normalized
        .iter()
        .find(|(_, texts)| texts.iter().any(|t| *t == target))
        .or_else(|| {
            normalized.iter().find(|(_, texts)| {
                texts
                    .iter()
                    .any(|t| t.contains(target.as_str()) || target.contains(t.as_str()))
            })
        })
        .map(|(node, _)| *node)
}

/// Applies value mappings to a document
pub struct FillExecutor {
    field_attr: String,
    simulate_typing: bool,
    typist: Typist,
    poll_attempts: u32,
    poll_interval: Duration,
    open_delay: Duration,
}

impl FillExecutor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            field_attr: format!("data-{}-opid", config.product),
            simulate_typing: config.simulate_typing,
            typist: Typist::new(config.typing_speed),
            poll_attempts: config.poll_attempts,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            open_delay: Duration::from_millis(config.open_delay_ms),
        }
    }

    /// Fill every mapping, best effort
    ///
    /// Never fails as a whole: each field either lands in `filled` or in
    /// `skipped` with its reason.
    pub async fn fill(
        &self,
        doc: &mut Document,
        index: &FieldIndex,
        mappings: &[FillMapping],
    ) -> FillReport {
        let mut report = FillReport::default();
        for mapping in mappings {
            match self.fill_one(doc, index, mapping).await {
                Ok(()) => {
                    tracing::debug!("Filled {}", mapping.field_opid);
                    report.filled.push(mapping.field_opid.clone());
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", mapping.field_opid, e);
                    report.skipped.push(SkippedField {
                        field_opid: mapping.field_opid.clone(),
                        soft: e.is_soft(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        tracing::debug!(
            "Fill finished: {} filled, {} skipped",
            report.filled.len(),
            report.skipped.len()
        );
        report
    }

    async fn fill_one(&self, doc: &mut Document, index: &FieldIndex, mapping: &FillMapping) -> Result<()> {
        let opid = &mapping.field_opid;
        let element = index
            .resolve_element(doc, &self.field_attr, opid)
            .ok_or_else(|| Error::FieldNotFound(opid.to_string()))?;

        if doc.has_attr(element, "disabled")
            || doc.has_attr(element, "readonly")
            || doc.attr(element, "aria-disabled") == Some("true")
        {
            return Err(Error::fill(opid.as_str(), "field is disabled or read-only"));
        }

        let shape = FieldShape::of(doc, element)
            .ok_or_else(|| Error::fill(opid.as_str(), "element is not fillable"))?;
        tracing::trace!("Filling {} as {:?}", opid, shape);

        let value = mapping.value.as_str();
        match shape {
            FieldShape::Radio => self.fill_radio(doc, element, opid, value),
            FieldShape::Checkbox => self.fill_checkbox(doc, element, opid, value),
            FieldShape::Select => self.fill_select(doc, element, value),
            FieldShape::AriaRadioGroup => self.fill_aria_radiogroup(doc, element, value).await,
            FieldShape::AriaCombobox => self.fill_aria_combobox(doc, element, value).await,
            FieldShape::FrameworkSelect { widget, hidden } => {
                self.fill_framework_select(doc, widget, hidden, value).await
            }
            FieldShape::Text => self.fill_text(doc, element, value).await,
        }
    }

    /// Elements stamped with `opid`; every member of a group carries it
    fn group_members(&self, doc: &Document, element: NodeId, opid: &FieldOpId) -> Vec<NodeId> {
        let members: Vec<NodeId> = doc
            .composed_elements(doc.root())
            .into_iter()
            .filter(|n| doc.attr(*n, &self.field_attr) == Some(opid.as_str()))
            .collect();
        if members.is_empty() {
            vec![element]
        } else {
            members
        }
    }

    fn choice_texts(doc: &Document, member: NodeId) -> Vec<String> {
        let mut texts = vec![option_label(doc, member)];
        texts.extend(doc.attr(member, "value").map(str::to_string));
        texts.extend(doc.attr(member, "data-value").map(str::to_string));
        texts.extend(doc.attr(member, "aria-label").map(str::to_string));
        texts
    }

    fn fill_radio(&self, doc: &mut Document, element: NodeId, opid: &FieldOpId, value: &str) -> Result<()> {
        let members = self.group_members(doc, element, opid);
        let candidates: Vec<(NodeId, Vec<String>)> = members
            .iter()
            .map(|m| (*m, Self::choice_texts(doc, *m)))
            .collect();
        let choice = best_match(value, &candidates)
            .ok_or_else(|| Error::no_option(format!("radio group {}", opid), value))?;

        for member in &members {
            doc.set_checked(*member, *member == choice)?;
        }
        doc.dispatch(choice, EventKind::Input);
        doc.dispatch(choice, EventKind::Change);
        Ok(())
    }

    fn fill_checkbox(&self, doc: &mut Document, element: NodeId, opid: &FieldOpId, value: &str) -> Result<()> {
        let members = self.group_members(doc, element, opid);

        if members.len() == 1 {
            let desired = TRUTHY.contains(&normalize(value).as_str());
            if doc.checked(element) != desired {
                doc.set_checked(element, desired)?;
                doc.dispatch(element, EventKind::Input);
                doc.dispatch(element, EventKind::Change);
            }
            return Ok(());
        }

        // Grouped checkboxes take a comma separated list of choices
        let candidates: Vec<(NodeId, Vec<String>)> = members
            .iter()
            .map(|m| (*m, Self::choice_texts(doc, *m)))
            .collect();
        let chosen: Vec<NodeId> = value
            .split(',')
            .filter_map(|part| best_match(part, &candidates))
            .collect();
        if chosen.is_empty() {
            return Err(Error::no_option(format!("checkbox group {}", opid), value));
        }
        for member in members {
            let desired = chosen.contains(&member);
            if doc.checked(member) != desired {
                doc.set_checked(member, desired)?;
                doc.dispatch(member, EventKind::Input);
                doc.dispatch(member, EventKind::Change);
            }
        }
        Ok(())
    }

    /// Option value, then option text, case-insensitive; otherwise the raw
    /// string becomes the value
    fn fill_select(&self, doc: &mut Document, element: NodeId, value: &str) -> Result<()> {
        let target = value.trim();
        let wanted = normalize(target);
        let options = doc.select_options(element);
        let matched = options
            .iter()
            .find(|o| normalize(&doc.option_value(**o)) == wanted)
            .or_else(|| {
                options
                    .iter()
                    .find(|o| normalize(&doc.visible_text(**o)) == wanted)
            })
            .map(|o| doc.option_value(*o));

        let assigned = match matched {
            Some(option_value) => option_value,
            None => {
                tracing::debug!("No option matches '{}', assigning raw value", target);
                target.to_string()
            }
        };
        if !doc.set_value_property(element, &assigned)? {
            doc.set_value_native(element, &assigned)?;
        }
        doc.dispatch(element, EventKind::Input);
        doc.dispatch(element, EventKind::Change);
        Ok(())
    }

    async fn fill_aria_radiogroup(&self, doc: &mut Document, element: NodeId, value: &str) -> Result<()> {
        let candidates: Vec<(NodeId, Vec<String>)> = doc
            .descendant_elements(element)
            .into_iter()
            .filter(|n| doc.role(*n).as_deref() == Some("radio") && doc.is_rendered(*n))
            .map(|n| (n, Self::choice_texts(doc, n)))
            .collect();
        let choice = best_match(value, &candidates)
            .ok_or_else(|| Error::no_option("radiogroup", value))?;

        self.typist.click(doc, choice).await;
        Ok(())
    }

    /// Click the widget open and wait for `aria-expanded="true"`
    async fn open_widget(&self, doc: &mut Document, widget: NodeId) -> Result<()> {
        if doc.attr(widget, "aria-expanded") == Some("true") {
            return Ok(());
        }
        self.typist.click(doc, widget).await;
        let opened = poll_until(doc, self.poll_attempts, self.poll_interval, |d| {
            d.attr(widget, "aria-expanded") == Some("true")
        })
        .await;
        if opened.is_none() {
            return Err(Error::WidgetDidNotOpen {
                attempts: self.poll_attempts,
            });
        }
        if !self.open_delay.is_zero() {
            sleep(self.open_delay).await;
        }
        // Let the open animation settle
        doc.run_pending_tasks();
        Ok(())
    }

    /// The popup listing a widget's options
    fn listbox_of(doc: &Document, widget: NodeId) -> NodeId {
        doc.attr(widget, "aria-controls")
            .or_else(|| doc.attr(widget, "aria-owns"))
            .and_then(|id| {
                doc.element_by_id(widget, id)
                    .or_else(|| doc.find_by_attr("id", id))
            })
            .unwrap_or(widget)
    }

    /// Rendered options inside the viewport; virtualized rows parked
    /// off-screen are not candidates
    fn visible_options(doc: &Document, listbox: NodeId) -> Vec<(NodeId, Vec<String>)> {
        let viewport = doc.viewport();
        doc.descendant_elements(listbox)
            .into_iter()
            .filter(|n| {
                doc.role(*n).as_deref() == Some("option")
                    && doc.is_rendered(*n)
                    && doc.rect(*n).intersects(&viewport)
            })
            .map(|n| {
                let mut texts = vec![doc.visible_text(n)];
                texts.extend(doc.attr(n, "data-value").map(str::to_string));
                texts.extend(doc.attr(n, "aria-label").map(str::to_string));
                (n, texts)
            })
            .collect()
    }

    async fn fill_aria_combobox(&self, doc: &mut Document, element: NodeId, value: &str) -> Result<()> {
        self.open_widget(doc, element).await?;

        let listbox = Self::listbox_of(doc, element);
        let options = Self::visible_options(doc, listbox);
        let Some(choice) = best_match(value, &options) else {
            self.typist.press_key(doc, element, "Escape").await;
            return Err(Error::no_option("combobox", value));
        };

        self.typist.click(doc, choice).await;
        doc.run_pending_tasks();
        Ok(())
    }

    /// Native setter on the hidden input when an option matches; typing
    /// plus Enter otherwise
    async fn fill_framework_select(
        &self,
        doc: &mut Document,
        element: NodeId,
        hidden: NodeId,
        value: &str,
    ) -> Result<()> {
        // Options may exist before opening (static markup) or only after
        let listbox = Self::listbox_of(doc, element);
        let known: Vec<(NodeId, Vec<String>)> = doc
            .descendant_elements(listbox)
            .into_iter()
            .filter(|n| doc.role(*n).as_deref() == Some("option"))
            .map(|n| {
                let mut texts = vec![doc.text_content(n)];
                texts.extend(doc.attr(n, "data-value").map(str::to_string));
                texts.extend(doc.attr(n, "aria-label").map(str::to_string));
                (n, texts)
            })
            .collect();

        if let Some(option) = best_match(value, &known) {
            let option_value = doc
                .attr(option, "data-value")
                .map(str::to_string)
                .unwrap_or_else(|| doc.visible_text(option));
            doc.set_value_native(hidden, &option_value)?;
            doc.dispatch(hidden, EventKind::Input);
            doc.dispatch(hidden, EventKind::Change);
            return Ok(());
        }

        tracing::debug!("No direct option for '{}', typing into the widget", value);
        let input = framework_search_input(doc, element, hidden).unwrap_or(element);
        self.typist.click(doc, input).await;
        self.typist.type_text(doc, input, value).await?;
        self.typist.press_key(doc, input, "Enter").await;
        doc.run_pending_tasks();

        if doc.value(hidden).is_empty() {
            return Err(Error::no_option("framework select", value));
        }
        Ok(())
    }

    /// Simulated typing, verified; native setter as the fallback
    async fn fill_text(&self, doc: &mut Document, element: NodeId, value: &str) -> Result<()> {
        if self.simulate_typing {
            doc.focus(element);
            doc.dispatch(element, EventKind::Focus);
            if !doc.value(element).is_empty() {
                doc.set_value_native(element, "")?;
                doc.dispatch(element, EventKind::Input);
            }

            self.typist.type_text(doc, element, value).await?;
            doc.dispatch(element, EventKind::Change);
            doc.dispatch(element, EventKind::Blur);

            let expected: String = match doc
                .attr(element, "maxlength")
                .and_then(|m| m.trim().parse::<usize>().ok())
            {
                Some(limit) => value.chars().take(limit).collect(),
                None => value.to_string(),
            };
            if alnum(&doc.value(element)) == alnum(&expected) {
                return Ok(());
            }
            tracing::debug!("Typed value did not stick, using the native setter");
        }

        doc.set_value_native(element, value)?;
        doc.dispatch(element, EventKind::Input);
        doc.dispatch(element, EventKind::Change);
        Ok(())
    }
}
