//! Label sources
//!
//! Four independent sources are collected for every field: the associated
//! `<label>`, ARIA labelling, text rendered above the field, and text
//! rendered to its left. None of them is assumed to exist.

use crate::dom::{Document, NodeId, NodeKind};

/// Longest label text kept; longer blocks are paragraphs, not labels
const MAX_LABEL_LEN: usize = 120;

/// Largest vertical gap (px) between a field and text above it
const MAX_ABOVE_GAP: f64 = 60.0;

/// Largest horizontal gap (px) between a field and text to its left
const MAX_LEFT_GAP: f64 = 220.0;

/// Tags whose text never labels another control
const NON_LABEL_TAGS: &[&str] = &[
    "select", "option", "optgroup", "textarea", "button", "script", "style", "template",
];

fn clean(text: String) -> Option<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = text.trim_end_matches([':', '*']).trim().to_string();
    if text.is_empty() || text.chars().count() > MAX_LABEL_LEN {
        None
    } else {
        Some(text)
    }
}

/// Text of a label element, skipping the text of controls nested in it
pub fn label_text(doc: &Document, label: NodeId) -> String {
    let mut parts = Vec::new();
    collect_label_text(doc, label, &mut parts);
    parts.join(" ")
}

fn collect_label_text(doc: &Document, node: NodeId, parts: &mut Vec<String>) {
    for child in doc.children(node) {
        match doc.node(*child).map(|n| &n.kind) {
            Ok(NodeKind::Text(text)) => parts.push(text.clone()),
            Ok(NodeKind::Element(el)) => {
                if el.rendered && !NON_LABEL_TAGS.contains(&el.tag.as_str()) {
                    collect_label_text(doc, *child, parts);
                }
            }
            _ => {}
        }
    }
}

/// Associated `<label>` elements (by `for` or by nesting)
pub fn from_label_tag(doc: &Document, field: NodeId) -> Option<String> {
    let texts: Vec<String> = doc
        .labels(field)
        .into_iter()
        .map(|label| label_text(doc, label))
        .collect();
    clean(texts.join(" "))
}

/// `aria-label`, else the texts referenced by `aria-labelledby`
pub fn from_aria(doc: &Document, field: NodeId) -> Option<String> {
    if let Some(label) = doc.attr(field, "aria-label").and_then(|l| clean(l.to_string())) {
        return Some(label);
    }
    let ids = doc.attr(field, "aria-labelledby")?;
    let texts: Vec<String> = ids
        .split_whitespace()
        .filter_map(|id| doc.element_by_id(field, id))
        .map(|n| doc.visible_text(n))
        .collect();
    clean(texts.join(" "))
}

/// Elements in the field's tree that carry their own text
fn text_bearing_elements(doc: &Document, field: NodeId) -> Vec<NodeId> {
    doc.descendant_elements(doc.tree_root(field))
        .into_iter()
        .filter(|n| {
            *n != field
                && !doc.contains(*n, field)
                && !doc.is_listed(*n)
                && doc.is_rendered(*n)
                && !doc.ancestors(*n).any(|a| {
                    doc.tag(a)
                        .is_some_and(|t| NON_LABEL_TAGS.contains(&t))
                })
                && doc.children(*n).iter().any(|c| {
                    matches!(doc.node(*c).map(|node| &node.kind),
                        Ok(NodeKind::Text(t)) if !t.trim().is_empty())
                })
        })
        .collect()
}

fn own_text(doc: &Document, node: NodeId) -> String {
    doc.children(node)
        .iter()
        .filter_map(|c| match doc.node(*c).map(|n| &n.kind) {
            Ok(NodeKind::Text(t)) => Some(t.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Nearest text rendered above the field, overlapping it horizontally;
/// falls back to the previous element sibling's text
pub fn from_above(doc: &Document, field: NodeId) -> Option<String> {
    let rect = doc.rect(field);
    if !rect.is_empty() {
        let nearest = text_bearing_elements(doc, field)
            .into_iter()
            .filter_map(|n| {
                let r = doc.rect(n);
                let gap = rect.y - r.bottom();
                (!r.is_empty() && gap >= 0.0 && gap <= MAX_ABOVE_GAP && r.overlaps_horizontally(&rect))
                    .then_some((gap, n))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((_, node)) = nearest {
            if let Some(text) = clean(own_text(doc, node)) {
                return Some(text);
            }
        }
    }

    let parent = doc.parent(field)?;
    let siblings = doc.children(parent);
    let pos = siblings.iter().position(|s| *s == field)?;
    siblings[..pos]
        .iter()
        .rev()
        .find(|s| doc.element(**s).is_some())
        .filter(|s| !doc.is_listed(**s) && !doc.is_tag(**s, "label"))
        .and_then(|s| clean(label_text(doc, *s)))
}

/// Nearest text rendered on the field's row to its left; falls back to a
/// text node immediately preceding the field
pub fn from_left(doc: &Document, field: NodeId) -> Option<String> {
    let rect = doc.rect(field);
    if !rect.is_empty() {
        let nearest = text_bearing_elements(doc, field)
            .into_iter()
            .filter_map(|n| {
                let r = doc.rect(n);
                let gap = rect.x - r.right();
                (!r.is_empty() && gap >= 0.0 && gap <= MAX_LEFT_GAP && r.overlaps_vertically(&rect))
                    .then_some((gap, n))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));
        if let Some((_, node)) = nearest {
            if let Some(text) = clean(own_text(doc, node)) {
                return Some(text);
            }
        }
    }

    let parent = doc.parent(field)?;
    let siblings = doc.children(parent);
    let pos = siblings.iter().position(|s| *s == field)?;
    let previous = *siblings[..pos]
        .iter()
        .rev()
        .find(|s| !matches!(doc.node(**s).map(|n| &n.kind), Ok(NodeKind::Text(t)) if t.trim().is_empty()))?;
    match doc.node(previous).map(|n| &n.kind) {
        Ok(NodeKind::Text(text)) => clean(text.clone()),
        _ => None,
    }
}

/// `aria-describedby` texts, else a following hint/help sibling
pub fn helper_text(doc: &Document, field: NodeId) -> Option<String> {
    if let Some(ids) = doc.attr(field, "aria-describedby") {
        let texts: Vec<String> = ids
            .split_whitespace()
            .filter_map(|id| doc.element_by_id(field, id))
            .map(|n| doc.visible_text(n))
            .collect();
        if let Some(text) = clean(texts.join(" ")) {
            return Some(text);
        }
    }

    let parent = doc.parent(field)?;
    let siblings = doc.children(parent);
    let pos = siblings.iter().position(|s| *s == field)?;
    siblings[pos + 1..]
        .iter()
        .find(|s| doc.element(**s).is_some())
        .filter(|s| {
            let class = doc.attr(**s, "class").unwrap_or("").to_ascii_lowercase();
            doc.is_tag(**s, "small")
                || ["help", "hint", "description", "helper"]
                    .iter()
                    .any(|k| class.contains(k))
        })
        .and_then(|s| clean(doc.visible_text(*s)))
}

/// Caption of a grouping container: `<legend>` of the enclosing fieldset, or
/// the ARIA label of an enclosing `role=radiogroup` / `role=group`
pub fn group_caption(doc: &Document, member: NodeId) -> Option<String> {
    for ancestor in doc.ancestors(member) {
        if doc.is_tag(ancestor, "fieldset") {
            let legend = doc
                .element_children(ancestor)
                .into_iter()
                .find(|c| doc.is_tag(*c, "legend"));
            if let Some(text) = legend.and_then(|l| clean(doc.visible_text(l))) {
                return Some(text);
            }
        }
        if matches!(doc.role(ancestor).as_deref(), Some("radiogroup" | "group")) {
            if let Some(text) = from_aria(doc, ancestor) {
                return Some(text);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_text_skips_nested_controls() {
        let mut doc = Document::new();
        let body = doc.body();
        let label = doc.build("label").text("Country").append_to(body);
        let select = doc.create_element(label, "select");
        doc.build("option").text("France").append_to(select);

        assert_eq!(from_label_tag(&doc, select).as_deref(), Some("Country"));
    }

    #[test]
    fn test_aria_labelledby() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.build("span").id("l1").text("Billing").append_to(body);
        doc.build("span").id("l2").text("ZIP").append_to(body);
        let input = doc
            .build("input")
            .attr("aria-labelledby", "l1 l2")
            .append_to(body);

        assert_eq!(from_aria(&doc, input).as_deref(), Some("Billing ZIP"));
    }

    #[test]
    fn test_above_and_left_by_layout() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.build("div").text("Phone number").rect(10.0, 0.0, 120.0, 18.0).append_to(body);
        doc.build("span").text("+1").rect(0.0, 30.0, 20.0, 24.0).append_to(body);
        doc.build("p").text("Unrelated").rect(10.0, -400.0, 120.0, 18.0).append_to(body);
        let input = doc.build("input").rect(30.0, 30.0, 200.0, 24.0).append_to(body);

        assert_eq!(from_above(&doc, input).as_deref(), Some("Phone number"));
        assert_eq!(from_left(&doc, input).as_deref(), Some("+1"));
    }

    #[test]
    fn test_dom_fallbacks() {
        let mut doc = Document::new();
        let body = doc.body();
        let row = doc.create_element(body, "div");
        doc.build("div").text("Company").append_to(row);
        doc.append_text(row, "Name: ");
        let input = doc.create_element(row, "input");
        doc.build("small").text("As registered").append_to(row);

        assert_eq!(from_above(&doc, input).as_deref(), Some("Company"));
        assert_eq!(from_left(&doc, input).as_deref(), Some("Name"));
        assert_eq!(helper_text(&doc, input).as_deref(), Some("As registered"));
    }

    #[test]
    fn test_group_caption_from_legend() {
        let mut doc = Document::new();
        let body = doc.body();
        let fieldset = doc.create_element(body, "fieldset");
        doc.build("legend").text("Preferred plan").append_to(fieldset);
        let radio = doc.build("input").attr("type", "radio").append_to(fieldset);

        assert_eq!(group_caption(&doc, radio).as_deref(), Some("Preferred plan"));
    }
}
