//! Field Classifier
//!
//! Turns one candidate element into [`FieldMetadata`]: raw attributes, four
//! independent label sources, validation flags, current state, a structural
//! [`FieldType`], a semantic [`FieldPurpose`], and a label-quality score.
//!
//! Classification never fails. A field that cannot be placed gets
//! `FieldPurpose::Unknown` and a low score; the matcher decides what to do.

pub mod cryptic;
pub mod labels;
pub mod vocabulary;

pub use cryptic::is_cryptic;
pub use vocabulary::{match_vocabulary, normalize_text};

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId, Rect};

/// Structural kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Tel,
    Url,
    Password,
    Number,
    Date,
    Search,
    Textarea,
    Select,
    Radio,
    Checkbox,
    /// ARIA combobox / listbox widget
    Combobox,
    /// ARIA radiogroup widget
    RadioGroup,
    Other,
}

impl FieldType {
    /// Native or ARIA choice widgets whose value comes from a fixed set
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldType::Select
                | FieldType::Radio
                | FieldType::Checkbox
                | FieldType::Combobox
                | FieldType::RadioGroup
        )
    }
}

/// Semantic purpose of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldPurpose {
    Name,
    #[serde(rename = "name-first")]
    FirstName,
    #[serde(rename = "name-last")]
    LastName,
    #[serde(rename = "name-middle")]
    MiddleName,
    Email,
    Phone,
    Address,
    AddressLine2,
    City,
    State,
    Zip,
    Country,
    Company,
    JobTitle,
    Website,
    Birthdate,
    Gender,
    Username,
    Password,
    CardNumber,
    CardExpiry,
    CardCvc,
    Message,
    #[default]
    Unknown,
}

/// One member of a grouped input, select, or ARIA choice widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub label: String,
    #[serde(skip)]
    pub element: Option<NodeId>,
}

/// Structural description of a field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub tag: String,
    pub id: Option<String>,
    pub name: Option<String>,
    pub class_name: Option<String>,
    /// Raw `type` attribute
    #[serde(rename = "type")]
    pub type_attr: Option<String>,
    pub role: Option<String>,
    pub field_type: FieldType,

    pub label_tag: Option<String>,
    pub label_aria: Option<String>,
    pub label_top: Option<String>,
    pub label_left: Option<String>,
    pub placeholder: Option<String>,
    pub helper_text: Option<String>,
    pub autocomplete: Option<String>,

    pub required: bool,
    pub disabled: bool,
    pub readonly: bool,
    pub max_length: Option<u32>,

    pub rect: Rect,
    pub value: String,
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,

    pub field_purpose: FieldPurpose,
    pub label_quality: f32,
}

impl FieldMetadata {
    /// Label sources in trust order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        [
            &self.label_tag,
            &self.label_aria,
            &self.label_top,
            &self.label_left,
        ]
        .into_iter()
        .filter_map(|l| l.as_deref())
        .filter(|l| !l.trim().is_empty())
    }

    pub fn has_label(&self) -> bool {
        self.labels().next().is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Structural type from tag, `type`, and `role`
pub fn field_type_of(doc: &Document, element: NodeId) -> FieldType {
    let Some(el) = doc.element(element) else {
        return FieldType::Other;
    };
    let role = el.role();
    match el.tag.as_str() {
        "select" => FieldType::Select,
        "textarea" => FieldType::Textarea,
        "input" => {
            if matches!(role.as_deref(), Some("combobox")) {
                return FieldType::Combobox;
            }
            match el.input_type().as_deref().unwrap_or("text") {
                "email" => FieldType::Email,
                "tel" => FieldType::Tel,
                "url" => FieldType::Url,
                "password" => FieldType::Password,
                "number" | "range" => FieldType::Number,
                "date" | "datetime-local" | "month" | "week" | "time" => FieldType::Date,
                "search" => FieldType::Search,
                "radio" => FieldType::Radio,
                "checkbox" => FieldType::Checkbox,
                _ => FieldType::Text,
            }
        }
        _ => match role.as_deref() {
            Some("combobox" | "listbox") => FieldType::Combobox,
            Some("radiogroup") => FieldType::RadioGroup,
            _ => FieldType::Other,
        },
    }
}

/// Hidden native input holding the committed value of a custom select
///
/// Framework selects render a `role=combobox` container around a search
/// input and a hidden (or unrendered) input that the form submits.
pub fn framework_value_input(doc: &Document, widget: NodeId) -> Option<NodeId> {
    doc.descendant_elements(widget).into_iter().find(|n| {
        doc.is_tag(*n, "input")
            && (doc
                .attr(*n, "type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("hidden"))
                || !doc.is_rendered(*n))
    })
}

/// The rendered input a user types into inside a framework select
pub fn framework_search_input(doc: &Document, widget: NodeId, hidden: NodeId) -> Option<NodeId> {
    doc.descendant_elements(widget)
        .into_iter()
        .find(|n| *n != hidden && doc.is_tag(*n, "input") && doc.is_rendered(*n))
}

/// Label shown for one option-like element
pub fn option_label(doc: &Document, option: NodeId) -> String {
    if let Some(label) = labels::from_label_tag(doc, option) {
        return label;
    }
    if let Some(label) = labels::from_aria(doc, option) {
        return label;
    }
    let text = doc.visible_text(option);
    if !text.is_empty() {
        return text;
    }
    // Radio followed by a bare text node: <input type=radio> Monthly
    doc.parent(option)
        .map(|p| doc.children(p))
        .and_then(|siblings| {
            let pos = siblings.iter().position(|s| *s == option)?;
            siblings.get(pos + 1).map(|next| doc.text_content(*next))
        })
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_default()
}

/// Options of selects and ARIA choice widgets
fn collect_options(doc: &Document, element: NodeId, field_type: FieldType) -> Vec<FieldOption> {
    match field_type {
        FieldType::Select => doc
            .select_options(element)
            .into_iter()
            .map(|o| FieldOption {
                value: doc.option_value(o),
                label: doc.visible_text(o),
                element: Some(o),
            })
            .collect(),
        FieldType::RadioGroup => doc
            .descendant_elements(element)
            .into_iter()
            .filter(|n| doc.role(*n).as_deref() == Some("radio"))
            .map(|r| FieldOption {
                value: doc
                    .attr(r, "data-value")
                    .map(str::to_string)
                    .unwrap_or_else(|| option_label(doc, r)),
                label: option_label(doc, r),
                element: Some(r),
            })
            .collect(),
        FieldType::Combobox => {
            // Options are usually rendered only while open; take what exists
            let listbox = doc
                .attr(element, "aria-controls")
                .or_else(|| doc.attr(element, "aria-owns"))
                .and_then(|id| doc.element_by_id(element, id))
                .unwrap_or(element);
            doc.descendant_elements(listbox)
                .into_iter()
                .filter(|n| doc.role(*n).as_deref() == Some("option"))
                .map(|o| FieldOption {
                    value: doc
                        .attr(o, "data-value")
                        .map(str::to_string)
                        .unwrap_or_else(|| doc.visible_text(o)),
                    label: doc.visible_text(o),
                    element: Some(o),
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Extract metadata for a single field element
///
/// Reads the element's current DOM state; never mutates the document.
pub fn analyze_field(doc: &Document, element: NodeId) -> FieldMetadata {
    let Some(el) = doc.element(element) else {
        return FieldMetadata {
            field_type: FieldType::Other,
            ..Default::default()
        };
    };

    let field_type = field_type_of(doc, element);
    let mut meta = FieldMetadata {
        tag: el.tag.clone(),
        id: non_empty(el.attr("id")),
        name: non_empty(el.attr("name")),
        class_name: non_empty(el.attr("class")),
        type_attr: non_empty(el.attr("type")),
        role: el.role(),
        field_type,
        label_tag: labels::from_label_tag(doc, element),
        label_aria: labels::from_aria(doc, element),
        label_top: labels::from_above(doc, element),
        label_left: labels::from_left(doc, element),
        placeholder: non_empty(el.attr("placeholder")),
        helper_text: labels::helper_text(doc, element),
        autocomplete: non_empty(el.attr("autocomplete")),
        required: el.has_attr("required") || el.attr("aria-required") == Some("true"),
        disabled: el.has_attr("disabled") || el.attr("aria-disabled") == Some("true"),
        readonly: el.has_attr("readonly") || el.attr("aria-readonly") == Some("true"),
        max_length: el
            .attr("maxlength")
            .and_then(|m| m.trim().parse::<u32>().ok()),
        rect: el.rect,
        value: doc.value(element),
        checked: el.checked,
        options: collect_options(doc, element, field_type),
        field_purpose: FieldPurpose::Unknown,
        label_quality: 0.0,
    };

    // Framework select: the hidden input carries the name and the value,
    // the search input carries the label
    if field_type == FieldType::Combobox && meta.tag != "input" {
        if let Some(hidden) = framework_value_input(doc, element) {
            meta.name = meta.name.or_else(|| non_empty(doc.attr(hidden, "name")));
            meta.value = doc.value(hidden);
            if meta.label_tag.is_none() {
                meta.label_tag = framework_search_input(doc, element, hidden)
                    .and_then(|input| labels::from_label_tag(doc, input));
            }
        }
    }

    meta.field_purpose = infer_purpose(&meta);
    meta.label_quality = label_quality(&meta);
    meta
}

/// Metadata for a radio or checkbox group, represented by its first member
///
/// Member labels become option labels; the group itself is labelled by its
/// fieldset legend or grouping container when one exists.
pub fn analyze_group(doc: &Document, members: &[NodeId]) -> FieldMetadata {
    let Some(&first) = members.first() else {
        return analyze_field(doc, NodeId(usize::MAX));
    };
    let mut meta = analyze_field(doc, first);

    meta.options = members
        .iter()
        .map(|m| FieldOption {
            value: doc
                .attr(*m, "value")
                .map(str::to_string)
                .unwrap_or_else(|| "on".to_string()),
            label: option_label(doc, *m),
            element: Some(*m),
        })
        .collect();
    meta.checked = members.iter().any(|m| doc.checked(*m));
    meta.value = members
        .iter()
        .filter(|m| doc.checked(**m))
        .filter_map(|m| doc.attr(*m, "value"))
        .collect::<Vec<_>>()
        .join(",");

    // The first member's own label names an option, not the group
    meta.label_tag = labels::group_caption(doc, first);
    meta.label_left = None;
    if meta.label_aria.is_none() {
        meta.label_aria = doc
            .ancestors(first)
            .find(|a| doc.role(*a).as_deref() == Some("radiogroup"))
            .and_then(|g| labels::from_aria(doc, g));
    }

    meta.field_purpose = infer_purpose(&meta);
    meta.label_quality = label_quality(&meta);
    meta
}

/// Layered purpose inference: autocomplete, then input type, then the
/// vocabulary over labels, identifiers, and placeholder/helper text
pub fn infer_purpose(meta: &FieldMetadata) -> FieldPurpose {
    if let Some(purpose) = meta
        .autocomplete
        .as_deref()
        .and_then(vocabulary::purpose_from_autocomplete)
    {
        return purpose;
    }

    if let Some(purpose) = meta
        .type_attr
        .as_deref()
        .and_then(vocabulary::purpose_from_input_type)
    {
        return purpose;
    }

    // Word-boundary matching already rejects generated identifiers
    let identifiers = [meta.name.as_deref(), meta.id.as_deref()]
        .into_iter()
        .flatten();
    let context = [meta.placeholder.as_deref(), meta.helper_text.as_deref()]
        .into_iter()
        .flatten();

    meta.labels()
        .chain(identifiers)
        .chain(context)
        .find_map(match_vocabulary)
        .unwrap_or(FieldPurpose::Unknown)
}

/// Label quality in 0..=1
///
/// +0.5 for any label, +0.3 for a known purpose, +0.2 for context
/// (placeholder, helper text, or a readable name/id). Zero when no label
/// exists and every name/id present is cryptic; a missing identifier is
/// not generated noise and does not trigger the zero.
pub fn label_quality(meta: &FieldMetadata) -> f32 {
    let has_label = meta.has_label();
    let identifiers: Vec<&str> = [meta.name.as_deref(), meta.id.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();
    let readable_identifier = identifiers.iter().any(|v| !is_cryptic(v));

    if !has_label && !identifiers.is_empty() && !readable_identifier {
        return 0.0;
    }

    let mut score: f32 = 0.0;
    if has_label {
        score += 0.5;
    }
    if meta.field_purpose != FieldPurpose::Unknown {
        score += 0.3;
    }
    let has_context =
        meta.placeholder.is_some() || meta.helper_text.is_some() || readable_identifier;
    if has_context {
        score += 0.2;
    }
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_autocomplete_beats_label_noise() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.build("label").attr("for", "x").text("Company website").append_to(body);
        let input = doc
            .build("input")
            .id("x")
            .attr("autocomplete", "email")
            .append_to(body);

        let meta = analyze_field(&doc, input);
        assert_eq!(meta.field_purpose, FieldPurpose::Email);
        assert_eq!(meta.label_tag.as_deref(), Some("Company website"));
    }

    #[test]
    fn test_type_then_vocabulary() {
        let mut doc = Document::new();
        let body = doc.body();
        let tel = doc.build("input").attr("type", "tel").append_to(body);
        let surname = doc.build("input").attr("name", "surname").append_to(body);
        let by_placeholder = doc
            .build("input")
            .attr("placeholder", "Postal code")
            .append_to(body);

        assert_eq!(analyze_field(&doc, tel).field_purpose, FieldPurpose::Phone);
        assert_eq!(analyze_field(&doc, surname).field_purpose, FieldPurpose::LastName);
        assert_eq!(analyze_field(&doc, by_placeholder).field_purpose, FieldPurpose::Zip);
    }

    #[test]
    fn test_label_quality_full_score() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.build("label").attr("for", "fn").text("First name").append_to(body);
        let input = doc
            .build("input")
            .id("fn")
            .attr("name", "first_name")
            .append_to(body);

        let meta = analyze_field(&doc, input);
        assert_eq!(meta.field_purpose, FieldPurpose::FirstName);
        assert!(approx(meta.label_quality, 1.0));
    }

    #[test]
    fn test_label_quality_zero_for_cryptic_unlabelled() {
        let mut doc = Document::new();
        let body = doc.body();
        let input = doc
            .build("input")
            .id("3f2b8c1e-9d4a-4e7b-8c2f-1a5d6e7f8091")
            .attr("name", "field_83920417")
            .attr("placeholder", "Enter value")
            .append_to(body);

        let meta = analyze_field(&doc, input);
        assert_eq!(meta.field_purpose, FieldPurpose::Unknown);
        assert!(approx(meta.label_quality, 0.0));
    }

    #[test]
    fn test_label_quality_without_identifiers() {
        let mut doc = Document::new();
        let body = doc.body();
        let input = doc
            .build("input")
            .attr("type", "email")
            .attr("placeholder", "Email address")
            .append_to(body);

        let meta = analyze_field(&doc, input);
        assert_eq!(meta.field_purpose, FieldPurpose::Email);
        // purpose and placeholder context, no label
        assert!(approx(meta.label_quality, 0.5));
    }

    #[test]
    fn test_camel_case_name_feeds_purpose() {
        let mut doc = Document::new();
        let body = doc.body();
        let input = doc.build("input").attr("name", "shippingAddress1").append_to(body);

        let meta = analyze_field(&doc, input);
        assert_eq!(meta.field_purpose, FieldPurpose::Address);
        assert!(approx(meta.label_quality, 0.5));
    }

    #[test]
    fn test_label_quality_partial() {
        let mut doc = Document::new();
        let body = doc.body();
        let input = doc.build("input").attr("name", "nickname_color").append_to(body);

        let meta = analyze_field(&doc, input);
        // readable name gives context, no label, no purpose
        assert_eq!(meta.field_purpose, FieldPurpose::Unknown);
        assert!(approx(meta.label_quality, 0.2));
    }

    #[test]
    fn test_metadata_flags_and_options() {
        let mut doc = Document::new();
        let body = doc.body();
        let select = doc
            .build("select")
            .attr("name", "country")
            .attr("required", "")
            .append_to(body);
        doc.build("option").attr("value", "").text("Choose...").append_to(select);
        doc.build("option").attr("value", "fr").text("France").append_to(select);
        let input = doc
            .build("input")
            .attr("maxlength", "5")
            .attr("readonly", "")
            .attr("disabled", "")
            .append_to(body);

        let meta = analyze_field(&doc, select);
        assert_eq!(meta.field_type, FieldType::Select);
        assert_eq!(meta.field_purpose, FieldPurpose::Country);
        assert!(meta.required);
        assert_eq!(meta.options.len(), 2);
        assert_eq!(meta.options[1].label, "France");

        let meta = analyze_field(&doc, input);
        assert!(meta.readonly && meta.disabled);
        assert_eq!(meta.max_length, Some(5));
    }

    #[test]
    fn test_group_metadata() {
        let mut doc = Document::new();
        let body = doc.body();
        let fieldset = doc.create_element(body, "fieldset");
        doc.build("legend").text("Gender").append_to(fieldset);
        let label_f = doc.create_element(fieldset, "label");
        let f = doc
            .build("input")
            .attr("type", "radio")
            .attr("name", "g")
            .attr("value", "f")
            .append_to(label_f);
        doc.append_text(label_f, "Female");
        let m = doc
            .build("input")
            .attr("type", "radio")
            .attr("name", "g")
            .attr("value", "m")
            .checked()
            .append_to(fieldset);
        doc.append_text(fieldset, " Male");

        let meta = analyze_group(&doc, &[f, m]);
        assert_eq!(meta.label_tag.as_deref(), Some("Gender"));
        assert_eq!(meta.field_purpose, FieldPurpose::Gender);
        assert_eq!(meta.options.len(), 2);
        assert_eq!(meta.options[0].label, "Female");
        assert_eq!(meta.options[1].label, "Male");
        assert_eq!(meta.value, "m");
        assert!(meta.checked);
    }

    #[test]
    fn test_field_types() {
        let mut doc = Document::new();
        let body = doc.body();
        let combo = doc.build("div").attr("role", "combobox").append_to(body);
        let group = doc.build("div").attr("role", "radiogroup").append_to(body);
        let date = doc.build("input").attr("type", "date").append_to(body);
        let input_combo = doc.build("input").attr("role", "combobox").append_to(body);

        assert_eq!(field_type_of(&doc, combo), FieldType::Combobox);
        assert_eq!(field_type_of(&doc, group), FieldType::RadioGroup);
        assert_eq!(field_type_of(&doc, date), FieldType::Date);
        assert_eq!(field_type_of(&doc, input_combo), FieldType::Combobox);
        assert!(FieldType::RadioGroup.is_choice());
    }
}
