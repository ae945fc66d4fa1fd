//! Detection integration tests
//!
//! Run with: cargo test --test detection

use std::collections::HashSet;
use std::time::Duration;

use memfill::{
    Document, EngineConfig, FieldPurpose, FieldType, FormDetector, NodeId, ShadowMode,
    STANDALONE_FORM_OPID,
};

/// `<form>` with a text field and a two-member radio group, plus a
/// standalone `<textarea id="bio">`
fn signup_page() -> Document {
    let mut doc = Document::new();
    let body = doc.body();
    let form = doc.create_element(body, "form");
    doc.build("input").attr("name", "first_name").append_to(form);
    for value in ["a", "b"] {
        doc.build("input")
            .attr("type", "radio")
            .attr("name", "plan")
            .attr("value", value)
            .append_to(form);
    }
    doc.build("textarea").id("bio").append_to(body);
    doc
}

/// Forms, radios, checkboxes, shadow roots and ARIA widgets mixed together
fn busy_page() -> Document {
    let mut doc = Document::new();
    let body = doc.body();

    let login = doc.build("form").attr("action", "/login").append_to(body);
    doc.build("input").attr("name", "username").append_to(login);
    doc.build("input").attr("type", "password").attr("name", "password").append_to(login);
    doc.build("input").attr("type", "submit").append_to(login);

    let survey = doc.create_element(body, "form");
    for value in ["yes", "no"] {
        doc.build("input")
            .attr("type", "radio")
            .attr("name", "answer")
            .attr("value", value)
            .append_to(survey);
    }
    for value in ["email", "sms"] {
        doc.build("input")
            .attr("type", "checkbox")
            .attr("name", "channel")
            .attr("value", value)
            .append_to(survey);
    }

    let host = doc.create_element(body, "x-address");
    let shadow = doc.attach_shadow(host, ShadowMode::Open);
    doc.build("input").attr("name", "city").append_to(shadow);
    let inner_host = doc.create_element(shadow, "x-zip");
    let inner = doc.attach_shadow(inner_host, ShadowMode::Open);
    doc.build("input").attr("name", "zip").append_to(inner);

    let combo = doc
        .build("div")
        .attr("role", "combobox")
        .attr("aria-label", "Country")
        .append_to(body);
    doc.build("div").attr("role", "option").text("France").append_to(combo);

    doc.build("input").attr("type", "hidden").attr("name", "csrf").append_to(body);
    doc
}

#[test]
fn test_signup_scenario() {
    let mut doc = signup_page();
    let forms = FormDetector::new(&EngineConfig::default()).detect_all(&mut doc);

    assert_eq!(forms.len(), 2);

    let named = &forms[0];
    assert!(!named.is_standalone());
    assert_eq!(named.fields.len(), 2);
    assert_eq!(named.fields[0].field_type(), FieldType::Text);
    assert_eq!(named.fields[0].metadata.field_purpose, FieldPurpose::FirstName);
    assert_eq!(named.fields[1].field_type(), FieldType::Radio);
    assert_eq!(named.fields[1].metadata.options.len(), 2);

    let standalone = &forms[1];
    assert_eq!(standalone.opid.as_str(), STANDALONE_FORM_OPID);
    assert!(standalone.element.is_none());
    assert_eq!(standalone.fields.len(), 1);
    assert_eq!(standalone.fields[0].metadata.id.as_deref(), Some("bio"));
    assert_eq!(standalone.fields[0].field_type(), FieldType::Textarea);
}

#[test]
fn test_identity_is_idempotent() {
    let mut doc = busy_page();
    let mut detector = FormDetector::new(&EngineConfig::default());

    let ids = |forms: &[memfill::DetectedForm]| -> Vec<(NodeId, String)> {
        forms
            .iter()
            .flat_map(|f| f.fields.iter())
            .map(|f| (f.element, f.opid.as_str().to_string()))
            .collect()
    };

    let first = ids(&detector.detect_all(&mut doc));
    let second = ids(&detector.detect_all(&mut doc));
    assert_eq!(first, second);

    // A fresh detector rehydrates from the DOM attributes
    let third = ids(&FormDetector::new(&EngineConfig::default()).detect_all(&mut doc));
    assert_eq!(first, third);
}

#[test]
fn test_no_element_detected_twice() {
    let mut doc = busy_page();
    let forms = FormDetector::new(&EngineConfig::default()).detect_all(&mut doc);

    let mut seen = HashSet::new();
    for field in forms.iter().flat_map(|f| f.fields.iter()) {
        for element in field.elements() {
            assert!(seen.insert(element), "{:?} detected twice", element);
        }
    }

    let opids: HashSet<_> = forms
        .iter()
        .flat_map(|f| f.fields.iter())
        .map(|f| f.opid.clone())
        .collect();
    assert_eq!(opids.len(), forms.iter().map(|f| f.fields.len()).sum::<usize>());
}

#[test]
fn test_radio_group_closure() {
    let mut doc = Document::new();
    let body = doc.body();
    let form = doc.create_element(body, "form");
    for value in ["xs", "s", "m", "l", "xl"] {
        doc.build("input")
            .attr("type", "radio")
            .attr("name", "size")
            .attr("value", value)
            .append_to(form);
    }
    // Same name in another form is a different group
    let other = doc.create_element(body, "form");
    doc.build("input")
        .attr("type", "radio")
        .attr("name", "size")
        .attr("value", "m")
        .append_to(other);

    let forms = FormDetector::new(&EngineConfig::default()).detect_all(&mut doc);
    assert_eq!(forms.len(), 2);

    let groups: Vec<_> = forms[0]
        .fields
        .iter()
        .filter(|f| f.field_type() == FieldType::Radio)
        .collect();
    assert_eq!(groups.len(), 1);
    let values: Vec<_> = groups[0].metadata.options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, ["xs", "s", "m", "l", "xl"]);

    assert_eq!(forms[1].fields.len(), 1);
    assert_ne!(forms[1].fields[0].opid, groups[0].opid);
}

#[test]
fn test_standalone_bucket() {
    let mut doc = busy_page();
    let forms = FormDetector::new(&EngineConfig::default()).detect_all(&mut doc);

    let standalone: Vec<_> = forms.iter().filter(|f| f.is_standalone()).collect();
    assert_eq!(standalone.len(), 1);
    assert_eq!(forms.last().map(|f| f.is_standalone()), Some(true));

    let names: Vec<_> = standalone[0]
        .fields
        .iter()
        .map(|f| {
            f.metadata
                .name
                .clone()
                .or_else(|| f.metadata.label_aria.clone())
                .unwrap_or_default()
        })
        .collect();
    // Light tree first, then shadow roots in discovery order
    assert_eq!(names, ["Country", "city", "zip"]);

    for form in forms.iter().filter(|f| !f.is_standalone()) {
        for field in &form.fields {
            let name = field.metadata.name.as_deref();
            assert!(!matches!(name, Some("city" | "zip" | "csrf")));
            assert_eq!(field.form_opid, form.opid);
        }
    }
}

#[test]
fn test_ignored_controls() {
    let mut doc = busy_page();
    let forms = FormDetector::new(&EngineConfig::default()).detect_all(&mut doc);

    let login = &forms[0];
    assert_eq!(login.action, "/login");
    assert_eq!(login.fields.len(), 2);
    assert_eq!(login.fields[1].metadata.field_purpose, FieldPurpose::Password);

    let all: Vec<_> = forms.iter().flat_map(|f| f.fields.iter()).collect();
    assert!(all.iter().all(|f| f.metadata.name.as_deref() != Some("csrf")));
    assert!(all.iter().all(|f| f.metadata.type_attr.as_deref() != Some("submit")));
}

#[test]
fn test_autocomplete_determinism() {
    let labels = ["Company", "Your phone", "Card number", "", "First name"];
    for label in labels {
        let mut doc = Document::new();
        let body = doc.body();
        doc.build("label").attr("for", "f").text(label).append_to(body);
        doc.build("input")
            .id("f")
            .attr("name", "a8f3e2c1b9d04f6e7a1b2c3d")
            .attr("autocomplete", "email")
            .append_to(body);

        let forms = FormDetector::new(&EngineConfig::default()).detect_all(&mut doc);
        assert_eq!(
            forms[0].fields[0].metadata.field_purpose,
            FieldPurpose::Email,
            "label {:?}",
            label
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_new_field_gets_new_opid() {
    let mut doc = Document::new();
    let body = doc.body();
    let form = doc.create_element(body, "form");
    let existing = doc.build("input").attr("name", "email").append_to(form);

    let mut detector = FormDetector::new(&EngineConfig::default());
    let before = detector.detect_all(&mut doc);
    let existing_opid = before[0].fields[0].opid.clone();

    tokio::time::sleep(Duration::from_millis(500)).await;
    let added = doc.build("input").attr("name", "phone").append_to(form);

    let after = detector.detect_all(&mut doc);
    let fields = &after[0].fields;
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].element, existing);
    assert_eq!(fields[0].opid, existing_opid);
    assert_eq!(fields[1].element, added);
    assert_ne!(fields[1].opid, existing_opid);
}

#[test]
fn test_cryptic_only_field_scores_zero() {
    let mut doc = Document::new();
    let body = doc.body();
    doc.build("input")
        .id("3f2b8c1e-9d4a-4e7b-8c2f-1a5d6e7f8091")
        .attr("name", "[d8e2a1f0][field3]")
        .append_to(body);

    let forms = FormDetector::new(&EngineConfig::default()).detect_all(&mut doc);
    let meta = &forms[0].fields[0].metadata;
    assert_eq!(meta.field_purpose, FieldPurpose::Unknown);
    assert_eq!(meta.label_quality, 0.0);
}
