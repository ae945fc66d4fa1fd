//! Fill integration tests
//!
//! Run with: cargo test --test fill

use memfill::{
    Document, EngineConfig, EventKind, FieldIndex, FieldOpId, FillExecutor, FillMapping,
    FormDetector, NodeId,
};

/// Detect, index, and return the opid stamped on `element`
fn detect(doc: &mut Document, config: &EngineConfig) -> FieldIndex {
    let forms = FormDetector::new(config).detect_all(doc);
    let mut index = FieldIndex::default();
    index.rebuild(&forms);
    index
}

fn opid_of(doc: &Document, element: NodeId) -> FieldOpId {
    FieldOpId::from(
        doc.attr(element, "data-memfill-opid")
            .expect("element was not stamped"),
    )
}

#[tokio::test]
async fn test_checkbox_true_fires_input_and_change_once() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let checkbox = doc
        .build("input")
        .attr("type", "checkbox")
        .attr("name", "terms")
        .append_to(body);
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, checkbox), "true");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert!(doc.checked(checkbox));
    assert_eq!(doc.event_count(checkbox, EventKind::Input), 1);
    assert_eq!(doc.event_count(checkbox, EventKind::Change), 1);
}

#[tokio::test]
async fn test_one_invalid_opid_among_valid_ones() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let form = doc.create_element(body, "form");
    let name = doc.build("input").attr("name", "name").append_to(form);
    let email = doc.build("input").attr("type", "email").append_to(form);
    let country = doc.build("select").attr("name", "country").append_to(form);
    doc.build("option").attr("value", "us").text("United States").append_to(country);
    doc.build("option").attr("value", "fr").text("France").append_to(country);
    let index = detect(&mut doc, &config);

    let mappings = [
        FillMapping::new(opid_of(&doc, name), "Ada Lovelace"),
        FillMapping::new(FieldOpId::from("__does_not_exist"), "x"),
        FillMapping::new(opid_of(&doc, email), "ada@example.com"),
        FillMapping::new(opid_of(&doc, country), "france"),
    ];
    let report = FillExecutor::new(&config).fill(&mut doc, &index, &mappings).await;

    assert_eq!(report.success_count(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].field_opid.as_str(), "__does_not_exist");
    assert!(!report.skipped[0].soft);
    assert_eq!(doc.value(name), "Ada Lovelace");
    assert_eq!(doc.value(email), "ada@example.com");
    assert_eq!(doc.value(country), "fr");
}

#[tokio::test]
async fn test_radio_selects_by_label() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let form = doc.create_element(body, "form");
    let mut radios = Vec::new();
    for (value, label) in [("m", "Monthly"), ("y", "Yearly")] {
        let wrapper = doc.create_element(form, "label");
        radios.push(
            doc.build("input")
                .attr("type", "radio")
                .attr("name", "billing")
                .attr("value", value)
                .append_to(wrapper),
        );
        doc.append_text(wrapper, label);
    }
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, radios[0]), "yearly");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert!(!doc.checked(radios[0]));
    assert!(doc.checked(radios[1]));
    assert_eq!(doc.event_count(radios[1], EventKind::Change), 1);
}

#[tokio::test]
async fn test_select_falls_back_to_raw_value() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let select = doc.build("select").attr("name", "state").append_to(body);
    doc.build("option").attr("value", "CA").text("California").append_to(select);
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, select), "Oregon");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.value(select), "Oregon");
}

#[tokio::test]
async fn test_select_matches_non_ascii_text_case_insensitively() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let select = doc.build("select").attr("name", "country").append_to(body);
    doc.build("option").attr("value", "fr").text("France").append_to(select);
    doc.build("option").attr("value", "us").text("États-Unis").append_to(select);
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, select), "ÉTATS-UNIS");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.value(select), "us");
}

#[tokio::test]
async fn test_checkbox_group_takes_comma_separated_choices() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let form = doc.create_element(body, "form");
    let mut boxes = Vec::new();
    for value in ["email", "sms", "post"] {
        boxes.push(
            doc.build("input")
                .attr("type", "checkbox")
                .attr("name", "channel")
                .attr("value", value)
                .append_to(form),
        );
    }
    let index = detect(&mut doc, &config);
    let opid = opid_of(&doc, boxes[0]);
    assert_eq!(opid_of(&doc, boxes[2]), opid);

    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[FillMapping::new(opid, "email, sms")])
        .await;

    assert_eq!(report.success_count(), 1);
    assert!(doc.checked(boxes[0]));
    assert!(doc.checked(boxes[1]));
    assert!(!doc.checked(boxes[2]));
    assert_eq!(doc.event_count(boxes[0], EventKind::Change), 1);
    assert_eq!(doc.event_count(boxes[1], EventKind::Change), 1);
    assert_eq!(doc.event_count(boxes[2], EventKind::Change), 0);
}

#[tokio::test]
async fn test_aria_radiogroup_clicks_matching_radio() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let group = doc
        .build("div")
        .attr("role", "radiogroup")
        .attr("aria-label", "Shipping speed")
        .append_to(body);
    let mut radios = Vec::new();
    for label in ["Standard", "Express"] {
        radios.push(
            doc.build("div")
                .attr("role", "radio")
                .attr("aria-checked", "false")
                .text(label)
                .append_to(group),
        );
    }
    // Page script owns the checked state
    for &radio in &radios {
        let all = radios.clone();
        doc.add_listener(radio, EventKind::Click, move |d, _| {
            for &other in &all {
                let state = if other == radio { "true" } else { "false" };
                let _ = d.set_attr(other, "aria-checked", state);
            }
        });
    }
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, group), "express");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.attr(radios[0], "aria-checked"), Some("false"));
    assert_eq!(doc.attr(radios[1], "aria-checked"), Some("true"));
    assert_eq!(doc.event_count(radios[1], EventKind::Click), 1);
}

#[tokio::test(start_paused = true)]
async fn test_text_typing_with_delays() {
    let config = EngineConfig::default();
    let mut doc = Document::new();
    let body = doc.body();
    let zip = doc
        .build("input")
        .attr("name", "zip")
        .attr("maxlength", "5")
        .attr("value", "old")
        .append_to(body);
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, zip), "941031234");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.value(zip), "94103");
    assert_eq!(doc.event_count(zip, EventKind::KeyDown), 9);
    assert_eq!(doc.event_count(zip, EventKind::Change), 1);
}

#[tokio::test]
async fn test_text_falls_back_to_native_setter() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let input = doc
        .build("input")
        .attr("name", "company")
        .value_override()
        .append_to(body);
    // Page swallows every keystroke
    doc.add_listener(input, EventKind::KeyDown, |_, event| event.prevent_default());
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, input), "Acme");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.value(input), "Acme");
    assert_eq!(doc.event_count(input, EventKind::Input), 1);
}

/// A combobox that opens two task turns after a click and renders its
/// options (one parked off-screen) on open
fn animated_combobox(doc: &mut Document) -> NodeId {
    let body = doc.body();
    let combo = doc
        .build("div")
        .attr("role", "combobox")
        .attr("aria-label", "Country")
        .attr("aria-expanded", "false")
        .attr("aria-controls", "country-list")
        .append_to(body);
    let list = doc
        .build("ul")
        .id("country-list")
        .attr("role", "listbox")
        .unrendered()
        .append_to(body);
    doc.build("li")
        .attr("role", "option")
        .attr("data-value", "fr")
        .text("France")
        .rect(0.0, 5000.0, 160.0, 24.0)
        .append_to(list);
    let germany = doc
        .build("li")
        .attr("role", "option")
        .attr("data-value", "de")
        .text("Germany")
        .append_to(list);

    doc.add_listener(combo, EventKind::Click, move |d, _| {
        d.defer(2, move |d| {
            let _ = d.set_attr(combo, "aria-expanded", "true");
            let _ = d.set_rendered(list, true);
        });
    });
    doc.add_listener(germany, EventKind::Click, move |d, _| {
        let _ = d.set_attr(combo, "data-selected", "de");
        let _ = d.set_attr(combo, "aria-expanded", "false");
    });
    combo
}

#[tokio::test(start_paused = true)]
async fn test_aria_combobox_waits_for_open() {
    let config = EngineConfig::default();
    let mut doc = Document::new();
    let combo = animated_combobox(&mut doc);
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, combo), "germany");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.attr(combo, "data-selected"), Some("de"));
}

#[tokio::test(start_paused = true)]
async fn test_aria_combobox_skips_off_screen_options() {
    let config = EngineConfig::default();
    let mut doc = Document::new();
    let combo = animated_combobox(&mut doc);
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, combo), "France");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 0);
    assert!(report.skipped[0].soft);
    assert_eq!(doc.attr(combo, "data-selected"), None);
}

#[tokio::test(start_paused = true)]
async fn test_widget_that_never_opens_is_soft_skip() {
    let config = EngineConfig::default();
    let mut doc = Document::new();
    let body = doc.body();
    let combo = doc
        .build("div")
        .attr("role", "combobox")
        .attr("aria-expanded", "false")
        .append_to(body);
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, combo), "anything");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 0);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].soft);
    assert!(report.skipped[0].reason.contains("did not open"));
}

#[tokio::test]
async fn test_framework_select_uses_native_setter() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let widget = doc
        .build("div")
        .attr("role", "combobox")
        .attr("aria-label", "Size")
        .append_to(body);
    let hidden = doc
        .build("input")
        .attr("type", "hidden")
        .attr("name", "size")
        .value_override()
        .append_to(widget);
    let menu = doc.build("div").attr("role", "listbox").unrendered().append_to(widget);
    for (value, label) in [("s", "Small"), ("l", "Large")] {
        doc.build("div")
            .attr("role", "option")
            .attr("data-value", value)
            .text(label)
            .append_to(menu);
    }
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, widget), "large");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.value(hidden), "l");
    assert_eq!(doc.event_count(hidden, EventKind::Change), 1);
}

#[tokio::test]
async fn test_framework_select_types_when_no_option_matches() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let widget = doc.build("div").attr("role", "combobox").append_to(body);
    let hidden = doc
        .build("input")
        .attr("type", "hidden")
        .attr("name", "city")
        .append_to(widget);
    // Async-loaded options: the widget commits typed text on Enter
    doc.add_listener(widget, EventKind::KeyDown, move |d, event| {
        if event.key.as_deref() == Some("Enter") {
            let typed = d.value(event.target);
            let _ = d.set_value_native(hidden, &typed);
        }
    });
    let index = detect(&mut doc, &config);

    let mapping = FillMapping::new(opid_of(&doc, widget), "Lyon");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.value(hidden), "Lyon");
}

#[tokio::test]
async fn test_framework_select_with_search_input() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let form = doc.create_element(body, "form");
    let widget = doc.build("div").attr("role", "combobox").append_to(form);
    let search = doc.build("input").attr("aria-label", "Country").append_to(widget);
    let hidden = doc
        .build("input")
        .attr("type", "hidden")
        .attr("name", "country")
        .append_to(widget);
    let menu = doc.build("div").attr("role", "listbox").append_to(widget);
    for (value, label) in [("fr", "France"), ("de", "Germany")] {
        doc.build("div")
            .attr("role", "option")
            .attr("data-value", value)
            .text(label)
            .append_to(menu);
    }
    let index = detect(&mut doc, &config);

    // One field for the whole widget; the search input is part of it
    assert_eq!(index.len(), 1);
    assert_eq!(doc.attr(search, "data-memfill-opid"), None);

    let mapping = FillMapping::new(opid_of(&doc, widget), "France");
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &index, &[mapping])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.value(hidden), "fr");
    assert_eq!(doc.event_count(hidden, EventKind::Change), 1);
}

#[tokio::test]
async fn test_stale_cache_resolves_through_attribute() {
    let config = EngineConfig::instant();
    let mut doc = Document::new();
    let body = doc.body();
    let input = doc.build("input").attr("name", "email").append_to(body);
    detect(&mut doc, &config);
    let opid = opid_of(&doc, input);

    // Empty cache: the DOM attribute is the source of truth
    let report = FillExecutor::new(&config)
        .fill(&mut doc, &FieldIndex::default(), &[FillMapping::new(opid, "a@b.co")])
        .await;

    assert_eq!(report.success_count(), 1);
    assert_eq!(doc.value(input), "a@b.co");
}
