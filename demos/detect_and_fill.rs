//! Detect a checkout page spanning an iframe, then fill it
//!
//! Run with: cargo run --example detect_and_fill

use memfill::{
    CrossFrameAggregator, Document, EngineConfig, FrameContext, MatchResponse, Result, ShadowMode,
};

fn checkout_page() -> Document {
    let mut doc = Document::new();
    let (root, body) = (doc.root(), doc.body());
    doc.build("title").text("Checkout").append_to(root);

    let form = doc.build("form").attr("action", "/order").attr("method", "post").append_to(body);
    doc.build("label").attr("for", "fn").text("First name").append_to(form);
    doc.build("input").id("fn").attr("name", "fname").append_to(form);
    doc.build("input")
        .attr("type", "email")
        .attr("placeholder", "you@example.com")
        .append_to(form);

    let fieldset = doc.create_element(form, "fieldset");
    doc.build("legend").text("Delivery").append_to(fieldset);
    for (value, label) in [("std", "Standard"), ("exp", "Express")] {
        let wrapper = doc.create_element(fieldset, "label");
        doc.build("input")
            .attr("type", "radio")
            .attr("name", "delivery")
            .attr("value", value)
            .append_to(wrapper);
        doc.append_text(wrapper, label);
    }

    // Address widget rendered by a web component
    let host = doc.create_element(body, "address-widget");
    let shadow = doc.attach_shadow(host, ShadowMode::Open);
    doc.build("input")
        .attr("autocomplete", "postal-code")
        .attr("name", "f_93b1c0e2d8a74f6eb2c1")
        .append_to(shadow);
    doc
}

fn payment_frame() -> Document {
    let mut doc = Document::new();
    let body = doc.body();
    doc.build("input")
        .attr("autocomplete", "cc-number")
        .attr("aria-label", "Card number")
        .append_to(body);
    doc
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = EngineConfig::instant();
    let mut frames = vec![
        FrameContext::main("https://shop.example.com/checkout", checkout_page(), &config),
        FrameContext::new("12", "https://pay.example.net/card", payment_frame(), &config),
    ];

    let mut aggregator = CrossFrameAggregator::new();
    let view = aggregator.collect(&mut frames);
    println!(
        "Detected {} forms, {} fields across {} frames",
        view.forms.len(),
        view.total_fields(),
        view.frames.len()
    );
    println!("{}", serde_json::to_string_pretty(&view.forms)?);

    // What a matcher would answer for this page
    let response = MatchResponse::from_json(
        r#"{
            "mappings": [
                {"fieldOpid": "__0", "value": "Ada"},
                {"fieldOpid": "__1", "value": "ada@example.com"},
                {"fieldOpid": "__2", "value": "express"},
                {"fieldOpid": "__3", "value": "94103"},
                {"fieldOpid": "12:__0", "value": "4242 4242 4242 4242"},
                {"fieldOpid": "__99", "value": "ignored"}
            ],
            "confidence": 0.9
        }"#,
    )?;

    let report = aggregator.fill(&mut frames, &view, &response.mappings).await;
    println!("Filled: {:?}", report.filled);
    for skipped in &report.skipped {
        println!("Skipped {}: {}", skipped.field_opid, skipped.reason);
    }

    Ok(())
}
