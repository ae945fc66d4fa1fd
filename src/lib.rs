//! # Memfill
//!
//! Form detection, field classification and fill execution for autofill.
//!
//! Memfill walks a page document (including nested shadow roots), discovers
//! fillable fields, merges radio and checkbox groups, gives every field a
//! stable identity that survives re-detection, scores each field's semantic
//! purpose and label quality, and applies value mappings back onto the page
//! with the event sequences host frameworks expect.
//!
//! ## Features
//!
//! - **Stable identities** - `data-memfill-opid` attributes are the source of truth
//! - **Adversarial markup** - shadow roots, ARIA widgets, generated ids, iframes
//! - **Matcher-ready** - compact per-field projection for the matching stage
//! - **Best-effort fill** - one bad field never blocks the batch
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use memfill::{Document, EngineConfig, FieldIndex, FillExecutor, FillMapping, FormDetector};
//!
//! # async fn run() -> memfill::Result<()> {
//! let mut doc = Document::new();
//! let body = doc.body();
//! let form = doc.create_element(body, "form");
//! doc.build("input").attr("name", "email").append_to(form);
//!
//! let config = EngineConfig::default();
//! let mut detector = FormDetector::new(&config);
//! let forms = detector.detect_all(&mut doc);
//!
//! let mut index = FieldIndex::default();
//! index.rebuild(&forms);
//!
//! let opid = forms[0].fields[0].opid.clone();
//! let executor = FillExecutor::new(&config);
//! let report = executor
//!     .fill(&mut doc, &index, &[FillMapping::new(opid, "ada@example.com")])
//!     .await;
//! assert_eq!(report.filled.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use memfill::{EngineConfig, TypingSpeed};
//!
//! let config = EngineConfig {
//!     typing_speed: TypingSpeed::Fast,
//!     poll_attempts: 20,
//!     ..Default::default()
//! };
//! assert!(config.simulate_typing);
//! ```

pub mod classify;
pub mod detect;
pub mod dom;
pub mod error;
pub mod fill;
pub mod frame;
pub mod identity;

// Re-exports
pub use classify::{analyze_field, FieldMetadata, FieldOption, FieldPurpose, FieldType};
pub use detect::{
    compress_form, compress_forms, CompressedFieldData, CompressedForm, DetectedField,
    DetectedForm, FieldIndex, FormDetector,
};
pub use dom::{Document, Event, EventKind, NodeId, Rect, ShadowMode};
pub use error::{Error, Result};
pub use fill::{FillExecutor, FillMapping, FillReport, MatchResponse, SkippedField, TypingSpeed};
pub use frame::{
    AggregatedView, CrossFrameAggregator, DetectRequest, DetectResponse, FrameContext, FrameInfo,
    FrameMessage, FrameReply, WebsiteContext,
};
pub use identity::{FieldOpId, FormOpId, IdentityAssigner, STANDALONE_FORM_OPID};

use serde::Deserialize;

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Product name used in identity attributes (`data-<product>-opid`)
    pub product: String,
    /// Type text character by character instead of assigning it
    pub simulate_typing: bool,
    /// Keystroke cadence when typing is simulated
    pub typing_speed: TypingSpeed,
    /// Poll iterations while waiting for a widget to open
    pub poll_attempts: u32,
    /// Delay between polls
    pub poll_interval_ms: u64,
    /// Delay after opening a widget before reading its options
    pub open_delay_ms: u64,
    /// Keep unrendered radios/checkboxes whose label is rendered
    pub track_hidden_controls: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            product: "memfill".to_string(),
            simulate_typing: true,
            typing_speed: TypingSpeed::Normal,
            poll_attempts: 10,
            poll_interval_ms: 50,
            open_delay_ms: 100,
            track_hidden_controls: true,
        }
    }
}

impl EngineConfig {
    /// No delays anywhere; typing still dispatches per-key events
    pub fn instant() -> Self {
        Self {
            typing_speed: TypingSpeed::Instant,
            poll_interval_ms: 0,
            open_delay_ms: 0,
            ..Default::default()
        }
    }

    /// Parse a JSON config; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Attribute that opts an element out of detection
    pub fn skip_attr(&self) -> String {
        format!("data-{}-skip", self.product)
    }
}
