//! Form Detection
//!
//! One [`FormDetector::detect_all`] pass walks the document and every open
//! shadow root, groups fields into their `<form>` or the synthetic
//! standalone form, and merges radio and checkbox groups into single
//! logical fields.

mod cache;
mod compress;
mod detector;
mod model;

pub use cache::FieldIndex;
pub use compress::{compress_form, compress_forms, CompressedFieldData, CompressedForm};
pub use detector::FormDetector;
pub use model::{DetectedField, DetectedForm, GroupKey, GroupNamespace};
