//! Error types for memfill

use thiserror::Error;

/// Result type for memfill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for memfill
#[derive(Debug, Error)]
pub enum Error {
    /// Node handle does not belong to this document
    #[error("Node not found: {0}")]
    NodeNotFound(usize),

    /// Node exists but is not an element (text, shadow root, document)
    #[error("Node {0} is not an element")]
    NotAnElement(usize),

    /// Shadow root refused access (closed mode)
    #[error("Shadow root of <{host}> is not accessible")]
    ShadowRootInaccessible { host: String },

    /// No field carries the given opid, neither in the cache nor in the DOM
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Choice widget has no option matching the requested value
    #[error("No option matching '{value}' in {widget}")]
    NoMatchingOption { widget: String, value: String },

    /// Custom widget never reported `aria-expanded="true"`
    #[error("Widget did not open after {attempts} polls")]
    WidgetDidNotOpen { attempts: u32 },

    /// Fill attempt failed for a field
    #[error("Fill failed for {opid}: {reason}")]
    Fill { opid: String, reason: String },

    /// Frame not registered with the aggregator
    #[error("Frame not found: {0}")]
    FrameNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a fill error with context
    pub fn fill(opid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fill {
            opid: opid.into(),
            reason: reason.into(),
        }
    }

    /// Create a no-matching-option error
    pub fn no_option(widget: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NoMatchingOption {
            widget: widget.into(),
            value: value.into(),
        }
    }

    /// Create a shadow root access error
    pub fn shadow_inaccessible(host: impl Into<String>) -> Self {
        Self::ShadowRootInaccessible { host: host.into() }
    }

    /// Soft failures leave the field untouched and are expected on real pages
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Error::NoMatchingOption { .. } | Error::WidgetDidNotOpen { .. }
        )
    }
}
