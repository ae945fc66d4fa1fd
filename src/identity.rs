//! Stable field and form identities
//!
//! Identities are stamped onto elements as data attributes. The attribute is
//! the durable half of the mapping: a later detection pass that finds it
//! reuses it instead of minting a new id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};
use crate::error::Result;

/// Reserved identity of the synthetic form holding fields outside any `<form>`
pub const STANDALONE_FORM_OPID: &str = "__form__standalone";

const FIELD_PREFIX: &str = "__";
const FORM_PREFIX: &str = "__form__";

/// Opaque field identity, unique within a page lifetime
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldOpId(String);

impl FieldOpId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldOpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldOpId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque form identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormOpId(String);

impl FormOpId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The synthetic standalone form
    pub fn standalone() -> Self {
        Self(STANDALONE_FORM_OPID.to_string())
    }

    pub fn is_standalone(&self) -> bool {
        self.0 == STANDALONE_FORM_OPID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FormOpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mints and rehydrates identities for one detector
///
/// Counters are instance state; two assigners never share a sequence.
#[derive(Debug, Clone)]
pub struct IdentityAssigner {
    field_attr: String,
    form_attr: String,
    next_field: u64,
    next_form: u64,
}

impl IdentityAssigner {
    /// Create an assigner stamping `data-<product>-opid` attributes
    pub fn new(product: &str) -> Self {
        Self {
            field_attr: format!("data-{}-opid", product),
            form_attr: format!("data-{}-form-opid", product),
            next_field: 0,
            next_form: 0,
        }
    }

    /// Attribute name carrying field identities
    pub fn field_attr(&self) -> &str {
        &self.field_attr
    }

    /// Attribute name carrying form identities
    pub fn form_attr(&self) -> &str {
        &self.form_attr
    }

    /// Identity already stamped on `element`, if any
    pub fn existing_field_opid(&self, doc: &Document, element: NodeId) -> Option<FieldOpId> {
        doc.attr(element, &self.field_attr)
            .filter(|v| !v.is_empty())
            .map(FieldOpId::from)
    }

    /// Reuse the stamped identity or mint and stamp a new one
    pub fn field_opid(&mut self, doc: &mut Document, element: NodeId) -> Result<FieldOpId> {
        if let Some(existing) = self.existing_field_opid(doc, element) {
            if let Some(n) = parse_sequence(existing.as_str(), FIELD_PREFIX) {
                self.next_field = self.next_field.max(n + 1);
            }
            return Ok(existing);
        }

        let opid = FieldOpId(format!("{}{}", FIELD_PREFIX, self.next_field));
        self.next_field += 1;
        doc.set_attr(element, &self.field_attr, opid.as_str())?;
        Ok(opid)
    }

    /// Reuse the stamped form identity or mint and stamp a new one
    pub fn form_opid(&mut self, doc: &mut Document, form: NodeId) -> Result<FormOpId> {
        if let Some(existing) = doc.attr(form, &self.form_attr).filter(|v| !v.is_empty()) {
            let existing = FormOpId::new(existing);
            if let Some(n) = parse_sequence(existing.as_str(), FORM_PREFIX) {
                self.next_form = self.next_form.max(n + 1);
            }
            return Ok(existing);
        }

        let opid = FormOpId(format!("{}{}", FORM_PREFIX, self.next_form));
        self.next_form += 1;
        doc.set_attr(form, &self.form_attr, opid.as_str())?;
        Ok(opid)
    }
}

/// Numeric suffix of an id minted with `prefix`
fn parse_sequence(id: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(prefix)?.parse().ok()
}
