//! Caller-owned lookup caches over a detection pass

use std::collections::HashMap;

use super::model::{DetectedField, DetectedForm};
use crate::dom::{Document, NodeId};
use crate::identity::{FieldOpId, FormOpId};

/// Fast-lookup half of the identity mapping
///
/// The DOM attribute stays the source of truth: when the cache misses,
/// [`resolve_element`](Self::resolve_element) scans the document for it.
#[derive(Debug, Default, Clone)]
pub struct FieldIndex {
    by_field: HashMap<FieldOpId, DetectedField>,
    by_form: HashMap<FormOpId, DetectedForm>,
}

impl FieldIndex {
    /// Clear both caches and refill them from a full detection pass
    pub fn rebuild(&mut self, forms: &[DetectedForm]) {
        self.by_field.clear();
        self.by_form.clear();
        for form in forms {
            for field in &form.fields {
                self.by_field.insert(field.opid.clone(), field.clone());
            }
            self.by_form.insert(form.opid.clone(), form.clone());
        }
        tracing::trace!(
            "Field index rebuilt: {} fields, {} forms",
            self.by_field.len(),
            self.by_form.len()
        );
    }

    pub fn clear(&mut self) {
        self.by_field.clear();
        self.by_form.clear();
    }

    pub fn field(&self, opid: &FieldOpId) -> Option<&DetectedField> {
        self.by_field.get(opid)
    }

    pub fn form(&self, opid: &FormOpId) -> Option<&DetectedForm> {
        self.by_form.get(opid)
    }

    /// Form owning a field
    pub fn form_of(&self, field: &FieldOpId) -> Option<&DetectedForm> {
        self.by_field
            .get(field)
            .and_then(|f| self.by_form.get(&f.form_opid))
    }

    pub fn len(&self) -> usize {
        self.by_field.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_field.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &DetectedField> {
        self.by_field.values()
    }

    /// Live element for a field identity
    ///
    /// A cached element that left the document or lost its stamp is
    /// re-resolved through the attribute.
    pub fn resolve_element(&self, doc: &Document, attr: &str, opid: &FieldOpId) -> Option<NodeId> {
        if let Some(field) = self.by_field.get(opid) {
            let element = field.element;
            if doc.is_connected(element) && doc.attr(element, attr) == Some(opid.as_str()) {
                return Some(element);
            }
        }
        doc.find_by_attr(attr, opid.as_str())
    }
}
