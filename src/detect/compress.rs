//! Compact per-field projection handed to the matching stage

use serde::{Deserialize, Serialize};

use super::model::{DetectedField, DetectedForm};
use crate::classify::{is_cryptic, normalize_text, FieldPurpose, FieldType};
use crate::identity::{FieldOpId, FormOpId};

/// What the matcher sees of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedFieldData {
    pub opid: FieldOpId,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub purpose: FieldPurpose,
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// What the matcher sees of one form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressedForm {
    pub opid: FormOpId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,
    pub fields: Vec<CompressedFieldData>,
}

impl From<&DetectedField> for CompressedFieldData {
    fn from(field: &DetectedField) -> Self {
        let meta = &field.metadata;

        let mut labels: Vec<String> = Vec::new();
        for label in meta.labels() {
            if !labels.iter().any(|l| l.eq_ignore_ascii_case(label)) {
                labels.push(label.to_string());
            }
        }

        let humanized = meta
            .name
            .as_deref()
            .or(meta.id.as_deref())
            .filter(|n| !is_cryptic(n))
            .map(normalize_text)
            .filter(|n| !n.is_empty());
        let context: Vec<&str> = [
            meta.placeholder.as_deref(),
            meta.helper_text.as_deref(),
            humanized.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|c| !labels.iter().any(|l| l.eq_ignore_ascii_case(c)))
        .collect();

        let options = meta
            .options
            .iter()
            .map(|o| {
                if o.label.is_empty() {
                    o.value.clone()
                } else {
                    o.label.clone()
                }
            })
            .filter(|o| !o.is_empty())
            .collect();

        Self {
            opid: field.opid.clone(),
            field_type: meta.field_type,
            purpose: meta.field_purpose,
            labels,
            context: (!context.is_empty()).then(|| context.join(" | ")),
            options,
        }
    }
}

pub fn compress_form(form: &DetectedForm) -> CompressedForm {
    CompressedForm {
        opid: form.opid.clone(),
        name: form.name.clone(),
        action: form.action.clone(),
        fields: form.fields.iter().map(CompressedFieldData::from).collect(),
    }
}

pub fn compress_forms(forms: &[DetectedForm]) -> Vec<CompressedForm> {
    forms.iter().map(compress_form).collect()
}
