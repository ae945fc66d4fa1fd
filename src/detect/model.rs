//! Detection pass output types

use serde::Serialize;

use crate::classify::{FieldMetadata, FieldType};
use crate::dom::NodeId;
use crate::identity::{FieldOpId, FormOpId};

/// One logical field found by a detection pass
///
/// For a merged radio/checkbox group `element` is the first member and
/// `metadata.options` lists every member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedField {
    pub opid: FieldOpId,
    #[serde(skip)]
    pub element: NodeId,
    pub metadata: FieldMetadata,
    pub form_opid: FormOpId,
}

impl DetectedField {
    pub fn field_type(&self) -> FieldType {
        self.metadata.field_type
    }

    /// Whether this field stands for several grouped elements
    pub fn is_group(&self) -> bool {
        matches!(self.metadata.field_type, FieldType::Radio | FieldType::Checkbox)
            && self.metadata.options.len() > 1
    }

    /// Every DOM element this field represents
    pub fn elements(&self) -> Vec<NodeId> {
        if self.is_group() {
            self.metadata
                .options
                .iter()
                .filter_map(|o| o.element)
                .collect()
        } else {
            vec![self.element]
        }
    }
}

/// A form, real or the synthetic standalone bucket
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedForm {
    pub opid: FormOpId,
    /// `None` for the standalone form
    #[serde(skip)]
    pub element: Option<NodeId>,
    pub action: String,
    pub method: String,
    pub name: Option<String>,
    pub fields: Vec<DetectedField>,
}

impl DetectedForm {
    pub fn is_standalone(&self) -> bool {
        self.opid.is_standalone()
    }
}

/// Key space a group name lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupNamespace {
    /// Inside a real form
    Form(FormOpId),
    /// Light-DOM fields outside any form
    Standalone,
    /// Fields found inside shadow roots
    Shadow,
}

/// Dedup key for radio and checkbox groups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub namespace: GroupNamespace,
    pub kind: FieldType,
    pub name: String,
}

impl GroupKey {
    pub fn new(namespace: GroupNamespace, kind: FieldType, name: impl Into<String>) -> Self {
        Self {
            namespace,
            kind,
            name: name.into(),
        }
    }
}
