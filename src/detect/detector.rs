//! Tree walker and form detector

use std::collections::{HashSet, VecDeque};

use smallvec::SmallVec;

use super::model::{DetectedField, DetectedForm, GroupKey, GroupNamespace};
use crate::classify::{
    analyze_field, analyze_group, field_type_of, framework_value_input, FieldMetadata, FieldType,
};
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::identity::{FieldOpId, FormOpId, IdentityAssigner};
use crate::EngineConfig;

/// Input types that never hold user data
const IGNORED_INPUT_TYPES: &[&str] = &["hidden", "submit", "reset", "button", "image", "file"];

/// Native controls that can be fields
const NATIVE_CONTROLS: &[&str] = &["input", "select", "textarea"];

/// Roles that make a non-native element a field
const WIDGET_ROLES: &[&str] = &["combobox", "listbox", "radiogroup"];

/// Group members; most groups are small
type Members = SmallVec<[NodeId; 8]>;

struct PendingGroup {
    kind: FieldType,
    name: String,
    members: Members,
}

/// Radio/checkbox members buffered until the end of their scope
#[derive(Default)]
struct GroupBuffer {
    groups: Vec<PendingGroup>,
}

impl GroupBuffer {
    fn push(&mut self, kind: FieldType, name: &str, element: NodeId) {
        match self
            .groups
            .iter_mut()
            .find(|g| g.kind == kind && g.name == name)
        {
            Some(group) => group.members.push(element),
            None => self.groups.push(PendingGroup {
                kind,
                name: name.to_string(),
                members: smallvec::smallvec![element],
            }),
        }
    }
}

/// Walks a document and produces [`DetectedForm`]s
///
/// Holds its own identity counters; per-pass state is reset by every
/// [`detect_all`](Self::detect_all) call. Not meant to be called
/// concurrently with itself.
pub struct FormDetector {
    ids: IdentityAssigner,
    skip_attr: String,
    track_hidden_controls: bool,
    visited: HashSet<NodeId>,
    groups_seen: HashSet<GroupKey>,
    shadow_staging: VecDeque<NodeId>,
    issued_fields: HashSet<FieldOpId>,
    issued_forms: HashSet<FormOpId>,
}

impl FormDetector {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            ids: IdentityAssigner::new(&config.product),
            skip_attr: config.skip_attr(),
            track_hidden_controls: config.track_hidden_controls,
            visited: HashSet::new(),
            groups_seen: HashSet::new(),
            shadow_staging: VecDeque::new(),
            issued_fields: HashSet::new(),
            issued_forms: HashSet::new(),
        }
    }

    /// The identity assigner (attribute names, counters)
    pub fn identities(&self) -> &IdentityAssigner {
        &self.ids
    }

    fn reset(&mut self) {
        self.visited.clear();
        self.groups_seen.clear();
        self.shadow_staging.clear();
        self.issued_fields.clear();
        self.issued_forms.clear();
    }

    /// Detect every form on the page
    ///
    /// Real forms come first in document order, followed by the standalone
    /// form when any field lives outside a form. Identities already stamped
    /// on elements are reused.
    pub fn detect_all(&mut self, doc: &mut Document) -> Vec<DetectedForm> {
        self.reset();

        let form_elements: Vec<NodeId> = doc
            .descendant_elements(doc.root())
            .into_iter()
            .filter(|n| doc.is_tag(*n, "form"))
            .collect();

        let mut forms = Vec::with_capacity(form_elements.len() + 1);
        for form in &form_elements {
            match self.detect_form(doc, *form) {
                Ok(detected) => forms.push(detected),
                Err(e) => tracing::warn!("Skipping form {:?}: {}", form, e),
            }
        }

        let standalone = self.detect_standalone(doc, &form_elements);
        if !standalone.is_empty() {
            forms.push(DetectedForm {
                opid: FormOpId::standalone(),
                element: None,
                action: String::new(),
                method: "get".to_string(),
                name: None,
                fields: standalone,
            });
        }

        tracing::debug!(
            "Detected {} forms with {} fields",
            forms.len(),
            forms.iter().map(|f| f.fields.len()).sum::<usize>()
        );
        forms
    }

    fn detect_form(&mut self, doc: &mut Document, form: NodeId) -> Result<DetectedForm> {
        let opid = self.claim_form_opid(doc, form)?;

        // The form's controls list, plus ARIA widgets nested in the form
        let candidates: Vec<NodeId> = doc
            .descendant_elements(doc.tree_root(form))
            .into_iter()
            .filter(|n| {
                (doc.is_listed(*n) && doc.form_owner(*n) == Some(form))
                    || (doc.contains(form, *n) && self.is_aria_widget(doc, *n))
            })
            .collect();

        let mut fields = Vec::new();
        let mut groups = GroupBuffer::default();
        for element in candidates {
            self.visit(doc, element, &opid, &mut groups, &mut fields);
        }
        self.flush_groups(doc, GroupNamespace::Form(opid.clone()), &opid, groups, &mut fields);

        tracing::trace!("Form {} has {} fields", opid, fields.len());
        Ok(DetectedForm {
            action: doc.attr(form, "action").unwrap_or_default().to_string(),
            method: doc
                .attr(form, "method")
                .map(|m| m.to_ascii_lowercase())
                .unwrap_or_else(|| "get".to_string()),
            name: doc
                .attr(form, "name")
                .or_else(|| doc.attr(form, "id"))
                .map(str::to_string),
            opid,
            element: Some(form),
            fields,
        })
    }

    /// Fields outside every processed form, light tree first, then each
    /// staged shadow root in discovery order
    fn detect_standalone(&mut self, doc: &mut Document, forms: &[NodeId]) -> Vec<DetectedField> {
        let standalone = FormOpId::standalone();
        let mut fields = Vec::new();

        let mut groups = GroupBuffer::default();
        for element in doc.descendant_elements(doc.root()) {
            self.stage_shadow_root(doc, element);
            if forms.iter().any(|f| doc.contains(*f, element)) {
                continue;
            }
            self.visit(doc, element, &standalone, &mut groups, &mut fields);
        }
        self.flush_groups(doc, GroupNamespace::Standalone, &standalone, groups, &mut fields);

        while let Some(shadow) = self.shadow_staging.pop_front() {
            let mut groups = GroupBuffer::default();
            for element in doc.descendant_elements(shadow) {
                self.stage_shadow_root(doc, element);
                self.visit(doc, element, &standalone, &mut groups, &mut fields);
            }
            self.flush_groups(doc, GroupNamespace::Shadow, &standalone, groups, &mut fields);
        }

        fields
    }

    fn stage_shadow_root(&mut self, doc: &Document, element: NodeId) {
        match doc.shadow_root(element) {
            Ok(Some(root)) => self.shadow_staging.push_back(root),
            Ok(None) => {}
            Err(e) => tracing::warn!("Omitting shadow subtree: {}", e),
        }
    }

    /// Classify one candidate: buffer it into a group or emit it
    fn visit(
        &mut self,
        doc: &mut Document,
        element: NodeId,
        form_opid: &FormOpId,
        groups: &mut GroupBuffer,
        fields: &mut Vec<DetectedField>,
    ) {
        if self.visited.contains(&element)
            || !self.is_candidate(doc, element)
            || !self.is_valid_field(doc, element)
        {
            return;
        }
        self.visited.insert(element);

        let field_type = field_type_of(doc, element);
        if matches!(field_type, FieldType::Radio | FieldType::Checkbox) {
            if let Some(name) = doc.attr(element, "name").filter(|n| !n.is_empty()) {
                let name = name.to_string();
                groups.push(field_type, &name, element);
                return;
            }
        }

        if field_type == FieldType::RadioGroup {
            for radio in doc.descendant_elements(element) {
                if doc.role(radio).as_deref() == Some("radio") {
                    self.visited.insert(radio);
                }
            }
        }
        // The search input of a framework select belongs to the widget
        if field_type == FieldType::Combobox && !doc.is_tag(element, "input") {
            for control in doc.descendant_elements(element) {
                if doc.tag(control).is_some_and(|t| NATIVE_CONTROLS.contains(&t)) {
                    self.visited.insert(control);
                }
            }
        }

        let metadata = analyze_field(doc, element);
        if let Some(field) = self.emit(doc, element, metadata, form_opid) {
            fields.push(field);
        }
    }

    fn flush_groups(
        &mut self,
        doc: &mut Document,
        namespace: GroupNamespace,
        form_opid: &FormOpId,
        groups: GroupBuffer,
        fields: &mut Vec<DetectedField>,
    ) {
        for group in groups.groups {
            let key = GroupKey::new(namespace.clone(), group.kind, group.name.as_str());
            if !self.groups_seen.insert(key) {
                tracing::warn!(
                    "Group '{}' already flushed in {:?}, skipping {} members",
                    group.name,
                    namespace,
                    group.members.len()
                );
                continue;
            }

            // A lone named checkbox is an ordinary field
            if group.kind == FieldType::Checkbox && group.members.len() == 1 {
                let metadata = analyze_field(doc, group.members[0]);
                if let Some(field) = self.emit(doc, group.members[0], metadata, form_opid) {
                    fields.push(field);
                }
                continue;
            }

            // Keep whichever member already carries the group's identity
            let carrier = group
                .members
                .iter()
                .copied()
                .find(|m| {
                    self.ids
                        .existing_field_opid(doc, *m)
                        .is_some_and(|id| !self.issued_fields.contains(&id))
                })
                .unwrap_or(group.members[0]);

            let mut metadata = analyze_group(doc, &group.members);
            metadata.field_type = group.kind;
            let Some(mut field) = self.emit(doc, carrier, metadata, form_opid) else {
                continue;
            };
            field.element = group.members[0];
            for member in &group.members {
                if let Err(e) = doc.set_attr(*member, self.ids.field_attr(), field.opid.as_str()) {
                    tracing::warn!("Could not stamp group member {:?}: {}", member, e);
                }
            }
            fields.push(field);
        }
    }

    fn emit(
        &mut self,
        doc: &mut Document,
        element: NodeId,
        metadata: FieldMetadata,
        form_opid: &FormOpId,
    ) -> Option<DetectedField> {
        match self.claim_field_opid(doc, element) {
            Ok(opid) => Some(DetectedField {
                opid,
                element,
                metadata,
                form_opid: form_opid.clone(),
            }),
            Err(e) => {
                tracing::warn!("Dropping field {:?}: {}", element, e);
                None
            }
        }
    }

    /// Reuse or mint a field identity, re-minting when a cloned element
    /// brought along an identity already issued in this pass
    fn claim_field_opid(&mut self, doc: &mut Document, element: NodeId) -> Result<FieldOpId> {
        let opid = self.ids.field_opid(doc, element)?;
        if self.issued_fields.insert(opid.clone()) {
            return Ok(opid);
        }
        tracing::warn!("Field opid {} already issued this pass, minting a new one", opid);
        doc.remove_attr(element, self.ids.field_attr());
        let fresh = self.ids.field_opid(doc, element)?;
        self.issued_fields.insert(fresh.clone());
        Ok(fresh)
    }

    fn claim_form_opid(&mut self, doc: &mut Document, form: NodeId) -> Result<FormOpId> {
        let opid = self.ids.form_opid(doc, form)?;
        if self.issued_forms.insert(opid.clone()) {
            return Ok(opid);
        }
        tracing::warn!("Form opid {} already issued this pass, minting a new one", opid);
        doc.remove_attr(form, self.ids.form_attr());
        let fresh = self.ids.form_opid(doc, form)?;
        self.issued_forms.insert(fresh.clone());
        Ok(fresh)
    }

    fn is_candidate(&self, doc: &Document, element: NodeId) -> bool {
        doc.tag(element).is_some_and(|t| NATIVE_CONTROLS.contains(&t))
            || self.is_aria_widget(doc, element)
    }

    /// Non-native element acting as a choice widget
    ///
    /// A widget wrapping a usable native control is left to that control,
    /// unless it is a framework select keeping its value in a hidden input.
    /// A popup listbox belongs to its combobox.
    fn is_aria_widget(&self, doc: &Document, element: NodeId) -> bool {
        let Some(tag) = doc.tag(element) else {
            return false;
        };
        if NATIVE_CONTROLS.contains(&tag) {
            return false;
        }
        let Some(role) = doc.role(element) else {
            return false;
        };
        if !WIDGET_ROLES.contains(&role.as_str()) {
            return false;
        }
        if role == "listbox" && Self::is_combobox_popup(doc, element) {
            return false;
        }
        if role == "combobox" && framework_value_input(doc, element).is_some() {
            return true;
        }
        !doc.descendant_elements(element).into_iter().any(|d| {
            doc.tag(d).is_some_and(|t| NATIVE_CONTROLS.contains(&t)) && self.is_valid_field(doc, d)
        })
    }

    /// A listbox nested in a combobox, or referenced by one through
    /// `aria-controls` / `aria-owns`
    fn is_combobox_popup(doc: &Document, listbox: NodeId) -> bool {
        if doc
            .ancestors(listbox)
            .any(|a| doc.role(a).as_deref() == Some("combobox"))
        {
            return true;
        }
        let Some(id) = doc.attr(listbox, "id").map(str::trim).filter(|id| !id.is_empty()) else {
            return false;
        };
        doc.descendant_elements(doc.tree_root(listbox))
            .into_iter()
            .any(|n| {
                doc.role(n).as_deref() == Some("combobox")
                    && ["aria-controls", "aria-owns"].iter().any(|attr| {
                        doc.attr(n, attr)
                            .is_some_and(|refs| refs.split_whitespace().any(|r| r == id))
                    })
            })
    }

    /// Validity filter
    ///
    /// Rejects opted-out elements, buttons, non-data input types, and
    /// elements without a rendered box. An unrendered radio or checkbox
    /// whose label is rendered (custom-styled control) stays valid.
    pub fn is_valid_field(&self, doc: &Document, element: NodeId) -> bool {
        let Some(data) = doc.element(element) else {
            return false;
        };
        if data.has_attr(&self.skip_attr) || data.tag == "button" {
            return false;
        }
        let input_type = data.input_type();
        if input_type
            .as_deref()
            .is_some_and(|t| IGNORED_INPUT_TYPES.contains(&t))
        {
            return false;
        }

        if doc.is_rendered(element) && !doc.rect(element).is_empty() {
            return true;
        }

        self.track_hidden_controls
            && matches!(input_type.as_deref(), Some("radio" | "checkbox"))
            && doc
                .labels(element)
                .into_iter()
                .any(|l| doc.is_rendered(l) && !doc.rect(l).is_empty())
    }
}
