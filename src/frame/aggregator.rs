//! Per-frame state and the top-frame aggregator

use std::collections::HashMap;

use super::message::{DetectRequest, DetectResponse, FrameInfo, FrameMessage, FrameReply, WebsiteContext};
use crate::detect::{compress_forms, CompressedForm, DetectedForm, FieldIndex, FormDetector};
use crate::dom::Document;
use crate::error::Error;
use crate::fill::{FillExecutor, FillMapping, FillReport, SkippedField};
use crate::identity::{FieldOpId, FormOpId};
use crate::EngineConfig;

/// Frame id of the top-level browsing context
pub const MAIN_FRAME_ID: &str = "0";

/// Everything one browsing context owns
///
/// Caches, the capture tracker and the preview flag are frame-local; two
/// frames never share mutable state.
pub struct FrameContext {
    info: FrameInfo,
    document: Document,
    detector: FormDetector,
    executor: FillExecutor,
    index: FieldIndex,
    /// Last value written per field
    captured: HashMap<FieldOpId, String>,
    preview_visible: bool,
    torn_down: bool,
}

impl FrameContext {
    pub fn new(
        frame_id: impl Into<String>,
        url: impl Into<String>,
        document: Document,
        config: &EngineConfig,
    ) -> Self {
        let frame_id = frame_id.into();
        Self {
            info: FrameInfo {
                is_main_frame: frame_id == MAIN_FRAME_ID,
                frame_id,
                url: url.into(),
            },
            document,
            detector: FormDetector::new(config),
            executor: FillExecutor::new(config),
            index: FieldIndex::default(),
            captured: HashMap::new(),
            preview_visible: false,
            torn_down: false,
        }
    }

    /// The top-level frame
    pub fn main(url: impl Into<String>, document: Document, config: &EngineConfig) -> Self {
        Self::new(MAIN_FRAME_ID, url, document, config)
    }

    pub fn is_main_frame(&self) -> bool {
        self.info.is_main_frame
    }

    pub fn frame_id(&self) -> &str {
        &self.info.frame_id
    }

    pub fn info(&self) -> &FrameInfo {
        &self.info
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn index(&self) -> &FieldIndex {
        &self.index
    }

    pub fn preview_visible(&self) -> bool {
        self.preview_visible
    }

    /// Value last written into a field by this frame
    pub fn captured(&self, opid: &FieldOpId) -> Option<&str> {
        self.captured.get(opid).map(String::as_str)
    }

    /// Full re-detection; rebuilds the frame's caches
    pub fn detect(&mut self) -> Vec<DetectedForm> {
        let forms = self.detector.detect_all(&mut self.document);
        self.index.rebuild(&forms);
        forms
    }

    /// `<title>` and `<meta name="description">`
    pub fn website_context(&self) -> WebsiteContext {
        let doc = &self.document;
        let elements = doc.descendant_elements(doc.root());
        let title = elements
            .iter()
            .find(|n| doc.is_tag(**n, "title"))
            .map(|t| doc.text_content(*t).trim().to_string())
            .unwrap_or_default();
        let description = elements
            .iter()
            .find(|n| {
                doc.is_tag(**n, "meta")
                    && doc
                        .attr(**n, "name")
                        .is_some_and(|name| name.eq_ignore_ascii_case("description"))
            })
            .and_then(|m| doc.attr(*m, "content"))
            .map(str::to_string);

        WebsiteContext {
            url: self.info.url.clone(),
            title,
            description,
        }
    }

    pub fn handle_detect(&mut self, request: &DetectRequest) -> DetectResponse {
        if self.torn_down {
            return DetectResponse::failure(&request.request_id, "frame torn down", self.info.clone());
        }
        let forms = self.detect();
        DetectResponse::success(
            &request.request_id,
            compress_forms(&forms),
            self.website_context(),
            self.info.clone(),
        )
    }

    pub async fn fill(&mut self, mappings: &[FillMapping]) -> FillReport {
        if self.torn_down {
            let mut report = FillReport::default();
            for mapping in mappings {
                report.skipped.push(SkippedField {
                    field_opid: mapping.field_opid.clone(),
                    reason: "frame torn down".to_string(),
                    soft: false,
                });
            }
            return report;
        }

        let report = self
            .executor
            .fill(&mut self.document, &self.index, mappings)
            .await;
        for mapping in mappings {
            if report.filled.contains(&mapping.field_opid) {
                self.captured
                    .insert(mapping.field_opid.clone(), mapping.value.clone());
            }
        }
        report
    }

    /// Detection and fill run in every frame; UI work only in the main frame
    pub async fn handle_message(&mut self, message: FrameMessage) -> FrameReply {
        match message {
            FrameMessage::Detect(request) => FrameReply::Detected(self.handle_detect(&request)),
            FrameMessage::Fill { mappings } => FrameReply::Filled(self.fill(&mappings).await),
            FrameMessage::ShowPreview => {
                if !self.is_main_frame() {
                    tracing::debug!("Frame {} ignores preview request", self.info.frame_id);
                    return FrameReply::Preview { shown: false };
                }
                self.preview_visible = !self.torn_down;
                FrameReply::Preview {
                    shown: self.preview_visible,
                }
            }
            FrameMessage::Teardown => {
                self.teardown();
                FrameReply::TornDown
            }
        }
    }

    /// Drop in-flight page work and every frame-local cache
    pub fn teardown(&mut self) {
        let dropped = self.document.pending_tasks();
        self.document.clear_pending_tasks();
        self.index.clear();
        self.captured.clear();
        self.preview_visible = false;
        self.torn_down = true;
        tracing::debug!(
            "Frame {} torn down, dropped {} pending tasks",
            self.info.frame_id,
            dropped
        );
    }
}

/// A frame that failed to answer a detect request
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFailure {
    pub frame_id: String,
    pub error: String,
}

/// Forms from every frame under frame-qualified identities
///
/// Main-frame ids are unqualified; sub-frame ids read `<frameId>:<opid>`.
#[derive(Debug, Clone, Default)]
pub struct AggregatedView {
    pub forms: Vec<CompressedForm>,
    pub frames: Vec<FrameInfo>,
    pub website_context: Option<WebsiteContext>,
    pub failures: Vec<FrameFailure>,
}

impl AggregatedView {
    pub fn total_fields(&self) -> usize {
        self.forms.iter().map(|f| f.fields.len()).sum()
    }

    fn qualify(frame: &FrameInfo, opid: &str) -> String {
        if frame.is_main_frame {
            opid.to_string()
        } else {
            format!("{}:{}", frame.frame_id, opid)
        }
    }

    fn absorb(&mut self, response: DetectResponse) {
        let frame = response.frame_info;
        for mut form in response.forms {
            form.opid = FormOpId::new(Self::qualify(&frame, form.opid.as_str()));
            for field in &mut form.fields {
                field.opid = FieldOpId::new(Self::qualify(&frame, field.opid.as_str()));
            }
            self.forms.push(form);
        }
        if frame.is_main_frame {
            self.website_context = response.website_context;
        } else if self.website_context.is_none() {
            self.website_context = response.website_context;
        }
        self.frames.push(frame);
    }

    /// Split a qualified id into its frame and frame-local opid
    pub fn route(&self, qualified: &FieldOpId) -> (String, FieldOpId) {
        match qualified.as_str().split_once(':') {
            Some((frame, opid)) if self.frames.iter().any(|f| f.frame_id == frame) => {
                (frame.to_string(), FieldOpId::from(opid))
            }
            _ => (MAIN_FRAME_ID.to_string(), qualified.clone()),
        }
    }
}

/// Top-frame coordinator for detection and fill across frames
#[derive(Debug, Default)]
pub struct CrossFrameAggregator {
    next_request: u64,
}

impl CrossFrameAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn request(&mut self) -> DetectRequest {
        let request = DetectRequest {
            request_id: format!("detect-{}", self.next_request),
        };
        self.next_request += 1;
        request
    }

    /// Ask every frame to detect and merge the answers
    ///
    /// The main frame's forms come first; the caller's frame order is left
    /// alone. Frames that fail or answer a different request are recorded,
    /// not fatal.
    pub fn collect(&mut self, frames: &mut [FrameContext]) -> AggregatedView {
        let request = self.request();
        let (main, rest): (Vec<usize>, Vec<usize>) =
            (0..frames.len()).partition(|i| frames[*i].is_main_frame());

        let mut view = AggregatedView::default();
        for i in main.into_iter().chain(rest) {
            let frame = &mut frames[i];
            let response = frame.handle_detect(&request);
            if response.request_id != request.request_id {
                tracing::warn!(
                    "Frame {} answered stale request {}",
                    response.frame_info.frame_id,
                    response.request_id
                );
                continue;
            }
            if response.success {
                view.absorb(response);
            } else {
                let error = response.error.unwrap_or_default();
                tracing::warn!("Frame {} failed detection: {}", response.frame_info.frame_id, error);
                view.failures.push(FrameFailure {
                    frame_id: response.frame_info.frame_id,
                    error,
                });
            }
        }

        tracing::debug!(
            "Aggregated {} forms ({} fields) from {} frames",
            view.forms.len(),
            view.total_fields(),
            view.frames.len()
        );
        view
    }

    /// Route qualified mappings to their frames and fill each frame
    ///
    /// Report ids are re-qualified so they match the aggregated view.
    pub async fn fill(
        &self,
        frames: &mut [FrameContext],
        view: &AggregatedView,
        mappings: &[FillMapping],
    ) -> FillReport {
        let mut per_frame: Vec<(String, Vec<FillMapping>)> = Vec::new();
        for mapping in mappings {
            let (frame_id, local) = view.route(&mapping.field_opid);
            let local = FillMapping::new(local, mapping.value.clone());
            match per_frame.iter_mut().find(|(id, _)| *id == frame_id) {
                Some((_, batch)) => batch.push(local),
                None => per_frame.push((frame_id, vec![local])),
            }
        }

        let mut report = FillReport::default();
        for (frame_id, batch) in per_frame {
            let Some(frame) = frames.iter_mut().find(|f| f.frame_id() == frame_id) else {
                let error = Error::FrameNotFound(frame_id.clone());
                tracing::warn!("{}", error);
                for mapping in batch {
                    report.skipped.push(SkippedField {
                        field_opid: FieldOpId::new(format!("{}:{}", frame_id, mapping.field_opid)),
                        reason: error.to_string(),
                        soft: false,
                    });
                }
                continue;
            };

            let info = frame.info().clone();
            let mut frame_report = frame.fill(&batch).await;
            for opid in &mut frame_report.filled {
                *opid = FieldOpId::new(AggregatedView::qualify(&info, opid.as_str()));
            }
            for skipped in &mut frame_report.skipped {
                skipped.field_opid =
                    FieldOpId::new(AggregatedView::qualify(&info, skipped.field_opid.as_str()));
            }
            report.merge(frame_report);
        }
        report
    }
}
