//! Cross-frame message contract

use serde::{Deserialize, Serialize};

use crate::detect::CompressedForm;
use crate::fill::{FillMapping, FillReport};

/// Ask a frame to run detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    pub request_id: String,
}

/// Identity of the frame that answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameInfo {
    pub frame_id: String,
    pub url: String,
    pub is_main_frame: bool,
}

/// Page-level context passed to the matcher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteContext {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A frame's answer to [`DetectRequest`]
///
/// Success carries `forms`, `totalFields` and `websiteContext`; failure
/// carries `error`. Both carry `frameInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub request_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forms: Vec<CompressedForm>,
    #[serde(default)]
    pub total_fields: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website_context: Option<WebsiteContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub frame_info: FrameInfo,
}

impl DetectResponse {
    pub fn success(
        request_id: impl Into<String>,
        forms: Vec<CompressedForm>,
        website_context: WebsiteContext,
        frame_info: FrameInfo,
    ) -> Self {
        let total_fields = forms.iter().map(|f| f.fields.len()).sum();
        Self {
            request_id: request_id.into(),
            success: true,
            forms,
            total_fields,
            website_context: Some(website_context),
            error: None,
            frame_info,
        }
    }

    pub fn failure(request_id: impl Into<String>, error: impl Into<String>, frame_info: FrameInfo) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            forms: Vec::new(),
            total_fields: 0,
            website_context: None,
            error: Some(error.into()),
            frame_info,
        }
    }
}

/// Messages a frame handles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FrameMessage {
    Detect(DetectRequest),
    Fill { mappings: Vec<FillMapping> },
    /// Main-frame only UI
    ShowPreview,
    Teardown,
}

/// A frame's reply to a [`FrameMessage`]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FrameReply {
    Detected(DetectResponse),
    Filled(FillReport),
    Preview { shown: bool },
    TornDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> FrameInfo {
        FrameInfo {
            frame_id: "3".into(),
            url: "https://pay.example.com/card".into(),
            is_main_frame: false,
        }
    }

    #[test]
    fn test_failure_wire_shape() {
        let response = DetectResponse::failure("req-1", "frame torn down", info());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["requestId"], "req-1");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "frame torn down");
        assert_eq!(json["frameInfo"]["frameId"], "3");
        assert!(json.get("forms").is_none());
    }

    #[test]
    fn test_success_response_parses() {
        let json = r#"{
            "requestId": "req-2",
            "success": true,
            "forms": [],
            "totalFields": 0,
            "websiteContext": {"url": "https://example.com", "title": "Checkout"},
            "frameInfo": {"frameId": "0", "url": "https://example.com", "isMainFrame": true}
        }"#;
        let response: DetectResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        assert_eq!(response.website_context.unwrap().title, "Checkout");
        assert!(response.frame_info.is_main_frame);
    }

    #[test]
    fn test_message_tagging() {
        let message: FrameMessage =
            serde_json::from_str(r#"{"type":"detect","requestId":"r"}"#).unwrap();
        assert!(matches!(message, FrameMessage::Detect(DetectRequest { request_id }) if request_id == "r"));

        let message: FrameMessage = serde_json::from_str(r#"{"type":"showPreview"}"#).unwrap();
        assert!(matches!(message, FrameMessage::ShowPreview));
    }
}
