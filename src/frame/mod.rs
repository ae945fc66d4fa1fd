//! Cross-Frame Aggregation
//!
//! Every frame detects on its own and answers detect requests tagged with
//! its frame identity. The top frame merges the answers under
//! frame-qualified field ids and routes fill mappings back to the frame
//! that owns each field.

mod aggregator;
mod message;

pub use aggregator::{AggregatedView, CrossFrameAggregator, FrameContext, FrameFailure, MAIN_FRAME_ID};
pub use message::{DetectRequest, DetectResponse, FrameInfo, FrameMessage, FrameReply, WebsiteContext};
