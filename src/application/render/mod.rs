//! Markdown rendering pipeline.
//!
//! The pipeline is pure: it accepts markdown input, produces deterministic
//! inline-styled HTML, and surfaces structured errors. Reading sources and
//! writing results happens in the caller.

mod service;
mod types;

pub use service::{ComrakRenderService, RenderPipelineConfig};
pub use types::{RenderError, RenderOutput, RenderRequest, RenderService};
