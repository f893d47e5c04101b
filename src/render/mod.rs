//! Document export: turns the generated plan (markdown) into a PDF.

pub mod markdown;
pub mod pdf;

pub use markdown::{Block, parse_blocks};
pub use pdf::PdfRenderer;

use serde::Serialize;

use crate::error::RenderError;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Converts markup text into a paginated binary document.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, markup: &str, title: &str) -> Result<Vec<u8>, RenderError>;
}

/// A rendered plan, ready to be offered for download.
#[derive(Debug, Clone, Serialize)]
pub struct PlanDocument {
    pub filename: String,
    pub content_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl PlanDocument {
    pub fn new(child_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename: plan_filename(child_name),
            content_type: PDF_CONTENT_TYPE,
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Download name for a child's plan.
pub fn plan_filename(child_name: &str) -> String {
    format!("{child_name}_wellness_plan.pdf")
}
