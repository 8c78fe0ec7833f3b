//! # Output Projection
//!
//! A [`Rasterizer`] turns a laid-out [`RenderedDocument`] into bytes of some
//! fixed-page format. The engine has already decided every line and row
//! break; rasterizers must keep one output page per document page and never
//! reflow.
//!
//! [`HtmlRasterizer`] projects pages to standalone HTML/CSS, which a headless
//! browser can print to PDF.

pub mod html;

pub use html::{render_html, HtmlRasterizer};

use crate::engine::RenderedDocument;
use crate::error::FolioError;

/// Final-output collaborator.
pub trait Rasterizer: Send + Sync {
    /// MIME type of the produced bytes.
    fn content_type(&self) -> &'static str;

    fn rasterize(&self, doc: &RenderedDocument) -> Result<Vec<u8>, FolioError>;
}
