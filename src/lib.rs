//! # Folio - Template Evaluation & Pagination Engine
//!
//! Folio renders structured page documents (invoices, statements, letters)
//! from a reusable template combined with an external data record. It
//! decides, deterministically and for any data shape, what content appears,
//! in what order, on how many pages, and where.
//!
//! - **Bindings**: `{{path}}` placeholders over JSON data, plus `page.number`/`page.count`
//! - **Data contracts**: mapping, defaults and transforms from an external payload
//! - **Visibility**: `visibleIf` expressions with `exists()`, `len()` and comparisons
//! - **Partials**: reusable element groups inlined by `include` elements
//! - **Pagination**: auto-growing tables and multi-column flowing text
//!
//! ## Quick Start
//!
//! ```
//! use folio::{Engine, Template};
//! use folio::render::{HtmlRasterizer, Rasterizer};
//! use serde_json::json;
//!
//! let template = Template::from_value(json!({
//!     "name": "Invoice",
//!     "page": {"width": 595, "height": 842, "margin": {"top": 36, "right": 36, "bottom": 36, "left": 36}},
//!     "dataContract": {"fields": [
//!         {"path": "total", "required": true, "transform": "currency"}
//!     ]},
//!     "elements": [
//!         {"type": "text", "id": "total", "x": 0, "y": 0, "w": 200, "h": 20, "text": "Total: {{total}}"}
//!     ]
//! }))?;
//!
//! let doc = Engine::new(template).render(&json!({"total": 1234.5}))?;
//! let html = HtmlRasterizer.rasterize(&doc)?;
//! assert!(String::from_utf8(html).unwrap().contains("Total: $1,234.50"));
//! # Ok::<(), folio::FolioError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`template`] | Template model, JSON format |
//! | [`binding`] | Path resolution and placeholder substitution |
//! | [`visibility`] | `visibleIf` expression evaluation |
//! | [`contract`] | Data contract evaluation, transforms, binding discovery |
//! | [`expand`] | Partial expansion |
//! | [`paginate`] | Table and flow-text pagination |
//! | [`layout`] | Per-page positioned boxes |
//! | [`engine`] | Preview and render entry point |
//! | [`render`] | Rasterizer trait and HTML projection |
//! | [`validate`] | Template validation |
//! | [`editor`] | Interactive editor state |
//! | [`store`] | Template storage with versions and audit trail |
//! | [`server`] | HTTP API |
//! | [`error`] | Error types |

pub mod binding;
pub mod contract;
pub mod editor;
pub mod engine;
pub mod error;
pub mod expand;
pub mod layout;
pub mod paginate;
pub mod render;
pub mod server;
pub mod store;
pub mod template;
pub mod validate;
pub mod visibility;

// Re-exports for convenience
pub use engine::{Diagnostics, Engine, RenderOptions, RenderedDocument};
pub use error::FolioError;
pub use template::{Element, Template};
pub use visibility::EvalMode;
