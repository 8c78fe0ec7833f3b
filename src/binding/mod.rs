//! # Data Binding
//!
//! Path access into data records and `{{ path }}` placeholder substitution.
//!
//! ```
//! use folio::binding::{substitute, RenderContext};
//! use serde_json::json;
//!
//! let data = json!({"customer": {"name": "Ada"}});
//! let out = substitute("Dear {{ customer.name }}, page {{page.number}}", &data, &RenderContext::new(3, 4));
//! assert_eq!(out, "Dear Ada, page 3");
//! ```

pub mod path;
pub mod substitute;

pub use path::{assign, is_empty_value, resolve, value_to_string};
pub use substitute::{
    decode_escapes, extract_bindings, normalize_binding, substitute, substitute_opt, RenderContext,
};
