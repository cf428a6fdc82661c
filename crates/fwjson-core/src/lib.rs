//! fwjson-core: reference-counted JSON values for firmware-style tooling
//!
//! This crate focuses on a small, well-factored surface:
//! - `JsonValue` handle with shared ownership (clone = retain, drop = release)
//! - Object/array views that mutate the shared node in place
//! - Integer-only numbers; strings read as checked ASCII or as UCS2
//! - Document text I/O where only objects and arrays are valid roots
//! - Generic JSON Pointer edit helpers
//!
//! Values use `Rc` and are confined to a single thread.
pub mod array;
pub mod edit;
pub mod error;
pub mod object;
pub mod text;
pub mod ucs2;
pub mod value;

pub use array::JsonArray;
pub use edit::{ChildInfo, get_by_pointer, list_children, remove_at_pointer, set_by_pointer};
pub use error::{JsonError, Result};
pub use object::JsonObject;
pub use text::{JsonOpts, MAX_DEPTH_LIMIT, load_file, parse, parse_fragment, to_text, write_file};
pub use ucs2::{Ucs2Error, Ucs2String, ucs2_to_utf8, utf8_to_ucs2};
pub use value::{JsonKind, JsonValue};
