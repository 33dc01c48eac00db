//! Partial-update protocol
//!
//! - `operation.rs` - wire types (`PatchOperation`, `FieldPath`)
//! - `form.rs` - editor form state with dirty tracking
//! - `builder.rs` - form state to patch
//! - `apply.rs` - atomic application of a patch to an entity

mod apply;
mod builder;
mod form;
mod operation;

pub use apply::apply_patch;
pub use builder::{DirtyGating, PatchBuilder};
pub use form::{FormField, FormState, FormValue};
pub use operation::{FieldPath, PATCH_CONTENT_TYPE, PatchOp, PatchOperation};
