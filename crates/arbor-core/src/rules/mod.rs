pub mod validation;

pub use validation::{validate, validate_patch_payload, ValidationConfig};
