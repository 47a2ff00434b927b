//! Flotilla Schema - Declarative specification schemas
//!
//! A [`Schema`] is an ordered set of named [`Attribute`] descriptors. Validating
//! a raw specification against it yields [`SpecData`]: one entry per declared
//! attribute, type-checked, with defaults filled in for absent optional items.
//!
//! Validation is a pure function of the raw spec, the schema and the
//! [`UnknownKeyPolicy`]. It never calls out to a backend.
//!
//! ```
//! use flotilla_schema::{Attribute, Schema, UnknownKeyPolicy};
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .attribute("flavor", Attribute::string("Flavor to boot with").required())
//!     .attribute("timeout", Attribute::integer("Timeout in seconds").with_default(json!(120)));
//!
//! let data = schema
//!     .validate(&json!({"flavor": "m1.small"}), UnknownKeyPolicy::Reject)
//!     .unwrap();
//! assert_eq!(data.get_i64("timeout"), Some(120));
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod attribute;
pub mod error;
pub mod schema;
pub mod spec_data;

// Re-exports
pub use attribute::{Attribute, AttributeKind, Nested};
pub use error::{Result, ValidationError};
pub use schema::{Schema, UnknownKeyPolicy};
pub use spec_data::SpecData;
