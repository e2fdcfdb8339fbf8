//! Canonical datamodel shared by the parser, renderer, inferrers and normalizers

pub mod dialect;
pub mod directives;
pub mod model;
pub mod naming;
pub mod scalar;

pub use dialect::{DatabaseType, Dialect};
pub use model::{
    Comment, Datamodel, Directive, Field, FieldRef, FieldType, IdStrategy, Index, Sequence, Type,
};
pub use scalar::{TypeIdentifier, UNKNOWN_TYPE, is_type_identifier};
