//! Relational introspection
//!
//! Catalog metadata (tables, columns, indices, foreign keys, enums, sequences)
//! is turned into a datamodel by [`RelationalInferrer`]. Type mapping and
//! default parsing differ per database and live in the flavor modules.

pub mod catalog;
pub mod flavor;
mod hiding;
pub mod inference;
pub mod metadata;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use catalog::{RelationalCatalog, RelationalConnector, query_schema};
pub use flavor::Flavor;
pub use inference::RelationalInferrer;
pub use metadata::{
    Column, EnumInfo, RelationalSchema, SequenceInfo, Table, TableIndex, TableRelation,
};
