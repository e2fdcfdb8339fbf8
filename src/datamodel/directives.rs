//! Reserved directive names

use std::collections::BTreeSet;

use once_cell::sync::Lazy;

pub const UNIQUE: &str = "unique";
pub const DEFAULT: &str = "default";
pub const RELATION: &str = "relation";
pub const DB: &str = "db";
pub const ID: &str = "id";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";
pub const EMBEDDED: &str = "embedded";
pub const INDEXES: &str = "indexes";
pub const SEQUENCE: &str = "sequence";
pub const LINK_TABLE: &str = "linkTable";
pub const PG_TABLE: &str = "pgTable";
pub const PG_COLUMN: &str = "pgColumn";

/// Argument names used by reserved directives
pub mod args {
    pub const NAME: &str = "name";
    pub const VALUE: &str = "value";
    pub const STRATEGY: &str = "strategy";
    pub const LINK: &str = "link";
    pub const FIELDS: &str = "fields";
    pub const UNIQUE: &str = "unique";
    pub const INITIAL_VALUE: &str = "initialValue";
    pub const ALLOCATION_SIZE: &str = "allocationSize";
}

/// Directives interpreted by the parser and synthesized by the renderer.
///
/// Anything outside this set is kept verbatim on the owning type or field.
pub static RESERVED_DIRECTIVES: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
    [
        UNIQUE, DEFAULT, RELATION, DB, ID, CREATED_AT, UPDATED_AT, EMBEDDED, INDEXES, SEQUENCE,
        LINK_TABLE, PG_TABLE, PG_COLUMN,
    ]
    .into_iter()
    .collect()
});

pub fn is_reserved(name: &str) -> bool {
    RESERVED_DIRECTIVES.contains(name)
}
