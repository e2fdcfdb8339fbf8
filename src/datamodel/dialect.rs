//! Database types and the SDL dialects they are rendered in

use std::fmt;

use serde::{Deserialize, Serialize};

use super::directives;

/// Supported database flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Postgres,
    Mysql,
    Mongo,
    Sqlite,
}

impl DatabaseType {
    pub fn dialect(&self) -> Dialect {
        match self {
            DatabaseType::Mongo => Dialect::Document,
            DatabaseType::Postgres | DatabaseType::Mysql | DatabaseType::Sqlite => {
                Dialect::Relational
            }
        }
    }

    pub fn is_relational(&self) -> bool {
        !matches!(self, DatabaseType::Mongo)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DatabaseType::Postgres => "postgres",
            DatabaseType::Mysql => "mysql",
            DatabaseType::Mongo => "mongo",
            DatabaseType::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}

/// Conventions a parser and renderer share for one family of databases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dialect {
    /// `@id`, `@createdAt`, `@updatedAt` plus the reserved field names `id`,
    /// `createdAt` and `updatedAt`
    Relational,
    /// Like `Relational`, but read-only fields are expressed by their reserved
    /// names only and database names use `@pgTable` / `@pgColumn`
    LegacyRelational,
    /// Directives only; `_id` is the store's id key
    Document,
}

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

impl Dialect {
    pub fn for_database(database: DatabaseType) -> Self {
        database.dialect()
    }

    fn uses_reserved_names(&self) -> bool {
        !matches!(self, Dialect::Document)
    }

    pub fn is_id_field(&self, name: &str, has_directive: bool) -> bool {
        has_directive || (self.uses_reserved_names() && name == ID_FIELD)
    }

    pub fn is_created_at_field(&self, name: &str, has_directive: bool) -> bool {
        has_directive || (self.uses_reserved_names() && name == CREATED_AT_FIELD)
    }

    pub fn is_updated_at_field(&self, name: &str, has_directive: bool) -> bool {
        has_directive || (self.uses_reserved_names() && name == UPDATED_AT_FIELD)
    }

    /// Whether `@id`, `@createdAt` and `@updatedAt` are ever synthesized
    pub fn synthesizes_read_only_directives(&self) -> bool {
        !matches!(self, Dialect::LegacyRelational)
    }

    pub fn table_name_directive(&self) -> &'static str {
        match self {
            Dialect::LegacyRelational => directives::PG_TABLE,
            Dialect::Relational | Dialect::Document => directives::DB,
        }
    }

    pub fn column_name_directive(&self) -> &'static str {
        match self {
            Dialect::LegacyRelational => directives::PG_COLUMN,
            Dialect::Relational | Dialect::Document => directives::DB,
        }
    }
}
