//! Per-database behavior of the relational passes

use super::{mysql, postgres, sqlite};
use crate::datamodel::{DatabaseType, TypeIdentifier};

/// Dispatches type mapping and default parsing to the database's rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flavor {
    database: DatabaseType,
}

impl Flavor {
    pub fn new(database: DatabaseType) -> Self {
        Self { database }
    }

    pub fn database(&self) -> DatabaseType {
        self.database
    }

    pub fn type_identifier(&self, raw: &str, is_id: bool) -> Option<TypeIdentifier> {
        match self.database {
            DatabaseType::Postgres => postgres::type_identifier(raw, is_id),
            DatabaseType::Mysql => mysql::type_identifier(raw, is_id),
            DatabaseType::Sqlite | DatabaseType::Mongo => sqlite::type_identifier(raw, is_id),
        }
    }

    /// Parse a raw default against the field's scalar; `None` means an enum field
    pub fn parse_default_value(
        &self,
        raw: &str,
        identifier: Option<TypeIdentifier>,
    ) -> Option<String> {
        match self.database {
            DatabaseType::Postgres => postgres::parse_default_value(raw, identifier),
            DatabaseType::Mysql => mysql::parse_default_value(raw, identifier),
            DatabaseType::Sqlite | DatabaseType::Mongo => {
                sqlite::parse_default_value(raw, identifier)
            }
        }
    }

    pub fn sequence_name(&self, default: &str) -> Option<String> {
        match self.database {
            DatabaseType::Postgres => postgres::sequence_name(default),
            _ => None,
        }
    }

    /// Inline enum declared by the column type itself, as (name, values)
    pub fn anonymous_enum(&self, table: &str, column: &str, raw: &str) -> Option<(String, Vec<String>)> {
        match self.database {
            DatabaseType::Mysql => mysql::enum_values(raw)
                .map(|values| (mysql::anonymous_enum_name(table, column), values)),
            _ => None,
        }
    }

    /// Internal bookkeeping tables that never become types
    pub fn reserved_types(&self) -> &'static [&'static str] {
        match self.database {
            DatabaseType::Postgres => postgres::RESERVED_TYPES,
            DatabaseType::Mysql => mysql::RESERVED_TYPES,
            DatabaseType::Sqlite | DatabaseType::Mongo => &[],
        }
    }
}

/// Accept a cleaned default literal if it fits the field's scalar.
///
/// Unquoted values on text-like fields are expressions (function calls,
/// keywords) and are dropped unless they are plain numbers or booleans.
pub(crate) fn literal_default(
    value: String,
    quoted: bool,
    identifier: Option<TypeIdentifier>,
) -> Option<String> {
    let value = value.trim().to_string();
    if value.is_empty() && !quoted {
        return None;
    }
    match identifier {
        None => (quoted || is_plain_identifier(&value)).then_some(value),
        Some(TypeIdentifier::Int | TypeIdentifier::Long) => {
            value.parse::<i64>().ok().map(|n| n.to_string())
        }
        Some(TypeIdentifier::Float) => value
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|_| value),
        Some(TypeIdentifier::Boolean) => match value.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Some("true".to_string()),
            "false" | "f" | "0" | "no" => Some("false".to_string()),
            _ => None,
        },
        Some(_) => {
            let literal = value.parse::<f64>().is_ok() || value == "true" || value == "false";
            (quoted || literal).then_some(value)
        }
    }
}

fn is_plain_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
