//! MySQL type mapping, default parsing and anonymous enums

use once_cell::sync::Lazy;
use regex::Regex;

use super::flavor::literal_default;
use crate::datamodel::TypeIdentifier;
use crate::datamodel::naming::{camel_case, capitalize};

static ENUM_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"'((?:[^']|'')*)'").unwrap());

pub const RESERVED_TYPES: &[&str] = &["_RelayId"];

pub fn type_identifier(raw: &str, is_id: bool) -> Option<TypeIdentifier> {
    let raw = raw.trim().to_ascii_lowercase();
    if raw.starts_with("tinyint(1)") {
        return Some(TypeIdentifier::Boolean);
    }
    let base = raw
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default();
    let identifier = match base {
        "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "year" => {
            TypeIdentifier::Int
        }
        "decimal" | "numeric" | "float" | "double" | "real" => TypeIdentifier::Float,
        "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" => {
            if is_id {
                TypeIdentifier::Id
            } else {
                TypeIdentifier::String
            }
        }
        "bool" | "boolean" | "bit" => TypeIdentifier::Boolean,
        "datetime" | "timestamp" | "date" => TypeIdentifier::DateTime,
        "json" => TypeIdentifier::Json,
        _ => return None,
    };
    Some(identifier)
}

/// Values of an inline `enum('a','b')` column type
pub fn enum_values(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim();
    if !trimmed.to_ascii_lowercase().starts_with("enum(") {
        return None;
    }
    Some(
        ENUM_VALUE
            .captures_iter(trimmed)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().replace("''", "'"))
            .collect(),
    )
}

/// Name given to an inline enum: `<camelTable><CamelColumn>Enum`
pub fn anonymous_enum_name(table: &str, column: &str) -> String {
    format!("{}{}Enum", camel_case(table), capitalize(&camel_case(column)))
}

pub fn parse_default_value(raw: &str, identifier: Option<TypeIdentifier>) -> Option<String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }
    let (value, quoted) = match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => (inner.replace("''", "'"), true),
        None => match raw.strip_prefix("b'").and_then(|r| r.strip_suffix('\'')) {
            Some(bits) => (bits.to_string(), false),
            None => (raw.to_string(), false),
        },
    };
    // information_schema reports string defaults unquoted
    let quoted = quoted
        || matches!(
            identifier,
            Some(TypeIdentifier::String | TypeIdentifier::Id) | None
        ) && !value.eq_ignore_ascii_case("current_timestamp");
    literal_default(value, quoted, identifier)
}
