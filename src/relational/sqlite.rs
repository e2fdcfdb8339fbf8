//! SQLite affinity-based type mapping

use super::flavor::literal_default;
use crate::datamodel::TypeIdentifier;

pub fn type_identifier(raw: &str, is_id: bool) -> Option<TypeIdentifier> {
    let raw = raw.trim().to_ascii_uppercase();
    let identifier = if raw.contains("BOOL") {
        TypeIdentifier::Boolean
    } else if raw.contains("DATE") || raw.contains("TIME") {
        TypeIdentifier::DateTime
    } else if raw.contains("JSON") {
        TypeIdentifier::Json
    } else if raw.contains("INT") {
        TypeIdentifier::Int
    } else if raw.contains("CHAR") || raw.contains("CLOB") || raw.contains("TEXT") {
        if is_id {
            TypeIdentifier::Id
        } else {
            TypeIdentifier::String
        }
    } else if raw.contains("REAL") || raw.contains("FLOA") || raw.contains("DOUB") || raw.contains("NUMERIC") || raw.contains("DECIMAL") {
        TypeIdentifier::Float
    } else {
        return None;
    };
    Some(identifier)
}

pub fn parse_default_value(raw: &str, identifier: Option<TypeIdentifier>) -> Option<String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }
    match raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        Some(inner) => literal_default(inner.replace("''", "'"), true, identifier),
        None => literal_default(raw.to_string(), false, identifier),
    }
}
