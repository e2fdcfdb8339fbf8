//! PostgreSQL type mapping, default parsing and sequence detection

use once_cell::sync::Lazy;
use regex::Regex;

use super::flavor::literal_default;
use crate::datamodel::TypeIdentifier;

static NEXTVAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^nextval\('(?:.*\.)?(.*?)'::regclass\)$").unwrap());

pub const RESERVED_TYPES: &[&str] = &["_RelayId"];

pub fn type_identifier(raw: &str, is_id: bool) -> Option<TypeIdentifier> {
    let identifier = match raw {
        "int1" | "int2" | "int4" | "int8" | "_int4" | "_int8" | "smallint" | "integer"
        | "bigint" | "serial" | "bigserial" => TypeIdentifier::Int,
        "numeric" | "float4" | "float8" | "_float8" | "real" | "double precision" => {
            TypeIdentifier::Float
        }
        "varchar" | "bpchar" | "text" | "_text" | "_varchar" | "character varying" => {
            if is_id {
                TypeIdentifier::Id
            } else {
                TypeIdentifier::String
            }
        }
        "bool" | "_bool" | "boolean" => TypeIdentifier::Boolean,
        "json" | "jsonb" => TypeIdentifier::Json,
        "date" | "_date" | "timestamp" | "timestamptz" | "_timestamp" | "_timestamptz" => {
            TypeIdentifier::DateTime
        }
        "uuid" | "_uuid" => TypeIdentifier::Uuid,
        _ => return None,
    };
    Some(identifier)
}

/// Name of the sequence behind a `nextval(...)` default
pub fn sequence_name(default: &str) -> Option<String> {
    NEXTVAL
        .captures(default.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Strip casts and quotes from a default expression
pub fn parse_default_value(raw: &str, identifier: Option<TypeIdentifier>) -> Option<String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("null") || raw.to_ascii_uppercase().starts_with("NULL::") {
        return None;
    }

    let (value, quoted) = match raw.strip_prefix('\'') {
        Some(rest) => {
            // closing quote is the last one before an optional `::cast`
            let end = rest.rfind('\'')?;
            (rest[..end].replace("''", "'"), true)
        }
        None => {
            let value = raw.split("::").next().unwrap_or(raw).trim();
            (value.trim_start_matches('(').trim_end_matches(')').to_string(), false)
        }
    };
    literal_default(value, quoted, identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mapping() {
        assert_eq!(type_identifier("int4", false), Some(TypeIdentifier::Int));
        assert_eq!(type_identifier("text", true), Some(TypeIdentifier::Id));
        assert_eq!(type_identifier("text", false), Some(TypeIdentifier::String));
        assert_eq!(type_identifier("jsonb", false), Some(TypeIdentifier::Json));
        assert_eq!(type_identifier("timestamptz", false), Some(TypeIdentifier::DateTime));
        assert_eq!(type_identifier("xml", false), None);
    }

    #[test]
    fn test_sequence_name() {
        assert_eq!(
            sequence_name("nextval('public.users_id_seq'::regclass)").as_deref(),
            Some("users_id_seq")
        );
        assert_eq!(
            sequence_name("nextval('users_id_seq'::regclass)").as_deref(),
            Some("users_id_seq")
        );
        assert_eq!(sequence_name("42"), None);
    }

    #[test]
    fn test_parse_default_value() {
        use TypeIdentifier::*;
        assert_eq!(
            parse_default_value("'hello'::character varying", Some(String)).as_deref(),
            Some("hello")
        );
        assert_eq!(parse_default_value("'it''s'::text", Some(String)).as_deref(), Some("it's"));
        assert_eq!(parse_default_value("NULL::character varying", Some(String)), None);
        assert_eq!(parse_default_value("42", Some(Int)).as_deref(), Some("42"));
        assert_eq!(parse_default_value("'-1'::integer", Some(Int)).as_deref(), Some("-1"));
        assert_eq!(parse_default_value("true", Some(Boolean)).as_deref(), Some("true"));
        assert_eq!(parse_default_value("now()", Some(DateTime)), None);
        assert_eq!(parse_default_value("'ADMIN'::role", None).as_deref(), Some("ADMIN"));
    }
}
