//! Built-in scalar type identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder type name for fields whose type could not be determined.
///
/// Also used as the relation-name marker on document fields that are relation
/// candidates until the relation resolver clears it.
pub const UNKNOWN_TYPE: &str = "<Unknown>";

/// Built-in scalar types of the datamodel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeIdentifier {
    String,
    Int,
    Float,
    Boolean,
    DateTime,
    #[serde(rename = "ID")]
    Id,
    #[serde(rename = "UUID")]
    Uuid,
    Json,
    Long,
}

impl TypeIdentifier {
    pub const ALL: [TypeIdentifier; 9] = [
        TypeIdentifier::String,
        TypeIdentifier::Int,
        TypeIdentifier::Float,
        TypeIdentifier::Boolean,
        TypeIdentifier::DateTime,
        TypeIdentifier::Id,
        TypeIdentifier::Uuid,
        TypeIdentifier::Json,
        TypeIdentifier::Long,
    ];

    /// SDL spelling of the scalar
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeIdentifier::String => "String",
            TypeIdentifier::Int => "Int",
            TypeIdentifier::Float => "Float",
            TypeIdentifier::Boolean => "Boolean",
            TypeIdentifier::DateTime => "DateTime",
            TypeIdentifier::Id => "ID",
            TypeIdentifier::Uuid => "UUID",
            TypeIdentifier::Json => "Json",
            TypeIdentifier::Long => "Long",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Whether values of this scalar are quoted when rendered as defaults
    pub fn is_quoted(&self) -> bool {
        matches!(
            self,
            TypeIdentifier::String | TypeIdentifier::Json | TypeIdentifier::DateTime
        )
    }
}

impl fmt::Display for TypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `name` is one of the built-in scalar names
pub fn is_type_identifier(name: &str) -> bool {
    TypeIdentifier::parse(name).is_some()
}
