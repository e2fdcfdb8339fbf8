//! Error types for introspection
//!
//! Only contract violations are reported here. Anomalies in the inspected data
//! (unsupported column types, conflicting samples, compound ids) are recorded as
//! error comments on the affected type, field or index instead.

use thiserror::Error;

/// Fatal errors that abort an introspection or parse run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntrospectionError {
    /// SDL grammar error
    #[error("Syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// An index names a field that does not exist on its type
    #[error("Error during index association. Field {field} is missing on index {index}.")]
    UnknownIndexField { index: String, field: String },

    /// A relation name is declared on one side only
    #[error("Relation name {relation} used on {type_name}.{field} but no matching back-field found")]
    UnmatchedRelationName {
        relation: String,
        type_name: String,
        field: String,
    },

    /// Two fields share a relation name but do not point at each other's types
    #[error("Relation type mismatch for relation {0}")]
    RelationTypeMismatch(String),

    /// A reserved directive carries invalid arguments
    #[error("Invalid directive @{directive}: {message}")]
    InvalidDirective { directive: String, message: String },

    /// A foreign key or lookup references a table that was not introspected
    #[error("Table {0} referenced by a relation does not exist")]
    UnknownTable(String),

    /// A foreign key references a column that does not exist
    #[error("Column {table}.{column} referenced by a relation does not exist")]
    UnknownColumn { table: String, column: String },

    /// Mismatch between collections and types
    #[error("Mismatch between collections and given types: collection {0} does not exist")]
    UnknownCollection(String),

    /// A type referenced during inference is missing from the type list
    #[error("Mismatch between collections and given types: type {0} does not exist")]
    UnknownType(String),

    /// The schema contains nothing to introspect
    #[error("Schema {0} contains no tables or collections")]
    EmptySchema(String),

    /// Failure reported by the caller-supplied connector
    #[error("Connector error: {0}")]
    Connector(String),
}

impl From<anyhow::Error> for IntrospectionError {
    fn from(e: anyhow::Error) -> Self {
        IntrospectionError::Connector(format!("{e:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_error_keeps_context() {
        let err: IntrospectionError = anyhow::anyhow!("socket closed")
            .context("querying columns")
            .into();
        assert_eq!(
            err.to_string(),
            "Connector error: querying columns: socket closed"
        );
    }
}
