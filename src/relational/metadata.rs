//! Catalog metadata consumed by relational inference

use serde::{Deserialize, Serialize};

/// A column as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// Raw database type, e.g. `int4`, `varchar`, `_text`
    pub type_name: String,
    pub is_list: bool,
    pub is_nullable: bool,
    /// Raw default expression, e.g. `nextval('users_id_seq'::regclass)`
    pub default_value: Option<String>,
    pub is_auto_increment: bool,
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableIndex {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
    pub is_primary_key: bool,
}

impl TableIndex {
    pub fn new(name: impl Into<String>, fields: &[&str], unique: bool) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique,
            is_primary_key: false,
        }
    }

    pub fn primary_key(name: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            is_primary_key: true,
            ..Self::new(name, fields, true)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub indices: Vec<TableIndex>,
    pub primary_key: Option<TableIndex>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            ..Default::default()
        }
    }

    pub fn with_primary_key(mut self, fields: &[&str]) -> Self {
        self.primary_key = Some(TableIndex::primary_key(format!("{}_pkey", self.name), fields));
        self
    }

    pub fn with_index(mut self, index: TableIndex) -> Self {
        self.indices.push(index);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key, whether reported separately or among the indices
    pub fn primary_key_fields(&self) -> Vec<&str> {
        self.primary_key
            .as_ref()
            .or_else(|| self.indices.iter().find(|i| i.is_primary_key))
            .map(|pk| pk.fields.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// A foreign key between two columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRelation {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

impl TableRelation {
    pub fn new(source: (&str, &str), target: (&str, &str)) -> Self {
        Self {
            source_table: source.0.to_string(),
            source_column: source.1.to_string(),
            target_table: target.0.to_string(),
            target_column: target.1.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumInfo {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceInfo {
    pub name: String,
    pub initial_value: i64,
    pub allocation_size: i64,
}

/// Everything the inference passes read, gathered before they start
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationalSchema {
    pub tables: Vec<Table>,
    pub relations: Vec<TableRelation>,
    pub enums: Vec<EnumInfo>,
    pub sequences: Vec<SequenceInfo>,
}

impl RelationalSchema {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}
