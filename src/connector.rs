//! Connector facade
//!
//! A [`Connector`] is implemented once per database family. It lists schemas,
//! reports their size and runs an introspection whose result can be rendered
//! as SDL, either as inferred or normalized.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::IntrospectionConfig;
use crate::datamodel::{DatabaseType, Datamodel};
use crate::error::IntrospectionError;
use crate::normalization::normalize;
use crate::sdl::Renderer;

/// Size of one schema as reported by the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseMetadata {
    pub table_count: usize,
    pub size_in_bytes: u64,
}

/// Entry point for introspecting one database
#[async_trait(?Send)]
pub trait Connector: Send + Sync {
    type Result: IntrospectionResult;

    async fn list_schemas(&self) -> Result<Vec<String>, IntrospectionError>;

    async fn get_metadata(&self, schema: &str) -> Result<DatabaseMetadata, IntrospectionError>;

    async fn introspect(&self, schema: &str) -> Result<Self::Result, IntrospectionError>;

    fn database_type(&self) -> DatabaseType;
}

/// Outcome of an introspection run
pub trait IntrospectionResult {
    /// The model as inferred, before any normalization
    fn datamodel(&self) -> &Datamodel;

    fn database_type(&self) -> DatabaseType;

    fn sort_before_rendering(&self) -> bool {
        true
    }

    fn renderer(&self) -> Renderer {
        Renderer::for_database(self.database_type())
    }

    fn render_to_datamodel_string(&self) -> String {
        self.renderer()
            .render(self.datamodel(), self.sort_before_rendering())
    }

    /// Normalized copy of the model, aligned to `reference` when given
    fn normalized_datamodel(&self, reference: Option<&Datamodel>) -> Datamodel {
        let mut model = self.datamodel().clone();
        normalize(&mut model, reference);
        model
    }

    fn render_to_normalized_datamodel_string(&self, reference: Option<&Datamodel>) -> String {
        self.renderer().render(
            &self.normalized_datamodel(reference),
            self.sort_before_rendering(),
        )
    }
}

/// Result of introspecting a relational catalog
#[derive(Debug, Clone)]
pub struct RelationalIntrospectionResult {
    model: Datamodel,
    database: DatabaseType,
    sort: bool,
    legacy: bool,
}

impl RelationalIntrospectionResult {
    pub fn new(model: Datamodel, database: DatabaseType, config: &IntrospectionConfig) -> Self {
        Self {
            model,
            database,
            sort: config.sort_before_rendering,
            legacy: false,
        }
    }

    /// Render with `@pgTable` / `@pgColumn` and reserved field names
    pub fn with_legacy_rendering(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn into_datamodel(self) -> Datamodel {
        self.model
    }
}

impl IntrospectionResult for RelationalIntrospectionResult {
    fn datamodel(&self) -> &Datamodel {
        &self.model
    }

    fn database_type(&self) -> DatabaseType {
        self.database
    }

    fn sort_before_rendering(&self) -> bool {
        self.sort
    }

    fn renderer(&self) -> Renderer {
        if self.legacy {
            Renderer::legacy()
        } else {
            Renderer::for_database(self.database)
        }
    }
}

/// Result of sampling a document store
#[derive(Debug, Clone)]
pub struct DocumentIntrospectionResult {
    model: Datamodel,
    sort: bool,
}

impl DocumentIntrospectionResult {
    pub fn new(model: Datamodel, config: &IntrospectionConfig) -> Self {
        Self {
            model,
            sort: config.sort_before_rendering,
        }
    }

    pub fn into_datamodel(self) -> Datamodel {
        self.model
    }
}

impl IntrospectionResult for DocumentIntrospectionResult {
    fn datamodel(&self) -> &Datamodel {
        &self.model
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mongo
    }

    fn sort_before_rendering(&self) -> bool {
        self.sort
    }
}
