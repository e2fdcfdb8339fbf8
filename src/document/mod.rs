//! Document store introspection
//!
//! Collections are sampled and merged into types one by one; relations
//! between collections are resolved afterwards, once every type is known.

pub mod connector;
pub mod merger;
pub mod primitive;
pub mod resolver;
pub mod sampler;

use async_trait::async_trait;
use tracing::info;

pub use connector::{
    CollectionDescription, DataIterator, DocumentConnector, InMemoryDocumentStore,
    InMemoryIterator, SamplingStrategy,
};
pub use merger::{MergeResult, ModelMerger};
pub use primitive::{InternalType, PrimitiveInferrer, TypeInfo, UnsupportedType};
pub use resolver::RelationResolver;
pub use sampler::ModelSampler;

use crate::config::IntrospectionConfig;
use crate::connector::{Connector, DatabaseMetadata, DocumentIntrospectionResult};
use crate::datamodel::{DatabaseType, Datamodel};
use crate::error::IntrospectionError;

/// Sample every collection of `schema`, then resolve relations between them
pub async fn introspect_documents<C>(
    connector: &C,
    schema: &str,
    config: &IntrospectionConfig,
) -> Result<Datamodel, IntrospectionError>
where
    C: DocumentConnector + ?Sized,
{
    let collections = connector.collections(schema).await?;
    if collections.is_empty() {
        return Err(IntrospectionError::EmptySchema(schema.to_string()));
    }

    let types = ModelSampler::from_config(config)
        .sample(connector, &collections)
        .await?;
    let mut model = Datamodel::new(types);
    RelationResolver::from_config(config)
        .resolve(&mut model, connector, &collections)
        .await?;

    info!(
        "Introspected {} collections of {} into {} types",
        collections.len(),
        schema,
        model.types.len()
    );
    Ok(model)
}

/// [`Connector`] over any [`DocumentConnector`]
pub struct DocumentIntrospector<C> {
    connector: C,
    config: IntrospectionConfig,
}

impl<C: DocumentConnector> DocumentIntrospector<C> {
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, IntrospectionConfig::default())
    }

    pub fn with_config(connector: C, config: IntrospectionConfig) -> Self {
        Self { connector, config }
    }
}

#[async_trait(?Send)]
impl<C: DocumentConnector> Connector for DocumentIntrospector<C> {
    type Result = DocumentIntrospectionResult;

    async fn list_schemas(&self) -> Result<Vec<String>, IntrospectionError> {
        Ok(self.connector.list_schemas().await?)
    }

    async fn get_metadata(&self, schema: &str) -> Result<DatabaseMetadata, IntrospectionError> {
        Ok(self.connector.get_metadata(schema).await?)
    }

    async fn introspect(&self, schema: &str) -> Result<Self::Result, IntrospectionError> {
        let model = introspect_documents(&self.connector, schema, &self.config).await?;
        Ok(DocumentIntrospectionResult::new(model, &self.config))
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::Mongo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::IntrospectionResult;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_schema_is_fatal() {
        let store = InMemoryDocumentStore::new();
        let err = introspect_documents(&store, "db", &IntrospectionConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, IntrospectionError::EmptySchema("db".into()));
    }

    #[tokio::test]
    async fn test_introspect_renders_document_dialect() {
        let store = InMemoryDocumentStore::new().with_collection(
            "db",
            "User",
            vec![json!({
                "_id": {"$oid": "5c8b8f1e2f8e4a3b9c1d2e3f"},
                "address": {"city": "Berlin"},
            })],
        );
        let result = DocumentIntrospector::new(store).introspect("db").await.unwrap();
        assert_eq!(
            result.render_to_datamodel_string(),
            "type User {\n  _id: ID! @id\n  address: UserAddress\n}\n\ntype UserAddress @embedded {\n  city: String\n}"
        );
    }
}
