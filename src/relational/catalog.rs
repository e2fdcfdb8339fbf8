//! Catalog acquisition
//!
//! A [`RelationalCatalog`] answers metadata queries against one database. The
//! queries are independent and read-only, so they are issued concurrently; the
//! inference passes only start once every answer is in.

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::info;

use super::inference::RelationalInferrer;
use super::metadata::{
    Column, EnumInfo, RelationalSchema, SequenceInfo, Table, TableIndex, TableRelation,
};
use crate::config::IntrospectionConfig;
use crate::connector::{Connector, DatabaseMetadata, RelationalIntrospectionResult};
use crate::datamodel::DatabaseType;
use crate::error::IntrospectionError;

/// Metadata queries a relational database driver has to answer
#[async_trait(?Send)]
pub trait RelationalCatalog: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    async fn list_schemas(&self) -> anyhow::Result<Vec<String>>;

    /// Table names of a schema
    async fn query_tables(&self, schema: &str) -> anyhow::Result<Vec<String>>;

    async fn query_columns(&self, schema: &str, table: &str) -> anyhow::Result<Vec<Column>>;

    /// Indices of a table, the primary key flagged with `is_primary_key`
    async fn query_indices(&self, schema: &str, table: &str) -> anyhow::Result<Vec<TableIndex>>;

    /// Foreign keys of a schema
    async fn query_relations(&self, schema: &str) -> anyhow::Result<Vec<TableRelation>>;

    async fn query_enums(&self, _schema: &str) -> anyhow::Result<Vec<EnumInfo>> {
        Ok(Vec::new())
    }

    async fn query_sequences(&self, _schema: &str) -> anyhow::Result<Vec<SequenceInfo>> {
        Ok(Vec::new())
    }

    async fn query_metadata(&self, schema: &str) -> anyhow::Result<DatabaseMetadata>;
}

/// Collect the full metadata set of a schema
pub async fn query_schema<C>(catalog: &C, schema: &str) -> Result<RelationalSchema, IntrospectionError>
where
    C: RelationalCatalog + ?Sized,
{
    let (table_names, relations, enums, sequences) = tokio::try_join!(
        catalog.query_tables(schema),
        catalog.query_relations(schema),
        catalog.query_enums(schema),
        catalog.query_sequences(schema),
    )?;

    if table_names.is_empty() {
        return Err(IntrospectionError::EmptySchema(schema.to_string()));
    }

    // Per-table queries run concurrently as well; the table order is kept
    let tables = try_join_all(table_names.into_iter().map(|name| async move {
        let (columns, indices) = tokio::try_join!(
            catalog.query_columns(schema, &name),
            catalog.query_indices(schema, &name),
        )?;
        Ok::<_, anyhow::Error>(Table {
            name,
            columns,
            indices,
            primary_key: None,
        })
    }))
    .await?;

    info!(
        "Queried {} tables, {} foreign keys, {} enums and {} sequences from {}",
        tables.len(),
        relations.len(),
        enums.len(),
        sequences.len(),
        schema
    );
    Ok(RelationalSchema {
        tables,
        relations,
        enums,
        sequences,
    })
}

/// [`Connector`] over any [`RelationalCatalog`]
pub struct RelationalConnector<C> {
    catalog: C,
    config: IntrospectionConfig,
}

impl<C: RelationalCatalog> RelationalConnector<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_config(catalog, IntrospectionConfig::default())
    }

    pub fn with_config(catalog: C, config: IntrospectionConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }
}

#[async_trait(?Send)]
impl<C: RelationalCatalog> Connector for RelationalConnector<C> {
    type Result = RelationalIntrospectionResult;

    async fn list_schemas(&self) -> Result<Vec<String>, IntrospectionError> {
        Ok(self.catalog.list_schemas().await?)
    }

    async fn get_metadata(&self, schema: &str) -> Result<DatabaseMetadata, IntrospectionError> {
        Ok(self.catalog.query_metadata(schema).await?)
    }

    async fn introspect(&self, schema: &str) -> Result<Self::Result, IntrospectionError> {
        let database = self.catalog.database_type();
        let metadata = query_schema(&self.catalog, schema).await?;
        let model = RelationalInferrer::new(database).infer(&metadata)?;
        Ok(RelationalIntrospectionResult::new(model, database, &self.config))
    }

    fn database_type(&self) -> DatabaseType {
        self.catalog.database_type()
    }
}
