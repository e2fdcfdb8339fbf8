//! Document store capabilities consumed by sampling and relation resolution

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::primitive::ID_KEY;
use crate::connector::DatabaseMetadata;

/// How many documents a sampling pass reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    /// First document only
    One,
    /// Every document
    All,
    /// At most `sample_size` documents spread over the collection, every
    /// document if the collection is smaller. How they are drawn is up to the
    /// store.
    Random,
}

/// A collection of a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescription {
    pub schema: String,
    pub name: String,
}

impl CollectionDescription {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

/// Cursor over sampled documents. Callers must `close` it on every path.
#[async_trait(?Send)]
pub trait DataIterator {
    async fn has_next(&mut self) -> anyhow::Result<bool>;

    async fn next(&mut self) -> anyhow::Result<Value>;

    async fn close(&mut self) -> anyhow::Result<()>;
}

/// Document store access needed by introspection
#[async_trait(?Send)]
pub trait DocumentConnector: Send + Sync {
    async fn list_schemas(&self) -> anyhow::Result<Vec<String>>;

    async fn get_metadata(&self, schema: &str) -> anyhow::Result<DatabaseMetadata>;

    async fn collections(&self, schema: &str) -> anyhow::Result<Vec<CollectionDescription>>;

    async fn sample(
        &self,
        collection: &CollectionDescription,
        strategy: SamplingStrategy,
        sample_size: usize,
    ) -> anyhow::Result<Box<dyn DataIterator>>;

    /// Whether a document with id `value` exists in `collection`
    async fn exists(&self, collection: &CollectionDescription, value: &Value) -> anyhow::Result<bool>;
}

/// Iterator over documents held in memory
#[derive(Debug, Default)]
pub struct InMemoryIterator {
    documents: VecDeque<Value>,
    closed: bool,
}

impl InMemoryIterator {
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents: documents.into(),
            closed: false,
        }
    }

    /// Select documents according to `strategy`.
    ///
    /// `Random` is deterministic stride sampling: `sample_size` evenly spaced
    /// documents starting at the first, so repeated runs see the same sample.
    pub fn sample(documents: &[Value], strategy: SamplingStrategy, sample_size: usize) -> Self {
        let selected = match strategy {
            SamplingStrategy::One => documents.iter().take(1).cloned().collect(),
            SamplingStrategy::All => documents.to_vec(),
            SamplingStrategy::Random if documents.len() <= sample_size => documents.to_vec(),
            SamplingStrategy::Random => {
                let size = sample_size.max(1);
                (0..size)
                    .map(|i| documents[i * documents.len() / size].clone())
                    .collect()
            }
        };
        Self::new(selected)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait(?Send)]
impl DataIterator for InMemoryIterator {
    async fn has_next(&mut self) -> anyhow::Result<bool> {
        Ok(!self.closed && !self.documents.is_empty())
    }

    async fn next(&mut self) -> anyhow::Result<Value> {
        if self.closed {
            anyhow::bail!("Iterator is closed");
        }
        self.documents
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("No more documents"))
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.closed = true;
        self.documents.clear();
        Ok(())
    }
}

/// Document store held in memory, keyed by schema and collection
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    schemas: BTreeMap<String, BTreeMap<String, Vec<Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(
        mut self,
        schema: impl Into<String>,
        collection: impl Into<String>,
        documents: Vec<Value>,
    ) -> Self {
        self.schemas
            .entry(schema.into())
            .or_default()
            .insert(collection.into(), documents);
        self
    }

    fn documents(&self, collection: &CollectionDescription) -> anyhow::Result<&[Value]> {
        self.schemas
            .get(&collection.schema)
            .and_then(|s| s.get(&collection.name))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                anyhow::anyhow!("Collection {}.{} not found", collection.schema, collection.name)
            })
    }
}

#[async_trait(?Send)]
impl DocumentConnector for InMemoryDocumentStore {
    async fn list_schemas(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.schemas.keys().cloned().collect())
    }

    async fn get_metadata(&self, schema: &str) -> anyhow::Result<DatabaseMetadata> {
        let collections = self.schemas.get(schema);
        let size_in_bytes = collections
            .into_iter()
            .flat_map(|c| c.values().flatten())
            .map(|doc| doc.to_string().len() as u64)
            .sum();
        Ok(DatabaseMetadata {
            table_count: collections.map_or(0, BTreeMap::len),
            size_in_bytes,
        })
    }

    async fn collections(&self, schema: &str) -> anyhow::Result<Vec<CollectionDescription>> {
        Ok(self
            .schemas
            .get(schema)
            .map(|c| {
                c.keys()
                    .map(|name| CollectionDescription::new(schema, name))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn sample(
        &self,
        collection: &CollectionDescription,
        strategy: SamplingStrategy,
        sample_size: usize,
    ) -> anyhow::Result<Box<dyn DataIterator>> {
        let documents = self.documents(collection)?;
        Ok(Box::new(InMemoryIterator::sample(documents, strategy, sample_size)))
    }

    async fn exists(&self, collection: &CollectionDescription, value: &Value) -> anyhow::Result<bool> {
        Ok(self
            .documents(collection)?
            .iter()
            .any(|doc| doc.get(ID_KEY) == Some(value)))
    }
}
