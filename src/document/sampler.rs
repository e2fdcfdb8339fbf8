//! Per-collection sampling into merged types

use tracing::{debug, info};

use super::connector::{CollectionDescription, DataIterator, DocumentConnector, SamplingStrategy};
use super::merger::{MergeResult, ModelMerger};
use super::primitive::PrimitiveInferrer;
use crate::config::IntrospectionConfig;
use crate::datamodel::Type;
use crate::error::IntrospectionError;

/// Samples collections and merges their documents into types.
///
/// Relations are not inferred here; candidate fields keep the unknown
/// relation marker for the relation resolver.
#[derive(Debug, Clone, Copy)]
pub struct ModelSampler {
    strategy: SamplingStrategy,
    sample_size: usize,
    inferrer: PrimitiveInferrer,
}

impl ModelSampler {
    pub fn new(strategy: SamplingStrategy, sample_size: usize, inferrer: PrimitiveInferrer) -> Self {
        Self {
            strategy,
            sample_size,
            inferrer,
        }
    }

    pub fn from_config(config: &IntrospectionConfig) -> Self {
        Self::new(
            config.sampling_strategy,
            config.random_sample_size,
            PrimitiveInferrer::new(config.detect_formats),
        )
    }

    /// Merge every given collection; top-level types are followed by their embedded types
    pub async fn sample<C>(
        &self,
        connector: &C,
        collections: &[CollectionDescription],
    ) -> Result<Vec<Type>, IntrospectionError>
    where
        C: DocumentConnector + ?Sized,
    {
        let mut types = Vec::new();
        for collection in collections {
            types.extend(self.sample_collection(connector, collection).await?.into_types());
        }
        info!("Sampled {} collections into {} types", collections.len(), types.len());
        Ok(types)
    }

    pub async fn sample_collection<C>(
        &self,
        connector: &C,
        collection: &CollectionDescription,
    ) -> Result<MergeResult, IntrospectionError>
    where
        C: DocumentConnector + ?Sized,
    {
        let mut merger = ModelMerger::new(&collection.name, false, self.inferrer);
        let mut iterator = connector
            .sample(collection, self.strategy, self.sample_size)
            .await?;

        let analyzed = analyze_all(iterator.as_mut(), &mut merger).await;
        let closed = iterator.close().await;
        let count = analyzed?;
        closed?;

        debug!("Analyzed {} documents of {}", count, collection.name);
        Ok(merger.merge())
    }
}

async fn analyze_all(
    iterator: &mut dyn DataIterator,
    merger: &mut ModelMerger,
) -> anyhow::Result<usize> {
    let mut count = 0;
    while iterator.has_next().await? {
        let document = iterator.next().await?;
        merger.analyze(&document);
        count += 1;
    }
    Ok(count)
}
