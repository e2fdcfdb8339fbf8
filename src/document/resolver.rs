//! Statistical relation resolution for document stores
//!
//! Every relation candidate field is scored against every collection: a
//! sampled value that exists as a document id in a collection is a hit, any
//! other value a miss. The collection with the best hit ratio wins if the
//! ratio exceeds the threshold. Ties go to the collection listed first.

use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, info};

use super::connector::{CollectionDescription, DataIterator, DocumentConnector, SamplingStrategy};
use crate::config::IntrospectionConfig;
use crate::datamodel::directives::{self, args};
use crate::datamodel::{Datamodel, Directive, FieldRef, FieldType, UNKNOWN_TYPE};
use crate::error::IntrospectionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Score {
    hits: usize,
    misses: usize,
}

impl Score {
    fn ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A candidate field reached from a top-level document through `path`
#[derive(Debug, Clone)]
struct Candidate {
    coordinate: FieldRef,
    path: Vec<String>,
    scores: Vec<Score>,
}

/// Turns relation candidates into relations by querying the store
#[derive(Debug, Clone, Copy)]
pub struct RelationResolver {
    strategy: SamplingStrategy,
    sample_size: usize,
    threshold: f64,
}

impl RelationResolver {
    pub fn new(strategy: SamplingStrategy, sample_size: usize, threshold: f64) -> Self {
        Self {
            strategy,
            sample_size,
            threshold,
        }
    }

    pub fn from_config(config: &IntrospectionConfig) -> Self {
        Self::new(
            config.relation_sampling_strategy,
            config.random_sample_size,
            config.relation_threshold,
        )
    }

    /// Resolve candidates of every non-embedded type in place.
    ///
    /// Unknown relation markers are cleared whether or not a relation is found.
    pub async fn resolve<C>(
        &self,
        model: &mut Datamodel,
        connector: &C,
        collections: &[CollectionDescription],
    ) -> Result<(), IntrospectionError>
    where
        C: DocumentConnector + ?Sized,
    {
        let top_level: Vec<String> = model
            .types
            .iter()
            .filter(|t| !t.is_embedded)
            .map(|t| t.name.clone())
            .collect();

        let mut connected = 0;
        for type_name in top_level {
            let collection = collections
                .iter()
                .find(|c| c.name == type_name)
                .ok_or_else(|| IntrospectionError::UnknownCollection(type_name.clone()))?;

            let mut candidates = Vec::new();
            collect_candidates(model, &type_name, &mut Vec::new(), collections.len(), &mut candidates);
            if candidates.is_empty() {
                continue;
            }

            let mut iterator = connector
                .sample(collection, self.strategy, self.sample_size)
                .await?;
            let scored = score_all(iterator.as_mut(), connector, collections, &mut candidates).await;
            let closed = iterator.close().await;
            scored?;
            closed?;

            for candidate in &candidates {
                if self.connect(model, candidate, collections)? {
                    connected += 1;
                }
            }
        }

        clear_markers(model);
        info!("Connected {} relations by sampling", connected);
        Ok(())
    }

    fn connect(
        &self,
        model: &mut Datamodel,
        candidate: &Candidate,
        collections: &[CollectionDescription],
    ) -> Result<bool, IntrospectionError> {
        let mut best: Option<(usize, f64)> = None;
        for (position, score) in candidate.scores.iter().enumerate() {
            let ratio = score.ratio();
            if best.is_none_or(|(_, best_ratio)| ratio > best_ratio) {
                best = Some((position, ratio));
            }
        }
        let Some((position, ratio)) = best.filter(|(_, ratio)| *ratio > self.threshold) else {
            return Ok(false);
        };

        let target = &collections[position].name;
        if !model.has_type(target) {
            return Err(IntrospectionError::UnknownType(target.clone()));
        }
        let Some(field) = model.field_mut(&candidate.coordinate) else {
            return Ok(false);
        };
        field.field_type = FieldType::Reference(target.clone());
        field.relation_name = None;
        field
            .directives
            .push(Directive::new(directives::RELATION).with_argument(args::LINK, "INLINE"));

        debug!(
            "{}.{} references {} (hit ratio {:.2})",
            candidate.coordinate.type_name, candidate.coordinate.field_name, target, ratio
        );
        Ok(true)
    }
}

fn is_candidate_marker(relation_name: &Option<String>) -> bool {
    relation_name.as_deref() == Some(UNKNOWN_TYPE)
}

/// Candidate fields of `type_name` and of the embedded types below it
fn collect_candidates(
    model: &Datamodel,
    type_name: &str,
    path: &mut Vec<String>,
    collection_count: usize,
    out: &mut Vec<Candidate>,
) {
    let Some(ty) = model.type_by_name(type_name) else {
        return;
    };
    for field in ty.fields.iter().filter(|f| !f.has_error()) {
        match &field.field_type {
            FieldType::Scalar(_) if is_candidate_marker(&field.relation_name) => {
                let mut field_path = path.clone();
                field_path.push(field.name.clone());
                out.push(Candidate {
                    coordinate: FieldRef::new(type_name, &field.name),
                    path: field_path,
                    scores: vec![Score::default(); collection_count],
                });
            }
            FieldType::Reference(embedded)
                if model.type_by_name(embedded).is_some_and(|t| t.is_embedded)
                    && !path.contains(&field.name) =>
            {
                path.push(field.name.clone());
                collect_candidates(model, embedded, path, collection_count, out);
                path.pop();
            }
            _ => {}
        }
    }
}

/// Leaf values at `path`, descending into arrays along the way
fn values_at<'a>(value: &'a Value, path: &[String], out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| values_at(item, path, out)),
        Value::Null => {}
        _ => match path.split_first() {
            None => out.push(value),
            Some((key, rest)) => {
                if let Some(child) = value.get(key.as_str()) {
                    values_at(child, rest, out);
                }
            }
        },
    }
}

async fn score_all<C>(
    iterator: &mut dyn DataIterator,
    connector: &C,
    collections: &[CollectionDescription],
    candidates: &mut [Candidate],
) -> anyhow::Result<()>
where
    C: DocumentConnector + ?Sized,
{
    while iterator.has_next().await? {
        let document = iterator.next().await?;
        for candidate in candidates.iter_mut() {
            let mut values = Vec::new();
            values_at(&document, &candidate.path, &mut values);
            for value in values {
                // One lookup per collection, all in flight at once
                let found = try_join_all(
                    collections
                        .iter()
                        .map(move |collection| connector.exists(collection, value)),
                )
                .await?;
                for (exists, score) in found.into_iter().zip(candidate.scores.iter_mut()) {
                    if exists {
                        score.hits += 1;
                    } else {
                        score.misses += 1;
                    }
                }
            }
        }
    }
    Ok(())
}

fn clear_markers(model: &mut Datamodel) {
    for field in model.types.iter_mut().flat_map(|t| t.fields.iter_mut()) {
        if is_candidate_marker(&field.relation_name) {
            field.relation_name = None;
        }
    }
}
