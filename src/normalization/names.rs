//! Name normalization without a reference schema

use std::collections::{BTreeSet, HashMap};

use petgraph::Graph;
use petgraph::algo::toposort;
use tracing::{debug, warn};

use super::Normalizer;
use crate::datamodel::naming::{camel_case, capitalize, is_all_uppercase, singular};
use crate::datamodel::{Comment, Datamodel, FieldRef, FieldType, is_type_identifier};

pub(crate) const FIELD_CONFLICT_COMMENT: &str =
    "Field name normalization failed because of a conflicting field name.";

/// Renames types and fields to the usual datamodel conventions.
///
/// Types become singular and capitalized, fields camel-cased. The original
/// name is kept as the database name, and a name that already carries a
/// database name is left alone.
#[derive(Debug, Clone, Default)]
pub struct ModelNameNormalizer {
    /// Types whose names are fixed by a reference schema
    fixed_types: BTreeSet<String>,
    fixed_fields: BTreeSet<FieldRef>,
}

impl ModelNameNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixed_types(fixed_types: impl IntoIterator<Item = String>) -> Self {
        Self {
            fixed_types: fixed_types.into_iter().collect(),
            fixed_fields: BTreeSet::new(),
        }
    }

    pub fn with_fixed_fields(mut self, fixed_fields: impl IntoIterator<Item = FieldRef>) -> Self {
        self.fixed_fields = fixed_fields.into_iter().collect();
        self
    }

    fn normalize_type_names(&self, model: &mut Datamodel) {
        let names: Vec<String> = model
            .types
            .iter()
            .filter(|t| !t.is_embedded && t.database_name.is_none())
            .filter(|t| !self.fixed_types.contains(&t.name))
            .map(|t| t.name.clone())
            .collect();

        for name in names {
            let Some(normalized) = normalized_type_name(&name, model) else {
                continue;
            };
            model.rename_type(&name, &normalized);
            if let Some(ty) = model.type_by_name_mut(&normalized) {
                ty.database_name = Some(name);
            }
        }
    }

    fn normalize_fields(&self, model: &mut Datamodel, type_name: &str) {
        let Some(ty) = model.type_by_name(type_name) else {
            return;
        };
        if ty.is_enum {
            return;
        }
        let field_names: Vec<String> = ty
            .fields
            .iter()
            .filter(|f| !f.is_id)
            .filter(|f| !self.fixed_fields.contains(&FieldRef::new(type_name, &f.name)))
            .map(|f| f.name.clone())
            .collect();

        for field_name in field_names {
            let current = match normalized_field_name(model, type_name, &field_name) {
                Some(normalized) => {
                    assign_field_name(model, type_name, &field_name, &normalized);
                    if model.field(&FieldRef::new(type_name, &normalized)).is_some() {
                        normalized
                    } else {
                        field_name
                    }
                }
                None => {
                    if let Some(field) = model.field_mut(&FieldRef::new(type_name, &field_name))
                        && !field.comments.iter().any(|c| c.text == FIELD_CONFLICT_COMMENT)
                    {
                        field.comments.push(Comment::info(FIELD_CONFLICT_COMMENT));
                    }
                    field_name
                }
            };
            self.rename_embedded_type(model, type_name, &current);
        }
    }

    /// Embedded types are named after the path that reaches them
    fn rename_embedded_type(&self, model: &mut Datamodel, parent: &str, field_name: &str) {
        let Some(FieldType::Reference(target)) = model
            .field(&FieldRef::new(parent, field_name))
            .map(|f| f.field_type.clone())
        else {
            return;
        };
        if self.fixed_types.contains(&target)
            || !model.type_by_name(&target).is_some_and(|t| t.is_embedded)
        {
            return;
        }
        let renamed = format!("{parent}{}", capitalize(&singular(field_name)));
        if renamed == target || model.has_type(&renamed) {
            return;
        }
        model.rename_type(&target, &renamed);
    }
}

fn normalized_type_name(name: &str, model: &Datamodel) -> Option<String> {
    if is_all_uppercase(name) {
        return None;
    }
    let singular_name = singular(name);
    let normalized = capitalize(&camel_case(&singular_name));
    if normalized == name
        || normalized.is_empty()
        || is_type_identifier(&normalized)
        || is_type_identifier(&singular_name)
        || model.has_type(&normalized)
    {
        return None;
    }
    Some(normalized)
}

/// `None` when the normalized name is taken by another field
fn normalized_field_name(model: &Datamodel, type_name: &str, field_name: &str) -> Option<String> {
    let ty = model.type_by_name(type_name)?;
    let field = ty.field(field_name)?;

    let normalized = if is_all_uppercase(field_name) {
        field_name.to_lowercase()
    } else {
        let mut base = field_name;
        if field.field_type.is_reference() && field_name.to_lowercase().ends_with("_id") {
            base = &field_name[..field_name.len() - 3];
        }
        camel_case(base)
    };

    if normalized.is_empty() {
        return Some(field_name.to_string());
    }
    let taken = ty
        .fields
        .iter()
        .any(|f| f.name == normalized && f.name != field_name);
    (!taken).then_some(normalized)
}

fn assign_field_name(model: &mut Datamodel, type_name: &str, old: &str, new: &str) {
    if old == new {
        return;
    }
    let Some(field) = model
        .type_by_name_mut(type_name)
        .and_then(|t| t.field_mut(old))
    else {
        return;
    };
    if field.database_name.is_some() {
        return;
    }
    field.database_name = Some(old.to_string());
    model.rename_field(type_name, old, new);
}

/// Parents before the embedded types they reference
fn embedding_order(model: &Datamodel) -> Vec<String> {
    let mut graph = Graph::<String, ()>::new();
    let mut nodes = HashMap::new();
    for ty in &model.types {
        nodes.insert(ty.name.clone(), graph.add_node(ty.name.clone()));
    }
    for ty in &model.types {
        for field in &ty.fields {
            let FieldType::Reference(target) = &field.field_type else {
                continue;
            };
            let embedded = model.type_by_name(target).is_some_and(|t| t.is_embedded);
            if let (true, Some(&from), Some(&to)) = (embedded, nodes.get(&ty.name), nodes.get(target))
                && from != to
            {
                graph.add_edge(from, to, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => order.into_iter().map(|node| graph[node].clone()).collect(),
        Err(cycle) => {
            warn!("Embedded types form a cycle at {}", graph[cycle.node_id()]);
            model.types.iter().map(|t| t.name.clone()).collect()
        }
    }
}

impl Normalizer for ModelNameNormalizer {
    fn normalize(&self, model: &mut Datamodel) {
        self.normalize_type_names(model);

        // Names are tracked by position since embedded types get renamed on the way
        let order = embedding_order(model);
        let positions: Vec<usize> = order
            .iter()
            .filter_map(|name| model.types.iter().position(|t| &t.name == name))
            .collect();
        for position in positions {
            let Some(name) = model.types.get(position).map(|t| t.name.clone()) else {
                continue;
            };
            self.normalize_fields(model, &name);
        }
        debug!("Normalized names of {} types", model.types.len());
    }
}
