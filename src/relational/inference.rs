//! Relational inference
//!
//! Builds a datamodel from catalog metadata in ten ordered passes. Every pass
//! runs over every type; anomalies become error comments, only broken
//! metadata (a foreign key to an unknown table or column) aborts the run.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use super::flavor::Flavor;
use super::hiding::{hide_join_tables, hide_scalar_lists};
use super::metadata::{RelationalSchema, Table, TableRelation};
use crate::datamodel::dialect::ID_FIELD;
use crate::datamodel::naming::{camel_case, plural, remove_id_suffix};
use crate::datamodel::{
    Comment, DatabaseType, Datamodel, Field, FieldRef, FieldType, IdStrategy, Index, Sequence, Type,
};
use crate::error::IntrospectionError;

pub(crate) fn unsupported_type_comment(raw: &str) -> String {
    format!("Type '{raw}' is not supported.")
}

/// Runs the relational inference passes for one database flavor
#[derive(Debug, Clone, Copy)]
pub struct RelationalInferrer {
    flavor: Flavor,
}

impl RelationalInferrer {
    pub fn new(database: DatabaseType) -> Self {
        Self {
            flavor: Flavor::new(database),
        }
    }

    pub fn infer(&self, schema: &RelationalSchema) -> Result<Datamodel, IntrospectionError> {
        let mut model = self.infer_objects(schema);
        fold_unique_indices(&mut model);
        self.resolve_sequences(&mut model, schema);
        resolve_fallback_ids(&mut model);
        self.infer_type_identifiers(&mut model);
        resolve_relations(&mut model, &schema.relations)?;
        self.wire_enums(&mut model);
        hide_join_tables(&mut model);
        hide_scalar_lists(&mut model);
        self.cleanup(&mut model);

        info!(
            "Inferred {} types from {} tables and {} enums",
            model.types.len(),
            schema.tables.len(),
            schema.enums.len()
        );
        Ok(model)
    }

    /// Pass 1: one type per table and enum
    fn infer_objects(&self, schema: &RelationalSchema) -> Datamodel {
        let mut types = Vec::with_capacity(schema.tables.len() + schema.enums.len());
        let mut anonymous_enums: Vec<Type> = Vec::new();

        for table in &schema.tables {
            types.push(self.infer_object(table, &mut anonymous_enums));
        }
        for info in &schema.enums {
            types.push(Type::new_enum(&info.name, info.values.iter().cloned()));
        }
        for anonymous in anonymous_enums {
            if !types.iter().any(|t| t.name == anonymous.name) {
                types.push(anonymous);
            }
        }
        Datamodel::new(types)
    }

    fn infer_object(&self, table: &Table, anonymous_enums: &mut Vec<Type>) -> Type {
        let primary_key = table.primary_key_fields();
        let mut ty = Type::new(&table.name);

        for column in &table.columns {
            let raw_type = match self
                .flavor
                .anonymous_enum(&table.name, &column.name, &column.type_name)
            {
                Some((name, values)) => {
                    anonymous_enums.push(Type::new_enum(&name, values));
                    name
                }
                None => column.type_name.clone(),
            };

            let mut field = Field::new(&column.name, FieldType::Scalar(raw_type));
            field.is_list = column.is_list;
            field.is_required = !column.is_nullable && !column.is_list;
            field.is_id = primary_key.contains(&column.name.as_str());
            field.default_value = column.default_value.clone();
            if let Some(comment) = &column.comment {
                field.comments.push(Comment::info(comment));
            }
            ty.fields.push(field);
        }

        for index in table.indices.iter().filter(|i| !i.is_primary_key) {
            let mut inferred = Index::new(&index.name, index.fields.clone(), index.unique);
            for missing in index.fields.iter().filter(|f| !ty.has_field(f)) {
                inferred.comments.push(Comment::error(format!(
                    "Error during index association. Field {missing} is missing on index {}.",
                    index.name
                )));
            }
            ty.indices.push(inferred);
        }
        ty
    }

    /// Pass 3: sequences and auto-increment columns
    fn resolve_sequences(&self, model: &mut Datamodel, schema: &RelationalSchema) {
        for table in &schema.tables {
            let Some(ty) = model.type_by_name_mut(&table.name) else {
                continue;
            };
            let type_name = ty.name.clone();
            for column in &table.columns {
                let Some(field) = ty.field_mut(&column.name) else {
                    continue;
                };
                if column.is_auto_increment {
                    field.id_strategy = Some(IdStrategy::Auto);
                }
                let Some(sequence_name) = field
                    .default_value
                    .as_deref()
                    .and_then(|d| self.flavor.sequence_name(d))
                else {
                    continue;
                };
                field.default_value = None;
                match schema.sequences.iter().find(|s| s.name == sequence_name) {
                    Some(sequence) => {
                        field.id_strategy = Some(IdStrategy::Sequence);
                        field.associated_sequence = Some(Sequence {
                            name: sequence.name.clone(),
                            initial_value: sequence.initial_value,
                            allocation_size: sequence.allocation_size,
                        });
                    }
                    None => field.comments.push(Comment::error(format!(
                        "Error resolving sequence {sequence_name} for {type_name}.{}: The sequence was not found.",
                        field.name
                    ))),
                }
            }
        }
    }

    /// Pass 5: raw column types to scalars, then defaults against the scalar
    fn infer_type_identifiers(&self, model: &mut Datamodel) {
        for ty in model.types.iter_mut().filter(|t| !t.is_enum) {
            for field in &mut ty.fields {
                let FieldType::Scalar(raw) = &field.field_type else {
                    continue;
                };
                match self.flavor.type_identifier(raw, field.is_id) {
                    Some(identifier) => {
                        field.field_type = FieldType::scalar(identifier);
                        field.default_value = field
                            .default_value
                            .take()
                            .and_then(|d| self.flavor.parse_default_value(&d, Some(identifier)));
                    }
                    None => {
                        let comment = unsupported_type_comment(raw);
                        field.comments.push(Comment::error(comment));
                    }
                }
            }
        }
    }

    /// Pass 7: placeholder types naming an enum become enum references
    fn wire_enums(&self, model: &mut Datamodel) {
        let enums: BTreeSet<String> = model
            .types
            .iter()
            .filter(|t| t.is_enum)
            .map(|t| t.name.clone())
            .collect();

        for ty in model.types.iter_mut().filter(|t| !t.is_enum) {
            for field in &mut ty.fields {
                let FieldType::Scalar(raw) = &field.field_type else {
                    continue;
                };
                if !enums.contains(raw) {
                    continue;
                }
                let comment = unsupported_type_comment(raw);
                field.comments.retain(|c| c.text != comment);
                field.field_type = FieldType::Reference(raw.clone());
                field.default_value = field
                    .default_value
                    .take()
                    .and_then(|d| self.flavor.parse_default_value(&d, None));
            }
        }
    }

    /// Pass 10
    fn cleanup(&self, model: &mut Datamodel) {
        for name in self.flavor.reserved_types() {
            if model.remove_type(name).is_some() {
                debug!("Removed internal type {}", name);
            }
        }

        let relation_fields: BTreeSet<FieldRef> = model
            .types
            .iter()
            .flat_map(|ty| {
                ty.fields
                    .iter()
                    .filter(|f| model.is_relation(f))
                    .map(|f| FieldRef::new(&ty.name, &f.name))
                    .collect::<Vec<_>>()
            })
            .collect();

        for ty in &mut model.types {
            let type_name = ty.name.clone();
            ty.indices.retain(|index| {
                !(index.fields.len() == 1
                    && relation_fields.contains(&FieldRef::new(&type_name, &index.fields[0])))
            });

            for field in ty.fields.iter_mut().filter(|f| !f.is_id) {
                if field.id_strategy == Some(IdStrategy::Sequence) {
                    field.comments.push(Comment::error(format!(
                        "Field {} uses a sequence but is not an id field. Sequences are only supported on id fields.",
                        field.name
                    )));
                }
            }

            if !ty.is_link_table && ty.id_fields().count() > 1 {
                let ids: Vec<&str> = ty.id_fields().map(|f| f.name.as_str()).collect();
                let comment = format!(
                    "Compound ids are not supported. Type {} uses the fields {} as id.",
                    ty.name,
                    ids.join(", ")
                );
                ty.comments.push(Comment::error(comment));
            }
        }
    }
}

/// Pass 2: single-field unique indices become field flags
fn fold_unique_indices(model: &mut Datamodel) {
    for ty in &mut model.types {
        let mut kept = Vec::with_capacity(ty.indices.len());
        for index in std::mem::take(&mut ty.indices) {
            let single = index.unique && index.fields.len() == 1 && index.comments.is_empty();
            let folded = single
                && match ty.field_mut(&index.fields[0]) {
                    Some(field) => {
                        field.is_unique = true;
                        true
                    }
                    None => false,
                };
            if !folded {
                kept.push(index);
            }
        }
        ty.indices = kept;
    }
}

/// Pass 4: pick an id for types without a primary key
fn resolve_fallback_ids(model: &mut Datamodel) {
    for ty in model.types.iter_mut().filter(|t| !t.is_enum) {
        if ty.fields.iter().any(|f| f.is_id) {
            continue;
        }
        let generated: Vec<usize> = positions(ty, |f| {
            matches!(f.id_strategy, Some(IdStrategy::Sequence | IdStrategy::Auto))
        });
        let named: Vec<usize> = positions(ty, |f| f.name == ID_FIELD && f.is_unique);
        let unique: Vec<usize> = positions(ty, |f| f.is_unique);

        let chosen = match (generated.as_slice(), named.as_slice(), unique.as_slice()) {
            ([single], _, _) => Some(*single),
            (_, [single], _) => Some(*single),
            (_, _, [single]) => Some(*single),
            _ => None,
        };
        if let Some(position) = chosen {
            debug!("Using {}.{} as id", ty.name, ty.fields[position].name);
            ty.fields[position].is_id = true;
        }
    }

    for ty in &mut model.types {
        if ty.id_fields().count() == 1
            && let Some(id) = ty.fields.iter_mut().find(|f| f.is_id)
        {
            id.is_unique = true;
        }
    }
}

fn positions(ty: &Type, predicate: impl Fn(&Field) -> bool) -> Vec<usize> {
    ty.fields
        .iter()
        .enumerate()
        .filter(|(_, f)| predicate(f))
        .map(|(i, _)| i)
        .collect()
}

fn find_column(
    model: &Datamodel,
    table: &str,
    column: &str,
) -> Result<FieldRef, IntrospectionError> {
    let ty = model
        .types
        .iter()
        .find(|t| !t.is_enum && t.table_name() == table)
        .ok_or_else(|| IntrospectionError::UnknownTable(table.to_string()))?;
    let field = ty
        .fields
        .iter()
        .find(|f| f.column_name() == column)
        .ok_or_else(|| IntrospectionError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        })?;
    Ok(FieldRef::new(&ty.name, &field.name))
}

/// Pass 6: foreign keys become relation pairs
fn resolve_relations(
    model: &mut Datamodel,
    relations: &[TableRelation],
) -> Result<(), IntrospectionError> {
    let mut pair_counts: HashMap<(&str, &str), usize> = HashMap::new();
    for relation in relations {
        *pair_counts
            .entry((relation.source_table.as_str(), relation.target_table.as_str()))
            .or_default() += 1;
    }

    for relation in relations {
        let source = find_column(model, &relation.source_table, &relation.source_column)?;
        let target = find_column(model, &relation.target_table, &relation.target_column)?;
        let ambiguous = pair_counts
            .get(&(relation.source_table.as_str(), relation.target_table.as_str()))
            .is_some_and(|count| *count > 1);
        let relation_name = ambiguous.then(|| {
            format!(
                "{}_{}",
                plural(&relation.source_table),
                plural(remove_id_suffix(&relation.source_column))
            )
        });

        let target_is_id = model.field(&target).is_some_and(|f| f.is_id);
        let source_is_unique = model.field(&source).is_some_and(|f| f.is_unique);

        if let Some(field) = model.field_mut(&source) {
            field.field_type = FieldType::Reference(target.type_name.clone());
            field.relation_name = relation_name.clone();
            if !target_is_id {
                field.comments.push(Comment::error(format!(
                    "The foreign key {}.{} references {}.{}, which is not the id of type {}.",
                    relation.source_table,
                    relation.source_column,
                    relation.target_table,
                    relation.target_column,
                    target.type_name
                )));
            }
        }

        let base_name = match &relation_name {
            Some(name) => camel_case(name),
            None => camel_case(&source.type_name),
        };
        let Some(target_type) = model.type_by_name_mut(&target.type_name) else {
            return Err(IntrospectionError::UnknownType(target.type_name));
        };
        let back_name = target_type.unique_field_name(&base_name);
        let mut back = Field::new(&back_name, FieldType::Reference(source.type_name.clone()));
        back.is_list = !source_is_unique;
        back.relation_name = relation_name;
        target_type.fields.push(back);

        let back_ref = FieldRef::new(&target.type_name, back_name);
        model.connect(&source, &back_ref);
    }

    debug!("Resolved {} foreign keys", relations.len());
    Ok(())
}
