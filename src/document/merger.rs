//! Type merging over sampled documents
//!
//! A [`ModelMerger`] is fed one document at a time. Analysis only ever adds
//! observations; conflicts are resolved when the type is built.

use serde_json::Value;
use tracing::debug;

use super::primitive::{ID_KEY, InternalType, PrimitiveInferrer, TypeInfo, UnsupportedType};
use crate::datamodel::naming::capitalize;
use crate::datamodel::{Comment, Field, FieldType, Type, TypeIdentifier, UNKNOWN_TYPE};

/// Observations for one field
#[derive(Debug, Clone)]
struct FieldInfo {
    name: String,
    types: Vec<InternalType>,
    is_array: Vec<bool>,
    invalid_types: Vec<String>,
    is_relation_candidate: bool,
}

impl FieldInfo {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            types: Vec::new(),
            is_array: Vec::new(),
            invalid_types: Vec::new(),
            is_relation_candidate: false,
        }
    }

    fn observe(&mut self, info: TypeInfo) {
        if let Some(ty) = info.ty {
            push_unique(&mut self.types, ty);
        }
        push_unique(&mut self.is_array, info.is_array);
        self.is_relation_candidate |= info.is_relation_candidate;
    }
}

fn push_unique<T: PartialEq>(target: &mut Vec<T>, value: T) {
    if !target.contains(&value) {
        target.push(value);
    }
}

/// A merged top-level type and every embedded type below it
#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub top_level: Type,
    pub embedded: Vec<Type>,
}

impl MergeResult {
    pub fn into_types(self) -> Vec<Type> {
        let mut types = Vec::with_capacity(self.embedded.len() + 1);
        types.push(self.top_level);
        types.extend(self.embedded);
        types
    }
}

/// Accumulates the structure of one collection or embedded document
#[derive(Debug, Clone)]
pub struct ModelMerger {
    name: String,
    is_embedded: bool,
    inferrer: PrimitiveInferrer,
    fields: Vec<FieldInfo>,
    embedded: Vec<(String, ModelMerger)>,
}

impl ModelMerger {
    pub fn new(name: impl Into<String>, is_embedded: bool, inferrer: PrimitiveInferrer) -> Self {
        Self {
            name: name.into(),
            is_embedded,
            inferrer,
            fields: Vec::new(),
            embedded: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add the fields of one document. Non-object values carry no fields.
    pub fn analyze(&mut self, document: &Value) {
        let Value::Object(map) = document else {
            debug!("Skipping non-object sample in {}", self.name);
            return;
        };
        for (name, value) in map {
            self.analyze_field(name, value);
        }
    }

    fn analyze_field(&mut self, name: &str, value: &Value) {
        match self.inferrer.infer_type(value) {
            Ok(info) => {
                if info.ty == Some(InternalType::Object) {
                    let child = self.embedded_merger(name);
                    match value {
                        Value::Array(items) => items.iter().for_each(|item| child.analyze(item)),
                        other => child.analyze(other),
                    }
                }
                self.field_info(name).observe(info);
            }
            Err(UnsupportedType::Value(invalid)) => {
                push_unique(&mut self.field_info(name).invalid_types, invalid);
            }
            Err(UnsupportedType::Array(invalid)) => {
                let field = self.field_info(name);
                push_unique(&mut field.is_array, true);
                push_unique(&mut field.invalid_types, invalid);
            }
        }
    }

    fn field_info(&mut self, name: &str) -> &mut FieldInfo {
        let position = match self.fields.iter().position(|f| f.name == name) {
            Some(position) => position,
            None => {
                self.fields.push(FieldInfo::new(name));
                self.fields.len() - 1
            }
        };
        &mut self.fields[position]
    }

    fn embedded_merger(&mut self, field: &str) -> &mut ModelMerger {
        let position = match self.embedded.iter().position(|(name, _)| name == field) {
            Some(position) => position,
            None => {
                let child = ModelMerger::new(
                    format!("{}{}", self.name, capitalize(field)),
                    true,
                    self.inferrer,
                );
                self.embedded.push((field.to_string(), child));
                self.embedded.len() - 1
            }
        };
        &mut self.embedded[position].1
    }

    /// This type alone; embedded fields still carry the object marker type
    pub fn top_level_type(&self) -> Type {
        let mut ty = Type::new(&self.name);
        ty.is_embedded = self.is_embedded;
        ty.fields = self.fields.iter().map(|info| self.to_field(info)).collect();
        ty
    }

    /// This type with embedded types resolved recursively
    pub fn merge(&self) -> MergeResult {
        let mut top_level = self.top_level_type();
        let mut embedded = Vec::new();

        for (field_name, child) in &self.embedded {
            let child_result = child.merge();
            if let Some(field) = top_level.field_mut(field_name)
                && field.field_type == object_marker()
            {
                field.field_type = FieldType::Reference(child_result.top_level.name.clone());
            }
            embedded.extend(child_result.into_types());
        }

        MergeResult {
            top_level,
            embedded,
        }
    }

    fn to_field(&self, info: &FieldInfo) -> Field {
        let mut comments = Vec::new();
        let mut is_list = false;
        let candidates = summarize(&info.types);
        let mut field_type = FieldType::unknown();

        if info.is_array.len() > 1 {
            comments.push(Comment::error(
                "Datatype inconsistency: Sometimes is array, and sometimes not.",
            ));
        } else if candidates.len() > 1 {
            let names: Vec<String> = candidates.iter().map(ToString::to_string).collect();
            comments.push(Comment::error(format!(
                "Datatype inconsistency. Conflicting types found: {}",
                names.join(", ")
            )));
        } else if let [single] = candidates.as_slice() {
            is_list = info.is_array.first().copied().unwrap_or(false);
            field_type = match single {
                InternalType::Scalar(identifier) => FieldType::scalar(*identifier),
                InternalType::Object => object_marker(),
            };
        } else {
            let text = match info.invalid_types.as_slice() {
                [] => "No type information found for field.".to_string(),
                [invalid] => format!("Field type not supported: {invalid}"),
                many => format!(
                    "Field type not found due to conflict. Candidates: {}",
                    many.join(", ")
                ),
            };
            comments.push(Comment::error(text));
        }

        let is_id = !self.is_embedded && info.name == ID_KEY;
        if is_id && !field_type.is(TypeIdentifier::Id) {
            comments.push(Comment::info(format!(
                "Type {} is currently not supported for id fields.",
                field_type.name()
            )));
        }
        if !comments.is_empty() {
            debug!("Field {}.{} has conflicts", self.name, info.name);
        }

        let mut field = Field::new(&info.name, field_type);
        field.is_list = is_list;
        field.is_id = is_id;
        field.is_required = is_id;
        field.comments = comments;
        if info.is_relation_candidate && !is_id {
            field.relation_name = Some(UNKNOWN_TYPE.to_string());
        }
        field
    }
}

/// Placeholder type of an embedded field until its child type is named
fn object_marker() -> FieldType {
    FieldType::Reference(String::new())
}

/// Int is a misguess as soon as any Float was seen
fn summarize(types: &[InternalType]) -> Vec<InternalType> {
    let float = InternalType::Scalar(TypeIdentifier::Float);
    let int = InternalType::Scalar(TypeIdentifier::Int);
    if types.contains(&float) {
        types.iter().copied().filter(|t| *t != int).collect()
    } else {
        types.to_vec()
    }
}
