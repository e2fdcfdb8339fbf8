//! Datamodel structures
//!
//! A [`Datamodel`] owns its types, a [`Type`] owns its fields. Relation pairs
//! are expressed through name coordinates ([`FieldRef`]) instead of pointers, so
//! every rename and removal goes through the `Datamodel` helpers which keep the
//! coordinates of both sides consistent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scalar::{TypeIdentifier, UNKNOWN_TYPE};

/// Annotation attached to a datamodel element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub text: String,
    /// Error comments cause the annotated element to be commented out on render
    pub is_error: bool,
}

impl Comment {
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }
}

/// A directive kept verbatim on a type or field.
///
/// Argument values are stored pre-rendered (strings quoted and escaped).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Directive {
    pub name: String,
    pub arguments: BTreeMap<String, String>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, rendered: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), rendered.into());
        self
    }

    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }
}

/// How an id value is generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdStrategy {
    None,
    Auto,
    Sequence,
}

impl IdStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdStrategy::None => "NONE",
            IdStrategy::Auto => "AUTO",
            IdStrategy::Sequence => "SEQUENCE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NONE" => Some(IdStrategy::None),
            "AUTO" => Some(IdStrategy::Auto),
            "SEQUENCE" => Some(IdStrategy::Sequence),
            _ => None,
        }
    }
}

/// Database sequence backing an id field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub name: String,
    pub initial_value: i64,
    pub allocation_size: i64,
}

/// Type of a field: a scalar name or the name of another type in the model.
///
/// Scalar names are not restricted to the built-in identifiers; unsupported
/// raw database types and [`UNKNOWN_TYPE`] are carried as scalars too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Scalar(String),
    Reference(String),
}

impl FieldType {
    pub fn scalar(identifier: TypeIdentifier) -> Self {
        FieldType::Scalar(identifier.as_str().to_string())
    }

    pub fn unknown() -> Self {
        FieldType::Scalar(UNKNOWN_TYPE.to_string())
    }

    pub fn name(&self) -> &str {
        match self {
            FieldType::Scalar(name) | FieldType::Reference(name) => name,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Reference(_))
    }

    /// Built-in scalar identifier, if this is one
    pub fn identifier(&self) -> Option<TypeIdentifier> {
        match self {
            FieldType::Scalar(name) => TypeIdentifier::parse(name),
            FieldType::Reference(_) => None,
        }
    }

    pub fn is(&self, identifier: TypeIdentifier) -> bool {
        self.identifier() == Some(identifier)
    }

    pub fn references(&self, type_name: &str) -> bool {
        matches!(self, FieldType::Reference(name) if name == type_name)
    }
}

/// Name coordinate of a field within a datamodel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub type_name: String,
    pub field_name: String,
}

impl FieldRef {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }
}

/// A field of a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub is_required: bool,
    pub is_list: bool,
    /// Raw default value, unquoted
    pub default_value: Option<String>,
    pub is_unique: bool,
    pub is_id: bool,
    pub is_created_at: bool,
    pub is_updated_at: bool,
    pub database_name: Option<String>,
    pub relation_name: Option<String>,
    pub related_field: Option<FieldRef>,
    pub id_strategy: Option<IdStrategy>,
    pub associated_sequence: Option<Sequence>,
    pub directives: Vec<Directive>,
    pub comments: Vec<Comment>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_required: false,
            is_list: false,
            default_value: None,
            is_unique: false,
            is_id: false,
            is_created_at: false,
            is_updated_at: false,
            database_name: None,
            relation_name: None,
            related_field: None,
            id_strategy: None,
            associated_sequence: None,
            directives: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn scalar(name: impl Into<String>, identifier: TypeIdentifier) -> Self {
        Self::new(name, FieldType::scalar(identifier))
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    /// Id and timestamp fields are managed by the database
    pub fn is_read_only(&self) -> bool {
        self.is_id || self.is_created_at || self.is_updated_at
    }

    pub fn has_error(&self) -> bool {
        self.comments.iter().any(|c| c.is_error)
    }

    /// Name of the backing column or document key
    pub fn column_name(&self) -> &str {
        self.database_name.as_deref().unwrap_or(&self.name)
    }
}

/// An index over fields of one type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub name: String,
    pub fields: Vec<String>,
    pub unique: bool,
    pub comments: Vec<Comment>,
}

impl Index {
    pub fn new(name: impl Into<String>, fields: Vec<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            fields,
            unique,
            comments: Vec::new(),
        }
    }
}

/// An object, embedded or enum type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Type {
    pub name: String,
    pub is_embedded: bool,
    pub is_enum: bool,
    pub is_link_table: bool,
    pub database_name: Option<String>,
    pub fields: Vec<Field>,
    pub indices: Vec<Index>,
    pub directives: Vec<Directive>,
    pub comments: Vec<Comment>,
}

impl Type {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_embedded: false,
            is_enum: false,
            is_link_table: false,
            database_name: None,
            fields: Vec::new(),
            indices: Vec::new(),
            directives: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Enum type; each value becomes a String field named after the value
    pub fn new_enum<S: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        let mut ty = Self::new(name);
        ty.is_enum = true;
        ty.fields = values
            .into_iter()
            .map(|value| Field::scalar(value, TypeIdentifier::String))
            .collect();
        ty
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn id_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_id)
    }

    pub fn has_error(&self) -> bool {
        self.comments.iter().any(|c| c.is_error)
    }

    /// True when the type has fields and every one of them carries an error
    pub fn all_fields_errored(&self) -> bool {
        !self.fields.is_empty() && self.fields.iter().all(Field::has_error)
    }

    /// Name of the backing table or collection
    pub fn table_name(&self) -> &str {
        self.database_name.as_deref().unwrap_or(&self.name)
    }

    /// `base`, or `base` followed by the first free numeric suffix
    pub fn unique_field_name(&self, base: &str) -> String {
        if !self.has_field(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !self.has_field(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

/// The root of an inferred or parsed schema
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Datamodel {
    pub types: Vec<Type>,
    pub comments: Vec<Comment>,
}

impl Datamodel {
    pub fn new(types: Vec<Type>) -> Self {
        Self {
            types,
            comments: Vec::new(),
        }
    }

    pub fn type_by_name(&self, name: &str) -> Option<&Type> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn type_by_name_mut(&mut self, name: &str) -> Option<&mut Type> {
        self.types.iter_mut().find(|t| t.name == name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.type_by_name(name).is_some()
    }

    pub fn field(&self, coordinate: &FieldRef) -> Option<&Field> {
        self.type_by_name(&coordinate.type_name)?
            .field(&coordinate.field_name)
    }

    pub fn field_mut(&mut self, coordinate: &FieldRef) -> Option<&mut Field> {
        self.type_by_name_mut(&coordinate.type_name)?
            .field_mut(&coordinate.field_name)
    }

    /// Counterpart of a relation field, if the pair is set
    pub fn related_field(&self, field: &Field) -> Option<&Field> {
        field
            .related_field
            .as_ref()
            .and_then(|coordinate| self.field(coordinate))
    }

    /// Whether the field references a non-enum type
    pub fn is_relation(&self, field: &Field) -> bool {
        match &field.field_type {
            FieldType::Reference(name) => self.type_by_name(name).is_some_and(|t| !t.is_enum),
            FieldType::Scalar(_) => false,
        }
    }

    /// Whether the field references an enum type
    pub fn is_enum_field(&self, field: &Field) -> bool {
        match &field.field_type {
            FieldType::Reference(name) => self.type_by_name(name).is_some_and(|t| t.is_enum),
            FieldType::Scalar(_) => false,
        }
    }

    /// Pair two relation fields. Passing the same coordinate twice makes a
    /// self-paired field.
    pub fn connect(&mut self, a: &FieldRef, b: &FieldRef) {
        if let Some(field) = self.field_mut(a) {
            field.related_field = Some(b.clone());
        }
        if let Some(field) = self.field_mut(b) {
            field.related_field = Some(a.clone());
        }
    }

    /// Clear the pairing of a field and of its counterpart
    pub fn disconnect(&mut self, coordinate: &FieldRef) {
        let Some(related) = self
            .field_mut(coordinate)
            .and_then(|field| field.related_field.take())
        else {
            return;
        };
        if let Some(other) = self.field_mut(&related)
            && other.related_field.as_ref() == Some(coordinate)
        {
            other.related_field = None;
        }
    }

    pub fn remove_field(&mut self, coordinate: &FieldRef) -> Option<Field> {
        self.disconnect(coordinate);
        let ty = self.type_by_name_mut(&coordinate.type_name)?;
        let position = ty.fields.iter().position(|f| f.name == coordinate.field_name)?;
        let removed = ty.fields.remove(position);
        drop_index_field(ty, &coordinate.field_name);
        Some(removed)
    }

    /// Remove a type together with every field that references it
    pub fn remove_type(&mut self, name: &str) -> Option<Type> {
        let position = self.types.iter().position(|t| t.name == name)?;
        let removed = self.types.remove(position);

        for ty in &mut self.types {
            let dropped: Vec<String> = ty
                .fields
                .iter()
                .filter(|f| f.field_type.references(name))
                .map(|f| f.name.clone())
                .collect();
            ty.fields.retain(|f| !f.field_type.references(name));
            for field_name in &dropped {
                drop_index_field(ty, field_name);
            }
            for field in &mut ty.fields {
                if field
                    .related_field
                    .as_ref()
                    .is_some_and(|r| r.type_name == name)
                {
                    field.related_field = None;
                }
            }
        }
        Some(removed)
    }

    /// Rename a type and every reference to it
    pub fn rename_type(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        for ty in &mut self.types {
            if ty.name == old {
                ty.name = new.to_string();
            }
            for field in &mut ty.fields {
                if field.field_type.references(old) {
                    field.field_type = FieldType::Reference(new.to_string());
                }
                if let Some(related) = &mut field.related_field
                    && related.type_name == old
                {
                    related.type_name = new.to_string();
                }
            }
        }
    }

    /// Rename a field, its index entries and every coordinate pointing at it
    pub fn rename_field(&mut self, type_name: &str, old: &str, new: &str) {
        if old == new {
            return;
        }
        let Some(ty) = self.type_by_name_mut(type_name) else {
            return;
        };
        let Some(field) = ty.field_mut(old) else {
            return;
        };
        field.name = new.to_string();
        for index in &mut ty.indices {
            for name in &mut index.fields {
                if name == old {
                    *name = new.to_string();
                }
            }
        }
        for ty in &mut self.types {
            for field in &mut ty.fields {
                if let Some(related) = &mut field.related_field
                    && related.type_name == type_name
                    && related.field_name == old
                {
                    related.field_name = new.to_string();
                }
            }
        }
    }

    /// Object types by lowercase name, enums last
    pub fn sort_types(&mut self) {
        self.types
            .sort_by_cached_key(|t| (t.is_enum, t.name.to_lowercase()));
    }

    /// Drop relation coordinates that no longer resolve to a mutual pair
    pub fn relink(&mut self) {
        let mut dangling = Vec::new();
        for ty in &self.types {
            for field in &ty.fields {
                let Some(related) = &field.related_field else {
                    continue;
                };
                let own = FieldRef::new(&ty.name, &field.name);
                let mutual = self
                    .field(related)
                    .is_some_and(|other| other.related_field.as_ref() == Some(&own));
                if !mutual {
                    dangling.push(own);
                }
            }
        }
        for coordinate in dangling {
            if let Some(field) = self.field_mut(&coordinate) {
                field.related_field = None;
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        self.comments.iter().any(|c| c.is_error)
            || self.types.iter().any(|t| {
                t.has_error()
                    || t.fields.iter().any(Field::has_error)
                    || t.indices.iter().any(|i| i.comments.iter().any(|c| c.is_error))
            })
    }
}

fn drop_index_field(ty: &mut Type, field_name: &str) {
    for index in &mut ty.indices {
        index.fields.retain(|f| f != field_name);
    }
    ty.indices.retain(|index| !index.fields.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog() -> Datamodel {
        let mut user = Type::new("User");
        user.fields = vec![
            Field::scalar("id", TypeIdentifier::Id).required(),
            Field::new("posts", FieldType::Reference("Post".into())).list(),
        ];
        let mut post = Type::new("Post");
        post.fields = vec![
            Field::scalar("id", TypeIdentifier::Id).required(),
            Field::new("author", FieldType::Reference("User".into())),
        ];
        post.indices = vec![Index::new("by_author", vec!["author".into()], false)];
        let mut model = Datamodel::new(vec![user, post]);
        model.connect(&FieldRef::new("User", "posts"), &FieldRef::new("Post", "author"));
        model
    }

    #[test]
    fn test_connect_sets_both_sides() {
        let model = blog();
        let posts = model.field(&FieldRef::new("User", "posts")).unwrap();
        let author = model.related_field(posts).unwrap();
        assert_eq!(author.name, "author");
        assert_eq!(model.related_field(author).unwrap().name, "posts");
    }

    #[test]
    fn test_rename_field_updates_counterpart_and_indices() {
        let mut model = blog();
        model.rename_field("Post", "author", "writer");
        let posts = model.field(&FieldRef::new("User", "posts")).unwrap();
        assert_eq!(posts.related_field, Some(FieldRef::new("Post", "writer")));
        assert_eq!(model.types[1].indices[0].fields, vec!["writer".to_string()]);
    }

    #[test]
    fn test_rename_type_updates_references() {
        let mut model = blog();
        model.rename_type("User", "Account");
        let author = model.field(&FieldRef::new("Post", "author")).unwrap();
        assert_eq!(author.field_type, FieldType::Reference("Account".into()));
        assert_eq!(
            author.related_field,
            Some(FieldRef::new("Account", "posts"))
        );
    }

    #[test]
    fn test_remove_type_removes_back_references() {
        let mut model = blog();
        let removed = model.remove_type("Post");
        assert!(removed.is_some());
        let user = model.type_by_name("User").unwrap();
        assert_eq!(user.fields.len(), 1);
        assert!(user.field("posts").is_none());
    }

    #[test]
    fn test_relink_drops_one_sided_pairs() {
        let mut model = blog();
        model
            .field_mut(&FieldRef::new("Post", "author"))
            .unwrap()
            .related_field = None;
        model.relink();
        let posts = model.field(&FieldRef::new("User", "posts")).unwrap();
        assert!(posts.related_field.is_none());
    }

    #[test]
    fn test_sort_types_enums_last() {
        let mut model = Datamodel::new(vec![
            Type::new_enum("Animal", ["DOG"]),
            Type::new("zebra"),
            Type::new("Apple"),
        ]);
        model.sort_types();
        let names: Vec<_> = model.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Apple", "zebra", "Animal"]);
    }

    #[test]
    fn test_unique_field_name() {
        let ty = Type::new("User").with_fields(vec![
            Field::scalar("post", TypeIdentifier::String),
            Field::scalar("post1", TypeIdentifier::String),
        ]);
        assert_eq!(ty.unique_field_name("post"), "post2");
        assert_eq!(ty.unique_field_name("comment"), "comment");
    }
}
