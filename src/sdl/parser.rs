//! Datamodel parser
//!
//! Turns a GraphQL schema document into a [`Datamodel`]: structural directives
//! become flags, type names become references and relation pairs are connected.

use std::collections::{BTreeMap, HashSet};

use graphql_parser::schema::{
    self as gql, Definition, Document, EnumType, ObjectType, ParseError, TypeDefinition, Value,
};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::renderer::quote;
use crate::datamodel::directives::{self, args};
use crate::datamodel::{
    DatabaseType, Datamodel, Dialect, Directive, Field, FieldRef, FieldType, IdStrategy, Index,
    Sequence, Type,
};
use crate::error::IntrospectionError;

/// Schema documents with owned names
pub type SchemaDocument<'a> = Document<'a, String>;
type SchemaDirective<'a> = gql::Directive<'a, String>;
type SchemaValue<'a> = Value<'a, String>;

static ERROR_POSITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Parse error at (\d+):(\d+)").unwrap());

/// Parses SDL into a datamodel using the conventions of one dialect
#[derive(Debug, Clone, Copy)]
pub struct Parser {
    dialect: Dialect,
}

impl Parser {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn for_database(database: DatabaseType) -> Self {
        Self::new(database.dialect())
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Parse SDL source text
    pub fn parse_from_schema_string(&self, sdl: &str) -> Result<Datamodel, IntrospectionError> {
        let document = gql::parse_schema::<String>(sdl).map_err(syntax_error)?;
        self.parse_from_document(&document)
    }

    /// Parse an already parsed schema document.
    ///
    /// Only object and enum type definitions contribute types; schema, scalar,
    /// interface, union, input and directive definitions as well as extensions
    /// are skipped.
    pub fn parse_from_document(
        &self,
        document: &SchemaDocument<'_>,
    ) -> Result<Datamodel, IntrospectionError> {
        let mut types = Vec::with_capacity(document.definitions.len());
        for definition in &document.definitions {
            match definition {
                Definition::TypeDefinition(TypeDefinition::Object(object)) => {
                    types.push(self.parse_object_type(object)?)
                }
                Definition::TypeDefinition(TypeDefinition::Enum(enumeration)) => {
                    types.push(self.parse_enum_type(enumeration)?)
                }
                _ => debug!("Skipping definition without a datamodel counterpart"),
            }
        }

        let mut model = Datamodel::new(types);
        resolve_relations(&mut model)?;
        model.sort_types();

        debug!(
            "Parsed {} types ({:?} dialect)",
            model.types.len(),
            self.dialect
        );
        Ok(model)
    }

    fn parse_object_type(&self, object: &ObjectType<'_, String>) -> Result<Type, IntrospectionError> {
        let mut ty = Type::new(&object.name);
        ty.is_embedded = has_directive(&object.directives, directives::EMBEDDED);
        ty.is_link_table = has_directive(&object.directives, directives::LINK_TABLE);
        ty.database_name =
            name_argument(&object.directives, self.dialect.table_name_directive())?;
        ty.directives = self.stored_directives(&object.directives);
        ty.fields = object
            .fields
            .iter()
            .map(|field| self.parse_field(field))
            .collect::<Result<_, _>>()?;
        ty.indices = parse_indices(&object.directives, &ty)?;
        Ok(ty)
    }

    fn parse_enum_type(&self, enumeration: &EnumType<'_, String>) -> Result<Type, IntrospectionError> {
        let mut ty = Type::new_enum(
            &enumeration.name,
            enumeration.values.iter().map(|v| v.name.clone()),
        );
        ty.database_name =
            name_argument(&enumeration.directives, self.dialect.table_name_directive())?;
        ty.directives = self.stored_directives(&enumeration.directives);
        Ok(ty)
    }

    fn parse_field(&self, definition: &gql::Field<'_, String>) -> Result<Field, IntrospectionError> {
        let found = &definition.directives;
        let id_directive = find_directive(found, directives::ID);

        let mut field = Field::new(
            &definition.name,
            FieldType::Scalar(named_type(&definition.field_type).to_string()),
        );
        field.is_list = is_list(&definition.field_type);
        field.is_required = !field.is_list
            && matches!(definition.field_type, gql::Type::NonNullType(_));
        field.is_id = self
            .dialect
            .is_id_field(&definition.name, id_directive.is_some());
        field.is_unique = field.is_id || has_directive(found, directives::UNIQUE);
        field.is_created_at = self.dialect.is_created_at_field(
            &definition.name,
            has_directive(found, directives::CREATED_AT),
        );
        field.is_updated_at = self.dialect.is_updated_at_field(
            &definition.name,
            has_directive(found, directives::UPDATED_AT),
        );
        field.default_value = find_directive(found, directives::DEFAULT)
            .and_then(|d| d.argument(args::VALUE))
            .map(SdlValue::raw);
        field.relation_name = find_directive(found, directives::RELATION)
            .and_then(|d| d.argument(args::NAME))
            .and_then(SdlValue::as_name)
            .map(str::to_string);
        field.database_name = name_argument(found, self.dialect.column_name_directive())?;
        if let Some(directive) = id_directive {
            field.id_strategy = parse_id_strategy(directive)?;
        }
        field.associated_sequence = find_directive(found, directives::SEQUENCE)
            .map(parse_sequence)
            .transpose()?;
        field.directives = self.stored_directives(found);
        Ok(field)
    }

    /// Whether a directive is turned into structure by this dialect
    fn is_interpreted(&self, name: &str) -> bool {
        match name {
            directives::PG_TABLE | directives::PG_COLUMN => {
                self.dialect == Dialect::LegacyRelational
            }
            directives::DB => self.dialect != Dialect::LegacyRelational,
            other => directives::is_reserved(other),
        }
    }

    /// Directives without a structural equivalent, kept verbatim
    fn stored_directives(&self, found: &[SchemaDirective<'_>]) -> Vec<Directive> {
        let mut stored = Vec::new();
        for directive in found {
            if directive.name == directives::RELATION {
                // everything but the relation name is kept, e.g. `link: INLINE`
                let arguments: BTreeMap<String, String> = directive
                    .arguments
                    .iter()
                    .filter(|(name, _)| name != args::NAME)
                    .map(|(name, value)| (name.clone(), value.to_sdl()))
                    .collect();
                if !arguments.is_empty() {
                    stored.push(Directive {
                        name: directive.name.clone(),
                        arguments,
                    });
                }
            } else if !self.is_interpreted(&directive.name) {
                stored.push(convert_directive(directive));
            }
        }
        stored
    }
}

/// The grammar reports positions only inside its message
fn syntax_error(err: ParseError) -> IntrospectionError {
    let message = err.to_string();
    let position = ERROR_POSITION.captures(&message).map(|c| {
        let number = |i: usize| -> usize {
            c.get(i)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0)
        };
        (number(1), number(2))
    });
    let (line, column) = position.unwrap_or((0, 0));
    IntrospectionError::Syntax {
        line,
        column,
        message,
    }
}

fn named_type<'t>(field_type: &'t gql::Type<'_, String>) -> &'t str {
    match field_type {
        gql::Type::NamedType(name) => name,
        gql::Type::ListType(inner) | gql::Type::NonNullType(inner) => named_type(inner),
    }
}

/// A list anywhere in the wrapper chain makes the field a list
fn is_list(field_type: &gql::Type<'_, String>) -> bool {
    match field_type {
        gql::Type::NamedType(_) => false,
        gql::Type::ListType(_) => true,
        gql::Type::NonNullType(inner) => is_list(inner),
    }
}

/// Argument lookup on schema directives
trait DirectiveArguments<'a> {
    fn argument(&self, name: &str) -> Option<&SchemaValue<'a>>;
}

impl<'a> DirectiveArguments<'a> for SchemaDirective<'a> {
    fn argument(&self, name: &str) -> Option<&SchemaValue<'a>> {
        self.arguments
            .iter()
            .find(|(argument, _)| argument == name)
            .map(|(_, value)| value)
    }
}

/// Typed access to constant argument values
trait SdlValue: Sized {
    /// Raw textual content: strings unquoted, everything else as written
    fn raw(&self) -> String;
    /// String and enum values
    fn as_name(&self) -> Option<&str>;
    fn as_i64(&self) -> Option<i64>;
    fn as_bool(&self) -> Option<bool>;
    fn as_list(&self) -> Option<&[Self]>;
    fn object_field(&self, name: &str) -> Option<&Self>;
    fn to_sdl(&self) -> String;
}

impl SdlValue for SchemaValue<'_> {
    fn raw(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_sdl(),
        }
    }

    fn as_name(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => n.as_i64(),
            _ => None,
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn as_list(&self) -> Option<&[Self]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    fn object_field(&self, name: &str) -> Option<&Self> {
        match self {
            Value::Object(entries) => entries.get(name),
            _ => None,
        }
    }

    fn to_sdl(&self) -> String {
        match self {
            Value::String(s) => quote(s),
            Value::Int(n) => n.as_i64().map(|n| n.to_string()).unwrap_or_default(),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.1}"),
            Value::Float(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            Value::Enum(e) => e.clone(),
            Value::Variable(v) => format!("${v}"),
            Value::List(items) => format!(
                "[{}]",
                items.iter().map(SdlValue::to_sdl).collect::<Vec<_>>().join(", ")
            ),
            Value::Object(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.to_sdl()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

fn convert_directive(directive: &SchemaDirective<'_>) -> Directive {
    Directive {
        name: directive.name.clone(),
        arguments: directive
            .arguments
            .iter()
            .map(|(name, value)| (name.clone(), value.to_sdl()))
            .collect(),
    }
}

fn find_directive<'d, 'a>(
    found: &'d [SchemaDirective<'a>],
    name: &str,
) -> Option<&'d SchemaDirective<'a>> {
    found.iter().find(|d| d.name == name)
}

fn has_directive(found: &[SchemaDirective<'_>], name: &str) -> bool {
    find_directive(found, name).is_some()
}

fn invalid(directive: &str, message: impl Into<String>) -> IntrospectionError {
    IntrospectionError::InvalidDirective {
        directive: directive.to_string(),
        message: message.into(),
    }
}

/// Reads `@<directive>(name: "...")`
fn name_argument(
    found: &[SchemaDirective<'_>],
    directive: &str,
) -> Result<Option<String>, IntrospectionError> {
    match find_directive(found, directive) {
        None => Ok(None),
        Some(d) => d
            .argument(args::NAME)
            .and_then(SdlValue::as_name)
            .map(|name| Some(name.to_string()))
            .ok_or_else(|| invalid(directive, "missing string argument 'name'")),
    }
}

/// A bare `@id` leaves the strategy unset
fn parse_id_strategy(
    directive: &SchemaDirective<'_>,
) -> Result<Option<IdStrategy>, IntrospectionError> {
    match directive.argument(args::STRATEGY) {
        None => Ok(None),
        Some(value) => value
            .as_name()
            .and_then(IdStrategy::parse)
            .map(Some)
            .ok_or_else(|| {
                invalid(
                    directives::ID,
                    format!("unknown strategy {}", value.to_sdl()),
                )
            }),
    }
}

fn parse_sequence(directive: &SchemaDirective<'_>) -> Result<Sequence, IntrospectionError> {
    let name = directive
        .argument(args::NAME)
        .and_then(SdlValue::as_name)
        .ok_or_else(|| invalid(directives::SEQUENCE, "missing string argument 'name'"))?;
    let integer = |arg: &str| -> Result<i64, IntrospectionError> {
        match directive.argument(arg) {
            None => Ok(1),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| invalid(directives::SEQUENCE, format!("'{arg}' must be an integer"))),
        }
    };
    Ok(Sequence {
        name: name.to_string(),
        initial_value: integer(args::INITIAL_VALUE)?,
        allocation_size: integer(args::ALLOCATION_SIZE)?,
    })
}

/// Reads `@indexes(value: [{name, fields, unique}])`; `unique` defaults to true
fn parse_indices(found: &[SchemaDirective<'_>], ty: &Type) -> Result<Vec<Index>, IntrospectionError> {
    let Some(directive) = find_directive(found, directives::INDEXES) else {
        return Ok(Vec::new());
    };
    let items = directive
        .argument(args::VALUE)
        .and_then(SdlValue::as_list)
        .ok_or_else(|| invalid(directives::INDEXES, "'value' must be a list"))?;

    let mut indices = Vec::with_capacity(items.len());
    for item in items {
        let name = item
            .object_field(args::NAME)
            .and_then(SdlValue::as_name)
            .ok_or_else(|| invalid(directives::INDEXES, "index without a name"))?;
        let fields = item
            .object_field(args::FIELDS)
            .and_then(SdlValue::as_list)
            .ok_or_else(|| invalid(directives::INDEXES, format!("index {name} has no fields")))?
            .iter()
            .map(|f| {
                f.as_name().map(str::to_string).ok_or_else(|| {
                    invalid(directives::INDEXES, format!("index {name} has a non-string field"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        for field in &fields {
            if !ty.has_field(field) {
                return Err(IntrospectionError::UnknownIndexField {
                    index: name.to_string(),
                    field: field.clone(),
                });
            }
        }
        let unique = item
            .object_field(args::UNIQUE)
            .and_then(SdlValue::as_bool)
            .unwrap_or(true);
        indices.push(Index::new(name, fields, unique));
    }
    Ok(indices)
}

/// Resolve type names into references and connect relation pairs
pub(crate) fn resolve_relations(model: &mut Datamodel) -> Result<(), IntrospectionError> {
    let names: HashSet<String> = model.types.iter().map(|t| t.name.clone()).collect();
    for ty in &mut model.types {
        for field in &mut ty.fields {
            if let FieldType::Scalar(name) = &field.field_type
                && names.contains(name)
            {
                field.field_type = FieldType::Reference(name.clone());
            }
        }
    }

    connect_named_relations(model)?;
    connect_obvious_relations(model);
    Ok(())
}

fn relation_coordinates(model: &Datamodel) -> Vec<(FieldRef, String)> {
    let mut coordinates = Vec::new();
    for ty in &model.types {
        for field in &ty.fields {
            if field.related_field.is_none() && model.is_relation(field) {
                coordinates.push((
                    FieldRef::new(&ty.name, &field.name),
                    field.field_type.name().to_string(),
                ));
            }
        }
    }
    coordinates
}

fn is_connected(model: &Datamodel, coordinate: &FieldRef) -> bool {
    model
        .field(coordinate)
        .is_some_and(|f| f.related_field.is_some())
}

fn connect_named_relations(model: &mut Datamodel) -> Result<(), IntrospectionError> {
    for (coordinate, target) in relation_coordinates(model) {
        if is_connected(model, &coordinate) {
            continue;
        }
        let Some(relation) = model
            .field(&coordinate)
            .and_then(|f| f.relation_name.clone())
        else {
            continue;
        };
        let Some(target_type) = model.type_by_name(&target) else {
            continue;
        };

        let partner = target_type
            .fields
            .iter()
            .find(|f| {
                f.relation_name.as_deref() == Some(relation.as_str())
                    && f.related_field.is_none()
                    && !(target == coordinate.type_name && f.name == coordinate.field_name)
            })
            .map(|f| (f.name.clone(), f.field_type.references(&coordinate.type_name)));

        match partner {
            Some((_, false)) => return Err(IntrospectionError::RelationTypeMismatch(relation)),
            Some((name, true)) => {
                model.connect(&coordinate, &FieldRef::new(&target, name));
            }
            None if target == coordinate.type_name => {
                // a self-relation declared once pairs with itself
                model.connect(&coordinate, &coordinate);
            }
            None => {
                return Err(IntrospectionError::UnmatchedRelationName {
                    relation,
                    type_name: coordinate.type_name,
                    field: coordinate.field_name,
                });
            }
        }
    }
    Ok(())
}

fn connect_obvious_relations(model: &mut Datamodel) {
    for (coordinate, target) in relation_coordinates(model) {
        if target == coordinate.type_name || is_connected(model, &coordinate) {
            continue;
        }
        let (Some(source_type), Some(target_type)) = (
            model.type_by_name(&coordinate.type_name),
            model.type_by_name(&target),
        ) else {
            continue;
        };

        let forward = source_type
            .fields
            .iter()
            .filter(|f| f.field_type.references(&target))
            .count();
        let backward: Vec<&Field> = target_type
            .fields
            .iter()
            .filter(|f| f.field_type.references(&coordinate.type_name))
            .collect();

        if forward == 1 && backward.len() == 1 && backward[0].related_field.is_none() {
            let partner = FieldRef::new(&target, &backward[0].name);
            model.connect(&coordinate, &partner);
        }
    }
}
