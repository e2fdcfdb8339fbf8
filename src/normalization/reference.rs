//! Name and directive alignment against a previously known datamodel

use tracing::debug;

use super::Normalizer;
use super::names::ModelNameNormalizer;
use crate::datamodel::{Datamodel, Field, FieldRef, FieldType, IdStrategy, Type, TypeIdentifier};

/// Aligns a freshly inferred datamodel with a reference datamodel.
///
/// Types and fields are matched by their database name, falling back to the
/// plain name. Fields that do not match by name are matched by id and then
/// by relation target. Whatever the reference knows that the database cannot
/// tell (id strategies, defaults, `Json` and enum fields stored as strings)
/// is copied over. Names that were not matched are normalized as usual.
#[derive(Debug, Clone)]
pub struct ReferenceNormalizer {
    reference: Datamodel,
}

impl ReferenceNormalizer {
    pub fn new(reference: Datamodel) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &Datamodel {
        &self.reference
    }

    /// Rename one type after its reference counterpart, if it has one
    fn align_type(&self, model: &mut Datamodel, type_name: &str) -> Option<(String, &Type)> {
        let base = self
            .reference
            .types
            .iter()
            .find(|t| matches_name(&t.name, t.database_name.as_deref(), type_name))?;

        let mut current = type_name.to_string();
        if let Some(database_name) = &base.database_name
            && (base.name == type_name || !model.has_type(&base.name))
        {
            model.rename_type(type_name, &base.name);
            current = base.name.clone();
            if let Some(ty) = model.type_by_name_mut(&current) {
                ty.database_name = Some(database_name.clone());
            }
        }
        Some((current, base))
    }

    fn align_fields(&self, model: &mut Datamodel, type_name: &str, base: &Type) -> Vec<FieldRef> {
        let field_names: Vec<String> = model
            .type_by_name(type_name)
            .map(|t| t.fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default();
        // Each reference field is consumed by at most one field
        let mut remaining: Vec<&Field> = base.fields.iter().collect();
        let mut fixed = Vec::new();

        for field_name in field_names {
            let Some(field) = model.field(&FieldRef::new(type_name, &field_name)).cloned() else {
                continue;
            };

            let matched = match_field(&remaining, &field);
            let Some((position, matching)) = matched else {
                continue;
            };
            let base_field = remaining.remove(position);

            let name = self.assign_name(model, type_name, &field, base_field, matching);
            if let Some(target) = model.field_mut(&FieldRef::new(type_name, &name)) {
                assign_properties(target, base_field);
            }
            self.assign_enum(model, type_name, &name, base_field);
            fixed.push(FieldRef::new(type_name, &name));
        }
        fixed
    }

    fn assign_name(
        &self,
        model: &mut Datamodel,
        type_name: &str,
        field: &Field,
        base_field: &Field,
        matching: Matching,
    ) -> String {
        let coordinate = FieldRef::new(type_name, &field.name);
        let wants_rename = match matching {
            Matching::Name => base_field.database_name.is_some(),
            Matching::Id | Matching::Relation => true,
        };
        let taken = base_field.name != field.name
            && model
                .type_by_name(type_name)
                .is_some_and(|t| t.has_field(&base_field.name));
        if !wants_rename || taken {
            return field.name.clone();
        }

        if let Some(target) = model.field_mut(&coordinate) {
            // A back-relation has no column to remember
            let keeps_column = !(matching == Matching::Relation && field.is_list);
            let fallback = if keeps_column {
                target
                    .database_name
                    .clone()
                    .or_else(|| (base_field.name != field.name).then(|| field.name.clone()))
            } else {
                None
            };
            target.database_name = base_field.database_name.clone().or(fallback);
            if matching == Matching::Relation
                && (base_field.relation_name.is_none() || target.relation_name.is_none())
            {
                target.relation_name = base_field.relation_name.clone();
            }
        }
        model.rename_field(type_name, &field.name, &base_field.name);
        base_field.name.clone()
    }

    /// A string column the reference declares as an enum becomes that enum,
    /// provided the enum exists in our model as well
    fn assign_enum(&self, model: &mut Datamodel, type_name: &str, field_name: &str, base_field: &Field) {
        let FieldType::Reference(enum_name) = &base_field.field_type else {
            return;
        };
        let in_reference = self.reference.type_by_name(enum_name).is_some_and(|t| t.is_enum);
        let in_model = model.type_by_name(enum_name).is_some_and(|t| t.is_enum);
        if !in_reference || !in_model {
            return;
        }
        if let Some(field) = model.field_mut(&FieldRef::new(type_name, field_name))
            && field.field_type.is(TypeIdentifier::String)
        {
            field.field_type = FieldType::Reference(enum_name.clone());
        }
    }
}

fn assign_properties(field: &mut Field, base_field: &Field) {
    field.is_id |= base_field.is_id;
    field.is_created_at |= base_field.is_created_at;
    field.is_updated_at |= base_field.is_updated_at;
    if field.default_value.is_none() {
        field.default_value = base_field.default_value.clone();
    }
    if base_field.associated_sequence.is_some() {
        field.associated_sequence = base_field.associated_sequence.clone();
    }
    // The database may not know the strategy while the reference does
    if matches!(field.id_strategy, None | Some(IdStrategy::None)) && base_field.id_strategy.is_some() {
        field.id_strategy = base_field.id_strategy;
    }
    if field.field_type.is(TypeIdentifier::String) && base_field.field_type.is(TypeIdentifier::Json) {
        field.field_type = FieldType::scalar(TypeIdentifier::Json);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Matching {
    Name,
    Id,
    Relation,
}

/// The database name wins over the plain name when the reference has one
fn matches_name(name: &str, database_name: Option<&str>, candidate: &str) -> bool {
    match database_name {
        Some(database_name) => database_name == candidate,
        None => name == candidate,
    }
}

fn match_field(remaining: &[&Field], field: &Field) -> Option<(usize, Matching)> {
    let by_name = remaining
        .iter()
        .position(|base| matches_name(&base.name, base.database_name.as_deref(), &field.name));
    if let Some(position) = by_name {
        return Some((position, Matching::Name));
    }

    if field.is_id
        && let Some(position) = remaining.iter().position(|base| base.is_id)
    {
        return Some((position, Matching::Id));
    }

    let FieldType::Reference(target) = &field.field_type else {
        return None;
    };
    remaining
        .iter()
        .position(|base| {
            base.field_type.references(target)
                && (base.relation_name.is_none()
                    || field.relation_name.is_none()
                    || base.relation_name == field.relation_name)
        })
        .map(|position| (position, Matching::Relation))
}

impl Normalizer for ReferenceNormalizer {
    fn normalize(&self, model: &mut Datamodel) {
        let type_names: Vec<String> = model.types.iter().map(|t| t.name.clone()).collect();
        // Every type is renamed before fields are matched by relation target
        let matched: Vec<(String, &Type)> = type_names
            .iter()
            .filter_map(|type_name| self.align_type(model, type_name))
            .collect();

        let mut fixed_fields = Vec::new();
        for (type_name, base) in &matched {
            fixed_fields.extend(self.align_fields(model, type_name, base));
        }
        let fixed_types: Vec<String> = matched.into_iter().map(|(name, _)| name).collect();
        debug!("{} types matched the reference datamodel", fixed_types.len());

        ModelNameNormalizer::with_fixed_types(fixed_types)
            .with_fixed_fields(fixed_fields)
            .normalize(model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::Sequence;

    fn normalize(model: &mut Datamodel, reference: Datamodel) {
        ReferenceNormalizer::new(reference).normalize(model);
    }

    #[test]
    fn test_names_follow_the_reference() {
        let mut reference_type = Type::new("Account").with_fields(vec![
            Field::scalar("id", TypeIdentifier::Id).required(),
            Field::scalar("full_name", TypeIdentifier::String),
        ]);
        reference_type.database_name = Some("users".into());
        reference_type.fields[0].is_id = true;
        let mut mail = Field::scalar("email", TypeIdentifier::String);
        mail.database_name = Some("mail_address".into());
        reference_type.fields.push(mail);

        let mut model = Datamodel::new(vec![Type::new("users").with_fields(vec![
            Field::scalar("id", TypeIdentifier::Int).required(),
            Field::scalar("full_name", TypeIdentifier::String),
            Field::scalar("mail_address", TypeIdentifier::String),
            Field::scalar("nick_name", TypeIdentifier::String),
        ])]);
        model.types[0].fields[0].is_id = true;

        normalize(&mut model, Datamodel::new(vec![reference_type]));

        let account = model.type_by_name("Account").unwrap();
        assert_eq!(account.database_name.as_deref(), Some("users"));
        // Matched without a database name, so the reference name stays
        assert!(account.has_field("full_name"));
        let email = account.field("email").unwrap();
        assert_eq!(email.database_name.as_deref(), Some("mail_address"));
        // Unmatched fields are normalized as usual
        assert!(account.has_field("nickName"));
    }

    #[test]
    fn test_properties_are_copied() {
        let sequence = Sequence {
            name: "users_id_seq".into(),
            initial_value: 1,
            allocation_size: 1,
        };
        let mut id = Field::scalar("id", TypeIdentifier::Int).required();
        id.is_id = true;
        id.id_strategy = Some(IdStrategy::Sequence);
        id.associated_sequence = Some(sequence.clone());
        let mut created = Field::scalar("createdAt", TypeIdentifier::DateTime);
        created.is_created_at = true;
        let mut role = Field::new("role", FieldType::Reference("Role".into()));
        role.default_value = Some("USER".into());
        let reference = Datamodel::new(vec![
            Type::new("User").with_fields(vec![
                id,
                created,
                Field::scalar("settings", TypeIdentifier::Json),
                role,
            ]),
            Type::new_enum("Role", ["USER", "ADMIN"]),
        ]);

        let mut own_id = Field::scalar("user_id", TypeIdentifier::Int).required();
        own_id.is_id = true;
        own_id.id_strategy = Some(IdStrategy::None);
        let mut model = Datamodel::new(vec![
            Type::new("User").with_fields(vec![
                own_id,
                Field::scalar("createdAt", TypeIdentifier::DateTime),
                Field::scalar("settings", TypeIdentifier::String),
                Field::scalar("role", TypeIdentifier::String),
            ]),
            Type::new_enum("Role", ["USER", "ADMIN"]),
        ]);

        normalize(&mut model, reference);

        let user = model.type_by_name("User").unwrap();
        let id = user.field("id").unwrap();
        assert_eq!(id.database_name.as_deref(), Some("user_id"));
        assert_eq!(id.id_strategy, Some(IdStrategy::Sequence));
        assert_eq!(id.associated_sequence, Some(sequence));
        assert!(user.field("createdAt").unwrap().is_created_at);
        assert!(user.field("settings").unwrap().field_type.is(TypeIdentifier::Json));
        let role = user.field("role").unwrap();
        assert_eq!(role.field_type, FieldType::Reference("Role".into()));
        assert_eq!(role.default_value.as_deref(), Some("USER"));
    }

    #[test]
    fn test_relation_fields_match_by_target() {
        let reference = Datamodel::new(vec![
            Type::new("Post").with_fields(vec![Field::new(
                "writtenBy",
                FieldType::Reference("User".into()),
            )]),
            Type::new("User"),
        ]);
        let mut model = Datamodel::new(vec![
            Type::new("Post").with_fields(vec![
                Field::new("author_id", FieldType::Reference("User".into())),
                Field::new("editor_id", FieldType::Reference("User".into())),
            ]),
            Type::new("User"),
        ]);

        normalize(&mut model, reference);

        let post = model.type_by_name("Post").unwrap();
        let written_by = post.field("writtenBy").unwrap();
        assert_eq!(written_by.database_name.as_deref(), Some("author_id"));
        // The reference field is used up, the second relation is normalized
        assert!(post.has_field("editor"));
    }
}
