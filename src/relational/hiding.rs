//! Hiding of join tables and scalar-list tables
//!
//! Both kinds of table exist only to encode a list in a relational schema.
//! They are removed from the model and replaced by list fields on the types
//! they connect.

use tracing::debug;

use crate::datamodel::{Datamodel, Field, FieldRef, FieldType, Type, TypeIdentifier};

const JOIN_SIDE_A: &str = "A";
const JOIN_SIDE_B: &str = "B";
const NODE_ID: &str = "nodeId";
const POSITION: &str = "position";
const VALUE: &str = "value";

/// Relation fields of a pure join table, if `ty` is one.
///
/// Both sides must be single-valued; a list field is a back-reference from
/// another foreign key, which a join table never has.
fn join_fields<'a>(model: &Datamodel, ty: &'a Type) -> Option<(&'a Field, &'a Field)> {
    if ty.is_enum || ty.is_embedded {
        return None;
    }
    let (relations, others): (Vec<&Field>, Vec<&Field>) =
        ty.fields.iter().partition(|f| model.is_relation(f));
    let only_id = match others.as_slice() {
        [] => true,
        [single] => single.is_id,
        _ => false,
    };
    match relations.as_slice() {
        [a, b] if only_id && !a.is_list && !b.is_list => Some((a, b)),
        _ => None,
    }
}

/// Pass 8
pub(crate) fn hide_join_tables(model: &mut Datamodel) {
    let mut hidden = Vec::new();
    let mut link_tables = Vec::new();

    for ty in &model.types {
        let Some((a, b)) = join_fields(model, ty) else {
            continue;
        };
        let mut sides = [a, b];
        sides.sort_by_key(|f| f.name.as_str());
        if sides[0].name == JOIN_SIDE_A && sides[1].name == JOIN_SIDE_B {
            hidden.push((
                ty.name.clone(),
                sides[0].field_type.name().to_string(),
                sides[1].field_type.name().to_string(),
            ));
        } else {
            link_tables.push((ty.name.clone(), [a.name.clone(), b.name.clone()]));
        }
    }

    for (join, type_a, type_b) in hidden {
        model.remove_type(&join);
        let relation = join.trim_start_matches('_').to_string();

        if type_a == type_b {
            let Some(ty) = model.type_by_name_mut(&type_a) else {
                continue;
            };
            let name = ty.unique_field_name(&type_a);
            ty.fields.push(many_to_many(&name, &type_a, &relation));
            let coordinate = FieldRef::new(&type_a, name);
            model.connect(&coordinate, &coordinate);
        } else {
            let (Some(a_field), Some(b_field)) = (
                add_many_to_many(model, &type_a, &type_b, &relation),
                add_many_to_many(model, &type_b, &type_a, &relation),
            ) else {
                continue;
            };
            model.connect(&a_field, &b_field);
        }
        debug!("Hid join table {} between {} and {}", join, type_a, type_b);
    }

    for (link, relation_fields) in link_tables {
        let Some(ty) = model.type_by_name_mut(&link) else {
            continue;
        };
        ty.is_link_table = true;
        for field in ty
            .fields
            .iter_mut()
            .filter(|f| relation_fields.contains(&f.name))
        {
            field.is_id = false;
        }
        debug!("Marked {} as link table", link);
    }
}

fn many_to_many(name: &str, target: &str, relation: &str) -> Field {
    let mut field = Field::new(name, FieldType::Reference(target.to_string())).list();
    field.relation_name = Some(relation.to_string());
    field
}

/// Adds a list field on `owner` named after `target`
fn add_many_to_many(
    model: &mut Datamodel,
    owner: &str,
    target: &str,
    relation: &str,
) -> Option<FieldRef> {
    let ty = model.type_by_name_mut(owner)?;
    let name = ty.unique_field_name(target);
    ty.fields.push(many_to_many(&name, target, relation));
    Some(FieldRef::new(owner, name))
}

struct ScalarList {
    table: String,
    owner: String,
    value_type: FieldType,
    back_field: Option<FieldRef>,
}

fn scalar_list(model: &Datamodel, ty: &Type) -> Option<ScalarList> {
    if ty.is_enum || ty.is_embedded || ty.fields.len() != 3 {
        return None;
    }
    let node_id = ty.field(NODE_ID)?;
    let position = ty.field(POSITION)?;
    let value = ty.field(VALUE)?;

    let is_shape = model.is_relation(node_id)
        && node_id.is_required
        && !node_id.is_list
        && position.is_required
        && position.field_type.is(TypeIdentifier::Int)
        && value.is_required
        && !value.is_list
        && !model.is_relation(value);
    is_shape.then(|| ScalarList {
        table: ty.name.clone(),
        owner: node_id.field_type.name().to_string(),
        value_type: value.field_type.clone(),
        back_field: node_id.related_field.clone(),
    })
}

/// Pass 9
pub(crate) fn hide_scalar_lists(model: &mut Datamodel) {
    let lists: Vec<ScalarList> = model
        .types
        .iter()
        .filter_map(|ty| scalar_list(model, ty))
        .collect();

    for list in lists {
        let base = list
            .table
            .strip_prefix(list.owner.as_str())
            .map(|rest| rest.trim_start_matches('_'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(&list.table)
            .to_string();

        model.disconnect(&FieldRef::new(&list.table, NODE_ID));
        let back = list
            .back_field
            .filter(|coordinate| coordinate.type_name == list.owner);

        match back {
            Some(coordinate) => {
                let Some(owner) = model.type_by_name_mut(&list.owner) else {
                    continue;
                };
                let name = if coordinate.field_name == base {
                    base
                } else {
                    owner.unique_field_name(&base)
                };
                let Some(field) = owner.field_mut(&coordinate.field_name) else {
                    continue;
                };
                field.field_type = list.value_type.clone();
                field.is_list = true;
                field.is_required = false;
                field.is_unique = false;
                field.relation_name = None;
                field.related_field = None;
                model.rename_field(&list.owner, &coordinate.field_name, &name);
            }
            None => {
                let Some(owner) = model.type_by_name_mut(&list.owner) else {
                    continue;
                };
                let name = owner.unique_field_name(&base);
                owner
                    .fields
                    .push(Field::new(name, list.value_type.clone()).list());
            }
        }

        model.remove_type(&list.table);
        debug!("Hid scalar list table {} as {}", list.table, list.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str, target: &str) -> Field {
        Field::new(name, FieldType::Reference(target.into())).required()
    }

    fn id() -> Field {
        let mut id = Field::scalar("id", TypeIdentifier::Int).required();
        id.is_id = true;
        id
    }

    #[test]
    fn test_hides_ab_join_table() {
        let mut model = Datamodel::new(vec![
            Type::new("Post").with_fields(vec![id(), reference("_CategoryToPost", "_CategoryToPost").list()]),
            Type::new("Category").with_fields(vec![id()]),
            Type::new("_CategoryToPost").with_fields(vec![
                reference("A", "Category"),
                reference("B", "Post"),
            ]),
        ]);
        hide_join_tables(&mut model);

        assert!(!model.has_type("_CategoryToPost"));
        let posts = model.field(&FieldRef::new("Category", "Post")).unwrap();
        assert!(posts.is_list);
        assert_eq!(posts.relation_name.as_deref(), Some("CategoryToPost"));
        assert_eq!(posts.related_field, Some(FieldRef::new("Post", "Category")));
        assert!(model.field(&FieldRef::new("Post", "_CategoryToPost")).is_none());
    }

    #[test]
    fn test_marks_named_join_table_as_link_table() {
        let mut author = reference("author", "User");
        author.is_id = true;
        let mut book = reference("book", "Book");
        book.is_id = true;
        let mut model = Datamodel::new(vec![
            Type::new("User").with_fields(vec![id()]),
            Type::new("Book").with_fields(vec![id()]),
            Type::new("authorship").with_fields(vec![author, book]),
        ]);
        hide_join_tables(&mut model);

        let link = model.type_by_name("authorship").unwrap();
        assert!(link.is_link_table);
        assert_eq!(link.id_fields().count(), 0);
    }

    #[test]
    fn test_hides_scalar_list_without_back_field() {
        let mut model = Datamodel::new(vec![
            Type::new("User").with_fields(vec![id()]),
            Type::new("User_tags").with_fields(vec![
                reference("nodeId", "User"),
                Field::scalar("position", TypeIdentifier::Int).required(),
                Field::scalar("value", TypeIdentifier::String).required(),
            ]),
        ]);
        hide_scalar_lists(&mut model);

        assert!(!model.has_type("User_tags"));
        let tags = model.field(&FieldRef::new("User", "tags")).unwrap();
        assert!(tags.is_list);
        assert!(tags.field_type.is(TypeIdentifier::String));
    }
}
