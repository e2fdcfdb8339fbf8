//! Datamodel renderer
//!
//! Structural flags are turned back into directives here. Elements carrying an
//! error comment are rendered commented out, so the output stays valid SDL.

use tracing::debug;

use crate::datamodel::dialect::{CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};
use crate::datamodel::directives::{self, args};
use crate::datamodel::{
    Comment, DatabaseType, Datamodel, Dialect, Directive, Field, Index, Type,
};

const INDENT: &str = "  ";

/// Renders a datamodel as SDL in one dialect
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    dialect: Dialect,
}

impl Renderer {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn for_database(database: DatabaseType) -> Self {
        Self::new(database.dialect())
    }

    /// Legacy relational output: reserved field names and `@pgTable` / `@pgColumn`
    pub fn legacy() -> Self {
        Self::new(Dialect::LegacyRelational)
    }

    pub fn render(&self, model: &Datamodel, sort: bool) -> String {
        let mut types: Vec<&Type> = model.types.iter().collect();
        if sort {
            types.sort_by_cached_key(|t| (t.is_enum, t.name.to_lowercase()));
        }

        let mut blocks = Vec::with_capacity(types.len() + 1);
        if !model.comments.is_empty() {
            blocks.push(render_comments(&model.comments, ""));
        }
        for ty in types {
            if ty.is_enum {
                blocks.push(self.render_enum(ty));
            } else {
                blocks.push(self.render_object_type(ty, sort));
            }
        }

        debug!("Rendered {} types", model.types.len());
        blocks.join("\n\n")
    }

    fn render_object_type(&self, ty: &Type, sort: bool) -> String {
        let mut fields: Vec<&Field> = ty.fields.iter().collect();
        if sort {
            fields.sort_by_cached_key(|f| f.name.to_lowercase());
        }

        let header = with_directives(
            format!("type {}", ty.name),
            &self.type_directives(ty),
        );
        let rendered: Vec<(String, bool)> = fields.iter().map(|f| self.render_field(f)).collect();
        let all_errored = !rendered.is_empty() && rendered.iter().all(|(_, errored)| *errored);
        let prefix = if all_errored { "# " } else { "" };

        let mut lines = Vec::with_capacity(fields.len() + 3);
        if !ty.comments.is_empty() || index_comments(ty).next().is_some() {
            let comments: Vec<Comment> = ty
                .comments
                .iter()
                .cloned()
                .chain(index_comments(ty).cloned())
                .collect();
            lines.push(render_comments(&comments, ""));
        }
        lines.push(format!("{prefix}{header} {{"));
        lines.extend(rendered.into_iter().map(|(line, _)| line));
        lines.push(format!("{prefix}}}"));
        lines.join("\n")
    }

    fn render_enum(&self, ty: &Type) -> String {
        let mut directives = Vec::new();
        if let Some(name) = &ty.database_name {
            directives.push(name_directive(self.dialect.table_name_directive(), name));
        }
        directives.extend(ty.directives.iter().cloned());

        let header = with_directives(format!("enum {}", ty.name), &directives);
        let mut lines = Vec::with_capacity(ty.fields.len() + 3);
        if !ty.comments.is_empty() {
            lines.push(render_comments(&ty.comments, ""));
        }
        lines.push(format!("{header} {{"));
        for value in &ty.fields {
            lines.push(format!("{INDENT}{}", value.name));
        }
        lines.push("}".to_string());
        lines.join("\n")
    }

    fn type_directives(&self, ty: &Type) -> Vec<Directive> {
        let mut found = Vec::new();
        if ty.is_embedded {
            found.push(Directive::new(directives::EMBEDDED));
        }
        if ty.is_link_table {
            found.push(Directive::new(directives::LINK_TABLE));
        }
        match (&ty.database_name, self.dialect) {
            (Some(name), _) => {
                found.push(name_directive(self.dialect.table_name_directive(), name))
            }
            (None, Dialect::LegacyRelational) if !ty.is_embedded => {
                found.push(name_directive(directives::PG_TABLE, &ty.name))
            }
            _ => {}
        }
        if !ty.indices.is_empty() {
            found.push(indexes_directive(&ty.indices));
        }
        found.extend(ty.directives.iter().cloned());
        found
    }

    fn field_directives(&self, field: &Field, rendered_name: &str) -> Vec<Directive> {
        let mut found = Vec::new();
        if let Some(value) = &field.default_value {
            found.push(
                Directive::new(directives::DEFAULT)
                    .with_argument(args::VALUE, render_value(field, value)),
            );
        }
        if field.is_unique && !field.is_id {
            found.push(Directive::new(directives::UNIQUE));
        }
        if let Some(relation) = &field.relation_name {
            found.push(name_directive(directives::RELATION, relation));
        }
        if self.dialect.synthesizes_read_only_directives() {
            if field.is_id {
                let mut id = Directive::new(directives::ID);
                if let Some(strategy) = field.id_strategy {
                    id = id.with_argument(args::STRATEGY, strategy.as_str());
                }
                found.push(id);
            }
            if field.is_created_at {
                found.push(Directive::new(directives::CREATED_AT));
            }
            if field.is_updated_at {
                found.push(Directive::new(directives::UPDATED_AT));
            }
        }
        let column_name = field
            .database_name
            .as_deref()
            .or((rendered_name != field.name).then_some(field.name.as_str()));
        if let Some(name) = column_name {
            found.push(name_directive(self.dialect.column_name_directive(), name));
        }
        if field.is_id
            && let Some(sequence) = &field.associated_sequence
        {
            found.push(
                Directive::new(directives::SEQUENCE)
                    .with_argument(args::NAME, quote(&sequence.name))
                    .with_argument(args::INITIAL_VALUE, sequence.initial_value.to_string())
                    .with_argument(args::ALLOCATION_SIZE, sequence.allocation_size.to_string()),
            );
        }
        found.extend(field.directives.iter().cloned());
        found
    }

    /// Legacy output names read-only fields by their reserved names
    fn rendered_field_name<'a>(&self, field: &'a Field) -> &'a str {
        if self.dialect.synthesizes_read_only_directives() {
            return &field.name;
        }
        if field.is_id {
            ID_FIELD
        } else if field.is_created_at {
            CREATED_AT_FIELD
        } else if field.is_updated_at {
            UPDATED_AT_FIELD
        } else {
            &field.name
        }
    }

    /// Rendered field lines and whether the field is commented out
    fn render_field(&self, field: &Field) -> (String, bool) {
        let name = self.rendered_field_name(field);
        let mut comments = field.comments.clone();
        if name != field.name {
            comments.push(Comment::error(format!(
                "Field {} was renamed to the reserved name {name}.",
                field.name
            )));
        }

        let type_name = field.field_type.name();
        let rendered_type = if field.is_list {
            format!("[{type_name}!]!")
        } else if field.is_required {
            format!("{type_name}!")
        } else {
            type_name.to_string()
        };

        let line = with_directives(
            format!("{name}: {rendered_type}"),
            &self.field_directives(field, name),
        );

        let has_error = comments.iter().any(|c| c.is_error);
        let line = if has_error {
            format!("{INDENT}# {line}")
        } else {
            format!("{INDENT}{line}")
        };

        if comments.is_empty() {
            (line, has_error)
        } else {
            (
                format!("{}\n{line}", render_comments(&comments, INDENT)),
                has_error,
            )
        }
    }
}

/// Quote and escape a string literal
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn index_comments(ty: &Type) -> impl Iterator<Item = &Comment> {
    ty.indices.iter().flat_map(|i| i.comments.iter())
}

fn render_comments(comments: &[Comment], indent: &str) -> String {
    comments
        .iter()
        .map(|c| format!("{indent}# {}", c.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn name_directive(directive: &str, name: &str) -> Directive {
    Directive::new(directive).with_argument(args::NAME, quote(name))
}

fn indexes_directive(indices: &[Index]) -> Directive {
    let rendered = indices
        .iter()
        .map(|index| {
            let fields = index
                .fields
                .iter()
                .map(|f| quote(f))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "{{name: {}, fields: [{fields}], unique: {}}}",
                quote(&index.name),
                index.unique
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    Directive::new(directives::INDEXES).with_argument(args::VALUE, format!("[{rendered}]"))
}

/// String, Json and DateTime defaults are quoted, everything else is verbatim
fn render_value(field: &Field, value: &str) -> String {
    let quoted = field
        .field_type
        .identifier()
        .is_some_and(|t| t.is_quoted());
    if quoted {
        quote(value)
    } else {
        value.to_string()
    }
}

/// Merge directives sharing a name (except `@indexes`), then sort by name.
///
/// For arguments present on several directives of the same name the first
/// occurrence wins.
pub(crate) fn merge_directives(found: &[Directive]) -> Vec<Directive> {
    let mut merged: Vec<Directive> = Vec::with_capacity(found.len());
    for directive in found {
        let existing = if directive.name == directives::INDEXES {
            None
        } else {
            merged.iter_mut().find(|d| d.name == directive.name)
        };
        match existing {
            Some(target) => {
                for (key, value) in &directive.arguments {
                    target
                        .arguments
                        .entry(key.clone())
                        .or_insert_with(|| value.clone());
                }
            }
            None => merged.push(directive.clone()),
        }
    }
    merged.sort_by_cached_key(|d| d.name.to_lowercase());
    merged
}

fn render_directive(directive: &Directive) -> String {
    if directive.arguments.is_empty() {
        format!("@{}", directive.name)
    } else {
        let rendered = directive
            .arguments
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("@{}({rendered})", directive.name)
    }
}

fn with_directives(head: String, found: &[Directive]) -> String {
    let merged = merge_directives(found);
    if merged.is_empty() {
        return head;
    }
    let rendered = merged
        .iter()
        .map(render_directive)
        .collect::<Vec<_>>()
        .join(" ");
    format!("{head} {rendered}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{FieldType, IdStrategy, Sequence, TypeIdentifier};

    fn render(model: &Datamodel) -> String {
        Renderer::new(Dialect::Relational).render(model, true)
    }

    #[test]
    fn test_render_flags_as_directives() {
        let mut id = Field::scalar("id", TypeIdentifier::Int).required();
        id.is_id = true;
        id.is_unique = true;
        let mut email = Field::scalar("email", TypeIdentifier::String).required();
        email.is_unique = true;
        email.database_name = Some("mail".into());
        let mut role = Field::scalar("role", TypeIdentifier::String);
        role.default_value = Some("member".into());

        let mut user = Type::new("User").with_fields(vec![role, id, email]);
        user.database_name = Some("users".into());

        assert_eq!(
            render(&Datamodel::new(vec![user])),
            "type User @db(name: \"users\") {\n  email: String! @db(name: \"mail\") @unique\n  id: Int! @id\n  role: String @default(value: \"member\")\n}"
        );
    }

    #[test]
    fn test_lists_always_non_null() {
        let ty = Type::new("A").with_fields(vec![
            Field::scalar("tags", TypeIdentifier::String).list(),
        ]);
        assert!(render(&Datamodel::new(vec![ty])).contains("tags: [String!]!"));
    }

    #[test]
    fn test_enums_render_last() {
        let model = Datamodel::new(vec![
            Type::new_enum("Color", ["RED", "GREEN"]),
            Type::new("Zoo").with_fields(vec![Field::new(
                "color",
                FieldType::Reference("Color".into()),
            )]),
        ]);
        assert_eq!(
            render(&model),
            "type Zoo {\n  color: Color\n}\n\nenum Color {\n  RED\n  GREEN\n}"
        );
    }

    #[test]
    fn test_errored_fields_are_commented_out() {
        let mut bad = Field::scalar("data", TypeIdentifier::String);
        bad.comments.push(Comment::error("Type 'xml' is not supported."));
        let ty = Type::new("A").with_fields(vec![
            Field::scalar("a", TypeIdentifier::Int),
            bad.clone(),
        ]);
        let rendered = render(&Datamodel::new(vec![ty]));
        assert_eq!(
            rendered,
            "type A {\n  a: Int\n  # Type 'xml' is not supported.\n  # data: String\n}"
        );

        let all_bad = Type::new("B").with_fields(vec![bad]);
        let rendered = render(&Datamodel::new(vec![all_bad]));
        assert!(rendered.starts_with("# type B {"));
        assert!(rendered.ends_with("\n# }"));
    }

    #[test]
    fn test_merge_keeps_index_directives_apart() {
        let merged = merge_directives(&[
            Directive::new("relation").with_argument("name", "\"R\""),
            Directive::new("indexes").with_argument("value", "[]"),
            Directive::new("relation").with_argument("link", "INLINE"),
            Directive::new("indexes").with_argument("value", "[]"),
        ]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[2].arguments.len(), 2);
    }

    #[test]
    fn test_sequence_and_indexes() {
        let mut id = Field::scalar("id", TypeIdentifier::Int).required();
        id.is_id = true;
        id.id_strategy = Some(IdStrategy::Sequence);
        id.associated_sequence = Some(Sequence {
            name: "a_seq".into(),
            initial_value: 1,
            allocation_size: 1,
        });
        let mut ty = Type::new("A").with_fields(vec![id, Field::scalar("b", TypeIdentifier::Int)]);
        ty.indices = vec![Index::new("b_idx", vec!["b".into()], false)];

        let rendered = render(&Datamodel::new(vec![ty]));
        assert!(rendered.starts_with(
            "type A @indexes(value: [{name: \"b_idx\", fields: [\"b\"], unique: false}]) {"
        ));
        assert!(rendered.contains(
            "id: Int! @id(strategy: SEQUENCE) @sequence(allocationSize: 1, initialValue: 1, name: \"a_seq\")"
        ));
    }

    #[test]
    fn test_legacy_renames_primary_key() {
        let mut pk = Field::scalar("user_id", TypeIdentifier::Int).required();
        pk.is_id = true;
        let ty = Type::new("User").with_fields(vec![pk]);
        let rendered = Renderer::legacy().render(&Datamodel::new(vec![ty]), true);
        assert!(rendered.starts_with("# type User @pgTable(name: \"User\") {"));
        assert!(rendered.contains("# id: Int! @pgColumn(name: \"user_id\")"));
    }
}
