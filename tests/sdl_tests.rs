//! SDL parser and renderer tests

use datamodel_introspection::datamodel::{
    Datamodel, Dialect, FieldRef, FieldType, IdStrategy, TypeIdentifier,
};
use datamodel_introspection::error::IntrospectionError;
use datamodel_introspection::sdl::{Parser, Renderer};

mod round_trip_tests {
    use super::*;

    const SORTED_SDL: &str = r#"type Post {
  author: User! @relation(name: "PostAuthor")
  id: ID! @id
  title: String! @default(value: "Untitled")
}

type User @db(name: "users") {
  email: String! @db(name: "mail") @unique
  id: ID! @id
  posts: [Post!]! @relation(name: "PostAuthor")
  role: Role
}

enum Role {
  ADMIN
  USER
}"#;

    #[test]
    fn test_sorted_sdl_renders_identically() {
        let model = Parser::new(Dialect::Relational)
            .parse_from_schema_string(SORTED_SDL)
            .unwrap();
        let rendered = Renderer::new(Dialect::Relational).render(&model, true);
        assert_eq!(rendered, SORTED_SDL);
    }

    #[test]
    fn test_unsorted_input_is_ordered_on_render() {
        let sdl = "enum Role { USER }\n\ntype b { z: Int y: Int }\n\ntype A { id: ID! @id }";
        let model = Parser::new(Dialect::Relational)
            .parse_from_schema_string(sdl)
            .unwrap();
        let rendered = Renderer::new(Dialect::Relational).render(&model, true);
        assert_eq!(
            rendered,
            "type A {\n  id: ID! @id\n}\n\ntype b {\n  y: Int\n  z: Int\n}\n\nenum Role {\n  USER\n}"
        );

        // Field order is kept when rendering unsorted
        let unsorted = Renderer::new(Dialect::Relational).render(&model, false);
        assert!(unsorted.contains("type b {\n  z: Int\n  y: Int\n}"));
    }

    #[test]
    fn test_relations_are_connected_after_parsing() {
        let model = Parser::new(Dialect::Relational)
            .parse_from_schema_string(SORTED_SDL)
            .unwrap();
        let author = model.field(&FieldRef::new("Post", "author")).unwrap();
        assert_eq!(author.field_type, FieldType::Reference("User".into()));
        assert_eq!(author.related_field, Some(FieldRef::new("User", "posts")));

        let role = model.field(&FieldRef::new("User", "role")).unwrap();
        assert!(model.is_enum_field(role));
        assert!(!model.is_relation(role));
    }
}

mod model_round_trip_tests {
    use super::*;

    /// Rendered fields are sorted, so compare models modulo field order
    fn by_field_name(mut model: Datamodel) -> Datamodel {
        for ty in model.types.iter_mut().filter(|t| !t.is_enum) {
            ty.fields.sort_by_cached_key(|f| f.name.to_lowercase());
        }
        model
    }

    fn assert_round_trip(dialect: Dialect, sdl: &str) -> Datamodel {
        let parser = Parser::new(dialect);
        let model = parser.parse_from_schema_string(sdl).unwrap();
        let rendered = Renderer::new(dialect).render(&model, true);
        let reparsed = parser.parse_from_schema_string(&rendered).unwrap();
        assert_eq!(by_field_name(reparsed), by_field_name(model.clone()));
        model
    }

    #[test]
    fn test_relational_model_survives_render_and_parse() {
        let model = assert_round_trip(
            Dialect::Relational,
            r#"type Account @db(name: "accounts") @indexes(value: [{name: "account_mail_key", fields: ["email"]}, {name: "account_name_idx", fields: ["lastName", "firstName"], unique: false}]) {
                 settings: Json @default(value: "{\"theme\": \"dark\"}")
                 id: Int! @id(strategy: SEQUENCE) @sequence(name: "accounts_id_seq", initialValue: 100, allocationSize: 5)
                 email: String! @db(name: "mail") @unique
                 firstName: String
                 lastName: String
                 bio: String @default(value: "says \"hi\"\nand C:\\ bye")
                 plan: Plan @default(value: FREE)
                 since: DateTime @default(value: "2020-01-01T00:00:00.000Z")
                 followers: [Account!]! @relation(name: "Follows")
                 following: [Account!]! @relation(name: "Follows")
                 createdAt: DateTime!
               }

               type AccountGroup @linkTable {
                 A: Account!
                 B: Group!
               }

               type Group {
                 id: ID! @id
                 name: String! @unique
               }

               enum Plan {
                 FREE
                 PRO
               }"#,
        );

        let account = model.type_by_name("Account").unwrap();
        assert_eq!(account.indices.len(), 2);
        assert!(account.indices[0].unique && !account.indices[1].unique);
        assert_eq!(
            account.field("bio").unwrap().default_value.as_deref(),
            Some("says \"hi\"\nand C:\\ bye")
        );
        let followers = account.field("followers").unwrap();
        assert_eq!(followers.related_field, Some(FieldRef::new("Account", "following")));
        assert!(model.type_by_name("AccountGroup").unwrap().is_link_table);
    }

    #[test]
    fn test_document_model_survives_render_and_parse() {
        let model = assert_round_trip(
            Dialect::Document,
            r#"type Order @db(name: "orders") {
                 _id: ID! @id
                 customer: Customer @relation(link: INLINE)
                 items: [OrderItem!]!
                 placedAt: DateTime @createdAt
                 status: String @default(value: "open")
               }

               type OrderItem @embedded {
                 quantity: Int! @default(value: 1)
                 sku: String
               }

               type Customer {
                 _id: ID! @id
                 id: String
               }"#,
        );

        let order = model.type_by_name("Order").unwrap();
        assert!(order.field("placedAt").unwrap().is_created_at);
        assert!(model.type_by_name("OrderItem").unwrap().is_embedded);
        // `id` is an ordinary field in documents
        assert!(!model.field(&FieldRef::new("Customer", "id")).unwrap().is_id);
    }

    #[test]
    fn test_legacy_model_survives_render_and_parse() {
        let model = assert_round_trip(
            Dialect::LegacyRelational,
            r#"type Post @pgTable(name: "posts") {
                 author: User @pgColumn(name: "author_id") @relation(name: "PostAuthor")
                 id: Int!
                 title: String! @default(value: "Untitled")
                 updatedAt: DateTime!
               }

               type User @pgTable(name: "users") {
                 id: Int!
                 posts: [Post!]! @relation(name: "PostAuthor")
               }"#,
        );

        let author = model.field(&FieldRef::new("Post", "author")).unwrap();
        assert_eq!(author.database_name.as_deref(), Some("author_id"));
        assert!(model.field(&FieldRef::new("Post", "id")).unwrap().is_id);
        assert!(model.field(&FieldRef::new("Post", "updatedAt")).unwrap().is_updated_at);
    }
}

mod dialect_tests {
    use super::*;

    #[test]
    fn test_document_ids_and_embedded_types() {
        let sdl = "type User {\n  _id: ID! @id\n  address: UserAddress\n}\n\ntype UserAddress @embedded {\n  city: String\n}";
        let model = Parser::new(Dialect::Document)
            .parse_from_schema_string(sdl)
            .unwrap();
        let user = model.type_by_name("User").unwrap();
        assert!(user.field("_id").unwrap().is_id);
        assert!(model.type_by_name("UserAddress").unwrap().is_embedded);

        let rendered = Renderer::new(Dialect::Document).render(&model, true);
        assert_eq!(rendered, sdl);
    }

    #[test]
    fn test_id_strategy_is_parsed() {
        let model = Parser::new(Dialect::Relational)
            .parse_from_schema_string("type A { id: Int! @id(strategy: NONE) }")
            .unwrap();
        let id = model.field(&FieldRef::new("A", "id")).unwrap();
        assert_eq!(id.id_strategy, Some(IdStrategy::None));
        assert!(id.field_type.is(TypeIdentifier::Int));
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_syntax_error_reports_position() {
        let err = Parser::new(Dialect::Relational)
            .parse_from_schema_string("type A {\n  id: \n}")
            .unwrap_err();
        assert!(matches!(err, IntrospectionError::Syntax { line: 3, .. }));
    }

    #[test]
    fn test_unknown_index_field_is_fatal() {
        let err = Parser::new(Dialect::Relational)
            .parse_from_schema_string(
                r#"type A @indexes(value: [{name: "a_idx", fields: ["missing"]}]) { id: ID! @id }"#,
            )
            .unwrap_err();
        assert_eq!(
            err,
            IntrospectionError::UnknownIndexField {
                index: "a_idx".into(),
                field: "missing".into(),
            }
        );
    }
}
