//! Relational introspection tests

use async_trait::async_trait;
use datamodel_introspection::connector::{Connector, DatabaseMetadata, IntrospectionResult};
use datamodel_introspection::datamodel::{DatabaseType, Datamodel, FieldRef, FieldType, TypeIdentifier};
use datamodel_introspection::relational::{
    Column, RelationalCatalog, RelationalConnector, RelationalInferrer, RelationalSchema, Table,
    TableIndex, TableRelation,
};

fn infer(tables: Vec<Table>, relations: Vec<TableRelation>) -> Datamodel {
    RelationalInferrer::new(DatabaseType::Postgres)
        .infer(&RelationalSchema {
            tables,
            relations,
            ..Default::default()
        })
        .unwrap()
}

fn users() -> Table {
    Table::new("User", vec![Column::new("id", "int4")]).with_primary_key(&["id"])
}

mod hiding_tests {
    use super::*;

    #[test]
    fn test_self_join_table_becomes_list_field() {
        let model = infer(
            vec![
                users(),
                Table::new(
                    "_UserFriends",
                    vec![Column::new("A", "int4"), Column::new("B", "int4")],
                ),
            ],
            vec![
                TableRelation::new(("_UserFriends", "A"), ("User", "id")),
                TableRelation::new(("_UserFriends", "B"), ("User", "id")),
            ],
        );

        assert!(!model.has_type("_UserFriends"));
        let user = model.type_by_name("User").unwrap();
        assert_eq!(user.fields.len(), 2);

        let friends = user.field("User").unwrap();
        assert!(friends.is_list);
        assert_eq!(friends.field_type, FieldType::Reference("User".into()));
        assert_eq!(friends.relation_name.as_deref(), Some("UserFriends"));
        assert_eq!(friends.related_field, Some(FieldRef::new("User", "User")));
    }

    #[test]
    fn test_scalar_list_table_becomes_list_field() {
        let model = infer(
            vec![
                users(),
                Table::new(
                    "User_tags",
                    vec![
                        Column::new("nodeId", "int4"),
                        Column::new("position", "int4"),
                        Column::new("value", "text"),
                    ],
                ),
            ],
            vec![TableRelation::new(("User_tags", "nodeId"), ("User", "id"))],
        );

        assert!(!model.has_type("User_tags"));
        let user = model.type_by_name("User").unwrap();
        let tags = user.field("tags").unwrap();
        assert!(tags.is_list);
        assert!(tags.field_type.is(TypeIdentifier::String));
        assert!(tags.related_field.is_none());

        let rendered = datamodel_introspection::sdl::Renderer::for_database(DatabaseType::Postgres)
            .render(&model, true);
        assert_eq!(rendered, "type User {\n  id: Int! @id\n  tags: [String!]!\n}");
    }
}

mod relation_tests {
    use super::*;

    #[test]
    fn test_ambiguous_foreign_keys_get_relation_names() {
        let model = infer(
            vec![
                users(),
                Table::new(
                    "Question",
                    vec![
                        Column::new("id", "int4"),
                        Column::new("asker_id", "int4"),
                        Column::new("answerer_id", "int4").nullable(),
                    ],
                )
                .with_primary_key(&["id"]),
            ],
            vec![
                TableRelation::new(("Question", "asker_id"), ("User", "id")),
                TableRelation::new(("Question", "answerer_id"), ("User", "id")),
            ],
        );

        let asker = model.field(&FieldRef::new("Question", "asker_id")).unwrap();
        assert_eq!(asker.relation_name.as_deref(), Some("Questions_askers"));
        assert_eq!(asker.related_field, Some(FieldRef::new("User", "questionsAskers")));

        let answerer = model.field(&FieldRef::new("Question", "answerer_id")).unwrap();
        assert_eq!(answerer.relation_name.as_deref(), Some("Questions_answerers"));
        let back = model.related_field(answerer).unwrap();
        assert_eq!(back.name, "questionsAnswerers");
        assert_eq!(back.relation_name.as_deref(), Some("Questions_answerers"));
        assert!(back.is_list);
    }

    #[test]
    fn test_foreign_key_to_non_id_is_flagged() {
        let model = infer(
            vec![
                Table::new("User", vec![Column::new("id", "int4"), Column::new("email", "text")])
                    .with_primary_key(&["id"])
                    .with_index(TableIndex::new("User_email_key", &["email"], true)),
                Table::new("Post", vec![Column::new("id", "int4"), Column::new("owner", "text")])
                    .with_primary_key(&["id"]),
            ],
            vec![TableRelation::new(("Post", "owner"), ("User", "email"))],
        );
        let owner = model.field(&FieldRef::new("Post", "owner")).unwrap();
        assert!(owner.has_error());
    }
}

mod id_tests {
    use super::*;
    use datamodel_introspection::relational::SequenceInfo;

    #[test]
    fn test_sequence_backed_column_wins_over_unique_id() {
        let model = RelationalInferrer::new(DatabaseType::Postgres)
            .infer(&RelationalSchema {
                tables: vec![
                    Table::new(
                        "invoices",
                        vec![
                            Column::new("id", "text"),
                            Column::new("number", "int4")
                                .default_value("nextval('invoices_number_seq'::regclass)"),
                        ],
                    )
                    .with_index(TableIndex::new("invoices_id_key", &["id"], true)),
                ],
                sequences: vec![SequenceInfo {
                    name: "invoices_number_seq".into(),
                    initial_value: 1,
                    allocation_size: 1,
                }],
                ..Default::default()
            })
            .unwrap();

        let invoices = model.type_by_name("invoices").unwrap();
        assert!(invoices.field("number").unwrap().is_id);
        let id = invoices.field("id").unwrap();
        assert!(!id.is_id && id.is_unique);
    }
}

mod connector_tests {
    use super::*;

    struct BlogCatalog;

    fn tables() -> Vec<Table> {
        vec![
            Table::new("users", vec![Column::new("id", "int4")]).with_primary_key(&["id"]),
            Table::new(
                "posts",
                vec![Column::new("id", "int4"), Column::new("author_id", "int4").nullable()],
            )
            .with_primary_key(&["id"]),
        ]
    }

    #[async_trait(?Send)]
    impl RelationalCatalog for BlogCatalog {
        fn database_type(&self) -> DatabaseType {
            DatabaseType::Postgres
        }

        async fn list_schemas(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec!["public".to_string()])
        }

        async fn query_tables(&self, _schema: &str) -> anyhow::Result<Vec<String>> {
            Ok(tables().into_iter().map(|t| t.name).collect())
        }

        async fn query_columns(&self, _schema: &str, table: &str) -> anyhow::Result<Vec<Column>> {
            Ok(tables()
                .into_iter()
                .find(|t| t.name == table)
                .map(|t| t.columns)
                .unwrap_or_default())
        }

        async fn query_indices(&self, _schema: &str, table: &str) -> anyhow::Result<Vec<TableIndex>> {
            Ok(tables()
                .into_iter()
                .find(|t| t.name == table)
                .and_then(|t| t.primary_key)
                .into_iter()
                .collect())
        }

        async fn query_relations(&self, _schema: &str) -> anyhow::Result<Vec<TableRelation>> {
            Ok(vec![TableRelation::new(("posts", "author_id"), ("users", "id"))])
        }

        async fn query_metadata(&self, _schema: &str) -> anyhow::Result<DatabaseMetadata> {
            Ok(DatabaseMetadata {
                table_count: 2,
                size_in_bytes: 16384,
            })
        }
    }

    #[tokio::test]
    async fn test_normalized_rendering() {
        let connector = RelationalConnector::new(BlogCatalog);
        let result = connector.introspect("public").await.unwrap();

        assert_eq!(
            result.render_to_normalized_datamodel_string(None),
            "type Post @db(name: \"posts\") {\n  author: User @db(name: \"author_id\")\n  id: Int! @id\n}\n\ntype User @db(name: \"users\") {\n  id: Int! @id\n  posts: [Post!]!\n}"
        );
        // The raw datamodel is left untouched
        assert!(result.datamodel().has_type("posts"));
    }

    #[tokio::test]
    async fn test_normalization_against_reference() {
        let reference = datamodel_introspection::sdl::Parser::for_database(DatabaseType::Postgres)
            .parse_from_schema_string(
                r#"type Article @db(name: "posts") {
                     id: Int! @id
                     writer: Author @db(name: "author_id")
                   }
                   type Author @db(name: "users") {
                     id: Int! @id
                     articles: [Article!]!
                   }"#,
            )
            .unwrap();

        let connector = RelationalConnector::new(BlogCatalog);
        let result = connector.introspect("public").await.unwrap();
        let model = result.normalized_datamodel(Some(&reference));

        let writer = model.field(&FieldRef::new("Article", "writer")).unwrap();
        assert_eq!(writer.field_type, FieldType::Reference("Author".into()));
        assert_eq!(writer.database_name.as_deref(), Some("author_id"));
        let back = model.related_field(writer).unwrap();
        assert_eq!(back.name, "articles");
    }
}
