//! Datamodel introspection - infers SDL datamodels from existing databases
//!
//! Provides:
//! - A canonical datamodel with a directive-annotated SDL parser and renderer
//! - Relational introspection from raw catalog metadata (Postgres, MySQL, SQLite)
//! - Document store introspection by sampling, with statistical relation resolution
//! - Name normalization, optionally against a previously known datamodel
//! - Connector facades tying the pipelines to a target database type

pub mod config;
pub mod connector;
pub mod datamodel;
pub mod document;
pub mod error;
pub mod normalization;
pub mod relational;
pub mod sdl;

// Re-export commonly used types
pub use config::{IntrospectionConfig, IntrospectionConfigBuilder};
pub use connector::{
    Connector, DatabaseMetadata, DocumentIntrospectionResult, IntrospectionResult,
    RelationalIntrospectionResult,
};
pub use datamodel::{
    Comment, DatabaseType, Datamodel, Dialect, Directive, Field, FieldRef, FieldType, IdStrategy,
    Index, Sequence, Type, TypeIdentifier,
};
pub use document::{
    CollectionDescription, DataIterator, DocumentConnector, DocumentIntrospector,
    InMemoryDocumentStore, SamplingStrategy, introspect_documents,
};
pub use error::IntrospectionError;
pub use normalization::{ModelNameNormalizer, Normalizer, ReferenceNormalizer, normalize};
pub use relational::{Flavor, RelationalCatalog, RelationalConnector, RelationalInferrer};
pub use sdl::{Parser, Renderer};
