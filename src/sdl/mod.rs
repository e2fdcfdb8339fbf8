//! SDL text in and out of the datamodel
//!
//! - `parser`: GraphQL schema document to [`Datamodel`](crate::datamodel::Datamodel)
//! - `renderer`: datamodel back to SDL text

pub mod parser;
pub mod renderer;

pub use parser::{Parser, SchemaDocument};
pub use renderer::Renderer;
