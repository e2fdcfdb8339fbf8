//! Datamodel normalization
//!
//! Normalizers rewrite type and field names in place. Relation coordinates
//! follow every rename; dangling pairs are dropped at the end.

pub mod names;
pub mod reference;

pub use names::ModelNameNormalizer;
pub use reference::ReferenceNormalizer;

use crate::datamodel::Datamodel;

/// A pass that rewrites a datamodel in place
pub trait Normalizer {
    fn normalize(&self, model: &mut Datamodel);
}

/// Normalize against `reference` if given, by naming conventions otherwise
pub fn normalize(model: &mut Datamodel, reference: Option<&Datamodel>) {
    match reference {
        Some(reference) => ReferenceNormalizer::new(reference.clone()).normalize(model),
        None => ModelNameNormalizer::new().normalize(model),
    }
    model.relink();
}
