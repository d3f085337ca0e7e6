//! Feature preprocessing
//!
//! The train/serve contract lives here:
//! - [`CategoryVocabulary`] holds the categories seen per field at training
//!   time and one-hot encodes values against them (unknown values become an
//!   all-zero block)
//! - [`encode`] assembles the categorical block followed by the numeric block
//! - [`reorder`] reindexes to the persisted [`ColumnOrder`], failing hard on
//!   any drift
//! - [`FeaturePipeline`] bundles schema, vocabulary and column order

mod encoder;
mod pipeline;

pub use encoder::{CategoryField, CategoryVocabulary};
pub use pipeline::{encode, reorder, ColumnOrder, EncodedVector, FeaturePipeline, NamedVector};
