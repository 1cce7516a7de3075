//! Canonical data model: normalized metadata, attribution, and the merge
//! contract shared by all capabilities.

mod merge;
mod metadata;
pub mod sanitize;

pub use merge::{Absorb, Single};
pub use metadata::{MetadataDraft, MetadataField, NormalizedMetadata, Sourced};
