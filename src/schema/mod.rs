//! Feature schema registry
//!
//! Every feature vector carries the schema version it was extracted with, and
//! the feature store keys storage and retrieval by that version. The registry
//! pins, per version, the extraction windows and the exact set of feature
//! fields, so a schema change cannot ship without a new version.

mod version;

pub use version::*;
