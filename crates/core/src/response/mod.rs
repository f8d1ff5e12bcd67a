//! Response handling

pub mod classifier;

pub use classifier::{BodyKind, ClassificationRules};
