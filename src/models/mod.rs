pub mod classifier;
pub mod inference;
pub mod labels;
pub mod manager;

pub use classifier::OnnxClassifier;
pub use inference::InferenceAdapter;
pub use labels::LabelTable;
pub use manager::{ModelManager, ModelStats};
