pub mod controller;
pub mod history;
pub mod pipeline;
pub mod resolver;
pub mod search;
pub mod types;

pub use controller::{ClassifierController, ClassifierHandle, DisplayState};
pub use history::HistoryTracker;
pub use pipeline::ClassificationPipeline;
pub use resolver::{DecisionResolver, Resolution};
pub use search::SearchLinker;
pub use types::{
    ClassificationResult, ClassifyOptions, ClassifyStage, ClassifyStatus, DisplaySnapshot,
    Prediction,
};
