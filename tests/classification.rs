mod common;

use butterfly_classifier::classify::{ClassificationPipeline, ClassifierController, ClassifyOptions};
use butterfly_classifier::image::ImageSource;
use butterfly_classifier::models::{LabelTable, ModelManager};
use butterfly_classifier::ClassifierError;
use common::{jpeg_bytes, labels, one_hot, photo, ScriptedAdapter};
use std::sync::Arc;

#[test]
fn builtin_labels_resolve_monarch() {
    let adapter = Arc::new(ScriptedAdapter::new(one_hot(75, 3)));
    let manager = ModelManager::with_adapter(adapter.clone(), LabelTable::builtin()).unwrap();
    let pipeline = ClassificationPipeline::new(manager.adapter(), manager.labels().clone());

    let prediction = pipeline.classify(&photo(1280, 720)).unwrap();
    assert_eq!(prediction.label, "MONARCH");
    assert!((prediction.confidence - 1.0).abs() < 1e-6);
    assert!(adapter.seen_sizes().iter().all(|&size| size == (224, 224)));
}

#[test]
fn model_wider_than_label_table_fails_at_startup() {
    let adapter = Arc::new(ScriptedAdapter::new(vec![1.0; 76]));
    let err = ModelManager::with_adapter(adapter, LabelTable::builtin())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ClassifierError::LabelMismatch { expected: 75, actual: 76 }
    ));
}

#[test]
fn short_vector_at_runtime_is_a_label_mismatch() {
    let adapter = Arc::new(ScriptedAdapter::new(vec![1.0, 1.0, 1.0, 1.0]));
    let pipeline = ClassificationPipeline::new(adapter.clone(), labels(&["A", "B", "C", "D"]));
    adapter.push(vec![0.2, 0.3, 0.5]);

    let err = pipeline.classify(&photo(50, 50)).unwrap_err();
    assert!(matches!(
        err,
        ClassifierError::LabelMismatch { expected: 4, actual: 3 }
    ));
}

#[test]
fn unscaled_scores_are_normalized_end_to_end() {
    let adapter = Arc::new(ScriptedAdapter::new(vec![1.0, 3.0, 6.0]));
    let pipeline = ClassificationPipeline::new(adapter, labels(&["A", "B", "C"]));

    let prediction = pipeline.classify(&photo(224, 224)).unwrap();
    assert_eq!(prediction.label, "C");
    assert!((prediction.confidence - 0.6).abs() < 1e-6);
}

#[test]
fn tie_break_prefers_first_label() {
    let adapter = Arc::new(ScriptedAdapter::new(vec![0.2, 0.5, 0.5, 0.1]));
    let pipeline = ClassificationPipeline::new(adapter, labels(&["A", "B", "C", "D"]));
    assert_eq!(pipeline.classify(&photo(10, 10)).unwrap().label, "B");
}

#[tokio::test]
async fn controller_tracks_history_and_errors() {
    let adapter = Arc::new(ScriptedAdapter::new(one_hot(75, 3)));
    let manager = ModelManager::with_adapter(adapter.clone(), LabelTable::builtin()).unwrap();
    let pipeline = ClassificationPipeline::new(manager.adapter(), manager.labels().clone());
    let handle = ClassifierController::spawn(pipeline, 50);

    adapter.push(one_hot(75, 3));
    adapter.push(one_hot(75, 39));
    adapter.push_error("runtime exploded");
    adapter.push(vec![0.0; 75]);

    let first = handle
        .classify(ImageSource::Encoded(jpeg_bytes(640, 480)), ClassifyOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(first.prediction.label, "MONARCH");

    let second = handle
        .classify(photo(300, 300), ClassifyOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(second.prediction.label, "VICEROY");

    let third = handle
        .classify(photo(300, 300), ClassifyOptions::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(third, ClassifierError::Inference(_)));
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.label, "Classification error: runtime exploded");
    assert_eq!(snapshot.identified_butterfly, None);

    let fourth = handle
        .classify(photo(300, 300), ClassifyOptions::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(fourth, ClassifierError::NoResult));

    let history = handle.history().await.unwrap();
    assert_eq!(history, vec!["VICEROY", "MONARCH"]);
    assert_eq!(handle.history().await.unwrap(), history);
}
