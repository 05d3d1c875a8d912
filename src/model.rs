use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use image::RgbImage;
use ndarray::Array4;
use tensorflow::{Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Tensor};
use tracing::{debug, info, warn};

use crate::error::{ModelError, PredictError};
use crate::labels::{Label, CLASS_NAMES};
use crate::preprocess::{self, INPUT_SIZE};

const INPUT_DIMENSIONS: [u64; 4] = [1, 3, INPUT_SIZE as u64, INPUT_SIZE as u64];

/// One forward pass from a preprocessed `[1, 3, 224, 224]` tensor to raw
/// class scores. Implementations are shared across concurrent requests.
pub trait Classifier: Send + Sync {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, PredictError>;
}

/// Frozen TensorFlow graph of the ResNet-50 classifier with the
/// 2048 -> 256 -> ReLU -> Dropout -> 2 head, exported in evaluation mode.
pub struct TfModel {
    session: Session,
    graph: Graph,
    input_op: String,
    output_op: String,
}

impl TfModel {
    pub fn load(
        model_path: &Path,
        input_op: &str,
        output_op: &str,
    ) -> Result<Self, ModelError> {
        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.display().to_string()));
        }
        info!("Loading weights from {}", model_path.display());

        let mut graph = Graph::new();
        let mut model_file = File::open(model_path)?;
        let mut model_bytes = Vec::new();
        model_file.read_to_end(&mut model_bytes)?;

        graph.import_graph_def(&model_bytes, &ImportGraphDefOptions::new())?;

        for name in [input_op, output_op] {
            if graph
                .operation_by_name(name)
                .map_err(tensorflow::Status::from)?
                .is_none() {
                return Err(ModelError::MissingOperation(name.to_string()));
            }
        }

        let session = Session::new(&SessionOptions::new(), &graph)?;

        match session.device_list() {
            Ok(devices) => {
                let accelerated = devices.iter().any(|d| d.device_type == "GPU");
                for device in &devices {
                    debug!("Device available: {} ({})", device.name, device.device_type);
                }
                info!(
                    "Inference device: {}",
                    if accelerated { "GPU" } else { "CPU" }
                );
            }
            Err(err) => warn!("Could not list devices: {}", err),
        }

        let model = TfModel {
            session,
            graph,
            input_op: input_op.to_string(),
            output_op: output_op.to_string(),
        };
        model.warm_up()?;

        Ok(model)
    }

    /// Run once on a zero tensor so a graph that does not end in a
    /// two-class head is rejected before the server starts.
    fn warm_up(&self) -> Result<(), ModelError> {
        let scores = self
            .run(&Array4::zeros(shape_of(&INPUT_DIMENSIONS)))
            .map_err(ModelError::WarmUp)?;

        if scores.len() != CLASS_NAMES.len() {
            return Err(ModelError::OutputShape {
                expected: CLASS_NAMES.len(),
                got: scores.len(),
            });
        }
        debug!("Warm-up scores: {:?}", scores);
        Ok(())
    }

    fn run(&self, input: &Array4<f32>) -> Result<Vec<f32>, PredictError> {
        let values: Vec<f32> = input.iter().copied().collect();
        let input_tensor = Tensor::new(&INPUT_DIMENSIONS).with_values(&values)?;

        let input_operation = self
            .graph
            .operation_by_name_required(&self.input_op)?;
        let output_operation = self
            .graph
            .operation_by_name_required(&self.output_op)?;

        let mut args = SessionRunArgs::new();
        args.add_feed(&input_operation, 0, &input_tensor);
        let output_token = args.request_fetch(&output_operation, 0);
        self.session.run(&mut args)?;

        let output_tensor: Tensor<f32> = args.fetch(output_token)?;
        Ok(output_tensor.to_vec())
    }
}

impl Classifier for TfModel {
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, PredictError> {
        let shape = input.shape();
        if shape != &shape_of(&INPUT_DIMENSIONS)[..] {
            return Err(PredictError::Inference(format!(
                "Invalid input shape {:?}, expected {:?}",
                shape, INPUT_DIMENSIONS
            )));
        }
        self.run(input)
    }
}

fn shape_of(dims: &[u64; 4]) -> [usize; 4] {
    dims.map(|d| d as usize)
}

/// The loaded classifier plus the fixed pre- and post-processing around it.
/// Cloning shares the same underlying model.
#[derive(Clone)]
pub struct InferenceEngine {
    classifier: Arc<dyn Classifier>,
}

impl InferenceEngine {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn predict(&self, image: &RgbImage) -> Result<Label, PredictError> {
        let input = preprocess::to_input_tensor(image);
        let scores = self.classifier.forward(&input)?;

        if scores.len() != CLASS_NAMES.len() {
            return Err(PredictError::Inference(format!(
                "Model produced {} scores, expected {}",
                scores.len(),
                CLASS_NAMES.len()
            )));
        }

        Label::from_scores(&scores).ok_or_else(|| {
            PredictError::Inference(format!("No valid maximum in scores {:?}", scores))
        })
    }

    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Label, PredictError> {
        let image = preprocess::decode_image(bytes)?;
        self.predict(&image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores by mean red intensity so different images get different labels.
    struct RednessClassifier {
        calls: AtomicUsize,
    }

    impl Classifier for RednessClassifier {
        fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, PredictError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(input.shape(), &[1, 3, 224, 224]);
            let red = input.index_axis(ndarray::Axis(1), 0).mean().unwrap_or(0.0);
            Ok(vec![-red, red])
        }
    }

    struct FixedScores(Vec<f32>);

    impl Classifier for FixedScores {
        fn forward(&self, _input: &Array4<f32>) -> Result<Vec<f32>, PredictError> {
            Ok(self.0.clone())
        }
    }

    fn engine_with(classifier: impl Classifier + 'static) -> InferenceEngine {
        InferenceEngine::new(Arc::new(classifier))
    }

    #[test]
    fn test_predict_maps_argmax_to_label() {
        let classifier = Arc::new(RednessClassifier {
            calls: AtomicUsize::new(0),
        });
        let engine = InferenceEngine::new(classifier.clone());

        let red = RgbImage::from_pixel(500, 300, Rgb([255, 0, 0]));
        let dark = RgbImage::from_pixel(64, 64, Rgb([0, 0, 0]));
        assert_eq!(engine.predict(&red).unwrap(), Label::Malignant);
        assert_eq!(engine.predict(&dark).unwrap(), Label::Benign);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let engine = engine_with(RednessClassifier {
            calls: AtomicUsize::new(0),
        });
        let img = RgbImage::from_fn(120, 90, |x, y| Rgb([(x * 2) as u8, (y * 2) as u8, 40]));
        let first = engine.predict(&img).unwrap();
        for _ in 0..5 {
            assert_eq!(engine.predict(&img).unwrap(), first);
        }
    }

    #[test]
    fn test_wrong_score_count_is_inference_error() {
        let engine = engine_with(FixedScores(vec![0.1, 0.2, 0.3]));
        let err = engine.predict(&RgbImage::new(10, 10)).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }

    #[test]
    fn test_nan_scores_are_inference_error() {
        let engine = engine_with(FixedScores(vec![f32::NAN, f32::NAN]));
        let err = engine.predict(&RgbImage::new(10, 10)).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }

    #[test]
    fn test_predict_bytes_rejects_garbage_before_forward() {
        let classifier = Arc::new(RednessClassifier {
            calls: AtomicUsize::new(0),
        });
        let engine = InferenceEngine::new(classifier.clone());
        let err = engine.predict_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, PredictError::Decode(_)));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_load_missing_weights_fails() {
        let result = TfModel::load(Path::new("/nonexistent/best_model.pb"), "x", "Identity");
        assert!(matches!(result, Err(ModelError::NotFound(_))));
    }

    #[test]
    fn test_load_corrupt_weights_fails() {
        let path = std::env::temp_dir().join("histo_classifier_corrupt_weights.pb");
        std::fs::write(&path, b"definitely not a graph").unwrap();
        let result = TfModel::load(&path, "x", "Identity");
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }
}
