//! CLIP model running on ONNX Runtime
//!
//! The model directory must contain the two encoder graphs exported from a
//! CLIP checkpoint plus its tokenizer:
//!
//! - `text_model.onnx`: `input_ids` (and optionally `attention_mask`) →
//!   text embeddings `[batch, dim]` named `text_embeds`, else output 0
//! - `vision_model.onnx`: `pixel_values` `[batch, 3, 224, 224]` → image
//!   embeddings `[batch, dim]` named `image_embeds`, else output 0
//! - `tokenizer.json`: HuggingFace tokenizer that adds start/end tokens
//!
//! Both outputs are L2-normalised here, so text and image vectors can be
//! compared directly with a dot product.

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::{Array2, ArrayViewD};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::preprocess::{self, CLIP_IMAGE_SIZE};
use super::{l2_normalize, run_blocking, Embedding, EmbeddingModel, ModelInfo};
use crate::config::Settings;
use crate::error::ModelError;

pub const TEXT_MODEL_FILE: &str = "text_model.onnx";
pub const VISION_MODEL_FILE: &str = "vision_model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

const TEXT_EMBEDS_OUTPUT: &str = "text_embeds";
const IMAGE_EMBEDS_OUTPUT: &str = "image_embeds";

/// CLIP text and vision encoders sharing one embedding space.
///
/// `Session::run` needs exclusive access, so each session sits behind its own
/// mutex; the weights themselves are never mutated after load.
#[derive(Clone)]
pub struct ClipModel {
    inner: Arc<ClipInner>,
    info: ModelInfo,
    dimension: usize,
}

struct ClipInner {
    text_session: Mutex<Session>,
    vision_session: Mutex<Session>,
    tokenizer: Tokenizer,
    text_wants_mask: bool,
    text_output: usize,
    vision_output: usize,
}

impl std::fmt::Debug for ClipModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipModel")
            .field("info", &self.info)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl ClipModel {
    /// Load the model described by the service settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ModelError> {
        Self::load(
            &settings.resolved_model_dir(),
            ModelInfo {
                model_name: settings.model_name.clone(),
                pretrained: settings.pretrained.clone(),
            },
            settings.intra_threads,
        )
    }

    /// Load both encoders and the tokenizer from `model_dir`.
    ///
    /// Runs one probe inference through each encoder; fails if the text and
    /// image embedding dimensions disagree.
    pub fn load(model_dir: &Path, info: ModelInfo, intra_threads: usize) -> Result<Self, ModelError> {
        info!(
            "Loading CLIP model {} ({}) from {}",
            info.model_name,
            info.pretrained,
            model_dir.display()
        );

        let text_path = existing_file(model_dir, TEXT_MODEL_FILE)?;
        let vision_path = existing_file(model_dir, VISION_MODEL_FILE)?;
        let tokenizer_path = existing_file(model_dir, TOKENIZER_FILE)?;

        let text_session = build_session(&text_path, intra_threads)?;
        let vision_session = build_session(&vision_path, intra_threads)?;
        let text_wants_mask = text_session
            .inputs
            .iter()
            .any(|input| input.name == "attention_mask");
        let text_output = output_index(
            text_session.outputs.iter().map(|o| o.name.as_str()),
            TEXT_EMBEDS_OUTPUT,
        );
        let vision_output = output_index(
            vision_session.outputs.iter().map(|o| o.name.as_str()),
            IMAGE_EMBEDS_OUTPUT,
        );
        debug!("Embedding outputs: text #{}, vision #{}", text_output, vision_output);

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::Load(format!("Failed to load tokenizer: {}", e)))?;

        let inner = ClipInner {
            text_session: Mutex::new(text_session),
            vision_session: Mutex::new(vision_session),
            tokenizer,
            text_wants_mask,
            text_output,
            vision_output,
        };

        let text_dim = inner.encode_text("validation test")?.len();
        let grey = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            CLIP_IMAGE_SIZE,
            CLIP_IMAGE_SIZE,
            Rgb([128, 128, 128]),
        ));
        let image_dim = inner.encode_image(&grey)?.len();

        if text_dim != image_dim {
            return Err(ModelError::Load(format!(
                "Text and image encoders disagree on dimension: {} vs {}",
                text_dim, image_dim
            )));
        }

        info!("CLIP model loaded: {} dimensions", text_dim);

        Ok(Self {
            inner: Arc::new(inner),
            info,
            dimension: text_dim,
        })
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), ModelError> {
        if embedding.len() != self.dimension {
            return Err(ModelError::InvalidDimension {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }
}

fn existing_file(dir: &Path, name: &str) -> Result<PathBuf, ModelError> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(ModelError::Load(format!("Missing model file: {}", path.display())));
    }
    Ok(path)
}

fn build_session(path: &Path, intra_threads: usize) -> Result<Session, ModelError> {
    let load_err = |e: String| ModelError::Load(format!("{}: {}", path.display(), e));

    Session::builder()
        .map_err(|e| load_err(e.to_string()))?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .map_err(|e| load_err(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| load_err(e.to_string()))?
        .with_intra_threads(intra_threads)
        .map_err(|e| load_err(e.to_string()))?
        .commit_from_file(path)
        .map_err(|e| load_err(e.to_string()))
}

/// Position of the output named `wanted`, or the first output
fn output_index<'a>(names: impl IntoIterator<Item = &'a str>, wanted: &str) -> usize {
    names.into_iter().position(|name| name == wanted).unwrap_or(0)
}

/// Take the single row of a `[1, dim]` output
fn single_row(output: ArrayViewD<'_, f32>) -> Result<Embedding, ModelError> {
    match output.shape() {
        [1, _] => Ok(output.iter().copied().collect()),
        shape => Err(ModelError::Inference(format!(
            "Unexpected output shape {:?} (expected [1, dim])",
            shape
        ))),
    }
}

impl ClipInner {
    fn encode_text(&self, text: &str) -> Result<Embedding, ModelError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ModelError::Tokenization(e.to_string()))?;

        let ids = preprocess::truncate_ids(encoding.get_ids().iter().map(|&id| id as i64).collect());
        let len = ids.len();
        debug!("Encoding text with {} tokens", len);

        let input_ids = Array2::from_shape_vec((1, len), ids)
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let mut session = self
            .text_session
            .lock()
            .map_err(|_| ModelError::Inference("text session lock poisoned".to_string()))?;

        let outputs = if self.text_wants_mask {
            let attention_mask = Array2::<i64>::ones((1, len));
            session.run(ort::inputs![
                "input_ids" => Value::from_array(input_ids)?,
                "attention_mask" => Value::from_array(attention_mask)?
            ])?
        } else {
            session.run(ort::inputs![
                "input_ids" => Value::from_array(input_ids)?
            ])?
        };

        let embedding = single_row(outputs[self.text_output].try_extract_array::<f32>()?)?;
        Ok(l2_normalize(embedding))
    }

    fn encode_image(&self, image: &DynamicImage) -> Result<Embedding, ModelError> {
        let pixel_values = preprocess::image_to_tensor(image);

        let mut session = self
            .vision_session
            .lock()
            .map_err(|_| ModelError::Inference("vision session lock poisoned".to_string()))?;

        let outputs = session.run(ort::inputs![
            "pixel_values" => Value::from_array(pixel_values)?
        ])?;

        let embedding = single_row(outputs[self.vision_output].try_extract_array::<f32>()?)?;
        Ok(l2_normalize(embedding))
    }
}

#[async_trait]
impl EmbeddingModel for ClipModel {
    async fn embed_text(&self, text: &str) -> Result<Embedding, ModelError> {
        let inner = self.inner.clone();
        let text = text.to_string();

        let embedding = run_blocking("Text inference", move || inner.encode_text(&text)).await?;

        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    async fn embed_image(&self, bytes: Bytes, content_type: Option<&str>) -> Result<Embedding, ModelError> {
        let inner = self.inner.clone();
        let content_type = content_type.map(str::to_string);

        let embedding = run_blocking("Image inference", move || {
            let image = preprocess::decode_image(&bytes, content_type.as_deref())?;
            inner.encode_image(&image)
        })
        .await?;

        self.check_dimension(&embedding)?;
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn info(&self) -> &ModelInfo {
        &self.info
    }
}
