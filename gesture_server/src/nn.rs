//! Model integration: loading ONNX models and decoding their raw outputs.
//!
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use tract_onnx::prelude::*;

use crate::preproc::{INPUT_CHANNELS, INPUT_SIZE};

type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Output name read as text by a mapping-style model.
pub const TEXT_OUTPUT: &str = "text";
/// Output name read as confidence by a mapping-style model.
pub const CONFIDENCE_OUTPUT: &str = "confidence";

/// A model able to run a forward pass on a preprocessed image.
pub trait InferModel: Send + Sync {
    /// Run the forward pass and return the raw output tensors.
    fn run(&self, input: Tensor) -> Result<TVec<Tensor>>;

    /// Decoder turning the raw outputs of this model into a [`ModelOutput`].
    fn decoder(&self) -> &OutputDecoder;
}

/// Creates models from files on disk.
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn InferModel>>;
}

/// Raw prediction of a model, in one of the three shapes a model can report.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    /// Positional `(text, confidence)`.
    Pair { text: String, confidence: f64 },
    /// Named fields, either of which may be absent.
    Mapping {
        text: Option<String>,
        confidence: Option<f64>,
    },
    /// A single value without a confidence.
    Scalar(String),
}

/// Which [`ModelOutput`] variant a model produces. Decided once at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLayout {
    /// Outputs are addressed by name, holding the outlet index of each field.
    Mapping {
        text: Option<usize>,
        confidence: Option<usize>,
    },
    /// Output 0 is the text, output 1 the confidence.
    Pair,
    /// Output 0 is the whole prediction.
    Scalar,
}

impl OutputLayout {
    /// Pick the layout from the names of the model outputs.
    pub fn from_output_names<S: AsRef<str>>(names: &[S]) -> Self {
        let position = |wanted: &str| names.iter().position(|name| name.as_ref() == wanted);
        let text = position(TEXT_OUTPUT);
        let confidence = position(CONFIDENCE_OUTPUT);

        match names.len() {
            _ if text.is_some() || confidence.is_some() => Self::Mapping { text, confidence },
            n if n >= 2 => Self::Pair,
            _ => Self::Scalar,
        }
    }
}

/// Turns raw output tensors into a [`ModelOutput`] following an [`OutputLayout`].
#[derive(Debug, Clone)]
pub struct OutputDecoder {
    layout: OutputLayout,
    labels: Vec<String>,
}

impl OutputDecoder {
    pub fn new(layout: OutputLayout, labels: Vec<String>) -> Self {
        Self { layout, labels }
    }

    pub fn decode(&self, outputs: &[Tensor]) -> Result<ModelOutput> {
        match self.layout {
            OutputLayout::Mapping { text, confidence } => Ok(ModelOutput::Mapping {
                text: text
                    .map(|idx| self.text_of(output_at(outputs, idx)?))
                    .transpose()?,
                confidence: confidence
                    .map(|idx| confidence_of(output_at(outputs, idx)?))
                    .transpose()?,
            }),
            OutputLayout::Pair => Ok(ModelOutput::Pair {
                text: self.text_of(output_at(outputs, 0)?)?,
                confidence: confidence_of(output_at(outputs, 1)?)?,
            }),
            OutputLayout::Scalar => Ok(ModelOutput::Scalar(
                self.text_of(output_at(outputs, 0)?)?,
            )),
        }
    }

    /// Read the text carried by a tensor.
    ///
    /// String tensors hold the text directly. Integer tensors hold a class index and float
    /// tensors hold per-class scores whose arg-max is the class index. Class indices are
    /// mapped through the labels when there are any.
    fn text_of(&self, tensor: &Tensor) -> Result<String> {
        if tensor.len() == 0 {
            bail!("empty text output");
        }

        let class_idx = match tensor.datum_type() {
            DatumType::String => return Ok(tensor.as_slice::<String>()?[0].clone()),
            DatumType::F16 | DatumType::F32 | DatumType::F64 => {
                let scores = tensor.cast_to::<f32>()?;
                scores
                    .as_slice::<f32>()?
                    .iter()
                    .position_max_by(|a, b| a.total_cmp(b))
                    .context("no scores in output")?
            }
            dt if dt.is_integer() => {
                let idx = tensor.cast_to::<i64>()?.as_slice::<i64>()?[0];
                usize::try_from(idx).with_context(|| format!("negative class index {idx}"))?
            }
            dt => bail!("unsupported text output type {dt:?}"),
        };

        Ok(self
            .labels
            .get(class_idx)
            .cloned()
            .unwrap_or_else(|| class_idx.to_string()))
    }
}

fn output_at(outputs: &[Tensor], idx: usize) -> Result<&Tensor> {
    outputs
        .get(idx)
        .with_context(|| format!("model returned {} outputs, need #{idx}", outputs.len()))
}

/// Read the confidence carried by a tensor, its largest element.
fn confidence_of(tensor: &Tensor) -> Result<f64> {
    let values = tensor.cast_to::<f64>()?;
    values
        .as_slice::<f64>()?
        .iter()
        .copied()
        .max_by(|a, b| a.total_cmp(b))
        .context("empty confidence output")
}

/// Model served from an ONNX file.
pub struct OnnxModel {
    model: NnModel,
    decoder: OutputDecoder,
}

impl fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnnxModel")
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}

impl OnnxModel {
    /// Load and optimize the model at `path`, along with its label sidecar if present.
    pub fn from_path(path: &Path) -> Result<Self> {
        let input_fact = InferenceFact::dt_shape(
            f32::datum_type(),
            tvec!(1, INPUT_SIZE, INPUT_SIZE, INPUT_CHANNELS),
        );
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to parse {}", path.display()))?
            .with_input_fact(0, input_fact)?;

        let output_names: Vec<String> = model
            .output_outlets()?
            .iter()
            .map(|outlet| {
                model
                    .outlet_label(*outlet)
                    .map(str::to_owned)
                    .unwrap_or_else(|| model.node(outlet.node).name.clone())
            })
            .collect();
        let layout = OutputLayout::from_output_names(output_names.as_slice());
        log::debug!("Model outputs {:?} read as {:?}", output_names, layout);

        let model = model.into_optimized()?.into_runnable()?;
        let labels = read_labels(&labels_path(path))?;

        Ok(Self {
            model,
            decoder: OutputDecoder::new(layout, labels),
        })
    }
}

impl InferModel for OnnxModel {
    fn run(&self, input: Tensor) -> Result<TVec<Tensor>> {
        let raw_nn_out = self.model.run(tvec!(input.into()))?;
        Ok(raw_nn_out.into_iter().map(|v| v.into_tensor()).collect())
    }

    fn decoder(&self) -> &OutputDecoder {
        &self.decoder
    }
}

/// Loader for ONNX models.
#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxLoader;

impl ModelLoader for OnnxLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn InferModel>> {
        Ok(Arc::new(OnnxModel::from_path(path)?))
    }
}

/// Path of the label sidecar of a model, `gesture.onnx` -> `gesture.labels`.
pub fn labels_path(model_path: &Path) -> PathBuf {
    model_path.with_extension("labels")
}

/// Read one label per line, skipping blank lines. A missing file means no labels.
pub fn read_labels(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(vec![]);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read labels from {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}
