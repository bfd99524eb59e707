//! ONNX Runtime inference collaborator: CUDA/TensorRT EP session
//! construction and an [`OnnxDenoiser`] implementing [`PatchDenoiser`].
//!
//! Supports both FP32 and FP16 patch-denoising models; FP16 models get their
//! batches converted around `session.run`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use half::f16;
use half::slice::HalfFloatSliceExt;
use ndarray::{Array4, ArrayView4};
use ort::{
    execution_providers::{CUDAExecutionProvider, ExecutionProvider, TensorRTExecutionProvider},
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tracing::{debug, info, warn};

use crate::denoiser::PatchDenoiser;

/// Inference backend selection.
///
/// Chosen explicitly at session construction, never read from globals.
/// Default is `Cuda`. `Tensorrt` requires TensorRT runtime libraries
/// (`libnvinfer.so.10` or `nvinfer.dll`); if unavailable, the session falls
/// back to CUDA EP automatically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InferenceBackend {
    #[default]
    Cuda,
    Tensorrt,
}

impl InferenceBackend {
    /// Parse from string (case-insensitive). Returns `Cuda` for unknown values.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "tensorrt" | "trt" => Self::Tensorrt,
            _ => Self::Cuda,
        }
    }
}

impl std::fmt::Display for InferenceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cuda => write!(f, "cuda"),
            Self::Tensorrt => write!(f, "tensorrt"),
        }
    }
}

pub struct SessionConfig<'a> {
    pub model_path: &'a Path,
    pub backend: &'a InferenceBackend,
    pub trt_cache_dir: Option<&'a Path>,
}

/// Build an `ort::Session` with the requested backend and fallback chain.
///
/// For `InferenceBackend::Tensorrt`:
///   - Registers TRT EP with engine caching, then CUDA EP as fallback.
///   - If TRT runtime is unavailable, CUDA EP is used automatically.
///
/// For `InferenceBackend::Cuda`:
///   - Registers CUDA EP only.
///
/// In both cases, if CUDA EP is also unavailable, ORT falls back to CPU.
pub fn build_session(config: &SessionConfig<'_>) -> Result<Session> {
    let builder = Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    let session = match config.backend {
        InferenceBackend::Tensorrt => {
            let cache_dir = config
                .trt_cache_dir
                .unwrap_or_else(|| Path::new("trt_cache"));

            if let Err(e) = std::fs::create_dir_all(cache_dir) {
                warn!(
                    dir = %cache_dir.display(),
                    error = %e,
                    "Failed to create TRT cache directory"
                );
            }

            info!(
                backend = "tensorrt",
                cache_dir = %cache_dir.display(),
                "Building session with TensorRT EP (CUDA EP fallback; first run may take several minutes)"
            );

            let cache_path = cache_dir.to_string_lossy().to_string();

            // TRT EP may fail at runtime if libnvinfer is not installed.
            // The fallback CUDA EP ensures inference still works.
            builder
                .with_execution_providers([
                    TensorRTExecutionProvider::default()
                        .with_engine_cache(true)
                        .with_engine_cache_path(&cache_path)
                        .with_fp16(true)
                        .with_device_id(0)
                        .build(),
                    CUDAExecutionProvider::default().build(),
                ])?
                .commit_from_file(config.model_path)
                .with_context(|| {
                    format!("Failed to load ONNX model: {}", config.model_path.display())
                })?
        }
        InferenceBackend::Cuda => {
            let cuda = CUDAExecutionProvider::default();
            if !cuda.is_available().unwrap_or(false) {
                warn!("CUDA EP is not available — inference will fall back to CPU");
            }

            debug!(backend = "cuda", "Building session with CUDA EP");

            builder
                .with_execution_providers([CUDAExecutionProvider::default().build()])?
                .commit_from_file(config.model_path)
                .with_context(|| {
                    format!("Failed to load ONNX model: {}", config.model_path.display())
                })?
        }
    };

    Ok(session)
}

/// [`PatchDenoiser`] backed by an `ort::Session`.
///
/// The model takes a `(batch, frames, height, width)` tensor and returns one
/// of the same shape; the temporal depth doubles as the channel axis, which
/// is how patch-denoising models are exported.
pub struct OnnxDenoiser {
    session: Arc<Mutex<Session>>,
    input_name: String,
    output_name: String,
    is_fp16: bool,
}

impl OnnxDenoiser {
    pub fn from_file(
        model_path: &Path,
        backend: InferenceBackend,
        trt_cache_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let session = build_session(&SessionConfig {
            model_path,
            backend: &backend,
            trt_cache_dir: trt_cache_dir.as_deref(),
        })?;

        let input_name = session.inputs()[0].name().to_string();
        let output_name = session.outputs()[0].name().to_string();
        let is_fp16 = match session.inputs()[0].dtype() {
            ort::value::ValueType::Tensor { ty, .. } => {
                *ty == ort::tensor::TensorElementType::Float16
            }
            _ => false,
        };

        debug!(%input_name, %output_name, is_fp16, "Detected model IO");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            output_name,
            is_fp16,
        })
    }
}

impl PatchDenoiser for OnnxDenoiser {
    fn denoise(&mut self, batch: ArrayView4<'_, f32>) -> Result<Array4<f32>> {
        let input = batch.to_owned();
        let mut session = self.session.lock().unwrap();
        let output = if self.is_fp16 {
            run_fp16_inference(&mut session, &input, &self.input_name, &self.output_name)?
        } else {
            let input_tensor = Tensor::from_array(input)?;
            let outputs = session.run(ort::inputs![self.input_name.as_str() => &input_tensor])?;
            let output_view = outputs[self.output_name.as_str()].try_extract_array::<f32>()?;
            output_view.to_owned()
        };
        Ok(output.into_dimensionality::<ndarray::Ix4>()?)
    }
}

fn run_fp16_inference(
    session: &mut Session,
    input: &Array4<f32>,
    input_name: &str,
    output_name: &str,
) -> Result<ndarray::ArrayD<f32>> {
    let f32_slice = input
        .as_slice()
        .context("batch must be contiguous for SIMD f16 conversion")?;
    let mut fp16_data = vec![f16::ZERO; f32_slice.len()];
    fp16_data.convert_from_f32_slice(f32_slice);

    let fp16_array = ndarray::ArrayD::from_shape_vec(input.shape().to_vec(), fp16_data)?;
    let input_tensor = Tensor::from_array(fp16_array)?;
    let outputs = session.run(ort::inputs![input_name => &input_tensor])?;
    let output_view = outputs[output_name].try_extract_array::<f16>()?;

    let fp16_owned;
    let fp16_slice = if let Some(s) = output_view.as_slice() {
        s
    } else {
        fp16_owned = output_view.as_standard_layout().into_owned();
        fp16_owned.as_slice().unwrap()
    };
    let mut f32_data = vec![0.0f32; fp16_slice.len()];
    fp16_slice.convert_to_f32_slice(&mut f32_data);

    Ok(ndarray::ArrayD::from_shape_vec(
        output_view.shape().to_vec(),
        f32_data,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str_lossy() {
        assert_eq!(
            InferenceBackend::from_str_lossy("TensorRT"),
            InferenceBackend::Tensorrt
        );
        assert_eq!(
            InferenceBackend::from_str_lossy("trt"),
            InferenceBackend::Tensorrt
        );
        assert_eq!(
            InferenceBackend::from_str_lossy("cuda"),
            InferenceBackend::Cuda
        );
        assert_eq!(
            InferenceBackend::from_str_lossy("something-else"),
            InferenceBackend::Cuda
        );
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(InferenceBackend::Cuda.to_string(), "cuda");
        assert_eq!(InferenceBackend::Tensorrt.to_string(), "tensorrt");
    }
}
