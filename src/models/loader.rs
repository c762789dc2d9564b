//! ONNX pipeline loader

use crate::error::LoadError;
use crate::models::inference::{ColumnKind, InputLayout, OnnxPipeline};
use anyhow::Context;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::info;

/// Loads the serialized pipeline artifact into an ONNX Runtime session
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the pipeline at `path`.
    ///
    /// Any error here is fatal for the caller: without a model no decision
    /// can be made.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<OnnxPipeline, LoadError> {
        let path = path.as_ref();

        if !path.is_file() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }

        info!(path = %path.display(), threads = self.onnx_threads, "Loading ONNX pipeline");

        let session = self
            .build_session(path)
            .map_err(|source| LoadError::Runtime {
                path: path.to_path_buf(),
                source,
            })?;

        let declared: Vec<(String, Option<ColumnKind>)> = session
            .inputs
            .iter()
            .map(|i| (i.name.clone(), ColumnKind::from_value_type(&i.input_type)))
            .collect();
        let layout = InputLayout::resolve(&declared).map_err(|reason| LoadError::Signature {
            path: path.to_path_buf(),
            reason,
        })?;

        // Prefer the probability output; classifiers also export a label output
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| !o.name.contains("label")))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| LoadError::Signature {
                path: path.to_path_buf(),
                reason: "graph declares no outputs".to_string(),
            })?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline".to_string());

        info!(
            model = %name,
            inputs = declared.len(),
            output = %output_name,
            "Pipeline loaded successfully"
        );

        Ok(OnnxPipeline::new(name, session, layout, output_name))
    }

    fn build_session(&self, path: &Path) -> anyhow::Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;
        Ok(session)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
