//! ONNX Runtime backed pipeline

use crate::feature_extractor::{FeatureValue, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::models::Pipeline;
use anyhow::{anyhow, bail, Context, Result};
use ort::memory::Allocator;
use ort::session::{Session, SessionOutputs};
use ort::tensor::TensorElementType;
use ort::value::{
    DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor, ValueType,
};
use std::sync::Mutex;
use tracing::debug;

/// Element type of a per-column graph input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float32,
    Float64,
    Int64,
    String,
}

impl ColumnKind {
    pub(crate) fn from_value_type(value_type: &ValueType) -> Option<Self> {
        match value_type {
            ValueType::Tensor { ty, .. } => match ty {
                TensorElementType::Float32 => Some(ColumnKind::Float32),
                TensorElementType::Float64 => Some(ColumnKind::Float64),
                TensorElementType::Int64 => Some(ColumnKind::Int64),
                TensorElementType::String => Some(ColumnKind::String),
                _ => None,
            },
            _ => None,
        }
    }
}

/// How the graph expects the feature vector to be fed
#[derive(Debug, Clone, PartialEq)]
pub enum InputLayout {
    /// One `[1, 13]` f32 tensor with categories as ordinal codes
    Row { name: String },
    /// One `[1, 1]` tensor per training column, bound by name. Categorical
    /// columns are strings and the graph does its own encoding.
    Columns(Vec<(String, ColumnKind)>),
}

impl InputLayout {
    /// Work out the layout from the graph's declared inputs.
    pub(crate) fn resolve(inputs: &[(String, Option<ColumnKind>)]) -> Result<Self, String> {
        match inputs {
            [] => Err("graph declares no inputs".to_string()),
            [(name, _)] => Ok(InputLayout::Row { name: name.clone() }),
            _ if inputs.len() == FEATURE_COUNT => {
                let mut columns = Vec::with_capacity(FEATURE_COUNT);
                for column in FEATURE_NAMES {
                    let (name, kind) = inputs
                        .iter()
                        .find(|(name, _)| name == column)
                        .ok_or_else(|| format!("graph has no input named `{}`", column))?;
                    let kind = kind.ok_or_else(|| {
                        format!("input `{}` has an unsupported element type", name)
                    })?;
                    columns.push((name.clone(), kind));
                }
                Ok(InputLayout::Columns(columns))
            }
            _ => Err(format!(
                "expected 1 feature tensor or {} named column inputs, found {}",
                FEATURE_COUNT,
                inputs.len()
            )),
        }
    }
}

/// A single column value ready to become a `[1, 1]` tensor
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnValue {
    F32(f32),
    F64(f64),
    I64(i64),
    Str(String),
}

/// Pair every feature with the graph input of the same name.
pub(crate) fn bind_columns(
    features: &FeatureVector,
    columns: &[(String, ColumnKind)],
) -> Result<Vec<(String, ColumnValue)>> {
    features
        .named()
        .map(|(name, value)| {
            let (_, kind) = columns
                .iter()
                .find(|(input, _)| input == name)
                .ok_or_else(|| anyhow!("graph has no input for column `{}`", name))?;

            let bound = match (value, kind) {
                (FeatureValue::Categorical { label, .. }, ColumnKind::String) => {
                    ColumnValue::Str(label.to_string())
                }
                (FeatureValue::Numeric(v), ColumnKind::Float32) => ColumnValue::F32(*v as f32),
                (FeatureValue::Numeric(v), ColumnKind::Float64) => ColumnValue::F64(*v),
                (FeatureValue::Numeric(v), ColumnKind::Int64) if v.fract() == 0.0 => {
                    ColumnValue::I64(*v as i64)
                }
                (value, kind) => bail!(
                    "column `{}` value {:?} does not fit input type {:?}",
                    name,
                    value,
                    kind
                ),
            };
            Ok((name.to_string(), bound))
        })
        .collect()
}

fn column_tensor(value: ColumnValue) -> Result<DynValue> {
    let shape = vec![1_i64, 1];
    let tensor = match value {
        ColumnValue::F32(v) => Tensor::from_array((shape, vec![v]))?.into_dyn(),
        ColumnValue::F64(v) => Tensor::from_array((shape, vec![v]))?.into_dyn(),
        ColumnValue::I64(v) => Tensor::from_array((shape, vec![v]))?.into_dyn(),
        ColumnValue::Str(v) => Tensor::<String>::from_string_array((shape, &[v][..]))?.into_dyn(),
    };
    Ok(tensor)
}

/// Exported gradient-boosted pipeline held in an ONNX Runtime session.
///
/// A session run needs exclusive access, so calls are serialized through a
/// mutex. Nothing else is ever written after load.
#[derive(Debug)]
pub struct OnnxPipeline {
    name: String,
    session: Mutex<Session>,
    layout: InputLayout,
    output_name: String,
}

impl OnnxPipeline {
    pub(crate) fn new(
        name: String,
        session: Session,
        layout: InputLayout,
        output_name: String,
    ) -> Self {
        Self {
            name,
            session: Mutex::new(session),
            layout,
            output_name,
        }
    }

    pub fn layout(&self) -> &InputLayout {
        &self.layout
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }
}

impl Pipeline for OnnxPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64> {
        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;

        let outputs = match &self.layout {
            InputLayout::Row { name } => {
                let row = features.to_f32_row();

                // Shape [1, num_features]: a single applicant
                let shape = vec![1_i64, row.len() as i64];
                let input_tensor =
                    Tensor::from_array((shape, row)).context("Failed to create input tensor")?;

                session.run(ort::inputs![name => input_tensor])?
            }
            InputLayout::Columns(columns) => {
                let inputs = bind_columns(features, columns)?
                    .into_iter()
                    .map(|(name, value)| Ok((name, column_tensor(value)?)))
                    .collect::<Result<Vec<(String, DynValue)>>>()
                    .context("Failed to create column tensors")?;

                session.run(inputs)?
            }
        };

        let probability = positive_class_probability(&outputs, &self.output_name)?;
        debug!(model = %self.name, probability, "Pipeline scored applicant");
        Ok(probability)
    }
}

/// Find the approval-class probability among the session outputs.
///
/// XGBoost exports a `[1, 2]` tensor; scikit-learn style exports wrap the
/// class probabilities in `seq(map(int64, float))`.
fn positive_class_probability(outputs: &SessionOutputs, preferred: &str) -> Result<f64> {
    if let Some(output) = outputs.get(preferred) {
        if let Some(prob) = probability_from_value(output)? {
            return Ok(prob);
        }
    }

    for (name, output) in outputs.iter() {
        let name: &str = &name;
        if name == preferred || name.contains("label") {
            continue;
        }
        if let Some(prob) = probability_from_value(&output)? {
            debug!(output = %name, "Probability taken from fallback output");
            return Ok(prob);
        }
    }

    bail!("no probability output found (expected `{}`)", preferred)
}

fn probability_from_value(output: &DynValue) -> Result<Option<f64>> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return probability_from_tensor(&dims, data).map(Some);
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return probability_from_sequence_map(output).map(Some);
    }

    Ok(None)
}

/// Probability of class 1 from a `[1, classes]`, `[classes]` or `[1, 1]` tensor.
fn probability_from_tensor(dims: &[i64], data: &[f32]) -> Result<f64> {
    let classes = match dims {
        [_, classes] | [classes] => *classes,
        _ => bail!("unexpected probability tensor shape {:?}", dims),
    };

    let prob = match classes {
        1 => data.first(),
        c if c >= 2 => data.get(1),
        _ => None,
    };

    prob.map(|&p| p as f64)
        .ok_or_else(|| anyhow!("probability tensor of shape {:?} is empty", dims))
}

fn probability_from_sequence_map(output: &DynValue) -> Result<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let first = maps.first().ok_or_else(|| anyhow!("Empty probability sequence"))?;

    let pairs = first.try_extract_key_values::<i64, f32>()?;
    class_one_probability(&pairs)
}

fn class_one_probability(pairs: &[(i64, f32)]) -> Result<f64> {
    if let Some((_, p)) = pairs.iter().find(|(class, _)| *class == 1) {
        return Ok(*p as f64);
    }
    if let Some((_, p)) = pairs.iter().find(|(class, _)| *class == 0) {
        return Ok(1.0 - *p as f64);
    }
    bail!("probability map has neither class 0 nor class 1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::FeatureExtractor;
    use crate::types::applicant::sample_applicant;

    /// Declared inputs of a per-column export: strings for categories,
    /// floats for everything else
    fn column_inputs() -> Vec<(String, Option<ColumnKind>)> {
        let features = FeatureExtractor::new().extract(&sample_applicant());
        features
            .named()
            .map(|(name, value)| {
                let kind = match value {
                    FeatureValue::Categorical { .. } => ColumnKind::String,
                    FeatureValue::Numeric(_) => ColumnKind::Float32,
                };
                (name.to_string(), Some(kind))
            })
            .collect()
    }

    #[test]
    fn test_single_input_is_row_layout() {
        let layout = InputLayout::resolve(&[("float_input".to_string(), None)]).unwrap();
        assert_eq!(
            layout,
            InputLayout::Row {
                name: "float_input".to_string()
            }
        );
    }

    #[test]
    fn test_named_inputs_resolve_in_training_order() {
        let mut inputs = column_inputs();
        inputs.reverse();

        let layout = InputLayout::resolve(&inputs).unwrap();

        match layout {
            InputLayout::Columns(columns) => {
                let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, FEATURE_NAMES.to_vec());
                assert_eq!(columns[1].1, ColumnKind::String);
                assert_eq!(columns[0].1, ColumnKind::Float32);
            }
            other => panic!("unexpected layout: {:?}", other),
        }
    }

    #[test]
    fn test_unusable_inputs_rejected() {
        assert!(InputLayout::resolve(&[]).is_err());

        let two = vec![("a".to_string(), None), ("b".to_string(), None)];
        assert!(InputLayout::resolve(&two).is_err());

        let mut renamed = column_inputs();
        renamed[4].0 = "years_employed".to_string();
        let err = InputLayout::resolve(&renamed).unwrap_err();
        assert!(err.contains("person_emp_exp"));

        let mut untyped = column_inputs();
        untyped[0].1 = None;
        assert!(InputLayout::resolve(&untyped).is_err());
    }

    #[test]
    fn test_columns_bound_by_name() {
        let features = FeatureExtractor::new().extract(&sample_applicant());
        let columns = match InputLayout::resolve(&column_inputs()).unwrap() {
            InputLayout::Columns(columns) => columns,
            other => panic!("unexpected layout: {:?}", other),
        };

        let bound = bind_columns(&features, &columns).unwrap();

        assert_eq!(bound.len(), FEATURE_COUNT);
        assert_eq!(
            bound[0],
            ("person_age".to_string(), ColumnValue::F32(30.0))
        );
        assert_eq!(
            bound[2],
            (
                "person_education".to_string(),
                ColumnValue::Str("Bachelor".to_string())
            )
        );
        assert_eq!(
            bound[9],
            ("loan_percent_income".to_string(), ColumnValue::F32(0.2))
        );
        assert_eq!(
            bound[12],
            (
                "previous_loan_defaults_on_file".to_string(),
                ColumnValue::Str("No".to_string())
            )
        );
    }

    #[test]
    fn test_integer_and_double_columns() {
        let features = FeatureExtractor::new().extract(&sample_applicant());
        let mut inputs = column_inputs();
        inputs[0].1 = Some(ColumnKind::Int64);
        inputs[8].1 = Some(ColumnKind::Float64);
        let columns = match InputLayout::resolve(&inputs).unwrap() {
            InputLayout::Columns(columns) => columns,
            other => panic!("unexpected layout: {:?}", other),
        };

        let bound = bind_columns(&features, &columns).unwrap();

        assert_eq!(bound[0].1, ColumnValue::I64(30));
        assert_eq!(bound[8].1, ColumnValue::F64(11.0));
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let features = FeatureExtractor::new().extract(&sample_applicant());

        // Category fed to a numeric input
        let mut inputs = column_inputs();
        inputs[1].1 = Some(ColumnKind::Float32);
        let columns = match InputLayout::resolve(&inputs).unwrap() {
            InputLayout::Columns(columns) => columns,
            other => panic!("unexpected layout: {:?}", other),
        };
        assert!(bind_columns(&features, &columns).is_err());

        // Fractional ratio fed to an integer input
        let mut inputs = column_inputs();
        inputs[9].1 = Some(ColumnKind::Int64);
        let columns = match InputLayout::resolve(&inputs).unwrap() {
            InputLayout::Columns(columns) => columns,
            other => panic!("unexpected layout: {:?}", other),
        };
        assert!(bind_columns(&features, &columns).is_err());
    }

    #[test]
    fn test_two_class_tensor() {
        let prob = probability_from_tensor(&[1, 2], &[0.25, 0.75]).unwrap();
        assert!((prob - 0.75).abs() < 1e-6);

        let prob = probability_from_tensor(&[2], &[0.6, 0.4]).unwrap();
        assert!((prob - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_single_column_tensor() {
        let prob = probability_from_tensor(&[1, 1], &[0.5]).unwrap();
        assert_eq!(prob, 0.5);
    }

    #[test]
    fn test_malformed_tensor() {
        assert!(probability_from_tensor(&[1, 2, 3], &[0.0; 6]).is_err());
        assert!(probability_from_tensor(&[1, 2], &[]).is_err());
        assert!(probability_from_tensor(&[1, 0], &[]).is_err());
    }

    #[test]
    fn test_class_map() {
        let prob = class_one_probability(&[(0, 0.3), (1, 0.7)]).unwrap();
        assert!((prob - 0.7).abs() < 1e-6);

        let prob = class_one_probability(&[(0, 0.25)]).unwrap();
        assert!((prob - 0.75).abs() < 1e-6);

        assert!(class_one_probability(&[(2, 1.0)]).is_err());
    }
}
