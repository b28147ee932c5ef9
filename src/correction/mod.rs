//! Portable trigger corrections.
//!
//! A fitted turn-on (optionally divided by a reference turn-on) is written as a
//! correctionlib-style formula node: one real input, one real output, and a
//! TFormula expression in `x` with every fitted number substituted as a literal.

pub mod formula;

use serde::{Deserialize, Serialize};

use crate::domain::{FitFamily, FitResult};
use crate::error::AppError;
use crate::models::expression;

pub use formula::Formula;

pub const SCHEMA_VERSION: u32 = 2;
pub const SET_DESCRIPTION: &str = "Custom trigger correction";
pub const OUTPUT_DESCRIPTION: &str = "Multiplicative event weight";
pub const FORMULA_PARSER: &str = "TFormula";

/// Families whose closed form can be serialized.
pub const SERIALIZABLE: &[FitFamily] = &[FitFamily::Logistic];

/// The exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionSet {
    pub schema_version: u32,
    pub description: String,
    pub corrections: Vec<Correction>,
}

impl CorrectionSet {
    pub fn new(corrections: Vec<Correction>) -> Self {
        CorrectionSet {
            schema_version: SCHEMA_VERSION,
            description: SET_DESCRIPTION.to_string(),
            corrections,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Correction> {
        self.corrections.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub name: String,
    pub description: String,
    pub version: u32,
    pub inputs: Vec<Variable>,
    pub output: Variable,
    pub data: FormulaNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaNode {
    pub nodetype: String,
    pub variables: Vec<String>,
    pub parser: String,
    pub expression: String,
}

/// Names and wording attached to a correction.
#[derive(Debug, Clone)]
pub struct CorrectionLabels<'a> {
    pub name: &'a str,
    pub description: &'a str,
    /// Probe variable the formula reads as `x`.
    pub input: &'a str,
    pub output: &'a str,
}

/// Build the correction `numerator(x)` or `numerator(x) / reference(x)`.
pub fn build_correction(
    labels: &CorrectionLabels<'_>,
    numerator: &FitResult,
    reference: Option<&FitResult>,
) -> Result<Correction, AppError> {
    let mut parts = Vec::with_capacity(2);
    for fit in std::iter::once(numerator).chain(reference) {
        if !SERIALIZABLE.contains(&fit.family) {
            return Err(AppError::config(format!(
                "The {} family cannot be serialized (supported: {}).",
                fit.family,
                SERIALIZABLE
                    .iter()
                    .map(|f| f.display_name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        if !fit.params.is_finite() {
            return Err(AppError::Numerical(format!(
                "Cannot serialize non-finite parameters {:?}.",
                fit.params.to_array()
            )));
        }
        parts.push(expression(fit.family, &fit.params, "x"));
    }

    Ok(Correction {
        name: labels.name.to_string(),
        description: labels.description.to_string(),
        version: 1,
        inputs: vec![Variable {
            name: labels.input.to_string(),
            kind: "real".to_string(),
            description: None,
        }],
        output: Variable {
            name: labels.output.to_string(),
            kind: "real".to_string(),
            description: Some(OUTPUT_DESCRIPTION.to_string()),
        },
        data: FormulaNode {
            nodetype: "formula".to_string(),
            variables: vec![labels.input.to_string()],
            parser: FORMULA_PARSER.to_string(),
            expression: parts.join("/"),
        },
    })
}

impl Correction {
    /// Evaluate the weight for input values given in `inputs` order.
    pub fn evaluate(&self, values: &[f64]) -> Result<f64, AppError> {
        if values.len() != self.inputs.len() {
            return Err(AppError::config(format!(
                "Correction '{}' takes {} input(s), {} given.",
                self.name,
                self.inputs.len(),
                values.len()
            )));
        }
        if self.data.parser != FORMULA_PARSER {
            return Err(AppError::config(format!(
                "Unsupported formula parser '{}'.",
                self.data.parser
            )));
        }
        // The formula's positional variables follow `data.variables`.
        let ordered = self
            .data
            .variables
            .iter()
            .map(|var| {
                self.inputs
                    .iter()
                    .position(|input| &input.name == var)
                    .map(|i| values[i])
                    .ok_or_else(|| {
                        AppError::config(format!("Formula variable '{var}' is not an input."))
                    })
            })
            .collect::<Result<Vec<f64>, AppError>>()?;
        Formula::parse(&self.data.expression)?.eval(&ordered)
    }
}
