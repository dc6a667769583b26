use serde::Deserialize;

use crate::error::AssessmentError;
use crate::record::{BomItem, SolveResult};

/// Strict decode of a solve response. No fence stripping, no coercion.
pub fn decode_solution(raw: &str) -> Result<SolveResult, AssessmentError> {
    let result: SolveResult = serde_json::from_str(raw)
        .map_err(|err| AssessmentError::decode(format!("solve response: {err}")))?;
    if !result.confidence.is_finite() || !(0.0..=1.0).contains(&result.confidence) {
        return Err(AssessmentError::decode(format!(
            "solve response: confidence {} outside [0.0, 1.0]",
            result.confidence
        )));
    }
    Ok(result)
}

#[derive(Deserialize)]
struct BomEnvelope {
    bom: Option<Vec<BomItem>>,
}

/// Decodes `{"bom": [...]}`. A missing `bom` field is a decode failure, not an empty list.
pub fn decode_bill_of_materials(raw: &str) -> Result<Vec<BomItem>, AssessmentError> {
    let envelope: BomEnvelope = serde_json::from_str(raw)
        .map_err(|err| AssessmentError::decode(format!("bill of materials response: {err}")))?;
    envelope.bom.ok_or_else(|| {
        AssessmentError::decode("bill of materials response: missing `bom` field")
    })
}
