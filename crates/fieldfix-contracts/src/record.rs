use std::fmt;

use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::problem::{Domain, ImageAttachment, Language, ProblemRequest};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticNode {
    pub hypothesis: String,
    pub test: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BomPriority {
    High,
    Medium,
    Low,
}

impl fmt::Display for BomPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BomPriority::High => "High",
            BomPriority::Medium => "Medium",
            BomPriority::Low => "Low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BomItem {
    pub item_name: String,
    pub specification: String,
    pub quantity: String,
    pub priority: BomPriority,
}

/// Decoded body of a solve response.
///
/// Field names follow the wire schema (`followUp24h`, `projectScopeConfirm`, ...). Optional
/// arrays that are absent or `null` decode to empty vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveResult {
    pub analysis: String,
    #[serde(default)]
    pub safety_check: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub diagnostic_tree: Vec<DiagnosticNode>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub clarification_questions: Vec<String>,
    #[serde(default)]
    pub project_scope_confirm: Option<String>,
    #[serde(default)]
    pub time_to_complete: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub follow_up_24h: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub follow_up_7d: Vec<String>,
    pub steps: Vec<String>,
    pub variables: IndexMap<String, String>,
    #[serde(default)]
    pub final_result: Option<String>,
    pub confidence: f64,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One completed solve, plus the optional bill of materials merged later.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionRecord {
    pub id: String,
    pub created_at: String,
    pub field: Domain,
    pub query: String,
    pub image: Option<ImageAttachment>,
    pub language: Language,
    pub model: String,
    #[serde(flatten)]
    pub result: SolveResult,
    pub bill_of_materials: Option<Vec<BomItem>>,
}

impl SolutionRecord {
    pub fn new(
        id: impl Into<String>,
        request: &ProblemRequest,
        model: impl Into<String>,
        result: SolveResult,
    ) -> Self {
        Self {
            id: id.into(),
            created_at: now_utc_iso(),
            field: request.domain,
            query: request.description.clone(),
            image: request.image.clone(),
            language: request.language,
            model: model.into(),
            result,
            bill_of_materials: None,
        }
    }

    /// Rebuilds the input that produced this record.
    pub fn to_request(&self) -> ProblemRequest {
        ProblemRequest::new(self.field, self.query.clone())
            .with_language(self.language)
            .with_image(self.image.clone())
    }
}

/// `sol-<unix millis>-<8 hex>`; the sequence number keeps ids distinct within one millisecond.
pub fn record_id(created_at_millis: i64, sequence: u64, query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(created_at_millis.to_be_bytes());
    hasher.update(sequence.to_be_bytes());
    hasher.update(query.as_bytes());
    let digest = hasher.finalize();
    format!("sol-{created_at_millis}-{}", hex::encode(&digest[..4]))
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
