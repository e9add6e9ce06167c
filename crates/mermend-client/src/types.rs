//! Request and response payloads.
//!
//! Only the fields the front end reads are typed; everything else is kept in `extra` so a
//! round trip through these types loses nothing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CodeRequest<'a> {
    pub code: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MarkdownRequest<'a> {
    pub markdown: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DrawioResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub xml: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lob: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Output of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub trd: Option<String>,
    #[serde(default)]
    pub hld: Option<String>,
    #[serde(default)]
    pub lld: Option<String>,
    #[serde(default)]
    pub backlog: Value,
    #[serde(default)]
    pub approval_id: Option<String>,
    #[serde(default)]
    pub approval_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignLevel {
    High,
    Low,
}

impl AnalysisResults {
    /// Diagram text of the HLD/LLD field with fence markers removed.
    pub fn diagram(&self, level: DesignLevel) -> Option<String> {
        let field = match level {
            DesignLevel::High => self.hld.as_deref(),
            DesignLevel::Low => self.lld.as_deref(),
        }?;
        Some(mermend_core::strip_mermaid_fences(field))
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ApproveRequest<'a> {
    pub analysis_id: Option<&'a str>,
    pub results: &'a AnalysisResults,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApprovalTicket {
    pub approval_id: String,
    #[serde(default)]
    pub approval_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApprovalStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApprovalStatus {
    pub fn is_approved(&self) -> bool {
        self.status.as_deref() == Some("approve")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntegrationStatus {
    #[serde(default)]
    pub configured: bool,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub message: String,
}

/// Response of `POST /api/ado/test`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionTest {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExplainResponse {
    #[serde(default)]
    pub explanation: Option<String>,
}
