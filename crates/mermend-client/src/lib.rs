#![forbid(unsafe_code)]

//! Typed async client for the document-analysis backend.
//!
//! Covers server-side diagram rendering (PNG), draw.io and DOCX conversion, document upload and
//! analysis, the approval flow, and the Azure DevOps / Jira work-item browser.

pub mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod work_items;

pub use client::{ApiClient, NO_EXPLANATION};
pub use config::{BASE_URL_ENV, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ClientError, Result};
pub use types::{
    AnalysisResults, AnalysisSummary, ApprovalStatus, ApprovalTicket, ConnectionTest, DesignLevel,
    Document, IntegrationStatus,
};
pub use work_items::{Platform, WorkItemList, WorkItemQuery, WorkItemSummary};

#[cfg(test)]
mod tests;
