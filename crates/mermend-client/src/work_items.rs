//! Azure DevOps and Jira items behind one shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ado,
    Jira,
}

impl Platform {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ado => "Azure DevOps",
            Self::Jira => "Jira",
        }
    }

    pub(crate) fn items_path(self) -> &'static [&'static str] {
        match self {
            Self::Ado => &["api", "ado", "work-items"],
            Self::Jira => &["api", "jira", "issues"],
        }
    }

    fn items_field(self) -> &'static str {
        match self {
            Self::Ado => "work_items",
            Self::Jira => "issues",
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ado" | "azure" | "azure-devops" => Ok(Self::Ado),
            "jira" => Ok(Self::Jira),
            other => Err(format!("unknown platform `{other}` (expected ado|jira)")),
        }
    }
}

/// Filters for listing items. Field names are translated per platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkItemQuery {
    pub project: Option<String>,
    pub item_type: Option<String>,
    pub limit: Option<u32>,
}

impl WorkItemQuery {
    pub(crate) fn params(&self, platform: Platform) -> Vec<(&'static str, String)> {
        let (project, kind, limit) = match platform {
            Platform::Ado => ("project", "types", "top"),
            Platform::Jira => ("project_key", "issue_types", "max_results"),
        };
        let mut out = Vec::new();
        if let Some(p) = self.project.as_deref().filter(|p| !p.is_empty()) {
            out.push((project, p.to_string()));
        }
        if let Some(t) = self.item_type.as_deref().filter(|t| !t.is_empty()) {
            out.push((kind, t.to_string()));
        }
        if let Some(n) = self.limit.filter(|n| *n > 0) {
            out.push((limit, n.to_string()));
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkItemList {
    pub platform: Platform,
    pub items: Vec<Value>,
    pub count: u64,
}

impl WorkItemList {
    pub(crate) fn from_response(platform: Platform, body: &Value) -> Self {
        let items = body
            .get(platform.items_field())
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let count = body.get("count").and_then(Value::as_u64).unwrap_or(0);
        Self {
            platform,
            items,
            count,
        }
    }

    pub fn summaries(&self) -> Vec<WorkItemSummary> {
        self.items
            .iter()
            .map(|item| WorkItemSummary::from_item(self.platform, item))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkItemSummary {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<Value>,
    pub estimate: Option<Value>,
    pub created_date: Option<String>,
    pub updated_date: Option<String>,
    pub tags: Option<String>,
    pub html_url: Option<String>,
    pub acceptance_criteria: Option<String>,
}

fn text(item: &Value, key: &str) -> Option<String> {
    match item.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn raw(item: &Value, key: &str) -> Option<Value> {
    item.get(key).filter(|v| !v.is_null()).cloned()
}

impl WorkItemSummary {
    pub fn from_item(platform: Platform, item: &Value) -> Self {
        match platform {
            Platform::Ado => Self {
                id: text(item, "id"),
                title: text(item, "title"),
                description: text(item, "description"),
                kind: text(item, "type"),
                status: text(item, "state"),
                assignee: text(item, "assigned_to"),
                priority: raw(item, "priority"),
                estimate: raw(item, "remaining_work"),
                created_date: text(item, "created_date"),
                updated_date: text(item, "changed_date"),
                tags: text(item, "tags"),
                html_url: text(item, "html_url"),
                acceptance_criteria: text(item, "acceptance_criteria"),
            },
            Platform::Jira => Self {
                id: text(item, "key"),
                title: text(item, "title"),
                description: text(item, "description"),
                kind: text(item, "type"),
                status: text(item, "status"),
                assignee: text(item, "assignee"),
                priority: raw(item, "priority"),
                estimate: raw(item, "story_points"),
                created_date: text(item, "created_date"),
                updated_date: text(item, "updated_date"),
                tags: item.get("labels").and_then(Value::as_array).map(|labels| {
                    labels
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                }),
                html_url: text(item, "html_url"),
                acceptance_criteria: text(item, "acceptance_criteria"),
            },
        }
    }
}
