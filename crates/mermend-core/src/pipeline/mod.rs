//! Ordered normalization passes.
//!
//! Each pass is a pure `&str -> Step` function. Later passes assume earlier ones already ran,
//! so the order in [`Pipeline::standard`] is part of the contract. A pass that cannot
//! confidently transform its input returns it unchanged.

mod asides;
mod edge_labels;
mod grouping;
mod identifiers;
mod line_breaks;
mod shapes;
mod spacing;

pub use asides::strip_asides;
pub use edge_labels::strip_edge_labels;
pub use grouping::repair_grouping;
pub use identifiers::{CATEGORY_HINTS, disambiguate_identifiers};
pub use line_breaks::normalize_line_breaks;
pub use shapes::normalize_shapes;
pub use spacing::normalize_spacing;

use serde::Serialize;

/// How the final candidate was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizeOutcome {
    /// Every pass ran over the caller's text.
    Normalized,
    /// A grouping construct was flattened into a node chain; later passes were skipped.
    Flattened,
    /// Nothing could be extracted; a fixed placeholder diagram was substituted.
    Placeholder,
}

/// Result of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue(String),
    /// Stop the pipeline with a replacement diagram.
    Finish(String, NormalizeOutcome),
}

/// A named pass.
#[derive(Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub apply: fn(&str) -> Step,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

/// Output of one pass, kept so earlier candidates remain available to fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub stage: &'static str,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Normalized {
    pub code: String,
    pub outcome: NormalizeOutcome,
    pub candidates: Vec<Candidate>,
}

impl Normalized {
    pub fn candidate(&self, stage: &str) -> Option<&str> {
        self.candidates
            .iter()
            .find(|c| c.stage == stage)
            .map(|c| c.code.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Stage {
                name: "line-breaks",
                apply: |s: &str| Step::Continue(normalize_line_breaks(s)),
            },
            Stage {
                name: "asides",
                apply: |s: &str| Step::Continue(strip_asides(s)),
            },
            Stage {
                name: "grouping",
                apply: repair_grouping,
            },
            Stage {
                name: "shapes",
                apply: |s: &str| Step::Continue(normalize_shapes(s)),
            },
            Stage {
                name: "edge-labels",
                apply: |s: &str| Step::Continue(strip_edge_labels(s)),
            },
            Stage {
                name: "spacing",
                apply: |s: &str| Step::Continue(normalize_spacing(s)),
            },
            Stage {
                name: "identifiers",
                apply: |s: &str| Step::Continue(disambiguate_identifiers(s)),
            },
        ])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs every pass in order. Empty input yields empty output without running any pass.
    pub fn run(&self, source: &str) -> Normalized {
        if source.trim().is_empty() {
            return Normalized {
                code: String::new(),
                outcome: NormalizeOutcome::Normalized,
                candidates: Vec::new(),
            };
        }

        let mut candidates: Vec<Candidate> = Vec::with_capacity(self.stages.len());
        let mut current = source.to_string();
        for stage in &self.stages {
            match (stage.apply)(&current) {
                Step::Continue(next) => {
                    tracing::debug!(stage = stage.name, changed = next != current, "normalize pass");
                    current = next;
                    candidates.push(Candidate {
                        stage: stage.name,
                        code: current.clone(),
                    });
                }
                Step::Finish(replacement, outcome) => {
                    tracing::info!(stage = stage.name, ?outcome, candidate = %replacement, "normalize pipeline finished early");
                    candidates.push(Candidate {
                        stage: stage.name,
                        code: replacement.clone(),
                    });
                    return Normalized {
                        code: replacement,
                        outcome,
                        candidates,
                    };
                }
            }
        }

        tracing::debug!(candidate = %current, "normalized diagram");
        Normalized {
            code: current,
            outcome: NormalizeOutcome::Normalized,
            candidates,
        }
    }
}

/// Runs the standard pipeline.
pub fn normalize(source: &str) -> Normalized {
    Pipeline::standard().run(source)
}
