//! The fallback rendering ladder.
//!
//! A request walks at most three attempts, in order:
//!
//! 1. the fully normalized text with the primary config;
//! 2. the same text with defensively prefixed ids, same config;
//! 3. a nodes-only diagram rebuilt from the *original* text, with the permissive config.
//!
//! When all three fail the original text is returned as a [`TextPanel`]. The transition rules
//! live in [`transition`] so they can be checked without an engine.

use crate::engine::{EngineHandle, sanitize_svg_id};
use crate::error::LadderError;
use crate::fallback::TextPanel;
use crate::prefix::prefix_identifiers;
use mermend_core::{Normalized, Notice, Pipeline, RenderConfig, simplified_diagram};
use serde::Serialize;

pub const SIMPLIFIED_NOTICE: &str = "Diagram rendered with simplified syntax due to parsing issues.";
pub const TEXT_FALLBACK_NOTICE: &str =
    "Diagram could not be rendered. Check the original code for syntax issues.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LadderState {
    Rendering,
    Rendered,
    FallbackAttempt,
    RenderedSimplified,
    TextFallback,
}

impl LadderState {
    pub fn is_terminal(self) -> bool {
        self.mode().is_some()
    }

    pub fn mode(self) -> Option<RenderMode> {
        match self {
            Self::Rendered => Some(RenderMode::Normal),
            Self::RenderedSimplified => Some(RenderMode::Simplified),
            Self::TextFallback => Some(RenderMode::RawTextFallback),
            Self::Rendering | Self::FallbackAttempt => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    Normal,
    Simplified,
    RawTextFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Attempt {
    Primary,
    Prefixed,
    Simplified,
}

impl Attempt {
    /// The state the ladder is in while this attempt runs.
    pub fn state(self) -> LadderState {
        match self {
            Self::Primary | Self::Prefixed => LadderState::Rendering,
            Self::Simplified => LadderState::FallbackAttempt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: LadderState,
    pub next: Option<Attempt>,
}

pub fn transition(attempt: Attempt, succeeded: bool) -> Transition {
    let (to, next) = match (attempt, succeeded) {
        (Attempt::Primary | Attempt::Prefixed, true) => (LadderState::Rendered, None),
        (Attempt::Primary, false) => (LadderState::Rendering, Some(Attempt::Prefixed)),
        (Attempt::Prefixed, false) => (LadderState::FallbackAttempt, Some(Attempt::Simplified)),
        (Attempt::Simplified, true) => (LadderState::RenderedSimplified, None),
        (Attempt::Simplified, false) => (LadderState::TextFallback, None),
    };
    Transition { to, next }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub attempt: Attempt,
    pub render_id: String,
    pub candidate: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum RenderOutput {
    Svg(String),
    Text(TextPanel),
}

impl RenderOutput {
    pub fn svg(&self) -> Option<&str> {
        match self {
            Self::Svg(svg) => Some(svg),
            Self::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderResult {
    pub diagram_id: String,
    pub state: LadderState,
    pub mode: RenderMode,
    pub output: RenderOutput,
    pub notice: Option<Notice>,
    pub normalized: Normalized,
    pub attempts: Vec<AttemptRecord>,
}

/// Normalizer, engine and the two configs, wired into one ladder.
#[derive(Debug, Clone)]
pub struct Ladder {
    engine: EngineHandle,
    pipeline: Pipeline,
    primary: RenderConfig,
    permissive: RenderConfig,
}

impl Default for Ladder {
    fn default() -> Self {
        Self::new(EngineHandle::builtin())
    }
}

impl Ladder {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            pipeline: Pipeline::standard(),
            primary: RenderConfig::primary(),
            permissive: RenderConfig::permissive(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Overrides merged on top of both presets.
    pub fn with_overrides(mut self, overrides: &RenderConfig) -> Self {
        self.primary = self.primary.merged(overrides);
        self.permissive = self.permissive.merged(overrides);
        self
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn config_for(&self, attempt: Attempt) -> &RenderConfig {
        match attempt {
            Attempt::Primary | Attempt::Prefixed => &self.primary,
            Attempt::Simplified => &self.permissive,
        }
    }

    /// Runs the ladder to a terminal state. Only empty input is an error.
    pub async fn render(&self, diagram_id: &str, source: &str) -> Result<RenderResult, LadderError> {
        if source.trim().is_empty() {
            return Err(LadderError::NoDiagram);
        }

        let normalized = self.pipeline.run(source);
        let stem = sanitize_svg_id(diagram_id);
        let mut state = LadderState::Rendering;
        let mut next = Some(Attempt::Primary);
        let mut attempts: Vec<AttemptRecord> = Vec::with_capacity(3);
        let mut svg: Option<String> = None;

        while let Some(attempt) = next {
            let candidate = match attempt {
                Attempt::Primary => normalized.code.clone(),
                Attempt::Prefixed => prefix_identifiers(&normalized.code),
                Attempt::Simplified => simplified_diagram(source),
            };
            let render_id = match attempt {
                Attempt::Simplified => format!("{stem}-fallback-{}", uuid::Uuid::new_v4().simple()),
                _ => format!("{stem}-{}", uuid::Uuid::new_v4().simple()),
            };

            let outcome = self
                .engine
                .render(&render_id, &candidate, self.config_for(attempt))
                .await;
            let step = transition(attempt, outcome.is_ok());
            let error = match outcome {
                Ok(out) => {
                    tracing::debug!(
                        diagram_id,
                        ?attempt,
                        from = ?state,
                        to = ?step.to,
                        candidate = %candidate,
                        "render attempt succeeded"
                    );
                    svg = Some(out);
                    None
                }
                Err(err) => {
                    tracing::warn!(
                        diagram_id,
                        ?attempt,
                        from = ?state,
                        to = ?step.to,
                        candidate = %candidate,
                        error = %err,
                        "render attempt failed"
                    );
                    Some(err.to_string())
                }
            };
            attempts.push(AttemptRecord {
                attempt,
                render_id,
                candidate,
                error,
            });
            state = step.to;
            next = step.next;
        }

        let (mode, output, notice) = match (state.mode(), svg) {
            (Some(RenderMode::Normal), Some(svg)) => (RenderMode::Normal, RenderOutput::Svg(svg), None),
            (Some(RenderMode::Simplified), Some(svg)) => (
                RenderMode::Simplified,
                RenderOutput::Svg(svg),
                Some(Notice::warning(SIMPLIFIED_NOTICE)),
            ),
            _ => {
                state = LadderState::TextFallback;
                (
                    RenderMode::RawTextFallback,
                    RenderOutput::Text(TextPanel::new(source)),
                    Some(Notice::error(TEXT_FALLBACK_NOTICE)),
                )
            }
        };

        Ok(RenderResult {
            diagram_id: diagram_id.to_string(),
            state,
            mode,
            output,
            notice,
            normalized,
            attempts,
        })
    }
}
