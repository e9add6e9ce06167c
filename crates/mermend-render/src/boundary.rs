//! Top-level failure boundary.
//!
//! Wraps a unit of view work so that a panic inside it becomes a [`Recovery`] value instead of
//! tearing down the embedding program.

use futures::FutureExt as _;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};

pub const RECOVERY_TITLE: &str = "Something went wrong";
pub const RECOVERY_MESSAGE: &str =
    "The application encountered an error. Please refresh the page to continue.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryAction {
    ReloadPage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recovery {
    pub title: &'static str,
    pub message: &'static str,
    pub action: RecoveryAction,
    /// Panic payload, for logs only.
    #[serde(skip)]
    pub detail: String,
}

impl Recovery {
    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        tracing::warn!(%detail, "boundary caught a panic");
        Self {
            title: RECOVERY_TITLE,
            message: RECOVERY_MESSAGE,
            action: RecoveryAction::ReloadPage,
            detail,
        }
    }
}

impl std::fmt::Display for Recovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

pub fn guard<T>(f: impl FnOnce() -> T) -> Result<T, Recovery> {
    catch_unwind(AssertUnwindSafe(f)).map_err(Recovery::from_panic)
}

pub async fn guard_async<T>(fut: impl Future<Output = T>) -> Result<T, Recovery> {
    AssertUnwindSafe(fut)
        .catch_unwind()
        .await
        .map_err(Recovery::from_panic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_values_through() {
        assert_eq!(guard(|| 7), Ok(7));
    }

    #[test]
    fn panics_become_recovery() {
        let recovery = guard(|| -> u8 { panic!("layout exploded") }).unwrap_err();
        assert_eq!(recovery.action, RecoveryAction::ReloadPage);
        assert_eq!(recovery.detail, "layout exploded");
        assert_eq!(
            recovery.to_string(),
            format!("{RECOVERY_TITLE}: {RECOVERY_MESSAGE}")
        );
    }

    #[test]
    fn async_panics_become_recovery() {
        let out = futures::executor::block_on(guard_async(async {
            let n: usize = format!("{}", 3).len();
            if n > 0 {
                panic!("render task failed: {n}");
            }
            n
        }));
        assert_eq!(out.unwrap_err().detail, "render task failed: 1");
    }
}
