//! Release event gating.
//!
//! A run only reconciles assets for release lifecycle actions that produce a
//! release worth attaching files to. Anything else is a no-op, not a failure.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::errors::TriggerError;

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// Action kind of a `release` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    Created,
    Published,
    Prereleased,
    Other(String),
}

impl TriggerAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "created" => Self::Created,
            "published" => Self::Published,
            "prereleased" => Self::Prereleased,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether assets may be uploaded for this action.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl std::fmt::Display for TriggerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Published => write!(f, "published"),
            Self::Prereleased => write!(f, "prereleased"),
            Self::Other(action) => write!(f, "{}", action),
        }
    }
}

/// Why this run was invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub action: TriggerAction,
    pub release_id: Option<u64>,
}

impl Trigger {
    pub fn new(action: &str, release_id: Option<u64>) -> Self {
        Self {
            action: TriggerAction::parse(action),
            release_id,
        }
    }

    /// Read the trigger from a GitHub event payload file (`$GITHUB_EVENT_PATH`).
    pub fn from_event_file(path: &Path) -> Result<Self, TriggerError> {
        let contents = std::fs::read(path).map_err(|source| TriggerError::PayloadIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_event_json(&contents)
    }

    pub fn from_event_json(payload: &[u8]) -> Result<Self, TriggerError> {
        let payload: ReleaseEventPayload = serde_json::from_slice(payload)?;
        let trigger = Self::new(
            payload.action.as_deref().unwrap_or_default(),
            payload.release.and_then(|r| r.id).filter(|id| *id != 0),
        );
        debug!(action = %trigger.action, release_id = ?trigger.release_id, "parsed event payload");
        Ok(trigger)
    }
}

#[derive(Debug, Deserialize)]
struct ReleaseEventPayload {
    action: Option<String>,
    release: Option<ReleasePayload>,
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    id: Option<u64>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Outcome of trigger validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Proceed { release_id: u64 },
    Skip { action: String },
}

/// Decides whether a run should reconcile assets.
pub struct TriggerValidator;

impl TriggerValidator {
    /// Check the action kind first, then the release id.
    ///
    /// An unsupported action is a [`Gate::Skip`]; a supported action without a
    /// release id is [`TriggerError::MissingRelease`].
    pub fn validate(trigger: &Trigger) -> Result<Gate, TriggerError> {
        if !trigger.action.is_supported() {
            debug!(action = %trigger.action, "release action does not take uploads");
            return Ok(Gate::Skip {
                action: trigger.action.to_string(),
            });
        }

        let release_id = trigger.release_id.ok_or(TriggerError::MissingRelease)?;
        debug!(release_id, "Uploading assets to release: {}...", release_id);
        Ok(Gate::Proceed { release_id })
    }
}
