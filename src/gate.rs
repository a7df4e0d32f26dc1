//! Decides whether an export may go ahead or must show the paywall.
//!
//! `Idle -> Evaluating -> Granted | Blocked`. `Blocked` is left through
//! [`ExportGate::resolve`] with one of the [`BlockedChoice`]s and always
//! ends back in `Idle`.

use serde::Serialize;

use crate::error::{msg, AppError, Result};
use crate::features::{classify, ExportFormat, FeatureSet};
use crate::models::StyleConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    Idle,
    Evaluating,
    Granted {
        format: ExportFormat,
        include_gated: bool,
    },
    Blocked {
        format: ExportFormat,
        features: FeatureSet,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    /// Export now, with gated features included iff `include_gated`.
    Granted {
        format: ExportFormat,
        include_gated: bool,
    },
    /// Show `features` and offer the free download or the upgrade.
    Blocked {
        format: ExportFormat,
        features: FeatureSet,
    },
}

/// What the user picked on the paywall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedChoice {
    DownloadWithoutPremium,
    Upgrade,
    Dismiss,
}

/// What the caller does after the paywall closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Export without gated features. Always raster: vector output is itself
    /// gated.
    Export {
        format: ExportFormat,
        include_gated: bool,
    },
    /// Snapshot the design and leave for the payment page.
    StartHandoff,
    Nothing,
}

/// The gate rule on its own.
///
/// Entitled users always export with gated features included, even if they
/// did not use any; everyone else exports without them.
pub fn decide(features: FeatureSet, entitled: bool, format: ExportFormat) -> GateDecision {
    if features.is_empty() || entitled {
        GateDecision::Granted {
            format,
            include_gated: entitled,
        }
    } else {
        GateDecision::Blocked { format, features }
    }
}

#[derive(Debug)]
pub struct ExportGate {
    state: GateState,
}

impl Default for ExportGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Idle,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Evaluates an export request. Fails if a previous request is still
    /// waiting on the paywall.
    pub fn request(
        &mut self,
        config: &StyleConfig,
        format: ExportFormat,
        entitled: bool,
    ) -> Result<GateDecision> {
        if matches!(self.state, GateState::Blocked { .. }) {
            return Err(AppError::InvalidState(msg::ALREADY_BLOCKED.into()));
        }

        self.state = GateState::Evaluating;
        let features = classify(config, format);
        let decision = decide(features, entitled, format);

        self.state = match &decision {
            GateDecision::Granted {
                format,
                include_gated,
            } => {
                tracing::debug!(%format, include_gated, "Export granted");
                GateState::Granted {
                    format: *format,
                    include_gated: *include_gated,
                }
            }
            GateDecision::Blocked { format, features } => {
                tracing::info!(%format, "Export blocked by paywall: {:?}", features.labels());
                GateState::Blocked {
                    format: *format,
                    features: features.clone(),
                }
            }
        };

        Ok(decision)
    }

    /// Returns to `Idle` once a granted export has run.
    pub fn finish(&mut self) {
        if matches!(self.state, GateState::Granted { .. }) {
            self.state = GateState::Idle;
        }
    }

    /// Leaves `Blocked` with the user's choice.
    pub fn resolve(&mut self, choice: BlockedChoice) -> Result<Continuation> {
        if !matches!(self.state, GateState::Blocked { .. }) {
            return Err(AppError::InvalidState(msg::NOT_BLOCKED.into()));
        }
        self.state = GateState::Idle;

        let continuation = match choice {
            BlockedChoice::DownloadWithoutPremium => Continuation::Export {
                format: ExportFormat::Raster,
                include_gated: false,
            },
            BlockedChoice::Upgrade => Continuation::StartHandoff,
            BlockedChoice::Dismiss => Continuation::Nothing,
        };
        tracing::debug!("Paywall resolved: {:?}", continuation);
        Ok(continuation)
    }
}
