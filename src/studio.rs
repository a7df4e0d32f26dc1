//! The design page: owns the live design and drives the gate, hand-off and
//! return flows.
//!
//! All persisted state is reached through [`EntitlementStore`] and
//! [`HandoffStore`]; nothing here touches storage keys directly. The only
//! awaits are the logo read and the verification round trip.

use std::path::Path;
use std::sync::Arc;

use url::Url;

use crate::entitlement::EntitlementStore;
use crate::error::{msg, AppError, Result};
use crate::features::{ExportFormat, FeatureSet};
use crate::gate::{BlockedChoice, Continuation, ExportGate, GateDecision, GateState};
use crate::handoff::{HandoffOutcome, HandoffStore};
use crate::models::{ImageRef, Shape, StyleConfig};
use crate::render::{ExportOutcome, ExportRenderer, PreviewRenderer, QrRenderer};
use crate::returns::{
    parse_return, restore_location, strip_signal, ReturnSignal, CANCELED_NOTICE, RESTORED_NOTICE,
};
use crate::storage::StorageAdapter;
use crate::verify::{verify_reference, PaymentVerifier};

#[derive(Debug, Clone)]
pub struct StudioOptions {
    /// The design page; return and back links point here.
    pub app_base_url: Url,
    /// Fixed checkout page of the payment provider.
    pub payment_url: Url,
}

/// Result of asking for a download.
#[derive(Debug)]
pub enum ExportResponse {
    Exported {
        outcome: ExportOutcome,
        include_gated: bool,
    },
    Paywall {
        features: FeatureSet,
    },
}

/// Result of closing the paywall.
#[derive(Debug)]
pub enum PaywallResolution {
    Exported(ExportOutcome),
    /// The design is saved; navigate here.
    Checkout(Url),
    Dismissed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReturnOutcome {
    NoSignal,
    Canceled {
        notice: &'static str,
        location: Url,
    },
    /// Payment verified. `restore` is the next location when a design is
    /// waiting to be restored.
    Activated {
        restore: Option<Url>,
    },
    /// Entitlement unchanged; offer a retry or `back`.
    VerificationFailed {
        reason: String,
        back: Url,
    },
    Restored {
        notice: &'static str,
        location: Url,
    },
    Discarded {
        location: Url,
    },
}

pub struct Studio {
    config: StyleConfig,
    entitlement: EntitlementStore,
    handoff: HandoffStore,
    gate: ExportGate,
    preview: PreviewRenderer,
    renderer: Box<dyn QrRenderer>,
    verifier: Arc<dyn PaymentVerifier>,
    options: StudioOptions,
}

impl Studio {
    /// Reads entitlement and hand-off state from `storage` and draws the
    /// initial preview.
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        renderer: Box<dyn QrRenderer>,
        verifier: Arc<dyn PaymentVerifier>,
        options: StudioOptions,
    ) -> Self {
        let mut studio = Self {
            config: StyleConfig::default(),
            entitlement: EntitlementStore::init(storage.clone()),
            handoff: HandoffStore::new(storage),
            gate: ExportGate::new(),
            preview: PreviewRenderer::new(),
            renderer,
            verifier,
            options,
        };
        studio.redraw();
        studio
    }

    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    pub fn is_entitled(&self) -> bool {
        self.entitlement.is_granted()
    }

    pub fn entitlement(&self) -> &EntitlementStore {
        &self.entitlement
    }

    pub fn handoff(&self) -> &HandoffStore {
        &self.handoff
    }

    pub fn gate_state(&self) -> &GateState {
        self.gate.state()
    }

    pub fn preview(&self) -> &PreviewRenderer {
        &self.preview
    }

    // ==================== Design edits ====================

    pub fn replace_config(&mut self, config: StyleConfig) {
        self.update(|c| *c = config);
    }

    pub fn set_content(&mut self, content: &str) {
        self.update(|c| c.set_content(content));
    }

    pub fn set_foreground(&mut self, color: &str) {
        self.update(|c| c.set_foreground(color));
    }

    pub fn set_background(&mut self, color: &str) {
        self.update(|c| c.set_background(color));
    }

    pub fn set_gradient_enabled(&mut self, enabled: bool) {
        self.update(|c| c.set_gradient_enabled(enabled));
    }

    pub fn set_gradient_stops(&mut self, first: &str, second: &str) {
        self.update(|c| c.set_gradient_stops(first, second));
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.update(|c| c.set_shape(shape));
    }

    pub fn set_logo(&mut self, logo: ImageRef) {
        self.update(|c| c.set_logo(Some(logo)));
    }

    pub fn remove_logo(&mut self) {
        self.update(|c| c.set_logo(None));
    }

    /// Reads an image file and embeds it as the logo.
    pub async fn load_logo(&mut self, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        let logo = ImageRef::from_bytes(&bytes, mime_for(path));
        tracing::info!("Logo loaded from {} ({} bytes)", path.display(), bytes.len());
        self.set_logo(logo);
        Ok(())
    }

    fn update(&mut self, edit: impl FnOnce(&mut StyleConfig)) {
        edit(&mut self.config);
        self.redraw();
    }

    fn redraw(&mut self) {
        if let Err(e) = self.preview.redraw(self.renderer.as_mut(), &self.config) {
            tracing::warn!("Preview redraw failed: {}", e);
        }
    }

    // ==================== Export ====================

    /// Asks to download the design as `format`.
    pub fn request_export(&mut self, format: ExportFormat) -> Result<ExportResponse> {
        let decision = self
            .gate
            .request(&self.config, format, self.entitlement.is_granted())?;

        match decision {
            GateDecision::Granted {
                format,
                include_gated,
            } => {
                let outcome = self.export(format, include_gated);
                self.gate.finish();
                Ok(ExportResponse::Exported {
                    outcome,
                    include_gated,
                })
            }
            GateDecision::Blocked { features, .. } => Ok(ExportResponse::Paywall { features }),
        }
    }

    /// Closes the paywall with the user's choice.
    pub fn resolve_paywall(&mut self, choice: BlockedChoice) -> Result<PaywallResolution> {
        match self.gate.resolve(choice)? {
            Continuation::Export {
                format,
                include_gated,
            } => Ok(PaywallResolution::Exported(self.export(format, include_gated))),
            Continuation::StartHandoff => self.start_handoff().map(PaywallResolution::Checkout),
            Continuation::Nothing => Ok(PaywallResolution::Dismissed),
        }
    }

    fn export(&mut self, format: ExportFormat, include_gated: bool) -> ExportOutcome {
        ExportRenderer::export(self.renderer.as_mut(), &self.config, format, include_gated)
    }

    /// Saves the design, then hands out the checkout URL. The URL is never
    /// returned if the write failed.
    fn start_handoff(&mut self) -> Result<Url> {
        self.handoff.write(&self.config)?;
        tracing::info!("Leaving for checkout");
        Ok(self.options.payment_url.clone())
    }

    // ==================== Return from payment ====================

    /// Handles the URL the user arrived on.
    pub async fn handle_return(&mut self, location: &str) -> Result<ReturnOutcome> {
        let url = Url::parse(location)
            .or_else(|_| self.options.app_base_url.join(location))
            .map_err(|_| AppError::BadRequest(msg::INVALID_RETURN_URL.into()))?;

        match parse_return(&url) {
            ReturnSignal::None => Ok(ReturnOutcome::NoSignal),
            ReturnSignal::Canceled => {
                tracing::info!("Checkout canceled");
                Ok(ReturnOutcome::Canceled {
                    notice: CANCELED_NOTICE,
                    location: strip_signal(&url),
                })
            }
            ReturnSignal::Paid { reference } => Ok(self.activate(reference.as_deref()).await),
            ReturnSignal::Restore => {
                let location = strip_signal(&url);
                match self.handoff.consume() {
                    HandoffOutcome::Restored(config) => {
                        self.replace_config(config);
                        Ok(ReturnOutcome::Restored {
                            notice: RESTORED_NOTICE,
                            location,
                        })
                    }
                    HandoffOutcome::Discarded(_) => Ok(ReturnOutcome::Discarded { location }),
                }
            }
        }
    }

    async fn activate(&mut self, reference: Option<&str>) -> ReturnOutcome {
        let proof = match verify_reference(self.verifier.as_ref(), reference).await {
            Ok(proof) => proof,
            Err(e) => {
                return ReturnOutcome::VerificationFailed {
                    reason: e.to_string(),
                    back: self.options.app_base_url.clone(),
                };
            }
        };

        if let Err(e) = self.entitlement.grant(&proof) {
            tracing::warn!("Entitlement granted but not persisted: {}", e);
        }

        let restore = self
            .handoff
            .is_pending()
            .then(|| restore_location(&self.options.app_base_url));

        ReturnOutcome::Activated { restore }
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("config", &self.config)
            .field("entitlement", &self.entitlement)
            .field("handoff", &self.handoff)
            .field("gate", &self.gate)
            .field("options", &self.options)
            .finish()
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
