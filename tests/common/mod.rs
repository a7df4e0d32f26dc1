//! Test utilities and fixtures for qrstudio integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use url::Url;

pub use qrstudio::error::{AppError, Result};
pub use qrstudio::features::{classify, ExportFormat, FeatureSet, FeatureTag};
pub use qrstudio::gate::{BlockedChoice, GateState};
pub use qrstudio::models::*;
pub use qrstudio::render::{Artifact, QrRenderer, RenderInstructions};
pub use qrstudio::storage::{keys, MemoryStorage, StorageAdapter};
pub use qrstudio::studio::{ExportResponse, PaywallResolution, ReturnOutcome, Studio, StudioOptions};
pub use qrstudio::verify::PaymentVerifier;

pub const APP_BASE: &str = "http://app.test/";
pub const PAYMENT_URL: &str = "https://pay.test/b/qrstudio";

/// A tiny valid data URL standing in for an uploaded logo.
pub const LOGO_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";

/// What the recording renderer was asked to do.
#[derive(Debug, Clone)]
pub enum RenderCall {
    Attach(RenderInstructions),
    Export {
        instructions: RenderInstructions,
        format: ExportFormat,
        base_name: String,
    },
}

/// Renderer that records every call instead of drawing.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub calls: Arc<Mutex<Vec<RenderCall>>>,
    pub fail_exports: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_exports: true,
            ..Self::default()
        }
    }

    pub fn exports(&self) -> Vec<(RenderInstructions, ExportFormat, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                RenderCall::Export {
                    instructions,
                    format,
                    base_name,
                } => Some((instructions.clone(), *format, base_name.clone())),
                RenderCall::Attach(_) => None,
            })
            .collect()
    }

    pub fn attaches(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, RenderCall::Attach(_)))
            .count()
    }
}

impl QrRenderer for RecordingRenderer {
    fn attach(&mut self, instructions: &RenderInstructions) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(RenderCall::Attach(instructions.clone()));
        Ok(())
    }

    fn export(
        &mut self,
        instructions: &RenderInstructions,
        format: ExportFormat,
        base_name: &str,
    ) -> Result<Artifact> {
        self.calls.lock().unwrap().push(RenderCall::Export {
            instructions: instructions.clone(),
            format,
            base_name: base_name.to_string(),
        });
        if self.fail_exports {
            return Err(AppError::Render("canvas unavailable".into()));
        }
        Ok(Artifact::new(base_name, format, b"artifact".to_vec()))
    }
}

/// What the scripted verifier answers.
#[derive(Debug, Clone, Copy)]
pub enum Verdict {
    Paid,
    Unpaid,
    Unreachable,
}

/// Verifier with a fixed answer that records the references it saw.
pub struct ScriptedVerifier {
    verdict: Verdict,
    pub seen: Mutex<Vec<String>>,
}

impl ScriptedVerifier {
    pub fn new(verdict: Verdict) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl PaymentVerifier for ScriptedVerifier {
    fn verify<'a>(&'a self, reference: &'a str) -> BoxFuture<'a, Result<bool>> {
        self.seen.lock().unwrap().push(reference.to_string());
        let verdict = self.verdict;
        Box::pin(async move {
            match verdict {
                Verdict::Paid => Ok(true),
                Verdict::Unpaid => Ok(false),
                Verdict::Unreachable => Err(AppError::Verification("connection refused".into())),
            }
        })
    }
}

pub fn test_options() -> StudioOptions {
    StudioOptions {
        app_base_url: Url::parse(APP_BASE).unwrap(),
        payment_url: Url::parse(PAYMENT_URL).unwrap(),
    }
}

pub fn test_storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

/// Everything a studio test needs to poke at after the fact.
pub struct Harness {
    pub studio: Studio,
    pub storage: Arc<MemoryStorage>,
    pub renderer: RecordingRenderer,
    pub verifier: Arc<ScriptedVerifier>,
}

pub fn studio_with(storage: Arc<MemoryStorage>, renderer: RecordingRenderer, verdict: Verdict) -> Harness {
    let verifier = ScriptedVerifier::new(verdict);
    let studio = Studio::new(
        storage.clone(),
        Box::new(renderer.clone()),
        verifier.clone(),
        test_options(),
    );
    Harness {
        studio,
        storage,
        renderer,
        verifier,
    }
}

pub fn test_studio(verdict: Verdict) -> Harness {
    studio_with(test_storage(), RecordingRenderer::new(), verdict)
}

pub fn test_logo() -> ImageRef {
    ImageRef::from_data_url(LOGO_DATA_URL).unwrap()
}

/// Plain design with no premium features.
pub fn plain_config() -> StyleConfig {
    StyleConfig::new("https://shop.example/menu")
}

/// Design using both the logo and a gradient.
pub fn premium_config() -> StyleConfig {
    plain_config()
        .with_logo(test_logo())
        .with_gradient("#ff0000", "#0000ff")
}

/// Marks the storage as entitled, as if a previous session paid.
pub fn pre_entitle(storage: &MemoryStorage) {
    storage.set(keys::ENTITLEMENT_GRANTED, "true").unwrap();
}
