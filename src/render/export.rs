use crate::features::ExportFormat;
use crate::models::StyleConfig;

use super::{map, Artifact, QrRenderer, RenderTarget};

/// Result of one export. A collaborator failure means no file, never a retry.
#[derive(Debug)]
pub enum ExportOutcome {
    Produced(Artifact),
    Failed { reason: String },
}

impl ExportOutcome {
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            ExportOutcome::Produced(artifact) => Some(artifact),
            ExportOutcome::Failed { .. } => None,
        }
    }
}

/// File base name for an export.
pub fn export_base_name(include_gated: bool) -> &'static str {
    if include_gated { "qr-code-pro" } else { "qr-code" }
}

/// Produces download artifacts at export resolution. Reads the design, never
/// writes it.
pub struct ExportRenderer;

impl ExportRenderer {
    pub fn export(
        renderer: &mut dyn QrRenderer,
        config: &StyleConfig,
        format: ExportFormat,
        include_gated: bool,
    ) -> ExportOutcome {
        let instructions = map(config, include_gated, RenderTarget::Export);
        let base_name = export_base_name(include_gated);

        match renderer.export(&instructions, format, base_name) {
            Ok(artifact) => {
                tracing::info!(
                    "Exported {} ({} bytes, include_gated={})",
                    artifact.file_name,
                    artifact.bytes.len(),
                    include_gated
                );
                ExportOutcome::Produced(artifact)
            }
            Err(e) => {
                tracing::warn!("Export failed: {}", e);
                ExportOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
