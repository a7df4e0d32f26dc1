use crate::error::Result;
use crate::models::StyleConfig;

use super::{map, QrRenderer, RenderInstructions, RenderTarget};

/// Keeps the live preview in sync with the design.
///
/// The preview always shows gated features; only downloads are gated.
#[derive(Debug, Default)]
pub struct PreviewRenderer {
    current: Option<RenderInstructions>,
    redraws: u64,
}

impl PreviewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-maps `config` and hands it to the renderer. Called after every
    /// mutation of the design.
    pub fn redraw(&mut self, renderer: &mut dyn QrRenderer, config: &StyleConfig) -> Result<()> {
        let instructions = map(config, true, RenderTarget::Preview);
        renderer.attach(&instructions)?;
        self.redraws += 1;
        tracing::debug!(redraws = self.redraws, "Preview redrawn");
        self.current = Some(instructions);
        Ok(())
    }

    /// Instructions currently on screen, if a redraw has succeeded.
    pub fn current(&self) -> Option<&RenderInstructions> {
        self.current.as_ref()
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }
}
