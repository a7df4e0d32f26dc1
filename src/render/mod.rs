//! Translation of a [`StyleConfig`] into rendering instructions, and the
//! rendering collaborator seam.
//!
//! [`map`] is the only place gating is applied to styling. The preview and
//! export call sites differ only in the `include_gated` flag and the
//! [`RenderTarget`].

mod export;
mod preview;

pub use export::*;
pub use preview::*;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Result;
use crate::features::ExportFormat;
use crate::models::{Color, CornerDotStyle, CornerSquareStyle, DotStyle, ImageRef, StyleConfig};

pub const PREVIEW_SIZE: u32 = 280;
pub const EXPORT_SIZE: u32 = 1024;
/// Embedded image size relative to the symbol.
pub const IMAGE_SIZE_RATIO: f32 = 0.4;
pub const GRADIENT_ROTATION: u16 = 45;

/// Which surface the instructions are for. Only size and image margin differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    Preview,
    Export,
}

impl RenderTarget {
    pub fn size(self) -> u32 {
        match self {
            RenderTarget::Preview => PREVIEW_SIZE,
            RenderTarget::Export => EXPORT_SIZE,
        }
    }

    pub fn image_margin(self) -> u32 {
        match self {
            RenderTarget::Preview => 10,
            RenderTarget::Export => 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorStop {
    pub offset: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearGradient {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub rotation: u16,
    pub color_stops: [ColorStop; 2],
}

impl LinearGradient {
    fn between(first: &Color, second: &Color) -> Self {
        Self {
            kind: "linear",
            rotation: GRADIENT_ROTATION,
            color_stops: [
                ColorStop { offset: 0.0, color: first.clone() },
                ColorStop { offset: 1.0, color: second.clone() },
            ],
        }
    }
}

/// Dot fill: a flat color or a gradient across the whole symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fill {
    Solid { color: Color },
    Gradient { gradient: LinearGradient },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DotsOptions {
    #[serde(rename = "type")]
    pub style: DotStyle,
    #[serde(flatten)]
    pub fill: Fill,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackgroundOptions {
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CornerOptions<S> {
    #[serde(rename = "type")]
    pub style: S,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOptions {
    pub cross_origin: &'static str,
    pub margin: u32,
    pub image_size: f32,
}

/// Gating-applied parameters for the rendering collaborator. Field names
/// follow the browser rendering library so the JSON form can be handed over
/// as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderInstructions {
    pub width: u32,
    pub height: u32,
    pub data: String,
    pub dots_options: DotsOptions,
    pub background_options: BackgroundOptions,
    pub corners_square_options: CornerOptions<CornerSquareStyle>,
    pub corners_dot_options: CornerOptions<CornerDotStyle>,
    pub image_options: ImageOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

impl RenderInstructions {
    pub fn gradient(&self) -> Option<&LinearGradient> {
        match &self.dots_options.fill {
            Fill::Gradient { gradient } => Some(gradient),
            Fill::Solid { .. } => None,
        }
    }

    pub fn gradient_enabled(&self) -> bool {
        self.gradient().is_some()
    }
}

/// Maps a design to rendering instructions.
///
/// With `include_gated == false` the logo and gradient are dropped whatever
/// the config says; colors and shapes always apply. Never fails: colors are
/// handed through as entered.
pub fn map(config: &StyleConfig, include_gated: bool, target: RenderTarget) -> RenderInstructions {
    let gradient = config.gradient();

    let (fill, corner_square_color, corner_dot_color) = if include_gated && gradient.enabled {
        let [first, second] = &gradient.stops;
        (
            Fill::Gradient {
                gradient: LinearGradient::between(first, second),
            },
            first.clone(),
            second.clone(),
        )
    } else {
        let fg = config.foreground();
        (Fill::Solid { color: fg.clone() }, fg.clone(), fg.clone())
    };

    let image = if include_gated {
        config.logo().cloned()
    } else {
        None
    };

    let shape = config.shape();
    let size = target.size();

    RenderInstructions {
        width: size,
        height: size,
        data: config.content().to_string(),
        dots_options: DotsOptions {
            style: shape.dot,
            fill,
        },
        background_options: BackgroundOptions {
            color: config.background().clone(),
        },
        corners_square_options: CornerOptions {
            style: shape.corner_square,
            color: corner_square_color,
        },
        corners_dot_options: CornerOptions {
            style: shape.corner_dot,
            color: corner_dot_color,
        },
        image_options: ImageOptions {
            cross_origin: "anonymous",
            margin: target.image_margin(),
            image_size: IMAGE_SIZE_RATIO,
        },
        image,
    }
}

/// A downloadable file produced by the rendering collaborator.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(base_name: &str, format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("{}.{}", base_name, format.extension()),
            format,
            bytes,
        }
    }

    /// Writes the artifact into `dir` and returns the full path.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// The external QR drawing engine.
///
/// `attach` draws onto the live, non-downloadable preview surface; `export`
/// produces a file. Implementations own their drawing algorithm entirely.
pub trait QrRenderer: Send {
    fn attach(&mut self, instructions: &RenderInstructions) -> Result<()>;

    fn export(
        &mut self,
        instructions: &RenderInstructions,
        format: ExportFormat,
        base_name: &str,
    ) -> Result<Artifact>;
}
