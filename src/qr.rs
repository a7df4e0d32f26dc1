//! Built-in rendering collaborator.
//!
//! Encodes the payload with `qrcode` and draws the module grid itself so
//! that per-element colors, the dot gradient and the embedded image can be
//! honored. Shapes are approximated by a corner radius per module.
//! Unparsable colors fall back to black on white in PNG output and are
//! written verbatim into SVG.

use std::fmt::Write as _;
use std::io::Cursor;

use image::{imageops, Rgba, RgbaImage};
use qrcode::{EcLevel, QrCode};

use crate::error::{AppError, Result};
use crate::features::ExportFormat;
use crate::models::{Color, CornerDotStyle, CornerSquareStyle, DotStyle};
use crate::render::{Artifact, Fill, QrRenderer, RenderInstructions};

/// Modules of light border drawn around the symbol.
const QUIET_ZONE: usize = 2;
const FINDER: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleKind {
    Dot,
    CornerSquare,
    CornerDot,
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: f32,
    y: f32,
    side: f32,
}

impl Rect {
    fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.side && y < self.y + self.side
    }

    fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.side
            && other.x < self.x + self.side
            && self.y < other.y + other.side
            && other.y < self.y + self.side
    }
}

/// Module grid placed on the canvas.
struct Layout {
    size: u32,
    modules: usize,
    dark: Vec<bool>,
    cell: f32,
    /// Area kept free of dots for the embedded image (image plus margin).
    clear_zone: Option<Rect>,
    image_box: Option<Rect>,
}

impl Layout {
    fn new(instructions: &RenderInstructions) -> Result<Self> {
        let code = QrCode::with_error_correction_level(instructions.data.as_bytes(), EcLevel::H)
            .map_err(|e| AppError::Render(format!("Cannot encode payload: {}", e)))?;

        let modules = code.width();
        let dark = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();

        let size = instructions.width.min(instructions.height);
        let cell = size as f32 / (modules + 2 * QUIET_ZONE) as f32;

        let (clear_zone, image_box) = if instructions.image.is_some() {
            let symbol = cell * modules as f32;
            let side = symbol * instructions.image_options.image_size;
            let origin = (size as f32 - side) / 2.0;
            let margin = instructions.image_options.margin as f32;
            (
                Some(Rect {
                    x: origin - margin,
                    y: origin - margin,
                    side: side + 2.0 * margin,
                }),
                Some(Rect { x: origin, y: origin, side }),
            )
        } else {
            (None, None)
        };

        Ok(Self {
            size,
            modules,
            dark,
            cell,
            clear_zone,
            image_box,
        })
    }

    fn kind(&self, col: usize, row: usize) -> ModuleKind {
        let n = self.modules;
        let origins = [(0, 0), (n - FINDER, 0), (0, n - FINDER)];
        for (ox, oy) in origins {
            if (ox..ox + FINDER).contains(&col) && (oy..oy + FINDER).contains(&row) {
                let (dx, dy) = (col - ox, row - oy);
                return if (2..=4).contains(&dx) && (2..=4).contains(&dy) {
                    ModuleKind::CornerDot
                } else {
                    ModuleKind::CornerSquare
                };
            }
        }
        ModuleKind::Dot
    }

    fn cell_rect(&self, col: usize, row: usize) -> Rect {
        Rect {
            x: (col + QUIET_ZONE) as f32 * self.cell,
            y: (row + QUIET_ZONE) as f32 * self.cell,
            side: self.cell,
        }
    }

    /// Dark modules to draw, with their kind and placement.
    fn visible(&self) -> impl Iterator<Item = (ModuleKind, Rect)> + '_ {
        (0..self.modules).flat_map(move |row| {
            (0..self.modules).filter_map(move |col| {
                if !self.dark[row * self.modules + col] {
                    return None;
                }
                let kind = self.kind(col, row);
                let rect = self.cell_rect(col, row);
                if kind == ModuleKind::Dot && self.clear_zone.is_some_and(|z| z.overlaps(&rect)) {
                    return None;
                }
                Some((kind, rect))
            })
        })
    }
}

fn dot_radius(style: DotStyle) -> f32 {
    match style {
        DotStyle::Square => 0.0,
        DotStyle::Classy => 0.15,
        DotStyle::Rounded => 0.25,
        DotStyle::ClassyRounded => 0.3,
        DotStyle::ExtraRounded => 0.4,
        DotStyle::Dots => 0.5,
    }
}

fn corner_square_radius(style: CornerSquareStyle) -> f32 {
    match style {
        CornerSquareStyle::Square => 0.0,
        CornerSquareStyle::ExtraRounded => 0.4,
        CornerSquareStyle::Dot => 0.5,
    }
}

fn corner_dot_radius(style: CornerDotStyle) -> f32 {
    match style {
        CornerDotStyle::Square => 0.0,
        CornerDotStyle::Dot => 0.5,
    }
}

fn radius_for(kind: ModuleKind, instructions: &RenderInstructions) -> f32 {
    match kind {
        ModuleKind::Dot => dot_radius(instructions.dots_options.style),
        ModuleKind::CornerSquare => corner_square_radius(instructions.corners_square_options.style),
        ModuleKind::CornerDot => corner_dot_radius(instructions.corners_dot_options.style),
    }
}

/// `#rgb` or `#rrggbb`.
fn parse_hex(color: &Color) -> Option<Rgba<u8>> {
    let hex = color.as_str().trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let expand = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 => Some(Rgba([
            expand(&hex[0..2])?,
            expand(&hex[2..4])?,
            expand(&hex[4..6])?,
            255,
        ])),
        _ => None,
    }
}

fn lerp(a: Rgba<u8>, b: Rgba<u8>, t: f32) -> Rgba<u8> {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Rgba([mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]), 255])
}

fn inside_rounded(px: f32, py: f32, rect: &Rect, radius_ratio: f32) -> bool {
    if !rect.contains(px, py) {
        return false;
    }
    let r = rect.side * radius_ratio;
    if r <= 0.0 {
        return true;
    }
    let cx = px.max(rect.x + r).min(rect.x + rect.side - r);
    let cy = py.max(rect.y + r).min(rect.y + rect.side - r);
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= r * r
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn render_png(instructions: &RenderInstructions) -> Result<Vec<u8>> {
    let layout = Layout::new(instructions)?;
    let black = Rgba([0, 0, 0, 255]);
    let white = Rgba([255, 255, 255, 255]);

    let background = parse_hex(&instructions.background_options.color).unwrap_or(white);
    let mut canvas = RgbaImage::from_pixel(layout.size, layout.size, background);

    let dot_fill: Box<dyn Fn(f32, f32) -> Rgba<u8>> = match &instructions.dots_options.fill {
        Fill::Solid { color } => {
            let c = parse_hex(color).unwrap_or(black);
            Box::new(move |_, _| c)
        }
        Fill::Gradient { gradient } => {
            let from = parse_hex(&gradient.color_stops[0].color).unwrap_or(black);
            let to = parse_hex(&gradient.color_stops[1].color).unwrap_or(black);
            let span = 2.0 * layout.size as f32;
            Box::new(move |x, y| lerp(from, to, ((x + y) / span).clamp(0.0, 1.0)))
        }
    };
    let corner_square = parse_hex(&instructions.corners_square_options.color).unwrap_or(black);
    let corner_dot = parse_hex(&instructions.corners_dot_options.color).unwrap_or(black);

    for (kind, rect) in layout.visible() {
        let radius = radius_for(kind, instructions);
        let x0 = rect.x.floor() as u32;
        let y0 = rect.y.floor() as u32;
        let x1 = ((rect.x + rect.side).ceil() as u32).min(layout.size);
        let y1 = ((rect.y + rect.side).ceil() as u32).min(layout.size);

        for py in y0..y1 {
            for px in x0..x1 {
                let (fx, fy) = (px as f32 + 0.5, py as f32 + 0.5);
                if !inside_rounded(fx, fy, &rect, radius) {
                    continue;
                }
                let color = match kind {
                    ModuleKind::Dot => dot_fill(fx, fy),
                    ModuleKind::CornerSquare => corner_square,
                    ModuleKind::CornerDot => corner_dot,
                };
                canvas.put_pixel(px, py, color);
            }
        }
    }

    if let (Some(image), Some(bounds)) = (&instructions.image, layout.image_box) {
        let bytes = image
            .decode()
            .ok_or_else(|| AppError::Render("Embedded image is not a base64 data URL".into()))?;
        let logo = image::load_from_memory(&bytes)
            .map_err(|e| AppError::Render(format!("Cannot decode embedded image: {}", e)))?
            .to_rgba8();

        let side = bounds.side.max(1.0);
        let scale = (side / logo.width() as f32).min(side / logo.height() as f32);
        let w = ((logo.width() as f32 * scale).round() as u32).max(1);
        let h = ((logo.height() as f32 * scale).round() as u32).max(1);
        let resized = imageops::resize(&logo, w, h, imageops::FilterType::Triangle);

        let x = bounds.x + (side - w as f32) / 2.0;
        let y = bounds.y + (side - h as f32) / 2.0;
        imageops::overlay(&mut canvas, &resized, x.round() as i64, y.round() as i64);
    }

    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| AppError::Render(format!("PNG encoding failed: {}", e)))?;
    Ok(bytes)
}

fn render_svg(instructions: &RenderInstructions) -> Result<String> {
    let layout = Layout::new(instructions)?;
    let size = layout.size;
    let mut svg = String::new();

    // Writing to a String cannot fail.
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {size} {size}">"#
    );

    let dot_fill = match &instructions.dots_options.fill {
        Fill::Solid { color } => escape_attr(color.as_str()),
        Fill::Gradient { gradient } => {
            let _ = write!(
                svg,
                r#"<defs><linearGradient id="dots-gradient" gradientUnits="userSpaceOnUse" x1="0" y1="0" x2="{size}" y2="{size}">"#
            );
            for stop in &gradient.color_stops {
                let _ = write!(
                    svg,
                    r#"<stop offset="{}" stop-color="{}"/>"#,
                    stop.offset,
                    escape_attr(stop.color.as_str())
                );
            }
            svg.push_str("</linearGradient></defs>");
            "url(#dots-gradient)".to_string()
        }
    };

    let _ = write!(
        svg,
        r#"<rect width="{size}" height="{size}" fill="{}"/>"#,
        escape_attr(instructions.background_options.color.as_str())
    );

    let corner_square = escape_attr(instructions.corners_square_options.color.as_str());
    let corner_dot = escape_attr(instructions.corners_dot_options.color.as_str());

    for (kind, rect) in layout.visible() {
        let fill = match kind {
            ModuleKind::Dot => &dot_fill,
            ModuleKind::CornerSquare => &corner_square,
            ModuleKind::CornerDot => &corner_dot,
        };
        let rx = rect.side * radius_for(kind, instructions);
        let _ = write!(
            svg,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}"/>"#,
            rect.x, rect.y, rect.side, rect.side, rx, fill
        );
    }

    if let (Some(image), Some(bounds)) = (&instructions.image, layout.image_box) {
        let _ = write!(
            svg,
            r#"<image href="{}" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" preserveAspectRatio="xMidYMid meet"/>"#,
            escape_attr(image.as_str()),
            bounds.x,
            bounds.y,
            bounds.side,
            bounds.side
        );
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// Draws instructions as PNG or SVG. The preview is kept in memory as SVG.
#[derive(Debug, Default)]
pub struct ModuleRenderer {
    preview: Option<String>,
}

impl ModuleRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// SVG markup of the last preview draw.
    pub fn preview_svg(&self) -> Option<&str> {
        self.preview.as_deref()
    }
}

impl QrRenderer for ModuleRenderer {
    fn attach(&mut self, instructions: &RenderInstructions) -> Result<()> {
        self.preview = Some(render_svg(instructions)?);
        Ok(())
    }

    fn export(
        &mut self,
        instructions: &RenderInstructions,
        format: ExportFormat,
        base_name: &str,
    ) -> Result<Artifact> {
        let bytes = match format {
            ExportFormat::Raster => render_png(instructions)?,
            ExportFormat::Vector => render_svg(instructions)?.into_bytes(),
        };
        Ok(Artifact::new(base_name, format, bytes))
    }
}
