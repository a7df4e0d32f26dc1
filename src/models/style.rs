//! The design state of one QR code.
//!
//! A [`StyleConfig`] is always fully defined: every constructor, setter and
//! the deserializer substitute defaults up front, so downstream code (the
//! render mapper in particular) never has to.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumString};

pub const DEFAULT_CONTENT: &str = "https://example.com";
pub const DEFAULT_FOREGROUND: &str = "#000000";
pub const DEFAULT_BACKGROUND: &str = "#ffffff";
pub const DEFAULT_GRADIENT_STOPS: [&str; 2] = ["#6366f1", "#ec4899"];

/// A color as entered by the user. Never empty; otherwise unvalidated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Returns `None` for empty (or whitespace-only) input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Like [`Color::new`], substituting `fallback` for empty input.
    pub fn or(value: impl Into<String>, fallback: &str) -> Self {
        Self::new(value).unwrap_or_else(|| Self(fallback.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An embedded image held as a `data:` URL.
///
/// Clones share the same allocation; [`ImageRef::ptr_eq`] tells whether two
/// references are the same blob, `==` compares contents.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageRef(Arc<str>);

impl ImageRef {
    pub fn from_data_url(url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return None;
        }
        Some(Self(Arc::from(url)))
    }

    /// Encodes raw image bytes as a base64 data URL.
    pub fn from_bytes(bytes: &[u8], mime: &str) -> Self {
        Self(Arc::from(format!("data:{};base64,{}", mime, BASE64.encode(bytes))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn ptr_eq(&self, other: &ImageRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Decodes the payload of a base64 data URL. `None` for anything else.
    pub fn decode(&self) -> Option<Vec<u8>> {
        let rest = self.0.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        if !meta.ends_with(";base64") {
            return None;
        }
        BASE64.decode(payload.trim()).ok()
    }
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0.chars().take(24).collect();
        write!(f, "ImageRef({}… {} bytes)", head, self.0.len())
    }
}

impl Serialize for ImageRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        ImageRef::from_data_url(value).ok_or_else(|| serde::de::Error::custom("empty image"))
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DotStyle {
    Square,
    #[default]
    Rounded,
    Dots,
    Classy,
    ClassyRounded,
    ExtraRounded,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CornerSquareStyle {
    Square,
    #[default]
    ExtraRounded,
    Dot,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CornerDotStyle {
    Square,
    #[default]
    Dot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Shape {
    pub dot: DotStyle,
    pub corner_square: CornerSquareStyle,
    pub corner_dot: CornerDotStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gradient {
    pub enabled: bool,
    pub stops: [Color; 2],
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            enabled: false,
            stops: DEFAULT_GRADIENT_STOPS.map(|c| Color(c.to_string())),
        }
    }
}

/// Complete description of one QR design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StyleConfigRecord")]
pub struct StyleConfig {
    content: String,
    foreground: Color,
    background: Color,
    gradient: Gradient,
    #[serde(skip_serializing_if = "Option::is_none")]
    logo: Option<ImageRef>,
    shape: Shape,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            content: DEFAULT_CONTENT.to_string(),
            foreground: Color(DEFAULT_FOREGROUND.to_string()),
            background: Color(DEFAULT_BACKGROUND.to_string()),
            gradient: Gradient::default(),
            logo: None,
            shape: Shape::default(),
        }
    }
}

impl StyleConfig {
    pub fn new(content: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.set_content(content);
        config
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn foreground(&self) -> &Color {
        &self.foreground
    }

    pub fn background(&self) -> &Color {
        &self.background
    }

    pub fn gradient(&self) -> &Gradient {
        &self.gradient
    }

    pub fn logo(&self) -> Option<&ImageRef> {
        self.logo.as_ref()
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.content = if content.is_empty() {
            DEFAULT_CONTENT.to_string()
        } else {
            content
        };
    }

    pub fn set_foreground(&mut self, color: impl Into<String>) {
        self.foreground = Color::or(color, DEFAULT_FOREGROUND);
    }

    pub fn set_background(&mut self, color: impl Into<String>) {
        self.background = Color::or(color, DEFAULT_BACKGROUND);
    }

    pub fn set_gradient_enabled(&mut self, enabled: bool) {
        self.gradient.enabled = enabled;
    }

    pub fn set_gradient_stops(&mut self, first: impl Into<String>, second: impl Into<String>) {
        self.gradient.stops = [
            Color::or(first, DEFAULT_GRADIENT_STOPS[0]),
            Color::or(second, DEFAULT_GRADIENT_STOPS[1]),
        ];
    }

    pub fn set_logo(&mut self, logo: Option<ImageRef>) {
        self.logo = logo;
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    pub fn with_logo(mut self, logo: ImageRef) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn with_gradient(mut self, first: &str, second: &str) -> Self {
        self.set_gradient_stops(first, second);
        self.gradient.enabled = true;
        self
    }
}

/// Wire form accepted when reading a config back. Every field is optional,
/// and the flat keys written by earlier versions of the page are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StyleConfigRecord {
    #[serde(alias = "url")]
    content: Option<String>,
    #[serde(alias = "fgColor")]
    foreground: Option<String>,
    #[serde(alias = "bgColor")]
    background: Option<String>,
    gradient: Option<GradientRecord>,
    use_gradient: Option<bool>,
    gradient_color1: Option<String>,
    gradient_color2: Option<String>,
    logo: Option<String>,
    shape: Option<Shape>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GradientRecord {
    enabled: bool,
    stops: Vec<String>,
}

impl From<StyleConfigRecord> for StyleConfig {
    fn from(record: StyleConfigRecord) -> Self {
        let mut config = StyleConfig::default();

        config.set_content(record.content.unwrap_or_default());
        config.set_foreground(record.foreground.unwrap_or_default());
        config.set_background(record.background.unwrap_or_default());

        let (enabled, mut stops) = match record.gradient {
            Some(g) => (g.enabled, g.stops.into_iter()),
            None => (
                record.use_gradient.unwrap_or(false),
                vec![
                    record.gradient_color1.unwrap_or_default(),
                    record.gradient_color2.unwrap_or_default(),
                ]
                .into_iter(),
            ),
        };
        config.set_gradient_stops(stops.next().unwrap_or_default(), stops.next().unwrap_or_default());
        config.set_gradient_enabled(enabled);

        config.set_logo(record.logo.and_then(ImageRef::from_data_url));
        config.set_shape(record.shape.unwrap_or_default());
        config
    }
}
