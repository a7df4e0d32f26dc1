//! Premium feature classification.
//!
//! The gated set is a closed enum: adding a variant forces every match in
//! [`FeatureTag::is_requested`] and [`FeatureTag::label`] to be revisited.
//! Dot and corner shapes are deliberately absent; shape styling is free.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::models::StyleConfig;

/// Output kind of an export.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    #[strum(to_string = "raster", serialize = "png")]
    Raster,
    #[strum(to_string = "vector", serialize = "svg")]
    Vector,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Raster => "png",
            ExportFormat::Vector => "svg",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FeatureTag {
    LogoEmbed,
    Gradient,
    VectorExport,
}

impl FeatureTag {
    /// Text shown to the user in the paywall.
    pub fn label(self) -> &'static str {
        match self {
            FeatureTag::LogoEmbed => "Custom logo in QR code",
            FeatureTag::Gradient => "Gradient colors",
            FeatureTag::VectorExport => "SVG vector export",
        }
    }

    fn is_requested(self, config: &StyleConfig, format: ExportFormat) -> bool {
        match self {
            FeatureTag::LogoEmbed => config.logo().is_some(),
            FeatureTag::Gradient => config.gradient().enabled,
            FeatureTag::VectorExport => format == ExportFormat::Vector,
        }
    }
}

/// Gated features in use, ordered as declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeSet<FeatureTag>);

impl FeatureSet {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, tag: FeatureTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureTag> + '_ {
        self.0.iter().copied()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.iter().map(FeatureTag::label).collect()
    }
}

impl FromIterator<FeatureTag> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureTag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[FeatureTag; N]> for FeatureSet {
    fn from(tags: [FeatureTag; N]) -> Self {
        tags.into_iter().collect()
    }
}

/// Gated features a design would use when exported as `format`.
pub fn classify(config: &StyleConfig, format: ExportFormat) -> FeatureSet {
    FeatureTag::iter()
        .filter(|tag| tag.is_requested(config, format))
        .collect()
}
