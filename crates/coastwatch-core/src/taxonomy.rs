//! Unified pollution taxonomy.
//!
//! Each backend speaks its own, more granular label vocabulary. Every label a
//! backend can emit is a [`RawLabel`] variant, and [`RawLabel::canonical`] is a
//! total `match` onto the coarse [`CanonicalCategory`] set the rest of the
//! system understands. Adding a raw label without a mapping is a compile error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Coarse pollution categories shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalCategory {
    Plastic,
    OilSpill,
    MarineDebris,
    OtherSolidWaste,
    NoWaste,
}

impl CanonicalCategory {
    /// All categories in a stable order.
    pub const ALL: [CanonicalCategory; 5] = [
        Self::Plastic,
        Self::OilSpill,
        Self::MarineDebris,
        Self::OtherSolidWaste,
        Self::NoWaste,
    ];

    /// The snake_case label used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plastic => "plastic",
            Self::OilSpill => "oil_spill",
            Self::MarineDebris => "marine_debris",
            Self::OtherSolidWaste => "other_solid_waste",
            Self::NoWaste => "no_waste",
        }
    }

    /// Parse a wire label. Returns `None` for anything outside the set.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for CanonicalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every raw label a classification backend may emit.
///
/// The grid model's head uses the first group, the zero-shot prompts the
/// short forms (`trash`, `clean`, `debris`, `oil`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawLabel {
    Cardboard,
    Glass,
    Metal,
    Paper,
    Trash,
    CleanWater,
    Clean,
    MarineTrash,
    Debris,
    OilSpill,
    Oil,
    Plastic,
}

impl RawLabel {
    pub const ALL: [RawLabel; 12] = [
        Self::Cardboard,
        Self::Glass,
        Self::Metal,
        Self::Paper,
        Self::Trash,
        Self::CleanWater,
        Self::Clean,
        Self::MarineTrash,
        Self::Debris,
        Self::OilSpill,
        Self::Oil,
        Self::Plastic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cardboard => "cardboard",
            Self::Glass => "glass",
            Self::Metal => "metal",
            Self::Paper => "paper",
            Self::Trash => "trash",
            Self::CleanWater => "clean_water",
            Self::Clean => "clean",
            Self::MarineTrash => "marine_trash",
            Self::Debris => "debris",
            Self::OilSpill => "oil_spill",
            Self::Oil => "oil",
            Self::Plastic => "plastic",
        }
    }

    /// The canonical category this label belongs to.
    pub fn canonical(self) -> CanonicalCategory {
        match self {
            Self::Cardboard | Self::Glass | Self::Metal | Self::Paper | Self::Trash => {
                CanonicalCategory::OtherSolidWaste
            }
            Self::CleanWater | Self::Clean => CanonicalCategory::NoWaste,
            Self::MarineTrash | Self::Debris => CanonicalCategory::MarineDebris,
            Self::OilSpill | Self::Oil => CanonicalCategory::OilSpill,
            Self::Plastic => CanonicalCategory::Plastic,
        }
    }
}

impl fmt::Display for RawLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known raw label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl FromStr for RawLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// Map a backend's raw label string onto the canonical taxonomy.
///
/// `backend` only feeds the error message; the table is the same for every
/// backend.
pub fn map_label(backend: &str, raw_label: &str) -> Result<CanonicalCategory, PipelineError> {
    raw_label
        .parse::<RawLabel>()
        .map(RawLabel::canonical)
        .map_err(|UnknownLabel(label)| PipelineError::UnmappedLabel {
            backend: backend.to_string(),
            label,
        })
}

/// Probability mass per canonical category.
///
/// Only backends that expose a full distribution produce these; the
/// clean-scene override needs them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoryScores([f32; 5]);

impl CategoryScores {
    /// Build from `(category, probability)` pairs. Repeated categories add up.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (CanonicalCategory, f32)>,
    {
        let mut scores = [0.0f32; 5];
        for (category, p) in pairs {
            scores[category.index()] += p;
        }
        Self(scores)
    }

    pub fn get(&self, category: CanonicalCategory) -> f32 {
        self.0[category.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalCategory, f32)> + '_ {
        CanonicalCategory::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}
