//! Display metadata per canonical category.

use crate::taxonomy::CanonicalCategory;

/// Name, icon and color shown for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollutionInfo {
    pub name: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

impl PollutionInfo {
    /// Look up display metadata for a category.
    pub fn for_category(category: CanonicalCategory) -> Self {
        let (name, icon, color) = match category {
            CanonicalCategory::Plastic => ("Plastic Pollution", "🥤", "#ef4444"),
            CanonicalCategory::OilSpill => ("Oil Spill", "🛢️", "#1f2937"),
            CanonicalCategory::MarineDebris => ("Marine Debris", "⚓", "#0ea5e9"),
            CanonicalCategory::OtherSolidWaste => ("Solid Waste", "🗑️", "#92400e"),
            CanonicalCategory::NoWaste => ("Clean Water", "💧", "#3b82f6"),
        };
        Self { name, icon, color }
    }

    /// Look up display metadata for a wire label; unknown labels get the
    /// `other_solid_waste` entry.
    pub fn for_label(label: &str) -> Self {
        let category = CanonicalCategory::parse(label).unwrap_or(CanonicalCategory::OtherSolidWaste);
        Self::for_category(category)
    }
}
