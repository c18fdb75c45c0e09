//! # Project Settings and Overrides
//!
//! User-editable configuration that survives between sessions:
//!
//! ```text
//! SettingsSnapshot (what the store persists)
//! ├── project_settings: ProjectSettings (currency, wall height, brick size)
//! ├── custom_rates:      material id -> unit rate
//! └── custom_quantities: material id -> total project quantity
//! ```
//!
//! Both override maps are sparse. An absent key means "use the catalog rate"
//! or "use the calculated quantity"; there is no sentinel value.
//!
//! ## Example
//!
//! ```rust
//! use boq_core::project::{Overrides, ProjectSettings};
//!
//! let settings = ProjectSettings::default();
//! assert_eq!(settings.currency, "INR");
//! assert_eq!(settings.wall_height_m, 3.0);
//!
//! let mut overrides = Overrides::default();
//! overrides.set_rate("cement", 420.0);
//! assert_eq!(overrides.rate("cement"), Some(420.0));
//! assert_eq!(overrides.rate("steel"), None);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{EstimateError, EstimateResult};

/// Brick module the walls are laid in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrickSize {
    /// Traditional 230 × 115 × 75 mm
    #[default]
    Standard,
    /// Modular 190 × 90 × 90 mm
    Modular,
}

impl std::str::FromStr for BrickSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(BrickSize::Standard),
            "modular" => Ok(BrickSize::Modular),
            other => Err(format!("unknown brick size '{other}' (expected standard or modular)")),
        }
    }
}

/// Per-user project settings. Fields missing from a stored record take
/// their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettings {
    /// ISO currency code used for display (e.g., "INR")
    pub currency: String,

    /// Floor-to-ceiling wall height in metres
    pub wall_height_m: f64,

    /// Brick module
    pub brick_size: BrickSize,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        ProjectSettings {
            currency: "INR".to_string(),
            wall_height_m: 3.0,
            brick_size: BrickSize::Standard,
        }
    }
}

impl ProjectSettings {
    /// Check the fields a user can type into.
    pub fn validate(&self) -> EstimateResult<()> {
        if !(self.wall_height_m.is_finite() && self.wall_height_m > 0.0) {
            return Err(EstimateError::invalid_input(
                "wall_height_m",
                self.wall_height_m.to_string(),
                "Wall height must be a positive number of metres",
            ));
        }
        if self.wall_height_m > 20.0 {
            return Err(EstimateError::invalid_input(
                "wall_height_m",
                self.wall_height_m.to_string(),
                "Wall height exceeds 20 m - check the unit",
            ));
        }
        let code = self.currency.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(EstimateError::invalid_input(
                "currency",
                &self.currency,
                "Currency must be a three-letter ISO code",
            ));
        }
        Ok(())
    }
}

/// Sparse user overrides, keyed by material id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overrides {
    #[serde(default)]
    pub custom_rates: BTreeMap<String, f64>,

    /// Project-wide quantity per material id (not per room)
    #[serde(default)]
    pub custom_quantities: BTreeMap<String, f64>,
}

impl Overrides {
    pub fn rate(&self, id: &str) -> Option<f64> {
        self.custom_rates.get(id).copied()
    }

    pub fn quantity(&self, id: &str) -> Option<f64> {
        self.custom_quantities.get(id).copied()
    }

    pub fn set_rate(&mut self, id: impl Into<String>, rate: f64) {
        self.custom_rates.insert(id.into(), rate);
    }

    pub fn set_quantity(&mut self, id: impl Into<String>, quantity: f64) {
        self.custom_quantities.insert(id.into(), quantity);
    }

    /// Remove a rate override; returns the old value
    pub fn clear_rate(&mut self, id: &str) -> Option<f64> {
        self.custom_rates.remove(id)
    }

    /// Remove a quantity override; returns the old value
    pub fn clear_quantity(&mut self, id: &str) -> Option<f64> {
        self.custom_quantities.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.custom_rates.is_empty() && self.custom_quantities.is_empty()
    }

    /// Layer `other` on top of `self`; keys in `other` win
    pub fn merged_with(&self, other: &Overrides) -> Overrides {
        let mut merged = self.clone();
        merged
            .custom_rates
            .extend(other.custom_rates.iter().map(|(k, v)| (k.clone(), *v)));
        merged
            .custom_quantities
            .extend(other.custom_quantities.iter().map(|(k, v)| (k.clone(), *v)));
        merged
    }
}

/// Parse a `material_id=value` pair as typed on a command line.
pub fn parse_override(text: &str) -> EstimateResult<(String, f64)> {
    let (id, value) = text.split_once('=').ok_or_else(|| {
        EstimateError::invalid_input("override", text, "Expected the form material_id=value")
    })?;
    let id = id.trim();
    if id.is_empty() {
        return Err(EstimateError::invalid_input("override", text, "Material id is empty"));
    }
    let value: f64 = value.trim().parse().map_err(|_| {
        EstimateError::invalid_input("override", text, "Value is not a number")
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(EstimateError::invalid_input(
            "override",
            text,
            "Value must be a non-negative number",
        ));
    }
    Ok((id.to_string(), value))
}

/// What the persistence collaborator hands back and accepts.
///
/// Every field is optional: a partially filled record only replaces the
/// fields it carries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_settings: Option<ProjectSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rates: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_quantities: Option<BTreeMap<String, f64>>,
}

impl SettingsSnapshot {
    /// Snapshot of the full current state, for saving
    pub fn capture(settings: &ProjectSettings, overrides: &Overrides) -> Self {
        SettingsSnapshot {
            project_settings: Some(settings.clone()),
            custom_rates: Some(overrides.custom_rates.clone()),
            custom_quantities: Some(overrides.custom_quantities.clone()),
        }
    }

    /// Apply the fields present in this snapshot onto in-memory state.
    pub fn apply_to(&self, settings: &mut ProjectSettings, overrides: &mut Overrides) {
        if let Some(s) = &self.project_settings {
            *settings = s.clone();
        }
        if let Some(rates) = &self.custom_rates {
            overrides.custom_rates = rates.clone();
        }
        if let Some(quantities) = &self.custom_quantities {
            overrides.custom_quantities = quantities.clone();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.project_settings.is_none()
            && self.custom_rates.is_none()
            && self.custom_quantities.is_none()
    }
}
