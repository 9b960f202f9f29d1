//! Resource type descriptors.
//!
//! A [`Resource`] describes a kind of quantity (gold, wood, energy): its
//! stable id, display metadata, and the bounds every pool amount of that
//! resource is clamped into. Resources are registered once and then shared
//! immutably (see [`crate::registry`]).

use serde::{Deserialize, Serialize};

/// Largest supported number of displayed decimal places.
pub const MAX_DECIMAL_PLACES: u8 = 6;

/// Broad grouping used for display rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Currency,
    #[default]
    Material,
    Energy,
    Population,
    Custom(String),
}

/// A typed, bounded quantity kind identified by a stable string id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    id: String,
    name: String,
    description: String,
    icon: String,
    category: ResourceCategory,
    min_value: f64,
    max_value: f64,
    decimal_places: u8,
    hidden: bool,
}

impl Resource {
    /// Create a resource with default bounds `0..+inf`, material category,
    /// and the id doubling as display name.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            icon: String::new(),
            category: ResourceCategory::default(),
            min_value: 0.0,
            max_value: f64::INFINITY,
            decimal_places: 0,
            hidden: false,
        }
    }

    // -----------------------------------------------------------------------
    // Builder-style construction
    // -----------------------------------------------------------------------

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn with_category(mut self, category: ResourceCategory) -> Self {
        self.set_category(category);
        self
    }

    /// Set both bounds at once. Reversed bounds are swapped.
    pub fn with_bounds(mut self, min_value: f64, max_value: f64) -> Self {
        let (lo, hi) = if min_value <= max_value {
            (min_value, max_value)
        } else {
            (max_value, min_value)
        };
        self.min_value = lo;
        self.max_value = hi;
        self
    }

    pub fn with_decimal_places(mut self, places: u8) -> Self {
        self.set_decimal_places(places);
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    pub fn set_icon(&mut self, icon: impl Into<String>) {
        self.icon = icon.into();
    }

    pub fn category(&self) -> &ResourceCategory {
        &self.category
    }

    pub fn set_category(&mut self, category: ResourceCategory) {
        self.category = category;
    }

    pub fn min_value(&self) -> f64 {
        self.min_value
    }

    /// Set the lower bound. If it exceeds the upper bound, the upper bound
    /// is raised to match. NaN is ignored.
    pub fn set_min_value(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.min_value = value;
        if self.max_value < value {
            self.max_value = value;
        }
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    /// Set the upper bound. If it falls below the lower bound, the lower
    /// bound is lowered to match. NaN is ignored.
    pub fn set_max_value(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.max_value = value;
        if self.min_value > value {
            self.min_value = value;
        }
    }

    pub fn decimal_places(&self) -> u8 {
        self.decimal_places
    }

    /// Set displayed precision, clamped to `0..=MAX_DECIMAL_PLACES`.
    pub fn set_decimal_places(&mut self, places: u8) {
        self.decimal_places = places.min(MAX_DECIMAL_PLACES);
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    // -----------------------------------------------------------------------
    // Amount rules
    // -----------------------------------------------------------------------

    /// Clamp an amount into `[min_value, max_value]`. Non-finite amounts
    /// (NaN, +inf, -inf) map to `min_value`.
    pub fn clamp_amount(&self, amount: f64) -> f64 {
        if !amount.is_finite() {
            return self.min_value;
        }
        amount.max(self.min_value).min(self.max_value)
    }

    /// True iff the amount is finite and within bounds.
    pub fn validate_amount(&self, amount: f64) -> bool {
        amount.is_finite() && amount >= self.min_value && amount <= self.max_value
    }

    /// Format an amount for display.
    ///
    /// Currency abbreviates magnitudes of 1e3 and above with K/M/B/T.
    /// Everything else is fixed-point at the resource's precision.
    pub fn format_value(&self, amount: f64) -> String {
        let precision = self.display_precision();

        if self.category == ResourceCategory::Currency {
            const SUFFIXES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
            let magnitude = amount.abs();
            for (scale, suffix) in SUFFIXES {
                if magnitude >= scale {
                    return format!("{:.*}{}", precision, amount / scale, suffix);
                }
            }
        }

        format!("{:.*}", precision, amount)
    }

    /// Precision actually used for display: 0-4 are honored, anything
    /// wider falls back to 2.
    fn display_precision(&self) -> usize {
        match self.decimal_places {
            p @ 0..=4 => p as usize,
            _ => 2,
        }
    }
}
