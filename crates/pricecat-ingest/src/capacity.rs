//! Capacity extraction from freeform size strings and product titles.
//!
//! Recognizes a number followed by one of `TB`, `GB`, `G` (any case) or the
//! French `To`/`Go`, folds the synonyms to [`CapacityUnit`], and expresses the
//! result in gigabytes. Rate tokens (`"400 Gbps"`, `"10Gbit"`, `"6Gb/s"`)
//! are matched and dropped, so interface speeds never pass for capacities.
//!
//! A comma followed by exactly three digits groups thousands (`"1,024GB"`);
//! any other comma is a decimal comma (`"1,5 To"`).
//!
//! Binary capacity artifacts (`1024 GB`, `2048 GB`, ...) are snapped to their
//! decimal marketing sizes through a [`SnapTable`]. Snapping is lossy on
//! purpose: once snapped the exact binary magnitude is gone.

use std::sync::LazyLock;

use pricecat_core::CapacityUnit;
use regex::Regex;

static CAPACITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:(?P<grouped>\d{1,3}(?:,\d{3})+(?:\.\d+)?)|(?P<plain>\d+(?:[.,]\d+)?))\s?(?P<unit>(?i:tb|gb|g)|To|Go)(?P<rate>(?i:ps|it|/s(?:ec)?))?\b",
    )
    .expect("valid capacity regex")
});

const DEFAULT_SNAP_POINTS: [(u64, u64); 5] = [
    (1024, 1000),
    (2048, 2000),
    (4096, 4000),
    (8192, 8000),
    (16384, 16000),
];

/// Binary → decimal snapping points, in gigabytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapTable {
    points: Vec<(u64, u64)>,
}

impl Default for SnapTable {
    fn default() -> Self {
        Self {
            points: DEFAULT_SNAP_POINTS.to_vec(),
        }
    }
}

impl SnapTable {
    #[must_use]
    pub fn new(points: Vec<(u64, u64)>) -> Self {
        Self { points }
    }

    /// Returns the decimal equivalent for an exact snap point, or the input
    /// unchanged.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // snap points are small integers
    pub fn snap(&self, gigabytes: f64) -> f64 {
        self.points
            .iter()
            .find(|(from, _)| (gigabytes - *from as f64).abs() < 1e-6)
            .map_or(gigabytes, |(_, to)| *to as f64)
    }
}

/// A successfully parsed capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedCapacity {
    /// Magnitude as written, in `unit`.
    pub value: f64,
    pub unit: CapacityUnit,
    /// Magnitude in gigabytes after snapping.
    pub normalized_gb: f64,
}

/// Which input a capacity was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacitySource {
    Specification,
    Title,
}

/// Parses capacities with a configurable snapping table.
#[derive(Debug, Clone, Default)]
pub struct CapacityParser {
    snap: SnapTable,
}

impl CapacityParser {
    #[must_use]
    pub fn new(snap: SnapTable) -> Self {
        Self { snap }
    }

    /// Parses the first capacity found in `text`.
    ///
    /// Returns `None` when nothing parses; callers treat that as a skip, not
    /// an error.
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<ParsedCapacity> {
        CAPACITY_RE.captures_iter(text).find_map(|caps| {
            if caps.name("rate").is_some() {
                return None;
            }
            let value = match (caps.name("grouped"), caps.name("plain")) {
                (Some(grouped), _) => grouped.as_str().replace(',', ""),
                (None, Some(plain)) => plain.as_str().replace(',', "."),
                (None, None) => return None,
            }
            .parse::<f64>()
            .ok()?;
            let unit = canonical_unit(caps.name("unit")?.as_str())?;
            if !value.is_finite() || value <= 0.0 {
                return None;
            }
            let normalized_gb = self.snap.snap(value * unit.gigabytes_per_unit());
            Some(ParsedCapacity {
                value,
                unit,
                normalized_gb,
            })
        })
    }

    /// Extracts a capacity from the structured specification field, falling
    /// back to the title when the field is absent or unparsable. Both paths
    /// share the same parsing and snapping rules.
    #[must_use]
    pub fn extract(
        &self,
        specification: Option<&str>,
        title: &str,
    ) -> Option<(ParsedCapacity, CapacitySource)> {
        specification
            .and_then(|s| self.parse(s))
            .map(|c| (c, CapacitySource::Specification))
            .or_else(|| self.parse(title).map(|c| (c, CapacitySource::Title)))
    }
}

/// Folds unit synonyms: `To` → TB, `Go`/`G` → GB.
fn canonical_unit(raw: &str) -> Option<CapacityUnit> {
    match raw {
        "To" => Some(CapacityUnit::Tb),
        "Go" => Some(CapacityUnit::Gb),
        other => match other.to_ascii_lowercase().as_str() {
            "tb" => Some(CapacityUnit::Tb),
            "gb" | "g" => Some(CapacityUnit::Gb),
            _ => None,
        },
    }
}

#[cfg(test)]
#[path = "capacity_test.rs"]
mod tests;
