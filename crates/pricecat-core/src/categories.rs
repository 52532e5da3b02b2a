use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::products::CapacityUnit;
use crate::ConfigError;

/// Fixed product taxonomy. Every category shares the gigabyte base unit for
/// normalized capacity; only the display unit differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    InternalSsd,
    ExternalSsd,
    InternalHdd,
    ExternalHdd,
    MicroSd,
    UsbFlash,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::InternalSsd,
        Category::ExternalSsd,
        Category::InternalHdd,
        Category::ExternalHdd,
        Category::MicroSd,
        Category::UsbFlash,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::InternalSsd => "internal-ssd",
            Category::ExternalSsd => "external-ssd",
            Category::InternalHdd => "internal-hdd",
            Category::ExternalHdd => "external-hdd",
            Category::MicroSd => "micro-sd",
            Category::UsbFlash => "usb-flash",
        }
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase().replace('_', "-");
        Category::ALL.into_iter().find(|c| c.as_str() == code)
    }

    /// Unit the presentation layer shows capacities (and range filters) in.
    #[must_use]
    pub fn display_unit(self) -> CapacityUnit {
        match self {
            Category::InternalHdd | Category::ExternalHdd => CapacityUnit::Tb,
            Category::InternalSsd
            | Category::ExternalSsd
            | Category::MicroSd
            | Category::UsbFlash => CapacityUnit::Gb,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovery source: which search query feeds a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySource {
    pub category: Category,
    /// Search phrase sent to the external catalog API.
    pub query: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Lower runs first. Ties keep file order.
    #[serde(default)]
    pub priority: u8,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CategorySourcesFile {
    pub categories: Vec<CategorySource>,
}

impl CategorySourcesFile {
    /// Enabled sources in run order.
    #[must_use]
    pub fn run_order(&self) -> Vec<&CategorySource> {
        let mut enabled: Vec<&CategorySource> =
            self.categories.iter().filter(|c| c.enabled).collect();
        enabled.sort_by_key(|c| c.priority);
        enabled
    }

    #[must_use]
    pub fn find(&self, category: Category) -> Option<&CategorySource> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Load and validate the category sources configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_category_sources(path: &Path) -> Result<CategorySourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CategoriesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_category_sources(&content)
}

/// Parse and validate category sources from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text does not parse or fails validation.
pub fn parse_category_sources(content: &str) -> Result<CategorySourcesFile, ConfigError> {
    let file: CategorySourcesFile =
        serde_yaml::from_str(content).map_err(ConfigError::CategoriesFileParse)?;
    validate_category_sources(&file)?;
    Ok(file)
}

fn validate_category_sources(file: &CategorySourcesFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for source in &file.categories {
        if source.query.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "category '{}' has an empty query",
                source.category
            )));
        }

        if !seen.insert(source.category) {
            return Err(ConfigError::Validation(format!(
                "duplicate category: '{}'",
                source.category
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "categories_test.rs"]
mod tests;
