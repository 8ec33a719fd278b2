//! Provider configuration file: which adapters run and the dictionaries
//! that translate provider ids into tag labels.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::facility::Provider;
use crate::ConfigError;

fn enabled_default() -> bool {
    true
}

fn request_delay_default() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultisportConfig {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    pub base_url: String,
    /// Prefix joined with an item's `logo` to form its image URL.
    pub image_base_url: String,
    /// Card id → card name.
    #[serde(default)]
    pub cards: BTreeMap<String, String>,
    /// Activity category id → service type.
    #[serde(default)]
    pub activities: BTreeMap<String, String>,
    /// Parameter id → filter label.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicoverCard {
    pub name: String,
    pub category_vid: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicoverConfig {
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Search URL that already carries a query string; `&category_vid=<n>`
    /// is appended per card.
    pub base_url: String,
    /// Pause between consecutive per-card fetches.
    #[serde(default = "request_delay_default")]
    pub request_delay_ms: u64,
    /// Cards fetched in this order.
    pub cards: Vec<MedicoverCard>,
    /// Aspect id → filter label.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl MedicoverConfig {
    /// URL of the sub-fetch for one card.
    #[must_use]
    pub fn card_url(&self, card: &MedicoverCard) -> String {
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        format!("{}{sep}category_vid={}", self.base_url, card.category_vid)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProvidersFile {
    pub multisport: Option<MultisportConfig>,
    pub medicover: Option<MedicoverConfig>,
}

impl ProvidersFile {
    /// Providers whose configuration is present and enabled.
    #[must_use]
    pub fn enabled(&self) -> Vec<Provider> {
        let mut out = Vec::new();
        if self.multisport.as_ref().is_some_and(|c| c.enabled) {
            out.push(Provider::Multisport);
        }
        if self.medicover.as_ref().is_some_and(|c| c.enabled) {
            out.push(Provider::Medicover);
        }
        out
    }
}

/// Load and validate the provider configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_providers(path: &Path) -> Result<ProvidersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProvidersFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_providers(&content)
}

/// Parse and validate provider configuration from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text cannot be parsed or fails validation.
pub fn parse_providers(content: &str) -> Result<ProvidersFile, ConfigError> {
    let file: ProvidersFile =
        serde_yaml::from_str(content).map_err(ConfigError::ProvidersFileParse)?;

    validate_providers(&file)?;

    Ok(file)
}

fn validate_providers(file: &ProvidersFile) -> Result<(), ConfigError> {
    if file.enabled().is_empty() {
        return Err(ConfigError::Validation(
            "at least one provider must be enabled".to_string(),
        ));
    }

    if let Some(multisport) = file.multisport.as_ref().filter(|c| c.enabled) {
        if multisport.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "multisport base_url must be non-empty".to_string(),
            ));
        }
    }

    if let Some(medicover) = file.medicover.as_ref().filter(|c| c.enabled) {
        if medicover.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "medicover base_url must be non-empty".to_string(),
            ));
        }
        if medicover.cards.is_empty() {
            return Err(ConfigError::Validation(
                "medicover requires at least one card".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for card in &medicover.cards {
            if card.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "medicover card name must be non-empty".to_string(),
                ));
            }
            if !seen.insert(card.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate medicover card: '{}'",
                    card.name
                )));
            }
        }
    }

    Ok(())
}
