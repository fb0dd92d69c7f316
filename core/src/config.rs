use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::filter::{MessageFilter, MessageKey};
use crate::project::ProjectOptions;
use crate::source::{CrcCheck, DecodeOptions};
use crate::units::UnitsMode;

/// Miljøvariabel for leveringsadressen (samme navn som i den gamle funksjonsappen).
pub const DELIVERY_URL_ENV: &str = "HttpGarmDataUrl";
pub const DEFAULT_CONVERTER: &str = "FitConverter";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub delivery_url: Option<String>,
    pub converter: String,
    pub crc_check: CrcCheck,
    pub units: UnitsMode,
    pub suppress_definitions: bool,
    pub filter: Vec<MessageKey>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delivery_url: None,
            converter: DEFAULT_CONVERTER.to_string(),
            crc_check: CrcCheck::default(),
            units: UnitsMode::default(),
            suppress_definitions: true,
            filter: Vec::new(),
        }
    }
}

impl Settings {
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            crc_check: self.crc_check,
            units: self.units,
        }
    }

    pub fn project_options(&self) -> ProjectOptions {
        ProjectOptions {
            filter: self.filter.iter().cloned().collect::<MessageFilter>(),
            suppress_definitions: self.suppress_definitions,
        }
    }

    /// Miljøet vinner over filen.
    fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DELIVERY_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.delivery_url = Some(url);
        }
        self
    }
}

/// Leser innstillinger fra disk (JSON) og legger på miljøvariabler.
/// Mangler filen, brukes standardverdiene.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConvertError> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

pub fn load_settings_with<F>(path: Option<&Path>, lookup: F) -> Result<Settings, ConvertError>
where
    F: Fn(&str) -> Option<String>,
{
    let settings = match path {
        Some(p) if p.exists() => {
            let contents = std::fs::read_to_string(p)?;
            let mut de = serde_json::Deserializer::from_str(&contents);
            let settings: Settings = serde_path_to_error::deserialize(&mut de).map_err(|e| {
                ConvertError::Config(format!("{} at {}: {}", p.display(), e.path(), e.inner()))
            })?;
            info!("settings loaded from {}", p.display());
            settings
        }
        Some(p) => {
            warn!("no settings at {}, using defaults", p.display());
            Settings::default()
        }
        None => Settings::default(),
    };
    Ok(settings.with_env(lookup))
}
