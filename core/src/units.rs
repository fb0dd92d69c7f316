use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::frame::{FieldData, Frame};

/// 180 / 2^31
pub const SEMICIRCLES_TO_DEG: f64 = 180.0 / 2_147_483_648.0;
pub const MS_TO_KMH: f64 = 3.6;
pub const M_TO_KM: f64 = 0.001;

/// Enhetsbehandling i dekodersteget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitsMode {
    /// Verdiene slik profilen definerer dem (semicircles, m/s, m).
    Raw,
    /// grader, km/h og km.
    #[default]
    Standard,
}

impl FromStr for UnitsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(UnitsMode::Raw),
            "standard" => Ok(UnitsMode::Standard),
            other => Err(format!("unknown units mode `{other}` (raw|standard)")),
        }
    }
}

impl UnitsMode {
    pub fn apply(self, frame: &mut Frame) {
        if self == UnitsMode::Raw {
            return;
        }
        if let Frame::DataMessage(msg) = frame {
            for field in &mut msg.fields {
                standardize(field);
            }
        }
    }
}

fn standardize(field: &mut FieldData) {
    match field.units.as_deref() {
        Some("semicircles") => rescale(field, SEMICIRCLES_TO_DEG, "deg"),
        Some("m/s") if field.name.ends_with("speed") => rescale(field, MS_TO_KMH, "km/h"),
        Some("m") if field.name.ends_with("distance") => rescale(field, M_TO_KM, "km"),
        _ => {}
    }
}

fn rescale(field: &mut FieldData, factor: f64, units: &str) {
    field.value = field.value.scaled(factor);
    field.units = Some(units.to_string());
}
