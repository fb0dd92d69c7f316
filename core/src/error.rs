use thiserror::Error;

/// Feil fra frame-kilden (dekoderen). Disse avbryter strømmen, men
/// projektoren tar vare på alt som ble dekodet før feilen.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid frame on line {line} at `{path}`")]
    Json {
        line: usize,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read frame stream")]
    Io(#[from] std::io::Error),

    #[error("CRC mismatch in {frame} frame (crc=0x{crc:04x})")]
    CrcMismatch { frame: &'static str, crc: u16 },
}

/// Feil som stopper en konvertering.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("malformed field `{field}` ({value}): {reason}")]
    MalformedField {
        field: String,
        value: String,
        reason: String,
    },

    #[error("invalid activity id: {0:?}")]
    InvalidActivityId(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

impl ConvertError {
    pub fn malformed(field: &str, value: &serde_json::Value, reason: impl Into<String>) -> Self {
        ConvertError::MalformedField {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
