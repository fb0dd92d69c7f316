//! Grensen mot den eksterne FIT-dekoderen.
//!
//! Dekoderen leverer en frame-dump (JSON lines, én [`Frame`] per linje).
//! Her leses dumpen lat, og CRC-policy og enhetsbehandling legges på før
//! framene går videre til projektoren. Strømmen stopper ved første feil.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::str::FromStr;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::frame::Frame;
use crate::units::UnitsMode;

/// CRC-kontroll, tilsvarende dekoderens tre moduser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrcCheck {
    /// Ikke kontrollert; alle CRC-er rapporteres som ikke matchet.
    Disabled,
    /// Rapporter resultatet, men fortsett.
    #[default]
    ReadOnly,
    /// Feil ved første CRC som ikke matcher.
    Enforce,
}

impl FromStr for CrcCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disabled" | "off" => Ok(CrcCheck::Disabled),
            "readonly" | "read-only" => Ok(CrcCheck::ReadOnly),
            "enforce" | "enabled" => Ok(CrcCheck::Enforce),
            other => Err(format!("unknown CRC mode `{other}` (disabled|readonly|enforce)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodeOptions {
    #[serde(default)]
    pub crc_check: CrcCheck,
    #[serde(default)]
    pub units: UnitsMode,
}

impl DecodeOptions {
    /// CRC-policy og enhetsbehandling for én frame.
    pub fn process(&self, mut frame: Frame) -> Result<Frame, DecodeError> {
        match (&mut frame, self.crc_check) {
            (Frame::Header(h), CrcCheck::Disabled) => h.crc_matched = false,
            (Frame::Crc(c), CrcCheck::Disabled) => c.matched = false,
            (Frame::Header(h), CrcCheck::Enforce) => {
                if let Some(crc) = h.crc.filter(|_| !h.crc_matched) {
                    return Err(DecodeError::CrcMismatch { frame: "header", crc });
                }
            }
            (Frame::Crc(c), CrcCheck::Enforce) => {
                if !c.matched {
                    return Err(DecodeError::CrcMismatch { frame: "crc", crc: c.crc });
                }
            }
            _ => {}
        }
        self.units.apply(&mut frame);
        Ok(frame)
    }
}

/// Lat leser av en frame-dump. Stopper (fused) etter første feil.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line_no: usize,
    failed: bool,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            failed: false,
        }
    }

    fn parse(&self, line: &str) -> Result<Frame, DecodeError> {
        let mut de = serde_json::Deserializer::from_str(line);
        serde_path_to_error::deserialize(&mut de).map_err(|e| DecodeError::Json {
            line: self.line_no,
            path: e.path().to_string(),
            source: e.into_inner(),
        })
    }
}

impl<R: BufRead> Iterator for JsonLinesSource<R> {
    type Item = Result<Frame, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e.into()));
                }
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let parsed = self.parse(&line);
            self.failed = parsed.is_err();
            return Some(parsed);
        }
    }
}

/// Legger [`DecodeOptions`] på en rå frame-strøm.
pub struct Decoded<I> {
    inner: I,
    options: DecodeOptions,
    done: bool,
}

impl<I> Iterator for Decoded<I>
where
    I: Iterator<Item = Result<Frame, DecodeError>>,
{
    type Item = Result<Frame, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.inner.next()?.and_then(|frame| self.options.process(frame));
        self.done = item.is_err();
        Some(item)
    }
}

pub fn decode<I>(frames: I, options: DecodeOptions) -> Decoded<I::IntoIter>
where
    I: IntoIterator<Item = Result<Frame, DecodeError>>,
{
    Decoded {
        inner: frames.into_iter(),
        options,
        done: false,
    }
}

pub type FileFrames = Decoded<JsonLinesSource<BufReader<File>>>;

/// Åpner en frame-dump fra disk. Filhåndtaket eies av iteratoren og
/// slippes når den droppes, også etter en dekodefeil.
pub fn open_path(path: &Path, options: DecodeOptions) -> Result<FileFrames, DecodeError> {
    let file = File::open(path)?;
    info!("reading frame dump {} ({:?})", path.display(), options);
    Ok(decode(JsonLinesSource::new(BufReader::new(file)), options))
}

/// Frame-dump fra en streng (tester, Python-binding).
pub fn from_str_dump(
    dump: &str,
    options: DecodeOptions,
) -> Decoded<JsonLinesSource<&[u8]>> {
    decode(JsonLinesSource::new(dump.as_bytes()), options)
}
