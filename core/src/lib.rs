//! fitconvert core: projiserer dekodede FIT-frames til JSON og reduserer
//! dem til et aktivitetsdokument (sammendrag + records).

pub mod cli;
pub mod config;
pub mod convert;
pub mod delivery;
pub mod error;
pub mod filter;
pub mod frame;
pub mod metrics;
pub mod project;
pub mod reduce;
pub mod source;
pub mod units;

#[cfg(feature = "python")]
mod py;

pub use config::{load_settings, Settings};
pub use convert::{convert, Conversion, ConvertRequest};
pub use error::{ConvertError, DecodeError};
pub use filter::{MessageFilter, MessageKey};
pub use frame::{
    Checksum, Chunk, DataMessage, DefinitionMessage, DevFieldDefinition, Endian, FieldData,
    FieldDefinition, FieldValue, FileHeader, Frame, MessageHeader,
};
pub use project::{project, render_crc, render_frame, Diagnostic, ProjectOptions, Projection};
pub use reduce::{reduce, reduce_json, ActivitySummary, Sample, SessionTotals};
pub use source::{decode, open_path, CrcCheck, DecodeOptions, JsonLinesSource};
pub use units::UnitsMode;
