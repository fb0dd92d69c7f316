use std::error::Error as StdError;
use std::fmt;
use std::ops::ControlFlow;

use log::{debug, warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::DecodeError;
use crate::filter::MessageFilter;
use crate::frame::{
    Checksum, Chunk, DataMessage, DefinitionMessage, DevFieldDefinition, FieldData,
    FieldDefinition, FileHeader, Frame, MessageHeader,
};
use crate::metrics;

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectOptions {
    pub filter: MessageFilter,
    /// Dropp definisjonsmeldinger før filteret vurderes.
    pub suppress_definitions: bool,
}

impl Default for ProjectOptions {
    fn default() -> Self {
        Self {
            filter: MessageFilter::accept_all(),
            suppress_definitions: true,
        }
    }
}

impl ProjectOptions {
    pub fn keeps(&self, frame: &Frame) -> bool {
        match frame {
            Frame::Header(_) | Frame::Crc(_) => true,
            Frame::DefinitionMessage(m) => {
                !self.suppress_definitions && self.filter.accepts(&m.name, m.global_mesg_num)
            }
            Frame::DataMessage(m) => self.filter.accepts(&m.name, m.global_mesg_num),
        }
    }
}

/// Ikke-fatal melding om at frame-strømmen ble avkortet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    /// Årsakskjeden under `message`, ytterst først.
    pub causes: Vec<String>,
    pub frames_kept: usize,
}

impl Diagnostic {
    pub fn from_fault(fault: &DecodeError, frames_kept: usize) -> Self {
        let mut causes = Vec::new();
        let mut source = fault.source();
        while let Some(err) = source {
            causes.push(err.to_string());
            source = err.source();
        }
        Self {
            message: fault.to_string(),
            causes,
            frames_kept,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for cause in &self.causes {
            write!(f, ": {cause}")?;
        }
        write!(f, " (kept {} frame(s))", self.frames_kept)
    }
}

/// Resultatet av en projeksjon: alltid en gyldig (ev. avkortet) liste.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub frames: Vec<Value>,
    pub diagnostic: Option<Diagnostic>,
}

impl Projection {
    pub fn is_truncated(&self) -> bool {
        self.diagnostic.is_some()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.frames)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.frames)
    }
}

/// Projiserer en dekodet frame-strøm til JSON-records.
///
/// Første dekodefeil stopper konsumeringen; alt som allerede er projisert
/// beholdes og feilen legges ved som [`Diagnostic`] i stedet for å propageres.
pub fn project<I>(frames: I, options: &ProjectOptions) -> Projection
where
    I: IntoIterator<Item = Result<Frame, DecodeError>>,
{
    let folded = frames.into_iter().try_fold(Vec::new(), |mut out, item| match item {
        Ok(frame) => {
            if options.keeps(&frame) {
                out.push(render_frame(&frame));
            } else {
                debug!("skipping {} frame", frame.frame_type());
            }
            ControlFlow::Continue(out)
        }
        Err(fault) => ControlFlow::Break((out, fault)),
    });

    let m = metrics::global();
    match folded {
        ControlFlow::Continue(frames) => {
            m.frames_projected_total.inc_by(frames.len() as u64);
            Projection { frames, diagnostic: None }
        }
        ControlFlow::Break((frames, fault)) => {
            let diagnostic = Diagnostic::from_fault(&fault, frames.len());
            warn!("the following error occurred while parsing the FIT stream: {diagnostic}");
            m.frames_projected_total.inc_by(frames.len() as u64);
            m.decode_faults_total.inc();
            Projection {
                frames,
                diagnostic: Some(diagnostic),
            }
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// RENDERING (én funksjon per variant)
// ──────────────────────────────────────────────────────────────────────────────

pub fn render_frame(frame: &Frame) -> Value {
    match frame {
        Frame::Header(h) => render_header(h),
        Frame::Crc(c) => render_checksum(c),
        Frame::DefinitionMessage(m) => render_definition(m),
        Frame::DataMessage(m) => render_data(m),
    }
}

/// `0x` + fire hex-sifre, f.eks. 0x1A2 → "0x01a2".
pub fn render_crc(crc: u16) -> String {
    format!("{crc:#06x}")
}

fn render_chunk(chunk: &Chunk) -> Value {
    json!({
        "index": chunk.index,
        "offset": chunk.offset,
        "size": chunk.size,
    })
}

fn render_message_header(header: &MessageHeader) -> Value {
    json!({
        "local_mesg_num": header.local_mesg_num,
        "time_offset": header.time_offset,
        "is_developer_data": header.is_developer_data,
    })
}

fn render_header(h: &FileHeader) -> Value {
    json!({
        "frame_type": "header",
        "header_size": h.header_size,
        "proto_ver": [h.proto_ver.0, h.proto_ver.1],
        "profile_ver": [h.profile_ver.0, h.profile_ver.1],
        "body_size": h.body_size,
        "crc": render_crc(h.crc.unwrap_or(0)),
        "crc_matched": h.crc_matched,
        "chunk": render_chunk(&h.chunk),
    })
}

fn render_checksum(c: &Checksum) -> Value {
    json!({
        "frame_type": "crc",
        "crc": render_crc(c.crc),
        "matched": c.matched,
        "chunk": render_chunk(&c.chunk),
    })
}

fn render_field_def(def: &FieldDefinition) -> Value {
    json!({
        "name": def.name,
        "def_num": def.def_num,
        "type_name": def.type_name,
        "base_type_name": def.base_type_name,
        "size": def.size,
    })
}

fn render_dev_field_def(def: &DevFieldDefinition) -> Value {
    json!({
        "name": def.name,
        "dev_data_index": def.dev_data_index,
        "def_num": def.def_num,
        "type_name": def.type_name,
        "size": def.size,
    })
}

fn render_field(field: &FieldData) -> Value {
    json!({
        "name": field.name,
        "value": field.value.to_json(),
        "units": field.units.as_deref().unwrap_or(""),
        "def_num": field.def_num,
        "raw_value": field.raw_value.to_json(),
    })
}

fn render_definition(m: &DefinitionMessage) -> Value {
    json!({
        "frame_type": "definition_message",
        "name": m.name,
        "header": render_message_header(&m.header),
        "global_mesg_num": m.global_mesg_num,
        "endian": m.endian.as_str(),
        "field_defs": m.field_defs.iter().map(render_field_def).collect::<Vec<_>>(),
        "dev_field_defs": m.dev_field_defs.iter().map(render_dev_field_def).collect::<Vec<_>>(),
        "chunk": render_chunk(&m.chunk),
    })
}

fn render_data(m: &DataMessage) -> Value {
    json!({
        "frame_type": "data_message",
        "name": m.name,
        "header": render_message_header(&m.header),
        "fields": m.fields.iter().map(render_field).collect::<Vec<_>>(),
        "chunk": render_chunk(&m.chunk),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Endian, FieldValue};

    #[test]
    fn crc_is_zero_padded_hex() {
        assert_eq!(render_crc(0x1A2), "0x01a2");
        assert_eq!(render_crc(0), "0x0000");
        assert_eq!(render_crc(0xBEEF), "0xbeef");
    }

    #[test]
    fn header_without_crc_renders_zero() {
        let h = FileHeader {
            header_size: 12,
            proto_ver: (2, 0),
            profile_ver: (21, 40),
            body_size: 1024,
            crc: None,
            crc_matched: false,
            chunk: Chunk { index: 0, offset: 0, size: 12 },
        };
        let v = render_frame(&Frame::Header(h));
        assert_eq!(v["frame_type"], "header");
        assert_eq!(v["crc"], "0x0000");
        assert_eq!(v["proto_ver"], json!([2, 0]));
        assert_eq!(v["chunk"], json!({"index": 0, "offset": 0, "size": 12}));
    }

    #[test]
    fn data_message_keys_keep_their_order() {
        let msg = DataMessage::new("record", 20)
            .with_field(FieldData::new("heart_rate", FieldValue::Int(150)).with_units("bpm"));
        let v = render_frame(&Frame::DataMessage(msg));

        let keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["frame_type", "name", "header", "fields", "chunk"]);

        let field_keys: Vec<&str> = v["fields"][0]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(field_keys, ["name", "value", "units", "def_num", "raw_value"]);
        assert_eq!(v["fields"][0]["units"], "bpm");
    }

    #[test]
    fn missing_units_render_as_empty_string() {
        let msg = DataMessage::new("session", 18)
            .with_field(FieldData::new("sport", FieldValue::Text("cycling".into())));
        let v = render_frame(&Frame::DataMessage(msg));
        assert_eq!(v["fields"][0]["units"], "");
    }

    fn keys(v: &Value) -> Vec<&str> {
        v.as_object().unwrap().keys().map(String::as_str).collect()
    }

    #[test]
    fn header_and_crc_keys_keep_their_order() {
        let h = FileHeader {
            header_size: 14,
            proto_ver: (2, 0),
            profile_ver: (21, 40),
            body_size: 4096,
            crc: Some(0x1A2),
            crc_matched: true,
            chunk: Chunk { index: 0, offset: 0, size: 14 },
        };
        let v = render_frame(&Frame::Header(h));
        assert_eq!(
            keys(&v),
            [
                "frame_type",
                "header_size",
                "proto_ver",
                "profile_ver",
                "body_size",
                "crc",
                "crc_matched",
                "chunk"
            ]
        );
        assert_eq!(keys(&v["chunk"]), ["index", "offset", "size"]);

        let c = Checksum {
            crc: 0xBEEF,
            matched: false,
            chunk: Chunk { index: 9, offset: 4110, size: 2 },
        };
        let v = render_frame(&Frame::Crc(c));
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"{"frame_type":"crc","crc":"0xbeef","matched":false,"chunk":{"index":9,"offset":4110,"size":2}}"#
        );
    }

    #[test]
    fn definition_keys_keep_their_order() {
        let m = DefinitionMessage {
            name: "record".into(),
            global_mesg_num: 20,
            header: MessageHeader { local_mesg_num: 3, time_offset: Some(7), is_developer_data: true },
            endian: Endian::Big,
            field_defs: vec![FieldDefinition {
                name: "heart_rate".into(),
                def_num: 3,
                type_name: "uint8".into(),
                base_type_name: "uint8".into(),
                size: 1,
            }],
            dev_field_defs: vec![DevFieldDefinition {
                name: "power_balance".into(),
                dev_data_index: 0,
                def_num: 2,
                type_name: "float32".into(),
                size: 4,
            }],
            chunk: Chunk { index: 4, offset: 60, size: 12 },
        };
        let v = render_frame(&Frame::DefinitionMessage(m));
        assert_eq!(
            keys(&v),
            [
                "frame_type",
                "name",
                "header",
                "global_mesg_num",
                "endian",
                "field_defs",
                "dev_field_defs",
                "chunk"
            ]
        );
        assert_eq!(keys(&v["header"]), ["local_mesg_num", "time_offset", "is_developer_data"]);
        assert_eq!(v["header"]["time_offset"], 7);
        assert_eq!(v["endian"], ">");
        assert_eq!(keys(&v["field_defs"][0]), ["name", "def_num", "type_name", "base_type_name", "size"]);
        assert_eq!(
            serde_json::to_string(&v["dev_field_defs"]).unwrap(),
            r#"[{"name":"power_balance","dev_data_index":0,"def_num":2,"type_name":"float32","size":4}]"#
        );
    }
}
