use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Én dekodet enhet fra FIT-strømmen.
///
/// Frame-dumpen fra dekoderen bruker samme diskriminant (`frame_type`) som
/// den projiserte JSON-en, så en dump-linje og en projisert frame kan leses
/// side om side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frame_type", rename_all = "snake_case")]
pub enum Frame {
    Header(FileHeader),
    Crc(Checksum),
    DefinitionMessage(DefinitionMessage),
    DataMessage(DataMessage),
}

impl Frame {
    pub fn frame_type(&self) -> &'static str {
        match self {
            Frame::Header(_) => "header",
            Frame::Crc(_) => "crc",
            Frame::DefinitionMessage(_) => "definition_message",
            Frame::DataMessage(_) => "data_message",
        }
    }

    /// (navn, globalt meldingsnummer) for meldingsframes, None for header/crc.
    pub fn message_identity(&self) -> Option<(&str, u16)> {
        match self {
            Frame::DefinitionMessage(m) => Some((m.name.as_str(), m.global_mesg_num)),
            Frame::DataMessage(m) => Some((m.name.as_str(), m.global_mesg_num)),
            Frame::Header(_) | Frame::Crc(_) => None,
        }
    }
}

/// Byte-proveniens for en frame (indeks, offset og lengde i kildestrømmen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chunk {
    #[serde(default)]
    pub index: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub header_size: u8,
    /// (major, minor)
    pub proto_ver: (u8, u8),
    /// (major, minor)
    pub profile_ver: (u16, u16),
    pub body_size: u32,
    /// Mangler i 12-byte headere.
    #[serde(default)]
    pub crc: Option<u16>,
    #[serde(default)]
    pub crc_matched: bool,
    #[serde(default)]
    pub chunk: Chunk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checksum {
    pub crc: u16,
    #[serde(default)]
    pub matched: bool,
    #[serde(default)]
    pub chunk: Chunk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageHeader {
    pub local_mesg_num: u8,
    /// Kun satt for komprimerte tidsstempel-headere.
    #[serde(default)]
    pub time_offset: Option<u32>,
    #[serde(default)]
    pub is_developer_data: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Endian {
    #[default]
    #[serde(rename = "<")]
    Little,
    #[serde(rename = ">")]
    Big,
}

impl Endian {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endian::Little => "<",
            Endian::Big => ">",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub def_num: u8,
    pub type_name: String,
    pub base_type_name: String,
    pub size: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevFieldDefinition {
    pub name: String,
    pub dev_data_index: u8,
    pub def_num: u8,
    pub type_name: String,
    pub size: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionMessage {
    pub name: String,
    pub global_mesg_num: u16,
    pub header: MessageHeader,
    #[serde(default)]
    pub endian: Endian,
    #[serde(default)]
    pub field_defs: Vec<FieldDefinition>,
    #[serde(default)]
    pub dev_field_defs: Vec<DevFieldDefinition>,
    #[serde(default)]
    pub chunk: Chunk,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMessage {
    pub name: String,
    pub global_mesg_num: u16,
    pub header: MessageHeader,
    /// Dekodingsrekkefølge. Navn kan forekomme flere ganger.
    #[serde(default)]
    pub fields: Vec<FieldData>,
    #[serde(default)]
    pub chunk: Chunk,
}

impl DataMessage {
    pub fn new(name: impl Into<String>, global_mesg_num: u16) -> Self {
        Self {
            name: name.into(),
            global_mesg_num,
            header: MessageHeader::default(),
            fields: Vec::new(),
            chunk: Chunk::default(),
        }
    }

    pub fn with_field(mut self, field: FieldData) -> Self {
        self.fields.push(field);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldData {
    pub name: String,
    pub value: FieldValue,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub def_num: u8,
    #[serde(default)]
    pub raw_value: FieldValue,
}

impl FieldData {
    /// Felt uten enhet der rå verdi = dekodet verdi.
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            raw_value: value.clone(),
            value,
            units: None,
            def_num: 0,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_def_num(mut self, def_num: u8) -> Self {
        self.def_num = def_num;
        self
    }
}

/// Dekodet feltverdi. Typen avhenger av FIT-profilen, derfor løst typet.
///
/// I dumpen er en streng alltid tekst og projiseres uendret. Tidsstempler
/// og klokkeslett har egne merkede former, `{"$ts": "..."}` og
/// `{"$time": "..."}`, så de aldri forveksles med tekst.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    /// Heltall over `i64::MAX` (uint64-felt).
    UInt(u64),
    Float(f64),
    Text(String),
    Timestamp(#[serde(with = "tagged_timestamp")] DateTime<Utc>),
    Time(#[serde(with = "tagged_time")] NaiveTime),
    List(Vec<FieldValue>),
}

mod tagged_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Tagged {
        #[serde(rename = "$ts")]
        ts: DateTime<Utc>,
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        Tagged { ts: *ts }.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        Tagged::deserialize(d).map(|t| t.ts)
    }
}

mod tagged_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Tagged {
        #[serde(rename = "$time")]
        time: NaiveTime,
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        Tagged { time: *time }.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        Tagged::deserialize(d).map(|t| t.time)
    }
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::UInt(u) => Some(*u as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Skalerer numeriske verdier (også inni lister); andre verdier uendret.
    pub fn scaled(&self, factor: f64) -> FieldValue {
        match self {
            FieldValue::Int(_) | FieldValue::UInt(_) | FieldValue::Float(_) => {
                FieldValue::Float(self.as_f64().unwrap_or_default() * factor)
            }
            FieldValue::List(xs) => FieldValue::List(xs.iter().map(|x| x.scaled(factor)).collect()),
            other => other.clone(),
        }
    }

    /// JSON-form i projeksjonen. Tidsstempler får eksplisitt `+00:00`,
    /// brøkdelssekunder bare når de finnes (mikrosekunder).
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::UInt(u) => Value::from(*u),
            FieldValue::Float(f) => Value::from(*f),
            FieldValue::Timestamp(ts) => Value::String(isoformat_utc(ts)),
            FieldValue::Time(t) => Value::String(isoformat_time(t)),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::List(xs) => Value::Array(xs.iter().map(FieldValue::to_json).collect()),
        }
    }
}

fn isoformat_utc(ts: &DateTime<Utc>) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
    }
}

fn isoformat_time(t: &NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.6f").to_string()
    }
}
