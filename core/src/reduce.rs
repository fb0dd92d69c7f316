use chrono::NaiveDateTime;
use log::{debug, info};
use serde::Serialize;
use serde_json::Value;

use crate::error::ConvertError;
use crate::metrics;

/// Tidsstempel slik projeksjonen skriver dem (UTC, hele sekunder).
pub const SOURCE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+00:00";
/// Tidsstempel i aktivitetsdokumentet.
pub const SAMPLE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static NULL: Value = Value::Null;

/// Måleverdier fra `session`-meldingen. Verdiene kopieres uendret,
/// enhetene er allerede normalisert av dekoderen.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SessionTotals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time_in_sec: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_dist_in_km: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_speed_in_kmh: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate: Option<Value>,
}

/// Ett sample fra en `record`-melding.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Sample {
    pub activity_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ele: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<Value>,
}

/// Aktivitetsdokumentet: sammendrag + samples i dekodingsrekkefølge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub uuid: String,
    pub converter: String,
    #[serde(flatten)]
    pub totals: SessionTotals,
    pub records: Vec<Sample>,
}

impl ActivitySummary {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// WHITELIST: kildenavn → målfelt (+ ev. transform)
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TotalsField {
    TotalTime,
    TotalDistance,
    AvgSpeed,
    AvgHeartRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SampleField {
    Timestamp,
    Lat,
    Lon,
    Distance,
    Ele,
    Speed,
    HeartRate,
}

type Transform = fn(&str, &Value) -> Result<Value, ConvertError>;

struct FieldRule<T> {
    source: &'static str,
    target: T,
    transform: Option<Transform>,
}

impl<T: Copy> FieldRule<T> {
    const fn copy(source: &'static str, target: T) -> Self {
        Self { source, target, transform: None }
    }

    fn apply(&self, value: &Value) -> Result<Value, ConvertError> {
        match self.transform {
            Some(f) => f(self.source, value),
            None => Ok(value.clone()),
        }
    }
}

const SESSION_RULES: &[FieldRule<TotalsField>] = &[
    FieldRule::copy("total_elapsed_time", TotalsField::TotalTime),
    FieldRule::copy("total_distance", TotalsField::TotalDistance),
    FieldRule::copy("enhanced_avg_speed", TotalsField::AvgSpeed),
    FieldRule::copy("avg_heart_rate", TotalsField::AvgHeartRate),
];

const RECORD_RULES: &[FieldRule<SampleField>] = &[
    FieldRule {
        source: "timestamp",
        target: SampleField::Timestamp,
        transform: Some(reformat_timestamp),
    },
    FieldRule::copy("position_lat", SampleField::Lat),
    FieldRule::copy("position_long", SampleField::Lon),
    FieldRule::copy("distance", SampleField::Distance),
    FieldRule::copy("enhanced_altitude", SampleField::Ele),
    FieldRule::copy("enhanced_speed", SampleField::Speed),
    FieldRule::copy("heart_rate", SampleField::HeartRate),
];

fn rule_for<'r, T>(rules: &'r [FieldRule<T>], name: &str) -> Option<&'r FieldRule<T>> {
    rules.iter().find(|r| r.source == name)
}

/// `2021-05-01T12:00:00+00:00` → `2021-05-01 12:00:00`. Alt annet er en feil.
pub fn reformat_timestamp(field: &str, value: &Value) -> Result<Value, ConvertError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ConvertError::malformed(field, value, "expected a timestamp string"))?;
    let parsed = NaiveDateTime::parse_from_str(raw, SOURCE_TIMESTAMP_FORMAT).map_err(|e| {
        ConvertError::malformed(
            field,
            value,
            format!("expected {SOURCE_TIMESTAMP_FORMAT}: {e}"),
        )
    })?;
    Ok(Value::String(parsed.format(SAMPLE_TIMESTAMP_FORMAT).to_string()))
}

/// Last-wins; en overskriving med ny verdi logges.
fn overwrite(slot: &mut Option<Value>, key: &str, value: Value) {
    if let Some(previous) = slot.as_ref() {
        if *previous != value {
            debug!("duplicate `{key}`: {previous} replaced by {value}");
        }
    }
    *slot = Some(value);
}

impl SessionTotals {
    fn with(mut self, field: TotalsField, value: Value) -> Self {
        let (slot, key) = match field {
            TotalsField::TotalTime => (&mut self.total_time_in_sec, "total_time_in_sec"),
            TotalsField::TotalDistance => (&mut self.total_dist_in_km, "total_dist_in_km"),
            TotalsField::AvgSpeed => (&mut self.avg_speed_in_kmh, "avg_speed_in_kmh"),
            TotalsField::AvgHeartRate => (&mut self.avg_heart_rate, "avg_heart_rate"),
        };
        overwrite(slot, key, value);
        self
    }
}

impl Sample {
    fn new(activity_uuid: &str) -> Self {
        Self {
            activity_uuid: activity_uuid.to_string(),
            ..Default::default()
        }
    }

    fn with(mut self, field: SampleField, value: Value) -> Self {
        let (slot, key) = match field {
            SampleField::Timestamp => (&mut self.timestamp, "timestamp"),
            SampleField::Lat => (&mut self.lat, "lat"),
            SampleField::Lon => (&mut self.lon, "lon"),
            SampleField::Distance => (&mut self.distance, "distance"),
            SampleField::Ele => (&mut self.ele, "ele"),
            SampleField::Speed => (&mut self.speed, "speed"),
            SampleField::HeartRate => (&mut self.heart_rate, "heart_rate"),
        };
        overwrite(slot, key, value);
        self
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// SCAN
// ──────────────────────────────────────────────────────────────────────────────

fn data_messages<'a>(frames: &'a [Value], name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    frames.iter().filter(move |f| {
        f.get("frame_type").and_then(Value::as_str) == Some("data_message")
            && f.get("name").and_then(Value::as_str) == Some(name)
    })
}

/// (navn, verdi) for hvert felt i meldingen; felt uten navn hoppes over.
fn fields(frame: &Value) -> impl Iterator<Item = (&str, &Value)> {
    frame
        .get("fields")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|field| {
            let name = field.get("name")?.as_str()?;
            Some((name, field.get("value").unwrap_or(&NULL)))
        })
}

fn summarize(frames: &[Value]) -> Result<SessionTotals, ConvertError> {
    let mut sessions = 0usize;
    let totals = data_messages(frames, "session")
        .inspect(|_| sessions += 1)
        .flat_map(fields)
        .try_fold(SessionTotals::default(), |totals, (name, value)| -> Result<_, ConvertError> {
            match rule_for(SESSION_RULES, name) {
                Some(rule) => Ok(totals.with(rule.target, rule.apply(value)?)),
                None => Ok(totals),
            }
        })?;
    if sessions == 0 {
        info!("no session message found, summary carries no totals");
    } else if sessions > 1 {
        debug!("{sessions} session messages found, last one wins");
    }
    Ok(totals)
}

fn sample_from(frame: &Value, activity_id: &str) -> Result<Sample, ConvertError> {
    fields(frame).try_fold(Sample::new(activity_id), |sample, (name, value)| {
        match rule_for(RECORD_RULES, name) {
            Some(rule) => Ok(sample.with(rule.target, rule.apply(value)?)),
            None => Ok(sample),
        }
    })
}

/// Reduserer projiserte frames til et aktivitetsdokument.
///
/// To uavhengige pass: sammendrag fra `session`, samples fra hver `record`.
/// Et ugyldig tidsstempel i en record stopper hele konverteringen.
pub fn reduce(
    frames: &[Value],
    activity_id: &str,
    converter: &str,
) -> Result<ActivitySummary, ConvertError> {
    let totals = summarize(frames)?;
    let records = data_messages(frames, "record")
        .map(|frame| sample_from(frame, activity_id))
        .collect::<Result<Vec<_>, _>>()?;

    metrics::global().records_reduced_total.inc_by(records.len() as u64);

    Ok(ActivitySummary {
        uuid: activity_id.to_string(),
        converter: converter.to_string(),
        totals,
        records,
    })
}

/// Som [`reduce`], men fra en projisert JSON-streng.
pub fn reduce_json(
    projected: &str,
    activity_id: &str,
    converter: &str,
) -> Result<ActivitySummary, ConvertError> {
    let frames: Vec<Value> = serde_json::from_str(projected)?;
    reduce(&frames, activity_id, converter)
}
