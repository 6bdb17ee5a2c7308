// src/normalize.rs

//! Best-effort decoding of backend payloads into canonical agenda values.
//!
//! Upstream field names and response envelopes are not contractually fixed,
//! so every lookup tries a list of known names in priority order and a bad
//! record degrades to a partially-defaulted value instead of failing the batch.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentKind, AppointmentStatus, Patient};
use crate::time;

pub const APPOINTMENT_ENVELOPE_KEYS: &[&str] = &["citas", "appointments", "data"];
pub const PATIENT_ENVELOPE_KEYS: &[&str] = &["pacientes", "patients", "data"];

/* ============================================================
   Envelopes
   ============================================================ */

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Bare(Vec<Value>),
    Keyed { key: String, records: Vec<Value> },
    Unrecognized,
}

impl Envelope {
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Envelope::Bare(records) | Envelope::Keyed { records, .. } => records,
            Envelope::Unrecognized => Vec::new(),
        }
    }
}

/// Shapes tried, in order: bare array, `preferred_keys` holding an array,
/// `data` holding a nested envelope, then the first array-valued key.
pub fn decode_envelope(value: Value, preferred_keys: &[&str]) -> Envelope {
    let mut obj = match value {
        Value::Array(records) => return Envelope::Bare(records),
        Value::Object(obj) => obj,
        _ => return Envelope::Unrecognized,
    };

    for key in preferred_keys {
        if matches!(obj.get(*key), Some(Value::Array(_))) {
            if let Some(Value::Array(records)) = obj.remove(*key) {
                return Envelope::Keyed {
                    key: (*key).to_string(),
                    records,
                };
            }
        }
    }

    if let Some(inner @ Value::Object(_)) = obj.get("data") {
        let nested = decode_envelope(inner.clone(), preferred_keys);
        if nested != Envelope::Unrecognized {
            return nested;
        }
    }

    // serde_json keeps insertion order (preserve_order), so "first" is the
    // first key the backend wrote.
    let first_array_key = obj
        .iter()
        .find(|(_, v)| v.is_array())
        .map(|(k, _)| k.clone());
    if let Some(key) = first_array_key {
        if let Some(Value::Array(records)) = obj.remove(&key) {
            return Envelope::Keyed { key, records };
        }
    }

    Envelope::Unrecognized
}

/* ============================================================
   Classification tables
   ============================================================ */

/// Lower-case substring -> status. First match wins; no match means Pending.
const STATUS_PATTERNS: &[(&str, AppointmentStatus)] = &[
    ("cancel", AppointmentStatus::Cancelled),
    ("anulad", AppointmentStatus::Cancelled),
    ("confirm", AppointmentStatus::Confirmed),
    ("complet", AppointmentStatus::Completed),
    ("finaliz", AppointmentStatus::Completed),
    ("atendid", AppointmentStatus::Completed),
    ("done", AppointmentStatus::Completed),
    ("pend", AppointmentStatus::Pending),
];

/// Lower-case substring -> kind. No match means Consultation.
const KIND_PATTERNS: &[(&str, AppointmentKind)] = &[
    ("cirug", AppointmentKind::SurgicalScheduling),
    ("quir", AppointmentKind::SurgicalScheduling),
    ("surg", AppointmentKind::SurgicalScheduling),
    ("seguim", AppointmentKind::FollowUp),
    ("control", AppointmentKind::FollowUp),
    ("follow", AppointmentKind::FollowUp),
    ("valora", AppointmentKind::Assessment),
    ("evalua", AppointmentKind::Assessment),
    ("assess", AppointmentKind::Assessment),
    ("consult", AppointmentKind::Consultation),
];

fn classify<T: Copy>(raw: &str, table: &[(&str, T)], fallback: T) -> T {
    let needle = raw.to_lowercase();
    table
        .iter()
        .find(|(pattern, _)| needle.contains(pattern))
        .map(|&(_, v)| v)
        .unwrap_or(fallback)
}

pub fn classify_status(raw: &str) -> AppointmentStatus {
    classify(raw, STATUS_PATTERNS, AppointmentStatus::Pending)
}

pub fn classify_kind(raw: &str) -> AppointmentKind {
    classify(raw, KIND_PATTERNS, AppointmentKind::Consultation)
}

/* ============================================================
   Field helpers
   ============================================================ */

/// First non-null value among `names`.
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|n| obj.get(*n))
        .find(|v| !v.is_null())
}

/// Strings (trimmed, non-empty) and numbers as text.
fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| obj.get(*n))
        .find_map(as_text)
}

/// Reference id either as a flat field or as `{ "<nested>": { "id": .. } }`.
fn reference_id(obj: &Map<String, Value>, flat: &[&str], nested: &[&str]) -> Option<String> {
    text(obj, flat).or_else(|| {
        nested
            .iter()
            .filter_map(|n| obj.get(*n).and_then(Value::as_object))
            .find_map(|inner| text(inner, &["id", "_id"]))
    })
}

fn positive_minutes(v: &Value) -> Option<u32> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n >= 1.0 && n <= f64::from(u32::MAX)).then(|| n as u32)
}

/// `H:MM`, `HH:MM`, `HH:MM:SS`, `HH:MM:SS.sssZ`, `HH:MM+02:00` -> `HH:MM`.
pub fn normalize_time(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let mut parts = raw.splitn(3, ':');
    let h: u32 = parts.next()?.trim().parse().ok()?;
    let minute_field = parts.next()?;
    let m_digits: String = minute_field.chars().take_while(char::is_ascii_digit).collect();
    if m_digits.len() != 2 {
        return None;
    }
    let m: u32 = m_digits.parse().ok()?;
    (h < 24 && m < 60).then(|| format!("{h:02}:{m:02}"))
}

/// `YYYY-MM-DD` (possibly followed by a time) or `DD/MM/YYYY`.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Some(head) = raw.get(..10) {
        if let Ok(d) = time::parse_date(head) {
            return Some(d);
        }
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
}

/// Splits a combined `"YYYY-MM-DD HH:MM:SS"` or ISO-8601 value.
pub fn split_date_time(raw: &str) -> (Option<NaiveDate>, Option<String>) {
    let raw = raw.trim();
    match raw.split_once(['T', ' ']) {
        Some((d, t)) => (normalize_date(d), normalize_time(t)),
        None => (normalize_date(raw), None),
    }
}

pub fn placeholder_id() -> String {
    format!("tmp-{}", Uuid::new_v4())
}

/* ============================================================
   Appointments
   ============================================================ */

const ID_FIELDS: &[&str] = &["id", "cita_id", "appointment_id", "_id"];
const DATE_TIME_FIELDS: &[&str] = &["date_time", "fecha_hora", "datetime", "start_at", "scheduled_at"];
const DATE_FIELDS: &[&str] = &["date", "fecha", "appointment_date"];
const TIME_FIELDS: &[&str] = &["time", "hora", "start_time", "hora_inicio"];
const END_TIME_FIELDS: &[&str] = &["end_time", "hora_fin"];
const DURATION_FIELDS: &[&str] = &["duration_minutes", "duration", "duracion", "duracion_minutos"];
const STATUS_FIELDS: &[&str] = &["status", "estado"];
const KIND_FIELDS: &[&str] = &["kind", "type", "tipo", "appointment_type", "tipo_cita"];
const NOTES_FIELDS: &[&str] = &["notes", "notas", "observaciones"];

/// Maps one backend record to an [`Appointment`]. Never fails.
///
/// Date resolution: combined date-time field, then a separate date field,
/// then `today`. A missing time becomes `00:00`; a missing or non-positive
/// duration becomes the kind's default.
pub fn normalize_appointment(raw: &Value, today: NaiveDate) -> Appointment {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let (mut date, mut start_time) = match field(obj, DATE_TIME_FIELDS).and_then(Value::as_str) {
        Some(dt) => split_date_time(dt),
        None => (None, None),
    };
    if date.is_none() {
        date = text(obj, DATE_FIELDS).and_then(|d| normalize_date(&d));
    }
    if start_time.is_none() {
        start_time = text(obj, TIME_FIELDS).and_then(|t| normalize_time(&t));
    }

    let id = text(obj, ID_FIELDS).unwrap_or_else(placeholder_id);
    let date = date.unwrap_or_else(|| {
        tracing::debug!(appointment_id = %id, "no resolvable date, falling back to today");
        today
    });
    let start_time = start_time.unwrap_or_else(|| {
        tracing::debug!(appointment_id = %id, "no resolvable time, falling back to 00:00");
        "00:00".to_string()
    });

    let kind = text(obj, KIND_FIELDS)
        .map(|k| classify_kind(&k))
        .unwrap_or(AppointmentKind::Consultation);
    let status = text(obj, STATUS_FIELDS)
        .map(|s| classify_status(&s))
        .unwrap_or(AppointmentStatus::Pending);

    let duration_minutes = field(obj, DURATION_FIELDS)
        .and_then(positive_minutes)
        .or_else(|| duration_from_end(obj, &start_time))
        .unwrap_or_else(|| kind.default_duration());

    Appointment {
        patient_id: reference_id(obj, &["patient_id", "paciente_id", "patientId"], &["paciente", "patient"])
            .unwrap_or_default(),
        practitioner_id: reference_id(
            obj,
            &["practitioner_id", "usuario_id", "doctor_id", "medico_id", "user_id", "practitionerId"],
            &["usuario", "doctor", "medico", "practitioner"],
        ),
        notes: text(obj, NOTES_FIELDS),
        id,
        kind,
        date,
        start_time,
        duration_minutes,
        status,
    }
}

fn duration_from_end(obj: &Map<String, Value>, start_time: &str) -> Option<u32> {
    let end = text(obj, END_TIME_FIELDS).and_then(|t| normalize_time(&t))?;
    let start = time::to_minutes(start_time).ok()?;
    let end = time::to_minutes(&end).ok()?;
    (end > start).then(|| end - start)
}

/// Decodes any supported envelope and normalizes every record in it.
pub fn normalize_appointments(value: Value, today: NaiveDate) -> Vec<Appointment> {
    let envelope = decode_envelope(value, APPOINTMENT_ENVELOPE_KEYS);
    if envelope == Envelope::Unrecognized {
        tracing::warn!("unrecognized appointment envelope, treating as empty");
    }
    envelope
        .into_records()
        .iter()
        .map(|r| normalize_appointment(r, today))
        .collect()
}

/// Id of a freshly created appointment: `{id}`, `{data: {id}}`, `{cita: {id}}`, ...
pub fn created_id(response: &Value) -> Option<String> {
    let obj = response.as_object()?;
    text(obj, ID_FIELDS).or_else(|| obj.values().find_map(created_id))
}

/* ============================================================
   Patients
   ============================================================ */

pub fn normalize_patient(raw: &Value) -> Patient {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    Patient {
        id: text(obj, &["id", "paciente_id", "patient_id", "_id"]).unwrap_or_else(placeholder_id),
        nombres: text(obj, &["nombres", "nombre", "first_name"]).unwrap_or_default(),
        apellidos: text(obj, &["apellidos", "apellido", "last_name"]).unwrap_or_default(),
        documento: text(obj, &["documento", "document", "dni", "cedula"]).unwrap_or_default(),
        telefono: text(obj, &["telefono", "phone", "celular"]),
        email: text(obj, &["email", "correo"]),
    }
}

pub fn normalize_patients(value: Value) -> Vec<Patient> {
    let envelope = decode_envelope(value, PATIENT_ENVELOPE_KEYS);
    if envelope == Envelope::Unrecognized {
        tracing::warn!("unrecognized patient envelope, treating as empty");
    }
    envelope.into_records().iter().map(normalize_patient).collect()
}
