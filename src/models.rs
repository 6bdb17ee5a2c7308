use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backend::BackendConnector;
use crate::session::SessionRegistry;
use crate::time::{self, FormatError};
use crate::workflow::Paging;

#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn BackendConnector>,
    pub sessions: Arc<SessionRegistry>,
    pub paging: Paging,
}

/* -------------------------
   Domain enums
--------------------------*/

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    Consultation,
    FollowUp,
    Assessment,
    SurgicalScheduling,
}

impl AppointmentKind {
    pub const ALL: [AppointmentKind; 4] = [
        AppointmentKind::Consultation,
        AppointmentKind::FollowUp,
        AppointmentKind::Assessment,
        AppointmentKind::SurgicalScheduling,
    ];

    /// Pre-filled duration for the booking form. Never enforced.
    pub fn default_duration(self) -> u32 {
        match self {
            AppointmentKind::Consultation => 60,
            AppointmentKind::FollowUp => 30,
            AppointmentKind::Assessment => 45,
            AppointmentKind::SurgicalScheduling => 60,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentKind::Consultation => "consultation",
            AppointmentKind::FollowUp => "follow_up",
            AppointmentKind::Assessment => "assessment",
            AppointmentKind::SurgicalScheduling => "surgical_scheduling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

/// Status filter for calendar views. `"all"` disables filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatusFilter {
    #[default]
    All,
    Only(AppointmentStatus),
}

impl StatusFilter {
    pub fn matches(self, status: AppointmentStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(s) => s == status,
        }
    }
}

impl TryFrom<String> for StatusFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let v = value.trim().to_lowercase();
        let filter = match v.as_str() {
            "" | "all" => StatusFilter::All,
            "pending" => StatusFilter::Only(AppointmentStatus::Pending),
            "confirmed" => StatusFilter::Only(AppointmentStatus::Confirmed),
            "completed" => StatusFilter::Only(AppointmentStatus::Completed),
            "cancelled" => StatusFilter::Only(AppointmentStatus::Cancelled),
            _ => return Err(format!("unknown status filter: {value}")),
        };
        Ok(filter)
    }
}

impl From<StatusFilter> for String {
    fn from(f: StatusFilter) -> Self {
        match f {
            StatusFilter::All => "all".to_string(),
            StatusFilter::Only(s) => s.as_str().to_string(),
        }
    }
}

/* -------------------------
   Appointment
--------------------------*/

/// Canonical in-memory appointment.
///
/// Values are replaced wholesale on edit; an edit keeps the same `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub practitioner_id: Option<String>,
    pub kind: AppointmentKind,
    pub date: NaiveDate,
    /// `HH:MM`, 24h
    pub start_time: String,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl Appointment {
    pub fn is_cancelled(&self) -> bool {
        self.status == AppointmentStatus::Cancelled
    }

    /// Half-open `[start, end)` interval in minutes since midnight. Widened
    /// to `u64`: durations are unbounded.
    pub fn interval(&self) -> Result<(u64, u64), FormatError> {
        let start = u64::from(time::to_minutes(&self.start_time)?);
        Ok((start, start + u64::from(self.duration_minutes)))
    }

    pub fn end_time(&self) -> Result<String, FormatError> {
        time::add_minutes(&self.start_time, i64::from(self.duration_minutes))
    }

    /// Body sent to the backend create/update endpoints.
    pub fn to_payload(&self) -> AppointmentPayload {
        AppointmentPayload {
            patient_id: self.patient_id.clone(),
            practitioner_id: self.practitioner_id.clone(),
            date_time: format!("{} {}:00", self.date.format("%Y-%m-%d"), self.start_time),
            duration_minutes: self.duration_minutes,
            status: self.status.as_str(),
            kind: self.kind.as_str(),
            notes: self.notes.clone(),
        }
    }
}

/// Appointment as typed into the booking form, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentDraft {
    /// Set when editing an existing appointment.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub practitioner_id: Option<String>,
    #[serde(default)]
    pub kind: Option<AppointmentKind>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentPayload {
    pub patient_id: String,
    pub practitioner_id: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS`
    pub date_time: String,
    pub duration_minutes: u32,
    pub status: &'static str,
    pub kind: &'static str,
    pub notes: Option<String>,
}

/* -------------------------
   Patient (external contract)
--------------------------*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub nombres: String,
    pub apellidos: String,
    pub documento: String,
    pub telefono: Option<String>,
    pub email: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombres.trim(), self.apellidos.trim())
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KindInfo {
    pub kind: AppointmentKind,
    pub default_duration_minutes: u32,
}

pub fn kind_catalogue() -> Vec<KindInfo> {
    AppointmentKind::ALL
        .iter()
        .map(|&kind| KindInfo {
            kind,
            default_duration_minutes: kind.default_duration(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Appointment {
        Appointment {
            id: "7".into(),
            patient_id: "p1".into(),
            practitioner_id: Some("u1".into()),
            kind: AppointmentKind::FollowUp,
            date: NaiveDate::from_ymd_opt(2024, 11, 20).unwrap(),
            start_time: "09:30".into(),
            duration_minutes: 30,
            status: AppointmentStatus::Confirmed,
            notes: None,
        }
    }

    #[test]
    fn default_durations() {
        assert_eq!(AppointmentKind::Consultation.default_duration(), 60);
        assert_eq!(AppointmentKind::FollowUp.default_duration(), 30);
        assert_eq!(AppointmentKind::Assessment.default_duration(), 45);
        assert_eq!(AppointmentKind::SurgicalScheduling.default_duration(), 60);
    }

    #[test]
    fn interval_and_end_time() {
        let a = sample();
        assert_eq!(a.interval().unwrap(), (570, 600));
        assert_eq!(a.end_time().unwrap(), "10:00");
    }

    #[test]
    fn interval_of_huge_duration_does_not_wrap() {
        let mut a = sample();
        a.duration_minutes = u32::MAX;
        assert_eq!(a.interval().unwrap(), (570, 570 + u64::from(u32::MAX)));
    }

    #[test]
    fn payload_uses_combined_date_time() {
        let p = sample().to_payload();
        assert_eq!(p.date_time, "2024-11-20 09:30:00");
        assert_eq!(p.status, "confirmed");
        assert_eq!(p.kind, "follow_up");
    }

    #[test]
    fn status_filter_from_strings() {
        let all: StatusFilter = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(all, StatusFilter::All);
        let conf: StatusFilter = serde_json::from_str("\"Confirmed\"").unwrap();
        assert_eq!(conf, StatusFilter::Only(AppointmentStatus::Confirmed));
        assert!(serde_json::from_str::<StatusFilter>("\"maybe\"").is_err());
        assert!(StatusFilter::All.matches(AppointmentStatus::Cancelled));
        assert!(!conf.matches(AppointmentStatus::Pending));
    }

    #[test]
    fn patient_full_name_trims() {
        let p = Patient {
            id: "1".into(),
            nombres: " Ana ".into(),
            apellidos: "Pérez".into(),
            documento: "123".into(),
            telefono: None,
            email: None,
        };
        assert_eq!(p.full_name(), "Ana Pérez");
    }
}
