// src/projector.rs

//! Read models for the calendar: sorted day lists, month grid, per-day
//! partition and counters. Dates are timezone-naive local dates.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::models::{Appointment, AppointmentStatus, StatusFilter};
use crate::time;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    /// Weekday of the 1st, Sunday = 0.
    pub first_weekday_offset: u32,
    pub days: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaySummary {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

/// Unreadable start times sort last.
fn sort_key(a: &Appointment) -> u32 {
    time::to_minutes(&a.start_time).unwrap_or(u32::MAX)
}

fn sort_by_start(list: &mut [Appointment]) {
    // stable: equal start times keep input order
    list.sort_by_key(sort_key);
}

/// Appointments on `date` passing `filter`, ascending by start time.
pub fn appointments_on_date(
    date: NaiveDate,
    all: &[Appointment],
    filter: StatusFilter,
) -> Vec<Appointment> {
    let mut day: Vec<Appointment> = all
        .iter()
        .filter(|a| a.date == date && filter.matches(a.status))
        .cloned()
        .collect();
    sort_by_start(&mut day);
    day
}

fn days_in_month(year: i32, month: u32) -> u32 {
    (28..=31)
        .rev()
        .find(|&d| NaiveDate::from_ymd_opt(year, month, d).is_some())
        .unwrap_or(28)
}

/// Proleptic Gregorian month containing `date`.
pub fn month_grid(date: NaiveDate) -> MonthGrid {
    let first = date - Duration::days(i64::from(date.day0()));
    let days_in_month = days_in_month(date.year(), date.month());
    MonthGrid {
        year: date.year(),
        month: date.month(),
        days_in_month,
        first_weekday_offset: first.weekday().num_days_from_sunday(),
        days: first.iter_days().take(days_in_month as usize).collect(),
    }
}

/// Every day of the grid mapped to its sorted, filtered appointments.
/// Days without appointments map to an empty list.
pub fn appointments_by_day(
    grid: &MonthGrid,
    all: &[Appointment],
    filter: StatusFilter,
) -> BTreeMap<NaiveDate, Vec<Appointment>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<Appointment>> =
        grid.days.iter().map(|d| (*d, Vec::new())).collect();

    for a in all.iter().filter(|a| filter.matches(a.status)) {
        if let Some(list) = by_day.get_mut(&a.date) {
            list.push(a.clone());
        }
    }
    for list in by_day.values_mut() {
        sort_by_start(list);
    }
    by_day
}

pub fn day_summary(date: NaiveDate, all: &[Appointment]) -> DaySummary {
    all.iter()
        .filter(|a| a.date == date)
        .fold(DaySummary::default(), |mut s, a| {
            s.total += 1;
            match a.status {
                AppointmentStatus::Pending => s.pending += 1,
                AppointmentStatus::Confirmed => s.confirmed += 1,
                AppointmentStatus::Completed => s.completed += 1,
                AppointmentStatus::Cancelled => s.cancelled += 1,
            }
            s
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentKind;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn appt(id: &str, date: NaiveDate, start: &str, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: id.into(),
            patient_id: "p".into(),
            practitioner_id: None,
            kind: AppointmentKind::Consultation,
            date,
            start_time: start.into(),
            duration_minutes: 30,
            status,
            notes: None,
        }
    }

    fn ids(list: &[Appointment]) -> Vec<&str> {
        list.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn day_is_sorted_and_stable() {
        let day = d(2024, 11, 20);
        let all = vec![
            appt("A", day, "10:30", AppointmentStatus::Pending),
            appt("B", day, "09:00", AppointmentStatus::Pending),
            appt("C", day, "09:00", AppointmentStatus::Confirmed),
        ];
        let out = appointments_on_date(day, &all, StatusFilter::All);
        assert_eq!(ids(&out), ["B", "C", "A"]);
    }

    #[test]
    fn day_filters_date_and_status() {
        let day = d(2024, 11, 20);
        let all = vec![
            appt("A", day, "08:00", AppointmentStatus::Cancelled),
            appt("B", day, "09:00", AppointmentStatus::Confirmed),
            appt("C", d(2024, 11, 21), "07:00", AppointmentStatus::Confirmed),
        ];
        let confirmed = appointments_on_date(day, &all, StatusFilter::Only(AppointmentStatus::Confirmed));
        assert_eq!(ids(&confirmed), ["B"]);
        assert_eq!(ids(&appointments_on_date(day, &all, StatusFilter::All)), ["A", "B"]);
    }

    #[test]
    fn projection_is_idempotent() {
        let day = d(2024, 11, 20);
        let all = vec![
            appt("A", day, "11:00", AppointmentStatus::Pending),
            appt("B", day, "08:15", AppointmentStatus::Pending),
        ];
        let first = appointments_on_date(day, &all, StatusFilter::All);
        let second = appointments_on_date(day, &all, StatusFilter::All);
        assert_eq!(first, second);
    }

    #[test]
    fn unreadable_start_sorts_last() {
        let day = d(2024, 11, 20);
        let all = vec![
            appt("bad", day, "??", AppointmentStatus::Pending),
            appt("ok", day, "23:00", AppointmentStatus::Pending),
        ];
        assert_eq!(ids(&appointments_on_date(day, &all, StatusFilter::All)), ["ok", "bad"]);
    }

    #[test]
    fn month_grid_metadata() {
        // 1 Nov 2024 was a Friday
        let g = month_grid(d(2024, 11, 20));
        assert_eq!(g.days_in_month, 30);
        assert_eq!(g.first_weekday_offset, 5);
        assert_eq!(g.days.first(), Some(&d(2024, 11, 1)));
        assert_eq!(g.days.last(), Some(&d(2024, 11, 30)));

        assert_eq!(month_grid(d(2024, 2, 10)).days_in_month, 29);
        assert_eq!(month_grid(d(2023, 2, 10)).days_in_month, 28);
        // 1 Sep 2024 was a Sunday
        assert_eq!(month_grid(d(2024, 9, 30)).first_weekday_offset, 0);
        assert_eq!(month_grid(d(2024, 12, 31)).days_in_month, 31);
    }

    #[test]
    fn partition_covers_every_day() {
        let grid = month_grid(d(2024, 11, 1));
        let all = vec![
            appt("late", d(2024, 11, 3), "15:00", AppointmentStatus::Pending),
            appt("early", d(2024, 11, 3), "08:00", AppointmentStatus::Pending),
            appt("gone", d(2024, 11, 3), "09:00", AppointmentStatus::Cancelled),
            appt("december", d(2024, 12, 1), "08:00", AppointmentStatus::Pending),
        ];
        let by_day = appointments_by_day(&grid, &all, StatusFilter::Only(AppointmentStatus::Pending));
        assert_eq!(by_day.len(), 30);
        assert_eq!(ids(&by_day[&d(2024, 11, 3)]), ["early", "late"]);
        assert!(by_day[&d(2024, 11, 4)].is_empty());
        assert!(!by_day.contains_key(&d(2024, 12, 1)));
    }

    #[test]
    fn summary_counts_statuses() {
        let day = d(2024, 11, 20);
        let all = vec![
            appt("1", day, "08:00", AppointmentStatus::Pending),
            appt("2", day, "09:00", AppointmentStatus::Confirmed),
            appt("3", day, "10:00", AppointmentStatus::Confirmed),
            appt("4", day, "11:00", AppointmentStatus::Cancelled),
            appt("5", d(2024, 11, 21), "11:00", AppointmentStatus::Completed),
        ];
        let s = day_summary(day, &all);
        assert_eq!(
            s,
            DaySummary { total: 4, pending: 1, confirmed: 2, completed: 0, cancelled: 1 }
        );
    }
}
