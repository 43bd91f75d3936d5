//! Dashboard aggregates over stored session records.
//!
//! Everything here is a pure function of the records and a reference `now`,
//! so the caller decides which clock and which store they came from.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::models::SessionRecord;
use crate::pose::Intensity;

const WINDOW_DAYS: i64 = 7;

fn in_window(record: &SessionRecord, now: DateTime<Utc>) -> bool {
    record.date >= now - Duration::days(WINDOW_DAYS)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyPoint {
    pub date: NaiveDate,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyMinutes {
    pub date: NaiveDate,
    pub minutes: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CaloriesSplit {
    pub light: f64,
    pub medium: f64,
    pub intense: f64,
    pub total: f64,
}

pub fn weekly_minutes(records: &[SessionRecord], now: DateTime<Utc>) -> f64 {
    records
        .iter()
        .filter(|r| in_window(r, now))
        .map(|r| r.minutes)
        .sum()
}

pub fn accuracy_history(records: &[SessionRecord], now: DateTime<Utc>) -> Vec<AccuracyPoint> {
    let mut recent: Vec<&SessionRecord> = records.iter().filter(|r| in_window(r, now)).collect();
    recent.sort_by_key(|r| r.date);
    recent
        .into_iter()
        .map(|r| AccuracyPoint {
            date: r.date.date_naive(),
            accuracy: r.accuracy,
        })
        .collect()
}

/// Rounded mean accuracy over all records; 0 when there are none.
pub fn average_accuracy(records: &[SessionRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let total: f64 = records.iter().map(|r| r.accuracy).sum();
    (total / records.len() as f64).round()
}

pub fn calories_split(records: &[SessionRecord], now: DateTime<Utc>) -> CaloriesSplit {
    let mut split = CaloriesSplit::default();
    for record in records.iter().filter(|r| in_window(r, now)) {
        match record.intensity {
            Intensity::Light => split.light += record.calories,
            Intensity::Medium => split.medium += record.calories,
            Intensity::Intense => split.intense += record.calories,
        }
        split.total += record.calories;
    }
    split
}

/// Minutes per calendar day for today and the six days before it, oldest
/// first, with empty days reported as zero.
pub fn daily_minutes(records: &[SessionRecord], now: DateTime<Utc>) -> Vec<DailyMinutes> {
    let today = now.date_naive();
    (0..WINDOW_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let minutes = records
                .iter()
                .filter(|r| in_window(r, now) && r.date.date_naive() == date)
                .map(|r| r.minutes)
                .sum();
            DailyMinutes { date, minutes }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub weekly_minutes: f64,
    pub average_accuracy: f64,
    pub accuracy_history: Vec<AccuracyPoint>,
    pub calories: CaloriesSplit,
    pub daily_minutes: Vec<DailyMinutes>,
    pub session_count: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

impl ProgressReport {
    pub fn build(
        records: &[SessionRecord],
        now: DateTime<Utc>,
        last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            weekly_minutes: weekly_minutes(records, now),
            average_accuracy: average_accuracy(records),
            accuracy_history: accuracy_history(records, now),
            calories: calories_split(records, now),
            daily_minutes: daily_minutes(records, now),
            session_count: records.len(),
            last_updated,
        }
    }
}
