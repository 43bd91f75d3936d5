use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{format_datetime, parse_datetime, parse_intensity, parse_optional_datetime, parse_pose},
};
use crate::models::SessionRecord;

pub const RECENT_WINDOW_DAYS: i64 = 7;

fn row_to_record(row: &Row) -> Result<SessionRecord> {
    let pose: String = row.get("pose")?;
    let date: String = row.get("date")?;
    let intensity: String = row.get("intensity")?;

    Ok(SessionRecord {
        id: row.get("id")?,
        pose: parse_pose(&pose)?,
        minutes: row.get("minutes")?,
        accuracy: row.get("accuracy")?,
        calories: row.get("calories")?,
        date: parse_datetime(&date, "date")?,
        intensity: parse_intensity(&intensity)?,
    })
}

impl Database {
    pub async fn append_session(&self, user_id: &str, record: &SessionRecord) -> Result<()> {
        let user_id = user_id.to_string();
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO practice_sessions (id, user_id, pose, minutes, accuracy, calories, date, intensity, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    user_id,
                    record.pose.as_str(),
                    record.minutes,
                    record.accuracy,
                    record.calories,
                    format_datetime(&record.date),
                    record.intensity.as_str(),
                    format_datetime(&Utc::now()),
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Every record for `user_id`, oldest first.
    pub async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pose, minutes, accuracy, calories, date, intensity
                 FROM practice_sessions
                 WHERE user_id = ?1
                 ORDER BY date ASC",
            )?;

            let mut rows = stmt.query(params![user_id])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn list_sessions_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, pose, minutes, accuracy, calories, date, intensity
                 FROM practice_sessions
                 WHERE user_id = ?1 AND date >= ?2
                 ORDER BY date ASC",
            )?;

            let mut rows = stmt.query(params![user_id, format_datetime(&since)])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn list_last_7_days(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionRecord>> {
        self.list_sessions_since(user_id, now - Duration::days(RECENT_WINDOW_DAYS))
            .await
    }

    /// Drops every record for `user_id`. Returns how many were removed.
    pub async fn reset_sessions(&self, user_id: &str) -> Result<usize> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let removed = conn.execute(
                "DELETE FROM practice_sessions WHERE user_id = ?1",
                params![user_id],
            )?;
            Ok(removed)
        })
        .await
    }

    /// When a record was last appended for `user_id`; `None` after a reset.
    pub async fn last_updated(&self, user_id: &str) -> Result<Option<DateTime<Utc>>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let latest: Option<String> = conn.query_row(
                "SELECT MAX(created_at) FROM practice_sessions WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            parse_optional_datetime(latest, "created_at")
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Intensity, PoseClass};
    use chrono::TimeZone;

    fn record(id: &str, date: DateTime<Utc>, accuracy: f64) -> SessionRecord {
        SessionRecord {
            id: id.into(),
            pose: PoseClass::Tree,
            minutes: 0.5,
            accuracy,
            calories: 1.0,
            date,
            intensity: Intensity::Light,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_list_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let r = record("a", now(), 87.0);
        db.append_session("ana", &r).await.unwrap();

        let listed = db.list_sessions("ana").await.unwrap();
        assert_eq!(listed, vec![r]);
    }

    #[tokio::test]
    async fn test_zero_accuracy_is_stored() {
        let db = Database::open_in_memory().unwrap();
        db.append_session("ana", &record("z", now(), 0.0))
            .await
            .unwrap();
        assert_eq!(db.list_sessions("ana").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_last_7_days_window() {
        let db = Database::open_in_memory().unwrap();
        db.append_session("ana", &record("old", now() - Duration::days(8), 50.0))
            .await
            .unwrap();
        db.append_session("ana", &record("edge", now() - Duration::days(7), 60.0))
            .await
            .unwrap();
        db.append_session("ana", &record("new", now() - Duration::hours(2), 70.0))
            .await
            .unwrap();

        let recent = db.list_last_7_days("ana", now()).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["edge", "new"]);
    }

    #[tokio::test]
    async fn test_records_are_scoped_per_user() {
        let db = Database::open_in_memory().unwrap();
        db.append_session("ana", &record("a", now(), 80.0))
            .await
            .unwrap();
        db.append_session("ben", &record("b", now(), 90.0))
            .await
            .unwrap();

        let removed = db.reset_sessions("ana").await.unwrap();
        assert_eq!(removed, 1);
        assert!(db.list_sessions("ana").await.unwrap().is_empty());
        assert_eq!(db.list_sessions("ben").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_last_updated_cleared_by_reset() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.last_updated("ana").await.unwrap(), None);

        db.append_session("ana", &record("a", now(), 80.0))
            .await
            .unwrap();
        assert!(db.last_updated("ana").await.unwrap().is_some());

        db.reset_sessions("ana").await.unwrap();
        assert_eq!(db.last_updated("ana").await.unwrap(), None);
    }
}
