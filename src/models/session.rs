use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pose::{Intensity, PoseClass};

/// One completed hold, as persisted in the session store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub pose: PoseClass,
    pub minutes: f64,
    /// Mean accuracy over the hold, 0-100.
    pub accuracy: f64,
    pub calories: f64,
    pub date: DateTime<Utc>,
    pub intensity: Intensity,
}
