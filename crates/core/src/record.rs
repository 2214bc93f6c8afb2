use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::RecordId;

/// Morphometric measurements supplied by the scoring collaborator.
/// The store keeps them as-is; range checks happen upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub body_length: f64,
    pub height: f64,
    pub chest_width: f64,
    pub rump_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalRecord {
    pub id: RecordId,
    pub animal_id: String,
    pub date: DateTime<Utc>,
    pub image_path: String,
    #[serde(flatten)]
    pub measurements: Measurements,
    pub atc_score: i32,
    pub synced: bool,
}

impl AnimalRecord {
    /// Build an unassigned, unsynced record ready for insert.
    pub fn new(
        animal_id: impl Into<String>,
        date: DateTime<Utc>,
        image_path: impl Into<String>,
        measurements: Measurements,
        atc_score: i32,
    ) -> Self {
        Self {
            id: RecordId::UNASSIGNED,
            animal_id: animal_id.into(),
            date: truncate_to_millis(date),
            image_path: image_path.into(),
            measurements,
            atc_score,
            synced: false,
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = id;
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.animal_id.trim().is_empty() {
            return Err(CoreError::InvalidRecord("animal_id must not be empty".into()));
        }
        Ok(())
    }
}

/// Dates are persisted as UTC epoch milliseconds.
pub fn date_to_millis(date: &DateTime<Utc>) -> i64 {
    date.timestamp_millis()
}

pub fn date_from_millis(millis: i64) -> Result<DateTime<Utc>, CoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| CoreError::InvalidData(format!("timestamp out of range: {millis}")))
}

fn truncate_to_millis(date: DateTime<Utc>) -> DateTime<Utc> {
    date_from_millis(date_to_millis(&date)).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurements() -> Measurements {
        Measurements {
            body_length: 142.5,
            height: 131.0,
            chest_width: 58.25,
            rump_angle: 12.0,
        }
    }

    #[test]
    fn new_record_is_unassigned_and_unsynced() {
        let record = AnimalRecord::new("COW-1", Utc::now(), "/img/a.jpg", measurements(), 72);
        assert!(!record.id.is_assigned());
        assert!(!record.synced);
        assert_eq!(record.atc_score, 72);
    }

    #[test]
    fn new_truncates_date_to_millis() {
        let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let record = AnimalRecord::new("COW-1", precise, "/img/a.jpg", measurements(), 72);
        assert_eq!(record.date.timestamp_subsec_nanos(), 123_000_000);
        assert_eq!(date_to_millis(&record.date), 1_700_000_000_123);
    }

    #[test]
    fn blank_animal_id_is_rejected() {
        let record = AnimalRecord::new("   ", Utc::now(), "/img/a.jpg", measurements(), 72);
        assert!(matches!(record.validate(), Err(CoreError::InvalidRecord(_))));

        let record = AnimalRecord::new("COW-1", Utc::now(), "", measurements(), 72);
        assert!(record.validate().is_ok());
    }

    #[test]
    fn millis_conversion_rejects_out_of_range() {
        assert!(date_from_millis(i64::MAX).is_err());
        let date = date_from_millis(0).unwrap();
        assert_eq!(date, Utc.timestamp_opt(0, 0).unwrap());
    }

    #[test]
    fn json_flattens_measurements() {
        let record = AnimalRecord::new(
            "COW-1",
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            "/img/a.jpg",
            measurements(),
            72,
        )
        .with_id(RecordId::new(3));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], 3);
        assert_eq!(value["body_length"], 142.5);
        assert_eq!(value["synced"], false);

        let back: AnimalRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
