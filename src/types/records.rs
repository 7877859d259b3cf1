//! Stage output records: anomaly, diagnosis, schedule, feedback, and the
//! manufacturing analytics payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discrete severity grading for a diagnosis.
///
/// Ordering matters: the executor's one conditional edge routes to scheduling
/// when severity is at least `Medium`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeverityLevel::Low => write!(f, "low"),
            SeverityLevel::Medium => write!(f, "medium"),
            SeverityLevel::High => write!(f, "high"),
        }
    }
}

impl SeverityLevel {
    /// Whether this severity warrants customer engagement and scheduling.
    pub fn is_actionable(self) -> bool {
        self >= SeverityLevel::Medium
    }
}

/// Detected anomaly for one metric. Zero-to-many per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub metric_name: String,
    /// Normalized anomaly strength in [0, 1].
    pub severity: f64,
    /// Raw per-feature reconstruction error (>= 0 for finite inputs).
    pub error: f64,
    pub explanation: String,
}

/// Diagnosis outcome derived from the single highest-severity anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    pub part_id: String,
    pub part_name: String,
    /// In [0.5, 1.0], monotonically increasing with severity.
    pub confidence: f64,
    /// In [1.0, 60.0], inversely related to severity.
    pub estimated_days_to_failure: f64,
    pub severity_level: SeverityLevel,
    pub issue_category: String,
    /// Metric names of every contributing anomaly, in detection order.
    pub supporting_metrics: Vec<String>,
}

/// Workshop allocation. Present only for medium/high severity diagnoses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub workshop_id: String,
    pub workshop_name: String,
    pub slot_time: DateTime<Utc>,
    pub mechanic_id: String,
    /// Mirrors the diagnosis severity level.
    pub priority_tag: SeverityLevel,
}

/// Simulated post-service feedback, deterministic per vehicle id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// In [3.5, 5.0], rounded to two decimals.
    pub customer_rating: f64,
    pub customer_comments: String,
    pub workshop_comments: String,
    /// In [2.0, 5.0] hours, rounded to one decimal.
    pub repair_time_hours: f64,
    pub diagnosis_correct: bool,
}

/// Flattened summary destined for OEM/manufacturing analytics sinks.
///
/// Every upstream record is optional at build time; missing fields take
/// the sentinel defaults documented on the manufacturing stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingPayload {
    pub vehicle_id: String,
    pub model: String,
    pub supplier_id: String,
    pub customer_id: String,
    pub user_segment: String,
    pub failure_part_id: String,
    pub failure_part_name: String,
    pub issue_category: String,
    pub workshop_id: String,
    pub repair_time_hours: f64,
    pub diagnosis_correct: bool,
    /// Generation wall-clock time, RFC 3339 so it round-trips as text.
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(SeverityLevel::Low < SeverityLevel::Medium);
        assert!(SeverityLevel::Medium < SeverityLevel::High);
        assert!(!SeverityLevel::Low.is_actionable());
        assert!(SeverityLevel::Medium.is_actionable());
        assert!(SeverityLevel::High.is_actionable());
    }

    #[test]
    fn test_severity_display_and_serde_agree() {
        for level in [
            SeverityLevel::Low,
            SeverityLevel::Medium,
            SeverityLevel::High,
        ] {
            let json = serde_json::to_string(&level).expect("serialize");
            assert_eq!(json, format!("\"{level}\""));
        }
    }

    #[test]
    fn test_schedule_record_roundtrip() {
        let record = ScheduleRecord {
            workshop_id: "W001".into(),
            workshop_name: "City Central Auto".into(),
            slot_time: Utc::now(),
            mechanic_id: "M-1001".into(),
            priority_tag: SeverityLevel::High,
        };
        let json = serde_json::to_string(&record).expect("serialize");
        let back: ScheduleRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }
}
