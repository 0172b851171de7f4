//! Workout history aggregation for the dashboard and progress views.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::WorkoutRecord;

/// Reporting window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressRange {
    /// Last 7 days
    Week,
    /// Last 30 days
    Month,
    All,
}

impl ProgressRange {
    /// Earliest start time included, `None` for all time
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ProgressRange::Week => Some(now - Duration::days(7)),
            ProgressRange::Month => Some(now - Duration::days(30)),
            ProgressRange::All => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgressRange::Week => "This Week",
            ProgressRange::Month => "This Month",
            ProgressRange::All => "All Time",
        }
    }
}

impl std::str::FromStr for ProgressRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" => Ok(ProgressRange::Week),
            "month" => Ok(ProgressRange::Month),
            "all" => Ok(ProgressRange::All),
            _ => Err(format!("Invalid range: {}", s)),
        }
    }
}

/// Aggregated figures over a range of workouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub range: ProgressRange,
    pub total_sessions: usize,
    pub total_distance_m: Decimal,
    /// Total distance rounded to 0.1 km
    pub total_distance_km: Decimal,
    pub avg_duration_seconds: Option<u64>,
    /// Mean over sessions that reported power
    pub avg_power_w: Option<Decimal>,
    /// Distance per calendar day (UTC)
    pub daily_distance_m: BTreeMap<NaiveDate, Decimal>,
}

impl ProgressSummary {
    pub fn from_records(records: &[WorkoutRecord], range: ProgressRange, now: DateTime<Utc>) -> Self {
        let cutoff = range.cutoff(now);
        let included: Vec<&WorkoutRecord> = records
            .iter()
            .filter(|record| cutoff.map_or(true, |cutoff| record.started_at >= cutoff))
            .filter(|record| record.started_at <= now)
            .collect();

        let total_distance_m: Decimal = included.iter().map(|r| r.total_distance_m).sum();

        let avg_duration_seconds = if included.is_empty() {
            None
        } else {
            let total: u64 = included.iter().map(|r| r.duration_seconds()).sum();
            Some(total / included.len() as u64)
        };

        let powers: Vec<Decimal> = included.iter().filter_map(|r| r.average_power_w).collect();
        let avg_power_w = if powers.is_empty() {
            None
        } else {
            let sum: Decimal = powers.iter().sum();
            Some((sum / Decimal::from(powers.len())).round_dp(1))
        };

        let mut daily_distance_m = BTreeMap::new();
        for record in &included {
            *daily_distance_m
                .entry(record.started_at.date_naive())
                .or_insert(Decimal::ZERO) += record.total_distance_m;
        }

        Self {
            range,
            total_sessions: included.len(),
            total_distance_m,
            total_distance_km: (total_distance_m / Decimal::ONE_THOUSAND).round_dp(1),
            avg_duration_seconds,
            avg_power_w,
            daily_distance_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 18, 0, 0).unwrap()
    }

    fn record(days_ago: i64, distance: Decimal, minutes: u64, power: Option<Decimal>) -> WorkoutRecord {
        let started_at = now() - Duration::days(days_ago);
        WorkoutRecord {
            session_id: Uuid::new_v4(),
            user_id: "rower".to_string(),
            source: SourceKind::Peripheral,
            started_at,
            ended_at: started_at + Duration::minutes(minutes as i64),
            duration_ms: minutes * 60 * 1000,
            total_distance_m: distance,
            average_power_w: power,
            dropped_samples: 0,
        }
    }

    #[test]
    fn test_week_range_filters_old_sessions() {
        let records = vec![
            record(1, dec!(5000), 20, Some(dec!(200))),
            record(3, dec!(2500), 10, None),
            record(20, dec!(8000), 40, Some(dec!(150))),
        ];

        let week = ProgressSummary::from_records(&records, ProgressRange::Week, now());
        assert_eq!(week.total_sessions, 2);
        assert_eq!(week.total_distance_m, dec!(7500));
        assert_eq!(week.total_distance_km, dec!(7.5));
        assert_eq!(week.avg_duration_seconds, Some(15 * 60));
        assert_eq!(week.avg_power_w, Some(dec!(200)));
        assert_eq!(week.daily_distance_m.len(), 2);

        let all = ProgressSummary::from_records(&records, ProgressRange::All, now());
        assert_eq!(all.total_sessions, 3);
        assert_eq!(all.avg_power_w, Some(dec!(175)));
    }

    #[test]
    fn test_same_day_distances_are_summed() {
        let records = vec![record(0, dec!(1000), 5, None), record(0, dec!(234.5), 2, None)];
        let summary = ProgressSummary::from_records(&records, ProgressRange::Month, now());
        assert_eq!(
            summary.daily_distance_m.get(&now().date_naive()),
            Some(&dec!(1234.5))
        );
        assert_eq!(summary.total_distance_km, dec!(1.2));
    }

    #[test]
    fn test_empty_history() {
        let summary = ProgressSummary::from_records(&[], ProgressRange::Week, now());
        assert_eq!(summary.total_sessions, 0);
        assert_eq!(summary.total_distance_m, dec!(0));
        assert_eq!(summary.avg_duration_seconds, None);
        assert_eq!(summary.avg_power_w, None);
    }

    #[test]
    fn test_range_parsing() {
        assert_eq!("Week".parse::<ProgressRange>().unwrap(), ProgressRange::Week);
        assert_eq!("all".parse::<ProgressRange>().unwrap().label(), "All Time");
        assert!("year".parse::<ProgressRange>().is_err());
    }
}
