//! Score run analysis

use serde::Serialize;
use std::collections::HashSet;

use super::models::ScoreRecord;

/// Read-only projection over the scores of one run
#[derive(Debug, Clone, Serialize)]
pub struct ScoreAnalysis {
    pub records: usize,
    /// Distinct drivers seen in the run
    pub drivers: usize,
    pub average_score: f64,
    pub min_score: i32,
    pub max_score: i32,
    pub total_minutes_analyzed: i64,
}

pub fn analyze(records: &[ScoreRecord]) -> ScoreAnalysis {
    let drivers: HashSet<&str> = records.iter().map(|r| r.driver_id.as_str()).collect();
    let (mut min_score, mut max_score) = (i32::MAX, i32::MIN);
    let mut score_sum = 0i64;
    let mut minutes = 0i64;

    for record in records {
        min_score = min_score.min(record.driver_score);
        max_score = max_score.max(record.driver_score);
        score_sum += i64::from(record.driver_score);
        minutes += i64::from(record.minutes_analyzed);
    }

    if records.is_empty() {
        return ScoreAnalysis {
            records: 0,
            drivers: 0,
            average_score: 0.0,
            min_score: 0,
            max_score: 0,
            total_minutes_analyzed: 0,
        };
    }

    ScoreAnalysis {
        records: records.len(),
        drivers: drivers.len(),
        average_score: score_sum as f64 / records.len() as f64,
        min_score,
        max_score,
        total_minutes_analyzed: minutes,
    }
}
