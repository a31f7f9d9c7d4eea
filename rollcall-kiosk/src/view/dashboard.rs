//! Dashboard statistics derivation
//!
//! A pure, idempotent projection over the merged record set and the roster,
//! recomputed in full on every request. No incremental state.

use crate::models::{AttendanceRecord, Student};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Aggregate dashboard statistics
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// Roster size
    pub total_students: usize,
    /// Distinct rolls with a record dated today
    pub present_today: usize,
    /// present_today / roster size, whole percent, capped at 100
    pub attendance_rate: u32,
    /// Per-student attendance summaries, roster order
    pub students: Vec<StudentSummary>,
}

/// Per-student attendance summary
#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub roll: String,
    pub name: String,
    pub present_today: bool,
    /// Distinct days this student was marked present
    pub attended_days: usize,
    /// Distinct days any attendance was recorded (session count)
    pub session_days: usize,
    /// attended_days / session_days, whole percent, capped at 100
    pub percentage: u32,
}

fn percent(numerator: usize, denominator: usize) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let rate = ((numerator as f64 / denominator as f64) * 100.0).round() as u32;
    rate.min(100)
}

/// Compute dashboard statistics for `today`
pub fn derive_stats(
    records: &[AttendanceRecord],
    roster: &[Student],
    today: NaiveDate,
) -> DashboardStats {
    let present_rolls: BTreeSet<&str> = records
        .iter()
        .filter(|record| record.day() == today)
        .map(|record| record.roll.as_str())
        .collect();

    let session_days: BTreeSet<NaiveDate> = records.iter().map(|record| record.day()).collect();

    let students = roster
        .iter()
        .map(|student| {
            let attended: BTreeSet<NaiveDate> = records
                .iter()
                .filter(|record| record.roll == student.roll)
                .map(|record| record.day())
                .collect();
            StudentSummary {
                roll: student.roll.clone(),
                name: student.name.clone(),
                present_today: present_rolls.contains(student.roll.as_str()),
                attended_days: attended.len(),
                session_days: session_days.len(),
                percentage: percent(attended.len(), session_days.len()),
            }
        })
        .collect();

    DashboardStats {
        total_students: roster.len(),
        present_today: present_rolls.len(),
        attendance_rate: percent(present_rolls.len(), roster.len()),
        students,
    }
}
