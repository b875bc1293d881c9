use crate::models::{AttendanceRecord, AttendanceStatus, Meeting, StudentStats};
use std::collections::{BTreeMap, HashMap};

/// student_id -> meeting_id -> status. Sparse: a missing cell means the
/// student was not required at that meeting, which is distinct from absent.
pub type AttendanceMatrix = BTreeMap<String, BTreeMap<String, AttendanceStatus>>;

#[derive(Debug)]
pub struct MatrixResult {
    pub matrix: AttendanceMatrix,
    /// Column order of the report: ascending by (date, start_time), stubs last.
    pub meetings: Vec<Meeting>,
    /// One entry per student present in the matrix, ordered by student id.
    pub stats: Vec<StudentStats>,
}

/// The one piece of domain logic in the system: a record is absent exactly
/// when its marker equals the configured sentinel. Any other marker value,
/// including an empty one, counts as attended. Absence must never be inferred
/// from a missing record.
pub fn classify_status(marker_id: &str, absence_marker: &str) -> AttendanceStatus {
    if marker_id == absence_marker {
        AttendanceStatus::Absent
    } else {
        AttendanceStatus::Attended
    }
}

/// Fold journal records into the matrix and derive the sorted meeting list and
/// per-student stats. Records are applied in input order and a later record
/// for the same (student, meeting) pair overwrites the earlier one; that
/// last-write-wins behavior is deliberate export semantics, not deduplication.
pub fn build_matrix(
    records: &[AttendanceRecord],
    known_meetings: &HashMap<String, Meeting>,
    absence_marker: &str,
) -> MatrixResult {
    let mut matrix: AttendanceMatrix = BTreeMap::new();
    let mut meeting_order: Vec<String> = Vec::new();

    for record in records {
        if !meeting_order.contains(&record.meeting_id) {
            meeting_order.push(record.meeting_id.clone());
        }
        let status = classify_status(&record.marker_id, absence_marker);
        matrix
            .entry(record.student_id.clone())
            .or_default()
            .insert(record.meeting_id.clone(), status);
    }

    // Encounter order is kept as the tie-breaker: the sort below is stable, so
    // meetings with identical date and start time stay in journal order.
    let mut meetings: Vec<Meeting> = meeting_order
        .iter()
        .map(|id| {
            known_meetings
                .get(id)
                .cloned()
                .unwrap_or_else(|| Meeting::stub(id))
        })
        .collect();
    meetings.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.start_time.cmp(&b.start_time))
    });

    let stats = matrix
        .iter()
        .map(|(student_id, row)| {
            let attended = row
                .values()
                .filter(|s| **s == AttendanceStatus::Attended)
                .count();
            let absent = row.len() - attended;
            StudentStats::from_counts(student_id, attended, absent)
        })
        .collect();

    MatrixResult {
        matrix,
        meetings,
        stats,
    }
}
