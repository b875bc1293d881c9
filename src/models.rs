use serde::{Deserialize, Serialize};

/// Sentinel date assigned to meetings referenced by the journal but missing
/// from metadata. Sorts lexicographically after every real "YYYY-MM-DD" date,
/// so stub meetings always land at the end of the report.
pub const STUB_MEETING_DATE: &str = "9999-99-99";

/// Marker value the export uses for an "absent" attendance record.
pub const DEFAULT_ABSENCE_MARKER: &str = "110000148";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source_directory: String,
    pub output_directory: String,
    /// Filename of the roster export inside the source directory.
    pub roster_filename: String,
    /// Filename of the attendance journal inside the source directory.
    /// Every other .json file in the directory is treated as meeting metadata.
    pub journal_filename: String,
    /// Marker id that classifies a journal record as absent.
    pub absence_marker: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_directory: "./source_data".to_string(),
            output_directory: "./output".to_string(),
            roster_filename: "students.json".to_string(),
            journal_filename: "journal.json".to_string(),
            absence_marker: DEFAULT_ABSENCE_MARKER.to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub meeting_id: String,
    pub course_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub lesson_type: String,
    pub lesson_code: String,
    pub teacher_id: String,
}

impl Meeting {
    /// Placeholder for a meeting id the journal references but no metadata
    /// file describes. The sentinel date keeps it ordered last.
    pub fn stub(meeting_id: &str) -> Self {
        Self {
            meeting_id: meeting_id.to_string(),
            course_id: String::new(),
            date: STUB_MEETING_DATE.to_string(),
            start_time: String::new(),
            end_time: String::new(),
            lesson_type: String::new(),
            lesson_code: String::new(),
            teacher_id: String::new(),
        }
    }

    pub fn is_stub(&self) -> bool {
        self.date == STUB_MEETING_DATE
    }
}

/// One journal row. Not retained after matrix construction.
#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub student_id: String,
    pub meeting_id: String,
    pub marker_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Attended,
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentStats {
    pub student_id: String,
    pub attended: usize,
    pub absent: usize,
    pub total: usize,
    /// Attendance percentage with two decimals, "0.00" when total is zero.
    pub ratio: String,
}

impl StudentStats {
    pub fn from_counts(student_id: &str, attended: usize, absent: usize) -> Self {
        let total = attended + absent;
        let ratio = if total == 0 {
            "0.00".to_string()
        } else {
            format!("{:.2}", attended as f64 / total as f64 * 100.0)
        };
        Self {
            student_id: student_id.to_string(),
            attended,
            absent,
            total,
            ratio,
        }
    }
}

/// Envelope shared by every export file: `{ "tbl": [ { "r": [ row, ... ] } ] }`.
/// Rows are heterogeneous across file roles, so they stay raw JSON values and
/// the loader picks out the fields each role needs.
#[derive(Debug, Deserialize)]
pub struct RowTableDocument {
    #[serde(default)]
    pub tbl: Vec<RowTable>,
}

#[derive(Debug, Deserialize)]
pub struct RowTable {
    #[serde(default)]
    pub r: Vec<serde_json::Value>,
}

impl RowTableDocument {
    /// Rows of all internal tables flattened in document order.
    pub fn rows(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.tbl.iter().flat_map(|table| table.r.iter())
    }
}

/// Read a row field as a string, accepting numeric values too: the export is
/// inconsistent about quoting ids.
pub fn field_str(row: &serde_json::Value, key: &str) -> Option<String> {
    match row.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
