use crate::models::{field_str, AttendanceRecord, Config, Meeting, RowTableDocument};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything the loader could pull out of the source directory, plus the list
/// of files it had to give up on. A skipped file never aborts the run.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    /// student_id -> full name, from the roster file.
    pub roster: HashMap<String, String>,
    /// meeting_id -> meeting metadata, across all metadata files.
    pub meetings: HashMap<String, Meeting>,
    /// Journal rows in document order.
    pub journal: Vec<AttendanceRecord>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

pub struct RecordLoader {
    config: Config,
}

impl RecordLoader {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Load roster, meeting metadata and journal from the source directory.
    /// Only a missing directory is fatal; individual unreadable or malformed
    /// files are reported in `skipped` and otherwise contribute nothing.
    pub fn load_all(&self, source_dir: &Path) -> Result<LoadedRecords> {
        let mut loaded = LoadedRecords::default();

        let roster_path = source_dir.join(&self.config.roster_filename);
        match self.load_roster(&roster_path) {
            Ok(roster) => {
                println!("   📋 Roster: {} students", roster.len());
                loaded.roster = roster;
            }
            Err(e) => self.skip(&mut loaded, &roster_path, &e),
        }

        for path in self.meeting_files(source_dir)? {
            match self.load_meeting_file(&path) {
                Ok(meetings) => {
                    println!(
                        "   📅 {}: {} meetings",
                        path.file_name().and_then(|n| n.to_str()).unwrap_or("?"),
                        meetings.len()
                    );
                    // Later files overwrite earlier entries with the same id.
                    loaded.meetings.extend(meetings);
                }
                Err(e) => self.skip(&mut loaded, &path, &e),
            }
        }

        let journal_path = source_dir.join(&self.config.journal_filename);
        match self.load_journal(&journal_path) {
            Ok(journal) => {
                println!("   📖 Journal: {} attendance records", journal.len());
                loaded.journal = journal;
            }
            Err(e) => self.skip(&mut loaded, &journal_path, &e),
        }

        Ok(loaded)
    }

    /// Metadata files are every .json file in the source directory that is not
    /// the roster or the journal. Sorted by name so overwrite order between
    /// files sharing a meeting id is deterministic.
    fn meeting_files(&self, source_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let entries = fs::read_dir(source_dir)
            .with_context(|| format!("Failed to read source directory: {}", source_dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name == self.config.roster_filename || name == self.config.journal_filename {
                continue;
            }
            files.push(path);
        }
        files.sort();
        Ok(files)
    }

    pub fn load_roster(&self, path: &Path) -> Result<HashMap<String, String>> {
        let doc = read_document(path)?;
        let mut roster = HashMap::new();
        for row in doc.rows() {
            // Rows without both identity fields are expected export noise.
            let (Some(id), Some(name)) = (field_str(row, "studentId"), field_str(row, "personFullname"))
            else {
                continue;
            };
            roster.insert(id, name);
        }
        Ok(roster)
    }

    pub fn load_meeting_file(&self, path: &Path) -> Result<HashMap<String, Meeting>> {
        let doc = read_document(path)?;
        let mut meetings = HashMap::new();
        for row in doc.rows() {
            let Some(id) = field_str(row, "id") else {
                continue;
            };
            let lesson_type = field_str(row, "lessonType")
                .or_else(|| field_str(row, "lessonTypeEn"))
                .unwrap_or_default();
            // A missing date stays empty and sorts before dated meetings.
            let meeting = Meeting {
                meeting_id: id.clone(),
                course_id: field_str(row, "courseId").unwrap_or_default(),
                date: field_str(row, "meetingDate").unwrap_or_default(),
                start_time: field_str(row, "startTime").unwrap_or_default(),
                end_time: field_str(row, "endTime").unwrap_or_default(),
                lesson_type,
                lesson_code: field_str(row, "code").unwrap_or_default(),
                teacher_id: field_str(row, "teacherId").unwrap_or_default(),
            };
            meetings.insert(id, meeting);
        }
        Ok(meetings)
    }

    pub fn load_journal(&self, path: &Path) -> Result<Vec<AttendanceRecord>> {
        let doc = read_document(path)?;
        let mut records = Vec::new();
        for row in doc.rows() {
            // Skip rows with no usable identity rather than keying the matrix
            // by an empty string.
            let (Some(student_id), Some(meeting_id)) =
                (field_str(row, "studentId"), field_str(row, "courseMeetingId"))
            else {
                continue;
            };
            records.push(AttendanceRecord {
                student_id,
                meeting_id,
                marker_id: field_str(row, "point1Id").unwrap_or_default(),
            });
        }
        Ok(records)
    }

    fn skip(&self, loaded: &mut LoadedRecords, path: &Path, error: &anyhow::Error) {
        println!("   ❌ Skipping {}: {:#}", path.display(), error);
        loaded.skipped.push(SkippedFile {
            file: path.display().to_string(),
            reason: format!("{error:#}"),
        });
    }
}

fn read_document(path: &Path) -> Result<RowTableDocument> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let doc: RowTableDocument = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse file: {}", path.display()))?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn loader() -> RecordLoader {
        RecordLoader::new(Config::default())
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "attendance-report-test-{tag}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn roster_skips_rows_missing_identity_fields() {
        let dir = scratch_dir("roster");
        let path = dir.join("students.json");
        fs::write(
            &path,
            r#"{"tbl":[{"r":[
                {"studentId":"S1","personFullname":"Ann"},
                {"studentId":"S2"},
                {"personFullname":"No Id"},
                {"studentId":"S3","personFullname":"Bob"}
            ]}]}"#,
        )
        .unwrap();

        let roster = loader().load_roster(&path).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get("S1").map(String::as_str), Some("Ann"));
        assert_eq!(roster.get("S3").map(String::as_str), Some("Bob"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn journal_preserves_order_across_tables() {
        let dir = scratch_dir("journal");
        let path = dir.join("journal.json");
        fs::write(
            &path,
            r#"{"tbl":[
                {"r":[{"studentId":"S1","courseMeetingId":"M1","point1Id":"X"}]},
                {"r":[
                    {"studentId":"S1","courseMeetingId":"M1","point1Id":"110000148"},
                    {"courseMeetingId":"M2"},
                    {"studentId":"S2","courseMeetingId":"M2"}
                ]}
            ]}"#,
        )
        .unwrap();

        let journal = loader().load_journal(&path).unwrap();
        assert_eq!(journal.len(), 3);
        assert_eq!(journal[0].marker_id, "X");
        assert_eq!(journal[1].marker_id, "110000148");
        // Missing point1Id loads as an empty marker.
        assert_eq!(journal[2].student_id, "S2");
        assert_eq!(journal[2].marker_id, "");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_all_tolerates_a_corrupt_meeting_file() {
        let dir = scratch_dir("tolerant");
        fs::write(
            dir.join("students.json"),
            r#"{"tbl":[{"r":[{"studentId":"S1","personFullname":"Ann"}]}]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("journal.json"),
            r#"{"tbl":[{"r":[{"studentId":"S1","courseMeetingId":"M1","point1Id":""}]}]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("week1.json"),
            r#"{"tbl":[{"r":[{"id":"M1","meetingDate":"2024-01-10","startTime":"09:00"}]}]}"#,
        )
        .unwrap();
        fs::write(dir.join("week2.json"), "not json at all").unwrap();

        let loaded = loader().load_all(&dir).unwrap();
        assert_eq!(loaded.roster.len(), 1);
        assert_eq!(loaded.meetings.len(), 1);
        assert_eq!(loaded.journal.len(), 1);
        assert_eq!(loaded.skipped.len(), 1);
        assert!(loaded.skipped[0].file.contains("week2.json"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn meeting_rows_without_id_are_skipped() {
        let dir = scratch_dir("meetingid");
        let path = dir.join("week1.json");
        fs::write(
            &path,
            r#"{"tbl":[{"r":[
                {"meetingDate":"2024-01-10","startTime":"09:00"},
                {"id":"M1"},
                {"id":"M2","meetingDate":"2024-01-17","startTime":"09:00","lessonTypeEn":"seminar"}
            ]}]}"#,
        )
        .unwrap();

        let meetings = loader().load_meeting_file(&path).unwrap();
        assert_eq!(meetings.len(), 2);
        // Missing date is kept empty, not turned into a stub.
        assert_eq!(meetings["M1"].date, "");
        assert_eq!(meetings["M2"].lesson_type, "seminar");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn later_meeting_files_overwrite_earlier_ids() {
        let dir = scratch_dir("overwrite");
        fs::write(
            dir.join("students.json"),
            r#"{"tbl":[]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("journal.json"),
            r#"{"tbl":[]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("a.json"),
            r#"{"tbl":[{"r":[{"id":"M1","meetingDate":"2024-01-10","startTime":"09:00"}]}]}"#,
        )
        .unwrap();
        fs::write(
            dir.join("b.json"),
            r#"{"tbl":[{"r":[{"id":"M1","meetingDate":"2024-02-20","startTime":"10:00"}]}]}"#,
        )
        .unwrap();

        let loaded = loader().load_all(&dir).unwrap();
        assert_eq!(loaded.meetings.len(), 1);
        assert_eq!(loaded.meetings["M1"].date, "2024-02-20");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_roster_is_recoverable() {
        let dir = scratch_dir("noroster");
        fs::write(
            dir.join("journal.json"),
            r#"{"tbl":[{"r":[{"studentId":"S1","courseMeetingId":"M1"}]}]}"#,
        )
        .unwrap();

        let loaded = loader().load_all(&dir).unwrap();
        assert!(loaded.roster.is_empty());
        assert_eq!(loaded.journal.len(), 1);
        assert_eq!(loaded.skipped.len(), 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let dir = scratch_dir("numeric");
        let path = dir.join("journal.json");
        fs::write(
            &path,
            r#"{"tbl":[{"r":[{"studentId":1001,"courseMeetingId":55,"point1Id":110000148}]}]}"#,
        )
        .unwrap();

        let journal = loader().load_journal(&path).unwrap();
        assert_eq!(journal[0].student_id, "1001");
        assert_eq!(journal[0].meeting_id, "55");
        assert_eq!(journal[0].marker_id, "110000148");

        fs::remove_dir_all(&dir).unwrap();
    }
}
