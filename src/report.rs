use crate::matrix::MatrixResult;
use crate::models::AttendanceStatus;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

/// Roster name for a student, or a placeholder built from the id when the
/// roster has no entry. Students are never dropped for missing names.
pub fn display_name(roster: &HashMap<String, String>, student_id: &str) -> String {
    roster
        .get(student_id)
        .cloned()
        .unwrap_or_else(|| format!("Unknown ({student_id})"))
}

/// Student rows in report order: by display name, id as tie-breaker.
fn sorted_students(result: &MatrixResult, roster: &HashMap<String, String>) -> Vec<(String, String)> {
    let mut students: Vec<(String, String)> = result
        .matrix
        .keys()
        .map(|id| (display_name(roster, id), id.clone()))
        .collect();
    students.sort();
    students
}

fn cell_mark(status: Option<&AttendanceStatus>) -> (&'static str, &'static str) {
    match status {
        Some(AttendanceStatus::Attended) => ("attended", "+"),
        Some(AttendanceStatus::Absent) => ("absent", "\u{2212}"),
        None => ("not-required", ""),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the full report as one self-contained HTML document: no external
/// assets, a client-side name filter, and print styles.
pub fn render_html(result: &MatrixResult, roster: &HashMap<String, String>) -> String {
    let mut html = String::new();
    let stats_by_id: HashMap<&str, _> = result
        .stats
        .iter()
        .map(|s| (s.student_id.as_str(), s))
        .collect();

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Attendance Report</title>\n<style>\n\
         body {{ font-family: sans-serif; margin: 1em; }}\n\
         table {{ border-collapse: collapse; }}\n\
         th, td {{ border: 1px solid #999; padding: 2px 6px; text-align: center; }}\n\
         th.name, td.name {{ text-align: left; white-space: nowrap; }}\n\
         th.meeting {{ writing-mode: vertical-rl; font-weight: normal; font-size: 0.8em; }}\n\
         th.meeting.stub {{ color: #b00; }}\n\
         td.attended {{ background: #e4f7e4; }}\n\
         td.absent {{ background: #f7e0e0; }}\n\
         td.not-required {{ background: #f2f2f2; }}\n\
         #filter {{ margin-bottom: 0.8em; padding: 4px; width: 20em; }}\n\
         @media print {{ #filter {{ display: none; }} body {{ margin: 0; }} }}\n\
         </style>\n</head>\n<body>\n\
         <h1>Attendance Report</h1>\n\
         <input type=\"text\" id=\"filter\" placeholder=\"Filter by student name...\">\n\
         <table>\n<thead>\n<tr>\n\
         <th class=\"name\">Student</th><th>Attended</th><th>Absent</th><th>Total</th><th>%</th>"
    );

    for meeting in &result.meetings {
        let stub_class = if meeting.is_stub() { " stub" } else { "" };
        let label = if meeting.is_stub() {
            format!("{} (no metadata)", meeting.meeting_id)
        } else {
            format!("{} {}", meeting.date, meeting.start_time)
        };
        let _ = write!(
            html,
            "<th class=\"meeting{stub_class}\" title=\"{}\">{}</th>",
            escape_html(&meeting.meeting_id),
            escape_html(&label)
        );
    }
    html.push_str("\n</tr>\n</thead>\n<tbody>\n");

    for (name, student_id) in sorted_students(result, roster) {
        let row = &result.matrix[&student_id];
        // Every matrix student has stats, derived from the same keys.
        let stats = stats_by_id[student_id.as_str()];
        let _ = write!(
            html,
            "<tr><td class=\"name\">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>",
            escape_html(&name),
            stats.attended,
            stats.absent,
            stats.total,
            stats.ratio
        );
        for meeting in &result.meetings {
            let (class, mark) = cell_mark(row.get(&meeting.meeting_id));
            let _ = write!(html, "<td class=\"{class}\">{mark}</td>");
        }
        html.push_str("</tr>\n");
    }

    html.push_str(
        "</tbody>\n</table>\n<script>\n\
         document.getElementById('filter').addEventListener('input', function () {\n\
           var needle = this.value.toLowerCase();\n\
           document.querySelectorAll('tbody tr').forEach(function (row) {\n\
             var name = row.querySelector('td.name').textContent.toLowerCase();\n\
             row.style.display = name.indexOf(needle) === -1 ? 'none' : '';\n\
           });\n\
         });\n\
         </script>\n</body>\n</html>\n",
    );

    html
}

/// Companion CSV export of the same matrix, one meeting per column.
pub fn write_matrix_csv(
    result: &MatrixResult,
    roster: &HashMap<String, String>,
    path: &Path,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let stats_by_id: HashMap<&str, _> = result
        .stats
        .iter()
        .map(|s| (s.student_id.as_str(), s))
        .collect();

    let mut header = vec![
        "Student ID".to_string(),
        "Name".to_string(),
        "Attended".to_string(),
        "Absent".to_string(),
        "Total".to_string(),
        "Ratio %".to_string(),
    ];
    for meeting in &result.meetings {
        if meeting.is_stub() {
            header.push(format!("{} (no metadata)", meeting.meeting_id));
        } else {
            header.push(format!("{} {}", meeting.date, meeting.start_time));
        }
    }
    writer.write_record(&header)?;

    for (name, student_id) in sorted_students(result, roster) {
        let row = &result.matrix[&student_id];
        let stats = stats_by_id[student_id.as_str()];
        let mut record = vec![
            student_id.clone(),
            name,
            stats.attended.to_string(),
            stats.absent.to_string(),
            stats.total.to_string(),
            stats.ratio.clone(),
        ];
        for meeting in &result.meetings {
            let (_, mark) = cell_mark(row.get(&meeting.meeting_id));
            record.push(mark.to_string());
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
