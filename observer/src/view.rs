//! Plain-text presentation of observed submissions.

use crate::{
    client::model::{BlobKind, Submission, TestCaseResult},
    observer::{Phase, Snapshot},
    render::{RenderedText, PLACEHOLDER},
};
use std::fmt::{Display, Write};

fn or_dash<T: Display>(v: Option<T>) -> String {
    v.map(|v| v.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_owned())
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

/// Status line, e.g. `[WA] Wrong Answer`.
pub fn banner(snapshot: &Snapshot) -> String {
    match (&snapshot.submission, snapshot.phase) {
        (_, Phase::NotFound) => "[--] Submission not found".into(),
        (None, _) => "[..] Loading".into(),
        (Some(sub), _) => format!("[{}] {}", sub.status.code(), sub.status.label()),
    }
}

pub fn info_grid(sub: &Submission) -> String {
    let submitted = sub
        .submitted_at()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string());
    let rows = [
        ("User", or_dash(sub.username.as_deref())),
        (
            "Problem",
            match (sub.problem_id, non_empty(sub.problem_title.as_deref())) {
                (Some(id), Some(title)) => format!("{} {}", id, title),
                (id, _) => or_dash(id),
            },
        ),
        ("Language", or_dash(sub.language.as_deref())),
        ("Max time", or_dash(sub.max_time_used.map(|t| format!("{} ms", t)))),
        (
            "Max memory",
            or_dash(sub.max_memory_used.map(|m| format!("{} KB", m))),
        ),
        ("Submitted", or_dash(submitted)),
    ];
    let mut out = String::new();
    for (name, value) in rows.iter() {
        let _ = writeln!(out, "{:<12}{}", name, value);
    }
    out
}

/// One row of the result table. Highlighted rows are marked with `*`.
pub fn case_row(idx: usize, case: &TestCaseResult, highlighted: bool) -> String {
    format!(
        "{} #{:<4}{:<6}{:>10}{:>12}  {}",
        if highlighted { '*' } else { ' ' },
        idx + 1,
        case.status.code(),
        or_dash(case.time_used.map(|t| format!("{}ms", t))),
        or_dash(case.memory_used.map(|m| format!("{}KB", m))),
        or_dash(non_empty(case.error_message.as_deref()).map(first_line)),
    )
}

fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or(s)
}

pub fn case_table(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    if snapshot.results.is_empty() {
        let _ = writeln!(
            out,
            "  {}",
            match snapshot.phase {
                Phase::Loading | Phase::Polling => "No test case results yet",
                _ => "No test case results",
            }
        );
        return out;
    }
    let _ = writeln!(
        out,
        "  {:<5}{:<6}{:>10}{:>12}  {}",
        "Case", "Status", "Time", "Memory", "Message"
    );
    for (idx, case) in snapshot.results.iter().enumerate() {
        let _ = writeln!(out, "{}", case_row(idx, case, snapshot.is_highlighted(idx)));
    }
    out
}

fn phase_line(snapshot: &Snapshot) -> Option<&'static str> {
    match snapshot.phase {
        Phase::Loading => Some("Waiting for the first response..."),
        Phase::Polling => Some("Judging..."),
        Phase::Stopped => Some("Stopped watching"),
        Phase::Finished | Phase::NotFound | Phase::GaveUp => None,
    }
}

/// The whole submission view: banner, info, error line, compile output
/// and the result table.
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Submission {}  {}", snapshot.id, banner(snapshot));
    if let Some(sub) = &snapshot.submission {
        out.push_str(&info_grid(sub));
        if let Some(msg) = non_empty(sub.error_message.as_deref()) {
            let _ = writeln!(out, "\nCompiler / judge message:\n{}", msg.trim_end());
        }
    }
    if let Some(err) = &snapshot.error {
        let _ = writeln!(out, "! {}", err);
    }
    if snapshot.phase != Phase::NotFound {
        out.push('\n');
        out.push_str(&case_table(snapshot));
    }
    if let Some(line) = phase_line(snapshot) {
        let _ = writeln!(out, "{}", line);
    }
    out
}

/// Submission history, one row per submission.
pub fn history_table(submissions: &[Submission]) -> String {
    let mut out = String::new();
    if submissions.is_empty() {
        let _ = writeln!(out, "  No submissions");
        return out;
    }
    let _ = writeln!(
        out,
        "{:<8}{:<16}{:<28}{:<9}{:>8}{:>10}  {}",
        "Id", "User", "Problem", "Status", "Time", "Memory", "Submitted"
    );
    for sub in submissions {
        let problem = match (sub.problem_id, non_empty(sub.problem_title.as_deref())) {
            (_, Some(title)) => title.to_owned(),
            (id, None) => or_dash(id),
        };
        let _ = writeln!(
            out,
            "{:<8}{:<16}{:<28}{:<9}{:>8}{:>10}  {}",
            sub.id,
            or_dash(sub.username.as_deref()),
            problem,
            sub.status.code(),
            or_dash(sub.max_time_used.map(|t| format!("{}ms", t))),
            or_dash(sub.max_memory_used.map(|m| format!("{}KB", m))),
            or_dash(
                sub.submitted_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            ),
        );
    }
    out
}

/// Expanded view of one test case. `panels` holds the rendered payloads
/// in the order of [`BlobKind::ALL`]; `diff` is the rendered output diff,
/// skipped when it is the placeholder.
pub fn render_case(
    idx: usize,
    case: &TestCaseResult,
    panels: &[(BlobKind, &RenderedText)],
    diff: Option<&RenderedText>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Case #{}  [{}]",
        idx + 1,
        case.status.code()
    );
    let _ = writeln!(
        out,
        "Time {}  Memory {}",
        or_dash(case.time_used.map(|t| format!("{} ms", t))),
        or_dash(case.memory_used.map(|m| format!("{} KB", m))),
    );
    if let Some(msg) = non_empty(case.error_message.as_deref()) {
        let _ = writeln!(out, "\nError message:\n{}", msg.trim_end());
    }
    for (kind, text) in panels {
        let _ = write!(out, "\n{}:\n{}", kind.label(), text.text);
        if !text.text.ends_with('\n') {
            out.push('\n');
        }
    }

    if let Some(diff) = diff.filter(|d| !d.is_placeholder()) {
        let _ = write!(out, "\nDiff (- actual, + expected):\n{}", diff.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::model::SubmissionStatus;
    use crate::client::model::CaseStatus;
    use crate::render::{render_diff, render_text};
    use crate::test::util::{case, submission};
    use pretty_assertions::assert_eq;
    use std::{collections::BTreeSet, sync::Arc};

    #[test]
    fn missing_fields_become_dashes() {
        let mut c = case(1, CaseStatus::RuntimeError);
        c.time_used = None;
        c.memory_used = None;
        let row = case_row(0, &c, false);
        assert!(row.starts_with("  #1 "));
        assert_eq!(row.matches(PLACEHOLDER).count(), 3, "{:?}", row);

        let mut sub = submission("7", SubmissionStatus::Pending);
        sub.language = None;
        sub.problem_id = None;
        sub.submitted_at = None;
        sub.username = None;
        let grid = info_grid(&sub);
        assert!(grid.lines().all(|l| l.ends_with(PLACEHOLDER)), "{}", grid);
    }

    #[test]
    fn highlighted_rows_are_marked() {
        let mut snap = Snapshot::new("42".into());
        snap.phase = Phase::Polling;
        snap.submission = Some(submission("42", SubmissionStatus::Running));
        snap.results = Arc::new(vec![
            case(1, CaseStatus::Accepted),
            case(2, CaseStatus::WrongAnswer),
        ]);
        snap.highlighted = BTreeSet::from([1]);

        let out = render_snapshot(&snap);
        assert!(out.contains("  #1 "), "{}", out);
        assert!(out.contains("* #2 "), "{}", out);
        assert!(out.starts_with("Submission 42  [RUNNING] Judging\n"), "{}", out);
        assert!(out.ends_with("Judging...\n"));
    }

    #[test]
    fn not_found_has_no_table() {
        let mut snap = Snapshot::new("404".into());
        snap.phase = Phase::NotFound;
        snap.error = Some("Submission 404 does not exist".into());
        let out = render_snapshot(&snap);
        assert!(out.contains("Submission not found"));
        assert!(out.contains("! Submission 404 does not exist"));
        assert!(!out.contains("Case"));
    }

    #[test]
    fn wrong_answer_case_shows_diff() {
        let mut c = case(1, CaseStatus::WrongAnswer);
        c.expected_output_content = Some("3\n".into());
        c.actual_output_content = Some("4\n".into());
        let expected = render_text("3\n", 4);
        let actual = render_text("4\n", 4);
        let diff = render_diff("4\n", "3\n");
        let out = render_case(
            0,
            &c,
            &[(BlobKind::Expected, &expected), (BlobKind::Actual, &actual)],
            Some(&diff),
        );
        assert!(out.contains("Expected output:\n1 | 3\n"), "{}", out);
        assert!(out.contains("Diff (- actual, + expected):\n- 4\n+ 3\n"), "{}", out);
    }

    #[test]
    fn history_rows() {
        let mut old = submission("8", SubmissionStatus::WrongAnswer);
        old.problem_title = None;
        old.username = None;
        let out = history_table(&[submission("9", SubmissionStatus::Accepted), old]);
        let lines = out.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Id"));
        assert!(lines[1].starts_with("9 "), "{}", out);
        assert!(lines[1].contains("A + B") && lines[1].contains("AC"), "{}", out);
        assert!(lines[1].ends_with("2024-05-01 12:00"), "{}", out);
        assert!(lines[2].contains("-               1 "), "{}", out);

        assert_eq!(history_table(&[]), "  No submissions\n");
    }

    #[test]
    fn matching_outputs_show_no_diff() {
        let c = case(1, CaseStatus::Accepted);
        let out = render_case(0, &c, &[], Some(&RenderedText::placeholder()));
        assert!(!out.contains("Diff"), "{}", out);
        let out = render_case(0, &c, &[], None);
        assert!(!out.contains("Diff"), "{}", out);
    }
}
