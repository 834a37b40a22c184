//! Line diff of a test case's actual output against its expected output.

use super::RenderedText;
use difference::{Changeset, Difference};
use std::fmt::Write;

/// Unchanged lines shown around the differing region.
const CONTEXT: usize = 3;

/// Differing regions whose line counts multiply to more than this are only
/// summarized; the line diff needs time and memory proportional to it.
pub const MAX_DIFF_CELLS: usize = 4_000_000;

/// Differing regions up to this size are diffed inline.
pub const INLINE_DIFF_CELLS: usize = 40_000;

fn split_lines(s: &str) -> Vec<&str> {
    s.strip_suffix('\n')
        .unwrap_or(s)
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect()
}

/// The lines of both sides with their common head and tail split off.
struct Region<'a> {
    actual: Vec<&'a str>,
    expected: Vec<&'a str>,
    head: usize,
    tail: usize,
}

impl<'a> Region<'a> {
    fn new(actual: &'a str, expected: &'a str) -> Region<'a> {
        let actual = split_lines(actual);
        let expected = split_lines(expected);
        let head = actual
            .iter()
            .zip(expected.iter())
            .take_while(|(a, e)| a == e)
            .count();
        let tail = actual[head..]
            .iter()
            .rev()
            .zip(expected[head..].iter().rev())
            .take_while(|(a, e)| a == e)
            .count();
        Region {
            actual,
            expected,
            head,
            tail,
        }
    }

    fn actual_mid(&self) -> &[&'a str] {
        &self.actual[self.head..self.actual.len() - self.tail]
    }

    fn expected_mid(&self) -> &[&'a str] {
        &self.expected[self.head..self.expected.len() - self.tail]
    }

    fn cells(&self) -> usize {
        self.actual_mid()
            .len()
            .saturating_mul(self.expected_mid().len())
    }

    fn is_same(&self) -> bool {
        self.actual_mid().is_empty() && self.expected_mid().is_empty()
    }
}

/// Size of the line diff between `actual` and `expected`, once their common
/// head and tail are stripped.
pub fn diff_cells(actual: &str, expected: &str) -> usize {
    Region::new(actual, expected).cells()
}

fn push_lines(out: &mut String, marker: char, lines: &[&str]) -> usize {
    for l in lines {
        let _ = writeln!(out, "{} {}", marker, l);
    }
    lines.len()
}

/// Diff `actual` against `expected`: `-` marks lines only in the actual
/// output, `+` lines only in the expected one. Outputs that do not differ
/// yield the placeholder.
pub fn render_diff(actual: &str, expected: &str) -> RenderedText {
    let region = Region::new(actual, expected);
    if region.is_same() {
        return RenderedText::placeholder();
    }

    let mut out = String::new();
    let mut lines = 0;
    let context_from = region.head.saturating_sub(CONTEXT);
    if context_from > 0 {
        let _ = writeln!(out, "  ... {} identical line(s)", context_from);
        lines += 1;
    }
    lines += push_lines(&mut out, ' ', &region.actual[context_from..region.head]);

    let (actual_mid, expected_mid) = (region.actual_mid(), region.expected_mid());
    if region.cells() > MAX_DIFF_CELLS {
        let _ = writeln!(
            out,
            "~ {} actual and {} expected line(s) differ from line {} on, too many to diff",
            actual_mid.len(),
            expected_mid.len(),
            region.head + 1
        );
        lines += 1;
    } else if actual_mid.is_empty() || expected_mid.is_empty() {
        lines += push_lines(&mut out, '-', actual_mid);
        lines += push_lines(&mut out, '+', expected_mid);
    } else {
        let changeset = Changeset::new(&actual_mid.join("\n"), &expected_mid.join("\n"), "\n");
        for d in &changeset.diffs {
            let (marker, chunk) = match d {
                Difference::Same(s) => (' ', s),
                Difference::Rem(s) => ('-', s),
                Difference::Add(s) => ('+', s),
            };
            lines += push_lines(&mut out, marker, &chunk.split('\n').collect::<Vec<_>>());
        }
    }

    let tail_from = region.actual.len() - region.tail;
    let shown = region.tail.min(CONTEXT);
    lines += push_lines(&mut out, ' ', &region.actual[tail_from..tail_from + shown]);
    if region.tail > shown {
        let _ = writeln!(out, "  ... {} identical line(s)", region.tail - shown);
        lines += 1;
    }

    RenderedText { text: out, lines }
}
