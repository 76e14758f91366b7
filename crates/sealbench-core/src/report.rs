//! Fixed-width comparison tables.
//!
//! Column widths are derived from the section definition alone, so every row
//! of a section lines up under its header no matter what the verifier printed.

use crate::config::ColumnSpec;
use crate::error::GistError;
use crate::gist::{GistRecord, Slot};
use crate::task::TaskState;

/// Width of the right-justified duration text in a cell.
pub const DURATION_WIDTH: usize = 10;

/// Width of the guarantee count inside its parentheses.
pub const COUNT_WIDTH: usize = 3;

/// Field separator; the rule under the header uses `-+-` at the same joints.
pub const SEPARATOR: &str = " | ";

const LAUNCH_FAILED_TEXT: &str = "launch err";
const PARSE_FAILED_TEXT: &str = "bad gist";
const MISSING_TEXT: &str = "-";

/// How one invocation of a task ended, as far as the report is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Completed(GistRecord),
    /// The harness killed the invocation; the record is all timeouts.
    TimedOut(GistRecord),
    LaunchFailed(String),
    ParseFailed(GistError),
}

impl InvocationOutcome {
    pub fn state(&self) -> TaskState {
        match self {
            InvocationOutcome::Completed(_) => TaskState::Completed,
            InvocationOutcome::TimedOut(_) => TaskState::TimedOut,
            InvocationOutcome::LaunchFailed(_) => TaskState::LaunchFailed,
            InvocationOutcome::ParseFailed(_) => TaskState::ParseFailed,
        }
    }

    pub fn record(&self) -> Option<&GistRecord> {
        match self {
            InvocationOutcome::Completed(r) | InvocationOutcome::TimedOut(r) => Some(r),
            _ => None,
        }
    }
}

/// A rendered row: the fitted name field followed by one field per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub name: String,
    pub fields: Vec<String>,
}

impl ReportRow {
    pub fn line(&self) -> String {
        self.fields.join(SEPARATOR)
    }
}

#[derive(Debug, Clone)]
struct ColumnLayout {
    spec: ColumnSpec,
    width: usize,
}

/// Column geometry of one report section.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    title: String,
    name_width: usize,
    columns: Vec<ColumnLayout>,
}

impl ReportLayout {
    pub fn new(title: impl Into<String>, name_width: usize, columns: &[ColumnSpec]) -> Self {
        let columns = columns
            .iter()
            .map(|spec| ColumnLayout {
                width: spec.header.chars().count().max(natural_width(spec)),
                spec: spec.clone(),
            })
            .collect();
        Self {
            title: title.into(),
            name_width,
            columns,
        }
    }

    /// Widths of every field, name column first.
    pub fn widths(&self) -> Vec<usize> {
        std::iter::once(self.name_width)
            .chain(self.columns.iter().map(|c| c.width))
            .collect()
    }

    /// Header line followed by the separator rule.
    pub fn header(&self) -> String {
        let mut fields = vec![fit_left(&format!("{} Program", self.title), self.name_width)];
        fields.extend(self.columns.iter().map(|c| fit_right(&c.spec.header, c.width)));

        let rule = self
            .widths()
            .into_iter()
            .map(|w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("-+-");

        format!("{}\n{}", fields.join(SEPARATOR), rule)
    }

    /// Render a task's outcomes, indexed by invocation.
    pub fn render_row(&self, name: &str, outcomes: &[InvocationOutcome]) -> ReportRow {
        let mut fields = vec![fit_left(name, self.name_width)];
        for column in &self.columns {
            let cell = render_cell(&column.spec, outcomes.get(column.spec.invocation));
            fields.push(fit_right(&cell, column.width));
        }
        ReportRow {
            name: name.to_string(),
            fields,
        }
    }
}

/// Rows of one section, in the order they were reported.
#[derive(Debug, Clone)]
pub struct SectionReport {
    layout: ReportLayout,
    rows: Vec<ReportRow>,
}

impl SectionReport {
    pub fn new(layout: ReportLayout) -> Self {
        Self {
            layout,
            rows: Vec::new(),
        }
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    /// Render and append a row.
    pub fn push(&mut self, name: &str, outcomes: &[InvocationOutcome]) -> &ReportRow {
        let row = self.layout.render_row(name, outcomes);
        self.rows.push(row);
        &self.rows[self.rows.len() - 1]
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Whole table: header, rule and every row.
    pub fn render(&self) -> String {
        let mut out = self.layout.header();
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.line());
            out.push('\n');
        }
        out
    }
}

fn natural_width(spec: &ColumnSpec) -> usize {
    let base = DURATION_WIDTH + 2 + 1;
    if spec.count_slot.is_some() {
        base + 2 + COUNT_WIDTH + 2
    } else {
        base
    }
}

fn render_cell(spec: &ColumnSpec, outcome: Option<&InvocationOutcome>) -> String {
    let (duration, symbol, count) = match outcome {
        Some(InvocationOutcome::LaunchFailed(_)) => (LAUNCH_FAILED_TEXT.to_string(), '?', None),
        Some(InvocationOutcome::ParseFailed(_)) => (PARSE_FAILED_TEXT.to_string(), '?', None),
        Some(outcome) => match outcome.record() {
            Some(record) => record_cell(spec, record),
            None => (MISSING_TEXT.to_string(), '?', None),
        },
        None => (MISSING_TEXT.to_string(), '?', None),
    };

    let mut cell = format!("{:>width$}  {}", duration, symbol, width = DURATION_WIDTH);
    if spec.count_slot.is_some() {
        let count = count.unwrap_or_else(|| MISSING_TEXT.to_string());
        cell.push_str(&format!("  ({:>width$})", count, width = COUNT_WIDTH));
    }
    cell
}

fn record_cell(spec: &ColumnSpec, record: &GistRecord) -> (String, char, Option<String>) {
    let (duration, symbol) = match record.get(spec.slot).and_then(Slot::category) {
        Some(category) => (category.duration.clone(), category.verdict.symbol()),
        None => (MISSING_TEXT.to_string(), '?'),
    };
    let count = spec
        .count_slot
        .and_then(|i| record.get(i))
        .and_then(Slot::count)
        .map(|n| n.to_string());
    (duration, symbol, count)
}

fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

fn fit_left(s: &str, width: usize) -> String {
    format!("{:<width$}", truncate(s, width), width = width)
}

fn fit_right(s: &str, width: usize) -> String {
    format!("{:>width$}", truncate(s, width), width = width)
}
