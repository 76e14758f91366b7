//! Decoder for the verifier's gist line.
//!
//! The verifier ends its output with one status line of the form
//!
//! ```text
//! <ignored-prefix>=<cell_0>;<cell_1>;...;<cell_{N-1}>
//! ```
//!
//! where a verdict cell is `<token>:<duration>` and a guarantee-count cell is a
//! bare integer. The line is not self-describing: which slot means what is
//! fixed by the mode flags of the invocation, captured here as a [`GistLayout`].

use serde::{Deserialize, Serialize};

use crate::error::GistError;
use crate::runner::RawInvocationResult;
use crate::task::VerificationMode;

/// Duration text the verifier (and the harness) use for a timed-out check.
pub const TIMED_OUT_DURATION: &str = "t/o";

/// Outcome of one verification question.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Timeout,
    Unknown,
}

impl Verdict {
    /// Map a verdict token. Total: anything unrecognised is `Unknown`.
    pub fn from_token(token: &str) -> Self {
        match token {
            "1" => Verdict::Pass,
            "0" => Verdict::Fail,
            "to" => Verdict::Timeout,
            _ => Verdict::Unknown,
        }
    }

    /// Table symbol. Timeouts print like failures.
    pub fn symbol(&self) -> char {
        match self {
            Verdict::Pass => '✓',
            Verdict::Fail | Verdict::Timeout => '✗',
            Verdict::Unknown => '?',
        }
    }
}

/// One verdict plus the verifier's duration text, kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub verdict: Verdict,
    pub duration: String,
}

impl Category {
    pub fn new(verdict: Verdict, duration: impl Into<String>) -> Self {
        Self {
            verdict,
            duration: duration.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self::new(Verdict::Timeout, TIMED_OUT_DURATION)
    }

    pub fn is_timed_out(&self) -> bool {
        self.verdict == Verdict::Timeout
    }
}

/// What a gist position is expected to hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Number of synthesized or supplied type guarantees.
    Count,
    Verdict,
}

/// A decoded gist position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Count(u64),
    Category(Category),
}

impl Slot {
    pub fn category(&self) -> Option<&Category> {
        match self {
            Slot::Category(c) => Some(c),
            Slot::Count(_) => None,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            Slot::Count(n) => Some(*n),
            Slot::Category(_) => None,
        }
    }
}

/// Expected slot kinds of one invocation's gist, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct GistLayout(Vec<SlotKind>);

impl GistLayout {
    pub fn new(slots: Vec<SlotKind>) -> Self {
        Self(slots)
    }

    /// `n` verdict slots and no guarantee count.
    pub fn verdicts(n: usize) -> Self {
        Self(vec![SlotKind::Verdict; n])
    }

    /// Layout emitted for a set of modes.
    ///
    /// Any types mode contributes a guarantee count followed by the types
    /// verdict; annotations and linearizability each add one verdict, in that
    /// order.
    pub fn for_modes(modes: &[VerificationMode]) -> Self {
        let mut slots = Vec::new();
        if modes.iter().any(|m| m.checks_types()) {
            slots.push(SlotKind::Count);
            slots.push(SlotKind::Verdict);
        }
        if modes.contains(&VerificationMode::CheckAnnotations) {
            slots.push(SlotKind::Verdict);
        }
        if modes.contains(&VerificationMode::CheckLinearizability) {
            slots.push(SlotKind::Verdict);
        }
        Self(slots)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<SlotKind> {
        self.0.get(index).copied()
    }

    pub fn kinds(&self) -> &[SlotKind] {
        &self.0
    }
}

/// Decoded gist, one slot per layout position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GistRecord {
    slots: Vec<Slot>,
}

impl GistRecord {
    /// Record standing in for an invocation the harness had to kill.
    pub fn timed_out(layout: &GistLayout) -> Self {
        Self {
            slots: vec![Slot::Category(Category::timed_out()); layout.len()],
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Verdict categories, skipping count slots.
    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.slots.iter().filter_map(Slot::category)
    }

    pub fn all_timed_out(&self) -> bool {
        self.categories().all(Category::is_timed_out)
    }
}

/// Synthetic gist for a harness-imposed timeout: `to:t/o` in every slot.
pub fn timeout_sentinel(n: usize) -> String {
    let cells = vec![format!("to:{TIMED_OUT_DURATION}"); n];
    format!("#gist={}", cells.join(";"))
}

/// Decode one invocation result against its layout.
pub fn decode(raw: &RawInvocationResult, layout: &GistLayout) -> Result<GistRecord, GistError> {
    match raw {
        RawInvocationResult::TimedOut => Ok(GistRecord::timed_out(layout)),
        RawInvocationResult::Completed { output, .. } => decode_output(output, layout),
    }
}

/// Decode captured output: only the last non-blank line matters.
pub fn decode_output(output: &str, layout: &GistLayout) -> Result<GistRecord, GistError> {
    let line = output
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or(GistError::EmptyOutput)?;
    decode_line(line, layout)
}

/// Decode a single status line.
pub fn decode_line(line: &str, layout: &GistLayout) -> Result<GistRecord, GistError> {
    let line = line.trim();
    let (_, body) = line
        .rsplit_once('=')
        .ok_or_else(|| GistError::MissingDelimiter {
            line: line.to_string(),
        })?;

    let cells: Vec<&str> = body.split(';').map(str::trim).collect();
    if cells.len() != layout.len() {
        return Err(GistError::CategoryCount {
            expected: layout.len(),
            found: cells.len(),
        });
    }

    let slots = cells
        .into_iter()
        .zip(layout.kinds())
        .enumerate()
        .map(|(index, (cell, kind))| decode_cell(index, cell, *kind))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GistRecord { slots })
}

fn decode_cell(index: usize, cell: &str, kind: SlotKind) -> Result<Slot, GistError> {
    let invalid_count = || GistError::InvalidCount {
        index,
        cell: cell.to_string(),
    };

    match (kind, cell.split_once(':')) {
        (SlotKind::Verdict, Some((token, duration))) => Ok(Slot::Category(Category::new(
            Verdict::from_token(token.trim()),
            duration.trim(),
        ))),
        (SlotKind::Verdict, None) => Err(GistError::MalformedCategory {
            index,
            cell: cell.to_string(),
        }),
        // A timed-out verifier writes `to:t/o` even where a count belongs.
        (SlotKind::Count, Some((token, duration))) => {
            match Verdict::from_token(token.trim()) {
                Verdict::Timeout => Ok(Slot::Category(Category::new(
                    Verdict::Timeout,
                    duration.trim(),
                ))),
                _ => Err(invalid_count()),
            }
        }
        (SlotKind::Count, None) => cell
            .parse::<u64>()
            .map(Slot::Count)
            .map_err(|_| invalid_count()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_tokens() {
        assert_eq!(Verdict::from_token("1"), Verdict::Pass);
        assert_eq!(Verdict::from_token("0"), Verdict::Fail);
        assert_eq!(Verdict::from_token("to"), Verdict::Timeout);
        assert_eq!(Verdict::from_token("?"), Verdict::Unknown);
        assert_eq!(Verdict::from_token(""), Verdict::Unknown);
        assert_eq!(Verdict::from_token("yes"), Verdict::Unknown);
    }

    #[test]
    fn test_verdict_symbols() {
        assert_eq!(Verdict::Pass.symbol(), '✓');
        assert_eq!(Verdict::Fail.symbol(), '✗');
        assert_eq!(Verdict::Timeout.symbol(), Verdict::Fail.symbol());
        assert_eq!(Verdict::Unknown.symbol(), '?');
    }

    #[test]
    fn test_layout_for_modes() {
        use VerificationMode::*;

        assert_eq!(
            GistLayout::for_modes(&[SynthesizeTypes]).kinds(),
            &[SlotKind::Count, SlotKind::Verdict]
        );
        assert_eq!(
            GistLayout::for_modes(&[CheckGivenTypes, CheckAnnotations, CheckLinearizability])
                .len(),
            4
        );
        assert_eq!(
            GistLayout::for_modes(&[CheckLinearizability]),
            GistLayout::verdicts(1)
        );
    }

    #[test]
    fn test_duration_keeps_inner_colons() {
        let record = decode_line("#gist=1:01:02:03.5", &GistLayout::verdicts(1)).unwrap();
        assert_eq!(
            record.get(0).and_then(Slot::category),
            Some(&Category::new(Verdict::Pass, "01:02:03.5"))
        );
    }

    #[test]
    fn test_only_last_delimiter_counts() {
        let record = decode_line("a=b==0:1.0", &GistLayout::verdicts(1)).unwrap();
        assert_eq!(record.get(0).unwrap().category().unwrap().verdict, Verdict::Fail);
    }

    #[test]
    fn test_count_slot() {
        let layout = GistLayout::for_modes(&[VerificationMode::SynthesizeTypes]);
        let record = decode_line("#gist=12;1:0.42", &layout).unwrap();
        assert_eq!(record.get(0).and_then(Slot::count), Some(12));
        assert_eq!(record.categories().count(), 1);
    }

    #[test]
    fn test_invalid_count() {
        let layout = GistLayout::for_modes(&[VerificationMode::SynthesizeTypes]);
        let err = decode_line("#gist=many;1:0.42", &layout).unwrap_err();
        assert_eq!(
            err,
            GistError::InvalidCount {
                index: 0,
                cell: "many".to_string()
            }
        );
    }

    #[test]
    fn test_verdict_in_count_slot_is_invalid_count() {
        let layout = GistLayout::for_modes(&[VerificationMode::SynthesizeTypes]);

        let err = decode_line("#gist=1:0.40;0:0.30", &layout).unwrap_err();
        assert_eq!(
            err,
            GistError::InvalidCount {
                index: 0,
                cell: "1:0.40".to_string()
            }
        );

        let err = decode_line("#gist=?:3.0;1:0.30", &layout).unwrap_err();
        assert!(matches!(err, GistError::InvalidCount { index: 0, .. }));
    }

    #[test]
    fn test_timeout_in_count_slot() {
        let layout = GistLayout::for_modes(&[VerificationMode::SynthesizeTypes]);
        let record = decode_line("#gist=to:t/o;to:t/o", &layout).unwrap();
        assert_eq!(record.get(0).and_then(Slot::count), None);
        assert!(record.all_timed_out());
        assert_eq!(record.categories().count(), 2);
    }

    #[test]
    fn test_malformed_category() {
        let err = decode_line("#gist=1", &GistLayout::verdicts(1)).unwrap_err();
        assert!(matches!(err, GistError::MalformedCategory { index: 0, .. }));
    }

    #[test]
    fn test_missing_delimiter() {
        let err = decode_line("segmentation fault", &GistLayout::verdicts(1)).unwrap_err();
        assert!(matches!(err, GistError::MissingDelimiter { .. }));
    }

    #[test]
    fn test_empty_output() {
        let err = decode_output("\n  \n", &GistLayout::verdicts(1)).unwrap_err();
        assert_eq!(err, GistError::EmptyOutput);
    }

    #[test]
    fn test_trailing_blank_lines_ignored() {
        let output = "parsing...\nchecking...\n#gist=1:0.1;?:0.2\n\n";
        let record = decode_output(output, &GistLayout::verdicts(2)).unwrap();
        let verdicts: Vec<Verdict> = record.categories().map(|c| c.verdict).collect();
        assert_eq!(verdicts, vec![Verdict::Pass, Verdict::Unknown]);
    }

    #[test]
    fn test_timeout_sentinel_text() {
        assert_eq!(timeout_sentinel(2), "#gist=to:t/o;to:t/o");
    }
}
