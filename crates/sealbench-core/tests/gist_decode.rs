//! Gist grammar properties.

use sealbench_core::{
    decode, decode_line, timeout_sentinel, Category, GistError, GistLayout, GistRecord,
    RawInvocationResult, Slot, SlotKind, VerificationMode, Verdict,
};

fn categories(record: &GistRecord) -> Vec<(Verdict, String)> {
    record
        .categories()
        .map(|c| (c.verdict, c.duration.clone()))
        .collect()
}

#[test]
fn every_token_maps_to_a_verdict() {
    let cases = [
        ("0", Verdict::Fail),
        ("1", Verdict::Pass),
        ("to", Verdict::Timeout),
        ("?", Verdict::Unknown),
        ("2", Verdict::Unknown),
        ("TO", Verdict::Unknown),
        ("", Verdict::Unknown),
    ];
    for (token, expected) in cases {
        let line = format!("#gist={token}:1.0");
        let record = decode_line(&line, &GistLayout::verdicts(1))
            .unwrap_or_else(|e| panic!("token {token:?} failed to decode: {e}"));
        assert_eq!(categories(&record), vec![(expected, "1.0".to_string())]);
    }
}

#[test]
fn pass_and_fail_with_durations() {
    let record = decode_line("#gist=1:00:03.210;0:12.000", &GistLayout::verdicts(2)).unwrap();
    assert_eq!(
        categories(&record),
        vec![
            (Verdict::Pass, "00:03.210".to_string()),
            (Verdict::Fail, "12.000".to_string()),
        ]
    );
}

#[test]
fn three_verifier_timeouts() {
    let record = decode_line("#gist=to:t/o;to:t/o;to:t/o", &GistLayout::verdicts(3)).unwrap();
    assert_eq!(record.len(), 3);
    assert!(record
        .slots()
        .iter()
        .all(|s| s == &Slot::Category(Category::new(Verdict::Timeout, "t/o"))));
}

#[test]
fn record_length_and_order_follow_input() {
    let cells = ["1:a", "0:b", "?:c", "to:d", "1:e"];
    let line = format!("prefix noise = more={}", cells.join(";"));
    let record = decode_line(&line, &GistLayout::verdicts(cells.len())).unwrap();

    let durations: Vec<String> = record.categories().map(|c| c.duration.clone()).collect();
    assert_eq!(durations, vec!["a", "b", "c", "d", "e"]);
}

#[test]
fn category_count_mismatch_is_a_parse_error() {
    let too_few = decode_line("#gist=1:0.1;0:0.2", &GistLayout::verdicts(3)).unwrap_err();
    assert_eq!(
        too_few,
        GistError::CategoryCount {
            expected: 3,
            found: 2
        }
    );

    let too_many = decode_line("#gist=1:0.1;0:0.2;1:0.3", &GistLayout::verdicts(2)).unwrap_err();
    assert_eq!(
        too_many,
        GistError::CategoryCount {
            expected: 2,
            found: 3
        }
    );
}

#[test]
fn harness_timeout_matches_verifier_timeout_line() {
    let layout = GistLayout::for_modes(&[
        VerificationMode::CheckGivenTypes,
        VerificationMode::CheckAnnotations,
        VerificationMode::CheckLinearizability,
    ]);

    let synthetic = decode(&RawInvocationResult::TimedOut, &layout).unwrap();
    let from_sentinel = decode_line(&timeout_sentinel(layout.len()), &layout).unwrap();
    let from_verifier = decode_line("#gist=to:t/o;to:t/o;to:t/o;to:t/o", &layout).unwrap();

    assert_eq!(synthetic, from_sentinel);
    assert_eq!(synthetic, from_verifier);
    assert!(synthetic.all_timed_out());
}

#[test]
fn completed_output_uses_last_line_only() {
    let raw = RawInvocationResult::Completed {
        output: "#gist=0:9.9\nsome later diagnostic =1:0.1\n".to_string(),
        exit_code: Some(0),
    };
    let record = decode(&raw, &GistLayout::verdicts(1)).unwrap();
    assert_eq!(categories(&record), vec![(Verdict::Pass, "0.1".to_string())]);
}

#[test]
fn guarantee_count_passes_through_verbatim() {
    let layout = GistLayout::new(vec![
        SlotKind::Count,
        SlotKind::Verdict,
        SlotKind::Verdict,
        SlotKind::Verdict,
    ]);
    let record = decode_line("#gist=17;1:0.8;1:2.1;?:t/o", &layout).unwrap();

    assert_eq!(record.get(0).and_then(Slot::count), Some(17));
    assert_eq!(
        categories(&record),
        vec![
            (Verdict::Pass, "0.8".to_string()),
            (Verdict::Pass, "2.1".to_string()),
            (Verdict::Unknown, "t/o".to_string()),
        ]
    );
}
