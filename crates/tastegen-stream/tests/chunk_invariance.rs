use proptest::prelude::*;
use tastegen_artifact::GROUP_PAIRS;
use tastegen_stream::{MarkerScanner, SessionConfig, StreamEvent};
use tastegen_test_utils::fixtures::{
    narrated_checkpoints, REACT_CUT_OFF, REACT_TWO_CHECKPOINTS, REACT_UNBALANCED_SECOND,
    SCENARIO_A,
};
use tastegen_test_utils::{chars, replay, split_at};

fn corpus() -> Vec<(SessionConfig, String)> {
    vec![
        (SessionConfig::narration_and_code(), SCENARIO_A.to_string()),
        (SessionConfig::narration_and_code(), narrated_checkpoints()),
        (SessionConfig::checkpoint_only(), REACT_TWO_CHECKPOINTS.to_string()),
        (SessionConfig::checkpoint_only(), REACT_UNBALANCED_SECOND.to_string()),
        (SessionConfig::checkpoint_only(), REACT_CUT_OFF.to_string()),
    ]
}

/// Fragments that recombine into streams full of near-miss markers
fn fragment() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("export default function App() {\n"),
        Just("  return (<p>{x}</p>);\n"),
        Just("  if (a) {\n"),
        Just("}\n"),
        Just(")"),
        Just("/*$COMPLETION\n"),
        Just("$END_COMPLETION*/\n"),
        Just("// $CHECKPOINT\n"),
        Just("// $CHECK"),
        Just("/*$COMP"),
        Just("$GENERATING\n"),
        Just("$GEN"),
        Just("some narration\n"),
        Just("é ✓ "),
    ]
}

fn stream_text() -> impl Strategy<Value = String> {
    prop::collection::vec(fragment(), 0..24).prop_map(|parts| parts.concat())
}

fn is_balanced(text: &str) -> bool {
    GROUP_PAIRS
        .iter()
        .all(|(open, close)| text.matches(*open).count() == text.matches(*close).count())
}

#[test]
fn test_one_char_chunks_match_single_chunk() {
    for (config, text) in corpus() {
        let whole = replay(config.clone(), &[text.as_str()]);
        let by_char = replay(config, &chars(&text));
        assert_eq!(whole, by_char, "stream {text:?}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_fixture_chunking_is_invariant(
        which in 0usize..5,
        cuts in prop::collection::vec(0usize..600, 0..40),
    ) {
        let (config, text) = corpus().swap_remove(which);
        let whole = replay(config.clone(), &[text.as_str()]);
        let split = replay(config, &split_at(&text, &cuts));
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn prop_generated_stream_chunking_is_invariant(
        text in stream_text(),
        cuts in prop::collection::vec(0usize..400, 0..30),
        narrated in any::<bool>(),
    ) {
        let config = if narrated {
            SessionConfig::narration_and_code()
        } else {
            SessionConfig::checkpoint_only()
        };
        let whole = replay(config.clone(), &[text.as_str()]);
        let split = replay(config.clone(), &split_at(&text, &cuts));
        let by_char = replay(config, &chars(&text));
        prop_assert_eq!(&whole, &split);
        prop_assert_eq!(&whole, &by_char);
    }

    #[test]
    fn prop_ordinals_increase_and_final_is_last(text in stream_text(), narrated in any::<bool>()) {
        let config = if narrated {
            SessionConfig::narration_and_code()
        } else {
            SessionConfig::checkpoint_only()
        };
        let events = replay(config, &[text.as_str()]);
        let ordinals: Vec<u64> = events.iter().filter_map(StreamEvent::ordinal).collect();
        prop_assert!(ordinals.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        prop_assert!(events.last().is_some_and(StreamEvent::is_terminal));
    }

    #[test]
    fn prop_no_unbalanced_intermediate(text in stream_text()) {
        let events = replay(SessionConfig::checkpoint_only(), &[text.as_str()]);
        for event in &events {
            if let StreamEvent::Intermediate { artifact, .. } = event {
                prop_assert!(is_balanced(artifact.text()), "{:?}", artifact.text());
            }
        }
    }

    #[test]
    fn prop_consecutive_intermediates_differ(text in stream_text()) {
        let events = replay(SessionConfig::checkpoint_only(), &[text.as_str()]);
        let texts: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Intermediate { artifact, .. } => Some(artifact.text()),
                _ => None,
            })
            .collect();
        prop_assert!(texts.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn prop_rescan_is_idempotent(text in stream_text(), finished in any::<bool>()) {
        let scanner = MarkerScanner::new(SessionConfig::narration_and_code().delimiters());
        prop_assert_eq!(scanner.scan(&text, finished), scanner.scan(&text, finished));
    }
}
