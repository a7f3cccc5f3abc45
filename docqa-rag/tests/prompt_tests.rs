//! Tests for prompt composition under a context budget.

use std::collections::HashMap;

use docqa_rag::config::DEFAULT_NO_CONTEXT_MARKER;
use docqa_rag::{Chunk, ContextOverflow, PromptComposer};
use proptest::prelude::*;

fn chunk(index: usize, text: &str) -> Chunk {
    Chunk {
        index,
        text: text.to_string(),
        origin_segment_ids: vec![0],
        start_offset: 0,
        length: text.chars().count(),
        metadata: HashMap::new(),
    }
}

fn chunks(texts: &[&str]) -> Vec<Chunk> {
    texts.iter().enumerate().map(|(i, t)| chunk(i, t)).collect()
}

#[test]
fn chunks_are_joined_in_rank_order_within_budget() {
    let retrieved = chunks(&["aaaaaaaaaa", "bbbbbbbbbb", "cccccccccc"]);

    let composition = PromptComposer::new().compose("sys", "q", &retrieved, 25);

    assert_eq!(composition.prompt.context_text, "aaaaaaaaaa\n\nbbbbbbbbbb");
    assert_eq!(composition.included_chunks, 2);
    assert!(composition.overflow.is_none());
}

#[test]
fn chunk_that_does_not_fit_is_dropped_not_truncated() {
    let retrieved = chunks(&["aaaaaaaaaa", "bbbbbbbbbb"]);

    let composition = PromptComposer::new().compose("sys", "q", &retrieved, 21);

    assert_eq!(composition.prompt.context_text, "aaaaaaaaaa");
    assert_eq!(composition.included_chunks, 1);
    assert!(composition.overflow.is_none());
}

#[test]
fn oversized_first_chunk_is_truncated_and_flagged() {
    let retrieved = chunks(&["The bearing frame holds 5 liters of oil.", "short"]);

    let composition = PromptComposer::new().compose("sys", "q", &retrieved, 12);

    assert_eq!(composition.prompt.context_text, "The bearing ");
    assert_eq!(composition.included_chunks, 1);
    assert_eq!(
        composition.overflow,
        Some(ContextOverflow { chunk_length: 40, max_context_length: 12 })
    );
}

#[test]
fn truncation_respects_character_boundaries() {
    let retrieved = chunks(&["Вязкость 100 сСт"]);

    let composition = PromptComposer::new().compose("sys", "q", &retrieved, 8);

    assert_eq!(composition.prompt.context_text, "Вязкость");
    assert!(composition.overflow.is_some());
}

#[test]
fn no_chunks_yields_the_no_context_marker() {
    let composer = PromptComposer::new();
    let composition = composer.compose("sys", "q", &[], 100);

    assert_eq!(composer.no_context_marker(), DEFAULT_NO_CONTEXT_MARKER);

    assert_eq!(composition.prompt.context_text, DEFAULT_NO_CONTEXT_MARKER);
    assert_eq!(composition.included_chunks, 0);
    assert!(composition.overflow.is_none());
}

#[test]
fn instructions_and_query_pass_through() {
    let composer = PromptComposer::new().with_delimiter(" | ").with_no_context_marker("NONE");

    let retrieved = chunks(&["a", "b"]);
    let composition =
        composer.compose("Answer in Finnish.", "Mikä on öljyn viskositeetti?", &retrieved, 50);

    assert_eq!(composition.prompt.system_instructions, "Answer in Finnish.");
    assert_eq!(composition.prompt.query, "Mikä on öljyn viskositeetti?");
    assert_eq!(composition.prompt.context_text, "a | b");
    assert_eq!(composer.no_context_marker(), "NONE");
    assert_eq!(composer.compose("s", "q", &[], 50).prompt.context_text, "NONE");
}

/// **Property: budget respected**
/// *For any* retrieved chunks and budget, the context never exceeds the
/// budget; it is exactly the budget only on the flagged overflow path, and
/// otherwise consists of whole chunks in rank order.
mod prop_budget {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn context_never_exceeds_budget(
            texts in proptest::collection::vec("[a-zé ]{0,40}", 1..8),
            budget in 1usize..120,
        ) {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            let retrieved = chunks(&refs);

            let composition = PromptComposer::new().compose("sys", "q", &retrieved, budget);
            let context = &composition.prompt.context_text;

            prop_assert!(context.chars().count() <= budget);
            match composition.overflow {
                Some(overflow) => {
                    prop_assert_eq!(composition.included_chunks, 1);
                    prop_assert_eq!(overflow.chunk_length, texts[0].chars().count());
                    prop_assert!(texts[0].starts_with(context.as_str()));
                }
                None => {
                    let expected = refs[..composition.included_chunks].join("\n\n");
                    prop_assert_eq!(context, &expected);
                }
            }
        }
    }
}
