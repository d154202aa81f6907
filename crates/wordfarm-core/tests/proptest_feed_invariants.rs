//! Property-based invariant tests for snapshot diffing and reveal planning.
//!
//! Verifies:
//! 1. A tail with a new id always reveals from offset 0
//! 2. Tail growth from L to L+k marks exactly the last k chars, spaced by one unit
//! 3. Planning twice on the same input gives the same plan
//! 4. Links never change the character count used for delays
//! 5. A viewer away from the bottom is never auto-scrolled

use proptest::prelude::*;
use std::time::Duration;
use wordfarm_core::prelude::*;

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_token() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9éü😃]{1,6}",
        Just(" ".to_string()),
        Just("\n".to_string()),
        Just(", ".to_string()),
        Just("https://wordfarm.example/a?b=c".to_string()),
        Just("www.example.org".to_string()),
        Just("(http://x.io/p)".to_string()),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_token(), 1..12).prop_map(|tokens| tokens.concat())
}

fn post(id: &str, text: &str) -> Post {
    Post::new(id.into(), text.into(), None, None).unwrap()
}

proptest! {
    #[test]
    fn new_tail_ids_always_reveal_from_zero(texts in prop::collection::vec(arb_text(), 1..8)) {
        let mut previous: Vec<Post> = Vec::new();
        for (n, text) in texts.iter().enumerate() {
            let mut next = previous.clone();
            next.push(post(&format!("p{n}"), text));
            let diff = diff(&previous, &next);
            let tail = next.last().unwrap();
            prop_assert_eq!(&diff, &FeedDiff::NewTail { id: tail.id.clone() });
            prop_assert_eq!(schedule_reveal(tail, &diff).from_offset(), 0);
            previous = next;
        }
    }

    #[test]
    fn growth_marks_exactly_the_appended_suffix(base in arb_text(), extra in arb_text()) {
        let before = post("a", &base);
        let after = post("a", &format!("{base}{extra}"));
        let diff = diff(&[before.clone()], &[after.clone()]);
        let plan = schedule_reveal(&after, &diff);

        let old_len = before.char_len();
        let k = extra.chars().count();
        prop_assert_eq!(plan.new_count(), k);
        for (i, reveal) in plan.iter().enumerate() {
            if i < old_len {
                prop_assert_eq!(reveal, Reveal::Settled);
            } else {
                let step = u32::try_from(i - old_len).unwrap();
                prop_assert_eq!(reveal, Reveal::New { delay: UNIT_DELAY * step });
            }
        }
    }

    #[test]
    fn planning_is_idempotent(text in arb_text(), offset in 0usize..40) {
        let post = post("a", &text);
        let diff = FeedDiff::TailGrew { id: "a".into(), from_offset: offset };
        let detector = LinkDetector::new().unwrap();
        let first = schedule_reveal(&post, &diff);
        let second = schedule_reveal(&post, &diff);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(lay_out(&post, &first, &detector), lay_out(&post, &second, &detector));
    }

    #[test]
    fn links_do_not_shift_the_character_index(text in arb_text(), offset in 0usize..40) {
        prop_assume!(!text.trim().is_empty());
        let post = post("a", &text);
        let plan = schedule_reveal(&post, &FeedDiff::TailGrew { id: "a".into(), from_offset: offset });
        let rendered = lay_out(&post, &plan, &LinkDetector::new().unwrap());

        prop_assert_eq!(rendered.char_count, post.char_len());
        let breaks = text.matches('\n').count();
        let spans: usize = rendered.units().map(|unit| unit.span()).sum();
        prop_assert_eq!(spans + breaks, post.char_len());

        let mut last_delay: Option<Duration> = None;
        for unit in rendered.units() {
            prop_assert_eq!(unit.reveal(), plan.reveal(unit.index()));
            if let Reveal::New { delay } = unit.reveal() {
                if let Some(last) = last_delay {
                    prop_assert!(delay > last);
                }
                last_delay = Some(delay);
            }
        }
    }

    #[test]
    fn reader_away_from_bottom_is_never_scrolled(
        offset in 0.0f64..1000.0,
        height in 1.0f64..400.0,
        gap in 4.5f64..1000.0,
        growth in 0.0f64..500.0,
    ) {
        let mut anchor = ScrollAnchor::default();
        let first = Viewport::new(0.0, height, height);
        let capture = anchor.capture(&first);
        prop_assert!(anchor.should_auto_scroll(capture, &first));

        // `gap` past the tolerance away from the bottom
        let content = offset + height + gap;
        let before = Viewport::new(offset, height, content);
        let capture = anchor.capture(&before);
        prop_assert!(!capture.was_at_bottom);
        let after = Viewport::new(offset, height, content + growth);
        prop_assert!(!anchor.should_auto_scroll(capture, &after));
    }
}
