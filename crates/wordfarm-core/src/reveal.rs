//! Per-character reveal schedule for the typewriter effect.
//!
//! # Invariants
//!
//! 1. Characters before `from_offset` are settled and carry no delay.
//! 2. Characters at or after `from_offset` are new, with
//!    `delay = (i - from_offset) * unit`, strictly increasing with `i`.
//! 3. Only the post named by the current diff gets a non-trivial plan.
//! 4. Planning is pure; the same inputs always yield the same plan.

use crate::feed::FeedDiff;
use crate::post::{Post, PostId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay between two consecutively revealed characters.
pub const UNIT_DELAY: Duration = Duration::from_millis(50);

/// How a single character shows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// Already on screen, full opacity.
    Settled,
    /// Fades in after `delay`.
    New { delay: Duration },
}

impl Reveal {
    pub fn is_new(&self) -> bool {
        matches!(self, Reveal::New { .. })
    }

    pub fn delay(&self) -> Duration {
        match self {
            Reveal::Settled => Duration::ZERO,
            Reveal::New { delay } => *delay,
        }
    }
}

/// Reveal schedule for every character of one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealPlan {
    post_id: PostId,
    len: usize,
    from_offset: usize,
    unit: Duration,
}

impl RevealPlan {
    /// A plan where nothing animates.
    pub fn settled(post: &Post) -> Self {
        let len = post.char_len();
        Self {
            post_id: post.id.clone(),
            len,
            from_offset: len,
            unit: UNIT_DELAY,
        }
    }

    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    /// First character index that counts as new. Equal to [`Self::len`] when
    /// nothing animates.
    pub fn from_offset(&self) -> usize {
        self.from_offset
    }

    /// Number of characters covered by the plan.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of characters that animate.
    pub fn new_count(&self) -> usize {
        self.len - self.from_offset
    }

    pub fn is_settled(&self) -> bool {
        self.new_count() == 0
    }

    /// Reveal of the character at `index`. Indices past the end are settled.
    pub fn reveal(&self, index: usize) -> Reveal {
        if index < self.from_offset || index >= self.len {
            return Reveal::Settled;
        }
        let step = u32::try_from(index - self.from_offset).unwrap_or(u32::MAX);
        Reveal::New {
            delay: self.unit.saturating_mul(step),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Reveal> + '_ {
        (0..self.len).map(|index| self.reveal(index))
    }
}

/// Plan the reveal of `post` under `diff` with the default [`UNIT_DELAY`].
pub fn schedule_reveal(post: &Post, diff: &FeedDiff) -> RevealPlan {
    schedule_reveal_with(post, diff, UNIT_DELAY)
}

/// Plan the reveal of `post` under `diff`, spacing characters by `unit`.
pub fn schedule_reveal_with(post: &Post, diff: &FeedDiff, unit: Duration) -> RevealPlan {
    let len = post.char_len();
    let from_offset = match diff {
        FeedDiff::NewTail { id } if *id == post.id => 0,
        FeedDiff::TailGrew { id, from_offset } if *id == post.id => (*from_offset).min(len),
        _ => len,
    };
    RevealPlan {
        post_id: post.id.clone(),
        len,
        from_offset,
        unit,
    }
}

/// Which post is mid-reveal for the feed as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealState {
    last_animated_post_id: Option<PostId>,
    last_animated_start_index: usize,
}

impl RevealState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the state with the diff of the snapshot being handled.
    pub fn observe(&mut self, diff: &FeedDiff) {
        match diff {
            FeedDiff::NewTail { id } => {
                self.last_animated_post_id = Some(id.clone());
                self.last_animated_start_index = 0;
            }
            FeedDiff::TailGrew { id, from_offset } => {
                self.last_animated_post_id = Some(id.clone());
                self.last_animated_start_index = *from_offset;
            }
            FeedDiff::NoChange | FeedDiff::NoAnimatableChange => {}
        }
    }

    pub fn last_animated_post_id(&self) -> Option<&PostId> {
        self.last_animated_post_id.as_ref()
    }

    pub fn last_animated_start_index(&self) -> usize {
        self.last_animated_start_index
    }
}
