//! Turns a post plus its reveal plan into renderable lines.
//!
//! Every unit carries the global character index it starts at. The index is
//! shared by all lines of a post and counts line breaks too, so it lines up
//! with [`RevealPlan`] indices whatever links the text contains.

use crate::post::{Post, PostId};
use crate::reveal::{Reveal, RevealPlan};
use crate::segment::{LinkDetector, Segment};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use textwrap::{self, wrap};

const CONTENT_WIDTH: usize = 60;

/// Smallest renderable piece of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Char {
        ch: char,
        index: usize,
        reveal: Reveal,
    },
    /// A link appears or is settled as a whole; it takes the reveal of the
    /// first character it covers.
    Link {
        text: String,
        target: String,
        index: usize,
        reveal: Reveal,
    },
}

impl Unit {
    pub fn index(&self) -> usize {
        match self {
            Unit::Char { index, .. } | Unit::Link { index, .. } => *index,
        }
    }

    pub fn reveal(&self) -> Reveal {
        match self {
            Unit::Char { reveal, .. } | Unit::Link { reveal, .. } => *reveal,
        }
    }

    /// Characters of the post covered by this unit.
    pub fn span(&self) -> usize {
        match self {
            Unit::Char { .. } => 1,
            Unit::Link { text, .. } => text.chars().count(),
        }
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Unit::Char { ch, .. } => out.push(*ch),
            Unit::Link { text, .. } => out.push_str(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedLine {
    pub units: Vec<Unit>,
}

impl RenderedLine {
    pub fn text(&self) -> String {
        let mut out = String::new();
        for unit in &self.units {
            unit.push_text(&mut out);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPost {
    pub id: PostId,
    pub lines: Vec<RenderedLine>,
    pub image_url: Option<String>,
    /// Total characters walked, line breaks included.
    pub char_count: usize,
}

impl RenderedPost {
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.lines.iter().flat_map(|line| line.units.iter())
    }

    /// Units that still have to appear, in reveal order.
    pub fn pending(&self) -> impl Iterator<Item = &Unit> {
        self.units().filter(|unit| unit.reveal().is_new())
    }

    /// Delay of the last unit to appear.
    pub fn reveal_duration(&self) -> Duration {
        self.pending()
            .map(|unit| unit.reveal().delay())
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

/// Lay `post` out line by line under `plan`.
pub fn lay_out(post: &Post, plan: &RevealPlan, detector: &LinkDetector) -> RenderedPost {
    let mut lines = Vec::new();
    let mut index = 0usize;

    if !post.text.trim().is_empty() {
        let mut raw_lines = post.text.split('\n').peekable();
        while let Some(raw) = raw_lines.next() {
            let (line, carriage) = match raw.strip_suffix('\r') {
                Some(line) => (line, 1),
                None => (raw, 0),
            };
            let mut units = Vec::new();
            for segment in detector.segment(line) {
                match segment {
                    Segment::Literal { text } => {
                        for ch in text.chars() {
                            units.push(Unit::Char {
                                ch,
                                index,
                                reveal: plan.reveal(index),
                            });
                            index += 1;
                        }
                    }
                    Segment::Link { text, target } => {
                        let span = text.chars().count();
                        units.push(Unit::Link {
                            text,
                            target,
                            index,
                            reveal: plan.reveal(index),
                        });
                        index += span;
                    }
                }
            }
            index += carriage;
            if raw_lines.peek().is_some() {
                // the '\n' consumed by the split
                index += 1;
            }
            lines.push(RenderedLine { units });
        }
    } else {
        index = post.char_len();
    }

    RenderedPost {
        id: post.id.clone(),
        lines,
        image_url: post.image_url.clone(),
        char_count: index,
    }
}

impl Display for RenderedPost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let wrapping_config = textwrap::Options::new(CONTENT_WIDTH).break_words(true);
        for line in &self.lines {
            let text = line.text();
            if text.is_empty() {
                writeln!(f)?;
                continue;
            }
            for wrapped in wrap(&text, &wrapping_config) {
                writeln!(f, "{wrapped}")?;
            }
        }
        if let Some(url) = &self.image_url {
            writeln!(f, "[image] {url}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedDiff;
    use crate::reveal::{schedule_reveal, UNIT_DELAY};

    fn post(text: &str) -> Post {
        Post::new("a".into(), text.into(), None, None).unwrap()
    }

    fn render(text: &str, diff: &FeedDiff) -> RenderedPost {
        let post = post(text);
        let plan = schedule_reveal(&post, diff);
        lay_out(&post, &plan, &LinkDetector::new().unwrap())
    }

    #[test]
    fn index_is_shared_across_lines() {
        let rendered = render("ab\ncd", &FeedDiff::NewTail { id: "a".into() });
        assert_eq!(rendered.lines.len(), 2);
        let indices: Vec<usize> = rendered.units().map(Unit::index).collect();
        assert_eq!(indices, vec![0, 1, 3, 4]);
        assert_eq!(rendered.char_count, 5);
    }

    #[test]
    fn link_occupies_its_full_span() {
        let rendered = render("x www.a.io y", &FeedDiff::NewTail { id: "a".into() });
        let units: Vec<&Unit> = rendered.units().collect();
        assert_eq!(units.len(), 5);
        assert!(matches!(units[2], Unit::Link { index: 2, .. }));
        assert_eq!(units[2].reveal().delay(), UNIT_DELAY * 2);
        // The space after the link continues as if the link had been typed.
        assert_eq!(units[3].index(), 10);
        assert_eq!(units[3].reveal().delay(), UNIT_DELAY * 10);
    }

    #[test]
    fn link_straddling_the_offset_is_settled_as_a_whole() {
        let diff = FeedDiff::TailGrew {
            id: "a".into(),
            from_offset: 5,
        };
        let rendered = render("see www.a.io", &diff);
        let link = rendered.units().find(|unit| matches!(unit, Unit::Link { .. }));
        assert_eq!(link.map(Unit::reveal), Some(Reveal::Settled));
        assert_eq!(rendered.pending().count(), 0);
    }

    #[test]
    fn growth_after_a_link_animates_only_the_suffix() {
        let diff = FeedDiff::TailGrew {
            id: "a".into(),
            from_offset: 11,
        };
        let rendered = render("www.a.io ok!", &diff);
        let pending: Vec<(usize, Duration)> = rendered
            .pending()
            .map(|unit| (unit.index(), unit.reveal().delay()))
            .collect();
        assert_eq!(pending, vec![(11, Duration::ZERO)]);
        assert_eq!(rendered.reveal_duration(), Duration::ZERO);
    }

    #[test]
    fn blank_text_renders_no_lines() {
        let post = Post::new("a".into(), "  ".into(), None, None).unwrap();
        let plan = schedule_reveal(&post, &FeedDiff::NewTail { id: "a".into() });
        let rendered = lay_out(&post, &plan, &LinkDetector::new().unwrap());
        assert!(rendered.lines.is_empty());
        assert_eq!(rendered.char_count, 2);
    }

    #[test]
    fn display_wraps_text_and_lists_the_image() {
        let post = Post::new(
            "a".into(),
            "hello".into(),
            Some("mem://blobs/1_cat.png".into()),
            None,
        )
        .unwrap();
        let plan = RevealPlan::settled(&post);
        let rendered = lay_out(&post, &plan, &LinkDetector::new().unwrap());
        assert_eq!(rendered.to_string(), "hello\n[image] mem://blobs/1_cat.png\n");
    }
}
