use crate::post::{Post, PostId, PostRecord};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::debug;

/// One atomic delivery of the whole feed, oldest post first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    posts: Vec<Post>,
}

impl Snapshot {
    /// Wrap an already validated, creation-ordered list of posts.
    pub fn new(posts: Vec<Post>) -> Self {
        Self { posts }
    }

    /// Build a snapshot from raw store records. Records that do not form a
    /// valid post are left out of the snapshot; the rest keep their order.
    pub fn from_records(records: Vec<PostRecord>) -> Self {
        let total = records.len();
        let posts: Vec<Post> = records
            .into_iter()
            .filter_map(|record| match Post::try_from(record) {
                Ok(post) => Some(post),
                Err(e) => {
                    debug!("Dropping malformed post record: {e}");
                    None
                }
            })
            .collect();
        if posts.len() != total {
            debug!("Kept {} of {} records in snapshot", posts.len(), total);
        }
        Self { posts }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// The most recently created post.
    pub fn tail(&self) -> Option<&Post> {
        self.posts.last()
    }

    pub fn get(&self, id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|post| &post.id == id)
    }

    /// Get the number of posts in the snapshot
    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for post in self.posts.iter() {
            writeln!(f, "{}", post)?;
        }
        Ok(())
    }
}

/// What changed at the tail between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedDiff {
    /// The new snapshot is empty.
    NoChange,
    /// A post that was not the tail before is the tail now.
    NewTail { id: PostId },
    /// The tail kept its id and its text got longer; characters from
    /// `from_offset` onward are new.
    TailGrew { id: PostId, from_offset: usize },
    /// The tail kept its id but its text did not get longer.
    NoAnimatableChange,
}

impl FeedDiff {
    /// The post this diff wants animated, if any.
    pub fn target(&self) -> Option<&PostId> {
        match self {
            FeedDiff::NewTail { id } | FeedDiff::TailGrew { id, .. } => Some(id),
            FeedDiff::NoChange | FeedDiff::NoAnimatableChange => None,
        }
    }
}

impl Display for FeedDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedDiff::NoChange => write!(f, "no change"),
            FeedDiff::NewTail { id } => write!(f, "new tail {id}"),
            FeedDiff::TailGrew { id, from_offset } => {
                write!(f, "tail {id} grew from {from_offset}")
            }
            FeedDiff::NoAnimatableChange => write!(f, "no animatable change"),
        }
    }
}

/// Classify the transition from `previous` to `next`.
///
/// Only the last post of each list is looked at. Anything happening to
/// older posts (edits, deletions) does not show up here.
pub fn diff(previous: &[Post], next: &[Post]) -> FeedDiff {
    let Some(next_tail) = next.last() else {
        return FeedDiff::NoChange;
    };
    match previous.last() {
        Some(prev_tail) if prev_tail.id == next_tail.id => {
            let prev_len = prev_tail.char_len();
            if next_tail.char_len() > prev_len {
                FeedDiff::TailGrew {
                    id: next_tail.id.clone(),
                    from_offset: prev_len,
                }
            } else {
                FeedDiff::NoAnimatableChange
            }
        }
        _ => FeedDiff::NewTail {
            id: next_tail.id.clone(),
        },
    }
}
