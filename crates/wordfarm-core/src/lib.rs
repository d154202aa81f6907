//! Welcome to the documentation of wordfarm, a shared message wall. Posts
//! are appended to one ordered feed and every client watches new words
//! type themselves out.
//!
//! The pieces, in the order a snapshot flows through them:
//!
//! - [`feed::diff`] classifies what changed at the tail of the feed;
//! - [`reveal::schedule_reveal`] turns that into per-character delays;
//! - [`render::lay_out`] splits the text into lines, characters and links;
//! - [`scroll::ScrollAnchor`] decides whether the view follows the new content.
//!
//! Local input goes the other way, through [`compose::decide_write`] and
//! [`compose::Composer`] to a [`store::FeedStore`].
mod error;
pub mod compose;
pub mod config;
pub mod feed;
pub mod post;
pub mod render;
pub mod reveal;
pub mod scroll;
pub mod segment;
pub mod session;
pub mod store;

pub use error::{WallError, WallResult};

pub mod constant {
    pub const CONFIG_DIR: &str = ".wordfarm";
    pub const CONFIG_FILE: &str = "wordfarm.toml";
    pub const CONFIG_ENV: &str = "WORDFARMCONF";
}

/// Used to send acknowledgements back from the store task.
pub type Responder<T> = tokio::sync::oneshot::Sender<T>;

pub mod prelude {
    pub use crate::compose::{decide_write, CompositionBuffer, Composer, SubmitOutcome, WriteRequest};
    pub use crate::config::WallConfig;
    pub use crate::feed::{diff, FeedDiff, Snapshot};
    pub use crate::post::{AuthorId, Post, PostId, PostRecord};
    pub use crate::render::{lay_out, RenderedPost, Unit};
    pub use crate::reveal::{schedule_reveal, Reveal, RevealPlan, RevealState, UNIT_DELAY};
    pub use crate::scroll::{ScrollAnchor, Viewport};
    pub use crate::segment::{LinkDetector, Segment};
    pub use crate::session::{FeedSession, FeedUpdate};
    pub use crate::store::{FeedStore, MemoryStore, Subscription};
    pub use crate::{WallError, WallResult};
}
