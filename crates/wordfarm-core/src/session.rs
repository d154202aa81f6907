//! One client's view of the feed: the last snapshot it saw, what is being
//! revealed, and where its viewport is anchored.

use crate::{
    config::WallConfig,
    feed::{diff, FeedDiff, Snapshot},
    post::Post,
    render::{lay_out, RenderedPost},
    reveal::{schedule_reveal_with, RevealPlan, RevealState},
    scroll::{ScrollAnchor, ScrollCapture, Viewport},
    segment::LinkDetector,
    store::Subscription,
    WallError, WallResult,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Output of handling one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUpdate {
    pub diff: FeedDiff,
    /// Every post of the snapshot, oldest first, laid out for rendering.
    pub posts: Vec<RenderedPost>,
    /// Reveal plan of the tail, when the snapshot has one.
    pub tail_plan: Option<RevealPlan>,
}

impl FeedUpdate {
    pub fn tail(&self) -> Option<&RenderedPost> {
        self.posts.last()
    }
}

#[derive(Debug)]
pub struct FeedSession {
    previous: Snapshot,
    reveal: RevealState,
    scroll: ScrollAnchor,
    detector: LinkDetector,
    unit_delay: Duration,
}

impl FeedSession {
    pub fn new(config: &WallConfig) -> WallResult<Self> {
        Ok(Self {
            previous: Snapshot::default(),
            reveal: RevealState::new(),
            scroll: ScrollAnchor::new(config.scroll.tolerance),
            detector: LinkDetector::new()?,
            unit_delay: config.reveal.unit_delay(),
        })
    }

    /// Handle the next snapshot: diff it against the previous one, advance
    /// the reveal state and lay every post out under its plan.
    pub fn apply_snapshot(&mut self, next: Snapshot) -> FeedUpdate {
        let diff = diff(self.previous.posts(), next.posts());
        debug!("Snapshot of {} posts: {diff}", next.len());
        self.reveal.observe(&diff);

        let mut tail_plan = None;
        let last = next.len().saturating_sub(1);
        let posts = next
            .posts()
            .iter()
            .enumerate()
            .map(|(idx, post)| {
                let plan = if idx == last {
                    let plan = schedule_reveal_with(post, &diff, self.unit_delay);
                    tail_plan = Some(plan.clone());
                    plan
                } else {
                    RevealPlan::settled(post)
                };
                lay_out(post, &plan, &self.detector)
            })
            .collect();

        self.previous = next;
        FeedUpdate {
            diff,
            posts,
            tail_plan,
        }
    }

    /// Wait for the next snapshot on `subscription` and handle it.
    pub async fn next_update(&mut self, subscription: &mut Subscription) -> WallResult<FeedUpdate> {
        match subscription.next().await {
            Some(snapshot) => Ok(self.apply_snapshot(snapshot)),
            None => {
                warn!("Feed subscription ended; the wall stops updating");
                Err(WallError::subscription_failure("subscription closed").into())
            }
        }
    }

    /// The last snapshot handled.
    pub fn snapshot(&self) -> &Snapshot {
        &self.previous
    }

    /// Tail of the last snapshot; what a submission would extend.
    pub fn tail(&self) -> Option<&Post> {
        self.previous.tail()
    }

    /// Which post the feed last animated, and from where. Plans are built
    /// from each diff directly; this is kept for inspection.
    pub fn reveal_state(&self) -> &RevealState {
        &self.reveal
    }

    /// Call before rendering an update.
    pub fn capture_scroll(&self, viewport: &Viewport) -> ScrollCapture {
        self.scroll.capture(viewport)
    }

    /// Call after rendering an update.
    pub fn should_auto_scroll(&mut self, capture: ScrollCapture, rendered: &Viewport) -> bool {
        self.scroll.should_auto_scroll(capture, rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::PostId;
    use crate::reveal::UNIT_DELAY;

    fn post(id: &str, text: &str) -> Post {
        Post::new(id.into(), text.into(), None, None).unwrap()
    }

    fn session() -> FeedSession {
        FeedSession::new(&WallConfig::default()).unwrap()
    }

    #[test]
    fn new_post_after_existing_one_is_fully_new() {
        let mut session = session();
        session.apply_snapshot(Snapshot::new(vec![post("a", "hi")]));
        let update = session.apply_snapshot(Snapshot::new(vec![post("a", "hi"), post("b", "bye")]));

        assert_eq!(update.diff, FeedDiff::NewTail { id: "b".into() });
        let plan = update.tail_plan.unwrap();
        assert_eq!(plan.from_offset(), 0);
        assert_eq!(plan.new_count(), 3);
        // only the tail animates
        assert_eq!(update.posts[0].pending().count(), 0);
    }

    #[test]
    fn growth_then_repeat_snapshot_does_not_reanimate() {
        let mut session = session();
        session.apply_snapshot(Snapshot::new(vec![post("a", "hi")]));
        let grown = session.apply_snapshot(Snapshot::new(vec![post("a", "hi!")]));
        let delays: Vec<Duration> = grown
            .tail()
            .unwrap()
            .pending()
            .map(|unit| unit.reveal().delay())
            .collect();
        assert_eq!(delays, vec![Duration::ZERO]);
        assert_eq!(session.reveal_state().last_animated_start_index(), 2);

        let again = session.apply_snapshot(Snapshot::new(vec![post("a", "hi!")]));
        assert_eq!(again.diff, FeedDiff::NoAnimatableChange);
        assert_eq!(again.tail().unwrap().pending().count(), 0);
        assert_eq!(
            session.reveal_state().last_animated_post_id(),
            Some(&PostId::new("a"))
        );
    }

    #[test]
    fn shrinking_tail_is_not_animated() {
        let mut session = session();
        session.apply_snapshot(Snapshot::new(vec![post("a", "ab")]));
        let update = session.apply_snapshot(Snapshot::new(vec![post("a", "a")]));
        assert_eq!(update.diff, FeedDiff::NoAnimatableChange);
        assert!(update.tail_plan.unwrap().is_settled());
    }

    #[test]
    fn empty_snapshot_clears_the_view() {
        let mut session = session();
        session.apply_snapshot(Snapshot::new(vec![post("a", "hi")]));
        let update = session.apply_snapshot(Snapshot::default());
        assert_eq!(update.diff, FeedDiff::NoChange);
        assert!(update.posts.is_empty());
        assert!(update.tail_plan.is_none());
        assert!(session.tail().is_none());
    }

    #[test]
    fn configured_delay_is_used() {
        let mut config = WallConfig::default();
        config.reveal.unit_delay_ms = 10;
        let mut session = FeedSession::new(&config).unwrap();
        let update = session.apply_snapshot(Snapshot::new(vec![post("a", "abc")]));
        let plan = update.tail_plan.unwrap();
        assert_eq!(plan.reveal(2).delay(), Duration::from_millis(20));
        assert_ne!(plan.reveal(2).delay(), UNIT_DELAY * 2);
    }

    #[tokio::test]
    async fn closed_subscription_is_a_subscription_failure() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(tx);
        let mut subscription = Subscription::new(rx);
        let err = session().next_update(&mut subscription).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WallError>(),
            Some(WallError::SubscriptionFailure { .. })
        ));
    }
}
