//! End-to-end walks through a store, a composer and a session.

use std::sync::Arc;
use wordfarm_core::prelude::*;

struct Client {
    store: Arc<MemoryStore>,
    composer: Composer<MemoryStore>,
    session: FeedSession,
    subscription: Subscription,
}

impl Client {
    async fn join(store: MemoryStore) -> Client {
        let store = Arc::new(store);
        let subscription = store.subscribe().await.unwrap();
        let mut client = Client {
            composer: Composer::new(store.clone()),
            store,
            session: FeedSession::new(&WallConfig::default()).unwrap(),
            subscription,
        };
        client.next().await;
        client
    }

    async fn next(&mut self) -> FeedUpdate {
        self.session.next_update(&mut self.subscription).await.unwrap()
    }

    async fn submit(&mut self, text: &str, newline: bool) -> SubmitOutcome {
        let mut buffer = CompositionBuffer::new(newline);
        buffer.set_text(text);
        let tail = self.session.tail().cloned();
        self.composer.submit(&mut buffer, tail.as_ref()).await.unwrap()
    }
}

#[tokio::test]
async fn continuous_input_extends_the_tail() {
    let (store, _handle) = MemoryStore::spawn();
    let mut client = Client::join(store).await;

    let created = client.submit("hi", false).await;
    let first = client.next().await;
    let id = first.tail().unwrap().id.clone();
    assert_eq!(created, SubmitOutcome::Created(id.clone()));

    let extended = client.submit("!", false).await;
    assert_eq!(extended, SubmitOutcome::Extended(id.clone()));
    let update = client.next().await;

    assert_eq!(update.posts.len(), 1);
    assert_eq!(
        update.diff,
        FeedDiff::TailGrew {
            id,
            from_offset: 2
        }
    );
    let pending: Vec<usize> = update.tail().unwrap().pending().map(Unit::index).collect();
    assert_eq!(pending, vec![2]);
}

#[tokio::test]
async fn newline_input_creates_a_fully_new_post() {
    let (store, _handle) = MemoryStore::spawn();
    let mut client = Client::join(store).await;

    client.submit("hi", false).await;
    client.next().await;

    let outcome = client.submit("bye", true).await;
    let update = client.next().await;
    let tail = update.tail().unwrap();
    assert_eq!(outcome, SubmitOutcome::Created(tail.id.clone()));
    assert_eq!(update.posts.len(), 2);
    assert_ne!(update.posts[0].id, tail.id);
    assert_eq!(update.tail_plan.as_ref().map(RevealPlan::from_offset), Some(0));
    assert_eq!(tail.pending().count(), 3);
    assert_eq!(update.posts[0].pending().count(), 0);
}

#[tokio::test]
async fn other_clients_see_growth_animated() {
    let (store, _handle) = MemoryStore::spawn();
    let mut alice = Client::join(store.connect()).await;
    let mut bob = Client::join(store.connect()).await;

    alice.submit("hello", false).await;
    alice.next().await;
    let seen = bob.next().await;
    assert_eq!(seen.tail().unwrap().pending().count(), 5);

    // Bob continues Alice's sentence.
    bob.submit(" world", false).await;
    let seen = alice.next().await;
    assert_eq!(seen.tail().unwrap().lines[0].text(), "hello world");
    let pending: Vec<usize> = seen.tail().unwrap().pending().map(Unit::index).collect();
    assert_eq!(pending, (5..11).collect::<Vec<_>>());
}

#[tokio::test]
async fn deleting_the_tail_restarts_on_the_older_post() {
    let (store, _handle) = MemoryStore::spawn();
    let mut client = Client::join(store).await;

    client.submit("one", true).await;
    client.next().await;
    let two = client.submit("two", true).await;
    client.next().await;

    let SubmitOutcome::Created(two) = two else {
        panic!("second post was not created");
    };
    client.composer.delete(&two).await.unwrap();
    let update = client.next().await;
    assert_eq!(update.posts.len(), 1);
    assert!(matches!(update.diff, FeedDiff::NewTail { .. }));

    assert_eq!(client.store.purge().await.unwrap(), 1);
    let update = client.next().await;
    assert_eq!(update.diff, FeedDiff::NoChange);
}
