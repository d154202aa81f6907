//! The external collaborator the engine talks to, and an in-process
//! implementation of it.
//!
//! [`MemoryStore`] runs the feed inside a single tokio task. Handles send it
//! [`Command`]s over a channel and wait on a oneshot [`Responder`] for the
//! outcome, so every mutation is applied in one place and in order.

use crate::{
    feed::Snapshot,
    post::{AuthorId, Post, PostId, PostRecord},
    Responder, WallError, WallResult,
};
use async_trait::async_trait;
use rand::{thread_rng, Rng};
use std::collections::HashMap;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 16;

/// Operations the engine needs from whatever backs the feed.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// Create a post at the end of the feed.
    async fn append_post(
        &self,
        text: String,
        image_url: Option<String>,
        author_id: Option<AuthorId>,
    ) -> WallResult<PostId>;

    /// Replace the full text of an existing post.
    async fn extend_post(&self, id: &PostId, full_text: String) -> WallResult<()>;

    /// Remove a post. Only its author may do so.
    async fn delete_post(&self, id: &PostId, requester: &AuthorId) -> WallResult<()>;

    /// Start receiving the ordered feed, current state first.
    async fn subscribe(&self) -> WallResult<Subscription>;

    /// Store a binary blob and return a URL it can be fetched from.
    async fn upload_blob(&self, bytes: Vec<u8>, suggested_name: &str) -> WallResult<String>;

    /// Identity of the caller, once the store knows it.
    async fn current_identity(&self) -> Option<AuthorId>;
}

/// Live, ordered feed of snapshots.
#[derive(Debug)]
pub struct Subscription {
    rx: Option<mpsc::UnboundedReceiver<Vec<PostRecord>>>,
}

impl Subscription {
    pub fn new(rx: mpsc::UnboundedReceiver<Vec<PostRecord>>) -> Self {
        Self { rx: Some(rx) }
    }

    /// Wait for the next snapshot. `None` once unsubscribed or when the
    /// store goes away.
    pub async fn next(&mut self) -> Option<Snapshot> {
        let rx = self.rx.as_mut()?;
        rx.recv().await.map(Snapshot::from_records)
    }

    /// Stop delivery. Calling it again does nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
        }
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Requests handled by the store task.
#[derive(Debug)]
pub enum Command {
    Append {
        text: String,
        image_url: Option<String>,
        author_id: Option<AuthorId>,
        resp: Responder<WallResult<PostId>>,
    },
    Extend {
        id: PostId,
        text: String,
        resp: Responder<WallResult<()>>,
    },
    Delete {
        id: PostId,
        requester: AuthorId,
        resp: Responder<WallResult<()>>,
    },
    Subscribe {
        resp: Responder<Subscription>,
    },
    Upload {
        bytes: Vec<u8>,
        name: String,
        resp: Responder<WallResult<String>>,
    },
    Purge {
        resp: Responder<usize>,
    },
}

/// Handle to a feed kept in memory by a background task.
///
/// Cloning shares the caller identity; [`MemoryStore::connect`] gives a new
/// anonymous caller on the same feed.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tx: mpsc::Sender<Command>,
    identity: Option<AuthorId>,
}

impl MemoryStore {
    /// Start the store task. Must be called within a tokio runtime.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = tokio::spawn(run_feed(rx));
        let store = Self {
            tx,
            identity: Some(generate_author_id()),
        };
        (store, handle)
    }

    /// Another caller on the same feed, with its own fresh identity.
    pub fn connect(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            identity: Some(generate_author_id()),
        }
    }

    /// A caller whose identity has not been resolved.
    pub fn anonymous(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            identity: None,
        }
    }

    /// Delete every post on the feed, returning how many were removed.
    pub async fn purge(&self) -> WallResult<usize> {
        let (resp, rx) = oneshot::channel();
        self.send(Command::Purge { resp }).await?;
        Ok(rx.await.map_err(|_| store_gone())?)
    }

    async fn send(&self, cmd: Command) -> WallResult<()> {
        self.tx.send(cmd).await.map_err(|_| store_gone())?;
        Ok(())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Responder<WallResult<T>>) -> Command,
    ) -> WallResult<T> {
        let (resp, rx) = oneshot::channel();
        self.send(build(resp)).await?;
        rx.await.map_err(|_| store_gone())?
    }
}

#[async_trait]
impl FeedStore for MemoryStore {
    async fn append_post(
        &self,
        text: String,
        image_url: Option<String>,
        author_id: Option<AuthorId>,
    ) -> WallResult<PostId> {
        self.request(|resp| Command::Append {
            text,
            image_url,
            author_id,
            resp,
        })
        .await
    }

    async fn extend_post(&self, id: &PostId, full_text: String) -> WallResult<()> {
        let id = id.clone();
        self.request(|resp| Command::Extend {
            id,
            text: full_text,
            resp,
        })
        .await
    }

    async fn delete_post(&self, id: &PostId, requester: &AuthorId) -> WallResult<()> {
        let id = id.clone();
        let requester = requester.clone();
        self.request(|resp| Command::Delete {
            id,
            requester,
            resp,
        })
        .await
    }

    async fn subscribe(&self) -> WallResult<Subscription> {
        let (resp, rx) = oneshot::channel();
        self.send(Command::Subscribe { resp }).await?;
        rx.await
            .map_err(|_| WallError::subscription_failure("store task stopped").into())
    }

    async fn upload_blob(&self, bytes: Vec<u8>, suggested_name: &str) -> WallResult<String> {
        let name = suggested_name.to_owned();
        self.request(|resp| Command::Upload { bytes, name, resp })
            .await
    }

    async fn current_identity(&self) -> Option<AuthorId> {
        self.identity.clone()
    }
}

fn store_gone() -> anyhow::Error {
    WallError::write_failure("store task stopped").into()
}

/// State owned by the store task.
#[derive(Debug, Default)]
struct Feed {
    posts: Vec<Post>,
    blobs: HashMap<String, Vec<u8>>,
    /// Blobs ever uploaded; keeps URLs unique across purges.
    uploads: usize,
    subscribers: Vec<mpsc::UnboundedSender<Vec<PostRecord>>>,
}

impl Feed {
    fn records(&self) -> Vec<PostRecord> {
        self.posts.iter().map(PostRecord::from).collect()
    }

    /// Push the current feed to every subscriber, forgetting the ones that
    /// went away.
    fn publish(&mut self) {
        let records = self.records();
        self.subscribers
            .retain(|subscriber| subscriber.send(records.clone()).is_ok());
    }

    fn position(&self, id: &PostId) -> WallResult<usize> {
        self.posts
            .iter()
            .position(|post| &post.id == id)
            .ok_or_else(|| WallError::InvalidId.into())
    }

    fn append(
        &mut self,
        text: String,
        image_url: Option<String>,
        author_id: Option<AuthorId>,
    ) -> WallResult<PostId> {
        let mut id = generate_post_id();
        while self.position(&id).is_ok() {
            id = generate_post_id();
        }
        let post = Post::new(id.clone(), text, image_url, author_id)?;
        self.posts.push(post);
        info!("Appended post {id}");
        self.publish();
        Ok(id)
    }

    fn extend(&mut self, id: &PostId, text: String) -> WallResult<()> {
        let idx = self.position(id)?;
        let post = &mut self.posts[idx];
        if text.is_empty() && post.image_url.is_none() {
            return Err(WallError::EmptyPost.into());
        }
        post.text = text;
        debug!("Extended post {id} to {} chars", post.char_len());
        self.publish();
        Ok(())
    }

    fn delete(&mut self, id: &PostId, requester: &AuthorId) -> WallResult<()> {
        let idx = self.position(id)?;
        if self.posts[idx].author_id.as_ref() != Some(requester) {
            return Err(WallError::NotAuthor.into());
        }
        self.posts.remove(idx);
        info!("Deleted post {id}");
        self.publish();
        Ok(())
    }

    fn upload(&mut self, bytes: Vec<u8>, name: &str) -> WallResult<String> {
        if bytes.is_empty() {
            return Err(WallError::upload_failure("blob is empty").into());
        }
        self.uploads += 1;
        let url = format!("mem://blobs/{}_{}", self.uploads, name);
        self.blobs.insert(url.clone(), bytes);
        Ok(url)
    }

    fn purge(&mut self) -> usize {
        let removed = self.posts.len();
        self.posts.clear();
        self.blobs.clear();
        self.publish();
        removed
    }
}

async fn run_feed(mut rx: mpsc::Receiver<Command>) {
    debug!("Feed task running...");
    let mut feed = Feed::default();

    // Sending on a oneshot only fails when the caller stopped waiting,
    // which is not the store's problem.
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Append {
                text,
                image_url,
                author_id,
                resp,
            } => {
                let _ = resp.send(feed.append(text, image_url, author_id));
            }
            Command::Extend { id, text, resp } => {
                let _ = resp.send(feed.extend(&id, text));
            }
            Command::Delete {
                id,
                requester,
                resp,
            } => {
                let _ = resp.send(feed.delete(&id, &requester));
            }
            Command::Subscribe { resp } => {
                let (tx, sub_rx) = mpsc::unbounded_channel();
                if tx.send(feed.records()).is_ok() {
                    feed.subscribers.push(tx);
                }
                let _ = resp.send(Subscription::new(sub_rx));
            }
            Command::Upload { bytes, name, resp } => {
                let _ = resp.send(feed.upload(bytes, &name));
            }
            Command::Purge { resp } => {
                let _ = resp.send(feed.purge());
            }
        }
    }
    warn!("Feed task stopped; all handles dropped");
}

/// Random id made of four zero padded 16-bit fields, such as
/// `p-00231-61023-00007-40000`.
fn random_fields(prefix: &str) -> String {
    let mut buffer = [0u16; 4];
    thread_rng().fill(&mut buffer);
    let fields = buffer
        .into_iter()
        .map(|val| format!("{:05}", val))
        .collect::<Vec<String>>()
        .join("-");
    format!("{prefix}-{fields}")
}

fn generate_post_id() -> PostId {
    PostId::new(random_fields("p"))
}

fn generate_author_id() -> AuthorId {
    AuthorId::new(random_fields("anon"))
}
