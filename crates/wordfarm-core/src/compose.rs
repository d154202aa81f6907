//! Local input: decide between creating a post and extending the tail, then
//! carry the write out against the store.
//!
//! Extending concatenates the fragment directly onto the tail text, with no
//! separator. Starting a new post is what the newline toggle is for.

use crate::{
    post::{AuthorId, Post, PostId},
    store::FeedStore,
    WallError, WallResult,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::SystemTime,
};
use tracing::{error, info};

/// An image picked for the next post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub name: String,
}

/// What the caller is drafting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionBuffer {
    text: String,
    image: Option<ImageAttachment>,
    newline_enabled: bool,
}

impl CompositionBuffer {
    pub fn new(newline_enabled: bool) -> Self {
        Self {
            newline_enabled,
            ..Default::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn image(&self) -> Option<&ImageAttachment> {
        self.image.as_ref()
    }

    /// Attach an image. An empty file is treated as no image.
    pub fn attach_image(&mut self, bytes: Vec<u8>, name: impl Into<String>) {
        self.image = if bytes.is_empty() {
            None
        } else {
            Some(ImageAttachment {
                bytes,
                name: name.into(),
            })
        };
    }

    pub fn detach_image(&mut self) {
        self.image = None;
    }

    pub fn newline_enabled(&self) -> bool {
        self.newline_enabled
    }

    pub fn set_newline_enabled(&mut self, enabled: bool) {
        self.newline_enabled = enabled;
    }

    /// Flip the newline toggle and return its new value.
    pub fn toggle_newline(&mut self) -> bool {
        self.newline_enabled = !self.newline_enabled;
        self.newline_enabled
    }

    /// Whitespace only text counts as no text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_text() && self.image.is_none()
    }

    /// Forget the draft after a successful write. The newline toggle stays.
    pub fn clear(&mut self) {
        self.text.clear();
        self.image = None;
    }
}

/// The write to send to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteRequest {
    Create {
        text: String,
        image_url: Option<String>,
        author_id: Option<AuthorId>,
    },
    /// Replace the text of post `id` with `text`.
    Extend { id: PostId, text: String },
}

impl WriteRequest {
    /// Point a create request at an uploaded image.
    pub fn with_image_url(self, url: String) -> Self {
        match self {
            WriteRequest::Create {
                text, author_id, ..
            } => WriteRequest::Create {
                text,
                image_url: Some(url),
                author_id,
            },
            extend => extend,
        }
    }
}

/// Decide what writing `buffer` means given the current feed tail.
///
/// - an empty buffer writes nothing;
/// - newline mode, an empty feed, an attached image or a tail without text
///   create a new post with the trimmed text;
/// - otherwise the fragment is appended verbatim to the tail text.
pub fn decide_write(
    buffer: &CompositionBuffer,
    tail: Option<&Post>,
    author: Option<&AuthorId>,
) -> Option<WriteRequest> {
    if buffer.is_empty() {
        return None;
    }
    let create = WriteRequest::Create {
        text: buffer.text.trim().to_owned(),
        image_url: None,
        author_id: author.cloned(),
    };
    if buffer.newline_enabled || buffer.image.is_some() {
        return Some(create);
    }
    match tail {
        Some(tail) if tail.has_text() => Some(WriteRequest::Extend {
            id: tail.id.clone(),
            text: format!("{}{}", tail.text, buffer.text),
        }),
        _ => Some(create),
    }
}

/// Result of a submission that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing to write.
    Skipped,
    Created(PostId),
    Extended(PostId),
}

/// Held while a submission is in flight.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> WallResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WallError::WriteInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends drafts to the store, one submission at a time.
pub struct Composer<S: FeedStore + ?Sized> {
    store: Arc<S>,
    in_flight: AtomicBool,
}

impl<S: FeedStore + ?Sized> Composer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a submission is currently unresolved.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit `buffer` against `tail`, the tail of the latest snapshot.
    ///
    /// On success the buffer is cleared. On any failure it is left as it
    /// was, and no post is created or extended when the image upload fails.
    pub async fn submit(
        &self,
        buffer: &mut CompositionBuffer,
        tail: Option<&Post>,
    ) -> WallResult<SubmitOutcome> {
        let _guard = InFlight::acquire(&self.in_flight)?;

        let author = self
            .store
            .current_identity()
            .await
            .ok_or(WallError::SubmissionsDisabled)?;

        let Some(mut request) = decide_write(buffer, tail, Some(&author)) else {
            return Ok(SubmitOutcome::Skipped);
        };

        if let Some(image) = buffer.image() {
            let name = format!("{}_{}", timestamp_millis(), image.name);
            let url = self
                .store
                .upload_blob(image.bytes.clone(), &name)
                .await
                .map_err(|e| {
                    error!("Image upload failed: {e}");
                    as_upload_failure(e)
                })?;
            request = request.with_image_url(url);
        }

        let outcome = match request {
            WriteRequest::Create {
                text,
                image_url,
                author_id,
            } => {
                let id = self
                    .store
                    .append_post(text, image_url, author_id)
                    .await
                    .map_err(|e| {
                        error!("Creating post failed: {e}");
                        as_write_failure(e)
                    })?;
                info!("Created post {id}");
                SubmitOutcome::Created(id)
            }
            WriteRequest::Extend { id, text } => {
                self.store.extend_post(&id, text).await.map_err(|e| {
                    error!("Extending post {id} failed: {e}");
                    as_write_failure(e)
                })?;
                info!("Extended post {id}");
                SubmitOutcome::Extended(id)
            }
        };

        buffer.clear();
        Ok(outcome)
    }

    /// Delete one of the caller's own posts.
    pub async fn delete(&self, id: &PostId) -> WallResult<()> {
        let author = self
            .store
            .current_identity()
            .await
            .ok_or(WallError::SubmissionsDisabled)?;
        self.store
            .delete_post(id, &author)
            .await
            .map_err(as_write_failure)
    }
}

fn as_upload_failure(e: anyhow::Error) -> anyhow::Error {
    match e.downcast_ref::<WallError>() {
        Some(WallError::UploadFailure { .. }) => e,
        _ => WallError::upload_failure(e.to_string()).into(),
    }
}

/// Keeps the precise error when the store already said why it refused.
fn as_write_failure(e: anyhow::Error) -> anyhow::Error {
    match e.downcast_ref::<WallError>() {
        Some(
            WallError::WriteFailure { .. }
            | WallError::NotAuthor
            | WallError::InvalidId
            | WallError::EmptyPost,
        ) => e,
        _ => WallError::write_failure(e.to_string()).into(),
    }
}

fn timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}
