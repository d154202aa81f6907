//! This module defines the `Post`, the single unit of content on the wall.

use crate::{WallError, WallResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque identifier assigned by the store when a post is created.
/// Never reused and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque, session-stable identity of an anonymous caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(String);

impl AuthorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AuthorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A post as mirrored from the store.
///
/// Only `text` is ever mutated after creation, and it is expected to grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<AuthorId>,
}

impl Post {
    /// Create a post, checking that it carries text or an image.
    pub fn new(
        id: PostId,
        text: String,
        image_url: Option<String>,
        author_id: Option<AuthorId>,
    ) -> WallResult<Self> {
        verify_content(&text, image_url.as_deref())?;
        Ok(Post {
            id,
            text,
            image_url,
            author_id,
        })
    }

    /// Length of the text in characters. Every offset handed around by the
    /// differ and the reveal scheduler is measured in these units.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// The loosely typed shape of a post as handed over by a store. Any field
/// may be missing; [`Post::try_from`] decides whether it is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
}

impl From<&Post> for PostRecord {
    fn from(post: &Post) -> Self {
        PostRecord {
            id: Some(post.id.as_str().to_owned()),
            text: Some(post.text.clone()),
            image_url: post.image_url.clone(),
            author_id: post.author_id.as_ref().map(|val| val.as_str().to_owned()),
        }
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = anyhow::Error;

    fn try_from(record: PostRecord) -> WallResult<Self> {
        let id = record.id.ok_or(WallError::MissingField { field: "id" })?;
        let text = record.text.ok_or(WallError::MissingField { field: "text" })?;
        // An empty image reference counts as no image at all.
        let image_url = record.image_url.filter(|url| !url.is_empty());
        Post::new(
            PostId::new(id),
            text,
            image_url,
            record.author_id.map(AuthorId::new),
        )
    }
}

/// Some necessary checks for a post's content.
fn verify_content(text: &str, image_url: Option<&str>) -> WallResult<()> {
    if text.is_empty() && image_url.is_none() {
        return Err(WallError::EmptyPost.into());
    }
    Ok(())
}

impl Display for Post {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.id, self.text)?;
        if let Some(url) = &self.image_url {
            write!(f, " <{url}>")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: Option<&str>, text: Option<&str>, image: Option<&str>) -> PostRecord {
        PostRecord {
            id: id.map(String::from),
            text: text.map(String::from),
            image_url: image.map(String::from),
            author_id: None,
        }
    }

    #[test]
    fn char_len_counts_scalar_values_not_bytes() {
        let post = Post::new("a".into(), "héllo 😃".into(), None, None).unwrap();
        assert_eq!(post.char_len(), 7);
        assert!(post.text.len() > 7);
    }

    #[test]
    fn record_without_text_is_rejected() {
        let err = Post::try_from(record(Some("a"), None, Some("mem://x"))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WallError>(),
            Some(WallError::MissingField { field: "text" })
        ));
    }

    #[test]
    fn record_without_id_is_rejected() {
        let err = Post::try_from(record(None, Some("hi"), None)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WallError>(),
            Some(WallError::MissingField { field: "id" })
        ));
    }

    #[test]
    fn empty_text_needs_an_image() {
        assert!(Post::try_from(record(Some("a"), Some(""), None)).is_err());
        assert!(Post::try_from(record(Some("a"), Some(""), Some(""))).is_err());

        let post = Post::try_from(record(Some("a"), Some(""), Some("mem://img"))).unwrap();
        assert!(!post.has_text());
        assert_eq!(post.image_url.as_deref(), Some("mem://img"));
    }

    #[test]
    fn records_use_camel_case_on_the_wire() {
        let json = r#"{"id":"p1","text":"hi","imageUrl":"mem://i","authorId":"u1"}"#;
        let record: PostRecord = serde_json::from_str(json).unwrap();
        let post = Post::try_from(record).unwrap();
        assert_eq!(post.author_id, Some(AuthorId::new("u1")));
        assert_eq!(post.image_url.as_deref(), Some("mem://i"));
    }
}
