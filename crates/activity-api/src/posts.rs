//! Demo `Post` resource: an audited entity with soft delete, kept in memory.

use activity_types::{Attributes, Auditable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author_id: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

impl Post {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl Auditable for Post {
    const MODEL: &'static str = "Post";

    fn model_id(&self) -> String {
        self.id.to_string()
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("id".to_string(), self.id.into());
        attrs.insert("title".to_string(), self.title.as_str().into());
        attrs.insert("content".to_string(), self.content.as_str().into());
        attrs.insert("author_id".to_string(), self.author_id.clone().into());
        attrs.insert("status".to_string(), self.status.as_str().into());
        attrs.insert("created_at".to_string(), self.created_at.as_str().into());
        attrs.insert("updated_at".to_string(), self.updated_at.as_str().into());
        attrs.insert("deleted_at".to_string(), self.deleted_at.clone().into());
        attrs
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PostError {
    #[error("post {0} not found")]
    NotFound(u64),
    #[error("post {0} is not deleted")]
    NotDeleted(u64),
}

/// A committed write with the id of the transaction that applied it.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub transaction_id: String,
}

/// Outcome of applying a patch.
#[derive(Debug, Clone)]
pub enum PostUpdate {
    /// The patch matched the stored row; nothing was written.
    Unchanged(Post),
    /// The row before and after the write.
    Changed(Committed<(Post, Post)>),
}

/// In-memory posts table. Deleted posts stay in the table with `deleted_at` set.
#[derive(Default)]
pub struct PostStore {
    rows: RwLock<HashMap<u64, Post>>,
    next_id: AtomicU64,
    next_tx: AtomicU64,
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl PostStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn transaction_id(&self) -> String {
        format!("tx-{}", self.next_tx.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub async fn create(&self, new: NewPost) -> Committed<Post> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = now_iso();
        let post = Post {
            id,
            title: new.title,
            content: new.content,
            author_id: new.author_id,
            status: new.status.unwrap_or_else(|| "draft".to_string()),
            created_at: now.clone(),
            updated_at: now,
            deleted_at: None,
        };
        self.rows.write().await.insert(id, post.clone());
        Committed {
            value: post,
            transaction_id: self.transaction_id(),
        }
    }

    /// Live (not soft-deleted) post.
    pub async fn get(&self, id: u64) -> Option<Post> {
        self.rows
            .read()
            .await
            .get(&id)
            .filter(|p| !p.is_deleted())
            .cloned()
    }

    /// Apply `patch`. A patch that changes no column writes nothing and opens no transaction.
    pub async fn update(&self, id: u64, patch: PostPatch) -> Result<PostUpdate, PostError> {
        let mut guard = self.rows.write().await;
        let row = guard
            .get_mut(&id)
            .filter(|p| !p.is_deleted())
            .ok_or(PostError::NotFound(id))?;
        let before = row.clone();
        if let Some(title) = patch.title {
            row.title = title;
        }
        if let Some(content) = patch.content {
            row.content = content;
        }
        if let Some(status) = patch.status {
            row.status = status;
        }
        if *row == before {
            return Ok(PostUpdate::Unchanged(before));
        }
        row.updated_at = now_iso();
        let after = row.clone();
        drop(guard);
        Ok(PostUpdate::Changed(Committed {
            value: (before, after),
            transaction_id: self.transaction_id(),
        }))
    }

    /// Soft delete; returns the row as it was before deletion.
    pub async fn delete(&self, id: u64) -> Result<Committed<Post>, PostError> {
        let mut guard = self.rows.write().await;
        let row = guard
            .get_mut(&id)
            .filter(|p| !p.is_deleted())
            .ok_or(PostError::NotFound(id))?;
        let before = row.clone();
        row.deleted_at = Some(now_iso());
        drop(guard);
        Ok(Committed {
            value: before,
            transaction_id: self.transaction_id(),
        })
    }

    /// Clear `deleted_at`; returns the row before and after, like an update.
    pub async fn restore(&self, id: u64) -> Result<Committed<(Post, Post)>, PostError> {
        let mut guard = self.rows.write().await;
        let row = guard.get_mut(&id).ok_or(PostError::NotFound(id))?;
        if !row.is_deleted() {
            return Err(PostError::NotDeleted(id));
        }
        let before = row.clone();
        row.deleted_at = None;
        row.updated_at = now_iso();
        let restored = row.clone();
        drop(guard);
        Ok(Committed {
            value: (before, restored),
            transaction_id: self.transaction_id(),
        })
    }
}
