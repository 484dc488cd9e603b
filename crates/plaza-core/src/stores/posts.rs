//! Feed posts: create, like, comment and delete.

use tokio::sync::watch;

use super::StoreOptions;
use crate::gateway::PostsGateway;
use crate::models::{Post, PostId, Session, MAX_POST_CHARS};
use crate::sync::{InsertionPolicy, SyncedCollection};
use crate::{Error, Result};

const LOAD_FAILED: &str = "Couldn't load feed";
const CREATE_FAILED: &str = "Couldn't publish post";
const LIKE_FAILED: &str = "Couldn't update like";
const COMMENT_FAILED: &str = "Couldn't add comment";
const DELETE_FAILED: &str = "Couldn't delete post";

pub struct PostsStore<G> {
    gateway: G,
    session: watch::Receiver<Option<Session>>,
    posts: SyncedCollection<Post>,
}

impl<G: PostsGateway> PostsStore<G> {
    pub fn new(
        gateway: G,
        session: watch::Receiver<Option<Session>>,
        options: &StoreOptions,
    ) -> Self {
        Self {
            gateway,
            session,
            posts: options.collection("posts", InsertionPolicy::Prepend),
        }
    }

    pub const fn collection(&self) -> &SyncedCollection<Post> {
        &self.posts
    }

    pub async fn refresh(&self) -> Result<usize> {
        self.posts.load(self.gateway.list_feed(), LOAD_FAILED).await
    }

    /// Publish a post as the signed-in user.
    ///
    /// The post appears at the top of the feed immediately and is replaced by
    /// the server's copy once accepted.
    pub async fn create_post(&self, content: &str) -> Result<Post> {
        let post = self
            .draft(content)
            .map_err(|e| self.posts.reject(CREATE_FAILED, e))?;

        let pending = self
            .posts
            .begin_insert(post.clone())
            .await
            .map_err(|e| self.posts.reject(CREATE_FAILED, e))?;
        let response = self.gateway.create_post(&post).await;
        let canonical = pending.settle_with(response, CREATE_FAILED, |data| {
            data.cloned()
                .map(Some)
                .ok_or_else(|| "server did not return the created post".to_string())
        })?;
        tracing::info!("Published post {}", post.id);
        Ok(canonical.unwrap_or(post))
    }

    /// Like or unlike a post, returning the new `liked` value.
    pub async fn toggle_like(&self, id: &PostId) -> Result<bool> {
        let mut liked = false;
        let pending = self
            .posts
            .begin_update(id, |post| {
                let next = post.toggled_like();
                liked = next.liked;
                next
            })
            .await
            .map_err(|e| self.posts.reject(LIKE_FAILED, e))?;
        let response = self.gateway.set_like(id, liked).await;
        pending.settle(response, LIKE_FAILED)?;
        Ok(liked)
    }

    /// Add a comment and return the new comment count.
    pub async fn add_comment(&self, id: &PostId, text: &str) -> Result<u32> {
        let text = text.trim();
        if text.is_empty() {
            return Err(self.posts.reject(
                COMMENT_FAILED,
                Error::Validation("Comment must not be empty".to_string()),
            ));
        }
        if text.chars().count() > MAX_POST_CHARS {
            return Err(self.posts.reject(
                COMMENT_FAILED,
                Error::Validation(format!(
                    "Comment must be at most {MAX_POST_CHARS} characters"
                )),
            ));
        }

        let mut comments = 0;
        let pending = self
            .posts
            .begin_update(id, |post| {
                comments = post.comments.saturating_add(1);
                Post {
                    comments,
                    ..post.clone()
                }
            })
            .await
            .map_err(|e| self.posts.reject(COMMENT_FAILED, e))?;
        let response = self.gateway.add_comment(id, text).await;
        pending.settle(response, COMMENT_FAILED)?;
        Ok(comments)
    }

    pub async fn delete_post(&self, id: &PostId) -> Result<()> {
        let pending = self
            .posts
            .begin_remove(id)
            .await
            .map_err(|e| self.posts.reject(DELETE_FAILED, e))?;
        let response = self.gateway.delete_post(id).await;
        pending.settle(response, DELETE_FAILED)?;
        Ok(())
    }

    /// Posts the user has liked
    pub fn liked(&self) -> Vec<Post> {
        self.posts
            .view(|posts| posts.iter().filter(|post| post.liked).cloned().collect())
    }

    /// Posts carrying `#tag` (case-insensitive, with or without the `#`)
    pub fn by_tag(&self, tag: &str) -> Vec<Post> {
        let tag = tag.trim().trim_start_matches('#').to_lowercase();
        self.posts.view(|posts| {
            posts
                .iter()
                .filter(|post| post.tags().contains(&tag))
                .cloned()
                .collect()
        })
    }

    fn draft(&self, content: &str) -> Result<Post> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::Validation("Post must not be empty".to_string()));
        }
        if content.chars().count() > MAX_POST_CHARS {
            return Err(Error::Validation(format!(
                "Post must be at most {MAX_POST_CHARS} characters"
            )));
        }
        let author = self
            .session
            .borrow()
            .as_ref()
            .map(|session| session.user.clone())
            .ok_or_else(|| Error::Validation("Sign in to post".to_string()))?;
        Ok(Post::new(author, content))
    }
}
