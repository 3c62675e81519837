// ABOUTME: Request and response types for the JSON API
// ABOUTME: Wire format uses camelCase field names; optional inputs are validated by handlers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{blog_post, comment, user};

// Query parameters
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl Pagination {
    pub const MAX_LIMIT: u64 = 100;

    /// Offset and limit to apply, or `None` when the caller asked for everything.
    pub fn window(&self) -> Option<(u64, u64)> {
        if self.page.is_none() && self.limit.is_none() {
            return None;
        }
        let limit = self.limit.unwrap_or(20).clamp(1, Self::MAX_LIMIT);
        let page = self.page.unwrap_or(1).max(1);
        // SQLite binds OFFSET as a signed 64-bit integer
        let offset = (page - 1).saturating_mul(limit).min(i64::MAX as u64);
        Some((offset, limit))
    }
}

// User types
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<user::Model> for UserSummary {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

impl From<user::Model> for UserProfile {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
            bio: user.bio,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub message: String,
    pub user: UserSummary,
}

// Auth types
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

// Post types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub caption: Option<String>,
    pub image: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub caption: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub caption: Option<String>,
    pub image: Option<String>,
    pub author_id: Uuid,
    pub author: Option<UserSummary>,
    pub like_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentView>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostView {
    pub fn new(post: blog_post::Model, author: Option<user::Model>, like_count: u64) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            excerpt: post.excerpt,
            caption: post.caption,
            image: post.image,
            author_id: post.author_id,
            author: author.map(UserSummary::from),
            like_count,
            comments: None,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }

    pub fn with_comments(mut self, comments: Vec<CommentView>) -> Self {
        self.comments = Some(comments);
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: u64,
}

// Comment types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub author_id: Option<String>,
    pub post_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub author_id: Uuid,
    pub post_id: Uuid,
    pub author: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentView {
    pub fn new(comment: comment::Model, author: Option<user::Model>) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            author_id: comment.author_id,
            post_id: comment.post_id,
            author: author.map(UserSummary::from),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_to_everything() {
        assert_eq!(Pagination::default().window(), None);
    }

    #[test]
    fn pagination_window() {
        let p = Pagination { page: Some(3), limit: Some(10) };
        assert_eq!(p.window(), Some((20, 10)));

        let p = Pagination { page: Some(0), limit: Some(1000) };
        assert_eq!(p.window(), Some((0, Pagination::MAX_LIMIT)));

        let p = Pagination { page: Some(2), limit: None };
        assert_eq!(p.window(), Some((20, 20)));
    }

    #[test]
    fn huge_page_clamps_offset() {
        let p = Pagination { page: Some(u64::MAX), limit: Some(100) };
        assert_eq!(p.window(), Some((i64::MAX as u64, 100)));
    }

    #[test]
    fn create_post_request_reads_camel_case() {
        let req: CreatePostRequest = serde_json::from_str(
            r#"{"title":"t","content":"c","authorId":"abc"}"#,
        )
        .unwrap();
        assert_eq!(req.author_id.as_deref(), Some("abc"));
        assert!(req.excerpt.is_none());
    }
}
