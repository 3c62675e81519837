// ABOUTME: SeaORM storage layer for users, blog posts, comments, and likes
// ABOUTME: Runs migrations on connect and assembles the joined views the API returns

use anyhow::Context;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, SqlErr, sea_query::Expr,
};
use sea_orm_migration::MigratorTrait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{blog_post, comment, like, user};
use crate::error::{AppError, Result};
use crate::migration::Migrator;
use crate::types::{CommentView, Pagination, PostView};

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
}

#[derive(Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

pub struct NewPost {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub caption: Option<String>,
    pub image: Option<String>,
    pub author_id: Uuid,
}

#[derive(Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub caption: Option<String>,
    pub image: Option<String>,
}

pub struct NewComment {
    pub content: String,
    pub author_id: Uuid,
    pub post_id: Uuid,
}

pub struct Storage {
    pub db: DatabaseConnection,
}

impl Storage {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let db = Database::connect(database_url)
            .await
            .with_context(|| format!("failed to connect to {}", database_url))?;

        Migrator::up(&db, None)
            .await
            .context("failed to run database migrations")?;

        tracing::info!("Database ready at {}", database_url);
        Ok(Self { db })
    }

    // Users

    pub async fn list_users(&self, pagination: Pagination) -> Result<Vec<user::Model>> {
        let mut query = user::Entity::find().order_by_asc(user::Column::CreatedAt);
        if let Some((offset, limit)) = pagination.window() {
            query = query.offset(offset).limit(limit);
        }
        Ok(query.all(&self.db).await?)
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<user::Model> {
        self.find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?)
    }

    /// True when another account already uses `email`. `excluding` lets an
    /// update keep its own address.
    pub async fn email_in_use(&self, email: &str, excluding: Option<Uuid>) -> Result<bool> {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(user_id) = excluding {
            query = query.filter(user::Column::Id.ne(user_id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<user::Model> {
        let now = Utc::now();
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new_user.name),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            avatar: Set(None),
            bio: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let user = user.insert(&self.db).await.map_err(email_conflict)?;
        tracing::info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    pub async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> Result<user::Model> {
        let existing = self.get_user(user_id).await?;
        let mut user: user::ActiveModel = existing.into();

        if let Some(name) = changes.name {
            user.name = Set(name);
        }
        if let Some(email) = changes.email {
            user.email = Set(email);
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = Set(Some(avatar));
        }
        if let Some(bio) = changes.bio {
            user.bio = Set(Some(bio));
        }
        user.updated_at = Set(Utc::now());

        Ok(user.update(&self.db).await.map_err(email_conflict)?)
    }

    /// Removes the user; posts, comments and likes go with it via cascading keys.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<user::Model> {
        let user = self.get_user(user_id).await?;
        user.clone().delete(&self.db).await?;
        tracing::info!(user_id = %user.id, "Deleted user");
        Ok(user)
    }

    // Posts

    pub async fn list_posts(&self, pagination: Pagination) -> Result<Vec<PostView>> {
        self.load_posts(blog_post::Entity::find(), pagination, true)
            .await
    }

    pub async fn list_posts_by_author(&self, author_id: Uuid) -> Result<Vec<PostView>> {
        let query = blog_post::Entity::find().filter(blog_post::Column::AuthorId.eq(author_id));
        self.load_posts(query, Pagination::default(), false).await
    }

    pub async fn post_exists(&self, post_id: Uuid) -> Result<bool> {
        Ok(blog_post::Entity::find_by_id(post_id)
            .count(&self.db)
            .await?
            > 0)
    }

    pub async fn find_post(&self, post_id: Uuid) -> Result<Option<PostView>> {
        let query = blog_post::Entity::find().filter(blog_post::Column::Id.eq(post_id));
        let mut posts = self.load_posts(query, Pagination::default(), true).await?;
        Ok(posts.pop())
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> {
        self.find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    pub async fn create_post(&self, new_post: NewPost) -> Result<PostView> {
        let author = self
            .find_user(new_post.author_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Author not found".to_string()))?;

        let now = Utc::now();
        let post = blog_post::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(new_post.title),
            content: Set(new_post.content),
            excerpt: Set(new_post.excerpt),
            caption: Set(new_post.caption),
            image: Set(new_post.image),
            author_id: Set(author.id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(post_id = %post.id, author_id = %author.id, "Created post");
        Ok(PostView::new(post, Some(author), 0))
    }

    pub async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<PostView> {
        let existing = self.get_post_record(post_id).await?;
        let mut post: blog_post::ActiveModel = existing.into();

        if let Some(title) = changes.title {
            post.title = Set(title);
        }
        if let Some(content) = changes.content {
            post.content = Set(content);
        }
        if let Some(excerpt) = changes.excerpt {
            post.excerpt = Set(excerpt);
        }
        if let Some(caption) = changes.caption {
            post.caption = Set(Some(caption));
        }
        if let Some(image) = changes.image {
            post.image = Set(Some(image));
        }
        post.updated_at = Set(Utc::now());

        let post = post.update(&self.db).await?;
        let author = self.find_user(post.author_id).await?;
        let likes = self.like_count(post.id).await?;
        Ok(PostView::new(post, author, likes))
    }

    pub async fn delete_post(&self, post_id: Uuid) -> Result<blog_post::Model> {
        let post = self.get_post_record(post_id).await?;
        post.clone().delete(&self.db).await?;
        tracing::info!(post_id = %post.id, "Deleted post");
        Ok(post)
    }

    async fn get_post_record(&self, post_id: Uuid) -> Result<blog_post::Model> {
        blog_post::Entity::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    async fn load_posts(
        &self,
        query: Select<blog_post::Entity>,
        pagination: Pagination,
        with_comments: bool,
    ) -> Result<Vec<PostView>> {
        let mut query = query
            .find_also_related(user::Entity)
            .order_by_desc(blog_post::Column::CreatedAt);
        if let Some((offset, limit)) = pagination.window() {
            query = query.offset(offset).limit(limit);
        }
        let rows = query.all(&self.db).await?;

        let post_ids: Vec<Uuid> = rows.iter().map(|(post, _)| post.id).collect();
        let like_counts = self.like_counts(&post_ids).await?;
        let mut comments = if with_comments {
            self.comments_by_post(&post_ids).await?
        } else {
            HashMap::new()
        };

        Ok(rows
            .into_iter()
            .map(|(post, author)| {
                let likes = like_counts.get(&post.id).copied().unwrap_or(0);
                let post_id = post.id;
                let view = PostView::new(post, author, likes);
                if with_comments {
                    view.with_comments(comments.remove(&post_id).unwrap_or_default())
                } else {
                    view
                }
            })
            .collect())
    }

    // Comments

    pub async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<CommentView>> {
        if !self.post_exists(post_id).await? {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        let mut comments = self.comments_by_post(&[post_id]).await?;
        Ok(comments.remove(&post_id).unwrap_or_default())
    }

    /// Comments grouped by post, newest first within each group.
    async fn comments_by_post(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<CommentView>>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = comment::Entity::find()
            .filter(comment::Column::PostId.is_in(post_ids.iter().copied()))
            .find_also_related(user::Entity)
            .order_by_desc(comment::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
        for (comment, author) in rows {
            grouped
                .entry(comment.post_id)
                .or_default()
                .push(CommentView::new(comment, author));
        }
        Ok(grouped)
    }

    pub async fn create_comment(&self, new_comment: NewComment) -> Result<CommentView> {
        if !self.post_exists(new_comment.post_id).await? {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        let author = self
            .find_user(new_comment.author_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Author not found".to_string()))?;

        let now = Utc::now();
        let comment = comment::ActiveModel {
            id: Set(Uuid::new_v4()),
            content: Set(new_comment.content),
            author_id: Set(author.id),
            post_id: Set(new_comment.post_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(comment_id = %comment.id, post_id = %comment.post_id, "Created comment");
        Ok(CommentView::new(comment, Some(author)))
    }

    pub async fn update_comment(&self, comment_id: Uuid, content: String) -> Result<CommentView> {
        let existing = self.get_comment_record(comment_id).await?;
        let mut comment: comment::ActiveModel = existing.into();
        comment.content = Set(content);
        comment.updated_at = Set(Utc::now());

        let comment = comment.update(&self.db).await?;
        let author = self.find_user(comment.author_id).await?;
        Ok(CommentView::new(comment, author))
    }

    pub async fn delete_comment(&self, comment_id: Uuid) -> Result<comment::Model> {
        let comment = self.get_comment_record(comment_id).await?;
        comment.clone().delete(&self.db).await?;
        Ok(comment)
    }

    async fn get_comment_record(&self, comment_id: Uuid) -> Result<comment::Model> {
        comment::Entity::find_by_id(comment_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    // Likes

    /// Flips the user's like on a post. Returns whether the post is now liked
    /// and its like count afterwards.
    pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> Result<(bool, u64)> {
        if !self.post_exists(post_id).await? {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        let existing = like::Entity::find()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::PostId.eq(post_id))
            .one(&self.db)
            .await?;

        let liked = match existing {
            Some(row) => {
                row.delete(&self.db).await?;
                false
            }
            None => {
                let inserted = like::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    post_id: Set(post_id),
                    created_at: Set(Utc::now()),
                }
                .insert(&self.db)
                .await;

                match inserted {
                    Ok(_) => true,
                    // A concurrent request already liked it.
                    Err(err) if is_unique_violation(&err) => true,
                    Err(err) => return Err(err.into()),
                }
            }
        };

        Ok((liked, self.like_count(post_id).await?))
    }

    pub async fn like_count(&self, post_id: Uuid) -> Result<u64> {
        Ok(like::Entity::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(&self.db)
            .await?)
    }

    async fn like_counts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>> {
        if post_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i64)> = like::Entity::find()
            .select_only()
            .column(like::Column::PostId)
            .column_as(Expr::col(like::Column::Id).count(), "like_count")
            .filter(like::Column::PostId.is_in(post_ids.iter().copied()))
            .group_by(like::Column::PostId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(post_id, count)| (post_id, count.max(0) as u64))
            .collect())
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn email_conflict(err: DbErr) -> AppError {
    if is_unique_violation(&err) {
        AppError::Conflict("Email already exists".to_string())
    } else {
        AppError::Database(err)
    }
}
