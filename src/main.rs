// ABOUTME: Main entry point for the postboard blog API with users, posts, comments and likes
// ABOUTME: Sets up logging, storage, sessions, routes, and the HTTP server

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::Json,
    routing::{get, post, put},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod auth;
mod auth_helpers;
mod config;
mod entities;
mod error;
mod middleware;
mod migration;
mod password;
mod session;
mod storage;
mod types;
mod validation;

#[cfg(test)]
mod storage_tests;

use config::Config;
use entities::{blog_post, comment};
use error::{AppError, Result};
use session::SessionStore;
use storage::{NewComment, NewPost, NewUser, PostChanges, Storage, UserChanges};
use types::*;
use validation::{make_excerpt, non_empty, normalize_email, sanitize_string, validate_user_data};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<Storage>,
    pub sessions: SessionStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("postboard=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let storage = Arc::new(Storage::new(&config.database_url).await?);
    let sessions = SessionStore::new(config.session_max_age_secs);

    spawn_session_sweeper(
        sessions.clone(),
        Duration::from_secs(config.session_sweep_interval_secs),
    );

    let app_state = AppState {
        config: Arc::new(config.clone()),
        storage,
        sessions,
    };

    let app = build_router(app_state);

    let listener = TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server running on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/:id/posts", get(get_user_posts))
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/:id",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/posts/:id/comments", get(get_post_comments))
        .route("/api/posts/:id/like", post(toggle_like))
        .route("/api/comments", post(create_comment))
        .route(
            "/api/comments/:id",
            put(update_comment).delete(delete_comment),
        )
        .layer(axum_middleware::from_fn(middleware::security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn spawn_session_sweeper(sessions: SessionStore, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_expired_sessions();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired sessions");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down server...");
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::BadRequest(format!("Invalid {} ID", what)))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// Users

async fn list_users(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<UserSummary>>> {
    let users = state.storage.list_users(pagination).await?;
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

async fn get_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserSummary>> {
    let user_id = parse_id(&user_id, "user")?;
    let user = state.storage.get_user(user_id).await?;
    Ok(Json(user.into()))
}

async fn get_user_posts(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostView>>> {
    let user_id = parse_id(&user_id, "user")?;
    state.storage.get_user(user_id).await?;
    Ok(Json(state.storage.list_posts_by_author(user_id).await?))
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserSummary>)> {
    let (Some(name), Some(email)) = (non_empty(req.name), non_empty(req.email)) else {
        return Err(AppError::BadRequest(
            "Name and email are required".to_string(),
        ));
    };

    let name = sanitize_string(&name);
    let email = normalize_email(&email);
    validate_user_data(Some(&name), Some(&email)).map_err(AppError::BadRequest)?;

    if state.storage.email_in_use(&email, None).await? {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let user = state
        .storage
        .create_user(NewUser {
            name,
            email,
            password_hash: None,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn update_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserSummary>> {
    let user_id = parse_id(&user_id, "user")?;

    let name = non_empty(req.name).map(|n| sanitize_string(&n));
    let email = non_empty(req.email).map(|e| normalize_email(&e));
    let avatar = non_empty(req.avatar);
    let bio = non_empty(req.bio);

    if name.is_none() && email.is_none() && avatar.is_none() && bio.is_none() {
        return Err(AppError::BadRequest(
            "At least one field (name, email, avatar or bio) must be provided".to_string(),
        ));
    }

    validate_user_data(name.as_deref(), email.as_deref()).map_err(AppError::BadRequest)?;

    if let Some(email) = &email {
        if state.storage.email_in_use(email, Some(user_id)).await? {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
    }

    let user = state
        .storage
        .update_user(
            user_id,
            UserChanges {
                name,
                email,
                avatar,
                bio,
            },
        )
        .await?;

    Ok(Json(user.into()))
}

async fn delete_user(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteUserResponse>> {
    let user_id = parse_id(&user_id, "user")?;
    let user = state.storage.delete_user(user_id).await?;
    state.sessions.remove_user_sessions(user_id);

    Ok(Json(DeleteUserResponse {
        message: "User deleted successfully".to_string(),
        user: user.into(),
    }))
}

// Posts

async fn list_posts(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<PostView>>> {
    Ok(Json(state.storage.list_posts(pagination).await?))
}

async fn create_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostView>)> {
    let author_id = match non_empty(req.author_id) {
        Some(raw) => Some(parse_id(&raw, "author")?),
        None => auth_helpers::optional_user_id(&jar, &state),
    };

    let (Some(title), Some(content), Some(author_id)) =
        (non_empty(req.title), non_empty(req.content), author_id)
    else {
        return Err(AppError::BadRequest(
            "Title, content, and authorId are required".to_string(),
        ));
    };

    let excerpt = non_empty(req.excerpt).unwrap_or_else(|| make_excerpt(&content));

    let post = state
        .storage
        .create_post(NewPost {
            title,
            content,
            excerpt,
            caption: non_empty(req.caption),
            image: non_empty(req.image),
            author_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    Path(post_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PostView>> {
    let post_id = parse_id(&post_id, "post")?;
    Ok(Json(state.storage.get_post(post_id).await?))
}

async fn update_post(
    Path(post_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<UpdatePostRequest>,
) -> Result<Json<PostView>> {
    let post_id = parse_id(&post_id, "post")?;

    let changes = PostChanges {
        title: non_empty(req.title),
        content: non_empty(req.content),
        excerpt: non_empty(req.excerpt),
        caption: non_empty(req.caption),
        image: non_empty(req.image),
    };

    Ok(Json(state.storage.update_post(post_id, changes).await?))
}

async fn delete_post(
    Path(post_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<blog_post::Model>> {
    let post_id = parse_id(&post_id, "post")?;
    Ok(Json(state.storage.delete_post(post_id).await?))
}

async fn get_post_comments(
    Path(post_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CommentView>>> {
    let post_id = parse_id(&post_id, "post")?;
    Ok(Json(state.storage.comments_for_post(post_id).await?))
}

async fn toggle_like(
    Path(post_id): Path<String>,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<LikeResponse>> {
    let user_id = auth_helpers::require_user_id(&jar, &state)?;
    let post_id = parse_id(&post_id, "post")?;

    let (liked, like_count) = state.storage.toggle_like(user_id, post_id).await?;
    Ok(Json(LikeResponse { liked, like_count }))
}

// Comments

async fn create_comment(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>)> {
    let author_id = match non_empty(req.author_id) {
        Some(raw) => Some(parse_id(&raw, "author")?),
        None => auth_helpers::optional_user_id(&jar, &state),
    };

    let (Some(content), Some(author_id), Some(post_id)) =
        (non_empty(req.content), author_id, non_empty(req.post_id))
    else {
        return Err(AppError::BadRequest(
            "Content, authorId, and postId are required".to_string(),
        ));
    };
    let post_id = parse_id(&post_id, "post")?;

    let comment = state
        .storage
        .create_comment(NewComment {
            content,
            author_id,
            post_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    Path(comment_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<UpdateCommentRequest>,
) -> Result<Json<CommentView>> {
    let comment_id = parse_id(&comment_id, "comment")?;
    let content = non_empty(req.content)
        .ok_or_else(|| AppError::BadRequest("Content is required".to_string()))?;

    Ok(Json(state.storage.update_comment(comment_id, content).await?))
}

async fn delete_comment(
    Path(comment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<comment::Model>> {
    let comment_id = parse_id(&comment_id, "comment")?;
    Ok(Json(state.storage.delete_comment(comment_id).await?))
}
