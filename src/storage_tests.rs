// ABOUTME: Tests for the SeaORM storage layer against a temporary SQLite database
// ABOUTME: Covers user, post, comment and like persistence plus cascading deletes

#[cfg(test)]
mod tests {
    use super::super::error::AppError;
    use super::super::storage::*;
    use super::super::types::Pagination;
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let storage = Storage::new(&db_url).await.unwrap();
        (storage, temp_dir)
    }

    async fn create_test_user(storage: &Storage, name: &str) -> Uuid {
        storage
            .create_user(NewUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn create_test_post(storage: &Storage, author_id: Uuid, title: &str) -> Uuid {
        storage
            .create_post(NewPost {
                title: title.to_string(),
                content: format!("Body of {}", title),
                excerpt: format!("Body of {}", title),
                caption: None,
                image: None,
                author_id,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_user_operations() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user_id = create_test_user(&storage, "Ada").await;

        let by_id = storage.get_user(user_id).await.unwrap();
        assert_eq!(by_id.name, "Ada");
        assert_eq!(by_id.email, "ada@example.com");

        let by_email = storage
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user_id);

        let updated = storage
            .update_user(
                user_id,
                UserChanges {
                    bio: Some("Analyst".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("Analyst"));
        assert_eq!(updated.name, "Ada");
        assert!(updated.updated_at >= updated.created_at);

        let users = storage.list_users(Pagination::default()).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn test_user_not_found() {
        let (storage, _temp_dir) = create_test_storage().await;

        assert!(storage.find_user(Uuid::new_v4()).await.unwrap().is_none());
        assert!(matches!(
            storage.get_user(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            storage
                .update_user(Uuid::new_v4(), UserChanges::default())
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            storage.delete_user(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_email_uniqueness() {
        let (storage, _temp_dir) = create_test_storage().await;

        let ada = create_test_user(&storage, "Ada").await;
        let grace = create_test_user(&storage, "Grace").await;

        assert!(storage.email_in_use("ada@example.com", None).await.unwrap());
        assert!(!storage
            .email_in_use("ada@example.com", Some(ada))
            .await
            .unwrap());
        assert!(storage
            .email_in_use("ada@example.com", Some(grace))
            .await
            .unwrap());

        // The unique index backs up the application-level check
        let duplicate = storage
            .create_user(NewUser {
                name: "Other Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: None,
            })
            .await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_post_lifecycle() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "Writer").await;
        let post_id = create_test_post(&storage, author, "First").await;

        let post = storage.get_post(post_id).await.unwrap();
        assert_eq!(post.title, "First");
        assert_eq!(post.author.as_ref().unwrap().id, author);
        assert_eq!(post.like_count, 0);
        assert_eq!(post.comments.as_ref().unwrap().len(), 0);

        let updated = storage
            .update_post(
                post_id,
                PostChanges {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.content, "Body of First");

        let deleted = storage.delete_post(post_id).await.unwrap();
        assert_eq!(deleted.id, post_id);
        assert!(storage.find_post(post_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_post_requires_existing_author() {
        let (storage, _temp_dir) = create_test_storage().await;

        let result = storage
            .create_post(NewPost {
                title: "Orphan".to_string(),
                content: "Nobody wrote this".to_string(),
                excerpt: "Nobody".to_string(),
                caption: None,
                image: None,
                author_id: Uuid::new_v4(),
            })
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_posts_listed_newest_first_with_comments() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "Writer").await;
        let reader = create_test_user(&storage, "Reader").await;
        let older = create_test_post(&storage, author, "Older").await;
        let newer = create_test_post(&storage, author, "Newer").await;

        storage
            .create_comment(NewComment {
                content: "first!".to_string(),
                author_id: reader,
                post_id: older,
            })
            .await
            .unwrap();
        storage
            .create_comment(NewComment {
                content: "second".to_string(),
                author_id: author,
                post_id: older,
            })
            .await
            .unwrap();

        let posts = storage.list_posts(Pagination::default()).await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, newer);
        assert_eq!(posts[1].id, older);

        let comments = posts[1].comments.as_ref().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "second");
        assert_eq!(comments[1].author.as_ref().unwrap().name, "Reader");

        let page = storage
            .list_posts(Pagination {
                page: Some(2),
                limit: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, older);

        let by_author = storage.list_posts_by_author(reader).await.unwrap();
        assert!(by_author.is_empty());
    }

    #[tokio::test]
    async fn test_comment_operations() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "Writer").await;
        let post_id = create_test_post(&storage, author, "Post").await;

        let missing_post = storage
            .create_comment(NewComment {
                content: "hello".to_string(),
                author_id: author,
                post_id: Uuid::new_v4(),
            })
            .await;
        assert!(matches!(missing_post, Err(AppError::NotFound(_))));

        let comment = storage
            .create_comment(NewComment {
                content: "hello".to_string(),
                author_id: author,
                post_id,
            })
            .await
            .unwrap();
        assert_eq!(comment.author.as_ref().unwrap().id, author);

        let edited = storage
            .update_comment(comment.id, "edited".to_string())
            .await
            .unwrap();
        assert_eq!(edited.content, "edited");

        let listed = storage.comments_for_post(post_id).await.unwrap();
        assert_eq!(listed.len(), 1);

        storage.delete_comment(comment.id).await.unwrap();
        assert!(storage.comments_for_post(post_id).await.unwrap().is_empty());
        assert!(matches!(
            storage.delete_comment(comment.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_like_toggle() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "Writer").await;
        let fan = create_test_user(&storage, "Fan").await;
        let post_id = create_test_post(&storage, author, "Likeable").await;

        assert_eq!(storage.toggle_like(fan, post_id).await.unwrap(), (true, 1));
        assert_eq!(storage.toggle_like(author, post_id).await.unwrap(), (true, 2));
        assert_eq!(storage.get_post(post_id).await.unwrap().like_count, 2);

        assert_eq!(storage.toggle_like(fan, post_id).await.unwrap(), (false, 1));

        assert!(matches!(
            storage.toggle_like(fan, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_like_counts_per_post_in_listing() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "Writer").await;
        let fan = create_test_user(&storage, "Fan").await;
        let popular = create_test_post(&storage, author, "Popular").await;
        let quiet = create_test_post(&storage, author, "Quiet").await;
        let ignored = create_test_post(&storage, author, "Ignored").await;

        storage.toggle_like(author, popular).await.unwrap();
        storage.toggle_like(fan, popular).await.unwrap();
        storage.toggle_like(fan, quiet).await.unwrap();

        let posts = storage.list_posts(Pagination::default()).await.unwrap();
        let count_for = |id: Uuid| posts.iter().find(|p| p.id == id).unwrap().like_count;
        assert_eq!(count_for(popular), 2);
        assert_eq!(count_for(quiet), 1);
        assert_eq!(count_for(ignored), 0);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let (storage, _temp_dir) = create_test_storage().await;

        let author = create_test_user(&storage, "Writer").await;
        let reader = create_test_user(&storage, "Reader").await;
        let post_id = create_test_post(&storage, author, "Doomed").await;
        let reader_post = create_test_post(&storage, reader, "Survivor").await;

        storage
            .create_comment(NewComment {
                content: "nice".to_string(),
                author_id: reader,
                post_id,
            })
            .await
            .unwrap();
        storage
            .create_comment(NewComment {
                content: "thanks".to_string(),
                author_id: author,
                post_id: reader_post,
            })
            .await
            .unwrap();
        storage.toggle_like(author, reader_post).await.unwrap();

        storage.delete_user(author).await.unwrap();

        assert!(storage.find_post(post_id).await.unwrap().is_none());
        let survivor = storage.get_post(reader_post).await.unwrap();
        assert!(survivor.comments.unwrap().is_empty());
        assert_eq!(survivor.like_count, 0);
    }
}
