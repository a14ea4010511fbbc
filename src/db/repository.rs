//! Database repository for all forum data operations.
//!
//! Uses prepared statements and transactions for data integrity. Denormalized
//! counters (`topics_amount`, `posts_amount`) are mutated only here, with
//! SQL-level atomic expressions, inside the same transaction as the write
//! that triggered them.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Category, CreateCategoryRequest, Message, MessageView, Post, PostWithVotes,
    RegisterUserRequest, SendMessageRequest, Subscription, Topic, UpdateProfileRequest, User,
    UserProfile, VoteDirection, VoteStatus,
};

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== USER OPERATIONS ====================

    /// Register a new user.
    pub async fn create_user(&self, request: &RegisterUserRequest) -> Result<User, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO users (id, username, location, about, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.username)
        .bind(&request.location)
        .bind(&request.about)
        .bind(&now)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(AppError::Validation(format!(
                    "Username {} is already taken",
                    request.username
                )));
            }
            return Err(e.into());
        }

        Ok(User {
            id,
            username: request.username.clone(),
            location: request.location.clone(),
            about: request.about.clone(),
            created_at: now,
        })
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT id, username, location, about, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user profile with activity stats derived from the posts table.
    pub async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>, AppError> {
        let row = sqlx::query(
            r#"SELECT u.id, u.username, u.location, u.about, u.created_at,
                      (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.id) AS posts_amount,
                      (SELECT MAX(p.creation_date) FROM posts p WHERE p.author_id = u.id) AS last_activity_date
               FROM users u WHERE u.id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserProfile {
            id: row.get("id"),
            username: row.get("username"),
            location: row.get("location"),
            about: row.get("about"),
            created_at: row.get("created_at"),
            posts_amount: row.get("posts_amount"),
            last_activity_date: row.get("last_activity_date"),
        }))
    }

    /// Update a user's profile fields.
    pub async fn update_profile(
        &self,
        id: &str,
        request: &UpdateProfileRequest,
    ) -> Result<User, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let location = request.location.clone().or(existing.location);
        let about = request.about.clone().or(existing.about);

        sqlx::query("UPDATE users SET location = ?, about = ? WHERE id = ?")
            .bind(&location)
            .bind(&about)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(User {
            id: id.to_string(),
            username: existing.username,
            location,
            about,
            created_at: existing.created_at,
        })
    }

    /// Delete a user account.
    ///
    /// Authored posts and messages keep existing with a null author; votes,
    /// subscriptions and read-state rows cascade away.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }

    // ==================== CATEGORY OPERATIONS ====================

    /// List all categories.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let rows = sqlx::query(
            "SELECT id, name, topics_amount, last_updated_date FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, topics_amount, last_updated_date FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(category_from_row))
    }

    /// Create a new category.
    pub async fn create_category(
        &self,
        request: &CreateCategoryRequest,
    ) -> Result<Category, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO categories (id, name, topics_amount, last_updated_date) VALUES (?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Category {
            id,
            name: request.name.clone(),
            topics_amount: 0,
            last_updated_date: now,
        })
    }

    /// Delete a category and everything under it.
    pub async fn delete_category(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }

        Ok(())
    }

    // ==================== TOPIC OPERATIONS ====================

    /// List all topics in a category.
    pub async fn list_topics(&self, category_id: &str) -> Result<Vec<Topic>, AppError> {
        let rows = sqlx::query(
            r#"SELECT id, category_id, title, creation_date, last_updated_date,
                      posts_amount, last_active_user
               FROM topics WHERE category_id = ? ORDER BY last_updated_date DESC"#,
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(topic_from_row).collect())
    }

    /// Get a topic by ID.
    pub async fn get_topic(&self, id: &str) -> Result<Option<Topic>, AppError> {
        let row = sqlx::query(
            r#"SELECT id, category_id, title, creation_date, last_updated_date,
                      posts_amount, last_active_user
               FROM topics WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(topic_from_row))
    }

    /// Create a new topic and bump the owning category's topic counter in
    /// the same transaction.
    pub async fn create_topic(
        &self,
        category_id: &str,
        title: &str,
        author_id: &str,
    ) -> Result<Topic, AppError> {
        self.get_category(category_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", category_id)))?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO topics (id, category_id, title, creation_date, last_updated_date,
                                   posts_amount, last_active_user)
               VALUES (?, ?, ?, ?, ?, 0, ?)"#,
        )
        .bind(&id)
        .bind(category_id)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .bind(author_id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE categories SET topics_amount = topics_amount + 1 WHERE id = ?",
        )
        .bind(category_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Concurrency(format!(
                "Category {} vanished while creating a topic",
                category_id
            )));
        }

        tx.commit().await?;

        Ok(Topic {
            id,
            category_id: category_id.to_string(),
            title: title.to_string(),
            creation_date: now.clone(),
            last_updated_date: now,
            posts_amount: 0,
            last_active_user: Some(author_id.to_string()),
        })
    }

    /// Delete a topic, its posts and their votes, decrementing the owning
    /// category's topic counter in the same transaction.
    pub async fn delete_topic(&self, id: &str) -> Result<(), AppError> {
        let topic = self
            .get_topic(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", id)))?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Topic {} not found", id)));
        }

        sqlx::query("UPDATE categories SET topics_amount = topics_amount - 1 WHERE id = ?")
            .bind(&topic.category_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== POST OPERATIONS ====================

    /// List posts under a topic, newest first, with vote totals and the
    /// viewing user's own vote value (0 when anonymous or not voted).
    pub async fn list_posts(
        &self,
        topic_id: &str,
        viewer: Option<&str>,
    ) -> Result<Vec<PostWithVotes>, AppError> {
        let rows = sqlx::query(
            r#"SELECT p.id, p.topic_id, p.author_id, p.body, p.creation_date,
                      COALESCE((SELECT SUM(v.value) FROM votes v WHERE v.post_id = p.id), 0) AS votes,
                      COALESCE((SELECT v.value FROM votes v WHERE v.post_id = p.id AND v.user_id = ?), 0) AS viewer_vote
               FROM posts p
               WHERE p.topic_id = ?
               ORDER BY p.creation_date DESC, p.id DESC"#,
        )
        .bind(viewer)
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PostWithVotes {
                id: row.get("id"),
                topic_id: row.get("topic_id"),
                author_id: row.get("author_id"),
                body: row.get("body"),
                creation_date: row.get("creation_date"),
                votes: row.get("votes"),
                viewer_vote: row.get("viewer_vote"),
            })
            .collect())
    }

    /// Get a post by ID.
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let row = sqlx::query(
            "SELECT id, topic_id, author_id, body, creation_date FROM posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// Create a post and maintain the owning topic's aggregates in the same
    /// transaction: post counter, last active user, and the last-updated
    /// timestamps of both the topic and its category.
    pub async fn create_post(
        &self,
        topic_id: &str,
        author_id: &str,
        body: &str,
    ) -> Result<Post, AppError> {
        let topic = self
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", topic_id)))?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO posts (id, topic_id, author_id, body, creation_date) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(topic_id)
        .bind(author_id)
        .bind(body)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"UPDATE topics
               SET posts_amount = posts_amount + 1, last_active_user = ?, last_updated_date = ?
               WHERE id = ?"#,
        )
        .bind(author_id)
        .bind(&now)
        .bind(topic_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Concurrency(format!(
                "Topic {} vanished while creating a post",
                topic_id
            )));
        }

        sqlx::query("UPDATE categories SET last_updated_date = ? WHERE id = ?")
            .bind(&now)
            .bind(&topic.category_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Post {
            id,
            topic_id: topic_id.to_string(),
            author_id: Some(author_id.to_string()),
            body: body.to_string(),
            creation_date: now,
        })
    }

    /// Delete a post, decrementing the owning topic's post counter in the
    /// same transaction.
    ///
    /// `last_active_user` keeps whatever it pointed at; it is not recomputed
    /// from the remaining posts.
    pub async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        let post = self
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }

        sqlx::query("UPDATE topics SET posts_amount = posts_amount - 1 WHERE id = ?")
            .bind(&post.topic_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // ==================== VOTE OPERATIONS ====================

    /// Cast a vote on a post.
    ///
    /// First vote inserts a row; a repeat in the same direction is rejected;
    /// a vote in the opposite direction deletes the existing row (a call
    /// toggles at most one row's existence, never updates one in place).
    /// The returned total is recomputed from the ledger inside the same
    /// transaction as the mutation.
    pub async fn cast_vote(
        &self,
        user_id: &str,
        post_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteStatus, AppError> {
        let post = self
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

        if post.author_id.as_deref() == Some(user_id) {
            return Err(AppError::SelfVote);
        }

        let value = direction.value();
        let previous: Option<i64> =
            sqlx::query("SELECT value FROM votes WHERE user_id = ? AND post_id = ?")
                .bind(user_id)
                .bind(post_id)
                .fetch_optional(&self.pool)
                .await?
                .map(|row| row.get("value"));

        if previous == Some(value) {
            return Err(AppError::DuplicateVote);
        }

        let mut tx = self.pool.begin().await?;

        let prev_vote = match previous {
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                let result = sqlx::query(
                    "INSERT INTO votes (id, user_id, post_id, value) VALUES (?, ?, ?, ?)",
                )
                .bind(&id)
                .bind(user_id)
                .bind(post_id)
                .bind(value)
                .execute(&mut *tx)
                .await;

                if let Err(e) = result {
                    // A racing request created the row first; the re-vote rule applies.
                    if is_unique_violation(&e) {
                        return Err(AppError::DuplicateVote);
                    }
                    return Err(e.into());
                }
                0
            }
            Some(prev) => {
                let result = sqlx::query(
                    "DELETE FROM votes WHERE user_id = ? AND post_id = ? AND value = ?",
                )
                .bind(user_id)
                .bind(post_id)
                .bind(prev)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(AppError::Concurrency(format!(
                        "Vote on post {} changed concurrently",
                        post_id
                    )));
                }
                prev
            }
        };

        let total: i64 =
            sqlx::query("SELECT COALESCE(SUM(value), 0) AS total FROM votes WHERE post_id = ?")
                .bind(post_id)
                .fetch_one(&mut *tx)
                .await?
                .get("total");

        tx.commit().await?;

        Ok(VoteStatus {
            votes: total,
            prev_vote,
        })
    }

    // ==================== SUBSCRIPTION & FEED OPERATIONS ====================

    /// Get a user's subscription to a topic, if any.
    pub async fn get_subscription(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<Option<Subscription>, AppError> {
        let row = sqlx::query(
            "SELECT id, user_id, topic_id, creation_date FROM subscriptions WHERE user_id = ? AND topic_id = ?",
        )
        .bind(user_id)
        .bind(topic_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Subscription {
            id: row.get("id"),
            user_id: row.get("user_id"),
            topic_id: row.get("topic_id"),
            creation_date: row.get("creation_date"),
        }))
    }

    /// Toggle a user's subscription to a topic. Returns true when the call
    /// created a subscription, false when it removed one.
    ///
    /// Unsubscribing also drops the user's read-state for posts under the
    /// topic, in the same transaction, so a later re-subscription starts
    /// fresh from its new watermark.
    pub async fn toggle_subscription(
        &self,
        user_id: &str,
        topic_id: &str,
    ) -> Result<bool, AppError> {
        self.get_topic(topic_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic {} not found", topic_id)))?;

        match self.get_subscription(user_id, topic_id).await? {
            Some(subscription) => {
                let mut tx = self.pool.begin().await?;

                sqlx::query(
                    r#"DELETE FROM read_posts
                       WHERE user_id = ?
                         AND post_id IN (SELECT id FROM posts WHERE topic_id = ?)"#,
                )
                .bind(user_id)
                .bind(topic_id)
                .execute(&mut *tx)
                .await?;

                sqlx::query("DELETE FROM subscriptions WHERE id = ?")
                    .bind(&subscription.id)
                    .execute(&mut *tx)
                    .await?;

                tx.commit().await?;
                Ok(false)
            }
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                let now = Utc::now().to_rfc3339();

                let result = sqlx::query(
                    "INSERT INTO subscriptions (id, user_id, topic_id, creation_date) VALUES (?, ?, ?, ?)",
                )
                .bind(&id)
                .bind(user_id)
                .bind(topic_id)
                .bind(&now)
                .execute(&self.pool)
                .await;

                if let Err(e) = result {
                    if is_unique_violation(&e) {
                        return Err(AppError::Concurrency(format!(
                            "Subscription to topic {} was toggled concurrently",
                            topic_id
                        )));
                    }
                    return Err(e.into());
                }
                Ok(true)
            }
        }
    }

    /// Compute the activity feed for a user: posts in subscribed topics
    /// created strictly after the subscription watermark, excluding the
    /// user's own posts and posts already marked read. Newest first, post id
    /// as the tie-break.
    pub async fn compute_feed(&self, user_id: &str) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query(
            r#"SELECT p.id, p.topic_id, p.author_id, p.body, p.creation_date
               FROM posts p
               JOIN subscriptions s ON s.topic_id = p.topic_id AND s.user_id = ?
               WHERE p.creation_date > s.creation_date
                 AND (p.author_id IS NULL OR p.author_id <> ?)
                 AND p.id NOT IN (SELECT post_id FROM read_posts WHERE user_id = ?)
               ORDER BY p.creation_date DESC, p.id DESC"#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    // ==================== READ-STATE OPERATIONS ====================

    /// Mark a post as read by a user. Duplicate calls are rejected.
    pub async fn mark_post_read(&self, user_id: &str, post_id: &str) -> Result<(), AppError> {
        self.get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

        let id = uuid::Uuid::new_v4().to_string();
        let result = sqlx::query("INSERT INTO read_posts (id, user_id, post_id) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(AppError::AlreadyRead(
                    "This post is already marked as read by user".to_string(),
                ));
            }
            return Err(e.into());
        }

        Ok(())
    }

    /// Remove a user's read mark from a post.
    pub async fn mark_post_unread(&self, user_id: &str, post_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM read_posts WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Post {} is not marked as read",
                post_id
            )));
        }

        Ok(())
    }

    /// Whether a user has marked a post read.
    pub async fn is_post_read(&self, user_id: &str, post_id: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM read_posts WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    // ==================== MESSAGE OPERATIONS ====================

    /// Send a private message.
    pub async fn send_message(
        &self,
        sender_id: &str,
        request: &SendMessageRequest,
    ) -> Result<Message, AppError> {
        self.get_user(&request.receiver_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("User {} not found", request.receiver_id))
            })?;

        let subject = request
            .subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("(No subject)")
            .to_string();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, subject, body, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(sender_id)
        .bind(&request.receiver_id)
        .bind(&subject)
        .bind(&request.body)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            id,
            sender_id: Some(sender_id.to_string()),
            receiver_id: Some(request.receiver_id.clone()),
            subject,
            body: request.body.clone(),
            created_at: now,
        })
    }

    /// Get a message by ID.
    pub async fn get_message(&self, id: &str) -> Result<Option<Message>, AppError> {
        let row = sqlx::query(
            "SELECT id, sender_id, receiver_id, subject, body, created_at FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(message_from_row))
    }

    /// List received messages not moved to the bucket, newest first.
    pub async fn inbox(&self, user_id: &str) -> Result<Vec<MessageView>, AppError> {
        let rows = sqlx::query(
            r#"SELECT m.id, m.sender_id, m.receiver_id, m.subject, m.body, m.created_at,
                      EXISTS(SELECT 1 FROM read_messages r
                             WHERE r.user_id = ? AND r.message_id = m.id) AS is_read
               FROM messages m
               WHERE m.receiver_id = ?
                 AND m.id NOT IN (SELECT message_id FROM deleted_messages WHERE user_id = ?)
               ORDER BY m.created_at DESC"#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_view_from_row).collect())
    }

    /// List sent messages not moved to the bucket, newest first.
    pub async fn outbox(&self, user_id: &str) -> Result<Vec<MessageView>, AppError> {
        let rows = sqlx::query(
            r#"SELECT m.id, m.sender_id, m.receiver_id, m.subject, m.body, m.created_at,
                      EXISTS(SELECT 1 FROM read_messages r
                             WHERE r.user_id = ? AND r.message_id = m.id) AS is_read
               FROM messages m
               WHERE m.sender_id = ?
                 AND m.id NOT IN (SELECT message_id FROM deleted_messages WHERE user_id = ?)
               ORDER BY m.created_at DESC"#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_view_from_row).collect())
    }

    /// List messages in the user's bucket (deleted once, not permanently).
    pub async fn bucket(&self, user_id: &str) -> Result<Vec<MessageView>, AppError> {
        let rows = sqlx::query(
            r#"SELECT m.id, m.sender_id, m.receiver_id, m.subject, m.body, m.created_at,
                      EXISTS(SELECT 1 FROM read_messages r
                             WHERE r.user_id = ? AND r.message_id = m.id) AS is_read
               FROM messages m
               WHERE m.id IN (SELECT message_id FROM deleted_messages
                              WHERE user_id = ? AND is_deleted_permanently = 0)
               ORDER BY m.created_at DESC"#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_view_from_row).collect())
    }

    /// Delete a message for one participant.
    ///
    /// First deletion moves the message to the user's bucket. Deleting it
    /// again marks it permanently deleted for that user; once both
    /// participants have done so the row is physically removed. Only the
    /// sender or receiver may delete.
    pub async fn delete_message(&self, user_id: &str, message_id: &str) -> Result<(), AppError> {
        let message = self
            .get_message(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))?;

        let is_sender = message.sender_id.as_deref() == Some(user_id);
        let is_receiver = message.receiver_id.as_deref() == Some(user_id);
        if !is_sender && !is_receiver {
            return Err(AppError::NotFound("The page does not exist".to_string()));
        }

        let in_bucket =
            sqlx::query("SELECT 1 FROM deleted_messages WHERE user_id = ? AND message_id = ?")
                .bind(user_id)
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await?
                .is_some();

        if !in_bucket {
            let id = uuid::Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO deleted_messages (id, user_id, message_id, is_deleted_permanently) VALUES (?, ?, ?, 0)",
            )
            .bind(&id)
            .bind(user_id)
            .bind(message_id)
            .execute(&self.pool)
            .await?;
            return Ok(());
        }

        // A missing counterpart (removed account) counts as not yet deleted.
        let other = if is_sender {
            message.receiver_id.as_deref()
        } else {
            message.sender_id.as_deref()
        };

        let other_deleted_permanently = match other {
            Some(other_id) => sqlx::query(
                "SELECT is_deleted_permanently FROM deleted_messages WHERE user_id = ? AND message_id = ?",
            )
            .bind(other_id)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.get::<i64, _>("is_deleted_permanently") != 0)
            .unwrap_or(false),
            None => false,
        };

        if other_deleted_permanently {
            sqlx::query("DELETE FROM messages WHERE id = ?")
                .bind(message_id)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query(
                "UPDATE deleted_messages SET is_deleted_permanently = 1 WHERE user_id = ? AND message_id = ?",
            )
            .bind(user_id)
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Restore a message from the user's bucket.
    pub async fn restore_message(&self, user_id: &str, message_id: &str) -> Result<(), AppError> {
        let message = self
            .get_message(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))?;

        let is_sender = message.sender_id.as_deref() == Some(user_id);
        let is_receiver = message.receiver_id.as_deref() == Some(user_id);
        if !is_sender && !is_receiver {
            return Err(AppError::NotFound("The page does not exist".to_string()));
        }

        let result =
            sqlx::query("DELETE FROM deleted_messages WHERE user_id = ? AND message_id = ?")
                .bind(user_id)
                .bind(message_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Message {} is not in the bucket",
                message_id
            )));
        }

        Ok(())
    }

    /// Mark a message as read by a user. Duplicate calls are rejected.
    pub async fn mark_message_read(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<(), AppError> {
        self.get_message(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))?;

        let id = uuid::Uuid::new_v4().to_string();
        let result =
            sqlx::query("INSERT INTO read_messages (id, user_id, message_id) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(user_id)
                .bind(message_id)
                .execute(&self.pool)
                .await;

        if let Err(e) = result {
            if is_unique_violation(&e) {
                return Err(AppError::AlreadyRead(
                    "This message is already marked as read by user".to_string(),
                ));
            }
            return Err(e.into());
        }

        Ok(())
    }

    /// Remove a user's read mark from a message.
    pub async fn mark_message_unread(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<(), AppError> {
        let result =
            sqlx::query("DELETE FROM read_messages WHERE user_id = ? AND message_id = ?")
                .bind(user_id)
                .bind(message_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Message {} is not marked as read",
                message_id
            )));
        }

        Ok(())
    }

    /// Whether a user has marked a message read.
    pub async fn is_message_read(
        &self,
        user_id: &str,
        message_id: &str,
    ) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT 1 FROM read_messages WHERE user_id = ? AND message_id = ?")
            .bind(user_id)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}

// Helper functions for row conversion

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        location: row.get("location"),
        about: row.get("about"),
        created_at: row.get("created_at"),
    }
}

fn category_from_row(row: &sqlx::sqlite::SqliteRow) -> Category {
    Category {
        id: row.get("id"),
        name: row.get("name"),
        topics_amount: row.get("topics_amount"),
        last_updated_date: row.get("last_updated_date"),
    }
}

fn topic_from_row(row: &sqlx::sqlite::SqliteRow) -> Topic {
    Topic {
        id: row.get("id"),
        category_id: row.get("category_id"),
        title: row.get("title"),
        creation_date: row.get("creation_date"),
        last_updated_date: row.get("last_updated_date"),
        posts_amount: row.get("posts_amount"),
        last_active_user: row.get("last_active_user"),
    }
}

fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: row.get("id"),
        topic_id: row.get("topic_id"),
        author_id: row.get("author_id"),
        body: row.get("body"),
        creation_date: row.get("creation_date"),
    }
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        subject: row.get("subject"),
        body: row.get("body"),
        created_at: row.get("created_at"),
    }
}

fn message_view_from_row(row: &sqlx::sqlite::SqliteRow) -> MessageView {
    let is_read: i64 = row.get("is_read");
    MessageView {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        subject: row.get("subject"),
        body: row.get("body"),
        created_at: row.get("created_at"),
        is_read: is_read != 0,
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}
