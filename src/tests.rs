//! Integration tests for the forum backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::models::{RegisterUserRequest, VoteDirection};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let state = AppState {
            repo,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a user and return their id.
    async fn register(&self, username: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/users"))
            .json(&json!({ "username": username }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    /// Create a category as the given user and return its id.
    async fn create_category(&self, user: &str, name: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/categories"))
            .header("x-user-id", user)
            .json(&json!({ "name": name }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["id"].as_str().unwrap().to_string()
    }

    /// Create a topic (with its opening post) and return the topic JSON.
    async fn create_topic(&self, user: &str, category_id: &str, title: &str, body: &str) -> Value {
        let resp = self
            .client
            .post(self.url("/api/topics"))
            .header("x-user-id", user)
            .json(&json!({ "category_id": category_id, "title": title, "body": body }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    /// Add a post to a topic and return the post JSON.
    async fn add_post(&self, user: &str, topic_id: &str, body: &str) -> Value {
        let resp = self
            .client
            .post(self.url(&format!("/api/topics/{}/posts", topic_id)))
            .header("x-user-id", user)
            .json(&json!({ "body": body }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    async fn get_json_as(&self, user: &str, path: &str) -> Value {
        let resp = self
            .client
            .get(self.url(path))
            .header("x-user-id", user)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }

    async fn vote(&self, user: &str, post_id: &str, direction: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/api/posts/{}/vote/{}", post_id, direction)))
            .header("x-user-id", user)
            .send()
            .await
            .unwrap()
    }

    /// Toggle a topic subscription for the given user.
    async fn toggle_subscription(&self, user: &str, topic_id: &str) -> Value {
        let resp = self
            .client
            .post(self.url(&format!("/api/topics/{}/subscription", topic_id)))
            .header("x-user-id", user)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }
}

/// Repository-level fixture for tests that drive the pool directly.
async fn repo_fixture() -> (Repository, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let pool = init_database(&temp_dir.path().join("test.sqlite"))
        .await
        .expect("Failed to init DB");
    (Repository::new(pool), temp_dir)
}

async fn register_direct(repo: &Repository, username: &str) -> String {
    repo.create_user(&RegisterUserRequest {
        username: username.to_string(),
        location: None,
        about: None,
    })
    .await
    .unwrap()
    .id
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_register_and_profile() {
    let fixture = TestFixture::new().await;

    let user_id = fixture.register("alice").await;

    let profile = fixture.get_json(&format!("/api/users/{}", user_id)).await;
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["posts_amount"], 0);
    assert!(profile.get("last_activity_date").is_none());

    // Duplicate username is rejected
    let resp = fixture
        .client
        .post(fixture.url("/api/users"))
        .json(&json!({ "username": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "400");
}

#[tokio::test]
async fn test_profile_stats_follow_posts() {
    let fixture = TestFixture::new().await;

    let alice = fixture.register("alice").await;
    let category_id = fixture.create_category(&alice, "General").await;
    let topic = fixture
        .create_topic(&alice, &category_id, "Hello", "First!")
        .await;
    fixture
        .add_post(&alice, topic["id"].as_str().unwrap(), "Second post")
        .await;

    let profile = fixture.get_json(&format!("/api/users/{}", alice)).await;
    assert_eq!(profile["posts_amount"], 2);
    assert!(profile["last_activity_date"].is_string());
}

#[tokio::test]
async fn test_unknown_acting_user_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/feed"))
        .header("x-user-id", "no-such-user")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .get(fixture.url("/api/feed"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_topic_creation_maintains_category_counter() {
    let fixture = TestFixture::new().await;

    let alice = fixture.register("alice").await;
    let category_id = fixture.create_category(&alice, "General").await;

    let category = fixture
        .get_json(&format!("/api/categories/{}", category_id))
        .await;
    assert_eq!(category["topics_amount"], 0);

    let topic = fixture
        .create_topic(&alice, &category_id, "First topic", "Opening post")
        .await;
    // The opening post is counted and attributed
    assert_eq!(topic["posts_amount"], 1);
    assert_eq!(topic["last_active_user"], alice.as_str());

    let category = fixture
        .get_json(&format!("/api/categories/{}", category_id))
        .await;
    assert_eq!(category["topics_amount"], 1);

    let topic2 = fixture
        .create_topic(&alice, &category_id, "Second topic", "Opening post")
        .await;
    let category = fixture
        .get_json(&format!("/api/categories/{}", category_id))
        .await;
    assert_eq!(category["topics_amount"], 2);

    // Deletion decrements
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/topics/{}", topic2["id"].as_str().unwrap())))
        .header("x-user-id", &alice)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let category = fixture
        .get_json(&format!("/api/categories/{}", category_id))
        .await;
    assert_eq!(category["topics_amount"], 1);
}

#[tokio::test]
async fn test_post_creation_maintains_topic_aggregates() {
    let fixture = TestFixture::new().await;

    let alice = fixture.register("alice").await;
    let bob = fixture.register("bob").await;
    let category_id = fixture.create_category(&alice, "General").await;
    let topic = fixture
        .create_topic(&alice, &category_id, "Discussion", "Opening post")
        .await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    let category_before = fixture
        .get_json(&format!("/api/categories/{}", category_id))
        .await;

    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    let post = fixture.add_post(&bob, &topic_id, "A reply").await;

    let topic = fixture.get_json(&format!("/api/topics/{}", topic_id)).await;
    assert_eq!(topic["posts_amount"], 2);
    assert_eq!(topic["last_active_user"], bob.as_str());
    assert_eq!(topic["last_updated_date"], post["creation_date"]);

    let category = fixture
        .get_json(&format!("/api/categories/{}", category_id))
        .await;
    assert_eq!(category["last_updated_date"], post["creation_date"]);
    assert_ne!(
        category["last_updated_date"],
        category_before["last_updated_date"]
    );
}

#[tokio::test]
async fn test_post_deletion_keeps_last_active_user() {
    let fixture = TestFixture::new().await;

    let alice = fixture.register("alice").await;
    let bob = fixture.register("bob").await;
    let category_id = fixture.create_category(&alice, "General").await;
    let topic = fixture
        .create_topic(&alice, &category_id, "Discussion", "Opening post")
        .await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    let post = fixture.add_post(&bob, &topic_id, "Bob's reply").await;
    let post_id = post["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/posts/{}", post_id)))
        .header("x-user-id", &bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Known characteristic: the counter shrinks but last_active_user is not
    // recomputed from the remaining posts.
    let topic = fixture.get_json(&format!("/api/topics/{}", topic_id)).await;
    assert_eq!(topic["posts_amount"], 1);
    assert_eq!(topic["last_active_user"], bob.as_str());
}

#[tokio::test]
async fn test_only_author_can_delete_post() {
    let fixture = TestFixture::new().await;

    let alice = fixture.register("alice").await;
    let bob = fixture.register("bob").await;
    let category_id = fixture.create_category(&alice, "General").await;
    let topic = fixture
        .create_topic(&alice, &category_id, "Discussion", "Opening post")
        .await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    let posts = fixture
        .get_json(&format!("/api/topics/{}/posts", topic_id))
        .await;
    let post_id = posts[0]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/posts/{}", post_id)))
        .header("x-user-id", &bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_vote_lifecycle() {
    let fixture = TestFixture::new().await;

    let alice = fixture.register("alice").await;
    let bob = fixture.register("bob").await;
    let category_id = fixture.create_category(&alice, "General").await;
    let topic = fixture
        .create_topic(&alice, &category_id, "Discussion", "Opening post")
        .await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    let posts = fixture
        .get_json(&format!("/api/topics/{}/posts", topic_id))
        .await;
    let post_id = posts[0]["id"].as_str().unwrap().to_string();

    // First upvote creates the ledger row
    let resp = fixture.vote(&bob, &post_id, "up").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["votes"], 1);
    assert_eq!(body["prev_vote"], 0);

    // Same-direction re-vote is rejected
    let resp = fixture.vote(&bob, &post_id, "up").await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "400");

    // Opposite direction removes the row rather than flipping it
    let resp = fixture.vote(&bob, &post_id, "down").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["votes"], 0);
    assert_eq!(body["prev_vote"], 1);

    // With the ledger now empty, a downvote creates a fresh row
    let resp = fixture.vote(&bob, &post_id, "down").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["votes"], -1);
    assert_eq!(body["prev_vote"], 0);

    // Invalid direction behaves like a missing page
    let resp = fixture.vote(&bob, &post_id, "sideways").await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_self_vote_rejected_and_total_unchanged() {
    let fixture = TestFixture::new().await;

    let zoe = fixture.register("zoe").await;
    let xan = fixture.register("xan").await;
    let yve = fixture.register("yve").await;
    let category_id = fixture.create_category(&zoe, "General").await;
    let topic = fixture
        .create_topic(&zoe, &category_id, "Discussion", "Zoe's post")
        .await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    let posts = fixture
        .get_json(&format!("/api/topics/{}/posts", topic_id))
        .await;
    let post_id = posts[0]["id"].as_str().unwrap().to_string();

    assert_eq!(fixture.vote(&xan, &post_id, "up").await.status(), 200);
    assert_eq!(fixture.vote(&yve, &post_id, "up").await.status(), 200);

    // Author's self-vote fails regardless of prior vote state
    let resp = fixture.vote(&zoe, &post_id, "up").await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "You cannot vote for your own posts");
    assert_eq!(body["code"], "400");

    // The total still reflects exactly the two ledger rows
    let posts = fixture
        .get_json_as(&xan, &format!("/api/topics/{}/posts", topic_id))
        .await;
    assert_eq!(posts[0]["votes"], 2);
    assert_eq!(posts[0]["viewer_vote"], 1);
}

#[tokio::test]
async fn test_feed_scenario() {
    let fixture = TestFixture::new().await;

    let a = fixture.register("user_a").await;
    let b = fixture.register("user_b").await;
    let category_id = fixture.create_category(&b, "General").await;
    let topic = fixture
        .create_topic(&b, &category_id, "Watched topic", "Opening post")
        .await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    // A subscribes at t0
    let status = fixture.toggle_subscription(&a, &topic_id).await;
    assert_eq!(status["subscribed"], true);

    // Posts at or before t0 are below the watermark
    let feed = fixture.get_json_as(&a, "/api/feed").await;
    assert_eq!(feed.as_array().unwrap().len(), 0);

    // B posts p1 at t1 > t0
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    let p1 = fixture.add_post(&b, &topic_id, "p1").await;
    let p1_id = p1["id"].as_str().unwrap().to_string();

    let feed = fixture.get_json_as(&a, "/api/feed").await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["id"], p1_id.as_str());

    // A's own posts never show up in A's feed
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    fixture.add_post(&a, &topic_id, "A's own reply").await;
    let feed = fixture.get_json_as(&a, "/api/feed").await;
    assert_eq!(feed.as_array().unwrap().len(), 1);

    // Marking p1 read removes it from the feed
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/posts/{}/read", p1_id)))
        .header("x-user-id", &a)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let feed = fixture.get_json_as(&a, "/api/feed").await;
    assert_eq!(feed.as_array().unwrap().len(), 0);

    // Unsubscribe, then resubscribe at t2 > t1
    let status = fixture.toggle_subscription(&a, &topic_id).await;
    assert_eq!(status["subscribed"], false);
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    let status = fixture.toggle_subscription(&a, &topic_id).await;
    assert_eq!(status["subscribed"], true);

    // p1 predates the new watermark (and its read mark was cascade-deleted)
    let feed = fixture.get_json_as(&a, "/api/feed").await;
    assert_eq!(feed.as_array().unwrap().len(), 0);

    // A post at t3 > t2 flows into the fresh subscription
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    let p2 = fixture.add_post(&b, &topic_id, "p2").await;
    let feed = fixture.get_json_as(&a, "/api/feed").await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["id"], p2["id"]);
}

#[tokio::test]
async fn test_feed_orders_newest_first() {
    let fixture = TestFixture::new().await;

    let a = fixture.register("user_a").await;
    let b = fixture.register("user_b").await;
    let category_id = fixture.create_category(&b, "General").await;
    let topic = fixture
        .create_topic(&b, &category_id, "Watched topic", "Opening post")
        .await;
    let topic_id = topic["id"].as_str().unwrap().to_string();

    fixture.toggle_subscription(&a, &topic_id).await;

    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    let first = fixture.add_post(&b, &topic_id, "older").await;
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    let second = fixture.add_post(&b, &topic_id, "newer").await;

    let feed = fixture.get_json_as(&a, "/api/feed").await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0]["id"], second["id"]);
    assert_eq!(feed[1]["id"], first["id"]);
}

#[tokio::test]
async fn test_read_state_rejects_duplicates() {
    let fixture = TestFixture::new().await;

    let alice = fixture.register("alice").await;
    let bob = fixture.register("bob").await;
    let category_id = fixture.create_category(&bob, "General").await;
    let topic = fixture
        .create_topic(&bob, &category_id, "Topic", "Opening post")
        .await;
    let topic_id = topic["id"].as_str().unwrap().to_string();
    let posts = fixture
        .get_json(&format!("/api/topics/{}/posts", topic_id))
        .await;
    let post_id = posts[0]["id"].as_str().unwrap().to_string();

    // Unread before read fails
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/posts/{}/read", post_id)))
        .header("x-user-id", &alice)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // First read succeeds, second is rejected
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/posts/{}/read", post_id)))
        .header("x-user-id", &alice)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/posts/{}/read", post_id)))
        .header("x-user-id", &alice)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "This post is already marked as read by user");

    // Unread works once, then fails again
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/posts/{}/read", post_id)))
        .header("x-user-id", &alice)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/posts/{}/read", post_id)))
        .header("x-user-id", &alice)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_messaging_flow() {
    let fixture = TestFixture::new().await;

    let alice = fixture.register("alice").await;
    let bob = fixture.register("bob").await;
    let carol = fixture.register("carol").await;

    // Alice writes to Bob
    let resp = fixture
        .client
        .post(fixture.url("/api/messages"))
        .header("x-user-id", &alice)
        .json(&json!({ "receiver_id": bob, "subject": "Hi", "body": "Hello Bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let message: Value = resp.json().await.unwrap();
    let message_id = message["id"].as_str().unwrap().to_string();

    // It shows up unread in Bob's inbox and in Alice's outbox
    let inbox = fixture.get_json_as(&bob, "/api/messages/inbox").await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["is_read"], false);

    let outbox = fixture.get_json_as(&alice, "/api/messages/outbox").await;
    assert_eq!(outbox.as_array().unwrap().len(), 1);

    // Outsiders cannot read it
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/messages/{}", message_id)))
        .header("x-user-id", &carol)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // Bob marks it read; duplicate marks are rejected
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/messages/{}/read", message_id)))
        .header("x-user-id", &bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/messages/{}/read", message_id)))
        .header("x-user-id", &bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let inbox = fixture.get_json_as(&bob, "/api/messages/inbox").await;
    assert_eq!(inbox[0]["is_read"], true);

    // Default subject applies when none is given
    let resp = fixture
        .client
        .post(fixture.url("/api/messages"))
        .header("x-user-id", &alice)
        .json(&json!({ "receiver_id": bob, "body": "No subject here" }))
        .send()
        .await
        .unwrap();
    let no_subject: Value = resp.json().await.unwrap();
    assert_eq!(no_subject["subject"], "(No subject)");
}

#[tokio::test]
async fn test_message_two_stage_delete() {
    let fixture = TestFixture::new().await;

    let alice = fixture.register("alice").await;
    let bob = fixture.register("bob").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/messages"))
        .header("x-user-id", &alice)
        .json(&json!({ "receiver_id": bob, "subject": "Hi", "body": "Hello" }))
        .send()
        .await
        .unwrap();
    let message: Value = resp.json().await.unwrap();
    let message_id = message["id"].as_str().unwrap().to_string();

    let delete_as = |user: String| {
        let client = fixture.client.clone();
        let url = fixture.url(&format!("/api/messages/{}", message_id));
        async move {
            client
                .delete(url)
                .header("x-user-id", user)
                .send()
                .await
                .unwrap()
        }
    };

    // First delete moves it to Bob's bucket
    assert_eq!(delete_as(bob.clone()).await.status(), 200);
    let inbox = fixture.get_json_as(&bob, "/api/messages/inbox").await;
    assert_eq!(inbox.as_array().unwrap().len(), 0);
    let bucket = fixture.get_json_as(&bob, "/api/messages/bucket").await;
    assert_eq!(bucket.as_array().unwrap().len(), 1);

    // Restore brings it back
    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/messages/{}/restore", message_id)))
        .header("x-user-id", &bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let inbox = fixture.get_json_as(&bob, "/api/messages/inbox").await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);

    // Bob deletes twice: bucket, then permanent (gone from his bucket too)
    assert_eq!(delete_as(bob.clone()).await.status(), 200);
    assert_eq!(delete_as(bob.clone()).await.status(), 200);
    let bucket = fixture.get_json_as(&bob, "/api/messages/bucket").await;
    assert_eq!(bucket.as_array().unwrap().len(), 0);

    // Alice still sees it until she also deletes permanently
    let outbox = fixture.get_json_as(&alice, "/api/messages/outbox").await;
    assert_eq!(outbox.as_array().unwrap().len(), 1);

    assert_eq!(delete_as(alice.clone()).await.status(), 200);
    assert_eq!(delete_as(alice.clone()).await.status(), 200);

    // Both sides deleted permanently: the row itself is gone
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/messages/{}", message_id)))
        .header("x-user-id", &alice)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_read_state_tracker_direct() {
    let (repo, _temp_dir) = repo_fixture().await;

    let author = register_direct(&repo, "author").await;
    let reader = register_direct(&repo, "reader").await;
    let category = repo
        .create_category(&crate::models::CreateCategoryRequest {
            name: "General".to_string(),
        })
        .await
        .unwrap();
    let topic = repo
        .create_topic(&category.id, "Topic", &author)
        .await
        .unwrap();
    let post = repo
        .create_post(&topic.id, &author, "The post")
        .await
        .unwrap();

    assert!(!repo.is_post_read(&reader, &post.id).await.unwrap());

    repo.mark_post_read(&reader, &post.id).await.unwrap();
    assert!(repo.is_post_read(&reader, &post.id).await.unwrap());

    // Duplicate marks are rejected, the row count stays at one
    assert!(repo.mark_post_read(&reader, &post.id).await.is_err());
    assert!(repo.is_post_read(&reader, &post.id).await.unwrap());

    repo.mark_post_unread(&reader, &post.id).await.unwrap();
    assert!(!repo.is_post_read(&reader, &post.id).await.unwrap());
    assert!(repo.mark_post_unread(&reader, &post.id).await.is_err());
}

#[tokio::test]
async fn test_concurrent_post_creation_keeps_counter_consistent() {
    let (repo, _temp_dir) = repo_fixture().await;

    let author = register_direct(&repo, "author").await;
    let category = repo
        .create_category(&crate::models::CreateCategoryRequest {
            name: "General".to_string(),
        })
        .await
        .unwrap();
    let topic = repo
        .create_topic(&category.id, "Busy topic", &author)
        .await
        .unwrap();

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let repo = repo.clone();
            let topic_id = topic.id.clone();
            let author = author.clone();
            tokio::spawn(async move {
                repo.create_post(&topic_id, &author, &format!("post {}", i))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let topic = repo.get_topic(&topic.id).await.unwrap().unwrap();
    assert_eq!(topic.posts_amount, 10);

    // The counter matches the live count of rows
    let posts = repo.list_posts(&topic.id, None).await.unwrap();
    assert_eq!(posts.len(), 10);
}

#[tokio::test]
async fn test_concurrent_votes_all_land() {
    let (repo, _temp_dir) = repo_fixture().await;

    let author = register_direct(&repo, "author").await;
    let category = repo
        .create_category(&crate::models::CreateCategoryRequest {
            name: "General".to_string(),
        })
        .await
        .unwrap();
    let topic = repo
        .create_topic(&category.id, "Voted topic", &author)
        .await
        .unwrap();
    let post = repo
        .create_post(&topic.id, &author, "The post")
        .await
        .unwrap();

    let mut voters = Vec::new();
    for i in 0..5 {
        voters.push(register_direct(&repo, &format!("voter{}", i)).await);
    }

    let tasks: Vec<_> = voters
        .into_iter()
        .map(|voter| {
            let repo = repo.clone();
            let post_id = post.id.clone();
            tokio::spawn(async move { repo.cast_vote(&voter, &post_id, VoteDirection::Up).await })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let posts = repo.list_posts(&topic.id, None).await.unwrap();
    assert_eq!(posts[0].votes, 5);
}

#[tokio::test]
async fn test_concurrent_topic_creation_keeps_category_counter() {
    let (repo, _temp_dir) = repo_fixture().await;

    let author = register_direct(&repo, "author").await;
    let category = repo
        .create_category(&crate::models::CreateCategoryRequest {
            name: "General".to_string(),
        })
        .await
        .unwrap();

    let tasks: Vec<_> = (0..6)
        .map(|i| {
            let repo = repo.clone();
            let category_id = category.id.clone();
            let author = author.clone();
            tokio::spawn(async move {
                repo.create_topic(&category_id, &format!("topic {}", i), &author)
                    .await
            })
        })
        .collect();

    let mut created = Vec::new();
    for task in tasks {
        created.push(task.await.unwrap().unwrap());
    }

    // Delete one concurrently-created topic and re-check
    repo.delete_topic(&created[0].id).await.unwrap();

    let category = repo.get_category(&category.id).await.unwrap().unwrap();
    assert_eq!(category.topics_amount, 5);

    let topics = repo.list_topics(&category.id).await.unwrap();
    assert_eq!(topics.len(), 5);
}
