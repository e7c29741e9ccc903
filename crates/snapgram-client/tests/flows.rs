//! End-to-end flows through the public client API against the in-memory
//! remote.

use std::sync::Arc;

use serde_json::json;

use snapgram_client::query::QueryStatus;
use snapgram_client::views::{PostForm, SignupForm};
use snapgram_client::{AppContext, MemoryRemote, SessionState};
use snapgram_shared::models::{FileUpload, NewPost, Post, User};
use snapgram_shared::types::UserId;
use snapgram_shared::{Fields, ServiceConfig};
use snapgram_store::Database;

fn context() -> (AppContext, Arc<MemoryRemote>) {
    let remote = Arc::new(MemoryRemote::new());
    let ctx = AppContext::new(
        remote.clone(),
        ServiceConfig::default(),
        Database::open_in_memory().unwrap(),
    );
    (ctx, remote)
}

fn photo() -> FileUpload {
    FileUpload::new("photo.png", "image/png", vec![0x89, b'P', b'N', b'G'])
}

fn seed_user(remote: &MemoryRemote, id: &str) -> User {
    let mut data = Fields::new();
    data.insert("accountId".into(), json!(format!("acc-{id}")));
    data.insert("name".into(), json!(id));
    data.insert("username".into(), json!(id));
    data.insert("email".into(), json!(format!("{id}@x.com")));
    data.insert("imageUrl".into(), json!("memory://avatars/initials/X"));
    data.insert("followers".into(), json!([]));
    data.insert("following".into(), json!([]));
    let doc = remote.insert_document("users", id, data);
    User::try_from(&doc).unwrap()
}

async fn seed_post(ctx: &AppContext, creator: &UserId, caption: &str) -> Post {
    ctx.api()
        .create_post(NewPost {
            user_id: creator.clone(),
            caption: caption.to_string(),
            file: photo(),
            location: None,
            tags: String::new(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn sign_up_sign_in_and_restore() {
    let (ctx, _remote) = context();
    let outcome = ctx.init().await.unwrap();
    assert!(outcome.redirect_to_sign_in);
    assert!(!outcome.authenticated);

    let form = SignupForm {
        name: "Ann".into(),
        username: "ann1".into(),
        email: "ann@x.com".into(),
        password: "secret1".into(),
    };
    let profile = form.submit(&ctx).await.unwrap();
    assert_eq!(profile.username, "ann1");
    assert!(ctx.session().is_authenticated().await);

    // A fresh start with the stored marker skips the sign-in redirect.
    ctx.teardown().await;
    assert_eq!(ctx.session().state().await, SessionState::Unauthenticated);
    let outcome = ctx.init().await.unwrap();
    assert!(!outcome.redirect_to_sign_in);
    assert!(outcome.authenticated);
    assert_eq!(ctx.session().user().await.unwrap().email, "ann@x.com");

    ctx.session().sign_out().await.unwrap();
    assert!(!ctx.session().is_authenticated().await);
    assert!(ctx.cache().keys().await.is_empty());
}

#[tokio::test]
async fn created_post_shows_up_in_feed() {
    let (ctx, remote) = context();
    let ann = seed_user(&remote, "ann");

    let feed = ctx.queries().recent_posts().await;
    assert_eq!(feed.status, QueryStatus::Success);
    assert!(feed.data.unwrap().is_empty());

    let form = PostForm {
        caption: "harbour at dawn".into(),
        file: Some(photo()),
        tags: "sea, dawn".into(),
        ..PostForm::create(&ann.id)
    };
    let post = form.submit(&ctx).await.unwrap();

    let feed = ctx.queries().recent_posts().await;
    let posts = feed.data.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, post.id);
    assert_eq!(posts[0].tags, vec!["sea", "dawn"]);
}

#[tokio::test]
async fn whole_array_likes_lose_a_concurrent_update() {
    let (ctx, remote) = context();
    let ann = seed_user(&remote, "ann");
    let bob = seed_user(&remote, "bob");
    let cat = seed_user(&remote, "cat");
    let post = seed_post(&ctx, &ann.id, "busy").await;

    // Both clients start from the same (empty) likes list.
    let api = ctx.api();
    let (a, b) = tokio::join!(
        api.set_post_likes(&post.id, vec![bob.id.clone()]),
        api.set_post_likes(&post.id, vec![cat.id.clone()]),
    );
    a.unwrap();
    b.unwrap();

    let stored = api.get_post_by_id(&post.id).await.unwrap();
    assert_eq!(stored.likes.len(), 1);
}

#[tokio::test]
async fn versioned_likes_keep_concurrent_updates() {
    let (ctx, remote) = context();
    let ann = seed_user(&remote, "ann");
    let bob = seed_user(&remote, "bob");
    let cat = seed_user(&remote, "cat");
    let post = seed_post(&ctx, &ann.id, "busy").await;

    let queries = ctx.queries();
    let (a, b) = tokio::join!(
        queries.like_post(&post.id, &bob.id),
        queries.like_post(&post.id, &cat.id),
    );
    a.unwrap();
    b.unwrap();

    let stored = ctx.api().get_post_by_id(&post.id).await.unwrap();
    assert_eq!(stored.likes.len(), 2);
    assert!(stored.is_liked_by(&bob.id));
    assert!(stored.is_liked_by(&cat.id));
}

#[tokio::test]
async fn feed_pages_until_exhausted() {
    let (ctx, remote) = context();
    let ann = seed_user(&remote, "ann");
    for n in 0..20 {
        seed_post(&ctx, &ann.id, &format!("post {n}")).await;
    }

    let queries = ctx.queries();
    let first = queries.infinite_posts().await.data.unwrap();
    assert_eq!(first.len(), 9);
    assert!(first.has_next_page);

    let mut pages = 1;
    loop {
        let state = queries.next_posts_page().await;
        let data = state.data.unwrap();
        if !data.has_next_page {
            assert_eq!(data.len(), 20);
            break;
        }
        pages += 1;
        assert!(pages <= 3, "pagination did not terminate");
    }
    assert_eq!(pages, 3);

    // Exhausted listings do not fetch again.
    remote.clear_calls();
    let state = queries.next_posts_page().await;
    assert_eq!(state.data.unwrap().len(), 20);
    assert_eq!(remote.call_count(), 0);

    // Every post appears exactly once across the pages.
    let all = queries.infinite_posts().await.data.unwrap();
    let mut ids: Vec<_> = all.items().map(|p| p.id.clone()).collect();
    ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn marker_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapgram.db");
    let remote = Arc::new(MemoryRemote::new());

    let first = AppContext::new(
        remote.clone(),
        ServiceConfig::default(),
        Database::open_at(&path).unwrap(),
    );
    let form = SignupForm {
        name: "Ann".into(),
        username: "ann1".into(),
        email: "ann@x.com".into(),
        password: "secret1".into(),
    };
    form.submit(&first).await.unwrap();
    first.teardown().await;
    drop(first);

    let second = AppContext::new(
        remote,
        ServiceConfig::default(),
        Database::open_at(&path).unwrap(),
    );
    let outcome = second.init().await.unwrap();
    assert!(!outcome.redirect_to_sign_in);
    assert!(outcome.authenticated);
    assert_eq!(second.session().user().await.unwrap().username, "ann1");
}
