mod common;

use axum::http::StatusCode;

use common::{TestApp, assert_redirect, body_json};
use warbler_types::api::{ErrorResponse, MessageResponse};

fn seed_message(app: &TestApp) -> String {
    app.db()
        .insert_message(&app.user.id, "testmessage")
        .unwrap()
        .id
}

#[tokio::test]
async fn test_add_message() {
    let app = TestApp::new();
    seed_message(&app);
    let cookie = app.cookie_for(&app.user);

    let resp = app.post_form("/messages/new", "text=Hello", Some(&cookie)).await;
    assert_redirect(&resp, &format!("/users/{}", app.user.id));

    let msgs = app.db().messages_for_user(&app.user.id).unwrap();
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[1].text, "Hello");
}

#[tokio::test]
async fn test_add_message_rejects_invalid_text() {
    let app = TestApp::new();
    let cookie = app.cookie_for(&app.user);

    let resp = app.post_form("/messages/new", "text=", Some(&cookie)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: ErrorResponse = body_json(resp).await;
    assert_eq!(err.error, "text is required");

    let long = "x".repeat(141);
    let resp = app
        .post_form("/messages/new", &format!("text={long}"), Some(&cookie))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.db().message_count(&app.user.id).unwrap(), 0);
}

#[tokio::test]
async fn test_delete_message() {
    let app = TestApp::new();
    let message_id = seed_message(&app);
    let cookie = app.cookie_for(&app.user);

    let resp = app
        .post_form(&format!("/messages/{message_id}/delete"), "", Some(&cookie))
        .await;
    assert_redirect(&resp, &format!("/users/{}", app.user.id));

    assert_eq!(app.db().message_count(&app.user.id).unwrap(), 0);
    assert!(app.db().get_message(&message_id).unwrap().is_none());
}

#[tokio::test]
async fn test_logout_add_message() {
    let app = TestApp::new();
    seed_message(&app);

    let resp = app.post_form("/messages/new", "text=Hello", None).await;
    assert_redirect(&resp, "/");

    let msgs = app.db().messages_for_user(&app.user.id).unwrap();
    assert_eq!(msgs.len(), 1);
    assert_ne!(msgs[0].text, "Hello");
}

#[tokio::test]
async fn test_forged_session_add_message() {
    let app = TestApp::new();
    seed_message(&app);

    let resp = app
        .post_form(
            "/messages/new",
            "text=Hello",
            Some("warbler_session=not-a-real-token"),
        )
        .await;
    assert_redirect(&resp, "/");
    assert_eq!(app.db().message_count(&app.user.id).unwrap(), 1);
}

#[tokio::test]
async fn test_logout_delete_message() {
    let app = TestApp::new();
    let message_id = seed_message(&app);

    let resp = app
        .post_form(&format!("/messages/{message_id}/delete"), "", None)
        .await;
    assert_redirect(&resp, "/");

    assert!(app.db().get_message(&message_id).unwrap().is_some());
}

#[tokio::test]
async fn test_delete_other_users_message() {
    let app = TestApp::new();
    let message_id = seed_message(&app);
    let cookie = app.cookie_for(&app.user2);

    let resp = app
        .post_form(&format!("/messages/{message_id}/delete"), "", Some(&cookie))
        .await;
    assert_redirect(&resp, "/");

    assert!(app.db().get_message(&message_id).unwrap().is_some());
}

#[tokio::test]
async fn test_delete_missing_message() {
    let app = TestApp::new();
    let cookie = app.cookie_for(&app.user);

    let resp = app
        .post_form(
            "/messages/00000000-0000-0000-0000-000000000000/delete",
            "",
            Some(&cookie),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_of_deleted_user_cannot_post() {
    let app = TestApp::new();
    let cookie = app.cookie_for(&app.user2);
    app.db().delete_user(&app.user2.id).unwrap();

    let resp = app.post_form("/messages/new", "text=ghost", Some(&cookie)).await;
    assert_redirect(&resp, "/");
    assert!(common::session_set_cookie(&resp).is_some());
}

#[tokio::test]
async fn test_show_message() {
    let app = TestApp::new();
    let message_id = seed_message(&app);

    let resp = app.get(&format!("/messages/{message_id}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let message: MessageResponse = body_json(resp).await;
    assert_eq!(message.text, "testmessage");
    assert_eq!(message.author_username, "testuser");
    assert_eq!(message.user_id.to_string(), app.user.id);
    assert!(!message.liked);

    let resp = app
        .get("/messages/00000000-0000-0000-0000-000000000000", None)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_like_toggles() {
    let app = TestApp::new();
    let message_id = seed_message(&app);
    let cookie = app.cookie_for(&app.user2);

    let resp = app
        .post_form(&format!("/messages/{message_id}/like"), "", Some(&cookie))
        .await;
    assert_redirect(&resp, "/");

    let liked = app.db().liked_messages(&app.user2.id).unwrap();
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0].id, message_id);

    let resp = app.get(&format!("/messages/{message_id}"), Some(&cookie)).await;
    let message: MessageResponse = body_json(resp).await;
    assert!(message.liked);

    app.post_form(&format!("/messages/{message_id}/like"), "", Some(&cookie))
        .await;
    assert!(app.db().liked_messages(&app.user2.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_cannot_like_own_message() {
    let app = TestApp::new();
    let message_id = seed_message(&app);
    let cookie = app.cookie_for(&app.user);

    let resp = app
        .post_form(&format!("/messages/{message_id}/like"), "", Some(&cookie))
        .await;
    assert_redirect(&resp, "/");
    assert_eq!(app.db().like_count(&app.user.id).unwrap(), 0);
}

#[tokio::test]
async fn test_logout_like_message() {
    let app = TestApp::new();
    let message_id = seed_message(&app);

    let resp = app
        .post_form(&format!("/messages/{message_id}/like"), "", None)
        .await;
    assert_redirect(&resp, "/");
    assert!(app.db().likers(&message_id).unwrap().is_empty());
}
