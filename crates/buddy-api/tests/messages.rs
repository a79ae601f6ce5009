mod common;

use axum::http::StatusCode;
use buddy_api::notifications::notify_unread_messages;
use buddy_types::models::Role;
use common::{TestApp, get, message, request};

#[tokio::test]
async fn buddy_and_comer_exchange_messages() {
    let app = TestApp::new();
    app.active_buddy("bob");
    app.comer("anna");
    let buddy = app.login("bob").await;
    let comer = app.login("anna").await;

    let (status, _) = app
        .send(request("POST", "/messages", Some(&buddy), Some(message("anna", "  Hi Anna!  "))))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(request("POST", "/messages", Some(&comer), Some(message("bob", "Hello Bob"))))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(get("/messages?filter%5Bwith%5D=bob", Some(&comer)))
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);

    // Newest first; bodies are trimmed.
    assert_eq!(data[0]["attributes"]["body"], "Hello Bob");
    assert_eq!(data[0]["relationships"]["sender"]["data"]["id"], "anna");
    assert_eq!(data[1]["attributes"]["body"], "Hi Anna!");
    assert_eq!(data[1]["relationships"]["receiver"]["data"]["id"], "anna");
    assert_eq!(data[1]["attributes"]["isRead"], false);

    // The same conversation from the other side.
    let (_, other) = app
        .send(get("/messages?filter%5Bwith%5D=anna", Some(&buddy)))
        .await;
    assert_eq!(other, body);
}

#[tokio::test]
async fn conversation_excludes_third_parties() {
    let app = TestApp::new();
    app.active_buddy("bob");
    app.comer("anna");
    app.comer("carl");
    let buddy = app.login("bob").await;

    for receiver in ["anna", "carl"] {
        let (status, _) = app
            .send(request("POST", "/messages", Some(&buddy), Some(message(receiver, "hi"))))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let carl = app.login("carl").await;
    let (_, body) = app
        .send(get("/messages?filter%5Bwith%5D=anna", Some(&carl)))
        .await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = app
        .send(get("/messages?filter%5Bwith%5D=bob", Some(&carl)))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn ineligible_pairs_are_not_found() {
    let app = TestApp::new();
    app.active_buddy("bob");
    app.user("idle", Role::Buddy, true);
    app.comer("anna");
    app.comer("carl");
    app.user("pending", Role::Comer, false);
    let comer = app.login("anna").await;

    // Comer to comer, comer to an inactive buddy, unknown and unverified receivers.
    for receiver in ["carl", "idle", "ghost"] {
        let (status, _) = app
            .send(request("POST", "/messages", Some(&comer), Some(message(receiver, "hi"))))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{receiver}");
    }

    let buddy = app.login("bob").await;
    let (status, _) = app
        .send(request("POST", "/messages", Some(&buddy), Some(message("pending", "hi"))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sender_must_be_allowed_to_write() {
    let app = TestApp::new();
    app.user("idle", Role::Buddy, true);
    app.comer("anna");

    let inactive = app.login("idle").await;
    let (status, _) = app
        .send(request("POST", "/messages", Some(&inactive), Some(message("anna", "hi"))))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(request("POST", "/messages", None, Some(message("anna", "hi"))))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn invalid_messages_are_rejected() {
    let app = TestApp::new();
    app.comer("anna");
    let comer = app.login("anna").await;

    let (status, body) = app
        .send(request("POST", "/messages", Some(&comer), Some(message("anna", "hi"))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"][0]["source"]["pointer"],
        "/data/relationships/receiver/data/id"
    );

    let (status, _) = app
        .send(request("POST", "/messages", Some(&comer), Some(message("bob", "   "))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send(get("/messages", Some(&comer))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(get("/messages?filter%5Bwith%5D=bob", None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn notification_job_mails_each_direction_once() {
    let app = TestApp::new();
    app.active_buddy("bob");
    app.comer("anna");
    app.comer("carl");
    let buddy = app.login("bob").await;
    let anna = app.login("anna").await;

    for (token, receiver, body) in [
        (&buddy, "anna", "first"),
        (&buddy, "anna", "second"),
        (&anna, "bob", "reply"),
        (&buddy, "carl", "hello carl"),
    ] {
        let (status, _) = app
            .send(request("POST", "/messages", Some(token), Some(message(receiver, body))))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let sent = notify_unread_messages(&app.state).await.unwrap();
    assert_eq!(sent, 3);
    {
        let notifications = app.mailer.notifications.lock().unwrap();
        let to_anna = notifications
            .iter()
            .find(|g| g.receiver == "anna")
            .unwrap();
        assert_eq!(to_anna.sender, "bob");
        assert_eq!(to_anna.receiver_email, "anna@example.com");
        let bodies: Vec<&str> = to_anna.messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    // Everything is marked; a second run finds nothing.
    assert_eq!(notify_unread_messages(&app.state).await.unwrap(), 0);
    assert_eq!(app.mailer.notifications.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn failed_notifications_are_retried() {
    let app = TestApp::new();
    app.active_buddy("bob");
    app.comer("anna");
    app.comer("carl");
    let buddy = app.login("bob").await;

    for receiver in ["anna", "carl"] {
        let (status, _) = app
            .send(request("POST", "/messages", Some(&buddy), Some(message(receiver, "hi"))))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    app.mailer.failing.lock().unwrap().push("carl".to_string());
    assert_eq!(notify_unread_messages(&app.state).await.unwrap(), 1);

    app.mailer.failing.lock().unwrap().clear();
    assert_eq!(notify_unread_messages(&app.state).await.unwrap(), 1);

    let notifications = app.mailer.notifications.lock().unwrap();
    let receivers: Vec<&str> = notifications.iter().map(|g| g.receiver.as_str()).collect();
    assert_eq!(receivers, vec!["anna", "carl"]);
}
