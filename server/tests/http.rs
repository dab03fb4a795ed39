mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt as _;

use devhub::routes::routes;
use devhub::validation::{EMAIL_INVALID, PASSWORDS_NOT_MATCHING};

fn app() -> Router {
    routes(common::strict_state())
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, token);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

fn registration(email: &str, first: &str, last: &str) -> Value {
    json!({
        "firstName": first,
        "lastName": last,
        "email": email,
        "password": "password1",
        "confirmPassword": "password1",
    })
}

async fn register_and_login(app: &Router, email: &str, first: &str, last: &str) -> String {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(registration(email, first, last)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loggedIn"], json!(true));

    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = app();

    let token = register_and_login(&app, "a@x.com", "Ada", "Lovelace").await;
    assert!(token.starts_with("Bearer "));

    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], json!("a@x.com"));
    assert_eq!(body["firstName"], json!("Ada"));
    assert!(body.get("passwordHash").is_none());
    assert!(body["profile"].is_null());
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], json!(401));
    assert!(body["message"].is_string());

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/auth/me",
        Some("Bearer not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validation_reports_every_problem() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "not-an-email",
            "password": "password1",
            "confirmPassword": "password2",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], json!(400));
    let errors: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(errors.contains(&EMAIL_INVALID));
    assert!(errors.contains(&PASSWORDS_NOT_MATCHING));
}

#[tokio::test]
async fn test_duplicate_registration_is_forbidden() {
    let app = app();
    register_and_login(&app, "a@x.com", "Ada", "Lovelace").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(registration("a@x.com", "Other", "Person")),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], json!("This email is already in use."));
}

#[tokio::test]
async fn test_wrong_password_is_unprocessable() {
    let app = app();
    register_and_login(&app, "a@x.com", "Ada", "Lovelace").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "a@x.com", "password": "password2" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["status"], json!(422));
}

#[tokio::test]
async fn test_profile_follow_flow() {
    let app = app();
    let ada = register_and_login(&app, "a@x.com", "Ada", "Lovelace").await;
    let bob = register_and_login(&app, "b@x.com", "Bob", "Babbage").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/profile",
        Some(&ada),
        Some(json!({ "website": "https://ada.dev", "biography": "Notes on the engine." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["handle"], json!("ada-lovelace"));
    assert_eq!(body["profile"]["website"], json!("https://ada.dev"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/profile/follow/ada-lovelace",
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["following"], json!(true));
    assert_eq!(body["profile"]["followers"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/api/profile/ada-lovelace", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["firstName"], json!("Ada"));
    assert_eq!(body["profile"]["followers"].as_array().unwrap().len(), 1);

    // Self-follow is refused outside test mode
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/profile/follow/ada-lovelace",
        Some(&ada),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_profile_link_is_rejected() {
    let app = app();
    let ada = register_and_login(&app, "a@x.com", "Ada", "Lovelace").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/profile",
        Some(&ada),
        Some(json!({ "github": "https://gitlab.com/ada" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"],
        json!(["The provided GitHub URL is not valid."])
    );
}

#[tokio::test]
async fn test_unknown_profile_and_route() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/profile/ghost", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], json!(404));

    let (status, body) = send(&app, Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], json!("This route does not exist."));
}

#[tokio::test]
async fn test_delete_account_invalidates_token() {
    let app = app();
    let ada = register_and_login(&app, "a@x.com", "Ada", "Lovelace").await;

    let (status, body) = send(&app, Method::DELETE, "/api/auth", Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], json!(true));

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&ada), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
