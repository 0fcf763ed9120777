//! Integration tests for the HTTP identity provider using a wiremock server

use serde_json::json;
use taskdeck_shared::identity::http::{HttpIdentityConfig, HttpIdentityProvider};
use taskdeck_shared::identity::{IdentityProvider, Session};
use taskdeck_shared::IdentityError;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn provider_for(server: &MockServer) -> HttpIdentityProvider {
    HttpIdentityProvider::new(HttpIdentityConfig {
        base_url: format!("{}/auth/v1", server.uri()).parse().unwrap(),
        api_key: "anon-key".to_string(),
        oauth_provider: "github".to_string(),
        timeout_seconds: 5,
    })
    .unwrap()
}

fn session() -> Session {
    Session {
        access_token: "access-123".to_string(),
        refresh_token: None,
        expires_in: None,
        token_type: "bearer".to_string(),
    }
}

#[tokio::test]
async fn test_exchange_code_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "pkce"))
        .and(header("apikey", "anon-key"))
        .and(body_json(json!({ "auth_code": "code-1", "code_verifier": "verifier-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-123",
            "refresh_token": "refresh-456",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": { "id": "u1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = provider_for(&server)
        .exchange_authorization_code("code-1", Some("verifier-1"))
        .await
        .unwrap();

    assert_eq!(session.access_token, "access-123");
    assert_eq!(session.refresh_token.as_deref(), Some("refresh-456"));
    assert_eq!(session.expires_in, Some(3600));
}

#[tokio::test]
async fn test_exchange_code_without_verifier_omits_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(body_json(json!({ "auth_code": "code-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-abc"
        })))
        .mount(&server)
        .await;

    let session = provider_for(&server)
        .exchange_authorization_code("code-2", None)
        .await
        .unwrap();

    assert_eq!(session.access_token, "access-abc");
    assert_eq!(session.token_type, "bearer");
    assert!(session.refresh_token.is_none());
}

#[tokio::test]
async fn test_exchange_code_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "code expired"
        })))
        .mount(&server)
        .await;

    let result = provider_for(&server)
        .exchange_authorization_code("stale", None)
        .await;

    assert!(matches!(result, Err(IdentityError::Rejected(400))));
}

#[tokio::test]
async fn test_current_identity_reads_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer access-123"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u1",
            "email": "a@b.com",
            "user_metadata": {
                "full_name": "Ada Lovelace",
                "avatar_url": "https://img.example.com/ada.png"
            }
        })))
        .mount(&server)
        .await;

    let identity = provider_for(&server)
        .current_identity(&session())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(identity.id, "u1");
    assert_eq!(identity.email, "a@b.com");
    assert_eq!(identity.display_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(
        identity.avatar_url.as_deref(),
        Some("https://img.example.com/ada.png")
    );
}

#[tokio::test]
async fn test_current_identity_unauthorized_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let identity = provider_for(&server)
        .current_identity(&session())
        .await
        .unwrap();

    assert!(identity.is_none());
}

#[tokio::test]
async fn test_current_identity_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = provider_for(&server).current_identity(&session()).await;

    assert!(matches!(result, Err(IdentityError::Rejected(503))));
}

#[tokio::test]
async fn test_current_identity_without_email() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "u9" })))
        .mount(&server)
        .await;

    let result = provider_for(&server).current_identity(&session()).await;

    assert!(matches!(result, Err(IdentityError::MissingEmail)));
}
