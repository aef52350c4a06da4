//! UserInfo endpoint scenarios, chained from a real token exchange.

use actix_web::http::StatusCode;
use actix_web::test;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;

use takagi::models::envelopes::{self, AccessTokenEnvelope, AuthorizationEnvelope};
use takagi::models::responses::TokenResponse;

use crate::mock_github::MockGitHub;
use crate::test_helpers::*;

/// Run the `/token` leg and return the minted pair.
async fn obtain_tokens(state: &TestState, scopes: &[&str]) -> TokenResponse {
    let app = takagi_app!(state);

    let envelope = AuthorizationEnvelope::new(
        "ghcode".to_string(),
        Some(format!("{}/r/https://rp.example/cb", BASE_URL)),
        None,
        scopes.iter().map(|s| s.to_string()).collect(),
    );
    let code = envelopes::encode(&state.codec, &envelope).unwrap();

    let req = https_post("/token")
        .insert_header((
            "Authorization",
            format!("Basic {}", STANDARD.encode("abc:secret")),
        ))
        .set_form([
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            (
                "redirect_uri",
                format!("{}/r/https://rp.example/cb", BASE_URL).as_str(),
            ),
        ])
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    test::read_body_json(res).await
}

#[actix_web::test]
async fn userinfo_returns_fresh_identity_claims() {
    let mock = MockGitHub::start().await;
    let state = TestState::with_mock_github(&mock.base_url);
    let tokens = obtain_tokens(&state, &["openid", "profile", "email", "groups"]).await;

    let app = takagi_app!(state);
    let req = https_get("/userinfo")
        .insert_header(("Authorization", format!("Bearer {}", tokens.access_token)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let claims: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(claims["sub"], "1234");
    assert_eq!(claims["preferred_username"], "octocat");
    assert_eq!(claims["name"], "The Octocat");
    assert_eq!(claims["email"], "octocat@github.com");
    assert_eq!(claims["email_verified"], true);
    assert_eq!(claims["groups"], serde_json::json!(["9876"]));
    // No client is authenticated here, so no audience is minted.
    assert!(claims.get("aud").is_none());
    assert!(claims.get("nonce").is_none());
}

#[actix_web::test]
async fn userinfo_accepts_post() {
    let mock = MockGitHub::start().await;
    let state = TestState::with_mock_github(&mock.base_url);
    let tokens = obtain_tokens(&state, &["openid"]).await;

    let app = takagi_app!(state);
    let req = https_post("/userinfo")
        .insert_header(("Authorization", format!("Bearer {}", tokens.access_token)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);

    let claims: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(claims["sub"], "1234");
}

#[actix_web::test]
async fn missing_bearer_token_is_unauthorized_with_empty_body() {
    let state = TestState::new();
    let app = takagi_app!(state);

    let res = test::call_service(&app, https_get("/userinfo").to_request()).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = test::read_body(res).await;
    assert!(body.is_empty());
}

#[actix_web::test]
async fn garbage_bearer_token_is_unauthorized() {
    let state = TestState::new();
    let app = takagi_app!(state);

    let req = https_get("/userinfo")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn token_for_another_audience_is_unauthorized() {
    let state = TestState::new();
    let app = takagi_app!(state);

    let now = Utc::now().timestamp();
    let envelope = AccessTokenEnvelope::new(
        format!("{}/", BASE_URL),
        "https://other.example/userinfo".to_string(),
        now,
        now + 3600,
        state.codec.encrypt(b"{}").unwrap(),
    );
    let token = envelopes::encode(&state.codec, &envelope).unwrap();

    let req = https_get("/userinfo")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn expired_access_token_is_unauthorized() {
    let mock = MockGitHub::start().await;
    let state = TestState::with_mock_github(&mock.base_url);

    let now = Utc::now().timestamp();
    let envelope = AccessTokenEnvelope::new(
        format!("{}/", BASE_URL),
        format!("{}/userinfo", BASE_URL),
        now - 7200,
        now - 3600,
        state.codec.encrypt(b"{}").unwrap(),
    );
    let token = envelopes::encode(&state.codec, &envelope).unwrap();

    let app = takagi_app!(state);
    let req = https_get("/userinfo")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
