//! The whole flow chained end to end: authorize, callback, token, userinfo.

use actix_web::http::StatusCode;
use actix_web::test;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use takagi::models::responses::TokenResponse;

use crate::mock_github::MockGitHub;
use crate::test_helpers::*;

#[actix_web::test]
async fn the_four_phases_chain_into_working_claims() {
    let mock = MockGitHub::start().await;
    let state = TestState::with_mock_github(&mock.base_url);
    let app = takagi_app!(state);

    // Phase A: the relying party starts the flow.
    let res = test::call_service(
        &app,
        https_get(
            "/authorize?client_id=abc&scope=openid%20profile%20email\
             &redirect_uri=https%3A%2F%2Frp.example%2Fcb&state=xyz&nonce=n-42",
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let github_url = location(&res);
    let state_jwt = query_value(&github_url, "state").unwrap();

    // Phase B: GitHub sends the browser back with a code.
    let res = test::call_service(
        &app,
        https_get(&format!(
            "/r/https://rp.example/cb?code=ghcode&state={}",
            state_jwt
        ))
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let rp_url = location(&res);
    assert!(rp_url.starts_with("https://rp.example/cb?"));
    assert_eq!(query_value(&rp_url, "state").as_deref(), Some("xyz"));
    let code_jwt = query_value(&rp_url, "code").unwrap();

    // Phase C: the relying party exchanges the code on the back channel.
    let res = test::call_service(
        &app,
        https_post("/token")
            .insert_header((
                "Authorization",
                format!("Basic {}", STANDARD.encode("abc:secret")),
            ))
            .set_form([
                ("grant_type", "authorization_code"),
                ("code", code_jwt.as_str()),
                (
                    "redirect_uri",
                    format!("{}/r/https://rp.example/cb", BASE_URL).as_str(),
                ),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let tokens: TokenResponse = test::read_body_json(res).await;

    let id_claims = state
        .codec
        .verify(
            &tokens.id_token,
            &takagi::services::token_codec::ClaimExpectations {
                iss: Some(format!("{}/", BASE_URL)),
                aud: Some("abc".to_string()),
            },
        )
        .unwrap();
    assert_eq!(id_claims["sub"], "1234");
    assert_eq!(id_claims["nonce"], "n-42");
    assert_eq!(id_claims["email"], "octocat@github.com");

    // Phase D: the access token drives the UserInfo endpoint.
    let res = test::call_service(
        &app,
        https_get("/userinfo")
            .insert_header(("Authorization", format!("Bearer {}", tokens.access_token)))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let claims: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(claims["sub"], "1234");
    assert_eq!(claims["preferred_username"], "octocat");
}

/// A code envelope replayed against a different deployment's userinfo URL
/// breaks the chain: its signature belongs to another key.
#[actix_web::test]
async fn tokens_from_another_key_do_not_chain() {
    let state = TestState::new();
    let app = takagi_app!(state);

    // A second deployment with its own keys.
    let other_keyset = takagi::services::keys::KeySet::generate().unwrap();
    let other_keys =
        takagi::services::keys::KeyMaterial::from_keyset(&other_keyset).unwrap();
    let other_codec =
        takagi::services::token_codec::TokenCodec::new(std::sync::Arc::new(other_keys));

    let envelope = takagi::models::envelopes::AuthorizationEnvelope::new(
        "ghcode".to_string(),
        Some(format!("{}/r/https://rp.example/cb", BASE_URL)),
        None,
        vec!["openid".to_string()],
    );
    let foreign_code =
        takagi::models::envelopes::encode(&other_codec, &envelope).unwrap();

    let res = test::call_service(
        &app,
        https_post("/token")
            .insert_header((
                "Authorization",
                format!("Basic {}", STANDARD.encode("abc:secret")),
            ))
            .set_form([
                ("grant_type", "authorization_code"),
                ("code", foreign_code.as_str()),
                (
                    "redirect_uri",
                    format!("{}/r/https://rp.example/cb", BASE_URL).as_str(),
                ),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
