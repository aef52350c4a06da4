//! Discovery, WebFinger, JWKS, and housekeeping endpoints.

use actix_web::http::StatusCode;
use actix_web::test;

use takagi::config::RootRedirect;
use takagi::services::webfinger::DnsName;

use crate::test_helpers::*;

#[actix_web::test]
async fn discovery_document_derives_from_the_request() {
    let state = TestState::new();
    let app = takagi_app!(state);

    let res = test::call_service(
        &app,
        https_get("/.well-known/openid-configuration").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let doc: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(doc["issuer"], format!("{}/", BASE_URL));
    assert_eq!(
        doc["authorization_endpoint"],
        format!("{}/authorize", BASE_URL)
    );
    assert_eq!(doc["token_endpoint"], format!("{}/token", BASE_URL));
    assert_eq!(doc["userinfo_endpoint"], format!("{}/userinfo", BASE_URL));
    assert_eq!(
        doc["jwks_uri"],
        format!("{}/.well-known/jwks.json", BASE_URL)
    );
    assert_eq!(doc["grant_types_supported"], serde_json::json!(["authorization_code"]));
    assert_eq!(
        doc["id_token_signing_alg_values_supported"],
        serde_json::json!(["RS256"])
    );
    assert!(doc.get("revocation_endpoint").is_none());
    assert!(doc.get("introspection_endpoint").is_none());
}

#[actix_web::test]
async fn jwks_publishes_only_the_public_signing_key() {
    let state = TestState::new();
    let app = takagi_app!(state);

    let res = test::call_service(&app, https_get("/.well-known/jwks.json").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);

    let jwks: serde_json::Value = test::read_body_json(res).await;
    let keys = jwks["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0]["kty"], "RSA");
    assert_eq!(keys[0]["use"], "sig");
    assert_eq!(keys[0]["alg"], "RS256");
    assert_eq!(keys[0]["kid"], state.keys.signing_kid());
    assert!(keys[0].get("d").is_none());
    assert!(keys[0].get("p").is_none());
}

#[actix_web::test]
async fn webfinger_resolves_hosts_under_an_allowed_wildcard() {
    let mut settings = test_settings();
    settings.allowed_webfinger_hosts = vec![DnsName::parse("*.example.com").unwrap()];
    let state = TestState::with_settings(settings);
    let app = takagi_app!(state);

    let res = test::call_service(
        &app,
        https_get(
            "/.well-known/webfinger?resource=acct%3Aalice%40dept.example.com\
             &rel=http%3A%2F%2Fopenid.net%2Fspecs%2Fconnect%2F1.0%2Fissuer",
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(res).await;
    assert_eq!(body["subject"], "acct:alice@dept.example.com");
    let links = body["links"].as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0]["rel"],
        "http://openid.net/specs/connect/1.0/issuer"
    );
    assert_eq!(links[0]["href"], format!("{}/", BASE_URL));
}

#[actix_web::test]
async fn webfinger_rejects_hosts_outside_the_allow_list() {
    let state = TestState::new();
    let app = takagi_app!(state);

    let res = test::call_service(
        &app,
        https_get("/.well-known/webfinger?resource=acct%3Aalice%40dept.example.com")
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn webfinger_with_another_relation_returns_no_links() {
    let mut settings = test_settings();
    settings.allowed_webfinger_hosts = vec![DnsName::parse("example.com").unwrap()];
    let state = TestState::with_settings(settings);
    let app = takagi_app!(state);

    let res = test::call_service(
        &app,
        https_get(
            "/.well-known/webfinger?resource=acct%3Aalice%40example.com&rel=something-else",
        )
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(res).await;
    assert!(body["links"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn webfinger_rejects_malformed_resources() {
    let state = TestState::new();
    let app = takagi_app!(state);

    let res = test::call_service(
        &app,
        https_get("/.well-known/webfinger?resource=alice%40example.com").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn health_returns_an_empty_ok() {
    let state = TestState::new();
    let app = takagi_app!(state);

    let res = test::call_service(&app, https_get("/health").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = test::read_body(res).await;
    assert!(body.is_empty());
}

#[actix_web::test]
async fn root_redirects_to_the_repository_by_default() {
    let state = TestState::new();
    let app = takagi_app!(state);

    let res = test::call_service(&app, https_get("/").to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        location(&res),
        "https://github.com/celsiusnarhwal/takagi"
    );
}

#[actix_web::test]
async fn root_is_not_found_when_redirects_are_off() {
    let mut settings = test_settings();
    settings.root_redirect = RootRedirect::Off;
    let state = TestState::with_settings(settings);
    let app = takagi_app!(state);

    let res = test::call_service(&app, https_get("/").to_request()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn root_redirects_to_docs_when_configured() {
    let mut settings = test_settings();
    settings.root_redirect = RootRedirect::Docs;
    let state = TestState::with_settings(settings);
    let app = takagi_app!(state);

    let res = test::call_service(&app, https_get("/").to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), format!("{}/docs", BASE_URL));
}
