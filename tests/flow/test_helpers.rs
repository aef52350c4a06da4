//! Shared fixtures for the flow tests.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use actix_web::dev::ServiceResponse;
use actix_web::web;

use takagi::config::{Environment, PrivateSettings, RootRedirect, Settings};
use takagi::services::github::GitHubClient;
use takagi::services::keys::{KeyMaterial, KeySet};
use takagi::services::token_codec::TokenCodec;

/// The host every test request carries. With `X-Forwarded-Proto: https`
/// the service base URL becomes `https://op.example`.
pub const TEST_HOST: &str = "op.example";

/// The service base URL as the handlers derive it.
pub const BASE_URL: &str = "https://op.example";

/// Key generation is expensive; all tests share one key material.
fn shared_keys() -> Arc<KeyMaterial> {
    static KEYS: OnceLock<Arc<KeyMaterial>> = OnceLock::new();
    KEYS.get_or_init(|| {
        let keyset = KeySet::generate().expect("keyset generation");
        Arc::new(KeyMaterial::from_keyset(&keyset).expect("key material"))
    })
    .clone()
}

/// Settings matching the standard test deployment: client `abc` allowed,
/// redirect URIs rewritten, one-hour tokens.
pub fn test_settings() -> Settings {
    Settings {
        environment: Environment::Development,
        host: "127.0.0.1".to_string(),
        port: 8080,
        allowed_hosts: vec![
            TEST_HOST.to_string(),
            "localhost".to_string(),
            "127.0.0.1".to_string(),
            "::1".to_string(),
        ],
        allowed_clients: vec!["abc".to_string()],
        base_path: "/".to_string(),
        fix_redirect_uris: true,
        token_lifetime: Some(std::time::Duration::from_secs(3600)),
        root_redirect: RootRedirect::Repo,
        treat_loopback_as_secure: true,
        return_to_referrer: false,
        allowed_webfinger_hosts: Vec::new(),
        keyset: None,
        keys_dir: PathBuf::from("./data/keys"),
        enable_docs: true,
        private: PrivateSettings::default(),
    }
}

/// Application state shared by a test's app instance.
pub struct TestState {
    pub settings: web::Data<Settings>,
    pub keys: web::Data<Arc<KeyMaterial>>,
    pub codec: TokenCodec,
    pub codec_data: web::Data<TokenCodec>,
    pub github: web::Data<GitHubClient>,
}

impl TestState {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self::build(settings, GitHubClient::new())
    }

    /// Point the GitHub client at a mock server.
    pub fn with_mock_github(mock_base_url: &str) -> Self {
        let github = GitHubClient::with_endpoints(
            &format!("{}/login/oauth/authorize", mock_base_url),
            &format!("{}/login/oauth/access_token", mock_base_url),
            mock_base_url,
        );
        Self::build(test_settings(), github)
    }

    fn build(settings: Settings, github: GitHubClient) -> Self {
        let keys = shared_keys();
        let codec = TokenCodec::new(keys.clone());
        TestState {
            settings: web::Data::new(settings),
            keys: web::Data::new(keys),
            codec: codec.clone(),
            codec_data: web::Data::new(codec),
            github: web::Data::new(github),
        }
    }
}

/// Build the service under test with a state's data.
macro_rules! takagi_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.settings.clone())
                .app_data($state.keys.clone())
                .app_data($state.codec_data.clone())
                .app_data($state.github.clone())
                .configure(takagi::api::configure_routes),
        )
        .await
    };
}
pub(crate) use takagi_app;

/// A GET request against the test deployment's external URL.
pub fn https_get(uri: &str) -> actix_web::test::TestRequest {
    actix_web::test::TestRequest::get()
        .uri(uri)
        .insert_header(("Host", TEST_HOST))
        .insert_header(("X-Forwarded-Proto", "https"))
}

/// A POST request against the test deployment's external URL.
pub fn https_post(uri: &str) -> actix_web::test::TestRequest {
    actix_web::test::TestRequest::post()
        .uri(uri)
        .insert_header(("Host", TEST_HOST))
        .insert_header(("X-Forwarded-Proto", "https"))
}

/// The Location header of a redirect response.
pub fn location<B>(res: &ServiceResponse<B>) -> String {
    res.headers()
        .get("Location")
        .expect("response has a Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// Decode the query portion of a URL into ordered pairs.
pub fn query_pairs(url: &str) -> Vec<(String, String)> {
    let Some((_, query)) = url.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (
                urlencoding::decode(key).unwrap().into_owned(),
                urlencoding::decode(value).unwrap().into_owned(),
            )
        })
        .collect()
}

/// First value for a query key.
pub fn query_value(url: &str, name: &str) -> Option<String> {
    query_pairs(url)
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}
