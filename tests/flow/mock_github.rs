//! Mock GitHub server for E2E tests.
//!
//! Serves the OAuth2 token endpoint and the two REST resources the service
//! calls, with the octocat fixture. Runs in-process on an ephemeral port.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::{App, HttpResponse, HttpServer, get, post, web};

/// Forms received at the token endpoint, latest last.
pub type ExchangeLog = Arc<Mutex<Vec<Vec<(String, String)>>>>;

#[post("/login/oauth/access_token")]
async fn access_token(
    form: web::Form<Vec<(String, String)>>,
    log: web::Data<ExchangeLog>,
) -> HttpResponse {
    let form = form.into_inner();
    log.lock().unwrap().push(form.clone());

    let code = form
        .iter()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.as_str())
        .unwrap_or_default();

    if code == "badcode" {
        // GitHub reports grant failures with a 200 and an error member.
        return HttpResponse::Ok().json(serde_json::json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired.",
        }));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "access_token": "gho_testtoken",
        "token_type": "bearer",
        "scope": "read:org,user:email",
    }))
}

#[get("/user")]
async fn user() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "id": 1234,
        "login": "octocat",
        "name": "The Octocat",
        "email": "octocat@github.com",
        "avatar_url": "https://github.com/images/error/octocat_happy.gif",
        "html_url": "https://github.com/octocat",
        "updated_at": "2023-01-01T00:00:00Z",
    }))
}

#[get("/user/orgs")]
async fn user_orgs() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!([
        { "id": 9876, "login": "github" },
    ]))
}

/// Mock GitHub server handle.
pub struct MockGitHub {
    pub base_url: String,
    pub exchanges: ExchangeLog,
}

impl MockGitHub {
    /// Start the mock server on an ephemeral port.
    pub async fn start() -> Self {
        let exchanges: ExchangeLog = Arc::new(Mutex::new(Vec::new()));

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let port = listener.local_addr().unwrap().port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let log = exchanges.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(log.clone()))
                .service(access_token)
                .service(user)
                .service(user_orgs)
        })
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .run();

        // Fire and forget; the server lives for the process lifetime.
        tokio::spawn(server);

        MockGitHub {
            base_url,
            exchanges,
        }
    }

    /// The form GitHub last received at its token endpoint.
    pub fn last_exchange(&self) -> Option<Vec<(String, String)>> {
        self.exchanges.lock().unwrap().last().cloned()
    }
}
