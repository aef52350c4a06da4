//! Takagi - Main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::{Config as SwaggerConfig, SwaggerUi};

use takagi::api;
use takagi::config::Settings;
use takagi::middleware::{RequestLogger, SecureTransport, TrustedHost};
use takagi::services::github::GitHubClient;
use takagi::services::keys::KeyMaterial;
use takagi::services::token_codec::TokenCodec;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    // Load configuration
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your TAKAGI_* environment variables:");
            error!("  - TAKAGI_KEYSET and TAKAGI_KEYSET_FILE are mutually exclusive");
            error!("  - TAKAGI_TOKEN_LIFETIME must be a duration of at least 60 seconds");
            error!("  - TAKAGI_ALLOWED_WEBFINGER_HOSTS must not contain a bare '*'");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Takagi");
    info!("  Environment: {}", settings.environment);
    info!("========================================");

    if settings.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    // Key generation failure after the corrupt-file retry is fatal.
    let keys = match KeyMaterial::load_or_generate(&settings) {
        Ok(keys) => Arc::new(keys),
        Err(e) => {
            error!("Failed to load key material: {}", e);
            std::process::exit(1);
        }
    };
    info!("Key material ready (kid={})", keys.signing_kid());

    let codec = TokenCodec::new(keys.clone());
    let github = GitHubClient::new();

    let bind_address = settings.bind_address();
    let worker_count = if settings.is_development() {
        4
    } else {
        num_cpus::get()
    };
    info!(
        "Starting server at http://{} ({} workers)",
        bind_address, worker_count
    );
    if settings.enable_docs {
        info!("API reference available at /docs");
    }

    let settings_data = web::Data::new(settings.clone());
    let keys_data = web::Data::new(keys);
    let codec_data = web::Data::new(codec);
    let github_data = web::Data::new(github);

    let server = HttpServer::new(move || {
        let settings = settings_data.clone();
        let prefix = settings.path_prefix().to_string();

        let mut scope = web::scope(prefix.as_str()).configure(api::configure_routes);

        if settings.enable_docs {
            // Swagger UI also serves the OpenAPI document.
            let openapi_url = format!("{}/openapi.json", prefix);
            let swagger_config = SwaggerConfig::new([openapi_url])
                .try_it_out_enabled(settings.private.show_scalar_devtools_on_localhost);
            scope = scope.service(
                SwaggerUi::new("/docs/{_:.*}")
                    .url("/openapi.json", api::ApiDoc::openapi())
                    .config(swagger_config),
            );
        }

        App::new()
            .wrap(RequestLogger)
            .wrap(TrustedHost::new(&settings.allowed_hosts))
            .wrap(SecureTransport::new(settings.treat_loopback_as_secure))
            .app_data(settings.clone())
            .app_data(keys_data.clone())
            .app_data(codec_data.clone())
            .app_data(github_data.clone())
            .service(scope)
    });

    server.workers(worker_count).bind(&bind_address)?.run().await
}
