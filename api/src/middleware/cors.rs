//! CORS policy keyed to the runtime environment
//!
//! Development gets a permissive policy so local dashboards and tunnels
//! can hit the API; production only admits the configured origins.

use actix_cors::Cors;
use actix_web::http::header;

use cb_shared::config::Environment;
use cb_shared::CorsConfig;

/// Build the CORS middleware for the current environment
pub fn create_cors(config: &CorsConfig, environment: &Environment) -> Cors {
    if environment.is_development() {
        tracing::info!("CORS: permissive development policy");
        return Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::ACCEPT_LANGUAGE,
                header::AUTHORIZATION,
            ])
            .max_age(config.max_age);
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            header::AUTHORIZATION,
        ])
        .max_age(config.max_age);

    if config.allowed_origins.is_empty() {
        tracing::warn!("CORS: no allowed origins configured, cross-origin requests will be refused");
    }
    for origin in &config.allowed_origins {
        cors = cors.allowed_origin(origin);
    }
    if config.allow_credentials {
        cors = cors.supports_credentials();
    }
    cors
}
