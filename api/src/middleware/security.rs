//! HTTPS enforcement and security response headers
//!
//! In production every request must arrive over HTTPS, either directly or
//! through a trusted proxy that sets `X-Forwarded-Proto`. Responses get
//! the usual hardening headers; balances and receipts must never land in
//! a shared cache, so everything is marked `no-store`.

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorForbidden,
    http::header::{self, HeaderValue},
    Error,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    task::{Context, Poll},
};

use cb_shared::config::Environment;

/// Security middleware factory
pub struct SecurityHeaders {
    enforce_https: bool,
    add_headers: bool,
    trusted_proxies: Vec<String>,
}

impl SecurityHeaders {
    /// Policy derived from the runtime environment
    ///
    /// `TRUSTED_PROXIES` is a comma-separated list of peer IPs whose
    /// `X-Forwarded-Proto` header is believed.
    pub fn new(environment: &Environment) -> Self {
        let enforce_https = environment.is_production();
        let trusted_proxies: Vec<String> = std::env::var("TRUSTED_PROXIES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        tracing::info!(
            enforce_https,
            trusted_proxies = ?trusted_proxies,
            "security middleware configured"
        );
        Self {
            enforce_https,
            add_headers: true,
            trusted_proxies,
        }
    }

    /// No HTTPS enforcement, for local runs and tests
    pub fn development() -> Self {
        Self {
            enforce_https: false,
            add_headers: true,
            trusted_proxies: vec!["127.0.0.1".to_string(), "::1".to_string()],
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersService {
            service: Rc::new(service),
            enforce_https: self.enforce_https,
            add_headers: self.add_headers,
            trusted_proxies: self.trusted_proxies.clone(),
        }))
    }
}

pub struct SecurityHeadersService<S> {
    service: Rc<S>,
    enforce_https: bool,
    add_headers: bool,
    trusted_proxies: Vec<String>,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let enforce_https = self.enforce_https;
        let add_headers = self.add_headers;
        let trusted_proxies = self.trusted_proxies.clone();

        Box::pin(async move {
            if enforce_https && !is_secure_request(&req, &trusted_proxies) {
                tracing::warn!(
                    method = %req.method(),
                    path = req.path(),
                    "insecure request blocked"
                );
                return Err(ErrorForbidden("HTTPS required"));
            }

            let mut response = service.call(req).await?;
            if add_headers {
                add_security_response_headers(&mut response);
            }
            Ok(response)
        })
    }
}

/// True when the request arrived over HTTPS, directly or via a trusted
/// proxy that vouches for it
fn is_secure_request(req: &ServiceRequest, trusted_proxies: &[String]) -> bool {
    let conn_info = req.connection_info();
    if conn_info.scheme() == "https" {
        return true;
    }

    // X-Forwarded-Proto only counts when the peer is a proxy we trust
    if let Some(forwarded_proto) = req.headers().get("x-forwarded-proto") {
        if let Ok(proto) = forwarded_proto.to_str() {
            let peer_addr = conn_info.peer_addr().unwrap_or("");
            if proto == "https" && is_trusted_proxy(peer_addr, trusted_proxies) {
                return true;
            }
        }
    }

    let host = conn_info.host();
    host == "localhost" || host.starts_with("localhost:") || host.starts_with("127.0.0.1")
}

fn is_trusted_proxy(peer_addr: &str, trusted_proxies: &[String]) -> bool {
    let ip = peer_addr.split(':').next().unwrap_or(peer_addr);
    trusted_proxies
        .iter()
        .any(|trusted| trusted == ip || trusted == peer_addr)
}

fn add_security_response_headers<B>(response: &mut ServiceResponse<B>) {
    let headers = response.headers_mut();
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    // Balances and receipts are personal financial data
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trusted_proxy_matches_bare_ip() {
        let proxies = vec!["10.0.0.1".to_string()];
        assert!(is_trusted_proxy("10.0.0.1:44321", &proxies));
        assert!(is_trusted_proxy("10.0.0.1", &proxies));
        assert!(!is_trusted_proxy("10.0.0.2:80", &proxies));
    }

    #[test]
    fn test_no_proxies_trusts_nothing() {
        assert!(!is_trusted_proxy("10.0.0.1:443", &[]));
    }
}
