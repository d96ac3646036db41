//! Domain error to HTTP response mapping
//!
//! Every REST route funnels its `DomainError` through here so the whole
//! surface shares one taxonomy: a stable machine code, an HTTP status and
//! a human message in the caller's language. Retryable refusals carry a
//! `Retry-After` header; internal messages never reach the wire.

use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse};
use serde_json::json;
use validator::ValidationErrors;

use cb_core::errors::{DomainError, TransferError, VerificationError};
use cb_shared::ErrorResponse;

use crate::dto::error::ErrorResponseExt;

/// Stable machine-readable error codes carried in every error body
pub mod error_codes {
    pub const AUTHENTICATION_FAILED: &str = "AUTHENTICATION_FAILED";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const IDENTITY_LOCKED: &str = "IDENTITY_LOCKED";
    pub const PROVIDER_UNAVAILABLE: &str = "PROVIDER_UNAVAILABLE";
    pub const SESSION_EXPIRED: &str = "SESSION_EXPIRED";
    pub const SESSION_NOT_PENDING: &str = "SESSION_NOT_PENDING";
    pub const VERIFICATION_REQUIRED: &str = "VERIFICATION_REQUIRED";
    pub const TRANSFER_IN_PROGRESS: &str = "TRANSFER_IN_PROGRESS";
    pub const TRANSFER_REJECTED: &str = "TRANSFER_REJECTED";
    pub const LEDGER_UNAVAILABLE: &str = "LEDGER_UNAVAILABLE";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const BUSINESS_RULE_VIOLATION: &str = "BUSINESS_RULE_VIOLATION";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Response language negotiated from `Accept-Language`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Spanish,
}

impl Language {
    /// Negotiate the response language from the request headers
    ///
    /// Only `es` and `en` tags are recognized; anything else (or no
    /// header at all) falls back to English.
    pub fn from_request(req: &HttpRequest) -> Self {
        req.headers()
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Self::negotiate)
            .unwrap_or(Language::English)
    }

    fn negotiate(accept_language: &str) -> Self {
        let mut best: Option<(Language, f32)> = None;
        for part in accept_language.split(',') {
            let mut pieces = part.trim().splitn(2, ';');
            let tag = pieces.next().unwrap_or("").trim().to_lowercase();
            let quality = pieces
                .next()
                .and_then(|q| q.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);

            let candidate = if tag.starts_with("es") {
                Some(Language::Spanish)
            } else if tag.starts_with("en") {
                Some(Language::English)
            } else {
                None
            };

            if let Some(language) = candidate {
                if best.map_or(true, |(_, q)| quality > q) {
                    best = Some((language, quality));
                }
            }
        }
        best.map(|(language, _)| language).unwrap_or(Language::English)
    }
}

/// Map a domain error to an HTTP response in the caller's language
pub fn domain_error_response(req: &HttpRequest, error: &DomainError) -> HttpResponse {
    let language = Language::from_request(req);
    let (status, code) = status_and_code(error);

    if status.is_server_error() {
        tracing::error!(code, error = %error, "request failed with server error");
    }

    let mut body = ErrorResponse::new(code.to_string(), localized_message(error, language));
    body = attach_details(body, error);

    let mut response = body.to_response(status);
    if let Some(seconds) = retry_after_seconds(error) {
        if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
    }
    response
}

/// Map DTO validation failures to a 400 with per-field messages
pub fn validation_error_response(req: &HttpRequest, errors: &ValidationErrors) -> HttpResponse {
    let message = match Language::from_request(req) {
        Language::English => "Request validation failed".to_string(),
        Language::Spanish => "Los datos de la solicitud no son válidos".to_string(),
    };

    let mut body = ErrorResponse::new(error_codes::VALIDATION_ERROR.to_string(), message);
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<String> = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        body = body.with_detail(field, json!(messages));
    }
    body.to_response(StatusCode::BAD_REQUEST)
}

fn status_and_code(error: &DomainError) -> (StatusCode, &'static str) {
    match error {
        DomainError::Verification(e) => match e {
            VerificationError::AuthenticationFailed => {
                (StatusCode::FORBIDDEN, error_codes::AUTHENTICATION_FAILED)
            }
            VerificationError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, error_codes::RATE_LIMITED)
            }
            VerificationError::Locked { .. } => (StatusCode::LOCKED, error_codes::IDENTITY_LOCKED),
            VerificationError::ProviderUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::PROVIDER_UNAVAILABLE,
            ),
            VerificationError::SessionExpired => (StatusCode::GONE, error_codes::SESSION_EXPIRED),
            VerificationError::SessionNotPending => {
                (StatusCode::CONFLICT, error_codes::SESSION_NOT_PENDING)
            }
        },
        DomainError::Transfer(e) => match e {
            TransferError::VerificationRequired => {
                (StatusCode::FORBIDDEN, error_codes::VERIFICATION_REQUIRED)
            }
            TransferError::InProgress => (StatusCode::CONFLICT, error_codes::TRANSFER_IN_PROGRESS),
            TransferError::ExecutionRejected { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, error_codes::TRANSFER_REJECTED)
            }
            TransferError::LedgerUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::LEDGER_UNAVAILABLE,
            ),
        },
        DomainError::Validation { .. } | DomainError::ValidationErr(_) => {
            (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR)
        }
        DomainError::BusinessRule { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            error_codes::BUSINESS_RULE_VIOLATION,
        ),
        DomainError::NotFound { .. } => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
        DomainError::Internal { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
        }
    }
}

fn retry_after_seconds(error: &DomainError) -> Option<u64> {
    match error {
        DomainError::Verification(VerificationError::RateLimited {
            retry_after_seconds,
        })
        | DomainError::Verification(VerificationError::Locked {
            retry_after_seconds,
        }) => Some(*retry_after_seconds),
        _ => None,
    }
}

pub(crate) fn localized_message(error: &DomainError, language: Language) -> String {
    use Language::*;

    match error {
        DomainError::Verification(e) => match (e, language) {
            (VerificationError::AuthenticationFailed, English) => {
                "Request signature verification failed".to_string()
            }
            (VerificationError::AuthenticationFailed, Spanish) => {
                "La verificación de la firma de la solicitud falló".to_string()
            }
            (VerificationError::RateLimited { retry_after_seconds }, English) => format!(
                "Too many requests. Try again in {} seconds",
                retry_after_seconds
            ),
            (VerificationError::RateLimited { retry_after_seconds }, Spanish) => format!(
                "Demasiadas solicitudes. Intenta de nuevo en {} segundos",
                retry_after_seconds
            ),
            (VerificationError::Locked { retry_after_seconds }, English) => format!(
                "Too many failed attempts. Locked for {} seconds",
                retry_after_seconds
            ),
            (VerificationError::Locked { retry_after_seconds }, Spanish) => format!(
                "Demasiados intentos fallidos. Bloqueado por {} segundos",
                retry_after_seconds
            ),
            (VerificationError::ProviderUnavailable, English) => {
                "Verification service is temporarily unavailable".to_string()
            }
            (VerificationError::ProviderUnavailable, Spanish) => {
                "El servicio de verificación no está disponible por el momento".to_string()
            }
            (VerificationError::SessionExpired, English) => {
                "The verification code has expired. Request a new one".to_string()
            }
            (VerificationError::SessionExpired, Spanish) => {
                "El código de verificación expiró. Solicita uno nuevo".to_string()
            }
            (VerificationError::SessionNotPending, English) => {
                "No pending verification for this identity".to_string()
            }
            (VerificationError::SessionNotPending, Spanish) => {
                "No hay verificación pendiente para esta identidad".to_string()
            }
        },
        DomainError::Transfer(e) => match (e, language) {
            (TransferError::VerificationRequired, English) => {
                "This transfer requires verification first".to_string()
            }
            (TransferError::VerificationRequired, Spanish) => {
                "Esta transferencia requiere verificación previa".to_string()
            }
            (TransferError::InProgress, English) => {
                "An identical transfer is already in progress".to_string()
            }
            (TransferError::InProgress, Spanish) => {
                "Una transferencia idéntica ya está en proceso".to_string()
            }
            (TransferError::ExecutionRejected { .. }, English) => {
                "The transfer was rejected by the ledger".to_string()
            }
            (TransferError::ExecutionRejected { .. }, Spanish) => {
                "La transferencia fue rechazada por el banco".to_string()
            }
            (TransferError::LedgerUnavailable, English) => {
                "Ledger service is temporarily unavailable".to_string()
            }
            (TransferError::LedgerUnavailable, Spanish) => {
                "El servicio bancario no está disponible por el momento".to_string()
            }
        },
        DomainError::Validation { message } => match language {
            English => message.clone(),
            Spanish => "Los datos de la solicitud no son válidos".to_string(),
        },
        DomainError::ValidationErr(e) => match language {
            English => e.to_string(),
            Spanish => "Los datos de la solicitud no son válidos".to_string(),
        },
        DomainError::BusinessRule { message } => match language {
            English => message.clone(),
            Spanish => "La operación no está permitida".to_string(),
        },
        DomainError::NotFound { resource } => match language {
            English => format!("{} not found", resource),
            Spanish => format!("{} no encontrado", resource),
        },
        // Internal details stay in the logs
        DomainError::Internal { .. } => match language {
            English => "An internal error occurred. Please try again later".to_string(),
            Spanish => "Ocurrió un error interno. Intenta más tarde".to_string(),
        },
    }
}

/// Attach machine-readable context that the localized message elides
fn attach_details(body: ErrorResponse, error: &DomainError) -> ErrorResponse {
    match error {
        DomainError::Verification(VerificationError::RateLimited {
            retry_after_seconds,
        })
        | DomainError::Verification(VerificationError::Locked {
            retry_after_seconds,
        }) => body.with_detail("retry_after_seconds", json!(retry_after_seconds)),
        DomainError::Transfer(TransferError::ExecutionRejected { reason }) => {
            body.with_detail("reason", json!(reason))
        }
        DomainError::Validation { message } => body.with_detail("message", json!(message)),
        DomainError::ValidationErr(e) => body.with_detail("message", json!(e.to_string())),
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_language_negotiation_prefers_highest_quality() {
        assert_eq!(Language::negotiate("es-MX,es;q=0.9,en;q=0.5"), Language::Spanish);
        assert_eq!(Language::negotiate("en-US,en;q=0.9"), Language::English);
        assert_eq!(Language::negotiate("en;q=0.4,es;q=0.8"), Language::Spanish);
        assert_eq!(Language::negotiate("fr-FR,de;q=0.9"), Language::English);
    }

    #[test]
    fn test_language_defaults_to_english_without_header() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(Language::from_request(&req), Language::English);
    }

    #[test]
    fn test_rate_limited_maps_to_429_with_retry_hint() {
        let error = DomainError::from(VerificationError::RateLimited {
            retry_after_seconds: 42,
        });
        let (status, code) = status_and_code(&error);
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(code, error_codes::RATE_LIMITED);
        assert_eq!(retry_after_seconds(&error), Some(42));
    }

    #[test]
    fn test_locked_maps_to_423() {
        let error = DomainError::from(VerificationError::Locked {
            retry_after_seconds: 300,
        });
        let (status, code) = status_and_code(&error);
        assert_eq!(status, StatusCode::LOCKED);
        assert_eq!(code, error_codes::IDENTITY_LOCKED);
    }

    #[test]
    fn test_rejected_transfer_maps_to_422() {
        let error = DomainError::from(TransferError::ExecutionRejected {
            reason: "insufficient funds".to_string(),
        });
        let (status, code) = status_and_code(&error);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, error_codes::TRANSFER_REJECTED);
    }

    #[test]
    fn test_internal_error_message_does_not_leak() {
        let error = DomainError::Internal {
            message: "connection pool exhausted at 10.0.0.3".to_string(),
        };
        let english = localized_message(&error, Language::English);
        let spanish = localized_message(&error, Language::Spanish);
        assert!(!english.contains("10.0.0.3"));
        assert!(!spanish.contains("10.0.0.3"));
    }

    #[test]
    fn test_spanish_messages_for_verification_errors() {
        let error = DomainError::from(VerificationError::SessionExpired);
        let message = localized_message(&error, Language::Spanish);
        assert!(message.contains("expiró"));
    }
}
