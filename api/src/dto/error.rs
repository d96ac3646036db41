//! HTTP glue for the shared error envelope

use actix_web::http::StatusCode;
use actix_web::HttpResponse;

use cb_shared::ErrorResponse;

/// Build HTTP responses straight from the shared error envelope
pub trait ErrorResponseExt {
    /// Serialize this error as a JSON response with the given status
    fn to_response(&self, status: StatusCode) -> HttpResponse;
}

impl ErrorResponseExt for ErrorResponse {
    fn to_response(&self, status: StatusCode) -> HttpResponse {
        HttpResponse::build(status).json(self)
    }
}
