//! Intent parsing endpoint shapes

use serde::Deserialize;
use validator::Validate;

/// Body of `POST /api/v1/intent/parse`
#[derive(Debug, Deserialize, Validate)]
pub struct ParseIntentRequest {
    /// Free-form message text to classify
    #[validate(length(min = 1, max = 500, message = "text must be 1-500 characters"))]
    pub text: String,
}
