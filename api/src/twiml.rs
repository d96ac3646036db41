//! TwiML rendering for webhook replies
//!
//! The gateway expects an XML document in the response body; a single
//! `<Message>` element makes it send one WhatsApp message back to the
//! sender. Replies are built from user-facing Spanish strings, so the
//! body is always XML-escaped.

use actix_web::HttpResponse;

/// Render a one-message TwiML reply
pub fn message(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape(body)
    )
}

/// Render an empty TwiML reply (acknowledge without answering)
pub fn empty() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response></Response>".to_string()
}

/// Wrap a TwiML document in an HTTP 200 with the XML content type
pub fn reply(body: &str) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/xml; charset=utf-8")
        .body(message(body))
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
