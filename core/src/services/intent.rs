//! Rule-based intent parsing for inbound messages
//!
//! Classifies free-form Spanish text into the operations the bot supports
//! and pulls out the structured pieces (amount, destination account). Kept
//! behind a trait so a hosted NLU model can replace the rules without
//! touching the webhook flow.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Confidence reported for a keyword match on a balance query
const CONFIDENCE_BALANCE: f32 = 0.95;
/// Confidence reported for a keyword match on a transfer
const CONFIDENCE_TRANSFER: f32 = 0.9;
/// Confidence reported when no rule matched
const CONFIDENCE_UNKNOWN: f32 = 0.3;

/// Destination accounts are 14 to 20 digits (CLABE and card ranges)
static ACCOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{14,20})").expect("valid regex"));

/// Amounts accept "500", "500.50" and "500,50"
static AMOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+[.,]\d{1,2}|\d+)").expect("valid regex"));

/// A confirmation reply is the word CONFIRMAR followed by the code, nothing else
static CONFIRMATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*confirmar\s+(\d{4,8})\s*$").expect("valid regex"));

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// Balance enquiry for the sender's wallet
    BalanceQuery,
    /// Transfer request, with whatever details the text contained
    Transfer {
        amount: Option<Decimal>,
        destination: Option<String>,
    },
    /// Nothing the rules recognise
    Unknown,
}

impl Intent {
    /// Stable name used in logs and API responses
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Intent::BalanceQuery => "consultar_saldo",
            Intent::Transfer { .. } => "transferir",
            Intent::Unknown => "desconocido",
        }
    }
}

/// Result of classifying one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    #[serde(flatten)]
    pub intent: Intent,
    pub confidence: f32,
    /// The text that was classified, as received
    pub text: String,
}

/// Classifies inbound message text
pub trait IntentParser: Send + Sync {
    fn parse(&self, text: &str) -> ParsedIntent;
}

/// Keyword and regex based parser
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleIntentParser;

impl RuleIntentParser {
    pub fn new() -> Self {
        Self
    }
}

impl IntentParser for RuleIntentParser {
    fn parse(&self, text: &str) -> ParsedIntent {
        let lowered = text.to_lowercase();

        if lowered.contains("saldo") || lowered.contains("balance") {
            return ParsedIntent {
                intent: Intent::BalanceQuery,
                confidence: CONFIDENCE_BALANCE,
                text: text.to_string(),
            };
        }

        let is_transfer = ["transferir", "transfiere", "enviar", "envía"]
            .iter()
            .any(|kw| lowered.contains(kw));

        if is_transfer {
            // Pull the destination out first so a 14+ digit account number
            // is never mistaken for an amount.
            let destination = ACCOUNT_RE
                .captures(&lowered)
                .map(|c| c[1].to_string());
            let remainder = match &destination {
                Some(account) => lowered.replacen(account.as_str(), "", 1),
                None => lowered.clone(),
            };
            let amount = AMOUNT_RE
                .captures(&remainder)
                .and_then(|c| Decimal::from_str(&c[1].replace(',', ".")).ok());

            return ParsedIntent {
                intent: Intent::Transfer {
                    amount,
                    destination,
                },
                confidence: CONFIDENCE_TRANSFER,
                text: text.to_string(),
            };
        }

        ParsedIntent {
            intent: Intent::Unknown,
            confidence: CONFIDENCE_UNKNOWN,
            text: text.to_string(),
        }
    }
}

/// Extract the code from a confirmation reply ("CONFIRMAR 1234")
///
/// Anchored to the whole message: anything before or after the keyword and
/// code means this is not a confirmation.
pub fn extract_confirmation_code(text: &str) -> Option<String> {
    CONFIRMATION_RE
        .captures(text)
        .map(|c| c[1].to_string())
}
