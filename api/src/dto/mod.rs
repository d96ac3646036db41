//! Request and response shapes for the REST surface

pub mod error;
pub mod intent;
pub mod transfer;
pub mod verify;

pub use error::ErrorResponseExt;
pub use intent::ParseIntentRequest;
pub use transfer::{CreateTransferRequest, TransferReceiptResponse};
pub use verify::{
    CheckCodeRequest, CheckCodeResponse, SendChallengeRequest, SendChallengeResponse,
};
