//! Transfer request repository module.

mod r#trait;
pub use r#trait::{RecordOutcome, TransferRepository};

mod mock;
pub use mock::MockTransferRepository;
