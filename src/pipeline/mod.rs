//! Style transfer pipeline: request orchestration and background workers.

mod transfer;
mod worker;

pub use transfer::{Config, StyleTransfer, StyleTransferRequest, StylizedResult};
pub use worker::{PendingStylization, Worker};
