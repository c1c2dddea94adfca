//! Types for the eth wire protocol.

mod broadcast;
mod message;
mod status;
mod transactions;

pub use broadcast::*;
pub use message::*;
pub use status::*;
pub use transactions::*;
