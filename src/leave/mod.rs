//! Leave balances, substitute leave grants and leave requests.

pub mod balance;
pub mod catalog;
pub mod clock;
pub mod grant_ledger;
pub mod lock;
pub mod notify;
pub mod service;
pub mod store;
pub mod workflow;


pub use service::{LeaveService, LeaveSettings};
