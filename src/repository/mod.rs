//! Storage backends for the leave engine.

pub mod mysql;

#[cfg(test)]
pub mod memory;

pub use mysql::MySqlLeaveStore;
