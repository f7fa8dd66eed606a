//! Compliance Wizard — assessment session state machine, cross-context
//! message bus, and chat integration coordinator.

pub mod avatar;
pub mod bus;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod store;
pub mod wizard;
