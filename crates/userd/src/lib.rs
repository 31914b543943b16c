//! userd - onion overlay user node
//!
//! A user either listens for final messages delivered by exit relays, or
//! sends one message through a freshly built circuit.

pub mod config;
pub mod inbox;
pub mod sender;

pub use config::{Command, Config};
pub use inbox::{Inbox, Received};
pub use sender::{describe, user_client, UserClient};
