//! registryd - relay key directory daemon
//!
//! Relays announce their identifier, inbound address and public key here;
//! senders fetch the full list to build circuits.

pub mod config;
pub mod server;

pub use config::Config;
pub use server::RegistryService;
