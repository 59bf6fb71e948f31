pub mod chat;
pub mod error;
pub mod events;
pub mod ipfs;
pub mod mint;
pub mod session;
