pub mod chat;
pub mod setup;
