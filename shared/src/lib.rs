//! Wire contract and match options shared between the server and its clients.

pub mod config;
pub mod protocol;
