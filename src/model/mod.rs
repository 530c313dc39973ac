pub mod connection;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod id;
pub mod info;
pub(crate) mod player;
pub mod search;
pub mod track;
