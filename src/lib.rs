pub mod api;
pub mod auth;
pub mod config;
pub mod dedup;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod filter;
pub mod provider;
pub mod replicate;
pub mod webhook;
