pub mod auth;
pub mod common;
pub mod completions;
pub mod config;
pub mod downloads;
pub mod feed;
pub mod friends;
pub mod library;
pub mod notifications;
pub mod profile;
