pub mod api;
pub mod cache;
pub mod config;
pub mod delivery;
pub mod format;
pub mod handlers;
pub mod humanize;
pub mod observability;
pub mod query;
pub mod source;
