pub mod arguments;
pub mod cache;
pub mod config;
pub mod database;
pub mod errors;
pub mod identity;
pub mod jobs;
pub mod logger;
pub mod notifications;
pub mod pagination;
pub mod ratelimit;
pub mod realtime;
pub mod stars;
pub mod webserver;
