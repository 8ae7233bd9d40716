pub mod auth;
pub mod blob;
pub mod config;
pub mod db;
pub mod logging;
pub mod mailer;
pub mod repositories;
