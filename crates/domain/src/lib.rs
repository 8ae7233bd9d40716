pub mod agreements;
pub mod auth;
pub mod chat;
pub mod error;
pub mod identity;
pub mod matching;
pub mod ports;
pub mod requests;
pub mod users;
pub mod util;

pub type DomainResult<T> = Result<T, error::DomainError>;
