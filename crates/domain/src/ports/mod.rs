use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub mod agreements;
pub mod auth;
pub mod blob;
pub mod chat;
pub mod requests;
pub mod users;
