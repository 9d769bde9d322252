pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod index;
pub mod language;
pub mod metrics;
pub mod model;
pub mod naming;
pub mod notify;
pub mod projector;
pub mod reconciler;
pub mod retry;
pub mod schema;
pub mod session;
pub mod store;
pub mod validator;

#[cfg(test)]
mod testing;
