//! Pluggable JWT sign-in and refresh for axum applications.
//!
//! Build a [`SimpleJwt`] from a [`SimpleJwtConfig`] and a user store, then
//! mount it with [`SimpleJwtExtension::mount`]:
//!
//! ```no_run
//! use axum::Router;
//! use simple_jwt::{auth::store::MemoryUserStore, SimpleJwt, SimpleJwtConfig, SimpleJwtExtension};
//!
//! let state = SimpleJwt::with_store(SimpleJwtConfig::new("change-me"), MemoryUserStore::new())?;
//! let app: Router = SimpleJwtExtension::new(state).mount(Router::new(), "/auth");
//! # Ok::<(), simple_jwt::error::ConfigError>(())
//! ```

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extension;
pub mod state;
pub mod token;

pub use config::SimpleJwtConfig;
pub use error::AuthError;
pub use extension::{SimpleJwt, SimpleJwtExtension};
pub use token::Token;
