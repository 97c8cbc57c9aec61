//! A minimal async client for a bearer-authenticated JSON key-value store
//!
//! Every response from the store is a JSON envelope with a `success` flag and a
//! `message`. Operations map a refused request to [`Error::Store`], whose text
//! is `"{operation}: {message}"`, and pass transport or decoding errors through
//! untouched.
//!
//! # Features
//! - set, get, get-with-default, append, delete and list
//! - Bearer token authentication
//! - Async/await API using tokio
//! - HTTP/1.1 and HTTP/2, plain or TLS
//! - Optional per-request timeout
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kv_store_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kv_store_client::Error> {
//!     let client = Client::new("http://localhost:3000/kv", "your-token")?;
//!
//!     client.set("todo", "buy milk").await?;
//!     client.append("todo", "walk dog").await?;
//!     println!("{}", client.get("todo").await?);
//!
//!     let theme = client.get_or_default("theme", "light").await?;
//!     println!("Theme: {}", theme);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::Client;
pub use config::{ApiToken, ClientConfig};
pub use error::{Error, Result};
pub use types::*;
