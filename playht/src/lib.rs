//! PlayHT streaming TTS API SDK for Rust.
//!
//! This crate provides a client for the PlayHT text-to-speech API: a
//! lease-based authentication exchange over HTTP, a streaming gRPC
//! synthesis client, and a text-splitting utility for the service's
//! payload limits.
//!
//! The synthesis backend is not statically configured. Each API call is
//! authorized by a short-lived signed *lease* token fetched from the lease
//! endpoint; the lease itself carries the network address of the backend
//! to stream from. [`Session`] caches the current lease and renews it
//! transparently, [`TtsClient`] streams audio chunks from whichever
//! backend the lease routes to.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::pin::pin;
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use playht::{Session, TtsClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials from PLAY_HT_USER_ID / PLAY_HT_API_KEY.
//!     let session = Arc::new(Session::from_env()?);
//!     let client = TtsClient::new(session);
//!
//!     let stream = client.synthesize(["Hello from Rust!"]).await?;
//!     let mut stream = pin!(stream);
//!     while let Some(chunk) = stream.next().await {
//!         let chunk = chunk?;
//!         // chunk.audio holds raw audio bytes as they arrive.
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Authentication
//!
//! Credentials resolve from explicit values or the environment:
//!
//! ```rust,no_run
//! use playht::{Credentials, Session};
//!
//! # fn run() -> playht::Result<()> {
//! // Explicit values; a "Bearer " marker on the key is tolerated.
//! let credentials = Credentials::new("user-id", "api-key")?;
//! let session = Session::new(credentials)?;
//!
//! // Or from the environment (PLAY_HT_ prefix, .env file honored).
//! let session = Session::from_env()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! A [`Session`] may be shared across tasks behind an [`std::sync::Arc`];
//! lease renewal is single-flight and callers never observe a partially
//! refreshed lease. A single in-flight synthesis stream per [`TtsClient`]
//! is supported; run concurrent streams through separate clients sharing
//! one session.

pub mod chunk;
mod client;
mod credentials;
mod error;
mod lease;
mod params;
pub mod proto;
mod session;

pub use client::{
    AudioChunk, ChannelOptions, TtsClient, TtsClientBuilder, DEFAULT_CONNECT_TIMEOUT,
};
pub use credentials::{Credentials, DEFAULT_ENV_PREFIX};
pub use error::{Error, Result};
pub use lease::{lease_epoch, Lease, LEASE_GRACE_SECS, LEASE_HEADER_LEN};
pub use params::{random_seed, SynthesisParams, DEFAULT_VOICE};
pub use proto::{Format, Quality};
pub use session::{Session, SessionBuilder, DEFAULT_LEASE_URL, DEFAULT_TIMEOUT};
