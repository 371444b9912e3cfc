//! Efesto CLI Library
//!
//! Core functionality of the `efestoctl` tool: an HTTP client for the Efesto
//! heater portal with persisted session cookies, bounded transient-fault
//! retry, and transparent re-login on session expiry.
//!
//! # Public API
//!
//! The primary public API is [`client::EfestoClient`]; configuration types are
//! available via [`config::CliConfig`] and [`config::ConfigBuilder`].
//!
//! ```no_run
//! use efestoctl::cli::Command;
//! use efestoctl::client::EfestoClient;
//! use efestoctl::config::CliConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CliConfig::builder()
//!     .with_username("user@example.com")
//!     .with_password("secret")
//!     .with_heater_id("1234")
//!     .build()?;
//!
//! let mut client = EfestoClient::new(config)?;
//! let outcome = client.run(&Command::GetState).await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// HTTP client for the Efesto heater portal.
pub mod client;

/// Configuration types for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

// Mock Efesto service, shared between unit and integration tests
#[doc(hidden)]
pub mod test_utils;
