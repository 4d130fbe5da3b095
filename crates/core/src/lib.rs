//! droid-release core - shared types
//! 
//! This crate holds the values every other droid-release crate agrees on:
//! package identifiers, the release configuration, the error type and the
//! progress sink used to report pipeline stages.

pub mod config;
pub mod error;
pub mod events;
pub mod identifier;

pub use config::{BuildType, ReleaseConfig, SigningSettings};
pub use error::{ReleaseError, Result};
pub use events::{EventBus, EventSubscription, ProgressSink, ReleaseEvent, Severity, TracingSink};
pub use identifier::PackageIdentifier;

/// droid-release version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "droid-release";
