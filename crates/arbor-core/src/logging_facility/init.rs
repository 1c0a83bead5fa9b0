//! Logging initialization
//!
//! Installs the process-wide tracing subscriber for the chosen profile.

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Default filter directive when `RUST_LOG` is unset (development)
const DEV_FILTER: &str = "arbor_core=debug";
/// Default filter directive when `RUST_LOG` is unset (production)
const PROD_FILTER: &str = "arbor_core=info";

/// Logging profile configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output at debug level
    Development,
    /// JSON lines at info level, one object per event
    Production,
    /// No output; tests install the capture layer via `init_test_capture()`
    Test,
}

impl Profile {
    fn default_filter(&self) -> EnvFilter {
        let directive = match self {
            Profile::Development => DEV_FILTER,
            Profile::Production | Profile::Test => PROD_FILTER,
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
    }
}

static INIT_ONCE: Once = Once::new();

/// Initialize the logging facility
///
/// Only the first call has an effect; later calls are ignored regardless of
/// the profile they pass. If another subscriber is already installed globally
/// the call is a no-op.
///
/// # Example
///
/// ```
/// use arbor_core::logging_facility::{init, Profile};
///
/// init(Profile::Production);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let installed = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(profile.default_filter())
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_current_span(false)
                .with_env_filter(profile.default_filter())
                .finish()
                .try_init(),
            Profile::Test => tracing_subscriber::registry().try_init(),
        };
        installed.ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
        init(Profile::Production);
    }

    #[test]
    fn test_profile_equality() {
        assert_eq!(Profile::Development, Profile::Development);
        assert_ne!(Profile::Development, Profile::Production);
    }
}
