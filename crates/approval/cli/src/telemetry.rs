//! Tracing subscriber setup

use approval_engine::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber, writing to stderr so stdout carries only
/// command output. `RUST_LOG` wins over the configured level.
pub fn init_tracing(logging: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_installs_once() {
        let logging = LoggingConfig {
            level: "debug".into(),
            json: true,
        };
        assert!(init_tracing(&logging).is_ok());
        assert!(init_tracing(&logging).is_err());
    }
}
