//! Tracing subscriber setup
//!
//! Every crate in the workspace logs through `tracing`; binaries and tests
//! call [`init_tracing`] once to install a `fmt` subscriber.
//!
//! `RUST_LOG` takes precedence over [`LoggingConfig::filter`], so operators
//! can raise verbosity without touching the config file.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{InfraError, InfraResult};

static TRACING_INITIALIZED: OnceLock<bool> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Install the global tracing subscriber
///
/// Safe to call more than once: only the first call installs a subscriber,
/// later calls (or a subscriber installed elsewhere) are left alone.
///
/// # Errors
/// Returns `InfraError::Config` if the filter directives do not parse.
pub fn init_tracing(config: &LoggingConfig) -> InfraResult<()> {
    let filter = resolve_filter(config)?;

    TRACING_INITIALIZED.get_or_init(|| {
        let use_ansi = IsTerminal::is_terminal(&std::io::stdout());

        let layer: BoxedLayer = if config.json {
            fmt::layer().json().with_target(true).with_current_span(true).boxed()
        } else {
            fmt::layer().with_target(true).with_level(true).with_ansi(use_ansi).boxed()
        };

        let subscriber = tracing_subscriber::registry().with(layer.with_filter(filter));

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
            false
        } else {
            tracing::info!(json = config.json, ansi_colors = use_ansi, "Tracing initialized");
            true
        }
    });

    Ok(())
}

/// Whether [`init_tracing`] installed the global subscriber
pub fn tracing_initialized() -> bool {
    TRACING_INITIALIZED.get().copied().unwrap_or(false)
}

/// `RUST_LOG` if set, otherwise the configured directives
fn resolve_filter(config: &LoggingConfig) -> InfraResult<EnvFilter> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.filter.clone());

    EnvFilter::try_new(&directives)
        .map_err(|e| InfraError::config(format!("Invalid log filter `{directives}`: {e}")))
}
