//! Tracing setup for triage binaries.
//!
//! [`init_tracing`] installs one global subscriber: an `EnvFilter` over a
//! plain or JSON formatter writing to stderr. JSON lines carry the current
//! `triage.run` span so every event of a run shares its `run_id`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::registry()
        .with(formatter(json).with_filter(filter))
        .try_init()
        .ok();
}

fn formatter(json: bool) -> BoxedLayer {
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        layer
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        layer.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(false, Level::DEBUG);
        init_tracing(true, Level::INFO);
        tracing::info!("still logging");
    }
}
