// Logging module, powered by tracing-subscriber
//
// Library crates log through the `log` facade; a `tracing_log::LogTracer`
// bridge routes those records into the tracing subscriber so one pipeline
// carries everything.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Build the `EnvFilter` from the base level plus hardcoded noisy-crate
/// overrides.
fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    // Suppress noisy third-party crates
    let noisy: &[(&str, &str)] = &[
        ("hyper", "warn"),
        ("hyper_util", "warn"),
        ("reqwest", "warn"),
        ("object_store", "info"),
        ("h2", "warn"),
        ("rustls", "warn"),
    ];
    for (target, lvl) in noisy {
        directives.push(format!("{target}={lvl}"));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("invalid tracing filter '{}': {}", filter_str, e))
}

/// Initialize logging for a drover-embedding process.
///
/// `level` is the base directive ("info", "debug", ...); `RUST_LOG` wins
/// when set. Safe to call once per process; a second call returns an error
/// from the underlying subscriber registration.
pub fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(env_directives) => EnvFilter::try_new(env_directives)
            .map_err(|e| anyhow::anyhow!("invalid RUST_LOG: {e}"))?,
        Err(_) => build_env_filter(level)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    // Route log::* macro calls from the library crates into tracing.
    if let Err(err) = tracing_log::LogTracer::init() {
        log::debug!("log bridge already initialized: {err}");
    }
    Ok(())
}
