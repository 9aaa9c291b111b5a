//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured level
pub const LOG_ENV: &str = "MERGEGUARD_LOG";

/// Install a global fmt subscriber
///
/// `level` is an `EnvFilter` directive such as `info` or
/// `mg_experiment=debug`; `MERGEGUARD_LOG` takes precedence when set.
/// Returns `false` when a subscriber was already installed.
pub fn init(level: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        let _ = init("debug", false);
        assert!(!init("info", true));
    }
}
