//! Diagnostic logging setup for the `claw` binary
//!
//! Library code only emits `tracing` events; the binary installs a `fmt`
//! subscriber writing to stderr. `RUST_LOG` wins over the `-v` count.
//! Console rows are printed by the commands themselves, so their `tracing`
//! mirror stays off until `-vv`.

use tracing_subscriber::EnvFilter;

/// Filter directives for a `-v` count
pub fn default_directives(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,clawdbot::console=off",
        1 => "warn,clawdbot=info,clawdbot::console=off",
        2 => "warn,clawdbot=debug",
        _ => "trace",
    }
}

/// Build the filter from `RUST_LOG`, falling back to the `-v` level.
pub fn env_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)))
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_directives_grow_with_verbosity() {
        assert_eq!(default_directives(0), "warn,clawdbot::console=off");
        assert!(default_directives(1).contains("clawdbot=info"));
        assert!(default_directives(2).contains("clawdbot=debug"));
        assert_eq!(default_directives(3), "trace");
        assert_eq!(default_directives(9), "trace");
    }

    #[test]
    fn test_every_directive_parses() {
        for v in 0..4 {
            assert!(EnvFilter::try_new(default_directives(v)).is_ok(), "verbosity {}", v);
        }
    }

    #[test]
    #[serial]
    fn test_rust_log_overrides_verbosity() {
        let previous = std::env::var_os("RUST_LOG");
        std::env::set_var("RUST_LOG", "clawdbot=trace");
        let filter = env_filter(0).to_string();
        match previous {
            Some(v) => std::env::set_var("RUST_LOG", v),
            None => std::env::remove_var("RUST_LOG"),
        }

        assert!(filter.contains("clawdbot=trace"));
    }

    #[test]
    #[serial]
    fn test_init_twice_is_harmless() {
        init(0);
        init(3);
    }
}
