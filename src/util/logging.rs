use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Crates and binaries whose events pass the verbosity filter.
const TARGETS: &[&str] = &["memtools", "show_mem", "loop"];

/// Maps `-v`/`-q` flags to a level. `-q` wins over any `-v`.
pub fn level_for(verbose: u8, quiet: bool, default: Level) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => default,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initializes the tracing subscriber on stderr.
///
/// `RUST_LOG` directives are honored; the level derived from the flags is
/// added for memtools targets on top of them.
pub fn init_logging(verbose: u8, quiet: bool, default: Level) {
    let level = level_for(verbose, quiet, default);

    let mut filter = EnvFilter::from_default_env();
    for target in TARGETS {
        match format!("{}={}", target, level).parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring log directive for {}: {}", target, e),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0, false, Level::ERROR), Level::ERROR);
        assert_eq!(level_for(0, false, Level::INFO), Level::INFO);
        assert_eq!(level_for(1, false, Level::ERROR), Level::DEBUG);
        assert_eq!(level_for(3, false, Level::ERROR), Level::TRACE);
        assert_eq!(level_for(2, true, Level::INFO), Level::ERROR);
    }
}
