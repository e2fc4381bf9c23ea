//! Log setup for the CLI.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Parse a level name; unknown names fall back to INFO
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Pick the max level: `--verbose` wins, then `LOG_LEVEL`, then WARN so
/// command output stays readable.
pub fn resolve_level(verbose: u8, env_level: Option<&str>) -> Level {
    match verbose {
        0 => env_level.map(parse_level).unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber writing to stderr
pub fn init(verbose: u8) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let env_level = std::env::var("LOG_LEVEL").ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(resolve_level(verbose, env_level.as_deref()))
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level(" error "), Level::ERROR);
        assert_eq!(parse_level("nonsense"), Level::INFO);
    }

    #[test]
    fn test_verbose_overrides_env() {
        assert_eq!(resolve_level(0, None), Level::WARN);
        assert_eq!(resolve_level(0, Some("trace")), Level::TRACE);
        assert_eq!(resolve_level(1, Some("error")), Level::INFO);
        assert_eq!(resolve_level(2, None), Level::DEBUG);
        assert_eq!(resolve_level(5, None), Level::TRACE);
    }
}
