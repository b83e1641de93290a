use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level for a `-v` count.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. `RUST_LOG` directives are honoured, the
/// verbosity level is added on top. sqlx statement logging stays at warn
/// below `-vvv`.
pub fn init(verbosity: u8) {
    let mut filter = EnvFilter::from_default_env().add_directive(level_for(verbosity).into());
    if verbosity < 3 {
        if let Ok(directive) = "sqlx=warn".parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .init();
}
