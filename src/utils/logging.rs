use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

/// Map a textual level from configuration to a tracing level.
///
/// Unknown values fall back to `INFO`.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Initialize tracing/logging to the console.
///
/// This uses a simple `with_max_level` configuration based on `default_level`.
pub fn init(default_level: &str) {
    // Use try_init so tests and libraries can call this multiple times without panicking
    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(default_level))
        .with_target(false)
        .try_init();
}

/// Initialize tracing/logging, appending to `file` when one is configured.
///
/// Fails only when the log file cannot be opened.
pub fn init_with_file(default_level: &str, file: Option<&Path>) -> std::io::Result<()> {
    let Some(path) = file else {
        init(default_level);
        println!("Start logging to console");
        return Ok(());
    };

    let log_file = OpenOptions::new().create(true).append(true).open(path)?;

    let _ = tracing_subscriber::fmt()
        .with_max_level(parse_level(default_level))
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init();

    println!("Start logging to file {}", path.display());
    tracing::info!("=====Start logging=====");
    Ok(())
}
