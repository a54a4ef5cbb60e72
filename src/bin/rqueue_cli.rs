use rqueue::logging::{init_logging_with_config, LogConfig};

fn main() {
    let mut config = LogConfig::from_env();
    if std::env::var_os("RQUEUE_LOG_LEVEL").is_none() {
        config.log_level = "warn".to_string();
    }
    let guard = match init_logging_with_config(&config) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("warning: {err:#}");
            None
        }
    };

    if let Err(err) = rqueue::cli::run_cli() {
        eprintln!("error: {err:#}");
        // exit() skips destructors; flush buffered log lines first
        drop(guard);
        std::process::exit(1);
    }
}
