use tracing_subscriber::{EnvFilter, FmtSubscriber};

const LOG_ENV: &str = "VURAMP_LOG";

/// Installs the global subscriber. Logs go to stderr so the summary on
/// stdout stays machine-friendly.
pub fn init_logging(verbose: bool, no_color: bool) {
    let configured = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok();
    let filter = EnvFilter::try_new(log_directive(verbose, configured.as_deref()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}

fn log_directive(verbose: bool, configured: Option<&str>) -> String {
    match configured {
        Some(value) if !value.trim().is_empty() => value.trim().to_owned(),
        Some(_) | None => {
            if verbose {
                "debug".to_owned()
            } else {
                "info".to_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(false, false);
        init_logging(false, false);
    }

    #[test]
    fn env_directive_wins_over_verbose() -> Result<(), String> {
        if log_directive(true, Some("vuramp=trace")) != "vuramp=trace" {
            return Err("Expected env directive".to_owned());
        }
        if log_directive(true, None) != "debug" || log_directive(false, Some(" ")) != "info" {
            return Err("Unexpected default directive".to_owned());
        }
        Ok(())
    }
}
