use fern::colors::{Color, ColoredLevelConfig};

use crate::config::LoggerConfig;

/// Installs the global `log` dispatcher.
pub struct Logger;

impl Logger {
    /// Route `log` records to stdout. Records from the `w32` crates use
    /// `app_level_filter`, everything else `level_filter`. Installing a
    /// second time is a no-op.
    pub fn init_logging(config: Option<LoggerConfig>) {
        let config = config.unwrap_or_default();
        let colors = ColoredLevelConfig::new()
            .error(Color::Red)
            .warn(Color::Yellow)
            .info(Color::Green)
            .debug(Color::Cyan)
            .trace(Color::BrightBlack);

        let result = fern::Dispatch::new()
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "{} {:<5} [{}] {}",
                    chrono::Local::now().format("%H:%M:%S%.3f"),
                    colors.color(record.level()),
                    record.target(),
                    message
                ))
            })
            .level(config.level_filter)
            .level_for("w32", config.app_level_filter)
            .level_for("w32_script", config.app_level_filter)
            .chain(std::io::stdout())
            .apply();

        if result.is_err() {
            log::debug!("logger already installed");
        }
    }
}
