// console_destination.rs
// Purpose: Synchronous interactive sink; formats and emits records immediately

use crate::destination::{Destination, DestinationGate};
use crate::errors::LogshipResult;
use crate::record::{LogLevel, LogRecord};

const ANSI_RESET: &str = "\x1b[0m";

fn level_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "\x1b[90m",
        LogLevel::Debug => "\x1b[36m",
        LogLevel::Info => "\x1b[32m",
        LogLevel::Warn => "\x1b[33m",
        LogLevel::Error => "\x1b[31m",
        LogLevel::Fatal => "\x1b[1;31m",
    }
}

/// Interactive console sink. No buffering and no retry path: emitting a line
/// is treated as always succeeding.
pub struct ConsoleDestination {
    gate: DestinationGate,
    verbose: bool,
}

impl ConsoleDestination {
    pub fn new(min_level: LogLevel, verbose: bool) -> Self {
        ConsoleDestination {
            gate: DestinationGate::new(min_level),
            verbose,
        }
    }

    fn format_line(&self, record: &LogRecord) -> String {
        let level = if self.verbose {
            format!("{}{}{}", level_color(record.level), record.level, ANSI_RESET)
        } else {
            record.level.to_string()
        };

        let mut line = format!(
            "[LOG] {} | {} | {}",
            record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            level,
            record.message
        );

        if let Some(error_id) = &record.error_id {
            line.push_str(&format!(" | {}", error_id));
        }

        if let Some(context) = &record.context {
            let rendered = if self.verbose {
                serde_json::to_string_pretty(context)
            } else {
                serde_json::to_string(context)
            };
            if let Ok(rendered) = rendered {
                line.push_str(&format!(" | {}", rendered));
            }
        }

        line
    }
}

impl Destination for ConsoleDestination {
    fn name(&self) -> &str {
        "console"
    }

    fn enabled(&self) -> bool {
        self.gate.enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.gate.set_enabled(enabled);
    }

    fn min_level(&self) -> LogLevel {
        self.gate.min_level()
    }

    fn set_min_level(&self, level: LogLevel) {
        self.gate.set_min_level(level);
    }

    /// Warn and above go to the error stream so interactive sessions see
    /// failures even when stdout is piped away.
    fn deliver(&self, record: &LogRecord) -> LogshipResult<()> {
        let line = self.format_line(record);
        if record.level >= LogLevel::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
        Ok(())
    }
}

/// One-line warning on the interactive fallback channel.
///
/// Used by the other destinations when they must degrade (dropped records,
/// discarded batches) so data loss is explicit, never silent.
pub fn console_warn(message: &str) {
    eprintln!("[logship] {}", message);
    log::warn!("{}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_format_has_level_and_message() {
        let console = ConsoleDestination::new(LogLevel::Trace, false);
        let record = LogRecord::new(LogLevel::Info, "ready").with_context(json!({ "n": 1 }));
        let line = console.format_line(&record);
        assert!(line.contains("INFO"));
        assert!(line.contains("ready"));
        assert!(line.contains("{\"n\":1}"));
        assert!(!line.contains("\x1b["));
    }

    #[test]
    fn verbose_format_colors_the_level() {
        let console = ConsoleDestination::new(LogLevel::Trace, true);
        let record = LogRecord::new(LogLevel::Error, "boom");
        let line = console.format_line(&record);
        assert!(line.contains("\x1b[31m"));
        assert!(line.contains("boom"));
    }

    #[test]
    fn delivery_always_succeeds() {
        let console = ConsoleDestination::new(LogLevel::Trace, false);
        let record = LogRecord::new(LogLevel::Debug, "fine");
        assert!(console.deliver(&record).is_ok());
    }
}
