use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::Local;
use colored::Colorize;
use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};

const LOG_DIR: &str = "logs";

/// Console logger behind the `log` facade, with an optional file echo for
/// post-hoc inspection of a run.
struct ConsoleLogger {
    echo_file: Option<String>,
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        let level = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN".yellow(),
            Level::Info => "INFO".green(),
            Level::Debug => "DEBUG".blue(),
            Level::Trace => "TRACE".normal(),
        };
        println!("[{timestamp}] {level} {}", record.args());

        if let Some(filename) = &self.echo_file {
            let line = format!("{} {}", record.level(), record.args());
            // the console stays alive even if the log file does not
            let _ = log_to_file(filename, &line);
        }
    }

    fn flush(&self) {}
}

/// Install the console logger. `verbose` lowers the level to debug.
pub fn init(verbose: bool, echo_file: Option<String>) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(ConsoleLogger { echo_file }))?;
    log::set_max_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });
    Ok(())
}

/// Append a timestamped line to `logs/<filename>`.
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    if !Path::new(LOG_DIR).exists() {
        std::fs::create_dir_all(LOG_DIR)?;
    }

    let path = format!("{LOG_DIR}/{filename}");
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    writeln!(file, "[{timestamp}] {message}")?;
    file.flush()?;

    Ok(())
}
