use ansi_term::Colour;
use chrono_tz::Tz;
use env_logger::Builder;
use log::LevelFilter;
use std::path::Path;
use std::{fs::OpenOptions, io::Write};

/// Installs the global logger: colored records on stderr, plain records
/// appended to `log_path`. `RUST_LOG` overrides the default `info` level.
pub fn init(log_path: &Path, timezone: Tz) -> std::io::Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format(move |buf, record| {
            let timestamp = chrono::Utc::now()
                .with_timezone(&timezone)
                .format("%Y-%m-%dT%H:%M:%S%:z");

            let level = match record.level() {
                log::Level::Error => Colour::Red.paint(record.level().to_string()),
                log::Level::Warn => Colour::Yellow.paint(record.level().to_string()),
                log::Level::Info => Colour::Green.paint(record.level().to_string()),
                log::Level::Debug => Colour::Blue.paint(record.level().to_string()),
                log::Level::Trace => Colour::Purple.paint(record.level().to_string()),
            };

            writeln!(
                &log_file,
                "[{} {} {}] {}",
                timestamp,
                record.level(),
                record.module_path().unwrap_or_default(),
                record.args()
            )?;

            writeln!(
                buf,
                "[{} {} {}] {}",
                timestamp,
                level,
                record.module_path().unwrap_or_default(),
                record.args()
            )
        })
        .try_init()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::AlreadyExists, e))
}
