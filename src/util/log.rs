use std::str::FromStr;

use chrono::Utc;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode, WriteLogger};

use crate::error::{Error, Result};
use crate::util::config;

/// Configure logger to write log to console and a separate log file for every execution
pub fn init_log(config: &config::Config) -> Result<()> {
    let log_dir = config.log_dir.as_path();
    std::fs::create_dir_all(log_dir).map_err(|source| Error::File {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let file_path = log_dir.join(log_file_name(Utc::now().timestamp()));
    let log_file = std::fs::File::create(&file_path).map_err(|source| Error::File {
        path: file_path.clone(),
        source,
    })?;

    let level = parse_level(&config.log_level);

    CombinedLogger::init(vec![
        TermLogger::new(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(level, Config::default(), log_file),
    ])
    .map_err(|e| Error::Log(e.to_string()))?;

    log_panics::init();

    Ok(())
}

fn log_file_name(timestamp: i64) -> String {
    let mut filename = timestamp.to_string();
    filename.push_str("_vkray.log");
    filename
}

/// Unknown level names fall back to `Debug`.
fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level).unwrap_or(LevelFilter::Debug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_named_after_timestamp() {
        assert_eq!(log_file_name(1700000000), "1700000000_vkray.log");
    }

    #[test]
    fn level_parsing() {
        assert_eq!(parse_level("info"), LevelFilter::Info);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
        assert_eq!(parse_level("chatty"), LevelFilter::Debug);
    }
}
