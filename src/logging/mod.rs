//! Logging setup driven by environment variables.
//!
//! - `LOG_MODE`: "stdout" (default) or "file"
//! - `LOG_LEVEL`: "trace" | "debug" | "info" | "warn" | "error" (default "info")
//! - `LOG_DATA_DIR`: directory of the log file in file mode (default "./logs")
//! - `LOG_MAX_SIZE`: size in bytes after which the file rolls (default 1GB)

use chrono::Utc;
use log::info;
use simplelog::{Config, LevelFilter, SimpleLogger, WriteLogger};
use std::{
    env,
    fs::{create_dir_all, metadata, File, OpenOptions},
    path::Path,
};

/// Log file name for a given date and roll index.
pub fn compute_rolled_file_path(base_file_path: &str, date_str: &str, index: u32) -> String {
    match base_file_path.strip_suffix(".log") {
        Some(trimmed) => format!("{}-{}.{}.log", trimmed, date_str, index),
        None => format!("{}-{}.{}.log", base_file_path, date_str, index),
    }
}

/// Walks roll indices until it finds a file under `max_size`, returning that
/// path.
pub fn space_based_rolling(
    file_path: &str,
    base_file_path: &str,
    date_str: &str,
    max_size: u64,
) -> String {
    let mut final_path = file_path.to_string();
    let mut index = 1;
    while let Ok(meta) = metadata(&final_path) {
        if meta.len() > max_size {
            final_path = compute_rolled_file_path(base_file_path, date_str, index);
            index += 1;
        } else {
            break;
        }
    }
    final_path
}

/// Initializes the global logger. Called once at startup, before any
/// component logs.
pub fn setup_logging() {
    let log_mode = env::var("LOG_MODE").unwrap_or_else(|_| "stdout".to_string());
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let level_filter = match log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    if log_mode.to_lowercase() == "file" {
        let log_dir = env::var("LOG_DATA_DIR").unwrap_or_else(|_| "./logs".to_string());
        let log_dir = format!("{}/", log_dir.trim_end_matches('/'));
        let date_str = Utc::now().format("%Y-%m-%d").to_string();
        let base_file_path = format!("{}gmp-relayer.log", log_dir);

        let time_based_path = compute_rolled_file_path(&base_file_path, &date_str, 1);

        if let Some(parent) = Path::new(&time_based_path).parent() {
            create_dir_all(parent).expect("Failed to create log directory");
        }

        let max_size: u64 = env::var("LOG_MAX_SIZE")
            .map(|s| {
                s.parse::<u64>()
                    .expect("LOG_MAX_SIZE must be a valid u64 if set")
            })
            .unwrap_or(1_073_741_824);

        let final_path =
            space_based_rolling(&time_based_path, &base_file_path, &date_str, max_size);

        let log_file = if Path::new(&final_path).exists() {
            OpenOptions::new()
                .append(true)
                .open(&final_path)
                .unwrap_or_else(|e| panic!("Unable to open log file {}: {}", final_path, e))
        } else {
            File::create(&final_path)
                .unwrap_or_else(|e| panic!("Unable to create log file {}: {}", final_path, e))
        };
        WriteLogger::init(level_filter, Config::default(), log_file)
            .expect("Failed to initialize file logger");
    } else {
        SimpleLogger::init(level_filter, Config::default())
            .expect("Failed to initialize simple logger");
    }

    info!("Logging is successfully configured (mode: {})", log_mode);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_compute_rolled_file_path() {
        let result = compute_rolled_file_path("app.log", "2026-01-01", 1);
        assert_eq!(result, "app-2026-01-01.1.log");

        let result = compute_rolled_file_path("app", "2026-01-01", 2);
        assert_eq!(result, "app-2026-01-01.2.log");

        let result = compute_rolled_file_path("logs/app.log", "2026-01-01", 3);
        assert_eq!(result, "logs/app-2026-01-01.3.log");
    }

    #[test]
    fn test_space_based_rolling() {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let base_path = temp_dir
            .path()
            .join("test.log")
            .to_str()
            .unwrap()
            .to_string();

        // No file yet: keep the original path.
        let result = space_based_rolling(&base_path, &base_path, "2026-01-01", 100);
        assert_eq!(result, base_path);

        {
            let mut file = File::create(&base_path).expect("Failed to create test file");
            file.write_all(&[0; 200])
                .expect("Failed to write to test file");
        }

        // Oversized file rolls to index 1.
        let expected_path = compute_rolled_file_path(&base_path, "2026-01-01", 1);
        let result = space_based_rolling(&base_path, &base_path, "2026-01-01", 100);
        assert_eq!(result, expected_path);

        {
            let mut file = File::create(&expected_path).expect("Failed to create test file");
            file.write_all(&[0; 200])
                .expect("Failed to write to test file");
        }

        // And then to index 2.
        let expected_path2 = compute_rolled_file_path(&base_path, "2026-01-01", 2);
        let result = space_based_rolling(&base_path, &base_path, "2026-01-01", 100);
        assert_eq!(result, expected_path2);
    }
}
