//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `homecal_core` linkage.
//! - Allow running one expiry sweep by hand against a database file.

use homecal_core::db::open_db;
use homecal_core::{default_log_level, init_logging, ExpiryService, SqliteEventRepository};
use std::path::PathBuf;

fn log_directory() -> PathBuf {
    std::env::temp_dir().join("homecal-logs")
}

fn main() {
    println!("homecal_core version={}", homecal_core::core_version());

    // Sweep diagnostics (per-event failures, batch summary) go through the
    // core logger; without this they would be dropped.
    match log_directory().to_str() {
        Some(dir) => {
            if let Err(err) = init_logging(default_log_level(), dir) {
                eprintln!("logging disabled: {err}");
            }
        }
        None => eprintln!("logging disabled: log directory is not valid UTF-8"),
    }

    // Optional first argument: database path to sweep.
    let Some(db_path) = std::env::args().nth(1) else {
        return;
    };

    let mut conn = match open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open `{db_path}`: {err}");
            std::process::exit(1);
        }
    };

    let repo = match SqliteEventRepository::try_new(&mut conn) {
        Ok(repo) => repo,
        Err(err) => {
            eprintln!("failed to prepare repository: {err}");
            std::process::exit(1);
        }
    };

    match ExpiryService::new(repo).run_sweep(chrono::Utc::now()) {
        Ok(summary) => println!(
            "expiry sweep: scanned={} expired={} updated={} failed={}",
            summary.scanned_events,
            summary.expired_attendees,
            summary.updated_events,
            summary.failed_events
        ),
        Err(err) => {
            eprintln!("expiry sweep failed: {err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::log_directory;

    // `init_logging` rejects relative directories; the CLI default must stay
    // absolute.
    #[test]
    fn log_directory_is_absolute() {
        assert!(log_directory().is_absolute());
    }
}
