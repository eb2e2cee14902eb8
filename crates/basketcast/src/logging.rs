use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file size that triggers trimming (5 MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;
/// Most recent bytes kept when trimming (1 MB)
const KEEP_SIZE: u64 = 1024 * 1024;
const TRIM_MARKER: &[u8] = b"--- Log rotated (older entries removed) ---\n";

/// Last `len` bytes of `file`, dropping the partial line the window starts in
fn read_tail(file: &mut File, len: u64) -> io::Result<Vec<u8>> {
    let size = file.metadata()?.len();
    let start = size.saturating_sub(len);
    file.seek(SeekFrom::Start(start))?;
    let mut tail = Vec::with_capacity(len.min(size) as usize);
    file.read_to_end(&mut tail)?;

    if start == 0 {
        return Ok(tail);
    }
    match tail.iter().position(|&b| b == b'\n') {
        Some(newline) => Ok(tail.split_off(newline + 1)),
        None => Ok(tail),
    }
}

/// Keep only the recent end of an oversized log. Returns whether it was trimmed.
fn trim_log(log_path: &Path) -> io::Result<bool> {
    let mut file = match File::open(log_path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if file.metadata()?.len() <= MAX_LOG_SIZE {
        return Ok(false);
    }
    let tail = read_tail(&mut file, KEEP_SIZE)?;
    drop(file);

    let mut file = File::create(log_path)?;
    file.write_all(TRIM_MARKER)?;
    file.write_all(&tail)?;
    Ok(true)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("basketcast={level},basketcast_core={level}")))
}

/// Initialize logging.
///
/// Without `log_file` events go to stderr, leaving stdout for the report.
/// With it they are appended to the file, which is trimmed to its last 1MB
/// once it grows past 5MB. `RUST_LOG` overrides `level`.
pub fn init_logging(log_file: Option<&Path>, level: &str) -> color_eyre::Result<()> {
    let filter = env_filter(level);

    let Some(log_path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .init();
        return Ok(());
    };

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let trimmed = trim_log(log_path);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .init();

    match trimmed {
        Ok(true) => tracing::info!(path = %log_path.display(), "log file trimmed"),
        Ok(false) => {}
        Err(e) => tracing::warn!(path = %log_path.display(), "could not trim log file: {e}"),
    }
    tracing::debug!(path = %log_path.display(), "file logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_small_log_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("basketcast.log");
        fs::write(&path, "line one\n").unwrap();

        assert!(!trim_log(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "line one\n");

        assert!(!trim_log(&dir.path().join("missing.log")).unwrap());
    }

    #[test]
    fn test_large_log_trimmed_to_recent_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("basketcast.log");
        let line = "x".repeat(99) + "\n";
        let content = line.repeat((MAX_LOG_SIZE / 100 + 10) as usize);
        fs::write(&path, &content).unwrap();

        assert!(trim_log(&path).unwrap());
        let trimmed = fs::read_to_string(&path).unwrap();
        assert!(trimmed.starts_with("--- Log rotated"));
        assert!(trimmed.len() as u64 <= KEEP_SIZE + 100);
        assert!(trimmed.lines().skip(1).all(|l| l.len() == 99));
    }

    #[test]
    fn test_tail_starts_on_line_boundary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tail.log");
        fs::write(&path, "first line\nsecond\nthird\n").unwrap();

        let mut file = File::open(&path).unwrap();
        assert_eq!(read_tail(&mut file, 12).unwrap(), b"third\n");
        assert!(read_tail(&mut file, 5).unwrap().is_empty());
        assert_eq!(read_tail(&mut file, 100).unwrap(), b"first line\nsecond\nthird\n");
    }
}
