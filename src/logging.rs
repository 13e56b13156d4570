//! Opt-in file log. The terminal belongs to the game, so nothing is printed;
//! lines go to `--log-file` when one is given.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_FILE: Mutex<Option<std::fs::File>> = Mutex::new(None);

/// Open (truncate) the log file and turn logging on.
pub fn init_log_file(path: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    if let Ok(mut slot) = LOG_FILE.lock() {
        *slot = Some(file);
        ENABLED.store(true, Ordering::Relaxed);
    }
    Ok(())
}

#[inline]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Append one timestamped line. Write failures are ignored.
pub fn write_line(message: &str) {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    if let Ok(mut slot) = LOG_FILE.lock() {
        if let Some(file) = slot.as_mut() {
            let _ = writeln!(file, "{millis} {message}");
            let _ = file.flush();
        }
    }
}

/// Format and log a line if logging is on.
#[macro_export]
macro_rules! glog {
    ($($arg:tt)*) => {
        if $crate::logging::is_enabled() {
            $crate::logging::write_line(&format!($($arg)*));
        }
    };
}
