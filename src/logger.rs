use std::{
    fs,
    path::{Path, PathBuf},
};

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        println!("\x1b[32m[INFO] [{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {
        println!("\x1b[33m[LOG]  [{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        println!("\x1b[35m[WARN] [{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        println!("\x1b[31m[ERROR][{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {
        panic!("\x1b[1;31m[FATAL][{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
}

/// Sighting pipeline output (plate solves, lines of position, fixes).
#[macro_export]
macro_rules! sight {
    ($($arg:tt)*) => {
        println!("\x1b[1;34m[SIGHT][{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
    };
}

/// High frequency output (sensor updates, countdown ticks). Only printed when
/// `LOG_SEXTANT_EVENTS` is set.
#[macro_export]
macro_rules! event {
    ($($arg:tt)*) => {
        if std::env::var("LOG_SEXTANT_EVENTS").is_ok() {
            println!("\x1b[36m[EVENT][{}]\x1b[0m {}", chrono::Utc::now().format("%H:%M:%S"), format!($($arg)*))
        }
    };
}

/// Types that can be written to disk as a standalone pretty printed JSON record.
///
/// Records land in `<base>/<dir_name>/<file_name>`; missing directories are created.
pub trait JsonDump: serde::Serialize {
    /// File name of the record, including the extension.
    fn file_name(&self) -> String;

    /// Sub directory grouping records of the same kind.
    fn dir_name(&self) -> &'static str;

    /// Serializes `self` and writes it below `base`.
    ///
    /// # Returns
    /// The full path of the written record.
    fn dump_json(&self, base: &Path) -> Result<PathBuf, std::io::Error> {
        let dir = base.join(self.dir_name());
        fs::create_dir_all(&dir)?;
        let path = dir.join(self.file_name());
        let data = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        fs::write(&path, data)?;
        Ok(path)
    }
}
