use chrono::Local;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

const LOG_DIR: &str = "logs";

/// Appends a timestamped line to `logs/<filename>`, creating the directory
/// and file on first use.
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    if !Path::new(LOG_DIR).exists() {
        std::fs::create_dir_all(LOG_DIR)?;
    }

    let path = format!("{}/{}", LOG_DIR, filename);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    writeln!(
        file,
        "[{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        message
    )?;
    file.flush()
}
