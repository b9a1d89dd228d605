// Append-only event log (`<timestamp> - <LEVEL> - <message>` lines), tail-readable for /api/logs.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Info => "INFO",
            EventLevel::Warning => "WARNING",
            EventLevel::Error => "ERROR",
            EventLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct EventLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl EventLog {
    /// Opens (creating if needed) the log file in append mode. Failing here is fatal at startup.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| anyhow::anyhow!("open event log {}: {}", path.display(), e))?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line and mirrors it to tracing. Write failures are reported to tracing only.
    ///
    /// Blocking write under a std mutex, called from async tasks: lines are short and rare
    /// (transitions and failures), so this stays off the blocking pool.
    pub fn append(&self, level: EventLevel, message: impl AsRef<str>) {
        let message = message.as_ref();
        match level {
            EventLevel::Info => tracing::info!(event_level = %level, "{}", message),
            EventLevel::Warning => tracing::warn!(event_level = %level, "{}", message),
            EventLevel::Error | EventLevel::Critical => {
                tracing::error!(event_level = %level, "{}", message)
            }
        }

        let line = format!(
            "{} - {} - {}\n",
            chrono::Local::now().format(LINE_TIMESTAMP_FORMAT),
            level,
            message
        );
        let mut file = match self.file.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = file.write_all(line.as_bytes()).and_then(|_| file.flush()) {
            tracing::warn!(
                error = %e,
                operation = "event_log_append",
                path = %self.path.display(),
                "event log write failed"
            );
        }
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.append(EventLevel::Info, message);
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.append(EventLevel::Warning, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.append(EventLevel::Error, message);
    }

    pub fn critical(&self, message: impl AsRef<str>) {
        self.append(EventLevel::Critical, message);
    }

    /// Last `n` lines of the log file.
    pub fn recent(&self, n: usize) -> std::io::Result<Vec<String>> {
        read_tail(&self.path, n)
    }
}

/// Last `n` lines of `path` without terminators. A missing file is an empty log, not an error.
pub fn read_tail(path: impl AsRef<Path>, n: usize) -> std::io::Result<Vec<String>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    if n == 0 {
        return Ok(Vec::new());
    }
    let mut reader = BufReader::new(file);
    let mut tail = VecDeque::with_capacity(n);
    let mut buf = Vec::new();
    // Decoded lossily: a torn multi-byte write must not hide later lines.
    while reader.read_until(b'\n', &mut buf)? > 0 {
        let line = buf
            .strip_suffix(b"\n")
            .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
            .unwrap_or(&buf[..]);
        if tail.len() == n {
            tail.pop_front();
        }
        tail.push_back(String::from_utf8_lossy(line).into_owned());
        buf.clear();
    }
    Ok(tail.into())
}
