use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

const TIMESTAMP_FORMAT: &str = "[%Y-%m-%d %H:%M:%S]";

/// Append-only plain-text record of every exchange. Nothing reads it back.
#[derive(Debug, Clone)]
pub struct TranscriptLog {
    path: PathBuf,
}

impl TranscriptLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, user_input: &str, response: &str) -> Result<(), std::io::Error> {
        self.append_at(Local::now(), user_input, response)
    }

    pub fn append_at(
        &self,
        at: DateTime<Local>,
        user_input: &str,
        response: &str,
    ) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format_exchange(at, user_input, response).as_bytes())
    }
}

pub fn format_exchange(at: DateTime<Local>, user_input: &str, response: &str) -> String {
    let stamp = at.format(TIMESTAMP_FORMAT);
    format!("{stamp} User: {user_input}\n{stamp} AI: {response}\n\n")
}
