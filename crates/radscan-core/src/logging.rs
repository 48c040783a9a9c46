//! A simple file-based logger for interaction debugging. Opt-in; the tool
//! keeps no on-disk state unless a log path is supplied.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

pub struct InteractionLogger {
    file: File,
}

impl InteractionLogger {
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(InteractionLogger { file })
    }

    pub fn log(&mut self, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(self.file, "[{}] {}", timestamp, message);
    }
}
