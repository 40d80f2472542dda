use anyhow::Result;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

pub trait Logger: Send + Sync {
    fn start(&self, _src: &Path, _dst: &Path) {}
    fn resume(&self, _dst: &Path, _offset: u64) {}
    fn done(&self, _dst: &Path, _bytes: u64, _seconds: f64) {}
    fn warn(&self, _context: &str, _msg: &str) {}
    fn error(&self, _context: &str, _msg: &str) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

pub struct TextLogger {
    file: Mutex<File>,
}

impl TextLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn line(&self, s: &str) {
        if let Ok(mut f) = self.file.lock() {
            let _ = writeln!(f, "[{}] {}", Utc::now().to_rfc3339(), s);
        }
    }
}

impl Logger for TextLogger {
    fn start(&self, src: &Path, dst: &Path) {
        self.line(&format!("START src={} dst={}", src.display(), dst.display()));
    }
    fn resume(&self, dst: &Path, offset: u64) {
        self.line(&format!("RESUME dst={} offset={}", dst.display(), offset));
    }
    fn done(&self, dst: &Path, bytes: u64, seconds: f64) {
        self.line(&format!(
            "DONE dst={} bytes={bytes} seconds={seconds:.3}",
            dst.display()
        ));
    }
    fn warn(&self, context: &str, msg: &str) {
        self.line(&format!("WARN ctx={context} msg={msg}"));
    }
    fn error(&self, context: &str, msg: &str) {
        self.line(&format!("ERROR ctx={context} msg={msg}"));
    }
}
