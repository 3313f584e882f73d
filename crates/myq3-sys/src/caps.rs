// caps.rs — standard capability implementations for the shell build
//
// The engine only sees the traits; these are the stdout / std::fs /
// Instant-backed versions the binary wires in. Tests use the in-memory
// fakes from myq3-common instead.

use myq3_common::engine_api::{Clock, Console, FileSystem, FS_SEEK_CUR, FS_SEEK_END};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// ============================================================
// Console
// ============================================================

pub struct StdConsole;

impl Console for StdConsole {
    fn print(&self, msg: &str) {
        print!("{}", msg);
        let _ = std::io::stdout().flush();
    }
    fn warn(&self, msg: &str) {
        eprint!("WARNING: {}", msg);
    }
    fn error(&self, msg: &str) {
        eprint!("ERROR: {}", msg);
    }
}

// ============================================================
// File system rooted at a base directory
// ============================================================

pub struct StdFileSystem {
    base: PathBuf,
    handles: RefCell<HashMap<i32, File>>,
    next_handle: RefCell<i32>,
}

impl StdFileSystem {
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
            handles: RefCell::new(HashMap::new()),
            next_handle: RefCell::new(1),
        }
    }

    /// Game paths always use forward slashes and never escape the base.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        if path.contains("..") || path.starts_with('/') || path.contains(':') {
            return None;
        }
        Some(self.base.join(path))
    }

    fn store(&self, file: File) -> i32 {
        let mut next = self.next_handle.borrow_mut();
        let handle = *next;
        *next += 1;
        self.handles.borrow_mut().insert(handle, file);
        handle
    }
}

impl FileSystem for StdFileSystem {
    fn open_read(&self, path: &str) -> Option<(i32, i32)> {
        let full = self.resolve(path)?;
        let file = File::open(full).ok()?;
        let len = file.metadata().ok()?.len() as i32;
        Some((self.store(file), len))
    }

    fn open_write(&self, path: &str) -> Option<i32> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(full)
            .ok()?;
        Some(self.store(file))
    }

    fn read(&self, handle: i32, len: usize) -> Vec<u8> {
        let mut handles = self.handles.borrow_mut();
        let file = match handles.get_mut(&handle) {
            Some(f) => f,
            None => return Vec::new(),
        };
        let mut buf = vec![0u8; len];
        match file.read(&mut buf) {
            Ok(n) => {
                buf.truncate(n);
                buf
            }
            Err(_) => Vec::new(),
        }
    }

    fn write(&self, handle: i32, data: &[u8]) -> usize {
        let mut handles = self.handles.borrow_mut();
        match handles.get_mut(&handle) {
            Some(f) => f.write(data).unwrap_or(0),
            None => 0,
        }
    }

    fn close(&self, handle: i32) {
        self.handles.borrow_mut().remove(&handle);
    }

    fn seek(&self, handle: i32, offset: i32, origin: i32) -> i32 {
        let mut handles = self.handles.borrow_mut();
        let file = match handles.get_mut(&handle) {
            Some(f) => f,
            None => return -1,
        };
        let pos = match origin {
            FS_SEEK_CUR => SeekFrom::Current(offset as i64),
            FS_SEEK_END => SeekFrom::End(offset as i64),
            _ => SeekFrom::Start(offset.max(0) as u64),
        };
        match file.seek(pos) {
            Ok(_) => 0,
            Err(_) => -1,
        }
    }

    fn list_dir(&self, path: &str, ext: &str) -> Vec<String> {
        let full = match self.resolve(path) {
            Some(p) => p,
            None => return Vec::new(),
        };
        let entries = match std::fs::read_dir(full) {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| name.ends_with(ext))
            .collect();
        names.sort();
        names
    }

    fn load(&self, path: &str) -> Option<Vec<u8>> {
        std::fs::read(self.resolve(path)?).ok()
    }
}

// ============================================================
// Clock
// ============================================================

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn milliseconds(&self) -> i32 {
        self.start.elapsed().as_millis() as i32
    }
    fn real_time(&self) -> i32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i32)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_rejects_escapes() {
        let fs = StdFileSystem::new(Path::new("/tmp/myq3-test"));
        assert!(fs.resolve("../etc/passwd").is_none());
        assert!(fs.resolve("/etc/passwd").is_none());
        assert!(fs.resolve("maps/q3dm17.bsp").is_some());
    }

    #[test]
    fn test_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.milliseconds();
        let b = clock.milliseconds();
        assert!(b >= a);
    }
}
