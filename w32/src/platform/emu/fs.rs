//! Files and directories, backed by the host filesystem.
//!
//! The emulator keeps its own current directory so scripts can change it
//! without touching the process-wide one. Both `\` and `/` separate path
//! components.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use glob::{MatchOptions, Pattern};

use crate::constants::*;
use crate::error::{OsError, OsResult};
use crate::platform::{io_error_code, FileRequest, FileTime, FindData};

pub(super) struct FileSystem {
    cwd: Mutex<PathBuf>,
}

impl FileSystem {
    pub(super) fn new(cwd: PathBuf) -> Self {
        Self { cwd: Mutex::new(cwd) }
    }

    fn cwd(&self) -> MutexGuard<'_, PathBuf> {
        match self.cwd.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Absolute, lexically normalized form of `path`.
    pub(super) fn resolve(&self, path: &str) -> PathBuf {
        let native: String = path.chars().map(|c| if c == '\\' || c == '/' { MAIN_SEPARATOR } else { c }).collect();
        let p = Path::new(&native);
        let joined = if p.is_absolute() { p.to_path_buf() } else { self.cwd().join(p) };
        normalize(&joined)
    }

    /// Program names with a directory part resolve against the current
    /// directory; bare names are left for the `PATH` search.
    pub(super) fn resolve_program(&self, program: &str) -> PathBuf {
        if program.contains(['\\', '/']) {
            self.resolve(program)
        } else {
            PathBuf::from(program)
        }
    }

    pub(super) fn set_current_directory(&self, path: &str) -> OsResult<()> {
        if path.is_empty() {
            return Err(OsError(ERROR_INVALID_NAME));
        }
        let target = self.resolve(path);
        match fs::metadata(&target) {
            Ok(m) if m.is_dir() => {
                *self.cwd() = target;
                Ok(())
            }
            Ok(_) => Err(OsError(ERROR_DIRECTORY)),
            Err(e) => Err(io_error_code(&e)),
        }
    }

    pub(super) fn full_path(&self, path: &str) -> OsResult<String> {
        if path.is_empty() {
            return Err(OsError(ERROR_INVALID_NAME));
        }
        Ok(self.resolve(path).to_string_lossy().into_owned())
    }

    pub(super) fn open(&self, req: &FileRequest<'_>) -> io::Result<(File, PathBuf)> {
        let path = self.resolve(req.name);
        let mut options = OpenOptions::new();
        let write = req.access & (GENERIC_WRITE | GENERIC_ALL) != 0;
        options.read(req.access & (GENERIC_READ | GENERIC_ALL) != 0 || !write);
        options.write(write);
        match req.disposition {
            CREATE_NEW => {
                options.write(true).create_new(true);
            }
            CREATE_ALWAYS => {
                options.write(true).create(true).truncate(true);
            }
            OPEN_EXISTING => {}
            OPEN_ALWAYS => {
                options.write(true).create(true);
            }
            TRUNCATE_EXISTING => {
                options.write(true).truncate(true);
            }
            _ => return Err(io::Error::from(io::ErrorKind::InvalidInput)),
        }
        let file = options.open(&path)?;
        Ok((file, path))
    }

    /// Entries of the pattern's directory whose names match its last
    /// component, in name order.
    pub(super) fn list(&self, pattern: &str) -> OsResult<Vec<FindData>> {
        let split = pattern.rfind(['\\', '/']);
        let (dir, name) = match split {
            Some(i) => (&pattern[..i + 1], &pattern[i + 1..]),
            None => ("", pattern),
        };
        let dir = if dir.is_empty() { self.cwd().clone() } else { self.resolve(dir) };
        let matcher = wildcard(name).ok_or(OsError(ERROR_INVALID_NAME))?;
        let options = MatchOptions { case_sensitive: false, ..MatchOptions::new() };

        let entries = fs::read_dir(&dir).map_err(|_| OsError(ERROR_PATH_NOT_FOUND))?;
        let mut found = Vec::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !matcher.matches_with(&file_name, options) {
                continue;
            }
            let Ok(meta) = fs::metadata(entry.path()).or_else(|_| entry.metadata()) else {
                continue;
            };
            found.push(find_data(file_name, &meta));
        }
        if found.is_empty() {
            return Err(OsError(ERROR_FILE_NOT_FOUND));
        }
        found.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(found)
    }

    pub(super) fn temp_file_name(&self, dir: &str, prefix: &str, unique: u32) -> OsResult<(u32, String)> {
        let dir = self.resolve(dir);
        if !dir.is_dir() {
            return Err(OsError(ERROR_DIRECTORY));
        }
        let prefix: String = prefix.chars().take(3).collect();
        let name = |n: u32| dir.join(format!("{prefix}{:X}.TMP", n & 0xFFFF));
        if unique != 0 {
            return Ok((unique, name(unique).to_string_lossy().into_owned()));
        }
        let seed = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos()).unwrap_or(1);
        for step in 0..0x1_0000u32 {
            let n = ((seed.wrapping_add(step)) & 0xFFFF).max(1);
            let path = name(n);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok((n, path.to_string_lossy().into_owned())),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(io_error_code(&e)),
            }
        }
        Err(OsError(ERROR_FILE_EXISTS))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Translate a Win32 wildcard (`*`, `?`) into a glob pattern; every other
/// character matches literally.
fn wildcard(name: &str) -> Option<Pattern> {
    let name = if name == "*.*" { "*" } else { name };
    let mut glob = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '*' | '?' => glob.push(c),
            _ => glob.push_str(&Pattern::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    Pattern::new(&glob).ok()
}

fn find_data(file_name: String, meta: &Metadata) -> FindData {
    let mut attributes = if meta.is_dir() { FILE_ATTRIBUTE_DIRECTORY } else { FILE_ATTRIBUTE_ARCHIVE };
    if meta.permissions().readonly() {
        attributes |= FILE_ATTRIBUTE_READONLY;
    }
    let modified = meta.modified().unwrap_or(UNIX_EPOCH);
    FindData {
        attributes,
        creation_time: FileTime::from_system_time(meta.created().unwrap_or(modified)),
        last_access_time: FileTime::from_system_time(meta.accessed().unwrap_or(modified)),
        last_write_time: FileTime::from_system_time(modified),
        file_size: if meta.is_dir() { 0 } else { meta.len() },
        file_name,
        alternate_file_name: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wildcards_match_like_find_first_file() {
        let opts = MatchOptions { case_sensitive: false, ..MatchOptions::new() };
        let p = wildcard("*.TXT").unwrap();
        assert!(p.matches_with("notes.txt", opts));
        assert!(!p.matches_with("notes.md", opts));
        assert!(wildcard("*.*").unwrap().matches_with("README", opts));
        assert!(wildcard("a[1].log").unwrap().matches_with("a[1].log", opts));
        assert!(wildcard("data?.bin").unwrap().matches_with("data7.bin", opts));
    }

    #[test]
    fn relative_paths_resolve_against_own_cwd() {
        let root = std::env::temp_dir();
        let fs = FileSystem::new(root.clone());
        assert_eq!(fs.resolve("a\\b\\..\\c.txt"), root.join("a").join("c.txt"));
        assert_eq!(fs.resolve("./x"), root.join("x"));
    }
}
