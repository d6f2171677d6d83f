//! On-disk append log.
//!
//! The file is opened fresh for every operation (open-append-close, or
//! write-temp-then-rename for compaction); no descriptor outlives a call.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};

/// Extension that marks a gzip-compressed log.
const GZIP_EXTENSION: &str = "gz";

/// Handle to the log file backing a store.
#[derive(Debug, Clone)]
pub struct AppendLog {
    path: PathBuf,
}

impl AppendLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Gzip logs are replayed transparently but never written to.
    pub fn is_compressed(&self) -> bool {
        self.path.extension().and_then(|e| e.to_str()) == Some(GZIP_EXTENSION)
    }

    /// Read every line in file order, without line terminators.
    ///
    /// A line that is not valid UTF-8 is a `CorruptLog` naming that line.
    pub fn read_lines(&self) -> StoreResult<Vec<String>> {
        let file = File::open(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let reader: Box<dyn Read> = if self.is_compressed() {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let mut lines = Vec::new();
        for (idx, raw) in BufReader::new(reader).split(b'\n').enumerate() {
            let mut raw = raw.map_err(|e| StoreError::io(&self.path, e))?;
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8(raw).map_err(|e| StoreError::CorruptLog {
                path: self.path.clone(),
                line: idx + 1,
                reason: format!("invalid UTF-8: {}", e.utf8_error()),
            })?;
            lines.push(line);
        }
        Ok(lines)
    }

    /// Append one line, creating the file on first use.
    pub fn append(&self, line: &str) -> StoreResult<()> {
        let mut file = open_for_append(&self.path).map_err(|e| StoreError::io(&self.path, e))?;

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes())
            .map_err(|e| StoreError::io(&self.path, e))
    }

    /// Atomically replace the whole file with `lines`.
    ///
    /// The lines go to a temp file in the same directory, which is synced and
    /// renamed over the log. A failure leaves the previous file in place.
    pub fn rewrite<I>(&self, lines: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = String>,
    {
        let dir = parent_dir(&self.path);
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;

        {
            let mut writer = std::io::BufWriter::new(tmp.as_file_mut());
            for line in lines {
                writer
                    .write_all(line.as_bytes())
                    .and_then(|()| writer.write_all(b"\n"))
                    .map_err(|e| StoreError::io(&self.path, e))?;
            }
            writer.flush().map_err(|e| StoreError::io(&self.path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io(&self.path, e))?;

        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;
        Ok(())
    }

    /// Remove the file if it exists.
    pub fn remove(&self) -> StoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn open_for_append(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .append(true)
        .create(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_for_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().append(true).create(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    #[test]
    fn append_creates_file_lazily() {
        let tmp = TempDir::new().unwrap();
        let log = AppendLog::new(tmp.path().join("users.tsv"));
        assert!(!log.exists());

        log.append("angela\th1").unwrap();
        log.append("DELETE\tangela").unwrap();

        assert!(log.exists());
        assert_eq!(log.read_lines().unwrap(), vec!["angela\th1", "DELETE\tangela"]);
    }

    #[test]
    fn rewrite_replaces_contents() {
        let tmp = TempDir::new().unwrap();
        let log = AppendLog::new(tmp.path().join("roles.tsv"));
        log.append("admin\tjames").unwrap();
        log.append("DELETE\tadmin").unwrap();

        log.rewrite(vec!["user\tangela james".to_string()]).unwrap();

        assert_eq!(log.read_lines().unwrap(), vec!["user\tangela james"]);
    }

    #[test]
    fn reads_gzip_logs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("users.tsv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"carol\thash1\nrobert\thash2\n").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let log = AppendLog::new(&path);
        assert!(log.is_compressed());
        assert_eq!(log.read_lines().unwrap(), vec!["carol\thash1", "robert\thash2"]);
    }

    #[test]
    fn invalid_utf8_names_the_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("users.tsv");
        std::fs::write(&path, b"robert\th0\r\ncarol\th\xff1\n").unwrap();

        let err = AppendLog::new(&path).read_lines().unwrap_err();
        assert!(matches!(err, StoreError::CorruptLog { line: 2, .. }));
        assert!(err.to_string().contains("invalid UTF-8"));
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("users.tsv");
        std::fs::write(&path, "robert\th0\r\ncarol\th1").unwrap();

        assert_eq!(
            AppendLog::new(&path).read_lines().unwrap(),
            vec!["robert\th0", "carol\th1"]
        );
    }

    #[test]
    fn reading_a_missing_file_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        let log = AppendLog::new(tmp.path().join("missing"));
        assert!(matches!(log.read_lines(), Err(StoreError::Io { .. })));
        log.remove().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn appended_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let log = AppendLog::new(tmp.path().join("users.tsv"));
        log.append("carol\thash1").unwrap();
        let mode = std::fs::metadata(log.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
