//! Where relationship snapshots come from.
//!
//! Downloading snapshots is left to the caller; this crate only needs a
//! fully materialized list of lines for a snapshot tag.

use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use bzip2::read::BzDecoder;
use log::debug;

use crate::error::{Error, Result};

pub trait SnapshotSource {
    /// Raw serial-2 lines of snapshot `tag` (e.g. `20250801`).
    fn lines(&self, tag: &str) -> Result<Vec<String>>;
}

/// Snapshots stored in a local directory as `<tag>.as-rel2.txt.bz2` or
/// `<tag>.as-rel2.txt`, the naming CAIDA publishes serial-2 files under.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Candidate file names for `tag`, compressed first.
    pub fn candidates(&self, tag: &str) -> [PathBuf; 2] {
        [
            self.dir.join(format!("{}.as-rel2.txt.bz2", tag)),
            self.dir.join(format!("{}.as-rel2.txt", tag)),
        ]
    }
}

impl SnapshotSource for FileSource {
    fn lines(&self, tag: &str) -> Result<Vec<String>> {
        if tag.is_empty() || tag.contains(|c: char| c == '/' || c == '\\') || tag.contains("..") {
            return Err(Error::InvalidInput(format!("invalid snapshot tag {:?}", tag)));
        }

        let [compressed, plain] = self.candidates(tag);
        let path = if compressed.is_file() {
            compressed
        } else if plain.is_file() {
            plain
        } else {
            return Err(Error::io(
                plain,
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no snapshot {} in {}", tag, self.dir.display()),
                ),
            ));
        };

        debug!("reading snapshot {} from {}", tag, path.display());
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let mut content = Vec::new();
        let read = if path.extension().map_or(false, |ext| ext == "bz2") {
            BzDecoder::new(file).read_to_end(&mut content)
        } else {
            io::BufReader::new(file).read_to_end(&mut content)
        };
        read.map_err(|e| Error::io(&path, e))?;

        Ok(String::from_utf8_lossy(&content)
            .lines()
            .map(str::to_string)
            .collect())
    }
}
