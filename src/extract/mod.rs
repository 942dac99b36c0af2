//! Dump extractor: expands a tar / tar.gz archive into ordered SQL file
//! contents. Member order is significant (schema before data is encoded by
//! the archive itself) and is never re-sorted here.

use crate::error::ExtractError;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tar::Archive;
use tracing::debug;

/// Default cap on cumulative extracted bytes (archive-bomb guard).
pub const DEFAULT_SIZE_LIMIT: u64 = 256 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One SQL statement file pulled out of the archive, in member order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFile {
    pub name: String,
    pub contents: String,
}

/// Reads the archive at `path`, transparently decompressing gzip, and
/// returns its SQL files in member order.
///
/// Rejects the whole archive (no partial result) when it is corrupt, when
/// cumulative member sizes exceed `size_limit`, or when no regular member
/// with non-empty contents exists.
pub fn extract_sql_files(path: &Path, size_limit: u64) -> Result<Vec<SqlFile>, ExtractError> {
    let reader: Box<dyn Read> = if is_gzip(path)? {
        debug!("archive is gzip-compressed, decompressing");
        Box::new(GzDecoder::new(File::open(path)?))
    } else {
        Box::new(File::open(path)?)
    };

    let mut archive = Archive::new(reader);
    let mut files = Vec::new();
    let mut total: u64 = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        // Check the bound before buffering the member, so an oversized
        // archive never allocates past it.
        total = total.saturating_add(entry.header().size()?);
        if total > size_limit {
            return Err(ExtractError::SizeLimit { limit: size_limit });
        }

        let name = entry
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| format!("member-{}", files.len()));

        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            continue;
        }

        files.push(SqlFile { name, contents });
    }

    if files.is_empty() {
        return Err(ExtractError::NoSqlMembers);
    }

    debug!(
        members = files.len(),
        bytes = total,
        "archive extracted in member order"
    );
    Ok(files)
}

fn is_gzip(path: &Path) -> Result<bool, io::Error> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        // Shorter than two bytes cannot be gzip; let the tar reader decide
        // whether it is anything at all.
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}
