//! Content-sniffing file reader: peek a short prefix, decide text or binary, then read the
//! whole file once in that representation.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::FileContents;
use crate::error::FsError;
use crate::utils::config::ReaderConsts;

/// Control code points that do not occur in text: C0 controls other than tab, newline,
/// form feed, carriage return and escape, plus DEL and the C1 range.
pub fn is_binary_marker(c: char) -> bool {
    matches!(c,
        '\u{0000}'..='\u{0007}'
        | '\u{000B}'
        | '\u{000E}'..='\u{001A}'
        | '\u{001C}'..='\u{001F}'
        | '\u{007F}'..='\u{009F}')
}

/// True if `prefix` (decoded lossily) contains a binary marker.
pub fn looks_binary(prefix: &[u8]) -> bool {
    String::from_utf8_lossy(prefix).chars().any(is_binary_marker)
}

/// Read `path` as text or bytes depending on its first bytes.
pub fn read_file(path: &Path) -> Result<FileContents, FsError> {
    let mut file = File::open(path).map_err(|e| FsError::io(path, e))?;
    let size = file.metadata().map_err(|e| FsError::io(path, e))?.len();
    let peek_len = size.min(ReaderConsts::PEEK_LEN as u64) as usize;

    let mut prefix = vec![0u8; peek_len];
    file.read_exact(&mut prefix)
        .map_err(|e| FsError::io(path, e))?;
    let binary = looks_binary(&prefix);

    file.seek(SeekFrom::Start(0))
        .map_err(|e| FsError::io(path, e))?;
    let mut bytes = Vec::with_capacity(size as usize);
    file.read_to_end(&mut bytes)
        .map_err(|e| FsError::io(path, e))?;

    if binary {
        return Ok(FileContents::Binary(bytes));
    }
    // Text without markers in the prefix can still be invalid UTF-8 further in; keep the exact bytes then.
    Ok(match String::from_utf8(bytes) {
        Ok(text) => FileContents::Text(text),
        Err(e) => FileContents::Binary(e.into_bytes()),
    })
}

/// Read several files in order. A failure reports how many were read before it.
pub fn read_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<FileContents>, FsError> {
    let mut out = Vec::with_capacity(paths.len());
    for (completed, path) in paths.iter().enumerate() {
        match read_file(path.as_ref()) {
            Ok(c) => out.push(c),
            Err(e) if completed == 0 => return Err(e),
            Err(e) => {
                return Err(FsError::Batch {
                    completed,
                    source: Box::new(e),
                });
            }
        }
    }
    Ok(out)
}
