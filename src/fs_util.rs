use std::fs;
use std::io::{self, BufReader, Read, Write};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;

use crate::error::CountMatrixError;

/// Opens an input table, decompressing it when the name ends in `.gz`.
pub fn open_input(path: &Utf8Path) -> Result<Box<dyn Read>, CountMatrixError> {
    let file = fs::File::open(path.as_std_path()).map_err(|err| CountMatrixError::InputOpen {
        path: path.as_std_path().to_path_buf(),
        message: err.to_string(),
    })?;
    let reader = BufReader::new(file);
    if path.extension() == Some("gz") {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Writes `content` next to `dest` in a temp file and renames it into place.
pub fn write_atomic(dest: &Utf8Path, content: &[u8]) -> Result<(), CountMatrixError> {
    let parent = dest
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| CountMatrixError::Filesystem(format!("create {parent}: {err}")))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".kira-cm")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| CountMatrixError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .and_then(|_| temp.flush())
        .map_err(|err| CountMatrixError::Filesystem(format!("write {dest}: {err}")))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| CountMatrixError::Filesystem(format!("persist {dest}: {}", err.error)))?;
    Ok(())
}

pub fn read_to_string(path: &Utf8Path) -> Result<String, CountMatrixError> {
    let mut content = String::new();
    open_input(path)?
        .read_to_string(&mut content)
        .map_err(|err: io::Error| CountMatrixError::InputOpen {
            path: path.as_std_path().to_path_buf(),
            message: err.to_string(),
        })?;
    Ok(content)
}
