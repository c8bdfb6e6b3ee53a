// src/utils/env.rs

use std::path::PathBuf;

/// Loads variables from a `.env` file found in the working directory or its parents.
///
/// Variables already set in the process environment win over the file. Returns the
/// path of the file that was loaded so the caller can log it once logging is up.
pub fn load_env() -> Result<Option<PathBuf>, dotenv::Error> {
    match dotenv::dotenv() {
        Ok(path) => Ok(Some(path)),
        // A missing file is the normal case in containers.
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
