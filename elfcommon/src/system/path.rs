use crate::prelude::*;

use std::path::{Path, PathBuf};

use super::Error;

/// Path extensions
pub trait PathExt: AsRef<Path> {
    /// Convert to an absolute path
    fn to_abs(&self) -> Result<PathBuf, Error> {
        let path = self.as_ref();
        dunce::canonicalize(path)
            .change_context_lazy(|| Error::Canonicalize(path.display().to_string()))
    }

    /// Convert to relative path from base, for display.
    ///
    /// Returns the path unchanged if it cannot be expressed relative to base
    fn rebase(&self, base: impl AsRef<Path>) -> PathBuf {
        let path = self.as_ref();
        pathdiff::diff_paths(path, base.as_ref()).unwrap_or_else(|| path.to_path_buf())
    }
}

impl PathExt for PathBuf {}
impl PathExt for Path {}
