use crate::prelude::*;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::Error;

/// Open file for buffered reading
pub fn buf_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, Error> {
    let path = path.as_ref();
    let file =
        File::open(path).change_context_lazy(|| Error::ReadFile(path.display().to_string()))?;
    Ok(BufReader::new(file))
}

/// Read file as string
pub fn read_file(path: impl AsRef<Path>) -> Result<String, Error> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .change_context_lazy(|| Error::ReadFile(path.display().to_string()))
}

/// Read the whole file into memory
pub fn read_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>, Error> {
    let path = path.as_ref();
    verboseln!("reading '{}'", path.display());
    std::fs::read(path).change_context_lazy(|| Error::ReadFile(path.display().to_string()))
}

/// Read a list file: one entry per line, blank lines and `#` comments skipped
pub fn read_list(path: impl AsRef<Path>) -> Result<Vec<String>, Error> {
    let path = path.as_ref();
    let reader = buf_reader(path)?;
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line.change_context_lazy(|| Error::ReadFile(path.display().to_string()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        out.push(line.to_string());
    }
    Ok(out)
}

/// Expand `path` into the files it contains.
///
/// A file is returned as-is. A directory is walked recursively and
/// every regular file under it accepted by `filter` is returned, in
/// sorted order.
pub fn find_files(
    path: impl AsRef<Path>,
    filter: impl Fn(&Path) -> bool,
) -> Result<Vec<PathBuf>, Error> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry =
            entry.change_context_lazy(|| Error::WalkDirectory(path.display().to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if filter(entry.path()) {
            out.push(entry.into_path());
        } else {
            verboseln!("skipping '{}'", entry.path().display());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_list_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sdk.syms");
        std::fs::write(&path, "# provided by the sdk\nmalloc\n\n  free  \n#memcpy\n").unwrap();
        assert_eq!(read_list(&path).unwrap(), vec!["malloc", "free"]);
    }

    #[test]
    fn find_files_walks_directories_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("b.o"), "b").unwrap();
        std::fs::write(dir.path().join("a.o"), "a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();
        std::fs::write(dir.path().join("nested").join("c.o"), "c").unwrap();

        let files = find_files(dir.path(), |p| {
            p.extension().is_some_and(|ext| ext == "o")
        })
        .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.rebase(dir.path()).display().to_string())
            .collect();
        assert_eq!(names, vec!["a.o", "b.o", "nested/c.o"]);
    }

    #[test]
    fn find_files_returns_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.o");
        std::fs::write(&path, "x").unwrap();
        assert_eq!(find_files(&path, |_| false).unwrap(), vec![path]);
    }

    #[test]
    fn read_missing_file_reports_path() {
        let err = read_bytes("/definitely/not/here.o").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.o"));
    }
}
