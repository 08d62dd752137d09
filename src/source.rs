//! Access to route source files.

use log::debug;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Reads route source text by path.
///
/// The filesystem implementation is [`FsSourceReader`]; a `HashMap<PathBuf, String>` also
/// works as an in-memory reader, which is what the tests use.
pub trait SourceReader {
    fn read_source(&self, path: &Path) -> io::Result<String>;
}

/// Reads sources from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceReader;

impl SourceReader for FsSourceReader {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        debug!("Reading route source: {}", path.display());
        fs::read_to_string(path)
    }
}

impl SourceReader for HashMap<PathBuf, String> {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        self.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no source registered for {}", path.display()),
            )
        })
    }
}

impl<T: SourceReader + ?Sized> SourceReader for &T {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        (**self).read_source(path)
    }
}

/// Resolves an import specifier against the directory of the importing file.
pub fn resolve_relative(importing_file: &Path, specifier: &str) -> PathBuf {
    let dir = importing_file.parent().unwrap_or_else(|| Path::new(""));
    normalize(&dir.join(specifier))
}

/// Lexically removes `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_relative_sibling_and_parent() {
        let main = Path::new("/app/routes/main.ts");
        assert_eq!(
            resolve_relative(main, "./admin.ts"),
            PathBuf::from("/app/routes/admin.ts")
        );
        assert_eq!(
            resolve_relative(main, "../schemas/user.schema.ts"),
            PathBuf::from("/app/schemas/user.schema.ts")
        );
    }

    #[test]
    fn test_normalize_keeps_leading_parent_dirs() {
        assert_eq!(
            normalize(Path::new("../a/./b/../c.ts")),
            PathBuf::from("../a/c.ts")
        );
    }

    #[test]
    fn test_memory_reader_normalizes_lookup() {
        let mut sources = HashMap::new();
        sources.insert(PathBuf::from("/app/admin.ts"), "x".to_string());

        assert_eq!(
            sources.read_source(Path::new("/app/routes/../admin.ts")).unwrap(),
            "x"
        );
        assert!(sources.read_source(Path::new("/app/missing.ts")).is_err());
    }

    #[test]
    fn test_fs_reader() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("router.ts");
        fs::write(&file, "const r = new Router();").unwrap();

        assert_eq!(
            FsSourceReader.read_source(&file).unwrap(),
            "const r = new Router();"
        );
        assert!(FsSourceReader
            .read_source(&temp_dir.path().join("nope.ts"))
            .is_err());
    }
}
