//! Path admission: canonicalization and allowlist prefix checks.
//!
//! Admission decides, per request direction, whether a path opens a real
//! on-disk file, is rejected, or is silently virtualized. Known real paths
//! misused (wrong direction, symlink escape) are rejected; paths the server
//! has never been told about are virtualized so they cannot touch the host.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Direction of the requested access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Outcome of admitting one path.
#[derive(Debug)]
pub enum Admission {
    /// Open the real file at the canonicalized path.
    Real(PathBuf),
    /// Allowlist or traversal violation on a known real path.
    Denied(&'static str),
    /// Not covered by any allowlist; shadow with an anonymous backing.
    Virtual,
    /// The path names an existing directory.
    Directory,
}

/// Immutable pair of canonicalized path prefixes, one per direction.
#[derive(Debug, Default, Clone)]
pub struct Allowlist {
    read: Vec<PathBuf>,
    write: Vec<PathBuf>,
}

impl Allowlist {
    /// Canonicalize and store the prefixes. Entries that do not exist yet
    /// (declared output files) are resolved against their parent directory.
    pub fn new(read: Vec<PathBuf>, write: Vec<PathBuf>) -> io::Result<Self> {
        let mut canon_read = Vec::with_capacity(read.len());
        for p in read {
            canon_read.push(resolve_lenient(&p).ok_or_else(|| not_found(&p))?);
        }
        let mut canon_write = Vec::with_capacity(write.len());
        for p in write {
            canon_write.push(resolve_lenient(&p).ok_or_else(|| not_found(&p))?);
        }
        Ok(Self { read: canon_read, write: canon_write })
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty()
    }

    /// Entry counts, for startup logging.
    pub fn sizes(&self) -> (usize, usize) {
        (self.read.len(), self.write.len())
    }

    fn admits(&self, dir: Direction, path: &Path) -> bool {
        let list = match dir {
            Direction::Read => &self.read,
            Direction::Write => &self.write,
        };
        list.iter().any(|prefix| path.starts_with(prefix))
    }

    fn admits_any(&self, path: &Path) -> bool {
        self.admits(Direction::Read, path) || self.admits(Direction::Write, path)
    }

    /// Admit `path` for `dir`. See the module doc for the policy.
    pub fn admit(&self, path: &str, dir: Direction) -> Admission {
        let raw = Path::new(path);
        let lexical = normalize_lexical(raw);
        // the raw form keeps `..` components, so a prefix match here means
        // the name claims to live under an allowed prefix
        let raw_abs = absolutize(raw);
        let syntactic_hit = self.admits_any(&raw_abs) || self.admits_any(&lexical);

        match resolve_lenient(raw) {
            Some(canonical) => {
                if self.admits(dir, &canonical) {
                    // directory semantics only exist for admitted real paths;
                    // unknown names shadow a plain file whatever the host has
                    if canonical.is_dir() {
                        return Admission::Directory;
                    }
                    Admission::Real(canonical)
                } else if self.admits_any(&canonical) {
                    Admission::Denied("allowlist direction violation")
                } else if syntactic_hit {
                    // the name looked allowed but its resolution escapes
                    Admission::Denied("path escapes allowed prefix")
                } else {
                    Admission::Virtual
                }
            }
            None => {
                // nothing on disk to resolve against; the lexical form decides
                if self.admits(dir, &lexical) {
                    Admission::Real(lexical)
                } else if self.admits_any(&lexical) {
                    Admission::Denied("allowlist direction violation")
                } else if syntactic_hit {
                    Admission::Denied("path escapes allowed prefix")
                } else {
                    Admission::Virtual
                }
            }
        }
    }
}

fn not_found(p: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("allowlist entry {}: no such path", p.display()))
}

/// Canonicalize, falling back to canonical-parent + file name for paths that
/// do not exist yet. `None` when even the parent is unresolvable.
pub fn resolve_lenient(path: &Path) -> Option<PathBuf> {
    if let Ok(c) = path.canonicalize() {
        return Some(c);
    }
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty())?;
    let name = path.file_name()?;
    let canon_parent = parent.canonicalize().ok()?;
    Some(canon_parent.join(name))
}

/// Make a path absolute against the working directory without resolving any
/// of its components.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    }
}

/// Purely lexical normalization: make absolute against the working directory
/// and eliminate `.` / `..` without touching the filesystem.
pub fn normalize_lexical(path: &Path) -> PathBuf {
    let absolute = absolutize(path);

    let mut out = PathBuf::new();
    for component in absolute.components() {
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
