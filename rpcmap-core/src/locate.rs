//! Streaming file discovery with directory pruning.
//!
//! - Early directory pruning via `WalkDir::filter_entry` (excluded subtrees are
//!   never opened)
//! - Depth-first, lazy: paths are yielded as they are found so parsing can
//!   start before the walk finishes
//! - Unreadable directories are logged and skipped

use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::RpcmapError;

/// Whether a directory `name` matches an exclude `pattern`.
///
/// A pattern ending in `/` must equal the whole name (`bin/` prunes `bin`
/// but not `Cabinet`). Any other pattern matches when it occurs anywhere in
/// the name, so `.Tests` prunes both `Billing.Tests` and
/// `Billing.Tests.Integration`.
#[inline]
pub fn matches_exclude(name: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('/') {
        Some(exact) => name == exact,
        None => name.contains(pattern),
    }
}

/// Checks if a directory entry should be pruned (excluded from traversal).
///
/// The walk root itself is never pruned.
#[inline]
fn is_excluded_dir(entry: &walkdir::DirEntry, excludes: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.iter().any(|p| matches_exclude(name, p)))
}

/// Regular files and symlinks (links are not followed, so a link to a
/// directory is never descended into).
#[inline]
fn has_extension(entry: &walkdir::DirEntry, extension: &str) -> bool {
    !entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(extension))
}

/// Lazily yields every file under `root` whose name ends with `extension`.
///
/// Directories matching any of `excludes` (see [`matches_exclude`]) are
/// pruned entirely.
/// A traversal failure (permission error, missing root) is logged and the
/// affected subtree yields nothing.
pub fn locate<'a>(
    root: &Path,
    extension: &'a str,
    excludes: &'a [String],
) -> impl Iterator<Item = PathBuf> + 'a {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |e| !is_excluded_dir(e, excludes))
        .filter_map(move |entry| match entry {
            Ok(e) if has_extension(&e, extension) => Some(e.into_path()),
            Ok(_) => None,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                let err = RpcmapError::traversal(path, e.to_string());
                warn!(error = %err, "skipping unreadable subtree");
                None
            }
        })
}

/// Walks every root in order and sends matching paths into `output`.
///
/// Returns the number of paths sent. Stops early if the receiving side has
/// been dropped. The caller closes the queue by dropping `output`.
pub fn locate_into(
    roots: &[PathBuf],
    extension: &str,
    excludes: &[String],
    output: &Sender<PathBuf>,
) -> usize {
    let mut sent = 0;
    for root in roots {
        debug!(root = %root.display(), extension, "walking root");
        for path in locate(root, extension, excludes) {
            if output.send(path).is_err() {
                debug!("path queue closed by consumer, stopping walk");
                return sent;
            }
            sent += 1;
        }
    }
    sent
}
