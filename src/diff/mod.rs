//! Diff Collector: the working tree's change set relative to a reference
//! revision, as a list of target paths plus a zero-context unified diff.
//!
//! Every query degrades to an empty result on failure. Nothing here returns
//! an error to the caller.

use git2::{Delta, Diff, DiffDelta, DiffFindOptions, DiffFormat, DiffOptions, Repository};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Paths considered changed, and the patch describing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSnapshot {
    pub targets: Vec<String>,
    pub patch: String,
}

/// Collect the change set for the repository containing `root`.
///
/// `exclude` is a directory relative to `root` whose contents are never
/// reported (the gate's own state directory).
pub fn collect(root: &Path, reference: &str, exclude: &Path) -> DiffSnapshot {
    let repo = match Repository::discover(root) {
        Ok(r) => r,
        Err(e) => {
            debug!(root = %root.display(), error = %e, "not a git repository");
            return DiffSnapshot::default();
        }
    };
    let Some(workdir) = repo.workdir().map(Path::to_path_buf) else {
        debug!("bare repository, no working tree to diff");
        return DiffSnapshot::default();
    };
    let collector = Collector {
        excluded: excluded_prefix(&workdir, root, exclude),
        repo,
    };
    collector.snapshot(reference)
}

/// Express `root/exclude` relative to the working directory, so it can be
/// compared against the repo-relative paths libgit2 reports.
fn excluded_prefix(workdir: &Path, root: &Path, exclude: &Path) -> Option<PathBuf> {
    let workdir = workdir.canonicalize().ok()?;
    let root = root.canonicalize().ok()?;
    let rel_root = root.strip_prefix(&workdir).ok()?;
    Some(rel_root.join(exclude))
}

/// The path a delta is reported under: the new side, or the old side for
/// deletions.
fn delta_path<'a>(delta: &DiffDelta<'a>) -> Option<&'a Path> {
    delta.new_file().path().or(delta.old_file().path())
}

struct Collector {
    repo: Repository,
    excluded: Option<PathBuf>,
}

impl Collector {
    fn snapshot(&self, reference: &str) -> DiffSnapshot {
        let tree_diff = self.reference_diff(reference);
        let untracked_diff = self.untracked_diff();

        let mut targets = match &tree_diff {
            Some(diff) => self.diff_paths(diff, |_| true),
            None => self.tracked_paths(),
        };
        if let Some(diff) = &untracked_diff {
            for path in self.diff_paths(diff, is_untracked) {
                if !targets.contains(&path) {
                    targets.push(path);
                }
            }
        }

        let mut fragments: Vec<String> = Vec::new();
        if let Some(diff) = &tree_diff {
            fragments.push(self.render_files(diff, |_| true).concat());
        }
        if let Some(diff) = &untracked_diff {
            fragments.extend(self.render_files(diff, is_untracked));
        }

        let patch = fragments
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
            .trim()
            .to_string();

        DiffSnapshot { targets, patch }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded
            .as_deref()
            .is_some_and(|prefix| path.starts_with(prefix))
    }

    fn keeps(&self, delta: &DiffDelta<'_>) -> bool {
        delta_path(delta).is_some_and(|p| !self.is_excluded(p))
    }

    /// Diff from the reference tree to the working tree (index included),
    /// with renames folded into one delta. `None` if the reference does not
    /// resolve (e.g. no commits yet).
    fn reference_diff(&self, reference: &str) -> Option<Diff<'_>> {
        let tree = match self
            .repo
            .revparse_single(reference)
            .and_then(|obj| obj.peel_to_tree())
        {
            Ok(t) => t,
            Err(e) => {
                debug!(reference, error = %e, "reference does not resolve");
                return None;
            }
        };
        let mut opts = DiffOptions::new();
        opts.context_lines(0);
        let mut diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))
            .map_err(|e| debug!(error = %e, "diffing against reference"))
            .ok()?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        if let Err(e) = diff.find_similar(Some(&mut find)) {
            debug!(error = %e, "detecting renames");
        }
        Some(diff)
    }

    /// Index-to-workdir diff carrying untracked, non-ignored files as
    /// creations (empty baseline). Other deltas in it are ignored.
    fn untracked_diff(&self) -> Option<Diff<'_>> {
        let mut opts = DiffOptions::new();
        opts.context_lines(0)
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true)
            .include_ignored(false);
        self.repo
            .diff_index_to_workdir(None, Some(&mut opts))
            .map_err(|e| debug!(error = %e, "listing untracked files"))
            .ok()
    }

    fn diff_paths(&self, diff: &Diff<'_>, select: fn(&DiffDelta<'_>) -> bool) -> Vec<String> {
        let mut paths = Vec::new();
        for delta in diff.deltas() {
            if !select(&delta) || !self.keeps(&delta) {
                continue;
            }
            let Some(path) = delta_path(&delta) else {
                continue;
            };
            let path = path_string(path);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Every path in the index. Used when there is no reference to diff
    /// against.
    fn tracked_paths(&self) -> Vec<String> {
        let index = match self.repo.index() {
            Ok(i) => i,
            Err(e) => {
                debug!(error = %e, "reading index");
                return Vec::new();
            }
        };
        let mut paths: Vec<String> = Vec::new();
        for entry in index.iter() {
            let path = String::from_utf8_lossy(&entry.path).into_owned();
            if self.is_excluded(Path::new(&path)) || paths.contains(&path) {
                continue;
            }
            paths.push(path);
        }
        paths
    }

    /// Render a diff as patch text, one string per selected file, skipping
    /// excluded files.
    fn render_files(&self, diff: &Diff<'_>, select: fn(&DiffDelta<'_>) -> bool) -> Vec<String> {
        let mut files: Vec<Vec<u8>> = Vec::new();
        let printed = diff.print(DiffFormat::Patch, |delta, _hunk, line| {
            if !select(&delta) || !self.keeps(&delta) {
                return true;
            }
            let origin = line.origin();
            // 'F' opens each file's header.
            if origin == 'F' || files.is_empty() {
                files.push(Vec::new());
            }
            if let Some(out) = files.last_mut() {
                if matches!(origin, '+' | '-' | ' ') {
                    out.push(origin as u8);
                }
                out.extend_from_slice(line.content());
            }
            true
        });
        if let Err(e) = printed {
            debug!(error = %e, "rendering diff");
            return Vec::new();
        }
        files
            .into_iter()
            .map(|f| String::from_utf8_lossy(&f).into_owned())
            .collect()
    }
}

fn is_untracked(delta: &DiffDelta<'_>) -> bool {
    delta.status() == Delta::Untracked
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
