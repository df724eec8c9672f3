//! git::mock
//!
//! In-memory [`Backend`] for deterministic protocol tests.
//!
//! # Design
//!
//! Commits, branches and the index live in memory. The working tree is a real
//! directory, because the substitution engine reads and writes files on disk.
//! Reverts use a line-wise three-way merge: files whose line counts differ
//! between the three sides conflict as a whole, and changed hunks from both
//! sides conflict when they overlap or touch.
//!
//! ```
//! use confpatch::git::mock::MockRepo;
//! use confpatch::git::Backend;
//!
//! let dir = tempfile::TempDir::new().unwrap();
//! std::fs::write(dir.path().join("server.properties"), "motd={{ MOTD }}\n").unwrap();
//!
//! let repo = MockRepo::init(dir.path()).unwrap();
//! assert!(!repo.is_dirty().unwrap());
//! assert_eq!(repo.subjects(), vec!["Initial commit".to_string()]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{Backend, ResetMode};
use super::GitError;
use crate::core::filter::FileFilter;
use crate::core::types::Oid;

/// Relative path to file content.
type Tree = BTreeMap<PathBuf, Vec<u8>>;

#[derive(Debug, Clone)]
struct MockCommit {
    parents: Vec<Oid>,
    message: String,
    tree: Tree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Head {
    Branch(String),
    Detached(Oid),
}

#[derive(Debug)]
struct MockRepoInner {
    commits: BTreeMap<Oid, MockCommit>,
    branches: BTreeMap<String, Oid>,
    head: Head,
    index: Tree,
    next_id: u64,
    operations: Vec<MockOperation>,
}

/// Mutating calls, recorded in order for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Stage(Vec<PathBuf>),
    Commit(String),
    Reset(Oid, ResetMode),
    Revert(Oid),
    MoveBranch(Oid),
}

/// Mock repository with a single branch, `main`.
#[derive(Debug, Clone)]
pub struct MockRepo {
    work_dir: PathBuf,
    inner: Arc<Mutex<MockRepoInner>>,
}

pub const DEFAULT_BRANCH: &str = "main";

impl MockRepo {
    /// Create a repository whose root commit tracks every file under `work_dir`.
    pub fn init(work_dir: &Path) -> Result<Self, GitError> {
        let mut tree = Tree::new();
        collect_files(work_dir, work_dir, &mut tree)?;

        let repo = Self {
            work_dir: work_dir.to_path_buf(),
            inner: Arc::new(Mutex::new(MockRepoInner {
                commits: BTreeMap::new(),
                branches: BTreeMap::new(),
                head: Head::Branch(DEFAULT_BRANCH.to_string()),
                index: tree.clone(),
                next_id: 1,
                operations: Vec::new(),
            })),
        };

        let mut inner = repo.lock();
        let root = inner.allocate_oid()?;
        inner.commits.insert(
            root.clone(),
            MockCommit {
                parents: Vec::new(),
                message: "Initial commit".to_string(),
                tree,
            },
        );
        inner.branches.insert(DEFAULT_BRANCH.to_string(), root);
        drop(inner);

        Ok(repo)
    }

    fn lock(&self) -> MutexGuard<'_, MockRepoInner> {
        // A panic while holding the lock only happens in a failing test.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn relative(&self, path: &Path) -> Result<PathBuf, GitError> {
        if path.is_relative() {
            return Ok(path.to_path_buf());
        }
        path.strip_prefix(&self.work_dir)
            .map(Path::to_path_buf)
            .map_err(|_| GitError::OutsideWorkTree {
                path: path.to_path_buf(),
                work_dir: self.work_dir.clone(),
            })
    }

    // =========================================================================
    // Test helpers
    // =========================================================================

    /// Write `content` to `rel`, stage it and commit with `message`.
    pub fn commit_file(&self, rel: &str, content: &str, message: &str) -> Result<Oid, GitError> {
        let path = self.work_dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| GitError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, content).map_err(|source| GitError::Io {
            path: path.clone(),
            source,
        })?;
        self.stage(&[path])?;
        self.commit(message)
    }

    /// Point HEAD directly at its current commit.
    pub fn detach_head(&self) -> Result<(), GitError> {
        let head = self.head()?;
        self.lock().head = Head::Detached(head);
        Ok(())
    }

    /// Subjects along the first-parent chain from HEAD, newest first.
    pub fn subjects(&self) -> Vec<String> {
        let inner = self.lock();
        let mut out = Vec::new();
        let mut cursor = inner.head_oid();
        while let Some(commit) = cursor.as_ref().and_then(|oid| inner.commits.get(oid)) {
            out.push(first_line(&commit.message).to_string());
            cursor = commit.parents.first().cloned();
        }
        out
    }

    /// Number of commits ever created, including unreachable ones.
    pub fn commit_count(&self) -> usize {
        self.lock().commits.len()
    }

    /// Target of the `main` branch.
    pub fn branch_target(&self) -> Option<Oid> {
        self.lock().branches.get(DEFAULT_BRANCH).cloned()
    }

    /// Content of `rel` in the HEAD tree, as text.
    pub fn head_content(&self, rel: &str) -> Option<String> {
        let inner = self.lock();
        let head = inner.head_oid()?;
        inner
            .commits
            .get(&head)?
            .tree
            .get(Path::new(rel))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }
}

impl MockRepoInner {
    fn allocate_oid(&mut self) -> Result<Oid, GitError> {
        let id = self.next_id;
        self.next_id += 1;
        Ok(Oid::new(format!("{id:040x}"))?)
    }

    fn head_oid(&self) -> Option<Oid> {
        match &self.head {
            Head::Branch(name) => self.branches.get(name).cloned(),
            Head::Detached(oid) => Some(oid.clone()),
        }
    }

    fn require_head(&self) -> Result<Oid, GitError> {
        self.head_oid().ok_or_else(|| GitError::RefNotFound {
            refname: "HEAD".to_string(),
        })
    }

    fn commit(&self, oid: &Oid) -> Result<&MockCommit, GitError> {
        self.commits.get(oid).ok_or_else(|| GitError::ObjectNotFound {
            oid: oid.to_string(),
        })
    }

    fn set_head(&mut self, oid: Oid) {
        match &self.head {
            Head::Branch(name) => {
                self.branches.insert(name.clone(), oid);
            }
            Head::Detached(_) => self.head = Head::Detached(oid),
        }
    }

    fn add_commit(&mut self, message: &str, tree: Tree) -> Result<Oid, GitError> {
        let parent = self.require_head()?;
        let oid = self.allocate_oid()?;
        self.commits.insert(
            oid.clone(),
            MockCommit {
                parents: vec![parent],
                message: message.to_string(),
                tree,
            },
        );
        self.set_head(oid.clone());
        Ok(oid)
    }
}

impl Backend for MockRepo {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn head(&self) -> Result<Oid, GitError> {
        self.lock().require_head()
    }

    fn parent(&self, commit: &Oid) -> Result<Oid, GitError> {
        let inner = self.lock();
        inner
            .commit(commit)?
            .parents
            .first()
            .cloned()
            .ok_or_else(|| GitError::RootCommit {
                commit: commit.clone(),
            })
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        let inner = self.lock();
        let head = inner.require_head()?;
        if inner.commit(&head)?.tree != inner.index {
            return Ok(true);
        }
        for (rel, staged) in &inner.index {
            match fs::read(self.work_dir.join(rel)) {
                Ok(on_disk) if &on_disk == staged => {}
                _ => return Ok(true),
            }
        }
        Ok(false)
    }

    fn is_head_detached(&self) -> Result<bool, GitError> {
        Ok(matches!(self.lock().head, Head::Detached(_)))
    }

    fn tracked_files(&self, filter: &FileFilter) -> Result<Vec<PathBuf>, GitError> {
        let inner = self.lock();
        let head = inner.require_head()?;
        Ok(inner
            .commit(&head)?
            .tree
            .keys()
            .filter(|rel| filter.matches(rel))
            .map(|rel| self.work_dir.join(rel))
            .filter(|abs| abs.exists())
            .collect())
    }

    fn head_files(&self) -> Result<Vec<PathBuf>, GitError> {
        let inner = self.lock();
        let head = inner.require_head()?;
        Ok(inner
            .commit(&head)?
            .tree
            .keys()
            .map(|rel| self.work_dir.join(rel))
            .collect())
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        let mut inner = self.lock();
        for path in paths {
            let rel = self.relative(path)?;
            let abs = self.work_dir.join(&rel);
            match fs::read(&abs) {
                Ok(bytes) => {
                    inner.index.insert(rel, bytes);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    inner.index.remove(&rel);
                }
                Err(source) => return Err(GitError::Io { path: abs, source }),
            }
        }
        inner.operations.push(MockOperation::Stage(paths.to_vec()));
        Ok(())
    }

    fn commit(&self, subject: &str) -> Result<Oid, GitError> {
        let mut inner = self.lock();
        let tree = inner.index.clone();
        let oid = inner.add_commit(subject, tree)?;
        inner.operations.push(MockOperation::Commit(subject.to_string()));
        Ok(oid)
    }

    fn commit_subject(&self, commit: &Oid) -> Result<String, GitError> {
        let inner = self.lock();
        Ok(first_line(&inner.commit(commit)?.message).to_string())
    }

    fn resolve(&self, rev: &str) -> Result<Oid, GitError> {
        let inner = self.lock();
        let not_found = || GitError::RefNotFound {
            refname: rev.to_string(),
        };
        match rev {
            "HEAD" => inner.require_head(),
            "HEAD^" | "HEAD~1" => {
                let head = inner.require_head()?;
                inner
                    .commit(&head)?
                    .parents
                    .first()
                    .cloned()
                    .ok_or_else(not_found)
            }
            other => {
                if let Some(oid) = inner.branches.get(other) {
                    return Ok(oid.clone());
                }
                let oid = Oid::new(other).map_err(|_| not_found())?;
                inner.commit(&oid)?;
                Ok(oid)
            }
        }
    }

    fn reset(&self, target: &Oid, mode: ResetMode) -> Result<(), GitError> {
        let mut inner = self.lock();
        let tree = inner.commit(target)?.tree.clone();
        let previous_index = std::mem::take(&mut inner.index);
        inner.set_head(target.clone());

        inner.index = if mode.resets_index() {
            tree.clone()
        } else {
            previous_index.clone()
        };
        if mode.resets_working_tree() {
            checkout(&self.work_dir, &previous_index, &tree)?;
        }
        inner
            .operations
            .push(MockOperation::Reset(target.clone(), mode));
        Ok(())
    }

    fn revert(&self, commit: &Oid) -> Result<Oid, GitError> {
        let mut inner = self.lock();
        let reverted = inner.commit(commit)?.clone();
        let parent = reverted
            .parents
            .first()
            .ok_or_else(|| GitError::RootCommit {
                commit: commit.clone(),
            })?;
        let theirs = inner.commit(parent)?.tree.clone();
        let head = inner.require_head()?;
        let ours = inner.commit(&head)?.tree.clone();
        let base = &reverted.tree;

        let paths: BTreeSet<&PathBuf> = base.keys().chain(ours.keys()).chain(theirs.keys()).collect();
        let mut merged = Tree::new();
        let mut conflicts = Vec::new();
        for path in paths {
            match merge3(base.get(path), ours.get(path), theirs.get(path)) {
                Ok(Some(content)) => {
                    merged.insert(path.clone(), content);
                }
                Ok(None) => {}
                Err(()) => conflicts.push(path.display().to_string()),
            }
        }
        if !conflicts.is_empty() {
            return Err(GitError::RevertConflict {
                commit: commit.clone(),
                paths: conflicts,
            });
        }

        let message = format!(
            "Revert \"{}\"\n\nThis reverts commit {}.\n",
            first_line(&reverted.message),
            commit
        );
        let previous_index = std::mem::take(&mut inner.index);
        let oid = inner.add_commit(&message, merged.clone())?;
        checkout(&self.work_dir, &previous_index, &merged)?;
        inner.index = merged;
        inner.operations.push(MockOperation::Revert(commit.clone()));
        Ok(oid)
    }

    fn move_branch_ref(&self, target: &Oid) -> Result<(), GitError> {
        let mut inner = self.lock();
        inner.commit(target)?;
        match inner.head.clone() {
            Head::Branch(name) => {
                inner.branches.insert(name, target.clone());
                inner
                    .operations
                    .push(MockOperation::MoveBranch(target.clone()));
                Ok(())
            }
            Head::Detached(commit) => Err(GitError::DetachedHead { commit }),
        }
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("")
}

fn collect_files(root: &Path, dir: &Path, tree: &mut Tree) -> Result<(), GitError> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source| GitError::Io { path, source }
    };
    for entry in fs::read_dir(dir).map_err(io(dir))? {
        let path = entry.map_err(io(dir))?.path();
        if path.is_dir() {
            collect_files(root, &path, tree)?;
        } else {
            let bytes = fs::read(&path).map_err(io(&path))?;
            let rel = path.strip_prefix(root).map_err(|_| GitError::OutsideWorkTree {
                path: path.clone(),
                work_dir: root.to_path_buf(),
            })?;
            tree.insert(rel.to_path_buf(), bytes);
        }
    }
    Ok(())
}

/// Make tracked files on disk match `to`, deleting files only `from` tracked.
fn checkout(work_dir: &Path, from: &Tree, to: &Tree) -> Result<(), GitError> {
    for rel in from.keys().filter(|rel| !to.contains_key(*rel)) {
        let abs = work_dir.join(rel);
        if abs.exists() {
            fs::remove_file(&abs).map_err(|source| GitError::Io { path: abs, source })?;
        }
    }
    for (rel, bytes) in to {
        let abs = work_dir.join(rel);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).map_err(|source| GitError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&abs, bytes).map_err(|source| GitError::Io { path: abs, source })?;
    }
    Ok(())
}

/// Three-way merge of one path. `Ok(None)` means the path is absent.
fn merge3(
    base: Option<&Vec<u8>>,
    ours: Option<&Vec<u8>>,
    theirs: Option<&Vec<u8>>,
) -> Result<Option<Vec<u8>>, ()> {
    if ours == base {
        return Ok(theirs.cloned());
    }
    if theirs == base || ours == theirs {
        return Ok(ours.cloned());
    }
    let (Some(base), Some(ours), Some(theirs)) = (base, ours, theirs) else {
        return Err(());
    };

    let split = |bytes: &[u8]| -> Vec<Vec<u8>> {
        bytes
            .split_inclusive(|b| *b == b'\n')
            .map(<[u8]>::to_vec)
            .collect()
    };
    let (b, o, t) = (split(base.as_slice()), split(ours.as_slice()), split(theirs.as_slice()));
    if b.len() != o.len() || b.len() != t.len() {
        return Err(());
    }

    // Hunks from both sides that overlap or abut conflict, as in git.
    let ours_hunks = hunks(&b, &o);
    let theirs_hunks = hunks(&b, &t);
    for (os, oe) in &ours_hunks {
        for (ts, te) in &theirs_hunks {
            if os <= te && ts <= oe {
                let (start, end) = (*os.min(ts), *oe.max(te));
                if o[start..end] != t[start..end] {
                    return Err(());
                }
            }
        }
    }

    let mut out = Vec::with_capacity(ours.len());
    for ((b, o), t) in b.iter().zip(&o).zip(&t) {
        out.extend_from_slice(if o == b { t } else { o });
    }
    Ok(Some(out))
}

/// Half-open ranges of consecutive lines where `side` differs from `base`.
fn hunks(base: &[Vec<u8>], side: &[Vec<u8>]) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = Vec::new();
    for (i, (b, s)) in base.iter().zip(side).enumerate() {
        if b == s {
            continue;
        }
        match out.last_mut() {
            Some((_, end)) if *end == i => *end = i + 1,
            _ => out.push((i, i + 1)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_with(files: &[(&str, &str)]) -> (TempDir, MockRepo) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        let repo = MockRepo::init(dir.path()).unwrap();
        (dir, repo)
    }

    #[test]
    fn editing_a_tracked_file_makes_tree_dirty() {
        let (dir, repo) = repo_with(&[("a.yml", "x\n")]);
        assert!(!repo.is_dirty().unwrap());
        fs::write(dir.path().join("a.yml"), "y\n").unwrap();
        assert!(repo.is_dirty().unwrap());
    }

    #[test]
    fn untracked_files_do_not_count() {
        let (dir, repo) = repo_with(&[("a.yml", "x\n")]);
        fs::write(dir.path().join("new.yml"), "y\n").unwrap();
        assert!(!repo.is_dirty().unwrap());
        let tracked = repo.tracked_files(&FileFilter::all()).unwrap();
        assert_eq!(tracked, vec![dir.path().join("a.yml")]);
    }

    #[test]
    fn tracked_files_skip_deleted_and_filtered() {
        let (dir, repo) = repo_with(&[("a.yml", "x"), ("b.jar", "y"), ("c.txt", "z")]);
        fs::remove_file(dir.path().join("c.txt")).unwrap();
        let tracked = repo.tracked_files(&FileFilter::default()).unwrap();
        assert_eq!(tracked, vec![dir.path().join("a.yml")]);
    }

    #[test]
    fn hard_reset_restores_disk() {
        let (dir, repo) = repo_with(&[("a.yml", "x\n")]);
        let root = repo.head().unwrap();
        repo.commit_file("a.yml", "y\n", "change").unwrap();
        repo.commit_file("b.yml", "new\n", "add").unwrap();

        repo.reset(&root, ResetMode::Hard).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "x\n");
        assert!(!dir.path().join("b.yml").exists());
        assert!(!repo.is_dirty().unwrap());
    }

    #[test]
    fn soft_reset_keeps_index_staged() {
        let (_dir, repo) = repo_with(&[("a.yml", "x\n")]);
        let root = repo.head().unwrap();
        repo.commit_file("a.yml", "y\n", "change").unwrap();

        repo.reset(&root, ResetMode::Soft).unwrap();
        assert_eq!(repo.head().unwrap(), root);
        assert!(repo.is_dirty().unwrap());
    }

    #[test]
    fn revert_merges_line_wise() {
        let (dir, repo) = repo_with(&[("a.yml", "one\n#\ntwo\n")]);
        let change = repo.commit_file("a.yml", "ONE\n#\ntwo\n", "upper first").unwrap();
        repo.commit_file("a.yml", "ONE\n#\nTWO\n", "upper second").unwrap();

        repo.revert(&change).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "one\n#\nTWO\n");
        assert_eq!(repo.subjects()[0], "Revert \"upper first\"");
        assert!(!repo.is_dirty().unwrap());
    }

    #[test]
    fn revert_of_adjacent_lines_conflicts() {
        let (_dir, repo) = repo_with(&[("a.yml", "one\ntwo\n")]);
        let change = repo.commit_file("a.yml", "ONE\ntwo\n", "upper first").unwrap();
        let head = repo.commit_file("a.yml", "ONE\nTWO\n", "upper second").unwrap();

        let err = repo.revert(&change).unwrap_err();
        assert!(matches!(err, GitError::RevertConflict { ref paths, .. } if paths == &["a.yml"]));
        assert_eq!(repo.head().unwrap(), head);
    }

    #[test]
    fn revert_conflict_changes_nothing() {
        let (dir, repo) = repo_with(&[("a.yml", "one\n")]);
        let change = repo.commit_file("a.yml", "two\n", "two").unwrap();
        let head = repo.commit_file("a.yml", "three\n", "three").unwrap();

        let err = repo.revert(&change).unwrap_err();
        assert!(matches!(err, GitError::RevertConflict { ref paths, .. } if paths == &["a.yml"]));
        assert_eq!(repo.head().unwrap(), head);
        assert_eq!(fs::read_to_string(dir.path().join("a.yml")).unwrap(), "three\n");
    }

    #[test]
    fn move_branch_fails_when_detached() {
        let (_dir, repo) = repo_with(&[("a.yml", "x")]);
        let root = repo.head().unwrap();
        repo.commit_file("a.yml", "y", "next").unwrap();
        repo.detach_head().unwrap();
        assert!(repo.is_head_detached().unwrap());
        assert!(matches!(
            repo.move_branch_ref(&root),
            Err(GitError::DetachedHead { .. })
        ));
    }

    #[test]
    fn resolve_understands_head_parent() {
        let (_dir, repo) = repo_with(&[("a.yml", "x")]);
        let root = repo.head().unwrap();
        let next = repo.commit_file("a.yml", "y", "next").unwrap();
        assert_eq!(repo.resolve("HEAD").unwrap(), next);
        assert_eq!(repo.resolve("HEAD^").unwrap(), root);
        assert_eq!(repo.resolve(DEFAULT_BRANCH).unwrap(), next);
        assert!(matches!(repo.parent(&root), Err(GitError::RootCommit { .. })));
    }
}
