use crate::model::{FileType, Item, StorageTarget};
use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Used for music when no song-length database is available.
pub const DEFAULT_SID_LENGTH: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub path: String,
    pub files: Vec<Item>,
    pub subdirs: Vec<String>,
}

impl DirectoryListing {
    pub fn launchable(&self) -> impl Iterator<Item = &Item> {
        self.files
            .iter()
            .filter(|item| item.file_type.is_launchable())
    }
}

pub trait FileCache: Send {
    fn directory(&mut self, path: &str) -> Option<DirectoryListing>;
    fn random_file(
        &mut self,
        storage: StorageTarget,
        scope: &str,
        filter: &[FileType],
    ) -> Option<Item>;
    fn search(&mut self, query: &str, filter: &[FileType]) -> Vec<Item>;
    /// Bans the file for the rest of the session and for future sessions.
    fn mark_incompatible(&mut self, item: &Item) -> Result<()>;
}

/// File index built from a local mirror of the cartridge's storage.
pub struct LocalFileCache {
    root: PathBuf,
    items: Vec<Item>,
    directories: BTreeSet<String>,
    banned: HashSet<String>,
    ban_file: Option<PathBuf>,
    rng: SmallRng,
}

impl LocalFileCache {
    pub fn scan(root: &Path) -> Result<Self> {
        Self::scan_with_bans(root, None)
    }

    /// Scans `root` and applies (and later persists) the bans kept in
    /// `ban_file`.
    pub fn scan_with_bans(root: &Path, ban_file: Option<PathBuf>) -> Result<Self> {
        anyhow::ensure!(root.is_dir(), "{} is not a directory", root.display());

        let banned = match &ban_file {
            Some(path) => load_bans(path)?,
            None => HashSet::new(),
        };

        let mut directories = BTreeSet::from([String::from("/")]);
        let mut found = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
        {
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let remote = remote_path(relative);

            if entry.file_type().is_dir() {
                directories.insert(remote);
                continue;
            }

            let Some(file_type) = entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .and_then(FileType::from_extension)
            else {
                continue;
            };
            found.push((remote, file_type));
        }

        found.sort_by(|a, b| a.0.cmp(&b.0));
        let items: Vec<Item> = found
            .into_iter()
            .enumerate()
            .map(|(idx, (path, file_type))| {
                let mut item = Item::new(idx as u64, path, file_type);
                item.is_compatible = !banned.contains(&item.path);
                if file_type.is_music() {
                    item.play_length = Some(DEFAULT_SID_LENGTH);
                }
                item
            })
            .collect();

        info!(
            "indexed {} files in {} directories under {}",
            items.len(),
            directories.len(),
            root.display()
        );

        Ok(Self {
            root: root.to_path_buf(),
            items,
            directories,
            banned,
            ban_file,
            rng: rand::make_rng(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn persist_bans(&self) -> Result<()> {
        let Some(path) = &self.ban_file else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut banned: Vec<&String> = self.banned.iter().collect();
        banned.sort();
        let json = serde_json::to_string_pretty(&banned)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl FileCache for LocalFileCache {
    fn directory(&mut self, path: &str) -> Option<DirectoryListing> {
        let path = normalize_remote(path);
        if !self.directories.contains(&path) {
            debug!("no directory {path}");
            return None;
        }

        let files = self
            .items
            .iter()
            .filter(|item| parent_of(&item.path) == path)
            .cloned()
            .collect();
        let subdirs = self
            .directories
            .iter()
            .filter(|dir| dir.as_str() != "/" && parent_of(dir) == path)
            .cloned()
            .collect();

        Some(DirectoryListing {
            path,
            files,
            subdirs,
        })
    }

    fn random_file(
        &mut self,
        storage: StorageTarget,
        scope: &str,
        filter: &[FileType],
    ) -> Option<Item> {
        let scope = normalize_remote(scope);
        let mut candidates: Vec<&Item> = self
            .items
            .iter()
            .filter(|item| {
                item.is_compatible
                    && item.file_type.is_launchable()
                    && item.matches(filter)
                    && is_within(&item.path, &scope)
            })
            .collect();
        trace!(
            "random pick on {:?} from {} candidates under {scope}",
            storage,
            candidates.len()
        );

        candidates.shuffle(&mut self.rng);
        candidates.first().map(|item| (*item).clone())
    }

    fn search(&mut self, query: &str, filter: &[FileType]) -> Vec<Item> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        self.items
            .iter()
            .filter(|item| item.file_type.is_launchable() && item.matches(filter))
            .filter(|item| {
                let haystack = item.path.to_ascii_lowercase();
                terms.iter().all(|term| haystack.contains(term.as_str()))
            })
            .cloned()
            .collect()
    }

    fn mark_incompatible(&mut self, item: &Item) -> Result<()> {
        if !self.banned.insert(item.path.clone()) {
            return Ok(());
        }
        warn!("marking {} incompatible", item.path);
        for known in self.items.iter_mut().filter(|known| known.path == item.path) {
            known.is_compatible = false;
        }
        self.persist_bans()
    }
}

fn load_bans(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read ban list {}", path.display()))?;
    let banned: Vec<String> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse ban list {}", path.display()))?;
    Ok(banned.into_iter().collect())
}

fn remote_path(relative: &Path) -> String {
    let joined = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

pub fn normalize_remote(path: &str) -> String {
    let cleaned = path.trim().replace('\\', "/");
    let trimmed = cleaned.trim_matches('/');
    if trimmed.is_empty() {
        String::from("/")
    } else {
        format!("/{trimmed}")
    }
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn is_within(path: &str, scope: &str) -> bool {
    scope == "/"
        || path
            .strip_prefix(scope)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn library() -> tempfile::TempDir {
        let dir = tempdir().expect("tempdir");
        for file in [
            "music/hubbard/commando.sid",
            "music/hubbard/delta.sid",
            "music/galway/wizball.sid",
            "games/ik.crt",
            "games/elite.prg",
            "art/dragon.kla",
            "firmware/update.hex",
            "notes.txt",
        ] {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
            fs::write(&path, b"x").expect("write");
        }
        dir
    }

    #[test]
    fn scan_indexes_known_types_only() {
        let dir = library();
        let cache = LocalFileCache::scan(dir.path()).expect("scan");
        assert_eq!(cache.len(), 7);
        assert!(cache.items.iter().all(|item| item.path.starts_with('/')));

        let sid = cache
            .items
            .iter()
            .find(|item| item.path == "/music/galway/wizball.sid")
            .expect("sid indexed");
        assert_eq!(sid.play_length, Some(DEFAULT_SID_LENGTH));
    }

    #[test]
    fn directory_lists_files_and_subdirs() {
        let dir = library();
        let mut cache = LocalFileCache::scan(dir.path()).expect("scan");

        let listing = cache.directory("music/").expect("music dir");
        assert_eq!(listing.path, "/music");
        assert!(listing.files.is_empty());
        assert_eq!(listing.subdirs, vec!["/music/galway", "/music/hubbard"]);

        let listing = cache.directory("/music/hubbard").expect("hubbard dir");
        let names: Vec<&str> = listing.files.iter().map(Item::name).collect();
        assert_eq!(names, vec!["commando.sid", "delta.sid"]);

        assert!(cache.directory("/nowhere").is_none());
    }

    #[test]
    fn firmware_is_listed_but_not_launchable() {
        let dir = library();
        let mut cache = LocalFileCache::scan(dir.path()).expect("scan");
        let listing = cache.directory("/firmware").expect("firmware dir");
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.launchable().count(), 0);
    }

    #[test]
    fn random_respects_scope_and_filter() {
        let dir = library();
        let mut cache = LocalFileCache::scan(dir.path()).expect("scan");

        for _ in 0..20 {
            let pick = cache
                .random_file(StorageTarget::Sd, "/music/hubbard", &[FileType::Sid])
                .expect("pick");
            assert!(pick.path.starts_with("/music/hubbard/"));
        }

        let pick = cache
            .random_file(StorageTarget::Sd, "/", &[FileType::Kla])
            .expect("pick");
        assert_eq!(pick.path, "/art/dragon.kla");

        assert!(cache.random_file(StorageTarget::Sd, "/games", &[FileType::Sid]).is_none());
        assert!(cache.random_file(StorageTarget::Sd, "/mus", &[]).is_none());
    }

    #[test]
    fn search_requires_every_term() {
        let dir = library();
        let mut cache = LocalFileCache::scan(dir.path()).expect("scan");

        let found = cache.search("HUBBARD delta", &[]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "/music/hubbard/delta.sid");

        assert!(cache.search("hubbard", &[FileType::Crt]).is_empty());
        assert!(cache.search("   ", &[]).is_empty());
        assert!(cache.search("update", &[]).is_empty());
    }

    #[test]
    fn bans_exclude_random_picks_and_persist() {
        let dir = library();
        let bans = dir.path().join("state").join("incompatible.json");
        let mut cache =
            LocalFileCache::scan_with_bans(dir.path(), Some(bans.clone())).expect("scan");

        let kla = cache
            .random_file(StorageTarget::Sd, "/art", &[])
            .expect("pick");
        cache.mark_incompatible(&kla).expect("ban");
        assert!(cache.random_file(StorageTarget::Sd, "/art", &[]).is_none());

        let reloaded = LocalFileCache::scan_with_bans(dir.path(), Some(bans)).expect("rescan");
        let banned = reloaded
            .items
            .iter()
            .find(|item| item.path == "/art/dragon.kla")
            .expect("still indexed");
        assert!(!banned.is_compatible);
    }

    #[test]
    fn remote_paths_are_normalized() {
        assert_eq!(normalize_remote(""), "/");
        assert_eq!(normalize_remote("\\games\\"), "/games");
        assert_eq!(parent_of("/games/ik.crt"), "/games");
        assert_eq!(parent_of("/top.sid"), "/");
        assert!(is_within("/games/ik.crt", "/games"));
        assert!(!is_within("/gamesx/ik.crt", "/games"));
    }
}
