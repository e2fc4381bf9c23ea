//! Test fixtures for workspace trees
//!
//! Helpers for building data roots, workspaces and template trees with
//! pinned modification times.

#![allow(dead_code)]

use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use tweakstage::device::Device;
use tweakstage::layout::AppLayout;
use tweakstage::workspace::Provisioner;

/// Write `contents` to `root/rel` and pin its mtime (unix seconds)
pub fn write(root: &Path, rel: &str, contents: &str, mtime: i64) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

pub fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

pub fn mtime(root: &Path, rel: &str) -> i64 {
    let meta = fs::metadata(root.join(rel)).unwrap();
    FileTime::from_last_modification_time(&meta).unix_seconds()
}

/// Relative paths of every regular file under `root`, sorted
pub fn files(root: &Path) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Relative path -> contents for every file under `root`
pub fn contents(root: &Path) -> BTreeMap<PathBuf, String> {
    files(root)
        .into_iter()
        .map(|rel| {
            let text = fs::read_to_string(root.join(&rel)).unwrap();
            (rel, text)
        })
        .collect()
}

pub fn device(identifier: &str, version: &str) -> Device {
    Device {
        identifier: identifier.to_string(),
        name: format!("Device {}", identifier),
        version: version.parse().unwrap(),
        is_tablet: false,
    }
}

/// A scratch data root with an (initially empty) template tree
pub struct DataRoot {
    pub dir: TempDir,
    pub layout: AppLayout,
}

impl DataRoot {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let layout = AppLayout::new(dir.path());
        fs::create_dir_all(layout.default_template_dir()).unwrap();
        Self { dir, layout }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn template(&self) -> PathBuf {
        self.layout.default_template_dir()
    }

    pub fn staging(&self) -> PathBuf {
        self.layout.staging_dir()
    }

    pub fn provisioner(&self) -> Provisioner {
        Provisioner::new(self.layout.clone(), self.template())
    }
}
