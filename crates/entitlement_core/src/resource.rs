//! Host-supplied lookup of configuration sources.
//!
//! # Responsibility
//! - Abstract "open this path" and "open this named resource" so the builder
//!   does not depend on where the host keeps its files.
//!
//! # Invariants
//! - `Ok(None)` means the source is absent; that is not an error.
//! - `Err` is reserved for sources that exist but cannot be opened.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

/// Opened configuration stream. Dropping it releases the underlying handle.
pub type ResourceStream = Box<dyn Read>;

/// Resolves configuration sources for the builder.
pub trait ResourceResolver {
    /// Opens the file at `path`, if it exists.
    fn resolve_path(&self, path: &Path) -> io::Result<Option<ResourceStream>>;

    /// Opens `name` from the resolver's default scope, if present.
    fn resolve_name(&self, name: &str) -> io::Result<Option<ResourceStream>>;
}

/// `Ok(None)` only when nothing exists at `path`; any other entry must be a
/// readable regular file.
fn open_if_exists(path: &Path) -> io::Result<Option<ResourceStream>> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(Some(Box::new(File::open(path)?))),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("`{}` is not a regular file", path.display()),
        )),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Filesystem resolver; named resources are searched in `search_dirs` order.
#[derive(Debug, Clone, Default)]
pub struct FsResourceResolver {
    search_dirs: Vec<PathBuf>,
}

impl FsResourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }
}

impl ResourceResolver for FsResourceResolver {
    fn resolve_path(&self, path: &Path) -> io::Result<Option<ResourceStream>> {
        open_if_exists(path)
    }

    fn resolve_name(&self, name: &str) -> io::Result<Option<ResourceStream>> {
        for dir in &self.search_dirs {
            if let Some(stream) = open_if_exists(&dir.join(name))? {
                return Ok(Some(stream));
            }
        }
        Ok(None)
    }
}

const DEFAULT_ENTITLEMENT_PROPERTIES: &str = include_str!("../resources/entitlement.properties");

/// In-memory named resources shipped with the binary.
///
/// Path lookups still go to the filesystem.
#[derive(Debug, Clone, Default)]
pub struct BundledResources {
    entries: BTreeMap<String, Vec<u8>>,
}

impl BundledResources {
    /// No bundled resources at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bundle holding the crate's default `entitlement.properties`.
    pub fn defaults() -> Self {
        Self::empty().with_resource(
            crate::config::settings::DEFAULT_CONFIG_FILE_NAME,
            DEFAULT_ENTITLEMENT_PROPERTIES,
        )
    }

    pub fn with_resource(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(name.into(), content.into());
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl ResourceResolver for BundledResources {
    fn resolve_path(&self, path: &Path) -> io::Result<Option<ResourceStream>> {
        open_if_exists(path)
    }

    fn resolve_name(&self, name: &str) -> io::Result<Option<ResourceStream>> {
        Ok(self
            .entries
            .get(name)
            .map(|content| Box::new(Cursor::new(content.clone())) as ResourceStream))
    }
}
