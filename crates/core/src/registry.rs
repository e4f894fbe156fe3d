//! Name-indexed, lazily materialised path storage.
//!
//! A [`PathRegistry`] maps logical names ("checkpoints", "logs") to absolute target paths under a
//! single root. Targets are computed once, at registration, and nothing is created on disk until
//! a name is looked up:
//!
//! ```text
//! register("ckpt")   ->  Registered    (target = <root>/ckpt, no I/O)
//! lookup("ckpt")     ->  Materialized  (create_dir_all(<root>/ckpt))
//! lookup("ckpt")     ->  Materialized  (create_dir_all is a no-op)
//! ```
//!
//! The `root` entry is always present, always first, and can never be replaced. Every other
//! entry may be replaced only when the registry was built with
//! [`RegistryOptions::allow_overwrite`]. A replaced entry keeps its original position in
//! iteration order; any directory created for the old target is left on disk untouched.
//!
//! Entries are stored in an [`IndexMap`] so that `describe` output and serialised blobs follow
//! insertion order.

use crate::builder::{AsSegment, PathBuilder, RunStamp, NO_SEGMENTS};
use crate::config::RegistryOptions;
use crate::constants::{DESCRIBE_PREFIX, ROOT_ENTRY_NAME};
use crate::{RegistryError, RegistryResult};
use artifactorium_types::EntryName;
use indexmap::IndexMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether an entry names a directory or a file.
///
/// Materialising a `File` entry creates its parent directory, never the file itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    #[default]
    Directory,
    File,
}

impl EntryKind {
    pub fn from_is_file(is_file: bool) -> Self {
        if is_file {
            Self::File
        } else {
            Self::Directory
        }
    }

    pub fn is_file(self) -> bool {
        matches!(self, Self::File)
    }
}

/// One registered logical name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathEntry {
    pub(crate) name: EntryName,
    pub(crate) target: PathBuf,
    pub(crate) kind: EntryKind,
}

impl PathEntry {
    pub fn name(&self) -> &EntryName {
        &self.name
    }

    /// Absolute target path, fixed at registration.
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// The directory that [`PathRegistry::lookup`] ensures exists for this entry.
    ///
    /// `None` only for a file entry whose target has no parent (a filesystem root).
    pub fn directory(&self) -> Option<&Path> {
        match self.kind {
            EntryKind::Directory => Some(&self.target),
            EntryKind::File => self.target.parent(),
        }
    }

    fn materialize(&self) -> RegistryResult<()> {
        let Some(dir) = self.directory() else {
            return Ok(());
        };
        fs::create_dir_all(dir).map_err(|source| RegistryError::Materialize {
            path: dir.to_path_buf(),
            source,
        })?;
        tracing::debug!("materialized '{}' at {}", self.name, dir.display());
        Ok(())
    }
}

/// The value returned by a lookup.
///
/// Registries built with [`RegistryOptions::stringify_results`] return [`ResolvedPath::Text`],
/// all others return [`ResolvedPath::Native`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedPath {
    Native(PathBuf),
    Text(String),
}

impl ResolvedPath {
    fn new(target: &Path, stringify: bool) -> Self {
        if stringify {
            Self::Text(target.to_string_lossy().into_owned())
        } else {
            Self::Native(target.to_path_buf())
        }
    }

    pub fn as_path(&self) -> &Path {
        match self {
            Self::Native(path) => path,
            Self::Text(text) => Path::new(text),
        }
    }

    pub fn into_path_buf(self) -> PathBuf {
        match self {
            Self::Native(path) => path,
            Self::Text(text) => PathBuf::from(text),
        }
    }

    /// Returns the string form, if this result was stringified.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Native(_) => None,
            Self::Text(text) => Some(text),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(path) => write!(f, "{}", path.display()),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Lazily materialising registry of named paths under one root.
#[derive(Clone, Debug)]
pub struct PathRegistry {
    builder: PathBuilder,
    options: RegistryOptions,
    entries: IndexMap<EntryName, PathEntry>,
}

impl PathRegistry {
    /// Creates a registry rooted at `root` joined with `root_segments`.
    ///
    /// No filesystem access occurs; the root directory is created on its first lookup.
    pub fn new<I>(root: impl AsRef<Path>, root_segments: I, options: RegistryOptions) -> RegistryResult<Self>
    where
        I: IntoIterator,
        I::Item: AsSegment,
    {
        Self::with_builder(PathBuilder::process(), root, root_segments, options)
    }

    /// Like [`PathRegistry::new`] but with an explicit builder (and therefore run stamp).
    pub fn with_builder<I>(
        builder: PathBuilder,
        root: impl AsRef<Path>,
        root_segments: I,
        options: RegistryOptions,
    ) -> RegistryResult<Self>
    where
        I: IntoIterator,
        I::Item: AsSegment,
    {
        let target = builder.build(root, root_segments)?;
        let root = PathEntry {
            name: EntryName::new(ROOT_ENTRY_NAME)?,
            target,
            kind: EntryKind::Directory,
        };

        let mut entries = IndexMap::new();
        entries.insert(root.name.clone(), root);

        Ok(Self {
            builder,
            options,
            entries,
        })
    }

    /// Creates a registry and registers each `(name, path)` pair in the order supplied.
    ///
    /// # Errors
    ///
    /// Fails on the first pair that [`PathRegistry::register`] would reject, for example a
    /// pair named `root` or a repeated name while overwrites are disallowed.
    pub fn with_entries<I, E, N, S>(
        root: impl AsRef<Path>,
        root_segments: I,
        options: RegistryOptions,
        entries: E,
    ) -> RegistryResult<Self>
    where
        I: IntoIterator,
        I::Item: AsSegment,
        E: IntoIterator<Item = (N, S)>,
        N: AsRef<str>,
        S: AsSegment,
    {
        let mut registry = Self::new(root, root_segments, options)?;
        for (name, path) in entries {
            registry.register(name.as_ref(), Some(path), NO_SEGMENTS, EntryKind::Directory)?;
        }
        Ok(registry)
    }

    /// Rebuilds a registry from already-resolved entries.
    ///
    /// The first entry must be the `root` directory; names must be unique and targets absolute.
    pub(crate) fn from_entries(
        builder: PathBuilder,
        options: RegistryOptions,
        loaded: Vec<PathEntry>,
    ) -> RegistryResult<Self> {
        match loaded.first() {
            Some(first) if first.name == ROOT_ENTRY_NAME && !first.is_file() => {}
            _ => {
                return Err(RegistryError::Deserialization(format!(
                    "first entry must be the '{ROOT_ENTRY_NAME}' directory"
                )))
            }
        }

        let mut entries = IndexMap::with_capacity(loaded.len());
        for entry in loaded {
            if !entry.target.is_absolute() {
                return Err(RegistryError::Deserialization(format!(
                    "target of '{}' is not absolute: {}",
                    entry.name,
                    entry.target.display()
                )));
            }
            let name = entry.name.clone();
            if entries.insert(name, entry).is_some() {
                return Err(RegistryError::Deserialization(
                    "duplicate entry name in registry data".into(),
                ));
            }
        }

        Ok(Self {
            builder,
            options,
            entries,
        })
    }

    /// Registers `name` at `<root>/<path>/<segments...>`.
    ///
    /// When `path` is `None` the name itself is used as the relative path, so registering
    /// `"logs"` places it at `<root>/logs`. `"NOW"` segments and `None` segments are handled
    /// as in [`PathBuilder::build`]. Nothing is created on disk.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::ReservedName`] if `name` is `root`, regardless of policy
    /// - [`RegistryError::PropertyAlreadySet`] if `name` exists and overwrites are disallowed
    /// - [`RegistryError::InvalidName`] if `name` is empty or whitespace-only
    pub fn register<P, I>(
        &mut self,
        name: &str,
        path: Option<P>,
        segments: I,
        kind: EntryKind,
    ) -> RegistryResult<&PathEntry>
    where
        P: AsSegment,
        I: IntoIterator,
        I::Item: AsSegment,
    {
        if name == ROOT_ENTRY_NAME {
            return Err(RegistryError::ReservedName(name.to_owned()));
        }
        let name = EntryName::new(name)?;

        let replacing = self.entries.contains_key(name.as_str());
        if replacing && !self.options.allow_overwrite {
            return Err(RegistryError::PropertyAlreadySet(name.into_string()));
        }

        let relative = path
            .as_ref()
            .and_then(AsSegment::as_segment)
            .unwrap_or_else(|| Path::new(name.as_str()));
        let target = self.builder.join(self.root().target().to_path_buf(), [relative]);
        let target = self.builder.join(target, segments);

        if replacing {
            tracing::warn!("overwriting registry entry '{}' with {}", name, target.display());
        } else {
            tracing::debug!("registered '{}' at {}", name, target.display());
        }

        // `insert_full` keeps an existing key in its original slot.
        let (index, _) = self.entries.insert_full(
            name.clone(),
            PathEntry { name, target, kind },
        );
        Ok(&self.entries[index])
    }

    /// Registers a directory entry whose relative path is its own name.
    pub fn register_dir(&mut self, name: &str) -> RegistryResult<&PathEntry> {
        self.register(name, None::<&str>, NO_SEGMENTS, EntryKind::Directory)
    }

    /// Registers a file entry at `<root>/<path>`.
    pub fn register_file(&mut self, name: &str, path: impl AsSegment) -> RegistryResult<&PathEntry> {
        self.register(name, Some(path), NO_SEGMENTS, EntryKind::File)
    }

    /// Index-style assignment: registers `name` as a directory at `<root>/<path>/<segments...>`.
    ///
    /// Subject to the same policy checks as [`PathRegistry::register`].
    pub fn set<I>(&mut self, name: &str, path: impl AsSegment, segments: I) -> RegistryResult<()>
    where
        I: IntoIterator,
        I::Item: AsSegment,
    {
        self.register(name, Some(path), segments, EntryKind::Directory)?;
        Ok(())
    }

    /// Resolves `name`, creating its directory on disk first.
    ///
    /// Directory entries have their target created; file entries have the target's parent
    /// created. Creation is recursive and succeeds when the directory already exists, so
    /// repeated lookups are harmless.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::UnknownProperty`] if `name` was never registered
    /// - [`RegistryError::Materialize`] if the directory cannot be created
    pub fn lookup(&self, name: &str) -> RegistryResult<ResolvedPath> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::UnknownProperty(name.to_owned()))?;
        entry.materialize()?;
        Ok(ResolvedPath::new(
            entry.target(),
            self.options.stringify_results,
        ))
    }

    /// Index-style read; identical to [`PathRegistry::lookup`].
    pub fn get(&self, name: &str) -> RegistryResult<ResolvedPath> {
        self.lookup(name)
    }

    /// Returns the entry for `name` without touching the filesystem.
    pub fn entry(&self, name: &str) -> Option<&PathEntry> {
        self.entries.get(name)
    }

    /// Returns the target for `name` without touching the filesystem.
    pub fn target(&self, name: &str) -> Option<&Path> {
        self.entry(name).map(PathEntry::target)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All entries in insertion order, `root` first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &PathEntry> + '_ {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a registry holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn root(&self) -> &PathEntry {
        &self.entries[ROOT_ENTRY_NAME]
    }

    pub fn options(&self) -> RegistryOptions {
        self.options
    }

    pub fn stamp(&self) -> &RunStamp {
        self.builder.stamp()
    }

    /// The lines emitted by [`PathRegistry::describe`]: a header, then one line per entry.
    pub fn describe_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.entries.len() + 1);
        lines.push(format!("{DESCRIBE_PREFIX} Created on {}", self.stamp()));
        lines.extend(self.entries().map(|entry| {
            format!(
                "{DESCRIBE_PREFIX} {}: {}",
                entry.name(),
                entry.target().display()
            )
        }));
        lines
    }

    /// Logs every entry in insertion order. Nothing is created or changed.
    pub fn describe(&self) {
        for line in self.describe_lines() {
            tracing::info!("{line}");
        }
    }
}

impl fmt::Display for PathRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.describe_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
