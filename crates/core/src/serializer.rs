//! Persistence of a registry's name→target mapping.
//!
//! A registry is stored as one JSON document:
//!
//! ```text
//! {"entries":[
//!     {"name":"root","target":"/runs/artifactory","kind":"directory"},
//!     {"name":"ckpt","target":"/runs/artifactory/ckpt","kind":"directory"},
//!     {"name":"log","target":"/runs/artifactory/log.txt","kind":"file"}
//! ]}
//! ```
//!
//! Entries are written in insertion order and restored in the same order. Policy flags are not
//! stored; they are supplied again when loading. Materialisation state is not stored either:
//! every entry of a loaded registry starts out registered, and the first lookup re-runs the
//! (idempotent) directory creation.
//!
//! `kind` is optional on input and defaults to `directory`, so name→target-only documents load.
//!
//! Targets that are valid UTF-8 are stored as strings. Any other target is stored as an array
//! of its raw OS units (bytes on Unix, UTF-16 code units on Windows) so it restores exactly.

use crate::builder::PathBuilder;
use crate::config::RegistryOptions;
use crate::registry::{EntryKind, PathEntry, PathRegistry};
use crate::{RegistryError, RegistryResult};
use artifactorium_types::EntryName;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(serde::Serialize)]
struct RegistryDocumentRef<'a> {
    entries: Vec<EntryRecordRef<'a>>,
}

#[derive(serde::Serialize)]
struct EntryRecordRef<'a> {
    name: &'a EntryName,
    #[serde(serialize_with = "os_path::serialize")]
    target: &'a Path,
    kind: EntryKind,
}

#[derive(serde::Deserialize)]
struct RegistryDocument {
    entries: Vec<EntryRecord>,
}

#[derive(serde::Deserialize)]
struct EntryRecord {
    name: EntryName,
    #[serde(deserialize_with = "os_path::deserialize")]
    target: PathBuf,
    #[serde(default)]
    kind: EntryKind,
}

/// Lossless path encoding: a string when the path is UTF-8, raw OS units otherwise.
mod os_path {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    #[cfg(not(windows))]
    type RawUnit = u8;
    #[cfg(windows)]
    type RawUnit = u16;

    #[derive(Serialize)]
    #[serde(untagged)]
    enum EncodedRef<'a> {
        Text(&'a str),
        Raw(Vec<RawUnit>),
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Encoded {
        Text(String),
        Raw(Vec<RawUnit>),
    }

    pub(super) fn serialize<S>(path: &&Path, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = match path.to_str() {
            Some(text) => EncodedRef::Text(text),
            None => EncodedRef::Raw(to_raw(path).ok_or_else(|| {
                <S::Error as serde::ser::Error>::custom("path contains invalid UTF-8 characters")
            })?),
        };
        encoded.serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Encoded::deserialize(deserializer)? {
            Encoded::Text(text) => Ok(PathBuf::from(text)),
            Encoded::Raw(raw) => from_raw(raw)
                .map(PathBuf::from)
                .ok_or_else(|| {
                    <D::Error as serde::de::Error>::custom("raw path encoding is not supported")
                }),
        }
    }

    #[cfg(unix)]
    fn to_raw(path: &Path) -> Option<Vec<RawUnit>> {
        use std::os::unix::ffi::OsStrExt;
        Some(path.as_os_str().as_bytes().to_vec())
    }

    #[cfg(unix)]
    fn from_raw(raw: Vec<RawUnit>) -> Option<OsString> {
        use std::os::unix::ffi::OsStringExt;
        Some(OsString::from_vec(raw))
    }

    #[cfg(windows)]
    fn to_raw(path: &Path) -> Option<Vec<RawUnit>> {
        use std::os::windows::ffi::OsStrExt;
        Some(path.as_os_str().encode_wide().collect())
    }

    #[cfg(windows)]
    fn from_raw(raw: Vec<RawUnit>) -> Option<OsString> {
        use std::os::windows::ffi::OsStringExt;
        Some(OsString::from_wide(&raw))
    }

    // Every path is UTF-8 on the remaining targets, so the raw form never appears there.
    #[cfg(not(any(unix, windows)))]
    fn to_raw(_path: &Path) -> Option<Vec<RawUnit>> {
        None
    }

    #[cfg(not(any(unix, windows)))]
    fn from_raw(_raw: Vec<RawUnit>) -> Option<OsString> {
        None
    }
}

/// Where [`load`] reads registry data from.
#[derive(Clone, Copy, Debug)]
pub enum Source<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
}

/// Serialises `registry` to an in-memory blob.
pub fn to_bytes(registry: &PathRegistry) -> RegistryResult<Vec<u8>> {
    let document = RegistryDocumentRef {
        entries: registry
            .entries()
            .map(|entry| EntryRecordRef {
                name: entry.name(),
                target: entry.target(),
                kind: entry.kind(),
            })
            .collect(),
    };
    serde_json::to_vec(&document).map_err(RegistryError::Serialization)
}

/// Serialises `registry` to the file at `destination`, creating or truncating it.
///
/// Serialisation happens before the file is opened, so a registry that cannot be encoded
/// leaves an existing destination untouched.
pub fn dump_to(registry: &PathRegistry, destination: &Path) -> RegistryResult<()> {
    let bytes = to_bytes(registry)?;
    let mut file = File::create(destination).map_err(RegistryError::FileWrite)?;
    file.write_all(&bytes).map_err(RegistryError::FileWrite)?;
    file.flush().map_err(RegistryError::FileWrite)?;
    tracing::debug!(
        "dumped {} registry entries to {}",
        registry.len(),
        destination.display()
    );
    Ok(())
}

/// Returns the blob when `destination` is `None`; otherwise writes it there and returns `None`.
pub fn dump(registry: &PathRegistry, destination: Option<&Path>) -> RegistryResult<Option<Vec<u8>>> {
    match destination {
        None => to_bytes(registry).map(Some),
        Some(path) => dump_to(registry, path).map(|()| None),
    }
}

/// Restores a registry from a blob produced by [`to_bytes`].
///
/// # Errors
///
/// Returns [`RegistryError::Deserialization`] if the bytes are not a registry document, the
/// first entry is not the `root` directory, a name repeats, a name is empty, or a target is
/// not absolute.
pub fn from_bytes(bytes: &[u8], options: RegistryOptions) -> RegistryResult<PathRegistry> {
    let document: RegistryDocument = serde_json::from_slice(bytes)
        .map_err(|e| RegistryError::Deserialization(e.to_string()))?;

    let entries = document
        .entries
        .into_iter()
        .map(|record| PathEntry {
            name: record.name,
            target: record.target,
            kind: record.kind,
        })
        .collect();

    PathRegistry::from_entries(PathBuilder::process(), options, entries)
}

/// Restores a registry from the file at `source`.
pub fn load_from(source: &Path, options: RegistryOptions) -> RegistryResult<PathRegistry> {
    let mut file = File::open(source).map_err(RegistryError::FileRead)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)
        .map_err(RegistryError::FileRead)?;
    drop(file);

    let registry = from_bytes(&buffer, options)?;
    tracing::debug!(
        "loaded {} registry entries from {}",
        registry.len(),
        source.display()
    );
    Ok(registry)
}

pub fn load(source: Source<'_>, options: RegistryOptions) -> RegistryResult<PathRegistry> {
    match source {
        Source::Bytes(bytes) => from_bytes(bytes, options),
        Source::File(path) => load_from(path, options),
    }
}

impl PathRegistry {
    /// See [`dump`].
    pub fn dump(&self, destination: Option<&Path>) -> RegistryResult<Option<Vec<u8>>> {
        dump(self, destination)
    }

    pub fn to_bytes(&self) -> RegistryResult<Vec<u8>> {
        to_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8], options: RegistryOptions) -> RegistryResult<Self> {
        from_bytes(bytes, options)
    }

    /// See [`load_from`].
    pub fn load_from(source: &Path, options: RegistryOptions) -> RegistryResult<Self> {
        load_from(source, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::NO_SEGMENTS;
    use std::fs;
    use tempfile::TempDir;

    fn sample(temp: &TempDir) -> PathRegistry {
        let mut reg =
            PathRegistry::new(temp.path(), ["artifactory"], RegistryOptions::default()).unwrap();
        reg.register_dir("ckpt").unwrap();
        reg.register_file("log", "log.txt").unwrap();
        reg.set("plots", "figures", NO_SEGMENTS).unwrap();
        reg
    }

    fn snapshot(reg: &PathRegistry) -> Vec<(String, PathBuf, EntryKind)> {
        reg.entries()
            .map(|e| (e.name().to_string(), e.target().to_path_buf(), e.kind()))
            .collect()
    }

    #[test]
    fn test_bytes_preserve_entries_and_order() {
        let temp = TempDir::new().unwrap();
        let reg = sample(&temp);

        let bytes = reg.to_bytes().unwrap();
        let restored = PathRegistry::from_bytes(&bytes, RegistryOptions::default()).unwrap();

        assert_eq!(snapshot(&restored), snapshot(&reg));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_target_survives_dump_and_load() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let mut reg = sample(&temp);
        reg.set("raw", Path::new(OsStr::from_bytes(b"run_\xff")), NO_SEGMENTS)
            .unwrap();
        let expected = temp
            .path()
            .join("artifactory")
            .join(OsStr::from_bytes(b"run_\xff"));
        assert_eq!(reg.target("raw").unwrap(), expected);

        let bytes = reg.to_bytes().unwrap();
        let restored = PathRegistry::from_bytes(&bytes, RegistryOptions::default()).unwrap();

        assert_eq!(snapshot(&restored), snapshot(&reg));
        assert_eq!(restored.target("raw").unwrap(), expected);
        assert_eq!(
            restored.target("ckpt").unwrap(),
            temp.path().join("artifactory").join("ckpt")
        );
    }

    #[test]
    fn test_utf8_targets_stored_as_strings() {
        let temp = TempDir::new().unwrap();
        let reg = sample(&temp);

        let document: serde_json::Value = serde_json::from_slice(&reg.to_bytes().unwrap()).unwrap();
        let ckpt = &document["entries"][1];
        assert_eq!(ckpt["name"], "ckpt");
        assert_eq!(
            ckpt["target"].as_str().unwrap(),
            temp.path().join("artifactory").join("ckpt").to_str().unwrap()
        );
    }

    #[test]
    fn test_materialization_does_not_affect_dump() {
        let temp = TempDir::new().unwrap();
        let reg = sample(&temp);
        let before = reg.to_bytes().unwrap();

        reg.lookup("ckpt").unwrap();
        reg.lookup("log").unwrap();
        let after = reg.to_bytes().unwrap();

        assert_eq!(before, after);
    }

    #[test]
    fn test_loaded_registry_is_lazy() {
        let temp = TempDir::new().unwrap();
        let bytes = sample(&temp).to_bytes().unwrap();

        let restored = PathRegistry::from_bytes(&bytes, RegistryOptions::default()).unwrap();
        let ckpt = temp.path().join("artifactory").join("ckpt");
        assert!(!ckpt.exists());

        restored.lookup("ckpt").unwrap();
        assert!(ckpt.is_dir());

        let log = restored.lookup("log").unwrap();
        assert!(!log.as_path().exists());
        assert!(log.as_path().parent().unwrap().is_dir());
    }

    #[test]
    fn test_loaded_registry_takes_new_options() {
        let temp = TempDir::new().unwrap();
        let bytes = sample(&temp).to_bytes().unwrap();

        let options = RegistryOptions::new(true, true);
        let mut restored = PathRegistry::from_bytes(&bytes, options).unwrap();
        assert_eq!(restored.options(), options);

        restored.set("ckpt", "checkpoints", NO_SEGMENTS).unwrap();
        assert!(restored.lookup("ckpt").unwrap().is_text());
        assert!(matches!(
            restored.register_dir("root"),
            Err(RegistryError::ReservedName(_))
        ));
    }

    #[test]
    fn test_dump_without_destination_returns_blob() {
        let temp = TempDir::new().unwrap();
        let reg = sample(&temp);

        let blob = reg.dump(None).unwrap().unwrap();
        assert_eq!(blob, reg.to_bytes().unwrap());
    }

    #[test]
    fn test_dump_and_load_file() {
        let temp = TempDir::new().unwrap();
        let reg = sample(&temp);
        let file = temp.path().join("registry.json");

        fs::write(&file, b"stale content that is much longer than nothing at all").unwrap();
        assert!(reg.dump(Some(file.as_path())).unwrap().is_none());

        let restored = load(Source::File(&file), RegistryOptions::default()).unwrap();
        assert_eq!(snapshot(&restored), snapshot(&reg));

        let from_blob = load(
            Source::Bytes(&fs::read(&file).unwrap()),
            RegistryOptions::default(),
        )
        .unwrap();
        assert_eq!(snapshot(&from_blob), snapshot(&reg));
    }

    #[test]
    fn test_name_and_target_only_document_loads() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("artifactory");
        let document = serde_json::json!({
            "entries": [
                {"name": "root", "target": root},
                {"name": "ckpt", "target": root.join("ckpt")},
            ]
        });

        let restored =
            from_bytes(document.to_string().as_bytes(), RegistryOptions::default()).unwrap();
        assert_eq!(restored.target("ckpt").unwrap(), root.join("ckpt"));
        assert_eq!(restored.entry("ckpt").unwrap().kind(), EntryKind::Directory);
    }

    #[test]
    fn test_malformed_input() {
        let err = from_bytes(b"\x80\x04not a registry", RegistryOptions::default()).unwrap_err();
        assert!(matches!(err, RegistryError::Deserialization(_)));

        let err = from_bytes(br#"{"entries": 3}"#, RegistryOptions::default()).unwrap_err();
        assert!(matches!(err, RegistryError::Deserialization(_)));
    }

    #[test]
    fn test_missing_root_rejected() {
        let temp = TempDir::new().unwrap();
        let document = serde_json::json!({
            "entries": [{"name": "ckpt", "target": temp.path().join("ckpt")}]
        });
        let err = from_bytes(document.to_string().as_bytes(), RegistryOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Deserialization(_)));

        let err = from_bytes(br#"{"entries": []}"#, RegistryOptions::default()).unwrap_err();
        assert!(matches!(err, RegistryError::Deserialization(_)));
    }

    #[test]
    fn test_file_root_rejected() {
        let temp = TempDir::new().unwrap();
        let document = serde_json::json!({
            "entries": [{"name": "root", "target": temp.path(), "kind": "file"}]
        });
        let err = from_bytes(document.to_string().as_bytes(), RegistryOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Deserialization(_)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let temp = TempDir::new().unwrap();
        let document = serde_json::json!({
            "entries": [
                {"name": "root", "target": temp.path()},
                {"name": "a", "target": temp.path().join("a")},
                {"name": "a", "target": temp.path().join("b")},
            ]
        });
        let err = from_bytes(document.to_string().as_bytes(), RegistryOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Deserialization(_)));
    }

    #[test]
    fn test_relative_target_rejected() {
        let temp = TempDir::new().unwrap();
        let document = serde_json::json!({
            "entries": [
                {"name": "root", "target": temp.path()},
                {"name": "a", "target": "relative/a"},
            ]
        });
        let err = from_bytes(document.to_string().as_bytes(), RegistryOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Deserialization(msg) if msg.contains("not absolute")));
    }

    #[test]
    fn test_empty_name_rejected() {
        let temp = TempDir::new().unwrap();
        let document = serde_json::json!({
            "entries": [
                {"name": "root", "target": temp.path()},
                {"name": "", "target": temp.path().join("a")},
            ]
        });
        let err = from_bytes(document.to_string().as_bytes(), RegistryOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Deserialization(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = PathRegistry::load_from(&temp.path().join("absent.json"), RegistryOptions::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::FileRead(_)));
    }

    #[test]
    fn test_dump_to_missing_directory() {
        let temp = TempDir::new().unwrap();
        let reg = PathRegistry::new(temp.path(), NO_SEGMENTS, RegistryOptions::default()).unwrap();
        let err = dump_to(&reg, &temp.path().join("no/such/dir/registry.json")).unwrap_err();
        assert!(matches!(err, RegistryError::FileWrite(_)));
    }
}
