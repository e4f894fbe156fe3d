//! Pure path composition.
//!
//! [`PathBuilder`] joins a base path and a sequence of segments into one absolute path. It performs
//! **no filesystem mutation**: the only host interaction is resolving a relative base against the
//! current working directory.
//!
//! Two segment values are special:
//!
//! - `None` (any `Option` segment that is empty) is skipped and adds no component.
//! - The literal token `"NOW"` is replaced with the builder's [`RunStamp`].
//!
//! The run stamp is injected rather than read from a hidden global, so tests can pin it.
//! [`PathBuilder::process`] uses the process-wide stamp from [`RunStamp::process`], which is
//! computed once on first access and never changes afterwards.

use crate::constants::{NOW_TOKEN, RUN_STAMP_FORMAT};
use crate::{RegistryError, RegistryResult};
use chrono::{DateTime, Local, TimeZone};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static PROCESS_STAMP: LazyLock<RunStamp> = LazyLock::new(|| RunStamp::from_datetime(&Local::now()));

/// Convenience value for calls that take no extra segments.
pub const NO_SEGMENTS: [&str; 0] = [];

/// Sortable date-time token substituted for `"NOW"` segments.
///
/// Format: `xp_YYYYMMDD.HHMMSS`, for example `xp_20260111.143522`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunStamp(String);

impl RunStamp {
    /// Returns the process-wide stamp, computed from local time on first access.
    pub fn process() -> Self {
        PROCESS_STAMP.clone()
    }

    /// Builds a stamp from an explicit point in time.
    pub fn from_datetime<Tz>(at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self(at.format(RUN_STAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<OsStr> for RunStamp {
    fn as_ref(&self) -> &OsStr {
        OsStr::new(&self.0)
    }
}

/// A value usable as one path segment.
///
/// Returning `None` means "skip this segment".
pub trait AsSegment {
    fn as_segment(&self) -> Option<&Path>;
}

impl AsSegment for str {
    fn as_segment(&self) -> Option<&Path> {
        Some(Path::new(self))
    }
}

impl AsSegment for String {
    fn as_segment(&self) -> Option<&Path> {
        Some(Path::new(self))
    }
}

impl AsSegment for Path {
    fn as_segment(&self) -> Option<&Path> {
        Some(self)
    }
}

impl AsSegment for PathBuf {
    fn as_segment(&self) -> Option<&Path> {
        Some(self.as_path())
    }
}

impl<T: AsSegment + ?Sized> AsSegment for &T {
    fn as_segment(&self) -> Option<&Path> {
        (**self).as_segment()
    }
}

impl<T: AsSegment> AsSegment for Option<T> {
    fn as_segment(&self) -> Option<&Path> {
        self.as_ref().and_then(AsSegment::as_segment)
    }
}

/// Composes absolute paths from a base and segments.
#[derive(Clone, Debug)]
pub struct PathBuilder {
    stamp: RunStamp,
}

impl Default for PathBuilder {
    fn default() -> Self {
        Self::process()
    }
}

impl PathBuilder {
    /// Creates a builder that substitutes `stamp` for `"NOW"` segments.
    pub fn new(stamp: RunStamp) -> Self {
        Self { stamp }
    }

    /// Creates a builder bound to the process-wide run stamp.
    pub fn process() -> Self {
        Self::new(RunStamp::process())
    }

    pub fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    /// Resolves `base` to an absolute path and appends each segment in order.
    ///
    /// Segments are appended verbatim: `..` components are kept and an absolute segment
    /// replaces everything before it, exactly as [`PathBuf::push`] behaves.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AbsolutePath`] only if the host cannot resolve the current
    /// working directory for a relative base.
    pub fn build<I>(&self, base: impl AsRef<Path>, segments: I) -> RegistryResult<PathBuf>
    where
        I: IntoIterator,
        I::Item: AsSegment,
    {
        let base = absolute(base.as_ref())?;
        Ok(self.join(base, segments))
    }

    /// Appends segments to an already-resolved path, with the same `None` and `"NOW"` handling
    /// as [`PathBuilder::build`].
    pub fn join<I>(&self, mut path: PathBuf, segments: I) -> PathBuf
    where
        I: IntoIterator,
        I::Item: AsSegment,
    {
        for segment in segments {
            let Some(segment) = segment.as_segment() else {
                continue;
            };
            if segment.as_os_str() == NOW_TOKEN {
                path.push(self.stamp.as_str());
            } else {
                path.push(segment);
            }
        }
        path
    }
}

/// Composes a path with the process-wide run stamp.
pub fn build<I>(base: impl AsRef<Path>, segments: I) -> RegistryResult<PathBuf>
where
    I: IntoIterator,
    I::Item: AsSegment,
{
    PathBuilder::process().build(base, segments)
}

fn absolute(base: &Path) -> RegistryResult<PathBuf> {
    let resolved = if base.as_os_str().is_empty() {
        std::env::current_dir()
    } else {
        std::path::absolute(base)
    };
    resolved.map_err(|source| RegistryError::AbsolutePath {
        path: base.to_path_buf(),
        source,
    })
}
