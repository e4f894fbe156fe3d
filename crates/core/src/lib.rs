//! # Artifactorium Core
//!
//! A lazy path registry for experiment and output directory management.
//!
//! Callers register logical names ("checkpoints", "logs") once against a root directory, then
//! retrieve fully built, existing-on-disk paths by name for the rest of the program:
//!
//! - [`builder`]: pure composition of a base path and segments, with `"NOW"` run-stamp
//!   substitution
//! - [`registry`]: the name→path registry, its overwrite policy and lazy materialisation
//! - [`serializer`]: persistence of the name→target mapping
//! - [`config`]: policy flags fixed at construction
//!
//! ```no_run
//! use artifactorium_core::{PathRegistry, RegistryOptions};
//!
//! # fn main() -> Result<(), artifactorium_core::RegistryError> {
//! let mut registry = PathRegistry::new("/tmp/X", ["artifactory"], RegistryOptions::default())?;
//! registry.register_dir("ckpt")?;
//! registry.register_file("log", "log.txt")?;
//!
//! // Creates /tmp/X/artifactory/ckpt on first access.
//! let ckpt = registry.lookup("ckpt")?;
//! # let _ = ckpt;
//! # Ok(())
//! # }
//! ```
//!
//! No locking is performed. Two registries that look up the same target concurrently rely on
//! the host's recursive, idempotent directory creation.

pub mod builder;
pub mod config;
pub mod constants;
pub mod error;
pub mod registry;
pub mod serializer;

pub use builder::{build, AsSegment, PathBuilder, RunStamp, NO_SEGMENTS};
pub use config::{options_from_env_values, RegistryOptions};
pub use error::{RegistryError, RegistryResult};
pub use registry::{EntryKind, PathEntry, PathRegistry, ResolvedPath};
pub use serializer::Source;

pub use artifactorium_types::{EntryName, NameError};
