//! Constants used throughout the artifactorium core crate.

/// Name of the implicit entry holding the registry root.
pub const ROOT_ENTRY_NAME: &str = "root";

/// Path segment that is replaced by the process run stamp.
pub const NOW_TOKEN: &str = "NOW";

/// `chrono` format string for the run stamp (for example `xp_20260111.143522`).
pub const RUN_STAMP_FORMAT: &str = "xp_%Y%m%d.%H%M%S";

/// Prefix used on every line emitted by `describe`.
pub const DESCRIBE_PREFIX: &str = " [Artifactorium] -";

/// Environment variable consulted by the binary for the overwrite policy.
pub const ALLOW_OVERWRITE_ENV: &str = "ARTIFACTORIUM_ALLOW_OVERWRITE";

/// Environment variable consulted by the binary for string lookups.
pub const STRINGIFY_RESULTS_ENV: &str = "ARTIFACTORIUM_STRINGIFY_RESULTS";
