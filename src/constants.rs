// -
// Configuration sources

/// Optional base configuration file, resolved relative to the working directory
pub(crate) const DEFAULT_CONFIG_FILE: &str = "config/controller";

/// Environment variable naming an extra configuration file
pub(crate) const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Environment overrides, e.g. `BATCHER__MAX_BATCH=50`
pub(crate) const ENV_PREFIX: &str = "BATCHER";
pub(crate) const ENV_SEPARATOR: &str = "__";

// -
// Key derivation

/// Separator between namespace and name in object keys
pub(crate) const KEY_SEPARATOR: char = '/';
