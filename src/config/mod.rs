//! Configuration management for the batch controller.
//!
//! Provides hierarchical configuration loading from multiple sources with priority:
//! 1. Default values (hardcoded)
//! 2. Base config file (`config/controller`, optional)
//! 3. File named by `CONFIG_PATH`
//! 4. Explicit override file passed by the caller
//! 5. Environment variables with the `BATCHER__` prefix (highest priority)
//!

mod controller;
mod retry;
pub use controller::*;
pub use retry::*;


//---
use std::env;

use config::Config;
use config::Environment;
use config::File;

use crate::constants::CONFIG_PATH_ENV;
use crate::constants::DEFAULT_CONFIG_FILE;
use crate::constants::ENV_PREFIX;
use crate::constants::ENV_SEPARATOR;
use crate::Result;

impl ControllerConfig {
    /// Load configuration from every source in priority order and validate
    /// the merged result.
    ///
    /// # Arguments
    /// * `override_path` - Optional file whose values win over the base files
    pub fn load(override_path: Option<&str>) -> Result<Self> {
        // 1. Base config
        let mut config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false));

        // 2. Deployment specific file
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            config = config.add_source(File::with_name(&path));
        }

        // 3. Caller override
        if let Some(path) = override_path {
            config = config.add_source(File::with_name(path).required(true));
        }

        // 4. Environment variables (highest priority)
        config = config.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: ControllerConfig = config.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}
