// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settings for the Ravyn gateway.
//!
//! `ravyn.toml` is merged from the XDG locations, then `RAVYN_*` environment
//! variables win. Unknown keys are rejected and reported with a suggestion.
//!
//! ```no_run
//! let config = match ravyn_config::load_and_validate() {
//!     Ok(config) => config,
//!     Err(errors) => {
//!         ravyn_config::render_errors(&errors);
//!         std::process::exit(1);
//!     }
//! };
//! println!("{} requests per {}s", config.limits.max_requests, config.limits.window_secs);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::RavynConfig;

/// Loads `ravyn.toml` from the usual locations plus `RAVYN_*` overrides.
pub fn load_and_validate() -> Result<RavynConfig, Vec<ConfigError>> {
    checked(loader::load_config(), collect_toml_sources)
}

/// Same as [`load_and_validate`] for an explicit `--config` file.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<RavynConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

pub fn load_and_validate_str(toml_content: &str) -> Result<RavynConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validates a parsed config, or explains a parse failure against the
/// TOML text it came from. Sources are only read on failure.
fn checked(
    parsed: Result<RavynConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<RavynConfig, Vec<ConfigError>> {
    let config = parsed.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Contents of every config file that exists, for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    loader::config_file_paths()
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            let display = std::fs::canonicalize(&path)
                .unwrap_or(path)
                .display()
                .to_string();
            Some((display, content))
        })
        .collect()
}
