//! Config structures
use elfcommon::prelude::*;

use std::collections::BTreeMap;
use std::path::Path;

use elfcommon::Unused;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Config file name, looked up in the directory given by `-C`
pub const CONFIG_FILE: &str = "Elftool.toml";

/// Config data read from Elftool.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// The `[check]` section
    pub check: Option<ProfileContainer<Check>>,

    #[serde(flatten)]
    pub unused: Unused,
}

error_context!(pub LoadConfig, |r| -> Error {
    errorln!("Failed", "Loading {}", CONFIG_FILE);
    r.change_context(Error::Config)
});
impl Config {
    /// Load a config from a file
    ///
    /// Prints formatted error message when failed
    pub fn from_path(path: impl AsRef<Path>) -> ResultIn<Self, LoadConfig> {
        let config = system::read_file(path)?;
        Ok(Self::parse(&config)?)
    }

    /// Load the config in `dir`, or the default config if there is none
    pub fn load_or_default(dir: impl AsRef<Path>) -> ResultIn<Self, LoadConfig> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            verboseln!("no {} in '{}', using defaults", CONFIG_FILE, dir.as_ref().display());
            return Ok(Self::default());
        }
        verboseln!("loading '{}'", path.display());
        Self::from_path(path)
    }

    /// Parse config from TOML text
    ///
    /// Prints the TOML error line by line on failure
    pub fn parse(config: &str) -> Result<Self, toml::de::Error> {
        let config: Self = toml::from_str(config).map_err(|e| {
            for line in e.to_string().lines() {
                errorln!("Error", "{}", line);
            }
            report!(e)
        })?;
        config.warn_unused();
        Ok(config)
    }

    fn warn_unused(&self) {
        for key in self.unused.keys() {
            hintln!("Warning", "config `{}` is unused", key);
        }
        if let Some(check) = &self.check {
            check.base.unused.check_prefixed("check");
            for (name, profile) in &check.profiles {
                profile
                    .unused
                    .check_prefixed(&format!("check.profiles.{}", name));
            }
        }
    }
}

/// The `[check]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Check {
    /// Files or directories to check when none is given on the command line
    #[serde(default)]
    pub paths: Vec<String>,
    /// Symbols that must be defined by one of the checked files
    #[serde(default)]
    pub require: Vec<String>,
    /// Undefined symbols to ignore
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Paths to symbol list files (one symbol per line) with symbols
    /// provided by the environment the objects are linked into
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Defined symbols to disallow. Values are regular expressions.
    #[serde(default)]
    pub disallowed_symbols: Vec<String>,

    #[serde(flatten)]
    pub unused: Unused,
}

impl Profilable for Check {
    fn extend(&mut self, other: &Self) {
        self.paths.extend(other.paths.iter().cloned());
        self.require.extend(other.require.iter().cloned());
        self.ignore.extend(other.ignore.iter().cloned());
        self.symbols.extend(other.symbols.iter().cloned());
        self.disallowed_symbols
            .extend(other.disallowed_symbols.iter().cloned());
    }
}

/// Generic config section that can be extended with profiles
///
/// For example, the `[check]` section can have profiles with `[check.profiles.<name>]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileContainer<T>
where
    T: Profilable + Clone,
{
    /// The base profile
    #[serde(flatten)]
    base: T,
    /// The extended profiles
    #[serde(default)]
    profiles: BTreeMap<String, T>,
}

impl<T> ProfileContainer<T>
where
    T: Profilable + Clone,
{
    /// Get a profile by name
    ///
    /// If the name is "none", the base profile is returned. Otherwise,
    /// returns the base profile extended with the profile with the given name.
    pub fn get_profile(&self, name: &str) -> Result<T, Error> {
        let mut base = self.base.clone();
        if name == "none" {
            return Ok(base);
        }
        match self.profiles.get(name) {
            Some(profile) => {
                base.extend(profile);
                Ok(base)
            }
            None => {
                errorln!("Error", "Profile `{}` is not defined", name);
                if !self.profiles.is_empty() {
                    let names: Vec<_> = self.profiles.keys().map(String::as_str).collect();
                    hintln!("Consider", "Available profiles: {}", names.join(", "));
                }
                bail!(Error::NoProfile(name.to_string()))
            }
        }
    }
}

/// A trait for extending a config section with a profile
pub trait Profilable {
    /// Extend this config section with another
    fn extend(&mut self, other: &Self);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const CONFIG: &str = r#"
[check]
paths = ["build"]
require = ["main"]
ignore = ["__stack_chk_fail"]
symbols = ["sdk.syms"]
disallowed-symbols = ["^__debug_"]

[check.profiles.release]
require = ["global_f"]
disallowed-symbols = ["^test_"]
"#;

    #[test]
    fn parse_check_section() {
        let config = Config::parse(CONFIG).unwrap();
        let check = config.check.unwrap().get_profile("none").unwrap();
        assert_eq!(check.paths, vec!["build"]);
        assert_eq!(check.require, vec!["main"]);
        assert_eq!(check.ignore, vec!["__stack_chk_fail"]);
        assert_eq!(check.symbols, vec!["sdk.syms"]);
        assert_eq!(check.disallowed_symbols, vec!["^__debug_"]);
        assert_eq!(check.unused, Unused::default());
    }

    #[test]
    fn profile_extends_base() {
        let config = Config::parse(CONFIG).unwrap();
        let check = config.check.unwrap().get_profile("release").unwrap();
        assert_eq!(check.require, vec!["main", "global_f"]);
        assert_eq!(check.disallowed_symbols, vec!["^__debug_", "^test_"]);
        assert_eq!(check.paths, vec!["build"]);
    }

    #[test]
    fn unknown_profile_is_error() {
        let config = Config::parse(CONFIG).unwrap();
        let err = config.check.unwrap().get_profile("debug").unwrap_err();
        assert!(matches!(err.current_context(), Error::NoProfile(name) if name == "debug"));
    }

    #[test]
    fn unknown_keys_are_collected() {
        let config = Config::parse(
            r#"
[build]
x = 1

[check]
requires = ["main"]
"#,
        )
        .unwrap();
        assert_eq!(config.unused.keys().collect::<Vec<_>>(), vec!["build"]);
        let check = config.check.unwrap().get_profile("none").unwrap();
        assert!(check.require.is_empty());
        assert_eq!(check.unused.keys().collect::<Vec<_>>(), vec!["requires"]);
    }

    #[test]
    fn empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_toml_is_error() {
        assert!(Config::parse("[check\n").is_err());
        assert!(Config::parse("[check]\nrequire = 3\n").is_err());
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path())
            .change_context(Error::Config)
            .unwrap();
        assert_eq!(config, Config::default());

        std::fs::write(dir.path().join(CONFIG_FILE), CONFIG).unwrap();
        let config = Config::load_or_default(dir.path())
            .change_context(Error::Config)
            .unwrap();
        assert!(config.check.is_some());
    }
}
