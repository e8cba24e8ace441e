/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Reader configuration.
//!
//! A [`ReaderConfig`] can be built directly, loaded from the
//! environment with [`ReaderConfig::from_env`], or loaded from (and
//! saved to) YAML.

use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable naming the directory that hrefs resolve against.
pub const ROOT_ENV: &str = "NDSLAB_ROOT";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Directory against which relative [`crate::Resource::Href`]s are
    /// resolved.
    #[serde(default = "default_root")]
    root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

impl ReaderConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an href against the root. Absolute hrefs are returned
    /// unchanged.
    pub fn resolve(&self, href: &str) -> PathBuf {
        self.root.join(href)
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        match env::var(ROOT_ENV) {
            Ok(root) if !root.is_empty() => {
                config.root = PathBuf::from(root);
                tracing::info!(
                    "loaded configuration from environment: {}={}",
                    ROOT_ENV,
                    config.root.display()
                );
            }
            _ => {
                tracing::debug!("{} unset, using default root", ROOT_ENV);
            }
        }
        config
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), anyhow::Error> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn test_resolve() {
        let config = ReaderConfig::new("/data");
        assert_eq!(config.resolve("a/b.txt"), PathBuf::from("/data/a/b.txt"));
        assert_eq!(config.resolve("/abs/b.txt"), PathBuf::from("/abs/b.txt"));
        assert_eq!(
            ReaderConfig::default().resolve("b.txt"),
            PathBuf::from("./b.txt")
        );
    }

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let config = ReaderConfig::new("/srv/arrays");
        config.to_yaml(&path).unwrap();
        assert_eq!(ReaderConfig::from_yaml(&path).unwrap(), config);
    }

    #[test]
    fn test_yaml_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "{}\n").unwrap();
        assert_eq!(
            ReaderConfig::from_yaml(&path).unwrap(),
            ReaderConfig::default()
        );

        std::fs::write(
            &path,
            indoc! {"
                root: /mnt/meshes
            "},
        )
        .unwrap();
        assert_eq!(
            ReaderConfig::from_yaml(&path).unwrap().root(),
            Path::new("/mnt/meshes")
        );
    }

    #[test]
    fn test_from_yaml_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ReaderConfig::from_yaml(dir.path().join("nope.yaml")).is_err());
    }
}
