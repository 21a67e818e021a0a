use serde_derive::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PATH: &str = "memerelay.toml";
pub const TEMPLATE_PATH: &str = "memerelay.template.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub bot: Bot,
    #[serde(default)]
    pub console: Console,
    /// Plugins to load at startup. The tables are reserved for plugin options.
    #[serde(default)]
    pub plugins: BTreeMap<String, toml::Table>,
    /// Shared API tokens, `[api.<service>] key = "value"`.
    #[serde(default)]
    pub api: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Bot {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,
    pub owner: u64,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,
}

/// The simulated guild the console plays in.
#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Console {
    pub guild: u64,
    pub attach_files: bool,
    pub channels: Vec<ChannelEntry>,
    pub users: Vec<UserEntry>,
}

impl Default for Console {
    fn default() -> Self {
        Self {
            guild: 1,
            attach_files: true,
            channels: vec![ChannelEntry {
                id: 10,
                name: "general".to_owned(),
            }],
            users: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChannelEntry {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserEntry {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL without extension.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub animated: bool,
}

fn default_name() -> String {
    "memerelay".to_owned()
}

fn default_prefixes() -> Vec<String> {
    vec!["!".to_owned()]
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_plugin_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    let root = "target/debug";
    #[cfg(not(debug_assertions))]
    let root = "target/release";
    PathBuf::from(root)
}

pub fn parse(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    parse(&text).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses() {
        let config = parse(include_str!("../memerelay.template.toml")).unwrap();
        assert_eq!(config.bot.prefixes, vec!["!"]);
        assert!(config.plugins.contains_key("dankmemer"));
        assert!(config.plugins.contains_key("modmail"));
        assert!(config.console.users.iter().any(|u| u.id == config.bot.owner));
        assert!(config.api.contains_key("imgen"));
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse("[bot]\nowner = 5\n").unwrap();
        assert_eq!(config.bot.name, "memerelay");
        assert_eq!(config.bot.data_dir, PathBuf::from("data"));
        assert_eq!(config.console.channels[0].name, "general");
        assert!(config.console.attach_files);
        assert!(config.plugins.is_empty());
    }

    #[test]
    fn missing_owner_is_an_error() {
        assert!(parse("[bot]\nname = \"x\"\n").is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("nope.toml"));
    }
}
