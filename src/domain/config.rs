use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for document editing.
///
/// This struct holds settings that control how new hierarchy nodes are
/// created and how much identifier history is retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Versions", into = "Versions")]
pub struct Config {
    /// The letter given to a new Folgeposition when none is requested.
    ///
    /// Subsequent positions under the same base text take the next free
    /// letter after it.
    default_ftnr: char,

    /// The origin flag (`herkunftskennzeichen`) stamped on nodes created by
    /// the editor when the caller did not supply one.
    ///
    /// `Z` marks an additional position that is not taken from a standard
    /// service description.
    origin_flag: String,

    /// The maximum number of replaced identifiers kept by a change detector.
    ///
    /// If this is `None`, history is unbounded.
    history_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ftnr: default_ftnr(),
            origin_flag: default_origin_flag(),
            history_limit: None,
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the letter for the first Folgeposition of a base text.
    #[must_use]
    pub const fn default_ftnr(&self) -> char {
        self.default_ftnr
    }

    /// Returns the origin flag for newly created nodes.
    #[must_use]
    pub fn origin_flag(&self) -> &str {
        &self.origin_flag
    }

    /// Returns the identifier history limit, if any.
    #[must_use]
    pub const fn history_limit(&self) -> Option<usize> {
        self.history_limit
    }

    /// Sets the identifier history limit.
    pub const fn set_history_limit(&mut self, limit: Option<usize>) {
        self.history_limit = limit;
    }

    /// Sets the origin flag for newly created nodes.
    pub fn set_origin_flag(&mut self, flag: String) {
        self.origin_flag = flag;
    }
}

const fn default_ftnr() -> char {
    'A'
}

fn default_origin_flag() -> String {
    "Z".to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_ftnr")]
        default_ftnr: char,

        #[serde(default = "default_origin_flag")]
        origin_flag: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        history_limit: Option<usize>,
    },
}

impl TryFrom<Versions> for Config {
    type Error = String;

    fn try_from(versions: Versions) -> Result<Self, Self::Error> {
        match versions {
            Versions::V1 {
                default_ftnr,
                origin_flag,
                history_limit,
            } => {
                // 'U' addresses the undivided position and cannot name a variant
                if !default_ftnr.is_ascii_uppercase() || default_ftnr == 'U' {
                    return Err(format!(
                        "default_ftnr must be an uppercase letter other than 'U', got '{default_ftnr}'"
                    ));
                }
                Ok(Self {
                    default_ftnr,
                    origin_flag,
                    history_limit,
                })
            }
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            default_ftnr: config.default_ftnr,
            origin_flag: config.origin_flag,
            history_limit: config.history_limit,
        }
    }
}
