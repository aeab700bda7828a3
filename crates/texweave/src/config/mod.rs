//! Engine configuration.
//!
//! The engine never reads configuration files itself.
//! Instead it asks a [ResourceFinder] for a configuration tree by logical name,
//!     like `engine`, and deserializes the tree into an [EngineConfig].
//! The configuration decides which concrete implementations are instantiated:
//!     the backend that receives finished lists, the font factory,
//!     and the interaction mode the engine starts in.

use font::{FontFactory, FontSpec, MetricFactory, MetricFont};
use std::path::PathBuf;

/// An opaque configuration tree.
pub type ConfigTree = serde_json::Value;

/// Logical name of the main engine configuration.
pub const ENGINE: &str = "engine";

const DEFAULT_ENGINE_CONFIG: &str = include_str!("default.json");

/// Error returned when a configuration resource does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound {
    pub logical_name: String,
    pub reason: String,
}

impl std::fmt::Display for NotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "configuration resource `{}` not found: {}",
            self.logical_name, self.reason
        )
    }
}

impl std::error::Error for NotFound {}

/// Implementations of this trait locate configuration resources.
pub trait ResourceFinder {
    fn find(&self, logical_name: &str) -> Result<ConfigTree, NotFound>;
}

/// Finder that only knows the built-in default configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltInFinder;

impl ResourceFinder for BuiltInFinder {
    fn find(&self, logical_name: &str) -> Result<ConfigTree, NotFound> {
        built_in(logical_name).ok_or_else(|| NotFound {
            logical_name: logical_name.into(),
            reason: "there is no built-in resource with this name".into(),
        })
    }
}

fn built_in(logical_name: &str) -> Option<ConfigTree> {
    if logical_name != ENGINE {
        return None;
    }
    match serde_json::from_str(DEFAULT_ENGINE_CONFIG) {
        Ok(tree) => Some(tree),
        Err(err) => {
            log::error!("the built-in engine configuration is invalid: {err}");
            None
        }
    }
}

/// Finder that resolves the logical name `x` to the file `<dir>/x.json`.
///
/// If the file does not exist the built-in resource with the same name is returned, if there is one.
#[derive(Debug, Clone)]
pub struct DirectoryFinder {
    dir: PathBuf,
}

impl DirectoryFinder {
    pub fn new<P: Into<PathBuf>>(dir: P) -> DirectoryFinder {
        DirectoryFinder { dir: dir.into() }
    }
}

impl ResourceFinder for DirectoryFinder {
    fn find(&self, logical_name: &str) -> Result<ConfigTree, NotFound> {
        let path = self.dir.join(format!("{logical_name}.json"));
        let not_found = |reason: String| NotFound {
            logical_name: logical_name.into(),
            reason,
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).map_err(|err| {
                not_found(format!("{} is not valid JSON: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "{} does not exist, falling back to the built-in `{logical_name}` resource",
                    path.display()
                );
                built_in(logical_name)
                    .ok_or_else(|| not_found(format!("{} does not exist", path.display())))
            }
            Err(err) => Err(not_found(format!("failed to read {}: {err}", path.display()))),
        }
    }
}

/// Kind of backend that receives finished lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A human readable dump of the node lists.
    #[default]
    Text,
    /// One JSON document per shipped list.
    Json,
}

/// Kind of font factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFactoryKind {
    /// Fonts described in the configuration itself.
    #[default]
    Metrics,
}

/// How the engine interacts with the user when an error occurs.
///
/// TeX.2021.73.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Stop at the first error.
    #[default]
    ErrorStop,
    /// Print errors and continue.
    Scroll,
    /// Print errors and continue; the run never reads from the terminal.
    NonStop,
    /// Errors only go to the log file.
    Batch,
}

impl InteractionMode {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionMode::ErrorStop => "errorstopmode",
            InteractionMode::Scroll => "scrollmode",
            InteractionMode::NonStop => "nonstopmode",
            InteractionMode::Batch => "batchmode",
        }
    }
}

/// The engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub font_factory: FontFactoryKind,
    #[serde(default)]
    pub interaction: InteractionMode,
    #[serde(default = "default_magnification")]
    pub magnification: i32,
    #[serde(default)]
    pub fonts: Vec<FontSpec>,
}

fn default_magnification() -> i32 {
    1000
}

/// Error returned when the engine configuration cannot be loaded.
#[derive(Debug)]
pub enum ConfigError {
    NotFound(NotFound),
    Invalid {
        logical_name: String,
        err: serde_json::Error,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(err) => write!(f, "{err}"),
            ConfigError::Invalid { logical_name, err } => {
                write!(f, "configuration resource `{logical_name}` is invalid: {err}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<NotFound> for ConfigError {
    fn from(value: NotFound) -> Self {
        ConfigError::NotFound(value)
    }
}

impl EngineConfig {
    /// Loads the engine configuration using the finder.
    pub fn load(finder: &dyn ResourceFinder) -> Result<EngineConfig, ConfigError> {
        let tree = finder.find(ENGINE)?;
        EngineConfig::from_tree(ENGINE, tree)
    }

    pub fn from_tree(logical_name: &str, tree: ConfigTree) -> Result<EngineConfig, ConfigError> {
        serde_json::from_value(tree).map_err(|err| ConfigError::Invalid {
            logical_name: logical_name.into(),
            err,
        })
    }

    /// Builds the font factory described by this configuration.
    pub fn font_factory(&self) -> Box<dyn FontFactory> {
        match self.font_factory {
            FontFactoryKind::Metrics => Box::new(MetricFactory::new(
                self.fonts.iter().cloned().map(MetricFont::from).collect(),
            )),
        }
    }
}

impl Default for EngineConfig {
    /// The built-in configuration.
    fn default() -> Self {
        built_in(ENGINE)
            .and_then(|tree| EngineConfig::from_tree(ENGINE, tree).ok())
            .unwrap_or(EngineConfig {
                backend: BackendKind::default(),
                font_factory: FontFactoryKind::default(),
                interaction: InteractionMode::default(),
                magnification: default_magnification(),
                fonts: vec![],
            })
    }
}
