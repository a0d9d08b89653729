use projgraph_core::{CapabilityLevel, DEFAULT_EXTENSIONS, NormalizedPath};
use serde::Deserialize;

/// Root configuration for the project service.
///
/// Every field has a default, so `{}` is a valid configuration.
///
/// # Examples
///
/// ```
/// use projgraph_server::config::ServiceConfig;
///
/// let json = r#"{
///     "syntaxOnly": true,
///     "useSingleInferredProject": true
/// }"#;
///
/// let config: ServiceConfig = serde_json::from_str(json).unwrap();
/// assert!(config.syntax_only);
/// assert_eq!(config.manifest_file_names, vec!["tsconfig.json"]);
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Disables semantic capability for every project. Manifests are not
    /// consulted and open files go to inferred projects.
    #[serde(default)]
    pub syntax_only: bool,
    /// Put every open file without a configured project into one shared
    /// inferred project instead of one project per file.
    #[serde(default)]
    pub use_single_inferred_project: bool,
    #[serde(default = "default_manifest_names")]
    pub manifest_file_names: Vec<String>,
    /// Default library declaration file added to full-semantic builds.
    #[serde(default)]
    pub default_library: Option<NormalizedPath>,
    #[serde(default)]
    pub type_acquisition: TypeAcquisitionConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            syntax_only: false,
            use_single_inferred_project: false,
            manifest_file_names: default_manifest_names(),
            default_library: None,
            type_acquisition: TypeAcquisitionConfig::default(),
            resolution: ResolutionConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Configuration of a syntax-only server.
    pub fn syntax_only() -> Self {
        Self {
            syntax_only: true,
            ..Self::default()
        }
    }

    /// Capability given to newly created projects.
    pub fn capability(&self) -> CapabilityLevel {
        if self.syntax_only {
            CapabilityLevel::SyntacticOnly
        } else {
            CapabilityLevel::FullSemantic
        }
    }
}

/// Policy for automatic acquisition of ambient declaration packages
/// (`node_modules/@types/*`).
///
/// # Defaults
///
/// - `enabled`: `true`
/// - `include`: `[]` (extra packages to acquire even if not found by scanning)
/// - `exclude`: `[]`
///
/// Acquisition never applies to syntactic-only projects, whatever this says.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAcquisitionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for TypeAcquisitionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl TypeAcquisitionConfig {
    pub fn allows(&self, package: &str) -> bool {
        self.enabled && !self.exclude.iter().any(|p| p == package)
    }
}

/// Module resolution settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionConfig {
    /// Probed extensions without the leading dot, in priority order.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Maximum number of reference hops followed from a root. `None` is
    /// unbounded.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            max_depth: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_manifest_names() -> Vec<String> {
    vec![projgraph_host::DEFAULT_MANIFEST_NAME.to_string()]
}

fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect()
}
