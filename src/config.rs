use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use crate::catalog::{CatalogSource, UserCatalog};
use crate::error::CatalogError;
use crate::geometry::GeometrySettings;
use crate::materials::{LayerMeasurePolicy, TranslationSource};

pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// Everything one walk needs besides the model path.
#[derive(Debug, Clone)]
pub struct WalkConfig {
    pub catalog: CatalogSource,
    /// Price catalog; the priced variant runs when this is set.
    pub prices: Option<CatalogSource>,
    pub translation: TranslationSource,
    pub settings: GeometrySettings,
    /// Worker threads, `None` for all cores.
    pub threads: Option<usize>,
    /// Walk on the calling thread when false.
    pub parallel: bool,
    /// Elements between progress updates.
    pub progress_interval: usize,
    pub layer_policy: LayerMeasurePolicy,
    pub timeout: Option<Duration>,
    /// Opaque user or session id attached to every log line of the walk.
    pub session: Option<String>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            catalog: CatalogSource::Bundled,
            prices: None,
            translation: TranslationSource::Bundled,
            settings: GeometrySettings::default(),
            threads: None,
            parallel: true,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            layer_policy: LayerMeasurePolicy::default(),
            timeout: None,
            session: None,
        }
    }
}

/// Fully resolved command line run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub verbose: bool,
    pub walk: WalkConfig,
}

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "ifc-metrics",
    about = "Building metrics and material takeoff from IFC files",
    version
)]
pub struct CliArgs {
    /// Path to IFC file
    pub file: PathBuf,

    /// Property catalog (`;` delimited) instead of the bundled one
    #[arg(long, value_name = "PATH", conflicts_with = "user_catalog")]
    pub catalog: Option<PathBuf>,

    /// User catalog as JSON `{"header": [..], "data": {..}}`
    #[arg(long, value_name = "JSON")]
    pub user_catalog: Option<PathBuf>,

    /// Price catalog; enables the priced variant
    #[arg(long, value_name = "PATH", conflicts_with = "bundled_prices")]
    pub prices: Option<PathBuf>,

    /// Enable the priced variant with the bundled price catalog
    #[arg(long)]
    pub bundled_prices: bool,

    /// Material name translation table instead of the bundled one
    #[arg(long, value_name = "PATH")]
    pub translation: Option<PathBuf>,

    /// Export the report as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Export material totals as CSV
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Worker thread count (default: all cores)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Walk elements on a single thread
    #[arg(long)]
    pub sequential: bool,

    /// Abort the walk after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// How layered materials share an element's quantities
    #[arg(long, value_enum, default_value = "apportioned")]
    pub layer_policy: LayerMeasurePolicy,

    /// Session id attached to log lines
    #[arg(long)]
    pub session: Option<String>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Reads a user catalog table from a JSON file.
pub fn load_user_table(path: &Path) -> Result<UserCatalog, CatalogError> {
    let file = File::open(path).map_err(|source| CatalogError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CatalogError::UserTable {
        path: path.to_path_buf(),
        source,
    })
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = CatalogError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let catalog = match (&args.user_catalog, &args.catalog) {
            (Some(path), _) => CatalogSource::User(load_user_table(path)?),
            (None, Some(path)) => CatalogSource::File(path.clone()),
            (None, None) => CatalogSource::Bundled,
        };

        let prices = match args.prices {
            Some(path) => Some(CatalogSource::File(path)),
            None if args.bundled_prices => Some(CatalogSource::Bundled),
            None => None,
        };

        let translation = args
            .translation
            .map_or(TranslationSource::Bundled, TranslationSource::File);

        Ok(Self {
            input: args.file,
            json: args.json,
            csv: args.csv,
            verbose: args.verbose,
            walk: WalkConfig {
                catalog,
                prices,
                translation,
                threads: args.threads,
                parallel: !args.sequential,
                layer_policy: args.layer_policy,
                timeout: args.timeout.map(Duration::from_secs),
                session: args.session,
                ..WalkConfig::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn run(args: &[&str]) -> Result<RunConfig, CatalogError> {
        RunConfig::try_from(CliArgs::parse_from(args))
    }

    #[test]
    fn defaults_walk_unpriced_in_parallel() {
        let config = run(&["ifc-metrics", "haus.ifc"]).unwrap();
        assert_eq!(config.input, PathBuf::from("haus.ifc"));
        assert!(config.walk.parallel);
        assert!(config.walk.prices.is_none());
        assert!(matches!(config.walk.catalog, CatalogSource::Bundled));
        assert_eq!(config.walk.layer_policy, LayerMeasurePolicy::Apportioned);
        assert_eq!(config.walk.progress_interval, DEFAULT_PROGRESS_INTERVAL);
    }

    #[test]
    fn flags_map_onto_walk_config() {
        let config = run(&[
            "ifc-metrics",
            "haus.ifc",
            "--bundled-prices",
            "--sequential",
            "-j",
            "3",
            "--timeout",
            "90",
            "--layer-policy",
            "whole",
            "--session",
            "user-7",
            "--json",
            "out.json",
        ])
        .unwrap();
        assert!(matches!(config.walk.prices, Some(CatalogSource::Bundled)));
        assert!(!config.walk.parallel);
        assert_eq!(config.walk.threads, Some(3));
        assert_eq!(config.walk.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.walk.layer_policy, LayerMeasurePolicy::WholeElement);
        assert_eq!(config.walk.session.as_deref(), Some("user-7"));
        assert_eq!(config.json, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn user_catalog_is_read_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"header": ["k","a","b","c","d","e","f"], "data": {{}}}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap();
        let config = run(&["ifc-metrics", "haus.ifc", "--user-catalog", path]).unwrap();
        assert!(matches!(config.walk.catalog, CatalogSource::User(ref t) if t.header.len() == 7));
    }

    #[test]
    fn malformed_user_catalog_is_a_catalog_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let path = file.path().to_str().unwrap();
        let err = run(&["ifc-metrics", "haus.ifc", "--user-catalog", path]).unwrap_err();
        assert!(matches!(err, CatalogError::UserTable { .. }));
    }
}
