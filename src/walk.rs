//! End-to-end walk: open the model, measure every product once, feed the
//! spatial and material accumulators and assemble the report.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Span};

use crate::catalog::{PriceCatalog, PropertyCatalog};
use crate::config::WalkConfig;
use crate::error::{CatalogError, WalkError};
use crate::geometry::{measure, ExtrusionEngine, GeometryEngine};
use crate::materials::{
    MaterialAccumulator, MaterialProperties, TranslationTable, UnknownNameReport,
};
use crate::metrics::{BuildingMetrics, SpatialAccumulator};
use crate::model::{Element, IfcProject};
use crate::parser::parse_ifc_file;
use crate::progress::{with_progress, LogProgress, ProgressReporter};

const PROGRESS_DESCRIPTION: &str = "Walking elements";

/// Cooperative cancellation, checked before every element.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Catalogs of one walk, loaded fresh for every walk.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub properties: PropertyCatalog,
    pub prices: Option<PriceCatalog>,
    pub translation: TranslationTable,
}

impl Catalogs {
    pub fn load(config: &WalkConfig) -> Result<Self, CatalogError> {
        let properties = config.catalog.load_properties()?;
        let prices = config
            .prices
            .as_ref()
            .map(|source| source.load_prices())
            .transpose()?;
        let translation = config.translation.load()?;

        debug!(
            materials = properties.len(),
            prices = prices.as_ref().map(PriceCatalog::len),
            translations = translation.len(),
            "Loaded catalogs"
        );

        Ok(Self {
            properties,
            prices,
            translation,
        })
    }
}

/// Result of a completed walk.
#[derive(Debug, Clone, Serialize)]
pub struct WalkReport {
    pub project: String,
    pub schema: String,
    pub metrics: BuildingMetrics,
    pub materials: BTreeMap<String, MaterialProperties>,
    pub unknown: UnknownNameReport,
    /// Products with a representation.
    pub elements: usize,
    /// Elements that contributed to the metrics.
    pub processed: usize,
    pub skipped_geometry: usize,
    pub failed_materials: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicUsize,
    skipped_geometry: AtomicUsize,
    failed_materials: AtomicUsize,
}

/// Walks an IFC file with the built-in extrusion engine, logging progress.
///
/// # Example
///
/// ```no_run
/// use ifc_metrics::config::WalkConfig;
/// use ifc_metrics::walk::walk;
///
/// let report = walk("model.ifc", &WalkConfig::default())?;
/// println!("BGF: {:.2} m²", report.metrics.brutto_grundflaeche);
/// # Ok::<(), ifc_metrics::error::WalkError>(())
/// ```
pub fn walk<P: AsRef<Path>>(path: P, config: &WalkConfig) -> Result<WalkReport, WalkError> {
    let engine = ExtrusionEngine::new(config.settings.clone());
    walk_with(path, config, &engine, &LogProgress, &CancellationToken::new())
}

/// Walks an IFC file with an injected engine, progress reporter and
/// cancellation token. Only model-open and catalog failures are fatal
/// besides cancellation and timeout.
pub fn walk_with<P, E>(
    path: P,
    config: &WalkConfig,
    engine: &E,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<WalkReport, WalkError>
where
    P: AsRef<Path>,
    E: GeometryEngine + ?Sized,
{
    let span = info_span!("walk", session = config.session.as_deref().unwrap_or("-"));
    let _entered = span.enter();

    let catalogs = Catalogs::load(config)?;
    let project = parse_ifc_file(path)?;
    walk_project(&project, &catalogs, config, engine, progress, cancel)
}

/// Walks an already opened model.
pub fn walk_project<E>(
    project: &IfcProject,
    catalogs: &Catalogs,
    config: &WalkConfig,
    engine: &E,
    progress: &dyn ProgressReporter,
    cancel: &CancellationToken,
) -> Result<WalkReport, WalkError>
where
    E: GeometryEngine + ?Sized,
{
    let started = Instant::now();
    let deadline = config.timeout.map(|limit| started + limit);

    let spatial = SpatialAccumulator::new(ground_floor_elements(project));
    let materials = MaterialAccumulator::new(
        &catalogs.properties,
        catalogs.prices.as_ref(),
        &catalogs.translation,
        config.layer_policy,
    );
    let counters = Counters::default();

    let products = project.products();
    let total = products.len();
    info!(
        file = %project.file_path,
        elements = total,
        storeys = project.storeys.len(),
        priced = materials.is_priced(),
        parallel = config.parallel,
        "Starting walk"
    );

    spatial.start()?;

    let span = Span::current();
    let outcome = with_progress(
        progress,
        total,
        config.progress_interval,
        PROGRESS_DESCRIPTION,
        |ticker| {
            let visit = |element: &Element<'_>| -> Result<(), WalkError> {
                if cancel.is_cancelled() {
                    return Err(WalkError::Cancelled {
                        processed: ticker.count(),
                        total,
                    });
                }
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    return Err(WalkError::TimedOut {
                        elapsed: started.elapsed(),
                    });
                }

                let _entered = span.enter();
                let result = visit_element(project, element, engine, &spatial, &materials, &counters);
                ticker.tick();
                result
            };

            run_elements(config, &products, &visit)
        },
    );
    outcome?;

    let metrics = spatial.finalize(project.storeys.len(), project.site_area())?;
    let (materials, unknown) = materials.finish();
    log_unknown(&unknown);

    let report = WalkReport {
        project: project.name.clone(),
        schema: project.schema.clone(),
        metrics,
        materials,
        unknown,
        elements: total,
        processed: counters.processed.into_inner(),
        skipped_geometry: counters.skipped_geometry.into_inner(),
        failed_materials: counters.failed_materials.into_inner(),
        elapsed: started.elapsed(),
    };

    info!(
        processed = report.processed,
        skipped_geometry = report.skipped_geometry,
        failed_materials = report.failed_materials,
        materials = report.materials.len(),
        elapsed_s = report.elapsed.as_secs_f64(),
        "Walk finished"
    );

    Ok(report)
}

/// Ids of the elements under the ground-floor storey.
fn ground_floor_elements(project: &IfcProject) -> HashSet<u64> {
    match project.ground_floor() {
        Some((storey, true)) => {
            debug!(storey = %storey.name, "Ground floor at elevation 0");
            project.decomposition_of(storey.id)
        }
        Some((storey, false)) => {
            warn!(
                storey = %storey.name,
                elevation = storey.elevation,
                "No storey at elevation 0, using the first storey as ground floor"
            );
            project.decomposition_of(storey.id)
        }
        None => {
            warn!("Model has no storeys, built footprint stays 0");
            HashSet::new()
        }
    }
}

fn run_elements<'p, F>(
    config: &WalkConfig,
    products: &[Element<'p>],
    visit: &F,
) -> Result<(), WalkError>
where
    F: Fn(&Element<'p>) -> Result<(), WalkError> + Sync,
{
    if !config.parallel {
        return products.iter().try_for_each(visit);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads.unwrap_or(0))
        .thread_name(|i| format!("ifc-walk-{i}"))
        .build()?;
    pool.install(|| products.par_iter().try_for_each(visit))
}

/// One element: geometry failures skip it entirely, material failures only
/// drop its material contribution.
fn visit_element<E>(
    project: &IfcProject,
    element: &Element<'_>,
    engine: &E,
    spatial: &SpatialAccumulator,
    materials: &MaterialAccumulator<'_>,
    counters: &Counters,
) -> Result<(), WalkError>
where
    E: GeometryEngine + ?Sized,
{
    let quantities = match measure(engine, project, element) {
        Ok(quantities) => quantities,
        Err(error) => {
            debug!(
                id = element.id(),
                global_id = element.global_id(),
                entity = element.entity_type(),
                %error,
                "Skipping element without usable geometry"
            );
            counters.skipped_geometry.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
    };

    spatial.add(element.id(), element.class, &quantities)?;

    if let Err(error) = materials.accumulate(project, element, &quantities) {
        debug!(
            id = element.id(),
            global_id = element.global_id(),
            %error,
            "Dropping material contribution"
        );
        counters.failed_materials.fetch_add(1, Ordering::Relaxed);
    }

    counters.processed.fetch_add(1, Ordering::Relaxed);
    Ok(())
}

fn log_unknown(unknown: &UnknownNameReport) {
    if !unknown.translation.is_empty() {
        warn!(names = ?unknown.translation, "Material names without translation");
    }
    if !unknown.passport.is_empty() {
        warn!(names = ?unknown.passport, "Materials missing from the property catalog");
    }
    if !unknown.price.is_empty() {
        warn!(names = ?unknown.price, "Materials missing from the price catalog");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::parser::{index_project, StepFile};

    struct Flat;

    impl GeometryEngine for Flat {
        type Shape = ();

        fn create_shape(&self, _: &IfcProject, _: &Element<'_>) -> Result<(), GeometryError> {
            Ok(())
        }
        fn volume(&self, _: &()) -> f64 {
            1.0
        }
        fn footprint_area(&self, _: &()) -> f64 {
            2.0
        }
        fn max_extent(&self, _: &()) -> f64 {
            1.0
        }
    }

    fn project() -> IfcProject {
        let text = "ISO-10303-21;\nHEADER;\nENDSEC;\nDATA;\n\
            #1=IFCBUILDINGSTOREY('g',$,'EG',$,$,$,$,$,.ELEMENT.,0.);\n\
            #2=IFCSLAB('s',$,$,$,$,$,#9,$,$);\n\
            #3=IFCWALL('w',$,$,$,$,$,#9,$,$);\n\
            #4=IFCRELCONTAINEDINSPATIALSTRUCTURE('c',$,$,$,(#2,#3),#1);\n\
            ENDSEC;\nEND-ISO-10303-21;\n";
        index_project(StepFile::parse(text).unwrap(), "t.ifc".to_string())
    }

    fn catalogs() -> Catalogs {
        Catalogs {
            properties: PropertyCatalog::new(),
            prices: None,
            translation: TranslationTable::default(),
        }
    }

    #[test]
    fn sequential_walk_accumulates_metrics() {
        let config = WalkConfig {
            parallel: false,
            ..WalkConfig::default()
        };
        let report = walk_project(
            &project(),
            &catalogs(),
            &config,
            &Flat,
            &crate::progress::NoProgress,
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(report.elements, 2);
        assert_eq!(report.processed, 2);
        assert_eq!(report.metrics.brutto_rauminhalt, 2.0);
        assert_eq!(report.metrics.bebaute_flaeche, 2.0);
        assert_eq!(report.metrics.brutto_grundflaeche, 2.0);
        assert_eq!(report.metrics.stockwerke, 1);
        assert_eq!(report.metrics.bgf_bf_ratio, 1.0);
    }

    #[test]
    fn cancelled_token_aborts_without_report() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = walk_project(
            &project(),
            &catalogs(),
            &WalkConfig::default(),
            &Flat,
            &crate::progress::NoProgress,
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, WalkError::Cancelled { processed: 0, total: 2 }));
    }

    #[test]
    fn elapsed_timeout_aborts() {
        let config = WalkConfig {
            timeout: Some(Duration::ZERO),
            parallel: false,
            ..WalkConfig::default()
        };
        let err = walk_project(
            &project(),
            &catalogs(),
            &config,
            &Flat,
            &crate::progress::NoProgress,
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, WalkError::TimedOut { .. }));
    }

    #[test]
    fn ticker_counts_every_visited_element() {
        let seen = std::sync::Mutex::new(Vec::new());
        let reporter = |current: usize, total: usize, _: &str| {
            seen.lock().unwrap().push((current, total));
        };
        let config = WalkConfig {
            progress_interval: 1,
            ..WalkConfig::default()
        };
        walk_project(
            &project(),
            &catalogs(),
            &config,
            &Flat,
            &reporter,
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(seen.into_inner().unwrap().last(), Some(&(2, 2)));
    }
}
