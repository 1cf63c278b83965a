//! # IFC Metrics
//!
//! Building metrics and material takeoff from IFC files.
//!
//! ## Features
//!
//! - Parse IFC files (IFC2x3 and IFC4 schemas)
//! - Gross volume, gross floor area, built footprint, net room and
//!   construction area after ÖNORM B 1800, with BGF/BF and BRI/BGF ratios
//! - Per-material mass, waste, recycling, GWP, AP, PENRT and price totals
//!   from `;`-delimited catalogs or a user-uploaded table
//! - Parallel walk with progress reporting, cancellation and timeout
//! - Export to CSV and JSON
//!
//! ## Example
//!
//! ```no_run
//! use ifc_metrics::config::WalkConfig;
//! use ifc_metrics::walk::walk;
//!
//! let report = walk("model.ifc", &WalkConfig::default()).expect("walk failed");
//! println!("Project: {}", report.project);
//! println!("BGF: {:.2} m²", report.metrics.brutto_grundflaeche);
//! for (name, material) in &report.materials {
//!     println!("{name}: {:.1} kg", material.mass);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod materials;
pub mod metrics;
pub mod model;
pub mod parser;
pub mod progress;
pub mod walk;
