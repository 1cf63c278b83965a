use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use ifc_metrics::config::{CliArgs, RunConfig};
use ifc_metrics::export::{export_csv, export_json};
use ifc_metrics::walk::{walk, WalkReport};

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();

    let filter = if args.verbose {
        EnvFilter::new("ifc_metrics=debug")
    } else {
        EnvFilter::new("ifc_metrics=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = RunConfig::try_from(args)?;
    let report = walk(&config.input, &config.walk)?;

    if let Some(json_path) = &config.json {
        export_json(&report, json_path)?;
        println!("Exported to JSON: {}", json_path.display());
    }

    if let Some(csv_path) = &config.csv {
        export_csv(&report, csv_path)?;
        println!("Exported to CSV: {}", csv_path.display());
    }

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &WalkReport) {
    let m = &report.metrics;
    println!("{} ({})", report.project, report.schema);
    println!(
        "  elements: {} walked, {} without geometry, {} without materials",
        report.processed, report.skipped_geometry, report.failed_materials
    );
    println!("  Stockwerke:                {}", m.stockwerke);
    println!("  Brutto-Rauminhalt:         {:>12.2} m³", m.brutto_rauminhalt);
    println!("  Brutto-Grundfläche:        {:>12.2} m²", m.brutto_grundflaeche);
    println!("  Bebaute Fläche:            {:>12.2} m²", m.bebaute_flaeche);
    println!("  Netto-Raumfläche:          {:>12.2} m²", m.netto_raumflaeche);
    println!("  Konstruktions-Grundfläche: {:>12.2} m²", m.konstruktions_grundflaeche);
    println!("  Grundstücksfläche:         {:>12.2} m²", m.grundstuecksflaeche);
    println!("  BGF/BF:                    {:>12.3}", m.bgf_bf_ratio);
    println!("  BRI/BGF:                   {:>12.3}", m.bri_bgf_ratio);

    if !report.materials.is_empty() {
        println!("  materials:");
        for (name, material) in &report.materials {
            println!(
                "    {name:<32} {:>12.1} kg {:>12.1} kg CO2e",
                material.mass, material.gwp_ml
            );
        }
    }
}
