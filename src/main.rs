mod loader;
mod matrix;
mod models;
mod report;

use anyhow::{bail, Result};
use clap::{Arg, Command};
use loader::RecordLoader;
use models::Config;
use std::fs;
use std::path::Path;

fn main() -> Result<()> {
    let matches = Command::new("attendance-report")
        .version("1.0")
        .about("Builds a static attendance report from exported course journal data")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("source-dir")
                .short('s')
                .long("source-dir")
                .value_name("DIR")
                .help("Directory with exported roster, meeting and journal files"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory the report is written to"),
        )
        .get_matches();

    let config_file = matches.get_one::<String>("config").unwrap();

    // Load or create configuration
    let mut config = if Path::new(config_file).exists() {
        println!("📋 Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)?
    } else {
        println!("📝 Creating default configuration file: {}", config_file);
        let default_config = Config::default();
        default_config.save_to_file(config_file)?;
        default_config
    };

    // Command line paths override the configured ones
    if let Some(dir) = matches.get_one::<String>("source-dir") {
        config.source_directory = dir.clone();
    }
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output_directory = dir.clone();
    }

    let source_dir = Path::new(&config.source_directory);
    if !source_dir.is_dir() {
        bail!(
            "source directory does not exist: {}",
            source_dir.display()
        );
    }

    let output_dir = config.output_directory.clone();
    fs::create_dir_all(&output_dir)?;

    println!("📂 Reading attendance data from: {}", config.source_directory);
    println!("📄 Output directory: {}", output_dir);

    let loader = RecordLoader::new(config.clone());
    let loaded = loader.load_all(source_dir)?;

    if !loaded.skipped.is_empty() {
        println!("⚠️  {} input file(s) skipped:", loaded.skipped.len());
        for skipped in &loaded.skipped {
            println!("   - {}: {}", skipped.file, skipped.reason);
        }
    }

    let result = matrix::build_matrix(&loaded.journal, &loaded.meetings, &config.absence_marker);

    let html = report::render_html(&result, &loaded.roster);
    let report_path = Path::new(&output_dir).join("report.html");
    fs::write(&report_path, html)?;

    let csv_path = Path::new(&output_dir).join("matrix.csv");
    report::write_matrix_csv(&result, &loaded.roster, &csv_path)?;

    let stub_count = result.meetings.iter().filter(|m| m.is_stub()).count();
    println!("\n📊 SUMMARY");
    println!("   Students in report: {}", result.matrix.len());
    println!(
        "   Meetings in report: {} ({} without metadata)",
        result.meetings.len(),
        stub_count
    );
    println!("   Journal records processed: {}", loaded.journal.len());
    println!("\n✅ Report written to {}", report_path.display());
    println!("   Matrix CSV written to {}", csv_path.display());
    Ok(())
}
