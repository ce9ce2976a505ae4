use crate::cli::args::{Cli, Commands};
use crate::error::{ProcessingError, Result};
use crate::models::{CycloneSpec, Period, RegionPreset};
use crate::processors::{ExportMode, ExportPipeline, RegionFilter, TrackExtractor};
use crate::readers::{select_provinces, BoundaryProvider, GeoJsonBoundaryProvider, TileReader};
use crate::settings::Settings;
use crate::utils::constants::DEFAULT_MAX_WIND_KTS;
use crate::utils::filename::default_filtered_tiles_path;
use crate::utils::progress::ProgressReporter;
use crate::writers::{tiles_to_batch, ParquetWriter};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let result = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    result.map_err(|e| ProcessingError::Config(format!("Failed to initialise logging: {}", e)))
}

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Regions { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&settings.regions)?);
                return Ok(());
            }

            println!("Available regions:");
            for (key, preset) in &settings.regions {
                println!(
                    "- {}: {} ({}, {} provinces)",
                    key,
                    preset.name,
                    preset.country,
                    preset.provinces.len()
                );
            }
        }

        Commands::Filter {
            input,
            region,
            country,
            provinces,
            year,
            quarter,
            data_type,
            boundaries,
            output_file,
            compression,
            max_workers,
        } => {
            let preset = match (region, country) {
                (Some(key), _) => settings.region(&key)?.clone(),
                (None, Some(country)) => RegionPreset::custom(&country, provinces),
                (None, None) => {
                    return Err(ProcessingError::Config(
                        "Either --region or --country with --provinces is required".to_string(),
                    ))
                }
            };
            settings.validate_period(year, quarter, data_type)?;

            println!("Filtering tiles to {}", preset.name);
            println!("Input file: {}", input.display());
            debug!(
                "Upstream source for this period: {}",
                settings.s3_uri(data_type, year, quarter)
            );

            let boundaries_file = boundaries.unwrap_or_else(|| settings.paths.boundaries_file.clone());
            let provider = GeoJsonBoundaryProvider::new(&boundaries_file);
            let selected = select_provinces(provider.provinces(&preset.country)?, &preset.provinces);
            let filter = RegionFilter::new(selected, &preset)?.with_max_workers(max_workers);

            let progress = ProgressReporter::new_spinner("Reading raw tiles...", false);
            let raw = TileReader::new().read_raw(&input)?;
            progress.set_message("Joining tiles to provinces...");
            let dataset = filter.filter(&raw, Period::new(year, quarter), data_type)?;
            progress.finish_with_message(&format!("{} tile rows in region", dataset.len()));

            let output_file = output_file.unwrap_or_else(|| {
                default_filtered_tiles_path(
                    &settings.paths.ookla_dir,
                    &preset.name,
                    year,
                    quarter,
                    data_type,
                )
            });
            if let Some(parent) = output_file.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let writer = ParquetWriter::new()
                .with_compression(compression.as_deref().unwrap_or(settings.export.compression.as_str()))?
                .with_row_group_size(settings.export.row_group_size);
            writer.write_batch(&tiles_to_batch(&dataset)?, &output_file)?;
            info!("Saved filtered tiles to {}", output_file.display());

            println!("\n{}", writer.get_file_info(&output_file)?.summary());
        }

        Commands::Prepare {
            inputs,
            combine,
            output_dir,
            row_limit,
            compression,
            max_workers,
        } => {
            let mode = if combine || settings.export.combine {
                ExportMode::Combined
            } else {
                ExportMode::Individual
            };

            let mut pipeline = ExportPipeline::new(&settings)?.with_max_workers(max_workers);
            if let Some(dir) = output_dir {
                pipeline = pipeline.with_output_dir(&dir);
            }
            if let Some(limit) = row_limit {
                pipeline = pipeline.with_row_limit(limit)?;
            }
            if let Some(compression) = compression {
                pipeline = pipeline.with_compression(&compression)?;
            }

            println!("Preparing {} file(s) in {:?} mode", inputs.len(), mode);
            let outputs = pipeline.prepare(&inputs, mode).await?;

            println!(
                "\nCreated {} output set(s) in {}:",
                outputs.len(),
                pipeline.output_dir().display()
            );
            for (label, files) in &outputs {
                for file in files {
                    let size = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
                    println!(
                        "- {:15} {} ({:.1} MB)",
                        label,
                        file.display(),
                        size as f64 / 1_048_576.0
                    );
                }
            }
        }

        Commands::Track {
            name,
            year,
            formation,
            peak,
            dissipation,
            basin,
            max_wind,
            archive_dir,
            output_dir,
        } => {
            let cyclone = match name {
                Some(name) => {
                    let (Some(year), Some(formation_date), Some(peak_date), Some(dissipation_date)) =
                        (year, formation, peak, dissipation)
                    else {
                        return Err(ProcessingError::Config(
                            "--year, --formation, --peak and --dissipation are required with --name"
                                .to_string(),
                        ));
                    };
                    CycloneSpec {
                        name,
                        year,
                        basin,
                        formation_date,
                        peak_date,
                        dissipation_date,
                        max_wind_kts: max_wind.unwrap_or(DEFAULT_MAX_WIND_KTS),
                    }
                }
                None => {
                    let mut cyclone = settings.cyclone.clone().ok_or_else(|| {
                        ProcessingError::Config(
                            "No cyclone given: pass --name or configure [cyclone]".to_string(),
                        )
                    })?;
                    if let Some(wind) = max_wind {
                        cyclone.max_wind_kts = wind;
                    }
                    cyclone
                }
            };

            println!("Getting track for {} {}", cyclone.name, cyclone.year);
            let extractor = TrackExtractor::new(
                cyclone,
                &archive_dir.unwrap_or_else(|| settings.paths.ibtracs_dir.clone()),
                &output_dir.unwrap_or_else(|| settings.paths.tracks_dir.clone()),
            )?;
            let track = extractor.get_track()?;
            println!("Track ready: {} points", track.len());
        }

        Commands::Info { file } => {
            println!("Analyzing Parquet file: {}", file.display());

            let file_info = ParquetWriter::new().get_file_info(&file)?;
            println!("\n{}", file_info.summary());

            match TileReader::new().read_tiles(&file) {
                Ok(dataset) => {
                    println!("\nPeriods:");
                    for (period, count) in dataset.period_counts() {
                        println!("- {}: {} records", period, count);
                    }
                    if let Some(region) = dataset.region_name() {
                        println!("Region: {}", region);
                    }
                }
                Err(e) => debug!("Not a processed tile file: {}", e),
            }
        }
    }

    Ok(())
}
