use crate::models::DataType;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "connectivity-processor")]
#[command(about = "Regional aggregation and export of connectivity-performance tile data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Settings file (TOML) [default: ./connectivity.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the configured region presets
    Regions {
        #[arg(long, help = "Print presets as JSON")]
        json: bool,
    },

    /// Restrict a raw tile file to the provinces of a region
    Filter {
        #[arg(short, long, help = "Raw tile Parquet file for one period")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Region preset key (see `regions`)",
            required_unless_present = "country"
        )]
        region: Option<String>,

        #[arg(long, help = "Country for a custom province list", requires = "provinces")]
        country: Option<String>,

        #[arg(long, value_delimiter = ',', help = "Comma-separated provinces for a custom region")]
        provinces: Vec<String>,

        #[arg(short, long)]
        year: i32,

        #[arg(short, long)]
        quarter: u8,

        #[arg(short = 't', long, default_value = "mobile", value_parser = parse_data_type)]
        data_type: DataType,

        #[arg(long, help = "Boundary GeoJSON [default: from settings]")]
        boundaries: Option<PathBuf>,

        #[arg(
            short,
            long,
            help = "Output Parquet path [default: {ookla_dir}/{region}_{year}_Q{quarter}_{type}_{YYYYMMDD}.parquet]"
        )]
        output_file: Option<PathBuf>,

        #[arg(short, long, help = "Parquet compression [default: from settings]")]
        compression: Option<String>,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Aggregate processed tile files into sheets and Parquet
    Prepare {
        #[arg(required = true, help = "Processed tile files, or names inside the Ookla data directory")]
        inputs: Vec<PathBuf>,

        #[arg(long, help = "Merge all inputs into one export")]
        combine: bool,

        #[arg(short, long, help = "Output directory [default: from settings]")]
        output_dir: Option<PathBuf>,

        #[arg(long, help = "Rows per sheet before splitting [default: from settings]")]
        row_limit: Option<usize>,

        #[arg(short, long, help = "Parquet compression [default: from settings]")]
        compression: Option<String>,

        #[arg(long, default_value_t = num_cpus::get())]
        max_workers: usize,
    },

    /// Extract a cyclone track from IBTrACS, or synthesize one from its dates
    Track {
        #[arg(short, long, help = "Storm name [default: cyclone in settings]")]
        name: Option<String>,

        #[arg(short, long, requires = "name")]
        year: Option<i32>,

        #[arg(long, requires = "name")]
        formation: Option<NaiveDate>,

        #[arg(long, requires = "name")]
        peak: Option<NaiveDate>,

        #[arg(long, requires = "name")]
        dissipation: Option<NaiveDate>,

        #[arg(long, default_value = "SI")]
        basin: String,

        #[arg(long, help = "Peak sustained wind in knots [default: 50]")]
        max_wind: Option<f64>,

        #[arg(long, help = "Directory holding the IBTrACS CSV [default: from settings]")]
        archive_dir: Option<PathBuf>,

        #[arg(short, long, help = "Directory for track CSVs [default: from settings]")]
        output_dir: Option<PathBuf>,
    },

    /// Show Parquet file information
    Info {
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn parse_data_type(s: &str) -> Result<DataType, String> {
    s.parse::<DataType>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_prepare() {
        let cli = Cli::try_parse_from([
            "connectivity-processor",
            "prepare",
            "a.parquet",
            "b.parquet",
            "--combine",
            "--row-limit",
            "1000",
        ])
        .unwrap();

        match cli.command {
            Commands::Prepare {
                inputs,
                combine,
                row_limit,
                ..
            } => {
                assert_eq!(inputs.len(), 2);
                assert!(combine);
                assert_eq!(row_limit, Some(1000));
            }
            _ => panic!("expected prepare"),
        }
    }

    #[test]
    fn test_parse_filter_custom_region() {
        let cli = Cli::try_parse_from([
            "connectivity-processor",
            "filter",
            "-i",
            "raw.parquet",
            "--country",
            "Indonesia",
            "--provinces",
            "Bali,Nusa Tenggara Barat",
            "-y",
            "2024",
            "-q",
            "2",
            "-t",
            "fixed",
        ])
        .unwrap();

        match cli.command {
            Commands::Filter {
                region,
                provinces,
                data_type,
                ..
            } => {
                assert!(region.is_none());
                assert_eq!(provinces, vec!["Bali", "Nusa Tenggara Barat"]);
                assert_eq!(data_type, DataType::Fixed);
            }
            _ => panic!("expected filter"),
        }
    }
}
