//! Climate change tracker: averages a climate indicator per year over a range
//! of years and renders it as an animated chart.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use climate_tracker::{font, ChartStyle, Dashboard, DataStore, Indicator};
use miette::{IntoDiagnostic, WrapErr};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IndicatorArg {
    SeaLevelRise,
    GlacierRetreat,
    Deforestation,
}

impl From<IndicatorArg> for Indicator {
    fn from(value: IndicatorArg) -> Self {
        match value {
            IndicatorArg::SeaLevelRise => Indicator::SeaLevelRise,
            IndicatorArg::GlacierRetreat => Indicator::GlacierRetreat,
            IndicatorArg::Deforestation => Indicator::Deforestation,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "climate-tracker", about = "Climate Change Tracker")]
struct Args {
    /// CSV file with a `Year` column and one column per indicator
    #[arg(long, default_value = "climate_data.csv")]
    data: PathBuf,

    #[arg(long, value_enum, default_value_t = IndicatorArg::SeaLevelRise)]
    indicator: IndicatorArg,

    /// First year, defaults to the first year of the dataset
    #[arg(long)]
    from: Option<i32>,

    /// Last year (inclusive), defaults to the last year of the dataset
    #[arg(long)]
    to: Option<i32>,

    /// Where to write the GIF, defaults to a new temporary file
    #[arg(long)]
    output: Option<PathBuf>,

    /// TrueType/OpenType font used for chart text
    #[arg(long)]
    font: Option<PathBuf>,

    #[arg(long, default_value_t = 1000)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Print the columns and years of the dataset and exit
    #[arg(long, default_value_t = false)]
    list: bool,
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!("opening {}", args.data.display());
    let store = DataStore::open(&args.data)?;

    if args.list {
        let (min, max) = store.year_bounds();
        println!("years: {min}..={max}");
        for column in store.numeric_columns() {
            println!("numeric: {column}");
        }
        for column in store.text_columns() {
            println!("text: {column}");
        }
        return Ok(());
    }

    font::register(args.font.as_deref())?;

    let dashboard = Dashboard::new(store);
    let selection = dashboard.select(args.indicator.into(), args.from, args.to)?;

    let temporary = args.output.is_none();
    let output = match args.output {
        Some(output) => output,
        None => tempfile::Builder::new()
            .prefix("climate-")
            .suffix(".gif")
            .tempfile()
            .and_then(|file| file.into_temp_path().keep().map_err(|e| e.error))
            .into_diagnostic()
            .wrap_err("Could not create a temporary file for the chart")?,
    };

    let style = ChartStyle::new(args.width, args.height);
    let chart = match dashboard.chart(&selection, &output, &style) {
        Ok(chart) => chart,
        Err(e) => {
            if temporary {
                if let Err(error) = std::fs::remove_file(&output) {
                    warn!(%error, "could not remove {}", output.display());
                }
            }
            return Err(e.into());
        }
    };

    println!("{}", chart.subheader);
    println!("{}", chart.path.display());
    Ok(())
}
