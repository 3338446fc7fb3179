//! Yearly climate indicators, averaged per year and rendered as an animated
//! line chart.
//!
//! ```no_run
//! use climate_tracker::{ChartStyle, Dashboard, DataStore, Indicator};
//!
//! let store = DataStore::open("climate_data.csv")?;
//! let dashboard = Dashboard::new(store);
//! let selection = dashboard.select(Indicator::SeaLevelRise, Some(2000), Some(2010))?;
//! let chart = dashboard.chart(&selection, "sea-level.gif", &ChartStyle::default())?;
//! println!("{}: {}", chart.subheader, chart.path.display());
//! # Ok::<(), climate_tracker::Error>(())
//! ```

pub mod aggregate;
pub mod dashboard;
pub mod font;
pub mod render;
pub mod selection;
pub mod store;

use miette::Diagnostic;
use thiserror::Error;

pub use aggregate::{compute, AggregateError, Series};
pub use dashboard::{Chart, Dashboard, Selection};
pub use font::FontError;
pub use render::{frame, frames, render, AxisBounds, ChartStyle, ChartText, Frame, RenderError};
pub use selection::{Indicator, SelectionError, YearRange};
pub use store::{DataStore, LoadError, Record, YEAR_COLUMN};

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Font(#[from] FontError),
    #[error("No {indicator} data in range {low}..={high}")]
    #[diagnostic(
        code(climate::empty_series),
        help("no data in range, pick a wider range of years")
    )]
    EmptySeries {
        indicator: Indicator,
        low: i32,
        high: i32,
    },
}
