use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{
    aggregate::{self, AggregateError, Series},
    render::{self, ChartStyle, ChartText},
    store::DataStore,
    Error, Indicator, YearRange,
};

/// What the user picked: an indicator and a range of years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub indicator: Indicator,
    pub range: YearRange,
}

impl Selection {
    /// Line shown above the chart.
    pub fn subheader(&self) -> String {
        format!(
            "Average {} from {} to {}",
            self.indicator,
            self.range.low(),
            self.range.high()
        )
    }
}

/// A rendered chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub path: PathBuf,
    pub subheader: String,
    pub series: Series,
}

/// Ties a loaded dataset to the aggregation and the renderer.
#[derive(Debug)]
pub struct Dashboard {
    store: DataStore,
}

impl Dashboard {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    /// Validates a range against the years of the dataset. Missing ends
    /// select the first or last year.
    pub fn select(
        &self,
        indicator: Indicator,
        low: Option<i32>,
        high: Option<i32>,
    ) -> Result<Selection, Error> {
        let range = YearRange::within(self.store.year_bounds(), low, high)?;
        Ok(Selection { indicator, range })
    }

    pub fn series(&self, selection: &Selection) -> Result<Series, AggregateError> {
        aggregate::compute(&self.store, selection.indicator.column(), selection.range)
    }

    /// Computes the selection and renders it to `path`.
    ///
    /// A selection without data is reported as [`Error::EmptySeries`] and
    /// nothing is rendered.
    pub fn chart(
        &self,
        selection: &Selection,
        path: impl AsRef<Path>,
        style: &ChartStyle,
    ) -> Result<Chart, Error> {
        let series = self.series(selection)?;
        if series.is_empty() {
            debug!(?selection, "nothing to render");
            return Err(Error::EmptySeries {
                indicator: selection.indicator,
                low: selection.range.low(),
                high: selection.range.high(),
            });
        }

        let path = render::render(
            &series,
            &ChartText::from(selection.indicator),
            style,
            path,
        )?;
        info!(path = %path.display(), points = series.len(), "chart rendered");

        Ok(Chart {
            path,
            subheader: selection.subheader(),
            series,
        })
    }
}
