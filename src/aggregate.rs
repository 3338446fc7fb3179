use std::collections::BTreeMap;

use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use crate::{store::DataStore, YearRange};

/// Yearly values, strictly ascending by year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: Vec<(i32, f64)>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum AggregateError {
    #[error("Column `{0}` not found in the dataset")]
    #[diagnostic(code(climate::missing_column))]
    MissingColumn(String),
    #[error("Column `{0}` is not numeric")]
    #[diagnostic(
        code(climate::aggregate::not_numeric),
        help("only columns holding numbers can be averaged")
    )]
    NotNumeric(String),
}

impl Series {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(i32, f64)] {
        &self.points
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.points
            .binary_search_by_key(&year, |&(y, _)| y)
            .ok()
            .map(|index| self.points[index].1)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.points.iter().map(|&(year, _)| year)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|&(_, value)| value)
    }
}

/// Collects through an ordered map: the result is sorted and a repeated year
/// keeps its last value.
impl FromIterator<(i32, f64)> for Series {
    fn from_iter<T: IntoIterator<Item = (i32, f64)>>(iter: T) -> Self {
        let points: BTreeMap<i32, f64> = iter.into_iter().collect();
        Self {
            points: points.into_iter().collect(),
        }
    }
}

/// Averages `column` per year over the records whose year lies in `range`.
///
/// Empty cells are skipped; a year with only empty cells gets no point. An
/// empty series is a valid result.
pub fn compute(store: &DataStore, column: &str, range: YearRange) -> Result<Series, AggregateError> {
    let Some(index) = store.column_index(column) else {
        return Err(if store.has_column(column) {
            AggregateError::NotNumeric(column.to_string())
        } else {
            AggregateError::MissingColumn(column.to_string())
        });
    };

    // Running mean per year: stays finite where a plain sum would overflow.
    let mut groups: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for record in store.records().iter().filter(|r| range.contains(r.year)) {
        if let Some(value) = record.value(index) {
            let (mean, count) = groups.entry(record.year).or_default();
            *count += 1;
            *mean += (value - *mean) / *count as f64;
        }
    }

    let series = Series {
        points: groups
            .into_iter()
            .map(|(year, (mean, _))| (year, mean))
            .collect(),
    };
    debug!(
        column,
        low = range.low(),
        high = range.high(),
        points = series.len(),
        "computed yearly means"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn store(csv: &str) -> DataStore {
        DataStore::from_str(csv).unwrap()
    }

    #[test]
    fn mean_per_year() {
        let store = store("Year,Sea_Level_Rise\n2000,10\n2000,20\n2001,30\n");
        let series = compute(&store, "Sea_Level_Rise", YearRange::new(2000, 2001).unwrap()).unwrap();
        assert_eq!(series.points(), [(2000, 15.0), (2001, 30.0)]);
        assert_eq!(series.get(2000), Some(15.0));
        assert_eq!(series.get(2002), None);
    }

    #[test]
    fn keeps_only_years_in_range() {
        let store = store(
            "Year,Deforestation\n2003,4\n1999,1\n2001,3\n2000,2\n2001,5\n2004,9\n2002,1\n",
        );
        let range = YearRange::new(2000, 2003).unwrap();
        let series = compute(&store, "Deforestation", range).unwrap();

        let years: Vec<i32> = series.years().collect();
        assert_eq!(years, [2000, 2001, 2002, 2003]);
        assert!(series.years().all(|year| range.contains(year)));
        assert!(years.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(series.get(2001), Some(4.0));
    }

    #[test]
    fn mean_matches_sum_over_count() {
        let values = [0.1, 0.2, 0.7, 1e-3, 123.456, -4.2];
        let csv: String = std::iter::once("Year,Glacier_Retreat".to_string())
            .chain(values.iter().map(|v| format!("1990,{v}")))
            .collect::<Vec<_>>()
            .join("\n");
        let store = store(&csv);
        let series = compute(&store, "Glacier_Retreat", YearRange::new(1990, 1990).unwrap()).unwrap();

        let expected = values.iter().sum::<f64>() / values.len() as f64;
        assert!((series.get(1990).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn huge_values_keep_a_finite_mean() {
        let store = store("Year,Deforestation\n2000,1e308\n2000,1e308\n2001,-1e308\n2001,-1e308\n");
        let series = compute(&store, "Deforestation", YearRange::new(2000, 2001).unwrap()).unwrap();
        assert_eq!(series.points(), [(2000, 1e308), (2001, -1e308)]);
    }

    #[test]
    fn empty_cells_are_skipped() {
        let store = store("Year,Glacier_Retreat,Deforestation\n2000,,1\n2000,4,2\n2001,,3\n");
        let series = compute(&store, "Glacier_Retreat", YearRange::new(2000, 2001).unwrap()).unwrap();
        assert_eq!(series.points(), [(2000, 4.0)]);
    }

    #[test]
    fn range_without_rows_gives_an_empty_series() {
        let store = store("Year,Sea_Level_Rise\n2000,1\n2003,2\n2005,3\n");
        let series = compute(&store, "Sea_Level_Rise", YearRange::new(2010, 2020).unwrap()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn compute_is_idempotent() {
        let store = store("Year,Sea_Level_Rise\n2001,0.3\n2000,0.1\n2001,0.4\n");
        let range = YearRange::new(2000, 2001).unwrap();
        assert_eq!(
            compute(&store, "Sea_Level_Rise", range).unwrap(),
            compute(&store, "Sea_Level_Rise", range).unwrap()
        );
    }

    #[test]
    fn missing_and_text_columns() {
        let store = store("Year,Country\n2000,France\n");
        let range = YearRange::new(2000, 2000).unwrap();
        assert!(matches!(
            compute(&store, "Deforestation", range),
            Err(AggregateError::MissingColumn(column)) if column == "Deforestation"
        ));
        assert!(matches!(
            compute(&store, "Country", range),
            Err(AggregateError::NotNumeric(column)) if column == "Country"
        ));
    }

    #[test]
    fn series_from_iter_sorts_and_dedups() {
        let series: Series = [(2001, 1.0), (2000, 2.0), (2001, 3.0)].into_iter().collect();
        assert_eq!(series.points(), [(2000, 2.0), (2001, 3.0)]);
    }
}
