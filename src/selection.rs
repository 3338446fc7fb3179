use std::{fmt, str::FromStr};

use miette::Diagnostic;
use thiserror::Error;

/// The climate metric a chart is drawn for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    SeaLevelRise,
    GlacierRetreat,
    Deforestation,
}

impl Indicator {
    pub const ALL: [Indicator; 3] = [
        Indicator::SeaLevelRise,
        Indicator::GlacierRetreat,
        Indicator::Deforestation,
    ];

    /// Column of the dataset holding the metric.
    pub fn column(self) -> &'static str {
        match self {
            Self::SeaLevelRise => "Sea_Level_Rise",
            Self::GlacierRetreat => "Glacier_Retreat",
            Self::Deforestation => "Deforestation",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SeaLevelRise => "Sea Level Rise",
            Self::GlacierRetreat => "Glacier Retreat",
            Self::Deforestation => "Deforestation",
        }
    }

    pub fn y_label(self) -> &'static str {
        match self {
            Self::SeaLevelRise => "Average Sea Level Rise (mm)",
            Self::GlacierRetreat => "Average Glacier Retreat (km²)",
            Self::Deforestation => "Average Deforestation (hectares)",
        }
    }

    pub fn title(self) -> String {
        format!("Average {} Over Years", self.name())
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Indicator {
    type Err = SelectionError;

    /// Accepts `Sea Level Rise`, `Sea_Level_Rise` or `sea-level-rise`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|indicator| {
                indicator
                    .column()
                    .chars()
                    .filter(|&c| c != '_')
                    .flat_map(char::to_lowercase)
                    .eq(wanted.chars())
            })
            .ok_or_else(|| SelectionError::UnknownIndicator(s.to_string()))
    }
}

/// An inclusive range of years, `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    low: i32,
    high: i32,
}

#[derive(Debug, Error, Diagnostic)]
pub enum SelectionError {
    #[error("Unknown climate indicator `{0}`")]
    #[diagnostic(
        code(climate::selection::indicator),
        help("expected one of: Sea Level Rise, Glacier Retreat, Deforestation")
    )]
    UnknownIndicator(String),
    #[error("Year range is inverted: {low} > {high}")]
    #[diagnostic(code(climate::selection::inverted))]
    Inverted { low: i32, high: i32 },
    #[error("Year {year} is outside of the dataset ({min}..={max})")]
    #[diagnostic(code(climate::selection::bounds))]
    OutOfBounds { year: i32, min: i32, max: i32 },
}

impl YearRange {
    pub fn new(low: i32, high: i32) -> Result<Self, SelectionError> {
        if low > high {
            return Err(SelectionError::Inverted { low, high });
        }
        Ok(Self { low, high })
    }

    /// Builds a range inside `bounds`, a missing end falling back to the
    /// matching bound.
    pub fn within(
        (min, max): (i32, i32),
        low: Option<i32>,
        high: Option<i32>,
    ) -> Result<Self, SelectionError> {
        let range = Self::new(low.unwrap_or(min), high.unwrap_or(max))?;
        for year in [range.low, range.high] {
            if year < min || year > max {
                return Err(SelectionError::OutOfBounds { year, min, max });
            }
        }
        Ok(range)
    }

    pub fn low(&self) -> i32 {
        self.low
    }

    pub fn high(&self) -> i32 {
        self.high
    }

    pub fn contains(&self, year: i32) -> bool {
        self.low <= year && year <= self.high
    }
}
