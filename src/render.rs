//! Animated line charts.
//!
//! A chart is a sequence of frames, frame `i` showing the first `i` points of
//! the series, encoded as a GIF played once at two frames per second.

use std::{
    error::Error as StdError,
    io::{self, BufWriter},
    ops::Range,
    path::{Path, PathBuf},
};

use gif::{Encoder, EncodingError};
use miette::Diagnostic;
use plotters::{drawing::DrawingAreaErrorKind, prelude::*};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::{aggregate::Series, font, Indicator};

pub const FRAMES_PER_SECOND: u16 = 2;
/// GIF delays are counted in hundredths of a second.
const FRAME_DELAY: u16 = 100 / FRAMES_PER_SECOND;
/// Share of the extreme values added below and above them on the y axis.
const PADDING: f64 = 0.1;
/// NeuQuant sampling factor, 1 (best) to 30 (fastest).
const QUANTIZE_SPEED: i32 = 10;

#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("Cannot chart an empty series")]
    #[diagnostic(code(climate::render::empty), help("no data in range"))]
    EmptySeries,
    #[error("Could not write chart to `{}`", path.display())]
    #[diagnostic(code(climate::render::write))]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("GIF encoding failed: {0}")]
    #[diagnostic(code(climate::render::encode))]
    Encode(#[source] EncodingError),
    #[error("Drawing failed: {0}")]
    #[diagnostic(code(climate::render::draw))]
    Draw(String),
    #[error("Invalid chart size {width}x{height}")]
    #[diagnostic(
        code(climate::render::size),
        help("width and height must be between 1 and 65535 pixels")
    )]
    Size { width: u32, height: u32 },
}

impl<E: StdError + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        Self::Draw(e.to_string())
    }
}

/// Texts drawn around the plot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartText {
    pub title: String,
    pub y_label: String,
}

impl ChartText {
    pub fn new(title: impl Into<String>, y_label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            y_label: y_label.into(),
        }
    }
}

impl From<Indicator> for ChartText {
    fn from(indicator: Indicator) -> Self {
        Self::new(indicator.title(), indicator.y_label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    /// Draw caption, axis labels and descriptions. Needs a registered font.
    pub text: bool,
}

impl ChartStyle {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text: font::available(),
        }
    }
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::new(1000, 600)
    }
}

/// Axis extents of a chart: the years as they are, the values padded by 10%
/// of themselves.
///
/// The padding is relative to each extreme, not to the spread: a zero minimum
/// gets no room below it and a negative minimum is pulled up towards zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub years: (i32, i32),
    pub values: (f64, f64),
}

impl AxisBounds {
    /// `None` for an empty series.
    pub fn of(series: &Series) -> Option<Self> {
        let points = series.points();
        let (&(first, _), &(last, _)) = (points.first()?, points.last()?);
        let (min, max) = series
            .values()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
                (min.min(value), max.max(value))
            });

        Some(Self {
            years: (first, last),
            values: (min - PADDING * min, max + PADDING * max),
        })
    }

    /// Ranges handed to the plotting backend: ordered and never zero wide,
    /// otherwise ticks cannot be placed.
    fn plot_ranges(&self) -> (Range<i32>, Range<f64>) {
        let (first, last) = self.years;
        let years = if first == last {
            first.saturating_sub(1)..last.saturating_add(1)
        } else {
            first..last
        };

        let (low, high) = (
            self.values.0.min(self.values.1),
            self.values.0.max(self.values.1),
        );
        let values = if low == high {
            low - 1.0..high + 1.0
        } else {
            low..high
        };
        (years, values)
    }
}

/// The first `index` points of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame<'a> {
    index: usize,
    points: &'a [(i32, f64)],
}

impl<'a> Frame<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn points(&self) -> &'a [(i32, f64)] {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Frame `index` of the animation of `series`. Past the end it is the whole
/// series.
pub fn frame(series: &Series, index: usize) -> Frame<'_> {
    let points = series.points();
    Frame {
        index,
        points: &points[..index.min(points.len())],
    }
}

/// Every frame of the animation, from the empty one to the full series.
pub fn frames(series: &Series) -> impl Iterator<Item = Frame<'_>> {
    (0..=series.len()).map(move |index| frame(series, index))
}

/// Renders `series` as an animated GIF at `path`.
///
/// Frames are encoded into a temporary file next to `path` which replaces
/// `path` only once the GIF is complete and synced. On any error the temporary
/// file is removed and `path` is left untouched.
#[tracing::instrument(skip_all, fields(points = series.len(), path = %path.as_ref().display()))]
pub fn render(
    series: &Series,
    text: &ChartText,
    style: &ChartStyle,
    path: impl AsRef<Path>,
) -> Result<PathBuf, RenderError> {
    let path = path.as_ref();
    let bounds = AxisBounds::of(series).ok_or(RenderError::EmptySeries)?;
    let (width, height) = match (u16::try_from(style.width), u16::try_from(style.height)) {
        (Ok(width), Ok(height)) if width > 0 && height > 0 => (width, height),
        _ => {
            return Err(RenderError::Size {
                width: style.width,
                height: style.height,
            })
        }
    };

    let write_error = |source: io::Error| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };
    let encode_error = |e: EncodingError| match e {
        EncodingError::Io(source) => write_error(source),
        e => RenderError::Encode(e),
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut writer = BufWriter::new(NamedTempFile::new_in(dir).map_err(write_error)?);

    let mut encoder = Encoder::new(&mut writer, width, height, &[]).map_err(encode_error)?;
    let mut pixels = vec![0; usize::from(width) * usize::from(height) * 3];
    for frame in frames(series) {
        draw_frame(&mut pixels, style, text, &bounds, frame)?;
        let mut image = gif::Frame::from_rgb_speed(width, height, &pixels, QUANTIZE_SPEED);
        image.delay = FRAME_DELAY;
        encoder.write_frame(&image).map_err(encode_error)?;
        debug!(frame = frame.index(), "encoded frame");
    }
    encoder.into_inner().map_err(write_error)?;

    let file = writer
        .into_inner()
        .map_err(|e| write_error(e.into_error()))?;
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path).map_err(|e| write_error(e.error))?;

    debug!(
        frames = series.len() + 1,
        ?bounds,
        "chart written"
    );
    Ok(path.to_path_buf())
}

fn draw_frame(
    pixels: &mut [u8],
    style: &ChartStyle,
    text: &ChartText,
    bounds: &AxisBounds,
    frame: Frame<'_>,
) -> Result<(), RenderError> {
    let root = BitMapBackend::with_buffer(pixels, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let (years, values) = bounds.plot_ranges();
    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if style.text {
        builder
            .caption(&text.title, (font::FAMILY, 28).into_font())
            .x_label_area_size(50)
            .y_label_area_size(80);
    }
    let mut chart = builder.build_cartesian_2d(years, values)?;

    if style.text {
        chart
            .configure_mesh()
            .x_desc("Year")
            .y_desc(&text.y_label)
            .label_style((font::FAMILY, 14).into_font())
            .light_line_style(BLACK.mix(0.05))
            .draw()?;
    }

    chart.draw_series(
        LineSeries::new(frame.points().iter().copied(), BLUE.stroke_width(2)).point_size(4),
    )?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(i32, f64)]) -> Series {
        points.iter().copied().collect()
    }

    #[test]
    fn bounds_pad_by_ten_percent_of_the_extremes() {
        let bounds = AxisBounds::of(&series(&[(2000, 5.0), (2001, 15.0)])).unwrap();
        assert_eq!(bounds.years, (2000, 2001));
        assert_eq!(bounds.values, (4.5, 16.5));
    }

    #[test]
    fn bounds_keep_their_quirks() {
        let zero = AxisBounds::of(&series(&[(2000, 0.0), (2001, 10.0)])).unwrap();
        assert_eq!(zero.values.0, 0.0);

        let negative = AxisBounds::of(&series(&[(2000, -10.0), (2001, -5.0)])).unwrap();
        assert_eq!(negative.values, (-10.0 - 0.1 * -10.0, -5.0 + 0.1 * -5.0));
        assert!(negative.values.0 > -10.0);
    }

    #[test]
    fn no_bounds_for_an_empty_series() {
        assert_eq!(AxisBounds::of(&Series::default()), None);
    }

    #[test]
    fn plot_ranges_are_never_degenerate() {
        let single = AxisBounds::of(&series(&[(2000, 0.0)])).unwrap();
        assert_eq!(single.values, (0.0, 0.0));
        let (years, values) = single.plot_ranges();
        assert_eq!(years, 1999..2001);
        assert_eq!(values, -1.0..1.0);

        let earliest = AxisBounds::of(&series(&[(i32::MIN, 1.0)])).unwrap();
        assert_eq!(earliest.plot_ranges().0, i32::MIN..i32::MIN + 1);
        let latest = AxisBounds::of(&series(&[(i32::MAX, 1.0)])).unwrap();
        assert_eq!(latest.plot_ranges().0, i32::MAX - 1..i32::MAX);

        let inverted = AxisBounds::of(&series(&[(2000, -10.0)])).unwrap();
        let (_, values) = inverted.plot_ranges();
        assert!(values.start < values.end);
    }

    #[test]
    fn frames_grow_one_point_at_a_time() {
        let series = series(&[(2000, 1.0), (2001, 4.0), (2002, 2.0), (2005, 8.0)]);
        let frames: Vec<Frame> = frames(&series).collect();

        assert_eq!(frames.len(), series.len() + 1);
        assert!(frames[0].is_empty());
        for pair in frames.windows(2) {
            assert_eq!(pair[1].len(), pair[0].len() + 1);
            assert_eq!(&pair[1].points()[..pair[0].len()], pair[0].points());
        }
        assert_eq!(frames.last().unwrap().points(), series.points());
        assert!(frames.iter().enumerate().all(|(i, f)| f.index() == i));
    }

    #[test]
    fn frame_past_the_end_is_the_whole_series() {
        let series = series(&[(2000, 1.0), (2001, 4.0)]);
        assert_eq!(frame(&series, 10).points(), series.points());
        assert!(frame(&Series::default(), 0).is_empty());
    }

    #[test]
    fn empty_series_fails_before_touching_the_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.gif");
        let err = render(
            &Series::default(),
            &ChartText::from(Indicator::Deforestation),
            &ChartStyle::new(64, 48),
            &path,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::EmptySeries));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn oversized_chart_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = render(
            &series(&[(2000, 1.0)]),
            &ChartText::new("t", "y"),
            &ChartStyle::new(70_000, 10),
            dir.path().join("chart.gif"),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Size { width: 70_000, height: 10 }));
    }

    #[test]
    fn unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("chart.gif");
        let err = render(
            &series(&[(2000, 1.0), (2001, 2.0)]),
            &ChartText::new("t", "y"),
            &ChartStyle::new(64, 48),
            &path,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Write { path: p, .. } if p == path));
        assert!(!path.exists());
    }
}
