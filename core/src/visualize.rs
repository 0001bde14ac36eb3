//! Six-panel PNG overview of a dataset.
//!
//! Panel text is rasterized with an embedded DejaVu Sans face registered on
//! first use, so no system fonts are needed. Building without the default
//! `fonts` feature, or calling [`Visualizer::with_text`] with `false`, draws
//! every panel framed instead of meshed and leaves out all text.

use std::error::Error;
use std::ops::Range;
use std::path::Path;

use framelens_common::config::DEFAULT_FIGURE_SIZE;
use framelens_common::{CommonError, Result};
use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::stats::{correlation_matrix, histogram, numeric_values, value_counts};

const FONTS: bool = cfg!(feature = "fonts");
const FONT: &str = "sans-serif";
#[cfg(feature = "fonts")]
const EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const HISTOGRAM_BINS: usize = 20;
const PIE_STEPS_PER_TURN: f64 = 360.0;
const COLOUR_BAR_STEPS: usize = 100;

const LINE_COLUMN: &str = "income";
const BAR_COLUMN: &str = "fraud_bool";
const PIE_COLUMN: &str = "housing_status";
const HISTOGRAM_COLUMN: &str = "customer_age";
const SCATTER_X_COLUMN: &str = "income";
const SCATTER_Y_COLUMN: &str = "credit_risk_score";

const COOLWARM_LOW: (f64, f64, f64) = (59.0, 76.0, 192.0);
const COOLWARM_MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
const COOLWARM_HIGH: (f64, f64, f64) = (180.0, 4.0, 38.0);
const UNDEFINED_CELL: RGBColor = RGBColor(128, 128, 128);

type Panel<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn render_error<E>(what: &str, error: E) -> CommonError
where
    E: Error + Send + Sync + 'static,
{
    CommonError::render_error_with_source(format!("Failed to {}", what), error)
}

/// Make the embedded face available to plotters under [`FONT`]
#[cfg(feature = "fonts")]
fn register_embedded_font() -> Result<()> {
    use std::sync::OnceLock;

    use plotters::style::FontStyle;

    static REGISTERED: OnceLock<std::result::Result<(), String>> = OnceLock::new();
    REGISTERED
        .get_or_init(|| {
            plotters::style::register_font(FONT, FontStyle::Normal, EMBEDDED_FONT)
                .map_err(|_| "invalid font data".to_string())
        })
        .clone()
        .map_err(|e| {
            CommonError::render_error_with_source(
                "Failed to load the embedded font",
                anyhow::anyhow!(e),
            )
        })
}

#[cfg(not(feature = "fonts"))]
fn register_embedded_font() -> Result<()> {
    Ok(())
}

/// Renders the overview figure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visualizer {
    width: u32,
    height: u32,
    text: bool,
}

impl Default for Visualizer {
    fn default() -> Self {
        Self::new(DEFAULT_FIGURE_SIZE.0, DEFAULT_FIGURE_SIZE.1)
    }
}

impl Visualizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text: FONTS,
        }
    }

    /// Turn panel text on or off. Text stays off when built without `fonts`.
    pub fn with_text(mut self, enabled: bool) -> Self {
        self.text = enabled && FONTS;
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn draws_text(&self) -> bool {
        self.text
    }

    /// Draw the six panels of `dataset` into a PNG at `path`.
    ///
    /// All required columns are checked before anything is drawn.
    pub fn render(&self, dataset: &Dataset, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let missing: Vec<&str> = [
            LINE_COLUMN,
            BAR_COLUMN,
            PIE_COLUMN,
            HISTOGRAM_COLUMN,
            SCATTER_Y_COLUMN,
        ]
        .into_iter()
        .filter(|name| dataset.column(name).is_err())
        .collect();
        if !missing.is_empty() {
            return Err(CommonError::not_found_error(format!(
                "columns {:?} required for plotting",
                missing
            )));
        }

        if self.text {
            register_embedded_font()?;
        }

        let text = self.text;
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| render_error("fill the background", e))?;
        let panels = root.split_evenly((2, 3));

        draw_line(&panels[0], dataset, text)?;
        draw_bars(&panels[1], dataset, text)?;
        draw_pie(&panels[2], dataset, text)?;
        draw_heatmap(&panels[3], dataset, text)?;
        draw_histogram(&panels[4], dataset, text)?;
        draw_scatter(&panels[5], dataset, text)?;

        root.present()
            .map_err(|e| render_error("write the figure", e))?;
        info!(
            "Rendered {}x{} figure to {} (text: {})",
            self.width,
            self.height,
            path.display(),
            text
        );
        Ok(())
    }
}

fn series(dataset: &Dataset, name: &str) -> Result<Vec<Option<f64>>> {
    numeric_values(dataset.column(name)?)
}

/// Finite extent of `values`, widened when empty or degenerate
fn extent(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (low, high) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if low > high {
        0.0..1.0
    } else if low == high {
        (low - 0.5)..(high + 0.5)
    } else {
        low..high
    }
}

/// Consecutive runs of finite values as (row, value) points
fn line_segments(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (i, value) in values.iter().enumerate() {
        match value.filter(|v| v.is_finite()) {
            Some(v) => current.push((i as f64, v)),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn chart<'a, 'b>(
    area: &'a Panel<'b>,
    title: &str,
    x: Range<f64>,
    y: Range<f64>,
    text: bool,
) -> Result<Chart<'a, 'b>> {
    let mut builder = ChartBuilder::on(area);
    builder.margin(10);
    if text {
        builder
            .caption(title, (FONT, 20))
            .x_label_area_size(30)
            .y_label_area_size(50);
    }
    builder
        .build_cartesian_2d(x, y)
        .map_err(|e| render_error("build chart", e))
}

fn draw_axes(
    chart: &mut Chart<'_, '_>,
    x_desc: &str,
    y_desc: &str,
    x_labels: Option<(usize, &dyn Fn(&f64) -> String)>,
    text: bool,
) -> Result<()> {
    if text {
        let mut mesh = chart.configure_mesh();
        mesh.disable_mesh().x_desc(x_desc).y_desc(y_desc);
        if let Some((count, formatter)) = x_labels {
            mesh.x_labels(count).x_label_formatter(formatter);
        }
        mesh.draw().map_err(|e| render_error("draw axes", e))?;
    } else {
        let (x, y) = (chart.x_range(), chart.y_range());
        chart
            .plotting_area()
            .draw(&Rectangle::new(
                [(x.start, y.start), (x.end, y.end)],
                BLACK.stroke_width(1),
            ))
            .map_err(|e| render_error("draw frame", e))?;
    }
    Ok(())
}

fn draw_line(area: &Panel<'_>, dataset: &Dataset, text: bool) -> Result<()> {
    let values = series(dataset, LINE_COLUMN)?;
    // Missing values break the line
    let segments = line_segments(&values);

    let x = 0.0..(values.len().max(1) as f64);
    let y = extent(segments.iter().flatten().map(|(_, v)| *v));
    let mut chart = chart(area, "Income", x, y, text)?;
    draw_axes(&mut chart, "Row", LINE_COLUMN, None, text)?;
    for segment in segments {
        chart
            .draw_series(LineSeries::new(segment, &BLUE))
            .map_err(|e| render_error("draw line", e))?;
    }
    Ok(())
}

fn draw_bars(area: &Panel<'_>, dataset: &Dataset, text: bool) -> Result<()> {
    let counts = value_counts(dataset.column(BAR_COLUMN)?)?;
    let top = counts.first().map_or(1, |(_, count)| *count).max(1) as f64;

    let mut chart = chart(
        area,
        "Fraud Indicator",
        0.0..(counts.len().max(1) as f64),
        0.0..(top * 1.05),
        text,
    )?;
    let label: &dyn Fn(&f64) -> String = &|x: &f64| {
        counts
            .get(x.floor() as usize)
            .map(|(label, _)| label.clone())
            .unwrap_or_default()
    };
    draw_axes(
        &mut chart,
        BAR_COLUMN,
        "count",
        Some((counts.len(), label)),
        text,
    )?;
    chart
        .draw_series(counts.iter().enumerate().map(|(i, (_, count))| {
            Rectangle::new(
                [(i as f64 + 0.1, 0.0), (i as f64 + 0.9, *count as f64)],
                BLUE.filled(),
            )
        }))
        .map_err(|e| render_error("draw bars", e))?;
    Ok(())
}

fn draw_pie(area: &Panel<'_>, dataset: &Dataset, text: bool) -> Result<()> {
    let counts = value_counts(dataset.column(PIE_COLUMN)?)?;
    if text {
        let titled = area
            .titled("Housing Status", (FONT, 20))
            .map_err(|e| render_error("draw pie title", e))?;
        draw_slices(&titled, &counts, text)?;
    } else {
        draw_slices(area, &counts, text)?;
    }
    debug!("Pie of {} has {} slices", PIE_COLUMN, counts.len());
    Ok(())
}

fn draw_slices(plot: &Panel<'_>, counts: &[(String, usize)], text: bool) -> Result<()> {
    let total: usize = counts.iter().map(|(_, count)| count).sum();
    let (width, height) = plot.dim_in_pixel();
    let center = (width as f64 / 2.0, height as f64 / 2.0);
    let radius = width.min(height) as f64 * 0.35;
    let point = |angle: f64, r: f64| {
        (
            (center.0 + r * angle.cos()).round() as i32,
            (center.1 - r * angle.sin()).round() as i32,
        )
    };

    let mut start = 0.0_f64;
    for (i, (label, count)) in counts.iter().enumerate() {
        let sweep = std::f64::consts::TAU * *count as f64 / total as f64;
        let steps = ((*count as f64 / total as f64 * PIE_STEPS_PER_TURN).ceil() as usize).max(1);

        let mut outline = Vec::with_capacity(steps + 2);
        outline.push(point(0.0, 0.0));
        outline.extend(
            (0..=steps).map(|s| point(start + sweep * s as f64 / steps as f64, radius)),
        );
        plot.draw(&Polygon::new(outline, Palette99::pick(i).filled()))
            .map_err(|e| render_error("draw pie slice", e))?;

        if text {
            let middle = start + sweep / 2.0;
            let share = *count as f64 / total as f64 * 100.0;
            plot.draw(&Text::new(
                format!("{} {:.1}%", label, share),
                point(middle, radius * 1.12),
                (FONT, 14),
            ))
            .map_err(|e| render_error("draw pie label", e))?;
        }
        start += sweep;
    }
    Ok(())
}

/// Map a correlation in [-1, 1] onto a diverging blue-grey-red scale
pub fn coolwarm(value: f64) -> RGBColor {
    if value.is_nan() {
        return UNDEFINED_CELL;
    }
    let t = (value.clamp(-1.0, 1.0) + 1.0) / 2.0;
    let (from, to, local) = if t < 0.5 {
        (COOLWARM_LOW, COOLWARM_MID, t * 2.0)
    } else {
        (COOLWARM_MID, COOLWARM_HIGH, (t - 0.5) * 2.0)
    };
    let mix = |a: f64, b: f64| (a + (b - a) * local).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

fn draw_heatmap(area: &Panel<'_>, dataset: &Dataset, text: bool) -> Result<()> {
    let matrix = correlation_matrix(dataset)?;
    let n = matrix.len();

    let (width, _) = area.dim_in_pixel();
    let (cells, bar) = area.split_horizontally(width * 5 / 6);

    let side = n.max(1) as f64;
    let mut chart = chart(&cells, "Correlation Matrix", 0.0..side, 0.0..side, text)?;
    let label: &dyn Fn(&f64) -> String = &|x: &f64| {
        matrix
            .columns
            .get(x.floor() as usize)
            .cloned()
            .unwrap_or_default()
    };
    draw_axes(&mut chart, "", "", Some((n, label)), text)?;
    chart
        .draw_series((0..n).flat_map(|row| {
            let matrix = &matrix;
            (0..n).map(move |col| {
                // Row 0 at the top
                let top = (n - row) as f64;
                Rectangle::new(
                    [(col as f64, top - 1.0), (col as f64 + 1.0, top)],
                    coolwarm(matrix.get(row, col)).filled(),
                )
            })
        }))
        .map_err(|e| render_error("draw heatmap", e))?;

    let mut scale = chart_without_title(&bar, text)?;
    let no_labels: &dyn Fn(&f64) -> String = &|_: &f64| String::new();
    draw_axes(&mut scale, "", "Correlation", Some((0, no_labels)), text)?;
    scale
        .draw_series((0..COLOUR_BAR_STEPS).map(|i| {
            let low = -1.0 + 2.0 * i as f64 / COLOUR_BAR_STEPS as f64;
            let high = low + 2.0 / COLOUR_BAR_STEPS as f64;
            Rectangle::new(
                [(0.0, low), (1.0, high)],
                coolwarm((low + high) / 2.0).filled(),
            )
        }))
        .map_err(|e| render_error("draw colour bar", e))?;
    debug!("Heatmap over {} numeric columns", n);
    Ok(())
}

fn chart_without_title<'a, 'b>(area: &'a Panel<'b>, text: bool) -> Result<Chart<'a, 'b>> {
    let mut builder = ChartBuilder::on(area);
    builder.margin(10);
    if text {
        // Leave room for the heatmap caption so the bar lines up with the cells
        builder.margin_top(40).y_label_area_size(40).x_label_area_size(30);
    }
    builder
        .build_cartesian_2d(0.0..1.0, -1.0..1.0)
        .map_err(|e| render_error("build colour bar", e))
}

fn draw_histogram(area: &Panel<'_>, dataset: &Dataset, text: bool) -> Result<()> {
    let values = series(dataset, HISTOGRAM_COLUMN)?;
    let hist = histogram(&values, HISTOGRAM_BINS);
    let x = hist.edges[0]..hist.edges[hist.edges.len() - 1];
    let y = 0.0..(hist.max_count().max(1) as f64 * 1.05);

    let mut chart = chart(area, "Customer Age", x, y, text)?;
    draw_axes(&mut chart, HISTOGRAM_COLUMN, "Frequency", None, text)?;
    chart
        .draw_series(hist.counts.iter().enumerate().map(|(i, count)| {
            Rectangle::new(
                [(hist.edges[i], 0.0), (hist.edges[i + 1], *count as f64)],
                BLUE.filled(),
            )
        }))
        .map_err(|e| render_error("draw histogram", e))?;
    Ok(())
}

fn draw_scatter(area: &Panel<'_>, dataset: &Dataset, text: bool) -> Result<()> {
    let xs = series(dataset, SCATTER_X_COLUMN)?;
    let ys = series(dataset, SCATTER_Y_COLUMN)?;
    let points: Vec<(f64, f64)> = xs
        .iter()
        .zip(&ys)
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect();

    let mut chart = chart(
        area,
        "Income vs Credit Risk Score",
        extent(points.iter().map(|(x, _)| *x)),
        extent(points.iter().map(|(_, y)| *y)),
        text,
    )?;
    draw_axes(&mut chart, "Income", "Credit Risk Score", None, text)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|point| Circle::new(*point, 2, BLUE.mix(0.5).filled())),
        )
        .map_err(|e| render_error("draw scatter", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sample(rows: usize) -> Dataset {
        let housing = ["BA", "BB", "BC"];
        Dataset::from_columns([
            (
                "income",
                Arc::new(Float64Array::from_iter_values(
                    (0..rows).map(|i| (i % 10) as f64 / 10.0),
                )) as ArrayRef,
            ),
            (
                "fraud_bool",
                Arc::new(Int64Array::from_iter_values((0..rows).map(|i| (i % 7 == 0) as i64)))
                    as ArrayRef,
            ),
            (
                "housing_status",
                Arc::new(StringArray::from_iter_values(
                    (0..rows).map(|i| housing[i % housing.len()]),
                )) as ArrayRef,
            ),
            (
                "customer_age",
                Arc::new(Int64Array::from_iter_values((0..rows).map(|i| 20 + (i % 5) as i64 * 10)))
                    as ArrayRef,
            ),
            (
                "credit_risk_score",
                Arc::new(Int64Array::from_iter_values((0..rows).map(|i| (i * 37 % 300) as i64)))
                    as ArrayRef,
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_renders_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plots.png");
        Visualizer::new(600, 400).render(&sample(50), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    #[cfg(feature = "fonts")]
    fn test_text_is_drawn_by_default() {
        let dir = tempdir().unwrap();
        let with_text = dir.path().join("with_text.png");
        let without_text = dir.path().join("without_text.png");

        let visualizer = Visualizer::new(600, 400);
        assert!(visualizer.draws_text());
        visualizer.render(&sample(50), &with_text).unwrap();
        visualizer
            .with_text(false)
            .render(&sample(50), &without_text)
            .unwrap();

        let with_text = std::fs::read(&with_text).unwrap();
        assert_eq!(&with_text[..8], b"\x89PNG\r\n\x1a\n");
        assert_ne!(with_text, std::fs::read(&without_text).unwrap());
    }

    #[test]
    fn test_text_can_be_turned_off() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.png");
        let visualizer = Visualizer::new(600, 400).with_text(false);
        assert!(!visualizer.draws_text());
        visualizer.render(&sample(50), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_failure_keeps_cause() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("plots.png");

        let err = Visualizer::new(300, 200)
            .render(&sample(10), &path)
            .unwrap_err();
        assert!(matches!(err, CommonError::RenderError { .. }));
        assert!(err.to_string().contains("write the figure"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_line_breaks_at_missing_values() {
        let values = [
            Some(0.1),
            Some(0.2),
            None,
            Some(f64::NAN),
            Some(0.5),
            None,
            Some(0.7),
            Some(0.8),
        ];
        assert_eq!(
            line_segments(&values),
            vec![
                vec![(0.0, 0.1), (1.0, 0.2)],
                vec![(4.0, 0.5)],
                vec![(6.0, 0.7), (7.0, 0.8)],
            ]
        );
        assert!(line_segments(&[None, None]).is_empty());
        assert!(line_segments(&[]).is_empty());
    }

    #[test]
    fn test_renders_empty_dataset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.png");
        Visualizer::new(300, 200).render(&sample(0), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_missing_columns() {
        let dataset = Dataset::from_columns([(
            "income",
            Arc::new(Float64Array::from(vec![1.0])) as ArrayRef,
        )])
        .unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("plots.png");

        let err = Visualizer::default().render(&dataset, &path).unwrap_err();
        assert!(matches!(err, CommonError::NotFoundError { .. }));
        assert!(err.to_string().contains("housing_status"));
        assert!(!path.exists());
    }

    #[test]
    fn test_coolwarm_scale() {
        assert_eq!(coolwarm(-1.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.0), RGBColor(221, 221, 221));
        assert_eq!(coolwarm(1.0), RGBColor(180, 4, 38));
        assert_eq!(coolwarm(f64::NAN), UNDEFINED_CELL);
        assert_eq!(coolwarm(7.0), coolwarm(1.0));
    }

    #[test]
    fn test_default_size() {
        assert_eq!(Visualizer::default().size(), (1500, 1000));
    }
}
