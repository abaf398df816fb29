//! SVG charts via plotters.
//!
//! The drawn line is lightly smoothed for readability; the summary statistics
//! are always computed on the unsmoothed aligned values.

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::Duration;
use plotters::prelude::*;

use crate::error::AppError;
use crate::plot::{Artifact, ChartRequest, Renderer, day_boundaries, hours_since};
use crate::report::format_caption;

/// Kernel width, in slots.
pub const SMOOTHING_SIGMA: f64 = 1.1;

const CHART_SIZE: (u32, u32) = (1000, 420);
const SEPARATOR_DOTS: usize = 60;

const LINE_COLOR: RGBColor = RGBColor(31, 119, 180);
const SEPARATOR_COLOR: RGBColor = RGBColor(140, 140, 140);

/// Writes `<dir>/<feed_key>.svg`.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    dir: PathBuf,
}

impl SvgRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, feed_key: &str) -> PathBuf {
        self.dir.join(format!("{feed_key}.svg"))
    }

    /// The SVG document as a string.
    pub fn render_svg(&self, request: &ChartRequest<'_>) -> Result<String, AppError> {
        let mut buf = String::new();
        draw_chart(&mut buf, CHART_SIZE, request).map_err(|e| {
            AppError::new(4, format!("Failed to draw chart for '{}': {e}", request.channel.key))
        })?;
        Ok(buf)
    }
}

impl Renderer for SvgRenderer {
    fn render(&self, request: &ChartRequest<'_>) -> Result<Artifact, AppError> {
        let svg = self.render_svg(request)?;
        write_file(&self.dir, &self.path_for(&request.channel.key), &svg)?;
        Ok(Artifact::File(self.path_for(&request.channel.key)))
    }
}

fn write_file(dir: &Path, path: &Path, contents: &str) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::new(4, format!("Failed to create chart dir '{}': {e}", dir.display())))?;
    std::fs::write(path, contents)
        .map_err(|e| AppError::new(4, format!("Failed to write chart '{}': {e}", path.display())))
}

fn draw_chart(buf: &mut String, size: (u32, u32), request: &ChartRequest<'_>) -> Result<(), Box<dyn Error>> {
    let window = request.window;
    let x_max = hours_since(window, window.end).max(1.0);

    let xs: Vec<f64> = request.points.iter().map(|p| hours_since(window, p.slot)).collect();
    let raw: Vec<f64> = request.points.iter().map(|p| p.value).collect();
    let smoothed = gaussian_smooth(&raw, SMOOTHING_SIGMA);
    let (y0, y1) = y_bounds(&smoothed);

    let root = SVGBackend::with_string(buf, size).into_drawing_area();
    root.fill(&WHITE)?;

    let start = window.start;
    let caption = format_caption(request.channel, window);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 18))
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 56)
        .set_label_area_size(LabelAreaPosition::Bottom, 32)
        .build_cartesian_2d(0.0..x_max, y0..y1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .light_line_style(&WHITE)
        .bold_line_style(&BLACK.mix(0.12))
        .x_labels(7)
        .y_labels(6)
        .x_label_formatter(&|h| {
            let t = start + Duration::seconds((h * 3600.0).round() as i64);
            t.format("%d/%m %H:%M").to_string()
        })
        .y_label_formatter(&|v| format!("{v:.1}"))
        .y_desc(format!("Value {}", request.channel.unit_suffix()))
        .draw()?;

    for x in day_boundaries(window) {
        let step = (y1 - y0) / SEPARATOR_DOTS as f64;
        chart.draw_series(
            (0..=SEPARATOR_DOTS).map(|i| Circle::new((x, y0 + step * i as f64), 1, SEPARATOR_COLOR.filled())),
        )?;
    }

    chart.draw_series(LineSeries::new(
        xs.iter().copied().zip(smoothed.iter().copied()),
        LINE_COLOR.stroke_width(2),
    ))?;

    root.present()?;
    Ok(())
}

fn y_bounds(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.06 } else { 0.5 };
    (lo - pad, hi + pad)
}

/// Gaussian filter over the sample index, mirrored at the edges.
///
/// The kernel is truncated at `4σ`; output has the input's length.
pub fn gaussian_smooth(values: &[f64], sigma: f64) -> Vec<f64> {
    if values.len() < 2 || sigma <= 0.0 {
        return values.to_vec();
    }
    let radius = (4.0 * sigma + 0.5) as isize;
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let norm: f64 = kernel.iter().sum();

    let n = values.len() as isize;
    (0..n)
        .map(|i| {
            let acc: f64 = (-radius..=radius)
                .zip(&kernel)
                .map(|(k, w)| w * values[mirror(i + k, n)])
                .sum();
            acc / norm
        })
        .collect()
}

/// `d c b a | a b c d | d c b a`
fn mirror(mut i: isize, n: isize) -> usize {
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Santiago;

    use crate::config::channel_spec;
    use crate::domain::{AlignedPoint, ReportingWindow};

    fn window() -> ReportingWindow {
        ReportingWindow {
            start: Santiago.with_ymd_and_hms(2025, 1, 9, 8, 0, 0).unwrap(),
            end: Santiago.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap(),
            span_days: 1,
        }
    }

    fn ramp(w: &ReportingWindow, n: usize) -> Vec<AlignedPoint> {
        (0..n)
            .map(|i| AlignedPoint {
                slot: w.start + Duration::minutes(30 * i as i64),
                value: 15.0 + i as f64 * 0.25,
            })
            .collect()
    }

    #[test]
    fn smoothing_preserves_constants_and_length() {
        let flat = vec![3.0; 9];
        let out = gaussian_smooth(&flat, SMOOTHING_SIGMA);
        assert_eq!(out.len(), 9);
        assert!(out.iter().all(|v| (v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn smoothing_spreads_a_spike_symmetrically() {
        let mut spike = vec![0.0; 11];
        spike[5] = 1.0;
        let out = gaussian_smooth(&spike, SMOOTHING_SIGMA);
        assert!(out[5] < 1.0 && out[5] > out[4]);
        assert!((out[4] - out[6]).abs() < 1e-12);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn smoothing_short_inputs_pass_through() {
        assert!(gaussian_smooth(&[], SMOOTHING_SIGMA).is_empty());
        assert_eq!(gaussian_smooth(&[4.2], SMOOTHING_SIGMA), vec![4.2]);
    }

    #[test]
    fn mirror_reflects_out_of_range_indices() {
        assert_eq!(mirror(-1, 4), 0);
        assert_eq!(mirror(-2, 4), 1);
        assert_eq!(mirror(4, 4), 3);
        assert_eq!(mirror(5, 4), 2);
        assert_eq!(mirror(-3, 2), 1);
    }

    #[test]
    fn renders_svg_document() {
        let w = window();
        let channel = channel_spec("estacion.temperatura");
        let points = ramp(&w, 49);
        let request = ChartRequest {
            channel: &channel,
            points: &points,
            window: &w,
        };
        let svg = SvgRenderer::new("unused").render_svg(&request).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Temperatura 24h"));
        assert!(svg.contains("polyline"));
    }

    #[test]
    fn writes_one_file_per_feed_key() {
        let dir = std::env::temp_dir().join(format!("station-report-svg-{}", std::process::id()));
        let w = window();
        let channel = channel_spec("estacion-dot-punto-rocio");
        let points = ramp(&w, 5);
        let request = ChartRequest {
            channel: &channel,
            points: &points,
            window: &w,
        };

        let renderer = SvgRenderer::new(&dir);
        let artifact = renderer.render(&request).unwrap();
        let expected = dir.join("estacion-dot-punto-rocio.svg");
        assert_eq!(artifact, Artifact::File(expected.clone()));
        assert!(std::fs::read_to_string(&expected).unwrap().contains("<svg"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
