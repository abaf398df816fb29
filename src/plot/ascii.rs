//! Character chart for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks on a dry run
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - aligned values: `o`
//! - line between consecutive values: `-`
//! - anchor-hour day boundaries: `:`

use crate::error::AppError;
use crate::plot::{Artifact, ChartRequest, Renderer, day_boundaries, hours_since};
use crate::report::format_caption;

pub const DEFAULT_WIDTH: usize = 72;
pub const DEFAULT_HEIGHT: usize = 12;

#[derive(Debug, Clone, Copy)]
pub struct TextRenderer {
    pub width: usize,
    pub height: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl TextRenderer {
    pub fn render_text(&self, request: &ChartRequest<'_>) -> String {
        let width = self.width.max(10);
        let height = self.height.max(5);
        let window = request.window;

        let x_max = hours_since(window, window.end).max(1.0);
        let points: Vec<(f64, f64)> = request
            .points
            .iter()
            .map(|p| (hours_since(window, p.slot), p.value))
            .collect();

        let (y_min, y_max) = y_range(&points).unwrap_or((0.0, 1.0));
        let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

        let mut grid = vec![vec![' '; width]; height];

        // Line first so points and separators can overlay.
        let cells: Vec<(usize, usize)> = points
            .iter()
            .map(|&(x, y)| (map_x(x, x_max, width), map_y(y, y_min, y_max, height)))
            .collect();
        for pair in cells.windows(2) {
            draw_line(&mut grid, pair[0], pair[1], '-');
        }
        for &(x, y) in &cells {
            grid[y][x] = 'o';
        }
        for boundary in day_boundaries(window) {
            let x = map_x(boundary, x_max, width);
            for row in grid.iter_mut() {
                if row[x] == ' ' {
                    row[x] = ':';
                }
            }
        }

        let mut out = format!(
            "{} | y=[{y_min:.2}, {y_max:.2}]\n",
            format_caption(request.channel, window)
        );
        for row in grid {
            out.push_str(&row.into_iter().collect::<String>());
            out.push('\n');
        }
        out
    }
}

impl Renderer for TextRenderer {
    fn render(&self, request: &ChartRequest<'_>) -> Result<Artifact, AppError> {
        Ok(Artifact::Text(self.render_text(request)))
    }
}

fn y_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let (min_y, max_y) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        // Flat series: center it.
        Some((min_y - 0.5, min_y + 0.5))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_max: f64, width: usize) -> usize {
    let u = (x / x_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham); only fills blank cells.
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let (mut x0, mut y0) = (from.0 as isize, from.1 as isize);
    let (x1, y1) = (to.0 as isize, to.1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
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

    #[test]
    fn plot_golden_snapshot_small() {
        let w = window();
        let channel = channel_spec("estacion.temperatura");
        let points = [
            AlignedPoint { slot: w.start, value: 10.0 },
            AlignedPoint { slot: w.end, value: 20.0 },
        ];
        let request = ChartRequest {
            channel: &channel,
            points: &points,
            window: &w,
        };

        let txt = TextRenderer { width: 10, height: 5 }.render_text(&request);
        let expected = concat!(
            "Temperatura 24h (°C) | y=[9.50, 20.50]\n",
            ":       -o\n",
            ":     -- :\n",
            ":   --   :\n",
            ": --     :\n",
            "o-       :\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_series_still_draws_frame() {
        let w = window();
        let channel = channel_spec("estacion.luz");
        let request = ChartRequest {
            channel: &channel,
            points: &[],
            window: &w,
        };
        let artifact = TextRenderer { width: 12, height: 5 }.render(&request).unwrap();
        let Artifact::Text(txt) = artifact else {
            panic!("expected text artifact");
        };
        assert_eq!(txt.lines().count(), 6);
        assert!(txt.starts_with("Luz 24h (lux)"));
    }
}
