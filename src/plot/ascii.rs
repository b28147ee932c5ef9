//! ASCII plotting of efficiency curves for terminal output.
//!
//! Fixed-size grid, deterministic output (golden tests compare it verbatim).
//!
//! Plot elements:
//! - measured efficiencies: `o`
//! - fitted turn-on: `-` line

use crate::domain::{CurveRecord, FitResult};
use crate::models::predict;

/// Render one tuple's efficiency points over its fitted curve, when there is one.
pub fn render_efficiency_plot(record: &CurveRecord, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let points: Vec<(f64, f64)> = record
        .curve
        .points
        .iter()
        .map(|p| (p.x, p.efficiency))
        .collect();
    let (x_min, x_max) = x_range(&points)
        .or_else(|| edge_range(&record.curve.edges))
        .unwrap_or((0.0, 1.0));
    let curve = record
        .fit
        .as_ref()
        .map(|fit| sample_curve(fit, x_min, x_max, width));

    let (y_min, y_max) = y_range(&points, curve.as_deref()).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    if let Some(curve) = &curve {
        draw_curve(&mut grid, curve, (x_min, x_max), (y_min, y_max));
    }
    for &(x, y) in &points {
        if !y.is_finite() {
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {}=[{x_min:.3}, {x_max:.3}] | efficiency=[{y_min:.3}, {y_max:.3}] | {}\n",
        record.curve.variable, record.key
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let (min, max) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(x, _)| (lo.min(x), hi.max(x)));
    (min.is_finite() && max.is_finite() && max > min).then_some((min, max))
}

fn edge_range(edges: &[f64]) -> Option<(f64, f64)> {
    match (edges.first(), edges.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => Some((lo, hi)),
        _ => None,
    }
}

fn sample_curve(fit: &FitResult, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    let p = fit.params.to_array();
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            (x, predict(fit.family, x, &p))
        })
        .collect()
}

fn y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in points.iter().chain(curve.unwrap_or(&[])) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    (min_y.is_finite() && max_y.is_finite() && max_y > min_y).then_some((min_y, max_y))
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let pad = ((max - min).abs() * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Row 0 is the top.
    (height as f64 - 1.0 - u * (height as f64 - 1.0)).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], xr: (f64, f64), yr: (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev: Option<(usize, usize)> = None;
    for &(x, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let col = map_x(x, xr.0, xr.1, width);
        let row = map_y(y, yr.0, yr.1, height);
        match prev {
            Some(from) => draw_line(grid, from, (col, row), '-'),
            None => grid[row][col] = '-',
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let (mut x0, mut y0) = (from.0 as isize, from.1 as isize);
    let (x1, y1) = (to.0 as isize, to.1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize))
        {
            if *cell == ' ' {
                *cell = ch;
            }
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
