//! Scan conversion of the shape primitives.
//!
//! Everything here clips to the canvas instead of failing; a shape hanging off the edge simply
//! loses its invisible part.

use crate::{
    canvas::Canvas,
    error::{Error, Result},
};
use pixmatrix_common::Rgb;

const MAX_X: i64 = Canvas::WIDTH as i64 - 1;
const MAX_Y: i64 = Canvas::HEIGHT as i64 - 1;

/// Outline and optional fill color of a closed shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeStyle {
    pub outline: Rgb,
    pub fill: Option<Rgb>,
}

impl ShapeStyle {
    pub const fn outline(color: Rgb) -> Self {
        Self {
            outline: color,
            fill: None,
        }
    }

    /// Solid shape in a single color.
    pub const fn filled(color: Rgb) -> Self {
        Self {
            outline: color,
            fill: Some(color),
        }
    }

    pub const fn with_fill(mut self, fill: Rgb) -> Self {
        self.fill = Some(fill);
        self
    }
}

impl From<Rgb> for ShapeStyle {
    fn from(color: Rgb) -> Self {
        Self::outline(color)
    }
}

/// Cells of a Bresenham line, each visited once.
///
/// The walk starts at the endpoint with the smaller coordinate on the major axis, so both
/// endpoint orders yield the same sequence.
#[derive(Clone, Debug)]
pub struct Line {
    x: i64,
    y: i64,
    dx: i64,
    dy: i64,
    sx: i64,
    sy: i64,
    err: i64,
    x_major: bool,
    remaining: u64,
}

impl Line {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();
        let x_major = dx >= dy;

        let swap = if x_major { x0 > x1 } else { y0 > y1 };
        let (x0, y0, x1, y1) = if swap {
            (x1, y1, x0, y0)
        } else {
            (x0, y0, x1, y1)
        };

        Self {
            x: x0,
            y: y0,
            dx,
            dy,
            sx: if x0 < x1 { 1 } else { -1 },
            sy: if y0 < y1 { 1 } else { -1 },
            err: if x_major { dx / 2 } else { dy / 2 },
            x_major,
            remaining: dx.max(dy) as u64 + 1,
        }
    }

    /// Drop the cells whose major-axis coordinate falls outside `0..=max`.
    ///
    /// The cells that remain are exactly those the unclipped walk visits there.
    fn clip_major(mut self, max: i64) -> Self {
        // the major axis always walks forward
        let (start, len) = if self.x_major {
            (self.x, self.dx)
        } else {
            (self.y, self.dy)
        };

        let first = (-start).max(0);
        let last = (max - start).min(len);
        if first > last {
            self.remaining = 0;
            return self;
        }

        self.advance(first);
        self.remaining = (last - first) as u64 + 1;
        self
    }

    /// Jump `steps` cells ahead without visiting them.
    fn advance(&mut self, steps: i64) {
        if steps == 0 {
            return;
        }

        let (major, minor) = if self.x_major {
            (self.dx as i128, self.dy as i128)
        } else {
            (self.dy as i128, self.dx as i128)
        };

        // err stays in 0..major, so the number of minor steps is fixed by it
        let owed = steps as i128 * minor - self.err as i128;
        let minor_steps = if owed <= 0 { 0 } else { (owed + major - 1) / major };
        self.err = (self.err as i128 - steps as i128 * minor + minor_steps * major) as i64;

        let minor_steps = minor_steps as i64;
        if self.x_major {
            self.x += self.sx * steps;
            self.y += self.sy * minor_steps;
        } else {
            self.y += self.sy * steps;
            self.x += self.sx * minor_steps;
        }
    }
}

impl Iterator for Line {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        // always within the endpoint range, which came from i32
        let cell = (self.x as i32, self.y as i32);

        if self.x_major {
            self.err -= self.dy;
            if self.err < 0 {
                self.y += self.sy;
                self.err += self.dx;
            }
            self.x += self.sx;
        } else {
            self.err -= self.dx;
            if self.err < 0 {
                self.x += self.sx;
                self.err += self.dy;
            }
            self.y += self.sy;
        }

        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, usize::try_from(self.remaining).ok())
    }
}

pub fn draw_line(canvas: &mut Canvas, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
    let line = Line::new(x0, y0, x1, y1);
    let max = if line.x_major { MAX_X } else { MAX_Y };

    for (x, y) in line.clip_major(max) {
        canvas.plot(x, y, color);
    }
}

/// `x` of the first octant at row offset `y`, for `y` in `0..=octant_end(radius)`.
///
/// The midpoint walk keeps its decision variable at `x² - x + (y + 1)² - r²`, so `x` is the
/// largest value with `x(x - 1) + y² < r²`.
fn octant_x(radius: i64, y: i64) -> i64 {
    let (radius, y) = (radius as i128, y as i128);
    let rest = radius * radius - y * y;
    let root = rest.isqrt();
    let x = if root * root + root < rest { root + 1 } else { root };
    x as i64
}

/// Last row offset of the first octant, where `x >= y` still holds.
fn octant_end(radius: i64) -> i64 {
    let r_sq = radius as i128 * radius as i128;
    let (mut low, mut high) = (0, radius);
    while low < high {
        let mid = low + (high - low + 1) / 2;
        let y = mid as i128;
        if 2 * y * y - y < r_sq {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    low
}

/// Half width of the filled disc at row offset `dy`, `None` past the top and bottom.
fn disc_half_width(radius: i64, end: i64, dy: i64) -> Option<i64> {
    if dy <= end {
        return Some(octant_x(radius, dy));
    }
    if dy > radius {
        return None;
    }

    // widest octant row whose x still reaches dy
    let (radius, dy) = (radius as i128, dy as i128);
    let limit = radius * radius - dy * (dy - 1);
    Some(((limit - 1).isqrt() as i64).min(end))
}

fn span(canvas: &mut Canvas, from_x: i64, to_x: i64, y: i64, color: Rgb) {
    if !(0..=MAX_Y).contains(&y) {
        return;
    }

    for x in from_x.max(0)..=to_x.min(MAX_X) {
        canvas.plot(x as i32, y as i32, color);
    }
}

fn plot_wide(canvas: &mut Canvas, x: i64, y: i64, color: Rgb) {
    if (0..=MAX_X).contains(&x) && (0..=MAX_Y).contains(&y) {
        canvas.plot(x as i32, y as i32, color);
    }
}

/// Midpoint circle around `(cx, cy)`.
///
/// Only the rows and columns that can reach the canvas are computed, so the cost does not grow
/// with `radius`.
pub fn draw_circle(
    canvas: &mut Canvas,
    cx: i32,
    cy: i32,
    radius: i32,
    style: ShapeStyle,
) -> Result<()> {
    if radius < 0 {
        return Err(Error::invalid(format!("negative radius {radius}")));
    }

    let (cx, cy, radius) = (cx as i64, cy as i64, radius as i64);
    if radius == 0 {
        plot_wide(canvas, cx, cy, style.outline);
        return Ok(());
    }

    let end = octant_end(radius);

    if let Some(fill) = style.fill {
        for y in 0..=MAX_Y {
            if let Some(half) = disc_half_width(radius, end, (y - cy).abs()) {
                span(canvas, cx - half, cx + half, y, fill);
            }
        }
    }

    // octant rows landing on a canvas row, then those landing on a canvas column
    let windows = [
        (-cy, MAX_Y - cy),
        (cy - MAX_Y, cy),
        (-cx, MAX_X - cx),
        (cx - MAX_X, cx),
    ];
    for (from, to) in windows {
        for y in from.max(0)..=to.min(end) {
            let x = octant_x(radius, y);
            for (px, py) in [
                (cx + x, cy + y),
                (cx - x, cy + y),
                (cx + x, cy - y),
                (cx - x, cy - y),
                (cx + y, cy + x),
                (cx - y, cy + x),
                (cx + y, cy - x),
                (cx - y, cy - x),
            ] {
                plot_wide(canvas, px, py, style.outline);
            }
        }
    }

    Ok(())
}

pub fn draw_rectangle(
    canvas: &mut Canvas,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    style: ShapeStyle,
) {
    let (left, right) = (x0.min(x1) as i64, x0.max(x1) as i64);
    let (top, bottom) = (y0.min(y1) as i64, y0.max(y1) as i64);

    if let Some(fill) = style.fill {
        for y in top.max(0)..=bottom.min(MAX_Y) {
            span(canvas, left, right, y, fill);
        }
    }

    span(canvas, left, right, top, style.outline);
    span(canvas, left, right, bottom, style.outline);
    for y in top.max(0)..=bottom.min(MAX_Y) {
        plot_wide(canvas, left, y, style.outline);
        plot_wide(canvas, right, y, style.outline);
    }
}
