//! Where newly revealed topics go when the caller gives no position.

use rand::Rng;

use super::types::Point;
use crate::config::GridSettings;

/// Rings searched before giving up and taking the last candidate.
const MAX_ROUNDS: u32 = 50;

/// Searches rings of growing radius around `start`, with more samples per
/// ring as the radius grows, and returns the first candidate `is_free` accepts.
pub fn find_free_position<R, F>(start: Point, radius_increment: f64, rng: &mut R, mut is_free: F) -> Point
where
	R: Rng + ?Sized,
	F: FnMut(Point) -> bool,
{
	if !radius_increment.is_finite() || radius_increment <= 0.0 {
		return start;
	}
	let mut candidate = start;
	let mut radius = 0.0;
	for round in 1..=MAX_ROUNDS {
		radius += radius_increment;
		for _ in 0..10 * round {
			candidate = Point::new(
				start.x + rng.gen_range(-radius..radius),
				start.y + rng.gen_range(-radius..radius),
			);
			if is_free(candidate) {
				return candidate;
			}
		}
	}
	candidate
}

/// Collision check used for free placement. Every position counts as free.
pub fn is_position_free(_pos: Point) -> bool {
	true
}

/// A random point of the visible canvas, in topicmap coordinates.
pub fn random_position<R>(width: f64, height: f64, trans: Point, rng: &mut R) -> Point
where
	R: Rng + ?Sized,
{
	Point::new(
		width * rng.gen_range(0.0..1.0) - trans.x,
		height * rng.gen_range(0.0..1.0) - trans.y,
	)
}

/// Hands out grid cells left to right, top to bottom, starting one row below
/// the lowest topic on the map.
#[derive(Clone, Debug, PartialEq)]
pub struct GridPositioning {
	grid: GridSettings,
	start_x: f64,
	x: f64,
	y: f64,
	count: usize,
}

impl GridPositioning {
	/// `max_y` is the largest y of the topics already on the map, if any.
	pub fn new(grid: GridSettings, trans: Point, max_y: Option<f64>) -> Self {
		let start_x = grid.start_x - trans.x;
		let y = match max_y {
			Some(max_y) => max_y + grid.dist_y,
			None => grid.start_y,
		};
		Self {
			grid,
			start_x,
			x: start_x,
			y,
			count: 0,
		}
	}

	/// The next cell. `first` is true for the first cell handed out, when the
	/// caller should scroll the grid into view.
	pub fn next_position(&mut self, canvas_width: f64, trans: Point) -> GridCell {
		let pos = Point::new(self.x, self.y);
		let first = self.count == 0;
		if self.x + self.grid.dist_x + trans.x > canvas_width {
			self.x = self.start_x;
			self.y += self.grid.dist_y;
		} else {
			self.x += self.grid.dist_x;
		}
		self.count += 1;
		GridCell { pos, first }
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridCell {
	pub pos: Point,
	pub first: bool,
}

/// Animated translation towards a target, one equal step per tick.
#[derive(Clone, Debug, PartialEq)]
pub struct ScrollAnimation {
	dx: f64,
	dy: f64,
	steps_left: u32,
}

impl ScrollAnimation {
	/// Returns `None` if `target` (canvas coordinates) is already visible.
	pub fn to_center(target: Point, width: f64, height: f64, steps: u32) -> Option<Self> {
		let visible = target.x >= 0.0 && target.x < width && target.y >= 0.0 && target.y < height;
		if visible || steps == 0 {
			return None;
		}
		Some(Self {
			dx: (width / 2.0 - target.x) / steps as f64,
			dy: (height / 2.0 - target.y) / steps as f64,
			steps_left: steps,
		})
	}

	/// The translation delta of the next step, `None` once finished.
	pub fn step(&mut self) -> Option<(f64, f64)> {
		if self.steps_left == 0 {
			return None;
		}
		self.steps_left -= 1;
		Some((self.dx, self.dy))
	}

	pub fn is_finished(&self) -> bool {
		self.steps_left == 0
	}
}
