use super::surface::Surface;
use super::types::{Id, Point};
use super::view::{AssocView, CanvasView};
use crate::config::Settings;

const NO_SHADOW: &str = "rgba(0, 0, 0, 0)";
const ASSOC_LABEL_OFFSET_Y: f64 = -5.0;

/// Per-redraw inputs that are not part of the view.
pub struct Frame {
	pub width: f64,
	pub height: f64,
	pub trans: Point,
	pub selected: Option<Id>,
	/// Association being drawn: source topic position and pointer, both in
	/// topicmap coordinates.
	pub rubber_band: Option<(Point, Point)>,
}

/// Full redraw: associations first so topics always end up on top.
pub fn render(view: &CanvasView, frame: &Frame, settings: &Settings, surface: &mut dyn Surface) {
	surface.reset_transform();
	surface.clear(frame.width, frame.height);
	surface.translate(frame.trans.x, frame.trans.y);

	draw_assocs(view, frame, settings, surface);
	if let Some((from, to)) = frame.rubber_band {
		surface.line(from, to, &settings.default_assoc_color, settings.assoc_width);
	}
	draw_topics(view, frame, settings, surface);
}

fn draw_assocs(view: &CanvasView, frame: &Frame, settings: &Settings, surface: &mut dyn Surface) {
	surface.set_font(&settings.assoc_label_font);
	for av in view.assocs() {
		let Some((p1, p2)) = view.assoc_endpoints(av) else {
			continue;
		};
		highlighted(frame.selected == Some(av.id), settings, surface, |surface| {
			surface.line(p1, p2, settings.type_color(&av.type_uri), settings.assoc_width);
			draw_assoc_label(av, p1, p2, settings, surface);
		});
	}
}

fn draw_assoc_label(av: &AssocView, p1: Point, p2: Point, settings: &Settings, surface: &mut dyn Surface) {
	if av.label.is_empty() {
		return;
	}
	let (dx, dy) = (p2.x - p1.x, p2.y - p1.y);
	let length = dx.hypot(dy);
	if length == 0.0 {
		return;
	}
	let label_width = surface.measure_text(&av.label);
	let mut alpha = (dy / length).asin();
	let mut label_x = (length - label_width) / 2.0;
	// keep right-to-left labels upright
	if dx < 0.0 {
		alpha = -alpha;
		label_x -= length;
	}
	surface.save();
	surface.translate(p1.x, p1.y);
	surface.rotate(alpha);
	surface.set_fill_color(&settings.assoc_label_color);
	surface.fill_text(&av.label, label_x, ASSOC_LABEL_OFFSET_Y);
	surface.restore();
}

fn draw_topics(view: &CanvasView, frame: &Frame, settings: &Settings, surface: &mut dyn Surface) {
	surface.set_font(&settings.topic_label_font);
	surface.set_fill_color(&settings.topic_label_color);
	for tv in view.topics() {
		highlighted(frame.selected == Some(tv.id), settings, surface, |surface| {
			view.customizers().invoke(|c| c.draw_topic(tv, surface));
		});
	}
}

/// Draws with the highlight shadow switched on, then switches it off again.
fn highlighted<F>(on: bool, settings: &Settings, surface: &mut dyn Surface, draw: F)
where
	F: FnOnce(&mut dyn Surface),
{
	if on {
		surface.set_shadow(&settings.highlight_color, settings.highlight_blur);
	}
	draw(&mut *surface);
	if on {
		surface.set_shadow(NO_SHADOW, 0.0);
	}
}
