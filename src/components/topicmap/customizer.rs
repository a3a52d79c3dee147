//! Pluggable per-object appearance and hit behavior.
//!
//! Customizers are invoked in registration order. The built-in
//! [`DefaultViewCustomizer`] runs after them unless one of them answered a
//! hook with [`Hook::Suppress`]. Hooks a customizer does not override answer
//! [`Hook::Continue`].

use std::rc::Rc;

use super::surface::Surface;
use super::text;
use super::types::{Id, Point, Rect, Size};
use super::view::{CanvasView, TopicView};
use crate::config::Settings;

/// Height of the label font, added below the icon before the first baseline.
const LABEL_FONT_SIZE: f64 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hook {
	/// Let the following customizers and the default run.
	Continue,
	/// Skip the default for this hook.
	Suppress,
}

/// Declared capability of a customizer. `Dom` customizers contribute overlay
/// markup to the topic layer through [`ViewCustomizer::topic_dom`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomizerKind {
	Canvas,
	Dom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
	pub shift: bool,
	pub ctrl: bool,
	pub alt: bool,
}

/// A pointer position in canvas coordinates and in topicmap coordinates
/// (canvas minus translation).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerPos {
	pub canvas: Point,
	pub topicmap: Point,
}

/// What a pointer-down landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressTarget {
	Topic(Id),
	Assoc(Id),
	Canvas,
	/// Start drawing an association from this topic.
	Associate(Id),
}

pub trait ViewCustomizer {
	/// The topic's data changed (or it was just added): recompute cached layout.
	fn on_update_topic(&self, _tv: &mut TopicView, _surface: &mut dyn Surface) -> Hook {
		Hook::Continue
	}

	fn on_move_topic(&self, _tv: &mut TopicView) -> Hook {
		Hook::Continue
	}

	fn on_update_view_properties(&self, _tv: &mut TopicView) -> Hook {
		Hook::Continue
	}

	fn draw_topic(&self, _tv: &TopicView, _surface: &mut dyn Surface) -> Hook {
		Hook::Continue
	}

	fn on_mousedown(
		&self,
		_view: &CanvasView,
		_pos: PointerPos,
		_modifiers: Modifiers,
		_target: &mut Option<PressTarget>,
	) -> Hook {
		Hook::Continue
	}

	/// Overlay markup for the topic layer. Only asked of `Dom` customizers.
	fn topic_dom(&self, _tv: &TopicView) -> Option<String> {
		None
	}
}

struct Registered {
	kind: CustomizerKind,
	customizer: Box<dyn ViewCustomizer>,
}

pub struct CustomizerChain {
	registered: Vec<Registered>,
	default: DefaultViewCustomizer,
}

impl CustomizerChain {
	pub fn new(settings: Rc<Settings>) -> Self {
		Self {
			registered: Vec::new(),
			default: DefaultViewCustomizer::new(settings),
		}
	}

	pub fn register(&mut self, kind: CustomizerKind, customizer: Box<dyn ViewCustomizer>) {
		self.registered.push(Registered { kind, customizer });
	}

	pub fn has_dom_customizers(&self) -> bool {
		self.registered.iter().any(|r| r.kind == CustomizerKind::Dom)
	}

	/// Runs `hook` on every registered customizer, then on the default unless
	/// one of them suppressed it.
	pub fn invoke<F>(&self, mut hook: F)
	where
		F: FnMut(&dyn ViewCustomizer) -> Hook,
	{
		let mut run_default = true;
		for r in &self.registered {
			if hook(r.customizer.as_ref()) == Hook::Suppress {
				run_default = false;
			}
		}
		if run_default {
			hook(&self.default);
		}
	}

	pub fn topic_dom(&self, tv: &TopicView) -> Option<String> {
		self.registered
			.iter()
			.filter(|r| r.kind == CustomizerKind::Dom)
			.find_map(|r| r.customizer.topic_dom(tv))
	}
}

/// Icon plus wrapped label below it. The icon box is the clickable area.
pub struct DefaultViewCustomizer {
	settings: Rc<Settings>,
}

impl DefaultViewCustomizer {
	pub fn new(settings: Rc<Settings>) -> Self {
		Self { settings }
	}

	fn update_bounds(&self, tv: &mut TopicView) {
		tv.bounds = Rect::centered(tv.pos, tv.size);
		tv.label_pos_y = tv.bounds.y2 + self.settings.label_dist_y + LABEL_FONT_SIZE;
	}
}

impl ViewCustomizer for DefaultViewCustomizer {
	fn on_update_topic(&self, tv: &mut TopicView, surface: &mut dyn Surface) -> Hook {
		let icon = self.settings.type_icon(&tv.type_uri);
		tv.icon_src = icon.src.clone();
		tv.size = Size::new(icon.width, icon.height);
		self.update_bounds(tv);

		let label = text::truncate(&tv.label, self.settings.max_topic_label_chars);
		surface.set_font(&self.settings.topic_label_font);
		tv.label_lines = text::wrap(&label, self.settings.max_topic_label_width, |s| {
			surface.measure_text(s)
		});
		Hook::Continue
	}

	fn on_move_topic(&self, tv: &mut TopicView) -> Hook {
		self.update_bounds(tv);
		Hook::Continue
	}

	fn draw_topic(&self, tv: &TopicView, surface: &mut dyn Surface) -> Hook {
		surface.draw_icon(
			&tv.icon_src,
			tv.bounds.x1,
			tv.bounds.y1,
			tv.size.width,
			tv.size.height,
		);
		surface.set_font(&self.settings.topic_label_font);
		surface.set_fill_color(&self.settings.topic_label_color);
		let line_height = self.settings.label_line_height;
		for (i, line) in tv.label_lines.iter().enumerate() {
			surface.fill_text(line, tv.bounds.x1, tv.label_pos_y + i as f64 * line_height);
		}
		Hook::Continue
	}

	fn on_mousedown(
		&self,
		view: &CanvasView,
		pos: PointerPos,
		modifiers: Modifiers,
		target: &mut Option<PressTarget>,
	) -> Hook {
		*target = Some(if let Some(tv) = view.topic_at(pos.topicmap) {
			if modifiers.shift {
				PressTarget::Associate(tv.id)
			} else {
				PressTarget::Topic(tv.id)
			}
		} else if let Some(av) = view.assoc_at(pos.topicmap) {
			PressTarget::Assoc(av.id)
		} else {
			PressTarget::Canvas
		});
		Hook::Continue
	}
}
