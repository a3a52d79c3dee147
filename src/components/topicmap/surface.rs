//! The drawing surface the renderer and the customizers paint on.
//!
//! [`CanvasSurface`] wraps a browser 2D context. Tests use
//! [`RecordingSurface`], which keeps a log of the calls.

use std::collections::HashMap;

use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::types::Point;

pub trait Surface {
	fn save(&mut self);
	fn restore(&mut self);
	/// Back to the identity transform.
	fn reset_transform(&mut self);
	fn translate(&mut self, dx: f64, dy: f64);
	fn rotate(&mut self, angle: f64);
	fn clear(&mut self, width: f64, height: f64);
	fn set_font(&mut self, font: &str);
	fn set_fill_color(&mut self, color: &str);
	fn set_shadow(&mut self, color: &str, blur: f64);
	fn line(&mut self, from: Point, to: Point, color: &str, width: f64);
	fn fill_text(&mut self, text: &str, x: f64, y: f64);
	fn draw_icon(&mut self, src: &str, x: f64, y: f64, width: f64, height: f64);
	/// Width of `text` in the current font.
	fn measure_text(&mut self, text: &str) -> f64;

	/// Whether an icon is still being fetched and a later redraw is needed.
	fn icons_pending(&self) -> bool {
		false
	}
}

pub struct CanvasSurface {
	ctx: CanvasRenderingContext2d,
	icons: HashMap<String, HtmlImageElement>,
}

impl CanvasSurface {
	pub fn new(ctx: CanvasRenderingContext2d) -> Self {
		Self {
			ctx,
			icons: HashMap::new(),
		}
	}

	fn icon(&mut self, src: &str) -> Option<&HtmlImageElement> {
		if !self.icons.contains_key(src) {
			let image = HtmlImageElement::new().ok()?;
			image.set_src(src);
			self.icons.insert(src.to_string(), image);
		}
		self.icons.get(src).filter(|image| image.complete())
	}
}

impl Surface for CanvasSurface {
	fn save(&mut self) {
		self.ctx.save();
	}

	fn restore(&mut self) {
		self.ctx.restore();
	}

	fn reset_transform(&mut self) {
		let _ = self.ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
	}

	fn translate(&mut self, dx: f64, dy: f64) {
		let _ = self.ctx.translate(dx, dy);
	}

	fn rotate(&mut self, angle: f64) {
		let _ = self.ctx.rotate(angle);
	}

	fn clear(&mut self, width: f64, height: f64) {
		self.ctx.clear_rect(0.0, 0.0, width, height);
	}

	fn set_font(&mut self, font: &str) {
		self.ctx.set_font(font);
	}

	fn set_fill_color(&mut self, color: &str) {
		self.ctx.set_fill_style_str(color);
	}

	fn set_shadow(&mut self, color: &str, blur: f64) {
		self.ctx.set_shadow_color(color);
		self.ctx.set_shadow_blur(blur);
	}

	fn line(&mut self, from: Point, to: Point, color: &str, width: f64) {
		self.ctx.set_stroke_style_str(color);
		self.ctx.set_line_width(width);
		self.ctx.begin_path();
		self.ctx.move_to(from.x, from.y);
		self.ctx.line_to(to.x, to.y);
		self.ctx.stroke();
	}

	fn fill_text(&mut self, text: &str, x: f64, y: f64) {
		let _ = self.ctx.fill_text(text, x, y);
	}

	fn draw_icon(&mut self, src: &str, x: f64, y: f64, width: f64, height: f64) {
		let Some(image) = self.icon(src).cloned() else {
			return;
		};
		let _ = self
			.ctx
			.draw_image_with_html_image_element_and_dw_and_dh(&image, x, y, width, height);
	}

	fn measure_text(&mut self, text: &str) -> f64 {
		self.ctx.measure_text(text).map(|m| m.width()).unwrap_or(0.0)
	}

	fn icons_pending(&self) -> bool {
		self.icons.values().any(|image| !image.complete())
	}
}

#[cfg(test)]
pub use recording::{Call, RecordingSurface};
