//! Client settings. Every field has a default; a page may override any of them
//! with a JSON `<script id="topicmap-settings">` element.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use web_sys::HtmlScriptElement;

use crate::components::topicmap::Id;
use crate::error::{Error, Result};

pub const SETTINGS_ELEMENT_ID: &str = "topicmap-settings";

/// A type icon. The icon's size defines the clickable area of a topic.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconSpec {
	pub src: String,
	pub width: f64,
	pub height: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridSettings {
	pub dist_x: f64,
	pub dist_y: f64,
	pub start_x: f64,
	pub start_y: f64,
}

impl Default for GridSettings {
	fn default() -> Self {
		Self {
			// max label width + 20px padding
			dist_x: 220.0,
			dist_y: 80.0,
			start_x: 50.0,
			start_y: 50.0,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	/// Base URL of the REST API. Empty means the page origin.
	pub server_url: String,
	pub websocket_url: Option<String>,
	pub workspace_id: Option<Id>,
	pub topicmap_id: Option<Id>,

	pub max_topic_label_chars: usize,
	pub max_topic_label_width: f64,
	pub label_line_height: f64,
	pub label_dist_y: f64,
	pub topic_label_font: String,
	pub topic_label_color: String,
	pub assoc_label_font: String,
	pub assoc_label_color: String,

	pub assoc_width: f64,
	pub assoc_click_tolerance: f64,
	pub default_assoc_color: String,
	pub type_colors: BTreeMap<String, String>,

	pub highlight_color: String,
	pub highlight_blur: f64,

	pub default_topic_icon: IconSpec,
	pub type_icons: BTreeMap<String, IconSpec>,

	pub grid: GridSettings,
	pub radius_increment: f64,
	pub scroll_animation_steps: u32,

	pub default_assoc_type_uri: String,
	pub default_role_type_uri: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			server_url: String::new(),
			websocket_url: None,
			workspace_id: None,
			topicmap_id: None,
			max_topic_label_chars: 100,
			max_topic_label_width: 200.0,
			// 1.2em
			label_line_height: 19.0,
			label_dist_y: 4.0,
			topic_label_font: "1em 'Lucida Grande', Verdana, Arial, Helvetica, sans-serif".into(),
			topic_label_color: "black".into(),
			assoc_label_font: "0.75em 'Lucida Grande', Verdana, Arial, Helvetica, sans-serif".into(),
			assoc_label_color: "gray".into(),
			assoc_width: 4.0,
			assoc_click_tolerance: 0.3,
			default_assoc_color: "#b2b2b2".into(),
			type_colors: BTreeMap::new(),
			highlight_color: "#0000ff".into(),
			highlight_blur: 16.0,
			default_topic_icon: IconSpec {
				src: "/de.deepamehta.webclient/images/ball-gray.png".into(),
				width: 16.0,
				height: 16.0,
			},
			type_icons: BTreeMap::new(),
			grid: GridSettings::default(),
			radius_increment: 150.0,
			scroll_animation_steps: 30,
			default_assoc_type_uri: "dm4.core.association".into(),
			default_role_type_uri: "dm4.core.default".into(),
		}
	}
}

impl Settings {
	pub fn from_json(json: &str) -> Result<Self> {
		let settings: Settings =
			serde_json::from_str(json).map_err(|e| Error::Settings(e.to_string()))?;
		settings.validate()?;
		Ok(settings)
	}

	fn validate(&self) -> Result<()> {
		if self.assoc_click_tolerance <= 0.0 {
			return Err(Error::Settings("assoc_click_tolerance must be positive".into()));
		}
		if self.grid.dist_x <= 0.0 || self.grid.dist_y <= 0.0 {
			return Err(Error::Settings("grid spacing must be positive".into()));
		}
		if !self.radius_increment.is_finite() || self.radius_increment <= 0.0 {
			return Err(Error::Settings("radius_increment must be positive".into()));
		}
		if self.scroll_animation_steps == 0 {
			return Err(Error::Settings("scroll_animation_steps must be at least 1".into()));
		}
		Ok(())
	}

	/// Reads settings from the page, falling back to the defaults when the page has none.
	pub fn load() -> Result<Self> {
		let Some(document) = web_sys::window().and_then(|w| w.document()) else {
			return Ok(Self::default());
		};
		let Some(element) = document.get_element_by_id(SETTINGS_ELEMENT_ID) else {
			info!("no #{SETTINGS_ELEMENT_ID} element, using default settings");
			return Ok(Self::default());
		};
		let script: HtmlScriptElement = element
			.dyn_into()
			.map_err(|_| Error::Settings(format!("#{SETTINGS_ELEMENT_ID} is not a script element")))?;
		let json = script.text().map_err(|_| {
			warn!("#{SETTINGS_ELEMENT_ID} has no readable text");
			Error::Settings("unreadable settings element".into())
		})?;
		Self::from_json(&json)
	}

	pub fn type_icon(&self, type_uri: &str) -> &IconSpec {
		self.type_icons.get(type_uri).unwrap_or(&self.default_topic_icon)
	}

	pub fn type_color(&self, type_uri: &str) -> &str {
		self.type_colors
			.get(type_uri)
			.map(String::as_str)
			.unwrap_or(&self.default_assoc_color)
	}
}
