//! Rendering projections of the viewmodel, plus hit-testing.
//!
//! A [`TopicView`] carries the layout the customizers computed for a topic.
//! It is derived state: rebuilt whenever the topic data is replaced.

use std::rc::Rc;

use indexmap::IndexMap;

use super::customizer::{
	CustomizerChain, CustomizerKind, Modifiers, PointerPos, PressTarget, ViewCustomizer,
};
use super::surface::Surface;
use super::types::{Association, ChildTopics, Id, Player, Point, Rect, Size, Topic, ViewProps};
use super::viewmodel::{Topicmap, ViewTopic};
use crate::config::Settings;

#[derive(Clone, Debug, PartialEq)]
pub struct TopicView {
	pub id: Id,
	pub type_uri: String,
	pub label: String,
	pub childs: ChildTopics,
	pub pos: Point,
	pub view_props: ViewProps,

	pub icon_src: String,
	pub size: Size,
	/// Clickable area. Maintained by the customizers.
	pub bounds: Rect,
	pub label_lines: Vec<String>,
	/// Baseline of the first label line.
	pub label_pos_y: f64,
	/// Topic layer markup, present when a `Dom` customizer is registered.
	pub dom: Option<String>,
}

impl TopicView {
	pub fn new(view_topic: &ViewTopic) -> Self {
		let topic = &view_topic.topic;
		Self {
			id: topic.id,
			type_uri: topic.type_uri.clone(),
			label: topic.label(),
			childs: topic.childs.clone(),
			pos: view_topic.pos,
			view_props: view_topic.view_props.clone(),
			icon_src: String::new(),
			size: Size::default(),
			bounds: Rect::centered(view_topic.pos, Size::default()),
			label_lines: Vec::new(),
			label_pos_y: view_topic.pos.y,
			dom: None,
		}
	}

	fn set_data(&mut self, topic: &Topic) {
		self.type_uri = topic.type_uri.clone();
		self.label = topic.label();
		self.childs = topic.childs.clone();
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssocView {
	pub id: Id,
	pub type_uri: String,
	pub label: String,
	pub player_1: Player,
	pub player_2: Player,
}

impl AssocView {
	/// `None` if a role has no player.
	pub fn new(assoc: &Association) -> Option<Self> {
		let (player_1, player_2) = assoc.players()?;
		Some(Self {
			id: assoc.id,
			type_uri: assoc.type_uri.clone(),
			label: assoc.label(),
			player_1,
			player_2,
		})
	}
}

/// What is drawn: the visible topics and the associations between them, in
/// draw order.
pub struct CanvasView {
	topics: IndexMap<Id, TopicView>,
	assocs: IndexMap<Id, AssocView>,
	customizers: CustomizerChain,
	settings: Rc<Settings>,
}

impl CanvasView {
	pub fn new(settings: Rc<Settings>) -> Self {
		Self {
			topics: IndexMap::new(),
			assocs: IndexMap::new(),
			customizers: CustomizerChain::new(settings.clone()),
			settings,
		}
	}

	pub fn register_customizer(&mut self, kind: CustomizerKind, customizer: Box<dyn ViewCustomizer>) {
		self.customizers.register(kind, customizer);
	}

	pub fn customizers(&self) -> &CustomizerChain {
		&self.customizers
	}

	/// Rebuilds the projection from a topicmap. Hidden topics are not projected.
	pub fn display(&mut self, topicmap: &Topicmap, surface: &mut dyn Surface) {
		self.topics.clear();
		self.assocs.clear();
		for view_topic in topicmap.visible_topics() {
			self.add_topic(view_topic, surface);
		}
		for assoc in topicmap.assocs() {
			self.add_assoc(assoc);
		}
	}

	// --- Topics ---

	pub fn topic(&self, id: Id) -> Option<&TopicView> {
		self.topics.get(&id)
	}

	pub fn topics(&self) -> impl Iterator<Item = &TopicView> {
		self.topics.values()
	}

	pub fn has_topic(&self, id: Id) -> bool {
		self.topics.contains_key(&id)
	}

	pub fn add_topic(&mut self, view_topic: &ViewTopic, surface: &mut dyn Surface) {
		let mut tv = TopicView::new(view_topic);
		self.customizers.invoke(|c| c.on_update_topic(&mut tv, surface));
		self.customizers.invoke(|c| c.on_update_view_properties(&mut tv));
		tv.dom = self.customizers.topic_dom(&tv);
		self.topics.insert(tv.id, tv);
	}

	/// Replaces the topic data and recomputes its layout. Returns false if the
	/// topic is not drawn.
	pub fn update_topic(&mut self, topic: &Topic, surface: &mut dyn Surface) -> bool {
		let customizers = &self.customizers;
		let Some(tv) = self.topics.get_mut(&topic.id) else {
			return false;
		};
		tv.set_data(topic);
		customizers.invoke(|c| c.on_update_topic(tv, surface));
		tv.dom = customizers.topic_dom(tv);
		true
	}

	/// Merges view properties into a drawn topic and lets the customizers react.
	pub fn update_view_properties(&mut self, id: Id, props: &ViewProps) {
		let customizers = &self.customizers;
		if let Some(tv) = self.topics.get_mut(&id) {
			for (key, value) in props {
				tv.view_props.insert(key.clone(), value.clone());
			}
			customizers.invoke(|c| c.on_update_view_properties(tv));
			tv.dom = customizers.topic_dom(tv);
		}
	}

	pub fn remove_topic(&mut self, id: Id) -> Option<TopicView> {
		self.topics.shift_remove(&id)
	}

	pub fn move_topic_to(&mut self, id: Id, pos: Point) {
		let customizers = &self.customizers;
		if let Some(tv) = self.topics.get_mut(&id) {
			tv.pos = pos;
			customizers.invoke(|c| c.on_move_topic(tv));
		}
	}

	pub fn move_topic_by(&mut self, id: Id, dx: f64, dy: f64) {
		if let Some(pos) = self.topics.get(&id).map(|tv| tv.pos.offset(dx, dy)) {
			self.move_topic_to(id, pos);
		}
	}

	// --- Associations ---

	pub fn assoc(&self, id: Id) -> Option<&AssocView> {
		self.assocs.get(&id)
	}

	pub fn assocs(&self) -> impl Iterator<Item = &AssocView> {
		self.assocs.values()
	}

	pub fn add_assoc(&mut self, assoc: &Association) {
		if let Some(av) = AssocView::new(assoc) {
			self.assocs.insert(av.id, av);
		}
	}

	pub fn update_assoc(&mut self, assoc: &Association) -> bool {
		match (self.assocs.get_mut(&assoc.id), AssocView::new(assoc)) {
			(Some(stored), Some(av)) => {
				*stored = av;
				true
			}
			_ => false,
		}
	}

	pub fn remove_assoc(&mut self, id: Id) -> Option<AssocView> {
		self.assocs.shift_remove(&id)
	}

	// --- Geometry ---

	/// Position of an association endpoint. An association as endpoint sits at
	/// its own midpoint.
	pub fn endpoint_pos(&self, player: Player) -> Option<Point> {
		self.endpoint_pos_at(player, 0)
	}

	fn endpoint_pos_at(&self, player: Player, depth: usize) -> Option<Point> {
		if depth > self.assocs.len() {
			return None;
		}
		match player {
			Player::Topic(id) => self.topics.get(&id).map(|tv| tv.pos),
			Player::Assoc(id) => {
				let av = self.assocs.get(&id)?;
				let p1 = self.endpoint_pos_at(av.player_1, depth + 1)?;
				let p2 = self.endpoint_pos_at(av.player_2, depth + 1)?;
				Some(p1.midpoint(p2))
			}
		}
	}

	pub fn assoc_endpoints(&self, av: &AssocView) -> Option<(Point, Point)> {
		Some((self.endpoint_pos(av.player_1)?, self.endpoint_pos(av.player_2)?))
	}

	// --- Hit-testing (topicmap coordinates) ---

	/// The topmost topic whose box contains `p`.
	pub fn topic_at(&self, p: Point) -> Option<&TopicView> {
		self.topics.values().rev().find(|tv| tv.bounds.contains(p))
	}

	pub fn assoc_at(&self, p: Point) -> Option<&AssocView> {
		self.assocs.values().rev().find(|av| {
			self.assoc_endpoints(av)
				.is_some_and(|(p1, p2)| self.is_on_line(p, p1, p2))
		})
	}

	fn is_on_line(&self, p: Point, p1: Point, p2: Point) -> bool {
		// pad the box so axis-parallel lines stay clickable
		let pad = self.settings.assoc_width / 2.0;
		let (bx1, bx2) = (p1.x.min(p2.x) - pad, p1.x.max(p2.x) + pad);
		let (by1, by2) = (p1.y.min(p2.y) - pad, p1.y.max(p2.y) + pad);
		if !(p.x > bx1 && p.x < bx2 && p.y > by1 && p.y < by2) {
			return false;
		}
		let (dx1, dx2) = (p.x - p1.x, p.x - p2.x);
		let (dy1, dy2) = (p.y - p1.y, p.y - p2.y);
		let (g1, g2) = if bx2 - bx1 > by2 - by1 {
			(dy1 / dx1, dy2 / dx2)
		} else {
			(dx1 / dy1, dx2 / dy2)
		};
		// NaN (pointer exactly on an endpoint) compares false
		(g1 - g2).abs() < self.settings.assoc_click_tolerance
	}

	/// Asks the customizer chain what a pointer-down at `pos` targets.
	pub fn press_target(&self, pos: PointerPos, modifiers: Modifiers) -> PressTarget {
		let mut target = None;
		self.customizers
			.invoke(|c| c.on_mousedown(self, pos, modifiers, &mut target));
		target.unwrap_or(PressTarget::Canvas)
	}
}
