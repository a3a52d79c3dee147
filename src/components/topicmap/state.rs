//! Interaction state machine and renderer facade.
//!
//! Pointer input is fed in canvas coordinates. Every gesture answers with the
//! [`Action`]s the caller has to carry out: persistence commands, selection
//! changes and cursor updates. The canvas is redrawn synchronously.

use std::mem;
use std::rc::Rc;

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::customizer::{CustomizerKind, Modifiers, PointerPos, PressTarget, ViewCustomizer};
use super::placement::{self, GridPositioning, ScrollAnimation};
use super::render::{self, Frame};
use super::surface::Surface;
use super::types::{Association, Id, Player, Point, Role, Topic, ViewProps};
use super::view::CanvasView;
use super::viewmodel::{Cluster, ObjectRef, RevealKind, RevealOp, Topicmap, ViewTopic};
use crate::client::{AssociationModel, Command};
use crate::config::Settings;
use crate::error::{Error, Result};

const PRIMARY_BUTTON: i16 = 0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
	#[default]
	Default,
	/// A topic, cluster or the canvas is being moved.
	Moving,
	/// An association is being drawn.
	Drawing,
}

impl Cursor {
	/// CSS class put on the canvas container.
	pub fn class(self) -> Option<&'static str> {
		match self {
			Cursor::Default => None,
			Cursor::Moving => Some("moving"),
			Cursor::Drawing => Some("drawing-assoc"),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
	Persist(Command),
	SelectTopic(Id),
	SelectAssoc(Id),
	ResetSelection,
	SetCursor(Cursor),
	TopicMoved { id: Id, pos: Point },
	ClusterMoved(Vec<Id>),
	CanvasMoved(Point),
}

#[derive(Clone, Debug, Default, PartialEq)]
enum InputState {
	#[default]
	Idle,
	/// Pointer is down but has not moved yet.
	Pressed { target: PressTarget, last: Point },
	TopicMove { id: Id, last: Point },
	ClusterMove { cluster: Cluster, last: Point },
	CanvasMove { last: Point },
	AssociationDraw { source: Id, current: Point },
}

pub struct TopicmapState {
	topicmap: Option<Topicmap>,
	view: CanvasView,
	input: InputState,
	cursor: Cursor,
	surface: Box<dyn Surface>,
	settings: Rc<Settings>,
	grid: Option<GridPositioning>,
	animation: Option<ScrollAnimation>,
	icons_pending: bool,
	rng: StdRng,
	pub width: f64,
	pub height: f64,
}

impl TopicmapState {
	pub fn new(settings: Rc<Settings>, surface: Box<dyn Surface>, width: f64, height: f64) -> Self {
		Self::with_rng(settings, surface, width, height, StdRng::from_entropy())
	}

	pub fn with_rng(
		settings: Rc<Settings>,
		surface: Box<dyn Surface>,
		width: f64,
		height: f64,
		rng: StdRng,
	) -> Self {
		Self {
			topicmap: None,
			view: CanvasView::new(settings.clone()),
			input: InputState::Idle,
			cursor: Cursor::Default,
			surface,
			settings,
			grid: None,
			animation: None,
			icons_pending: false,
			rng,
			width,
			height,
		}
	}

	pub fn topicmap(&self) -> Option<&Topicmap> {
		self.topicmap.as_ref()
	}

	pub fn view(&self) -> &CanvasView {
		&self.view
	}

	pub fn cursor(&self) -> Cursor {
		self.cursor
	}

	pub fn settings(&self) -> &Rc<Settings> {
		&self.settings
	}

	fn tm(&self) -> Result<&Topicmap> {
		self.topicmap.as_ref().ok_or(Error::NoTopicmap)
	}

	fn tm_mut(&mut self) -> Result<&mut Topicmap> {
		self.topicmap.as_mut().ok_or(Error::NoTopicmap)
	}

	pub fn topicmap_id(&self) -> Result<Id> {
		Ok(self.tm()?.id)
	}

	fn is_writable(&self) -> bool {
		self.topicmap.as_ref().is_some_and(|tm| tm.writable)
	}

	pub fn translation(&self) -> Point {
		self.topicmap.as_ref().map(Topicmap::translation).unwrap_or_default()
	}

	/// Canvas coordinates to topicmap coordinates.
	pub fn to_topicmap(&self, canvas: Point) -> Point {
		let trans = self.translation();
		canvas.offset(-trans.x, -trans.y)
	}

	// --- Display ---

	/// Replaces the displayed topicmap. Gestures in progress are dropped.
	pub fn display(&mut self, topicmap: Topicmap) {
		debug!(
			"display topicmap {} ({} topics, {} assocs)",
			topicmap.id,
			topicmap.topic_count(),
			topicmap.assoc_count()
		);
		self.input = InputState::Idle;
		self.cursor = Cursor::Default;
		self.animation = None;
		self.grid = None;
		self.view.display(&topicmap, self.surface.as_mut());
		self.topicmap = Some(topicmap);
		self.redraw();
	}

	pub fn register_customizer(&mut self, kind: CustomizerKind, customizer: Box<dyn ViewCustomizer>) {
		self.view.register_customizer(kind, customizer);
		if let Some(tm) = &self.topicmap {
			self.view.display(tm, self.surface.as_mut());
			self.redraw();
		}
	}

	pub fn set_writable(&mut self, writable: bool) {
		if let Some(tm) = &mut self.topicmap {
			tm.writable = writable;
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.redraw();
	}

	pub fn redraw(&mut self) {
		let Some(tm) = &self.topicmap else {
			return;
		};
		let trans = tm.translation();
		let rubber_band = match self.input {
			InputState::AssociationDraw { source, current } => self
				.view
				.topic(source)
				.map(|tv| (tv.pos, current.offset(-trans.x, -trans.y))),
			_ => None,
		};
		let frame = Frame {
			width: self.width,
			height: self.height,
			trans,
			selected: tm.selection().map(ObjectRef::id),
			rubber_band,
		};
		render::render(&self.view, &frame, &self.settings, self.surface.as_mut());
	}

	// --- Reveal / update / remove ---

	/// Puts a topic on the map. Without `pos` the position comes from the grid
	/// (when active), from a free spot near the selection, or from a random
	/// point of the visible canvas.
	pub fn reveal_topic(&mut self, topic: Topic, pos: Option<Point>, select: bool) -> Result<RevealOp> {
		let id = topic.id;
		let pos = self.init_topic_position(id, pos)?;
		let tm = self.topicmap.as_mut().ok_or(Error::NoTopicmap)?;
		let op = tm.reveal_topic(topic, pos, select);
		if op.kind != RevealKind::None {
			if let Some(view_topic) = tm.topic(id) {
				self.view.add_topic(view_topic, self.surface.as_mut());
			}
		}
		self.redraw();
		Ok(op)
	}

	fn init_topic_position(&mut self, id: Id, pos: Option<Point>) -> Result<Point> {
		let tm = self.tm()?;
		// a hidden topic comes back where it was
		if let Some(view_topic) = tm.topic(id) {
			return Ok(view_topic.pos);
		}
		let trans = tm.translation();
		let selection_pos = tm.selection_pos();
		let pos = if let Some(pos) = pos {
			pos
		} else if let Some(grid) = &mut self.grid {
			let cell = grid.next_position(self.width, trans);
			if cell.first {
				self.scroll_to_center(Point::new(self.width / 2.0, cell.pos.y + trans.y));
			}
			cell.pos
		} else if let Some(start) = selection_pos {
			placement::find_free_position(
				start,
				self.settings.radius_increment,
				&mut self.rng,
				placement::is_position_free,
			)
		} else {
			placement::random_position(self.width, self.height, trans, &mut self.rng)
		};
		Ok(pos.floor())
	}

	pub fn reveal_assoc(&mut self, assoc: Association, select: bool) -> Result<RevealKind> {
		let tm = self.topicmap.as_mut().ok_or(Error::NoTopicmap)?;
		let kind = tm.reveal_assoc(assoc.clone(), select);
		if kind == RevealKind::Add {
			self.view.add_assoc(&assoc);
		}
		self.redraw();
		Ok(kind)
	}

	/// Adds a topic with its view state as stored elsewhere.
	pub fn add_topic(&mut self, view_topic: ViewTopic) -> Result<()> {
		let tm = self.topicmap.as_mut().ok_or(Error::NoTopicmap)?;
		if view_topic.visibility {
			self.view.add_topic(&view_topic, self.surface.as_mut());
		}
		tm.add_topic(view_topic);
		self.redraw();
		Ok(())
	}

	/// Adds an association whose players must already be on the map.
	pub fn add_assoc(&mut self, assoc: Association) -> Result<()> {
		let tm = self.topicmap.as_mut().ok_or(Error::NoTopicmap)?;
		let (p1, p2) = assoc.players().ok_or(Error::AssocNotFound(assoc.id))?;
		for player in [p1, p2] {
			if !tm.has_player(player) {
				return Err(Error::DanglingAssociation {
					assoc: assoc.id,
					player,
				});
			}
		}
		self.view.add_assoc(&assoc);
		tm.add_assoc(assoc);
		self.redraw();
		Ok(())
	}

	/// Replaces the topic data. Returns false if the topic is not on the map.
	pub fn update_topic(&mut self, topic: &Topic) -> bool {
		let Some(tm) = &mut self.topicmap else {
			return false;
		};
		if !tm.update_topic(topic.clone()) {
			return false;
		}
		self.view.update_topic(topic, self.surface.as_mut());
		self.redraw();
		true
	}

	pub fn update_assoc(&mut self, assoc: &Association) -> bool {
		let Some(tm) = &mut self.topicmap else {
			return false;
		};
		if !tm.update_assoc(assoc.clone()) {
			return false;
		}
		self.view.update_assoc(assoc);
		self.redraw();
		true
	}

	/// Removes a topic and, first, every association attached to it.
	pub fn remove_topic(&mut self, id: Id) -> Result<Vec<Id>> {
		let tm = self.topicmap.as_mut().ok_or(Error::NoTopicmap)?;
		let removed = tm.remove_assocs(id);
		tm.remove_topic(id);
		self.forget(Player::Topic(id), &removed);
		self.view.remove_topic(id);
		self.redraw();
		Ok(removed)
	}

	/// Hides a topic. Its associations are removed from the map.
	pub fn hide_topic(&mut self, id: Id) -> Result<Vec<Id>> {
		let tm = self.topicmap.as_mut().ok_or(Error::NoTopicmap)?;
		if tm.topic(id).is_none() {
			return Err(Error::TopicNotFound(id));
		}
		let removed = tm.remove_assocs(id);
		tm.set_topic_visibility(id, false);
		self.forget(Player::Topic(id), &removed);
		self.view.remove_topic(id);
		self.redraw();
		Ok(removed)
	}

	/// Removes an association and the associations attached to it.
	pub fn remove_assoc(&mut self, id: Id) -> Result<Vec<Id>> {
		let tm = self.topicmap.as_mut().ok_or(Error::NoTopicmap)?;
		let removed = tm.remove_assoc_cascade(id);
		self.forget(Player::Assoc(id), &removed);
		self.redraw();
		Ok(removed)
	}

	/// Drops removed associations from the view and any gesture on a removed object.
	fn forget(&mut self, player: Player, removed_assocs: &[Id]) {
		for assoc_id in removed_assocs {
			self.view.remove_assoc(*assoc_id);
		}
		let involved = |input: &InputState| match (input, player) {
			(InputState::TopicMove { id, .. }, Player::Topic(t))
			| (InputState::AssociationDraw { source: id, .. }, Player::Topic(t)) => *id == t,
			(InputState::Pressed { target: PressTarget::Topic(id), .. }, Player::Topic(t)) => *id == t,
			(InputState::Pressed { target: PressTarget::Assoc(id), .. }, _) => removed_assocs.contains(id),
			(InputState::ClusterMove { .. }, _) => !removed_assocs.is_empty(),
			_ => false,
		};
		if involved(&self.input) {
			debug!("gesture dropped: {player:?} was removed");
			self.input = InputState::Idle;
			self.cursor = Cursor::Default;
		}
	}

	pub fn set_topic_position(&mut self, id: Id, pos: Point) -> Result<()> {
		let tm = self.tm_mut()?;
		if tm.topic(id).is_none() {
			return Err(Error::TopicNotFound(id));
		}
		tm.set_topic_position(id, pos);
		self.view.move_topic_to(id, pos);
		self.redraw();
		Ok(())
	}

	pub fn set_topic_visibility(&mut self, id: Id, visibility: bool) -> Result<()> {
		if !visibility {
			return self.hide_topic(id).map(|_| ());
		}
		let tm = self.topicmap.as_mut().ok_or(Error::NoTopicmap)?;
		tm.set_topic_visibility(id, true);
		let view_topic = tm.topic(id).ok_or(Error::TopicNotFound(id))?;
		self.view.add_topic(view_topic, self.surface.as_mut());
		self.redraw();
		Ok(())
	}

	pub fn set_view_properties(&mut self, id: Id, props: ViewProps) -> Result<()> {
		let tm = self.tm_mut()?;
		tm.set_view_properties(id, props.clone());
		self.view.update_view_properties(id, &props);
		self.redraw();
		Ok(())
	}

	// --- Selection ---

	pub fn set_selection(&mut self, object: ObjectRef) {
		if let Some(tm) = &mut self.topicmap {
			match object {
				ObjectRef::Topic(id) => tm.set_topic_selection(id),
				ObjectRef::Assoc(id) => tm.set_assoc_selection(id),
			}
			self.redraw();
		}
	}

	pub fn reset_selection(&mut self) {
		if let Some(tm) = &mut self.topicmap {
			tm.reset_selection();
			self.redraw();
		}
	}

	/// The topic or association under a canvas position.
	pub fn object_at(&self, canvas: Point) -> Option<ObjectRef> {
		let p = self.to_topicmap(canvas);
		if let Some(tv) = self.view.topic_at(p) {
			Some(ObjectRef::Topic(tv.id))
		} else {
			self.view.assoc_at(p).map(|av| ObjectRef::Assoc(av.id))
		}
	}

	// --- Grid / scrolling ---

	pub fn start_grid_positioning(&mut self) -> Result<()> {
		let trans = self.tm()?.translation();
		let max_y = self.view.topics().map(|tv| tv.pos.y).reduce(f64::max);
		self.grid = Some(GridPositioning::new(self.settings.grid.clone(), trans, max_y));
		Ok(())
	}

	pub fn stop_grid_positioning(&mut self) {
		self.grid = None;
	}

	/// Scrolls a topic into the middle of the canvas if it lies outside.
	pub fn scroll_topic_to_center(&mut self, id: Id) -> Result<()> {
		let trans = self.tm()?.translation();
		let pos = self.view.topic(id).ok_or(Error::TopicNotFound(id))?.pos;
		self.scroll_to_center(pos.offset(trans.x, trans.y));
		Ok(())
	}

	fn scroll_to_center(&mut self, canvas_pos: Point) {
		self.animation = ScrollAnimation::to_center(
			canvas_pos,
			self.width,
			self.height,
			self.settings.scroll_animation_steps,
		);
	}

	#[cfg(test)]
	pub fn is_animating(&self) -> bool {
		self.animation.is_some()
	}

	/// Advances the scroll animation and repaints once icons have loaded.
	/// Called once per frame.
	pub fn tick(&mut self) -> Vec<Action> {
		let mut actions = Vec::new();
		if let (Some(animation), Some(tm)) = (&mut self.animation, &mut self.topicmap) {
			if let Some((dx, dy)) = animation.step() {
				tm.translate_by(dx, dy);
			}
			if animation.is_finished() {
				self.animation = None;
				actions = self.end_canvas_move();
			}
			self.redraw();
			return actions;
		}
		let pending = self.surface.icons_pending();
		if pending || self.icons_pending {
			self.redraw();
		}
		self.icons_pending = pending;
		actions
	}

	// --- Gestures ---

	pub fn pointer_down(&mut self, canvas: Point, button: i16, modifiers: Modifiers) -> Vec<Action> {
		let mut actions = Vec::new();
		match self.input {
			InputState::Idle | InputState::Pressed { .. } => {}
			_ => return actions,
		}
		// ctrl-click is the secondary button on a Mac
		if button != PRIMARY_BUTTON || modifiers.ctrl || self.topicmap.is_none() {
			return actions;
		}
		let pos = PointerPos {
			canvas,
			topicmap: self.to_topicmap(canvas),
		};
		match self.view.press_target(pos, modifiers) {
			PressTarget::Associate(id) => {
				actions.push(Action::SelectTopic(id));
				actions.extend(self.begin_association(id, canvas));
			}
			target => {
				self.input = InputState::Pressed {
					target,
					last: canvas,
				};
			}
		}
		actions
	}

	pub fn pointer_move(&mut self, canvas: Point) -> Vec<Action> {
		let mut actions = Vec::new();
		let writable = self.is_writable();
		let input = mem::take(&mut self.input);
		self.input = match input {
			InputState::Idle => InputState::Idle,
			InputState::Pressed { target, last } => {
				let (dx, dy) = (canvas.x - last.x, canvas.y - last.y);
				match target {
					PressTarget::Canvas => {
						self.set_cursor(Cursor::Moving, &mut actions);
						self.translate_by(dx, dy);
						InputState::CanvasMove { last: canvas }
					}
					PressTarget::Assoc(id) if writable => match &self.topicmap {
						Some(tm) => {
							let cluster = tm.create_cluster(id);
							self.set_cursor(Cursor::Moving, &mut actions);
							self.move_cluster_by(&cluster, dx, dy);
							InputState::ClusterMove {
								cluster,
								last: canvas,
							}
						}
						None => InputState::Idle,
					},
					PressTarget::Topic(id) if writable => {
						self.set_cursor(Cursor::Moving, &mut actions);
						self.view.move_topic_by(id, dx, dy);
						InputState::TopicMove { id, last: canvas }
					}
					// read-only: the press stays a click
					target => InputState::Pressed { target, last },
				}
			}
			InputState::TopicMove { id, last } => {
				self.view.move_topic_by(id, canvas.x - last.x, canvas.y - last.y);
				InputState::TopicMove { id, last: canvas }
			}
			InputState::ClusterMove { cluster, last } => {
				self.move_cluster_by(&cluster, canvas.x - last.x, canvas.y - last.y);
				InputState::ClusterMove {
					cluster,
					last: canvas,
				}
			}
			InputState::CanvasMove { last } => {
				self.translate_by(canvas.x - last.x, canvas.y - last.y);
				InputState::CanvasMove { last: canvas }
			}
			InputState::AssociationDraw { source, .. } => InputState::AssociationDraw {
				source,
				current: canvas,
			},
		};
		if self.input != InputState::Idle {
			self.redraw();
		}
		actions
	}

	pub fn pointer_up(&mut self, canvas: Point) -> Vec<Action> {
		match mem::take(&mut self.input) {
			InputState::Idle => Vec::new(),
			InputState::Pressed { target, .. } => match target {
				PressTarget::Topic(id) => vec![Action::SelectTopic(id)],
				PressTarget::Assoc(id) => vec![Action::SelectAssoc(id)],
				PressTarget::Canvas => vec![Action::ResetSelection],
				PressTarget::Associate(_) => Vec::new(),
			},
			InputState::TopicMove { id, .. } => self.end_topic_move(id),
			InputState::ClusterMove { cluster, .. } => self.end_cluster_move(&cluster),
			InputState::CanvasMove { .. } => self.end_canvas_move(),
			InputState::AssociationDraw { source, .. } => {
				let target = self.view.topic_at(self.to_topicmap(canvas)).map(|tv| tv.id);
				self.end_association(source, target)
			}
		}
	}

	/// Pointer left the canvas. `over_topic` is true when it moved onto a
	/// topic overlay, which keeps an association draw alive.
	pub fn pointer_leave(&mut self, over_topic: bool) -> Vec<Action> {
		match mem::take(&mut self.input) {
			InputState::TopicMove { id, .. } => self.end_topic_move(id),
			InputState::ClusterMove { cluster, .. } => self.end_cluster_move(&cluster),
			InputState::CanvasMove { .. } => self.end_canvas_move(),
			InputState::AssociationDraw { source, current } if over_topic => {
				self.input = InputState::AssociationDraw { source, current };
				Vec::new()
			}
			InputState::AssociationDraw { source, .. } => self.end_association(source, None),
			InputState::Idle | InputState::Pressed { .. } => Vec::new(),
		}
	}

	/// Starts drawing an association from a topic, e.g. from a menu command.
	/// `canvas` is where the rubber band ends initially.
	pub fn begin_association(&mut self, topic_id: Id, canvas: Point) -> Vec<Action> {
		let mut actions = Vec::new();
		if !self.is_writable() || !self.view.has_topic(topic_id) {
			return actions;
		}
		self.input = InputState::AssociationDraw {
			source: topic_id,
			current: canvas,
		};
		self.set_cursor(Cursor::Drawing, &mut actions);
		self.redraw();
		actions
	}

	fn set_cursor(&mut self, cursor: Cursor, actions: &mut Vec<Action>) {
		if self.cursor != cursor {
			self.cursor = cursor;
			actions.push(Action::SetCursor(cursor));
		}
	}

	fn translate_by(&mut self, dx: f64, dy: f64) {
		if let Some(tm) = &mut self.topicmap {
			tm.translate_by(dx, dy);
		}
	}

	fn move_cluster_by(&mut self, cluster: &Cluster, dx: f64, dy: f64) {
		for id in cluster.topic_ids() {
			self.view.move_topic_by(*id, dx, dy);
		}
	}

	fn end_topic_move(&mut self, id: Id) -> Vec<Action> {
		let mut actions = Vec::new();
		self.set_cursor(Cursor::Default, &mut actions);
		let (Some(pos), Some(tm)) = (self.view.topic(id).map(|tv| tv.pos.floor()), &mut self.topicmap) else {
			return actions;
		};
		tm.set_topic_position(id, pos);
		self.view.move_topic_to(id, pos);
		debug!("topic {id} moved to ({}, {})", pos.x, pos.y);
		actions.push(Action::Persist(Command::SetTopicPosition {
			topicmap_id: tm.id,
			topic_id: id,
			pos,
		}));
		actions.push(Action::TopicMoved { id, pos });
		self.redraw();
		actions
	}

	fn end_cluster_move(&mut self, cluster: &Cluster) -> Vec<Action> {
		let mut actions = Vec::new();
		self.set_cursor(Cursor::Default, &mut actions);
		let positions: Vec<(Id, Point)> = cluster
			.topic_ids()
			.iter()
			.filter_map(|id| self.view.topic(*id).map(|tv| (*id, tv.pos.floor())))
			.collect();
		let Some(tm) = &mut self.topicmap else {
			return actions;
		};
		for (id, pos) in &positions {
			tm.set_topic_position(*id, *pos);
			self.view.move_topic_to(*id, *pos);
		}
		debug!("cluster of {} topics moved", positions.len());
		let ids = positions.iter().map(|(id, _)| *id).collect();
		actions.push(Action::Persist(Command::SetClusterPosition {
			topicmap_id: tm.id,
			positions,
		}));
		actions.push(Action::ClusterMoved(ids));
		self.redraw();
		actions
	}

	fn end_canvas_move(&mut self) -> Vec<Action> {
		let mut actions = Vec::new();
		self.set_cursor(Cursor::Default, &mut actions);
		let Some(tm) = &mut self.topicmap else {
			return actions;
		};
		// the translation resource only takes integers
		let trans = tm.translation().floor();
		tm.set_translation(trans);
		if tm.writable {
			actions.push(Action::Persist(Command::SetTranslation {
				topicmap_id: tm.id,
				trans,
			}));
		}
		actions.push(Action::CanvasMoved(trans));
		self.redraw();
		actions
	}

	fn end_association(&mut self, source: Id, target: Option<Id>) -> Vec<Action> {
		let mut actions = Vec::new();
		self.set_cursor(Cursor::Default, &mut actions);
		match target {
			Some(target) if target != source => {
				let role_type = &self.settings.default_role_type_uri;
				actions.push(Action::Persist(Command::CreateAssociation(AssociationModel {
					type_uri: self.settings.default_assoc_type_uri.clone(),
					role_1: Role::topic(source, role_type.clone()),
					role_2: Role::topic(target, role_type.clone()),
				})));
			}
			Some(_) => debug!("association from topic {source} onto itself discarded"),
			None => debug!("association from topic {source} cancelled"),
		}
		// removes the rubber band
		self.redraw();
		actions
	}
}

#[cfg(test)]
mod tests;
