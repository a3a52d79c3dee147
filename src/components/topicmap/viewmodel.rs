//! The in-memory topicmap: which topics and associations are on the map,
//! where the topics are, whether they are visible and what is selected.
//!
//! Only data and mutations live here. Drawing is done from the
//! [`CanvasView`](super::view::CanvasView) projection.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use log::debug;

use super::types::{
	Association, Id, PROP_VISIBILITY, PROP_X, PROP_Y, Player, Point, Topic, TopicmapData,
	ViewProps,
};

/// Reference to a selectable object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectRef {
	Topic(Id),
	Assoc(Id),
}

impl ObjectRef {
	pub fn id(self) -> Id {
		match self {
			ObjectRef::Topic(id) | ObjectRef::Assoc(id) => id,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealKind {
	/// The topic/association was not on the map and has been added.
	Add,
	/// The topic was on the map but hidden and is visible again.
	Show,
	/// Already visible, nothing changed.
	None,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RevealOp {
	pub kind: RevealKind,
	/// View properties to persist, set for [`RevealKind::Add`] only.
	pub view_props: Option<ViewProps>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewTopic {
	pub topic: Topic,
	pub pos: Point,
	pub visibility: bool,
	pub view_props: ViewProps,
}

impl ViewTopic {
	pub fn new(topic: Topic, pos: Point, visibility: bool) -> Self {
		let mut view_props = ViewProps::new();
		write_position(&mut view_props, pos, visibility);
		Self {
			topic,
			pos,
			visibility,
			view_props,
		}
	}

	pub fn id(&self) -> Id {
		self.topic.id
	}

	/// Position and visibility are read from the view properties.
	pub fn from_props(topic: Topic, view_props: ViewProps) -> Self {
		let coord = |key: &str| view_props.get(key).and_then(serde_json::Value::as_f64).unwrap_or(0.0);
		let pos = Point::new(coord(PROP_X), coord(PROP_Y));
		let visibility = view_props
			.get(PROP_VISIBILITY)
			.and_then(serde_json::Value::as_bool)
			.unwrap_or(true);
		Self {
			topic,
			pos,
			visibility,
			view_props,
		}
	}
}

fn write_position(props: &mut ViewProps, pos: Point, visibility: bool) {
	props.insert(PROP_X.into(), pos.x.into());
	props.insert(PROP_Y.into(), pos.y.into());
	props.insert(PROP_VISIBILITY.into(), visibility.into());
}

/// Topics that move together when an association is dragged: every topic
/// reachable from the association's players through visible associations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cluster {
	topic_ids: Vec<Id>,
}

impl Cluster {
	pub fn topic_ids(&self) -> &[Id] {
		&self.topic_ids
	}

	pub fn contains(&self, id: Id) -> bool {
		self.topic_ids.contains(&id)
	}
}

#[derive(Clone, Debug, Default)]
pub struct Topicmap {
	pub id: Id,
	pub name: String,
	/// Whether the current user may change this topicmap (positions, translation).
	pub writable: bool,
	topics: IndexMap<Id, ViewTopic>,
	assocs: IndexMap<Id, Association>,
	trans: Point,
	selection: Option<ObjectRef>,
}

impl Topicmap {
	pub fn new(id: Id, name: impl Into<String>, writable: bool) -> Self {
		Self {
			id,
			name: name.into(),
			writable,
			..Self::default()
		}
	}

	pub fn from_data(data: TopicmapData, writable: bool) -> Self {
		let mut topicmap = Self::new(data.info.id, data.info.label(), writable);
		for entry in data.topics {
			let view_topic = ViewTopic::from_props(entry.topic, entry.view_props);
			topicmap.topics.insert(view_topic.id(), view_topic);
		}
		for assoc in data.assocs {
			topicmap.assocs.insert(assoc.id, assoc);
		}
		topicmap.trans = read_translation(&data.info);
		topicmap
	}

	// --- Queries ---

	pub fn topic(&self, id: Id) -> Option<&ViewTopic> {
		self.topics.get(&id)
	}

	pub fn assoc(&self, id: Id) -> Option<&Association> {
		self.assocs.get(&id)
	}

	pub fn topics(&self) -> impl Iterator<Item = &ViewTopic> {
		self.topics.values()
	}

	pub fn visible_topics(&self) -> impl Iterator<Item = &ViewTopic> {
		self.topics.values().filter(|t| t.visibility)
	}

	pub fn assocs(&self) -> impl Iterator<Item = &Association> {
		self.assocs.values()
	}

	pub fn topic_count(&self) -> usize {
		self.topics.len()
	}

	pub fn assoc_count(&self) -> usize {
		self.assocs.len()
	}

	/// Associations on the map that have the given object as a player.
	pub fn assocs_of(&self, player: Player) -> Vec<Id> {
		self.assocs
			.values()
			.filter(|a| a.involves(player))
			.map(|a| a.id)
			.collect()
	}

	/// Whether a player is on the map and drawable.
	pub fn has_player(&self, player: Player) -> bool {
		match player {
			Player::Topic(id) => self.topics.get(&id).is_some_and(|t| t.visibility),
			Player::Assoc(id) => self.assocs.contains_key(&id),
		}
	}

	pub fn translation(&self) -> Point {
		self.trans
	}

	// --- Reveal / remove ---

	/// Puts a topic on the map. An id is never stored twice: revealing a visible
	/// topic is a no-op even if the given data differs from the stored data.
	pub fn reveal_topic(&mut self, topic: Topic, pos: Point, select: bool) -> RevealOp {
		let id = topic.id;
		let op = match self.topics.get_mut(&id) {
			None => {
				let view_topic = ViewTopic::new(topic, pos, true);
				let view_props = view_topic.view_props.clone();
				self.topics.insert(id, view_topic);
				RevealOp {
					kind: RevealKind::Add,
					view_props: Some(view_props),
				}
			}
			Some(view_topic) if !view_topic.visibility => {
				view_topic.visibility = true;
				view_topic.view_props.insert(PROP_VISIBILITY.into(), true.into());
				RevealOp {
					kind: RevealKind::Show,
					view_props: None,
				}
			}
			Some(_) => {
				debug!("topic {id} is already visible");
				RevealOp {
					kind: RevealKind::None,
					view_props: None,
				}
			}
		};
		if select {
			self.selection = Some(ObjectRef::Topic(id));
		}
		op
	}

	/// Puts an association on the map if both players are drawable and it is not
	/// there yet.
	pub fn reveal_assoc(&mut self, assoc: Association, select: bool) -> RevealKind {
		let id = assoc.id;
		let kind = if self.assocs.contains_key(&id) {
			RevealKind::None
		} else {
			match assoc.players() {
				Some((p1, p2)) if self.has_player(p1) && self.has_player(p2) => {
					self.assocs.insert(id, assoc);
					RevealKind::Add
				}
				_ => {
					debug!("association {id} not revealed: a player is not on the map");
					RevealKind::None
				}
			}
		};
		if select && self.assocs.contains_key(&id) {
			self.selection = Some(ObjectRef::Assoc(id));
		}
		kind
	}

	/// Adds a topic with explicit view state, e.g. from a push message. Replaces
	/// an existing entry of the same id.
	pub fn add_topic(&mut self, view_topic: ViewTopic) {
		self.topics.insert(view_topic.id(), view_topic);
	}

	pub fn add_assoc(&mut self, assoc: Association) {
		self.assocs.insert(assoc.id, assoc);
	}

	/// Removes a topic. Associations are not touched: call
	/// [`remove_assocs`](Self::remove_assocs) first.
	pub fn remove_topic(&mut self, id: Id) -> Option<ViewTopic> {
		self.unselect(id);
		self.topics.shift_remove(&id)
	}

	pub fn remove_assoc(&mut self, id: Id) -> Option<Association> {
		self.unselect(id);
		self.assocs.shift_remove(&id)
	}

	/// Removes every association attached to the topic, including associations
	/// attached to those associations. Returns the removed ids.
	pub fn remove_assocs(&mut self, topic_id: Id) -> Vec<Id> {
		self.remove_assocs_of(Player::Topic(topic_id))
	}

	/// Removes an association together with the associations attached to it.
	pub fn remove_assoc_cascade(&mut self, assoc_id: Id) -> Vec<Id> {
		let mut removed = self.remove_assocs_of(Player::Assoc(assoc_id));
		if self.remove_assoc(assoc_id).is_some() {
			removed.push(assoc_id);
		}
		removed
	}

	fn remove_assocs_of(&mut self, player: Player) -> Vec<Id> {
		let mut removed = Vec::new();
		let mut queue = VecDeque::from([player]);
		while let Some(player) = queue.pop_front() {
			for assoc_id in self.assocs_of(player) {
				if self.remove_assoc(assoc_id).is_some() {
					removed.push(assoc_id);
					queue.push_back(Player::Assoc(assoc_id));
				}
			}
		}
		removed
	}

	// --- Updates ---

	/// Replaces the stored topic data. Returns false if the topic is not on the map.
	pub fn update_topic(&mut self, topic: Topic) -> bool {
		match self.topics.get_mut(&topic.id) {
			Some(view_topic) => {
				view_topic.topic = topic;
				true
			}
			None => false,
		}
	}

	pub fn update_assoc(&mut self, assoc: Association) -> bool {
		match self.assocs.get_mut(&assoc.id) {
			Some(stored) => {
				*stored = assoc;
				true
			}
			None => false,
		}
	}

	pub fn set_topic_position(&mut self, id: Id, pos: Point) {
		if let Some(view_topic) = self.topics.get_mut(&id) {
			view_topic.pos = pos;
			view_topic.view_props.insert(PROP_X.into(), pos.x.into());
			view_topic.view_props.insert(PROP_Y.into(), pos.y.into());
		}
	}

	pub fn set_topic_visibility(&mut self, id: Id, visibility: bool) {
		if let Some(view_topic) = self.topics.get_mut(&id) {
			view_topic.visibility = visibility;
			view_topic
				.view_props
				.insert(PROP_VISIBILITY.into(), visibility.into());
		}
		if !visibility {
			self.unselect(id);
		}
	}

	pub fn set_view_properties(&mut self, id: Id, props: ViewProps) {
		if let Some(view_topic) = self.topics.get_mut(&id) {
			for (key, value) in props {
				view_topic.view_props.insert(key, value);
			}
		}
	}

	pub fn set_translation(&mut self, trans: Point) {
		self.trans = trans;
	}

	/// Moves the translation. The caller decides when to persist it.
	pub fn translate_by(&mut self, dx: f64, dy: f64) {
		self.trans = self.trans.offset(dx, dy);
	}

	// --- Cluster ---

	pub fn create_cluster(&self, assoc_id: Id) -> Cluster {
		let mut topic_ids = Vec::new();
		let mut seen = HashSet::new();
		let mut queue = VecDeque::new();
		if let Some((p1, p2)) = self.assocs.get(&assoc_id).and_then(Association::players) {
			queue.extend([p1, p2]);
		}
		while let Some(player) = queue.pop_front() {
			if !seen.insert(player) {
				continue;
			}
			match player {
				Player::Topic(id) => {
					if !self.topics.get(&id).is_some_and(|t| t.visibility) {
						continue;
					}
					topic_ids.push(id);
				}
				Player::Assoc(id) => {
					if let Some((p1, p2)) = self.assocs.get(&id).and_then(Association::players) {
						queue.extend([p1, p2]);
					}
				}
			}
			for id in self.assocs_of(player) {
				if let Some((p1, p2)) = self.assocs.get(&id).and_then(Association::players) {
					queue.extend([p1, p2, Player::Assoc(id)]);
				}
			}
		}
		Cluster { topic_ids }
	}

	// --- Selection ---

	pub fn selection(&self) -> Option<ObjectRef> {
		self.selection
	}

	pub fn has_selection(&self) -> bool {
		self.selection.is_some()
	}

	pub fn is_selected(&self, id: Id) -> bool {
		self.selection.is_some_and(|s| s.id() == id)
	}

	pub fn set_topic_selection(&mut self, id: Id) {
		self.selection = Some(ObjectRef::Topic(id));
	}

	pub fn set_assoc_selection(&mut self, id: Id) {
		self.selection = Some(ObjectRef::Assoc(id));
	}

	pub fn reset_selection(&mut self) {
		self.selection = None;
	}

	fn unselect(&mut self, id: Id) {
		if self.is_selected(id) {
			self.selection = None;
		}
	}

	/// Position of the selected topic, or the midpoint of the selected association.
	pub fn selection_pos(&self) -> Option<Point> {
		match self.selection? {
			ObjectRef::Topic(id) => self.topics.get(&id).map(|t| t.pos),
			ObjectRef::Assoc(id) => self.player_pos(Player::Assoc(id), 0),
		}
	}

	fn player_pos(&self, player: Player, depth: usize) -> Option<Point> {
		// guards against association cycles
		if depth > self.assocs.len() {
			return None;
		}
		match player {
			Player::Topic(id) => self.topics.get(&id).map(|t| t.pos),
			Player::Assoc(id) => {
				let (p1, p2) = self.assocs.get(&id)?.players()?;
				Some(self.player_pos(p1, depth + 1)?.midpoint(self.player_pos(p2, depth + 1)?))
			}
		}
	}
}

fn read_translation(info: &Topic) -> Point {
	let child = |uri: &str| {
		info.find_child_topic(uri)
			.and_then(|t| t.label().parse::<f64>().ok())
			.unwrap_or(0.0)
	};
	Point::new(
		child("dm4.topicmaps.translation_x"),
		child("dm4.topicmaps.translation_y"),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::topicmap::types::Role;

	fn topic(id: Id) -> Topic {
		Topic::new(id, "dm4.notes.note", format!("Note {id}"))
	}

	fn assoc(id: Id, t1: Id, t2: Id) -> Association {
		Association::new(
			id,
			"dm4.core.association",
			Role::topic(t1, "dm4.core.default"),
			Role::topic(t2, "dm4.core.default"),
		)
	}

	fn map_with(topics: &[Id]) -> Topicmap {
		let mut tm = Topicmap::new(100, "test", true);
		for &id in topics {
			tm.reveal_topic(topic(id), Point::new(id as f64 * 10.0, 0.0), false);
		}
		tm
	}

	#[test]
	fn reveal_topic_adds_once_then_noop() {
		let mut tm = Topicmap::new(100, "test", true);
		let first = tm.reveal_topic(topic(1), Point::new(5.0, 6.0), false);
		assert_eq!(first.kind, RevealKind::Add);
		let props = first.view_props.unwrap();
		assert_eq!(props[PROP_X], serde_json::json!(5.0));
		assert_eq!(props[PROP_VISIBILITY], serde_json::json!(true));

		let mut stale = topic(1);
		stale.value = "changed elsewhere".to_string().into();
		for _ in 0..3 {
			let again = tm.reveal_topic(stale.clone(), Point::new(50.0, 60.0), false);
			assert_eq!(again.kind, RevealKind::None);
		}
		assert_eq!(tm.topic_count(), 1);
		assert_eq!(tm.topic(1).unwrap().pos, Point::new(5.0, 6.0));
		assert_eq!(tm.topic(1).unwrap().topic.label(), "Note 1");
	}

	#[test]
	fn reveal_hidden_topic_shows_it_at_stored_position() {
		let mut tm = map_with(&[1]);
		tm.set_topic_visibility(1, false);
		let op = tm.reveal_topic(topic(1), Point::new(999.0, 999.0), true);
		assert_eq!(op.kind, RevealKind::Show);
		assert_eq!(op.view_props, None);
		let vt = tm.topic(1).unwrap();
		assert!(vt.visibility);
		assert_eq!(vt.pos, Point::new(10.0, 0.0));
		assert!(tm.is_selected(1));
	}

	#[test]
	fn reveal_assoc_requires_both_players() {
		let mut tm = map_with(&[1, 2]);
		assert_eq!(tm.reveal_assoc(assoc(10, 1, 3), false), RevealKind::None);
		assert_eq!(tm.reveal_assoc(assoc(10, 1, 2), true), RevealKind::Add);
		assert_eq!(tm.reveal_assoc(assoc(10, 1, 2), false), RevealKind::None);
		assert_eq!(tm.assoc_count(), 1);
		assert!(tm.is_selected(10));
	}

	#[test]
	fn reveal_assoc_rejects_hidden_player() {
		let mut tm = map_with(&[1, 2]);
		tm.set_topic_visibility(2, false);
		assert_eq!(tm.reveal_assoc(assoc(10, 1, 2), false), RevealKind::None);
	}

	#[test]
	fn cascade_removal_leaves_no_dangling_assocs() {
		let mut tm = map_with(&[1, 2, 3]);
		tm.reveal_assoc(assoc(10, 1, 2), false);
		tm.reveal_assoc(assoc(11, 3, 1), false);
		tm.reveal_assoc(assoc(12, 2, 3), false);
		// association attached to association 10
		tm.reveal_assoc(
			Association::new(
				13,
				"dm4.core.association",
				Role::assoc(10, "dm4.core.default"),
				Role::topic(3, "dm4.core.default"),
			),
			false,
		);

		let mut removed = tm.remove_assocs(1);
		removed.sort();
		assert_eq!(removed, vec![10, 11, 13]);
		tm.remove_topic(1);

		assert!(tm.topic(1).is_none());
		assert!(tm.assocs().all(|a| !a.involves(Player::Topic(1))));
		assert!(tm.assoc(12).is_some());
	}

	#[test]
	fn removal_is_idempotent() {
		let mut tm = map_with(&[1]);
		assert!(tm.remove_topic(1).is_some());
		assert!(tm.remove_topic(1).is_none());
		assert!(tm.remove_assoc(42).is_none());
	}

	#[test]
	fn removing_selected_object_clears_selection() {
		let mut tm = map_with(&[1, 2]);
		tm.reveal_assoc(assoc(10, 1, 2), true);
		tm.remove_assocs(2);
		assert_eq!(tm.selection(), None);
	}

	#[test]
	fn cluster_spans_connected_topics_only() {
		let mut tm = map_with(&[1, 2, 3, 4]);
		tm.reveal_assoc(assoc(10, 1, 2), false);
		tm.reveal_assoc(assoc(11, 2, 3), false);
		let cluster = tm.create_cluster(10);
		let mut ids = cluster.topic_ids().to_vec();
		ids.sort();
		assert_eq!(ids, vec![1, 2, 3]);
		assert!(!cluster.contains(4));
	}

	#[test]
	fn selection_pos_of_assoc_is_midpoint() {
		let mut tm = map_with(&[1, 3]);
		tm.reveal_assoc(assoc(10, 1, 3), true);
		assert_eq!(tm.selection_pos(), Some(Point::new(20.0, 0.0)));
	}

	#[test]
	fn from_data_reads_view_props_and_translation() {
		let json = r#"{
			"info": {
				"id": 100, "type_uri": "dm4.topicmaps.topicmap", "value": "Mind map",
				"childs": {
					"dm4.topicmaps.state": {
						"id": 101, "type_uri": "dm4.topicmaps.state", "value": "",
						"childs": {
							"dm4.topicmaps.translation": {
								"id": 102, "type_uri": "dm4.topicmaps.translation", "value": "",
								"childs": {
									"dm4.topicmaps.translation_x": {"id": 103, "type_uri": "dm4.topicmaps.translation_x", "value": -40},
									"dm4.topicmaps.translation_y": {"id": 104, "type_uri": "dm4.topicmaps.translation_y", "value": 25}
								}
							}
						}
					}
				}
			},
			"topics": [
				{"id": 1, "type_uri": "dm4.notes.note", "value": "A",
				 "view_props": {"dm4.topicmaps.x": 12, "dm4.topicmaps.y": 34, "dm4.topicmaps.visibility": false}}
			],
			"assocs": []
		}"#;
		let data: TopicmapData = serde_json::from_str(json).unwrap();
		let tm = Topicmap::from_data(data, false);
		assert_eq!(tm.name, "Mind map");
		assert_eq!(tm.translation(), Point::new(-40.0, 25.0));
		let vt = tm.topic(1).unwrap();
		assert_eq!(vt.pos, Point::new(12.0, 34.0));
		assert!(!vt.visibility);
	}
}
