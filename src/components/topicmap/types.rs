//! Graph objects as delivered by the server, plus the small geometry types
//! shared by the viewmodel, the view and the renderer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Database ID of a topic, association or topicmap.
pub type Id = i64;

/// Free-form per-topic view properties, keyed by property URI.
pub type ViewProps = BTreeMap<String, serde_json::Value>;

pub const PROP_X: &str = "dm4.topicmaps.x";
pub const PROP_Y: &str = "dm4.topicmaps.y";
pub const PROP_VISIBILITY: &str = "dm4.topicmaps.visibility";

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn offset(self, dx: f64, dy: f64) -> Self {
		Self::new(self.x + dx, self.y + dy)
	}

	/// Rounds both coordinates down. The position resources only accept integers.
	pub fn floor(self) -> Self {
		Self::new(self.x.floor(), self.y.floor())
	}

	pub fn midpoint(self, other: Point) -> Self {
		Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
	pub width: f64,
	pub height: f64,
}

impl Size {
	pub const fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}
}

/// Axis-aligned box. `contains` is half-open: the `x1`/`y1` edges are inside,
/// the `x2`/`y2` edges are not.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
	pub x1: f64,
	pub y1: f64,
	pub x2: f64,
	pub y2: f64,
}

impl Rect {
	pub fn centered(center: Point, size: Size) -> Self {
		let x1 = center.x - size.width / 2.0;
		let y1 = center.y - size.height / 2.0;
		Self {
			x1,
			y1,
			x2: x1 + size.width,
			y2: y1 + size.height,
		}
	}

	pub fn contains(&self, p: Point) -> bool {
		p.x >= self.x1 && p.x < self.x2 && p.y >= self.y1 && p.y < self.y2
	}
}

/// A simple topic value. The server sends strings, numbers or booleans.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SimpleValue {
	Text(String),
	Number(f64),
	Bool(bool),
}

impl Default for SimpleValue {
	fn default() -> Self {
		SimpleValue::Text(String::new())
	}
}

impl From<String> for SimpleValue {
	fn from(s: String) -> Self {
		SimpleValue::Text(s)
	}
}

impl From<&str> for SimpleValue {
	fn from(s: &str) -> Self {
		SimpleValue::Text(s.to_string())
	}
}

impl fmt::Display for SimpleValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SimpleValue::Text(s) => f.write_str(s),
			SimpleValue::Number(n) => write!(f, "{n}"),
			SimpleValue::Bool(b) => write!(f, "{b}"),
		}
	}
}

/// Child topics keyed by association definition URI.
pub type ChildTopics = BTreeMap<String, ChildValue>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildValue {
	Many(Vec<Topic>),
	One(Box<Topic>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Topic {
	pub id: Id,
	#[serde(default)]
	pub uri: String,
	pub type_uri: String,
	#[serde(default)]
	pub value: SimpleValue,
	#[serde(default)]
	pub childs: ChildTopics,
}

impl Topic {
	pub fn new(id: Id, type_uri: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			id,
			uri: String::new(),
			type_uri: type_uri.into(),
			value: SimpleValue::Text(value.into()),
			childs: ChildTopics::new(),
		}
	}

	pub fn label(&self) -> String {
		self.value.to_string()
	}

	/// Depth-first search for a topic of the given type, starting with this topic.
	/// Of a multi-value child only the first entry is visited.
	pub fn find_child_topic(&self, type_uri: &str) -> Option<&Topic> {
		if self.type_uri == type_uri {
			return Some(self);
		}
		self.childs.values().find_map(|child| match child {
			ChildValue::One(topic) => topic.find_child_topic(type_uri),
			ChildValue::Many(topics) => topics.first().and_then(|t| t.find_child_topic(type_uri)),
		})
	}
}

/// What a role points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Player {
	Topic(Id),
	Assoc(Id),
}

impl Player {
	pub fn id(self) -> Id {
		match self {
			Player::Topic(id) | Player::Assoc(id) => id,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Role {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub topic_id: Option<Id>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub assoc_id: Option<Id>,
	pub role_type_uri: String,
}

impl Role {
	pub fn topic(topic_id: Id, role_type_uri: impl Into<String>) -> Self {
		Self {
			topic_id: Some(topic_id),
			assoc_id: None,
			role_type_uri: role_type_uri.into(),
		}
	}

	pub fn assoc(assoc_id: Id, role_type_uri: impl Into<String>) -> Self {
		Self {
			topic_id: None,
			assoc_id: Some(assoc_id),
			role_type_uri: role_type_uri.into(),
		}
	}

	pub fn player(&self) -> Option<Player> {
		match (self.topic_id, self.assoc_id) {
			(Some(id), _) => Some(Player::Topic(id)),
			(None, Some(id)) => Some(Player::Assoc(id)),
			(None, None) => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Association {
	pub id: Id,
	#[serde(default)]
	pub uri: String,
	pub type_uri: String,
	#[serde(default)]
	pub value: SimpleValue,
	pub role_1: Role,
	pub role_2: Role,
	#[serde(default)]
	pub childs: ChildTopics,
}

impl Association {
	pub fn new(id: Id, type_uri: impl Into<String>, role_1: Role, role_2: Role) -> Self {
		Self {
			id,
			uri: String::new(),
			type_uri: type_uri.into(),
			value: SimpleValue::default(),
			role_1,
			role_2,
			childs: ChildTopics::new(),
		}
	}

	pub fn label(&self) -> String {
		self.value.to_string()
	}

	pub fn players(&self) -> Option<(Player, Player)> {
		Some((self.role_1.player()?, self.role_2.player()?))
	}

	pub fn involves(&self, player: Player) -> bool {
		self.role_1.player() == Some(player) || self.role_2.player() == Some(player)
	}
}

/// A topic as stored in a topicmap: the topic plus its view properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicmapTopic {
	#[serde(flatten)]
	pub topic: Topic,
	#[serde(default)]
	pub view_props: ViewProps,
}

/// A topicmap as fetched from the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicmapData {
	pub info: Topic,
	#[serde(default)]
	pub topics: Vec<TopicmapTopic>,
	#[serde(default)]
	pub assocs: Vec<Association>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn topic_with_nested_childs_deserializes() {
		let json = r#"{
			"id": 7,
			"type_uri": "dm4.contacts.person",
			"value": "Ada Lovelace",
			"childs": {
				"dm4.contacts.person_name": {
					"id": 8, "type_uri": "dm4.contacts.person_name", "value": "Ada Lovelace"
				},
				"dm4.contacts.phone_number#dm4.contacts.phone_entry": [
					{"id": 9, "type_uri": "dm4.contacts.phone_number", "value": 12345}
				]
			}
		}"#;
		let topic: Topic = serde_json::from_str(json).unwrap();
		assert_eq!(topic.label(), "Ada Lovelace");
		let phone = topic.find_child_topic("dm4.contacts.phone_number").unwrap();
		assert_eq!(phone.id, 9);
		assert_eq!(phone.label(), "12345");
		assert!(topic.find_child_topic("dm4.contacts.email_address").is_none());
	}

	#[test]
	fn role_resolves_topic_or_assoc_player() {
		assert_eq!(Role::topic(1, "dm4.core.default").player(), Some(Player::Topic(1)));
		assert_eq!(Role::assoc(2, "dm4.core.default").player(), Some(Player::Assoc(2)));
		let empty = Role {
			topic_id: None,
			assoc_id: None,
			role_type_uri: "dm4.core.default".into(),
		};
		assert_eq!(empty.player(), None);
	}

	#[test]
	fn rect_contains_is_half_open() {
		let r = Rect::centered(Point::new(10.0, 10.0), Size::new(4.0, 4.0));
		assert!(r.contains(Point::new(r.x1, r.y1)));
		assert!(!r.contains(Point::new(r.x2, r.y2)));
		assert!(!r.contains(Point::new(r.x2, r.y1)));
	}
}
