//! The single selected object and the browser history entries bound to it.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::components::topicmap::{Association, Id, ObjectRef, Topic};

#[derive(Clone, Debug, PartialEq)]
pub enum SelectedObject {
	Topic(Topic),
	Assoc(Association),
}

impl SelectedObject {
	pub fn id(&self) -> Id {
		match self {
			SelectedObject::Topic(t) => t.id,
			SelectedObject::Assoc(a) => a.id,
		}
	}

	pub fn object_ref(&self) -> ObjectRef {
		match self {
			SelectedObject::Topic(t) => ObjectRef::Topic(t.id),
			SelectedObject::Assoc(a) => ObjectRef::Assoc(a.id),
		}
	}

	pub fn label(&self) -> String {
		match self {
			SelectedObject::Topic(t) => t.label(),
			SelectedObject::Assoc(a) => a.label(),
		}
	}

	pub fn type_uri(&self) -> &str {
		match self {
			SelectedObject::Topic(t) => &t.type_uri,
			SelectedObject::Assoc(a) => &a.type_uri,
		}
	}
}

/// Whether a selection change records a history entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryUpdate {
	Push,
	Suppress,
}

/// What a history entry restores.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
	pub topicmap_id: Id,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub topic_id: Option<Id>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub assoc_id: Option<Id>,
}

impl HistoryState {
	pub fn new(topicmap_id: Id, selection: Option<ObjectRef>) -> Self {
		let (topic_id, assoc_id) = match selection {
			Some(ObjectRef::Topic(id)) => (Some(id), None),
			Some(ObjectRef::Assoc(id)) => (None, Some(id)),
			None => (None, None),
		};
		Self {
			topicmap_id,
			topic_id,
			assoc_id,
		}
	}

	pub fn selection(&self) -> Option<ObjectRef> {
		match (self.topic_id, self.assoc_id) {
			(Some(id), _) => Some(ObjectRef::Topic(id)),
			(None, Some(id)) => Some(ObjectRef::Assoc(id)),
			(None, None) => None,
		}
	}

	pub fn url(&self) -> String {
		match self.selection() {
			Some(ObjectRef::Topic(id)) => format!("/topicmap/{}/topic/{id}", self.topicmap_id),
			Some(ObjectRef::Assoc(id)) => format!("/topicmap/{}/assoc/{id}", self.topicmap_id),
			None => format!("/topicmap/{}", self.topicmap_id),
		}
	}

	/// Reads back a URL made by [`Self::url`].
	pub fn from_url(path: &str) -> Option<Self> {
		let mut segments = path.trim_matches('/').split('/');
		if segments.next()? != "topicmap" {
			return None;
		}
		let topicmap_id = segments.next()?.parse().ok()?;
		let selection = match (segments.next(), segments.next()) {
			(None, _) => None,
			(Some("topic"), Some(id)) => Some(ObjectRef::Topic(id.parse().ok()?)),
			(Some("assoc"), Some(id)) => Some(ObjectRef::Assoc(id.parse().ok()?)),
			_ => return None,
		};
		if segments.next().is_some() {
			return None;
		}
		Some(Self::new(topicmap_id, selection))
	}
}

pub trait HistorySink {
	fn push(&mut self, state: &HistoryState);
}

/// At most one selected object. Selecting replaces the previous one.
pub struct Selection {
	object: Option<SelectedObject>,
	history: Box<dyn HistorySink>,
}

impl Selection {
	pub fn new(history: Box<dyn HistorySink>) -> Self {
		Self {
			object: None,
			history,
		}
	}

	pub fn object(&self) -> Option<&SelectedObject> {
		self.object.as_ref()
	}

	pub fn is_selected(&self, id: Id) -> bool {
		self.object.as_ref().is_some_and(|o| o.id() == id)
	}

	pub fn select(&mut self, object: SelectedObject, topicmap_id: Id, update: HistoryUpdate) {
		let state = HistoryState::new(topicmap_id, Some(object.object_ref()));
		self.object = Some(object);
		self.record(state, update);
	}

	pub fn reset(&mut self, topicmap_id: Id, update: HistoryUpdate) {
		self.object = None;
		self.record(HistoryState::new(topicmap_id, None), update);
	}

	/// Replaces the selected object's data if `object` is the selected one.
	/// Never touches the history.
	pub fn refresh(&mut self, object: SelectedObject) -> bool {
		if self.is_selected(object.id()) {
			self.object = Some(object);
			true
		} else {
			false
		}
	}

	/// Clears the selection if `id` is selected. Never touches the history.
	pub fn unselect(&mut self, id: Id) -> bool {
		if self.is_selected(id) {
			self.object = None;
			true
		} else {
			false
		}
	}

	fn record(&mut self, state: HistoryState, update: HistoryUpdate) {
		match update {
			HistoryUpdate::Push => {
				debug!("history push {}", state.url());
				self.history.push(&state);
			}
			HistoryUpdate::Suppress => {}
		}
	}
}
