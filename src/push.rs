//! Messages pushed by the server over the WebSocket when another client
//! changed a topicmap.

use log::debug;
use serde::Deserialize;

use crate::components::topicmap::{Association, Id, Point, TopicmapTopic, ViewProps, ViewTopic};
use crate::directives::RawDirective;
use crate::error::Result;
use crate::webclient::Webclient;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", content = "args", rename_all = "camelCase")]
pub enum PushMessage {
	ProcessDirectives(Vec<RawDirective>),
	#[serde(rename_all = "camelCase")]
	AddTopicToTopicmap {
		topicmap_id: Id,
		view_topic: TopicmapTopic,
	},
	#[serde(rename_all = "camelCase")]
	AddAssocToTopicmap { topicmap_id: Id, assoc: Association },
	#[serde(rename_all = "camelCase")]
	SetTopicPosition {
		topicmap_id: Id,
		topic_id: Id,
		pos: Point,
	},
	#[serde(rename_all = "camelCase")]
	SetTopicVisibility {
		topicmap_id: Id,
		topic_id: Id,
		visibility: bool,
	},
	#[serde(rename_all = "camelCase")]
	SetViewProps {
		topicmap_id: Id,
		topic_id: Id,
		view_props: ViewProps,
	},
	#[serde(rename_all = "camelCase")]
	RemoveAssocFromTopicmap { topicmap_id: Id, assoc_id: Id },
}

impl PushMessage {
	pub fn from_json(text: &str) -> Result<Self> {
		Ok(serde_json::from_str(text)?)
	}

	/// The topicmap a message is about. Directives are not bound to one.
	pub fn topicmap_id(&self) -> Option<Id> {
		match self {
			PushMessage::ProcessDirectives(_) => None,
			PushMessage::AddTopicToTopicmap { topicmap_id, .. }
			| PushMessage::AddAssocToTopicmap { topicmap_id, .. }
			| PushMessage::SetTopicPosition { topicmap_id, .. }
			| PushMessage::SetTopicVisibility { topicmap_id, .. }
			| PushMessage::SetViewProps { topicmap_id, .. }
			| PushMessage::RemoveAssocFromTopicmap { topicmap_id, .. } => Some(*topicmap_id),
		}
	}
}

impl Webclient {
	/// Applies a pushed message. Messages about a topicmap other than the
	/// displayed one are dropped.
	pub fn handle_push(&mut self, message: PushMessage) -> Result<()> {
		if let Some(topicmap_id) = message.topicmap_id() {
			if self.state.topicmap_id().ok() != Some(topicmap_id) {
				debug!("push for topicmap {topicmap_id} ignored: not displayed");
				return Ok(());
			}
		}
		match message {
			PushMessage::ProcessDirectives(directives) => self.process_directives(&directives),
			PushMessage::AddTopicToTopicmap { view_topic, .. } => {
				self.state.add_topic(ViewTopic::from_props(view_topic.topic, view_topic.view_props))
			}
			PushMessage::AddAssocToTopicmap { assoc, .. } => self.state.add_assoc(assoc),
			PushMessage::SetTopicPosition { topic_id, pos, .. } => {
				self.state.set_topic_position(topic_id, pos)
			}
			PushMessage::SetTopicVisibility {
				topic_id,
				visibility,
				..
			} => {
				self.state.set_topic_visibility(topic_id, visibility)?;
				if !visibility {
					self.unselect(topic_id);
				}
				Ok(())
			}
			PushMessage::SetViewProps {
				topic_id, view_props, ..
			} => self.state.set_view_properties(topic_id, view_props),
			PushMessage::RemoveAssocFromTopicmap { assoc_id, .. } => {
				for id in self.state.remove_assoc(assoc_id)? {
					self.unselect(id);
				}
				Ok(())
			}
		}
	}
}
