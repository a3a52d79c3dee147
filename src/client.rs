//! Persistence and permission collaborators.
//!
//! Every mutating call answers with an [`Outcome`]: the created or updated
//! object, if any, and the directives the server wants every client to apply.

use std::collections::HashMap;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::components::topicmap::{Association, Id, Point, Role, Topic, TopicmapData, ViewProps};
use crate::directives::RawDirective;
use crate::error::{Error, Result};

/// Permission key in the access control response.
const WRITE_OPERATION: &str = "dm4.accesscontrol.operation.write";

/// A topic to be created. The server assigns the id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TopicModel {
	pub type_uri: String,
	pub value: String,
}

/// An association to be created.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AssociationModel {
	pub type_uri: String,
	pub role_1: Role,
	pub role_2: Role,
}

/// One persistence operation.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
	AddTopicToTopicmap {
		topicmap_id: Id,
		topic_id: Id,
		view_props: ViewProps,
	},
	AddAssocToTopicmap {
		topicmap_id: Id,
		assoc_id: Id,
	},
	AddRelatedTopicToTopicmap {
		topicmap_id: Id,
		topic_id: Id,
		assoc_id: Id,
		view_props: ViewProps,
	},
	SetTopicPosition {
		topicmap_id: Id,
		topic_id: Id,
		pos: Point,
	},
	/// All members of a moved cluster in one call.
	SetClusterPosition {
		topicmap_id: Id,
		positions: Vec<(Id, Point)>,
	},
	SetTranslation {
		topicmap_id: Id,
		trans: Point,
	},
	SetTopicVisibility {
		topicmap_id: Id,
		topic_id: Id,
		visibility: bool,
	},
	RemoveAssocFromTopicmap {
		topicmap_id: Id,
		assoc_id: Id,
	},
	/// `pos` is where the created topic is revealed once the server answers.
	CreateTopic {
		model: TopicModel,
		pos: Option<Point>,
	},
	UpdateTopic(Topic),
	DeleteTopic(Id),
	CreateAssociation(AssociationModel),
	UpdateAssociation(Association),
	DeleteAssociation(Id),
	CreateTopicType(Value),
	UpdateTopicType(Value),
	DeleteTopicType(String),
	CreateAssocType(Value),
	UpdateAssocType(Value),
	DeleteAssocType(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DmxObject {
	Assoc(Association),
	Topic(Topic),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outcome {
	pub object: Option<DmxObject>,
	pub directives: Vec<RawDirective>,
}

impl Outcome {
	/// Reads a server response. The body is either a directives array, an
	/// object, or an object with a `directives` member.
	pub fn from_response(body: Value) -> Result<Self> {
		match body {
			Value::Null => Ok(Self::default()),
			Value::Array(_) => Ok(Self {
				object: None,
				directives: serde_json::from_value(body)?,
			}),
			Value::Object(mut map) => {
				let directives = match map.remove("directives") {
					Some(value) => serde_json::from_value(value)?,
					None => Vec::new(),
				};
				let object = if map.contains_key("id") {
					Some(serde_json::from_value(Value::Object(map))?)
				} else {
					None
				};
				Ok(Self { object, directives })
			}
			other => Err(Error::Request(format!("unexpected response: {other}"))),
		}
	}
}

pub trait TopicmapService {
	fn fetch_topic(&self, id: Id) -> LocalBoxFuture<'static, Result<Topic>>;
	fn fetch_topicmap(&self, id: Id) -> LocalBoxFuture<'static, Result<TopicmapData>>;
	fn fetch_topics_by_type(&self, type_uri: &str) -> LocalBoxFuture<'static, Result<Vec<Topic>>>;
	fn fetch_assigned_topics(
		&self,
		workspace_id: Id,
		type_uri: &str,
	) -> LocalBoxFuture<'static, Result<Vec<Topic>>>;
	fn has_write_permission(&self, id: Id) -> LocalBoxFuture<'static, Result<bool>>;
	fn execute(&self, command: Command) -> LocalBoxFuture<'static, Result<Outcome>>;
}

#[derive(Clone, Copy, Debug)]
enum Method {
	Get,
	Post,
	Put,
	Delete,
}

/// REST implementation against the DeepaMehta HTTP API.
#[derive(Clone)]
pub struct RestClient {
	http: reqwest::Client,
	base_url: String,
}

impl RestClient {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			http: reqwest::Client::new(),
			base_url: base_url.into().trim_end_matches('/').to_string(),
		}
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	fn get<T>(&self, path: String) -> LocalBoxFuture<'static, Result<T>>
	where
		T: DeserializeOwned + 'static,
	{
		let request = self.http.get(self.url(&path));
		async move {
			let response = request.send().await?.error_for_status()?;
			Ok(response.json::<T>().await?)
		}
		.boxed_local()
	}

	fn send(&self, method: Method, path: String, body: Option<Value>) -> LocalBoxFuture<'static, Result<Outcome>> {
		let url = self.url(&path);
		debug!("{method:?} {path}");
		let mut request = match method {
			Method::Get => self.http.get(url),
			Method::Post => self.http.post(url),
			Method::Put => self.http.put(url),
			Method::Delete => self.http.delete(url),
		};
		if let Some(body) = body {
			request = request.json(&body);
		}
		async move {
			let response = request.send().await?.error_for_status()?;
			let text = response.text().await?;
			if text.trim().is_empty() {
				return Ok(Outcome::default());
			}
			Outcome::from_response(serde_json::from_str(&text)?)
		}
		.boxed_local()
	}

	/// Method, path and body of a command.
	fn route(command: Command) -> Result<(Method, String, Option<Value>)> {
		use Command::*;
		Ok(match command {
			AddTopicToTopicmap {
				topicmap_id,
				topic_id,
				view_props,
			} => (
				Method::Post,
				format!("/topicmap/{topicmap_id}/topic/{topic_id}"),
				Some(serde_json::to_value(view_props)?),
			),
			AddAssocToTopicmap { topicmap_id, assoc_id } => (
				Method::Post,
				format!("/topicmap/{topicmap_id}/association/{assoc_id}"),
				None,
			),
			AddRelatedTopicToTopicmap {
				topicmap_id,
				topic_id,
				assoc_id,
				view_props,
			} => (
				Method::Post,
				format!("/topicmap/{topicmap_id}/topic/{topic_id}/association/{assoc_id}"),
				Some(serde_json::to_value(view_props)?),
			),
			SetTopicPosition {
				topicmap_id,
				topic_id,
				pos,
			} => (
				Method::Put,
				format!("/topicmap/{topicmap_id}/topic/{topic_id}/{}/{}", pos.x as i64, pos.y as i64),
				None,
			),
			SetClusterPosition { topicmap_id, positions } => {
				let coords: Vec<Value> = positions
					.iter()
					.map(|(id, p)| json!({"topic_id": id, "x": p.x as i64, "y": p.y as i64}))
					.collect();
				(Method::Put, format!("/topicmap/{topicmap_id}"), Some(Value::Array(coords)))
			}
			SetTranslation { topicmap_id, trans } => (
				Method::Put,
				format!("/topicmap/{topicmap_id}/translation/{}/{}", trans.x as i64, trans.y as i64),
				None,
			),
			SetTopicVisibility {
				topicmap_id,
				topic_id,
				visibility,
			} => (
				Method::Put,
				format!("/topicmap/{topicmap_id}/topic/{topic_id}/{visibility}"),
				None,
			),
			RemoveAssocFromTopicmap { topicmap_id, assoc_id } => (
				Method::Delete,
				format!("/topicmap/{topicmap_id}/association/{assoc_id}"),
				None,
			),
			CreateTopic { model, .. } => (Method::Post, "/core/topic".into(), Some(serde_json::to_value(model)?)),
			UpdateTopic(topic) => (
				Method::Put,
				format!("/core/topic/{}", topic.id),
				Some(serde_json::to_value(topic)?),
			),
			DeleteTopic(id) => (Method::Delete, format!("/core/topic/{id}"), None),
			CreateAssociation(model) => (
				Method::Post,
				"/core/association".into(),
				Some(serde_json::to_value(model)?),
			),
			UpdateAssociation(assoc) => (
				Method::Put,
				format!("/core/association/{}", assoc.id),
				Some(serde_json::to_value(assoc)?),
			),
			DeleteAssociation(id) => (Method::Delete, format!("/core/association/{id}"), None),
			CreateTopicType(model) => (Method::Post, "/core/topictype".into(), Some(model)),
			UpdateTopicType(model) => (Method::Put, "/core/topictype".into(), Some(model)),
			DeleteTopicType(uri) => (Method::Delete, format!("/core/topictype/{uri}"), None),
			CreateAssocType(model) => (Method::Post, "/core/assoctype".into(), Some(model)),
			UpdateAssocType(model) => (Method::Put, "/core/assoctype".into(), Some(model)),
			DeleteAssocType(uri) => (Method::Delete, format!("/core/assoctype/{uri}"), None),
		})
	}
}

impl TopicmapService for RestClient {
	fn fetch_topic(&self, id: Id) -> LocalBoxFuture<'static, Result<Topic>> {
		self.get(format!("/core/topic/{id}?include_childs=true"))
	}

	fn fetch_topicmap(&self, id: Id) -> LocalBoxFuture<'static, Result<TopicmapData>> {
		self.get(format!("/topicmap/{id}?include_childs=true"))
	}

	fn fetch_topics_by_type(&self, type_uri: &str) -> LocalBoxFuture<'static, Result<Vec<Topic>>> {
		self.get(format!("/core/topic/by_type/{type_uri}"))
	}

	fn fetch_assigned_topics(
		&self,
		workspace_id: Id,
		type_uri: &str,
	) -> LocalBoxFuture<'static, Result<Vec<Topic>>> {
		self.get(format!("/workspace/{workspace_id}/topics/{type_uri}"))
	}

	fn has_write_permission(&self, id: Id) -> LocalBoxFuture<'static, Result<bool>> {
		let permissions = self.get::<HashMap<String, bool>>(format!("/accesscontrol/topic/{id}"));
		async move { Ok(permissions.await?.get(WRITE_OPERATION).copied().unwrap_or(false)) }.boxed_local()
	}

	fn execute(&self, command: Command) -> LocalBoxFuture<'static, Result<Outcome>> {
		match Self::route(command) {
			Ok((method, path, body)) => self.send(method, path, body),
			Err(e) => async move { Err(e) }.boxed_local(),
		}
	}
}

/// Synchronous write-permission lookup.
pub trait Permissions {
	fn has_write_permission(&self, id: Id) -> bool;
}

/// Permissions fetched so far. Unknown objects are not writable.
#[derive(Clone, Debug, Default)]
pub struct PermissionCache {
	writable: HashMap<Id, bool>,
}

impl PermissionCache {
	pub fn insert(&mut self, id: Id, writable: bool) {
		self.writable.insert(id, writable);
	}

	pub fn remove(&mut self, id: Id) {
		self.writable.remove(&id);
	}
}

impl Permissions for PermissionCache {
	fn has_write_permission(&self, id: Id) -> bool {
		self.writable.get(&id).copied().unwrap_or(false)
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[test]
	fn outcome_from_bare_directive_array() {
		let outcome = Outcome::from_response(json!([
			{"type": "DELETE_TOPIC", "arg": {"id": 5}}
		]))
		.unwrap();
		assert_eq!(outcome.object, None);
		assert_eq!(outcome.directives.len(), 1);
		assert_eq!(outcome.directives[0].kind, "DELETE_TOPIC");
	}

	#[test]
	fn outcome_from_object_with_directives() {
		let outcome = Outcome::from_response(json!({
			"id": 12,
			"type_uri": "dm4.core.association",
			"role_1": {"topic_id": 1, "role_type_uri": "dm4.core.default"},
			"role_2": {"topic_id": 2, "role_type_uri": "dm4.core.default"},
			"directives": [{"type": "UPDATE_TOPIC", "arg": {"id": 1, "type_uri": "dm4.notes.note"}}]
		}))
		.unwrap();
		assert!(matches!(outcome.object, Some(DmxObject::Assoc(ref a)) if a.id == 12));
		assert_eq!(outcome.directives.len(), 1);
	}

	#[test]
	fn outcome_from_plain_topic() {
		let outcome = Outcome::from_response(json!({"id": 3, "type_uri": "dm4.notes.note", "value": "x"})).unwrap();
		assert!(matches!(outcome.object, Some(DmxObject::Topic(ref t)) if t.id == 3));
		assert!(outcome.directives.is_empty());
	}

	#[rstest]
	#[case(
		Command::SetTopicPosition { topicmap_id: 9, topic_id: 3, pos: Point::new(10.0, -5.0) },
		"/topicmap/9/topic/3/10/-5"
	)]
	#[case(
		Command::SetTranslation { topicmap_id: 9, trans: Point::new(-120.0, 40.0) },
		"/topicmap/9/translation/-120/40"
	)]
	#[case(
		Command::SetTopicVisibility { topicmap_id: 9, topic_id: 3, visibility: false },
		"/topicmap/9/topic/3/false"
	)]
	#[case(Command::DeleteAssociation(4), "/core/association/4")]
	fn commands_route_to_resources(#[case] command: Command, #[case] path: &str) {
		let (_, routed, _) = RestClient::route(command).unwrap();
		assert_eq!(routed, path);
	}

	#[test]
	fn cluster_position_is_one_request() {
		let (_, path, body) = RestClient::route(Command::SetClusterPosition {
			topicmap_id: 9,
			positions: vec![(1, Point::new(1.0, 2.0)), (2, Point::new(3.0, 4.0))],
		})
		.unwrap();
		assert_eq!(path, "/topicmap/9");
		assert_eq!(
			body,
			Some(json!([{"topic_id": 1, "x": 1, "y": 2}, {"topic_id": 2, "x": 3, "y": 4}]))
		);
	}

	#[test]
	fn unknown_permission_is_read_only() {
		let mut cache = PermissionCache::default();
		assert!(!cache.has_write_permission(1));
		cache.insert(1, true);
		assert!(cache.has_write_permission(1));
	}
}
