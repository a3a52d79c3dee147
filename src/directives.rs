//! Server directives: graph changes every client applies to its displayed
//! topicmap, in the order received.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::components::topicmap::{Association, Id, Topic};
use crate::error::{Error, Result};
use crate::events::Event;
use crate::selection::SelectedObject;
use crate::webclient::Webclient;

/// A directive as it comes over the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDirective {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub arg: Value,
}

#[derive(Deserialize)]
struct IdArg {
	id: Id,
}

#[derive(Deserialize)]
struct UriArg {
	uri: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
	UpdateTopic(Topic),
	DeleteTopic(Id),
	UpdateAssoc(Association),
	DeleteAssoc(Id),
	UpdateTopicType(Value),
	DeleteTopicType(String),
	UpdateAssocType(Value),
	DeleteAssocType(String),
}

impl Directive {
	pub fn parse(raw: &RawDirective) -> Result<Self> {
		let arg = || raw.arg.clone();
		Ok(match raw.kind.as_str() {
			"UPDATE_TOPIC" => Directive::UpdateTopic(serde_json::from_value(arg())?),
			"DELETE_TOPIC" => Directive::DeleteTopic(serde_json::from_value::<IdArg>(arg())?.id),
			"UPDATE_ASSOCIATION" => Directive::UpdateAssoc(serde_json::from_value(arg())?),
			"DELETE_ASSOCIATION" => {
				Directive::DeleteAssoc(serde_json::from_value::<IdArg>(arg())?.id)
			}
			"UPDATE_TOPIC_TYPE" => Directive::UpdateTopicType(arg()),
			"DELETE_TOPIC_TYPE" => {
				Directive::DeleteTopicType(serde_json::from_value::<UriArg>(arg())?.uri)
			}
			"UPDATE_ASSOCIATION_TYPE" => Directive::UpdateAssocType(arg()),
			"DELETE_ASSOCIATION_TYPE" => {
				Directive::DeleteAssocType(serde_json::from_value::<UriArg>(arg())?.uri)
			}
			other => return Err(Error::UnsupportedDirective(other.to_string())),
		})
	}
}

impl Webclient {
	/// Applies directives one after the other. Stops at the first directive
	/// that cannot be parsed; the ones before it stay applied.
	pub fn process_directives(&mut self, directives: &[RawDirective]) -> Result<()> {
		info!("processing {} directives", directives.len());
		for raw in directives {
			let directive = Directive::parse(raw)?;
			self.apply_directive(directive)?;
		}
		self.events.emit(&Event::DirectivesProcessed(directives.len()));
		Ok(())
	}

	fn apply_directive(&mut self, directive: Directive) -> Result<()> {
		match directive {
			Directive::UpdateTopic(topic) => {
				if !self.state.update_topic(&topic) {
					debug!("UPDATE_TOPIC {}: not on the displayed topicmap", topic.id);
				}
				self.refresh_selection(SelectedObject::Topic(topic));
			}
			Directive::UpdateAssoc(assoc) => {
				if !self.state.update_assoc(&assoc) {
					debug!("UPDATE_ASSOCIATION {}: not on the displayed topicmap", assoc.id);
				}
				self.refresh_selection(SelectedObject::Assoc(assoc));
			}
			Directive::DeleteTopic(id) => {
				let on_map = self.state.topicmap().is_some_and(|tm| tm.topic(id).is_some());
				if on_map {
					let removed = self.state.remove_topic(id)?;
					for id in removed.into_iter().chain([id]) {
						self.unselect(id);
					}
				} else {
					debug!("DELETE_TOPIC {id}: not on the displayed topicmap");
				}
				self.permissions.remove(id);
			}
			Directive::DeleteAssoc(id) => {
				let on_map = self.state.topicmap().is_some_and(|tm| tm.assoc(id).is_some());
				if on_map {
					let removed = self.state.remove_assoc(id)?;
					for id in removed {
						self.unselect(id);
					}
				} else {
					debug!("DELETE_ASSOCIATION {id}: not on the displayed topicmap");
				}
				self.permissions.remove(id);
			}
			Directive::UpdateTopicType(_) => warn!("directive UPDATE_TOPIC_TYPE not yet implemented"),
			Directive::DeleteTopicType(uri) => {
				warn!("directive DELETE_TOPIC_TYPE ({uri}) not yet implemented")
			}
			Directive::UpdateAssocType(_) => {
				warn!("directive UPDATE_ASSOCIATION_TYPE not yet implemented")
			}
			Directive::DeleteAssocType(uri) => {
				warn!("directive DELETE_ASSOCIATION_TYPE ({uri}) not yet implemented")
			}
		}
		Ok(())
	}

	/// Data refresh of the selected object. Never records history.
	fn refresh_selection(&mut self, object: SelectedObject) {
		if self.selection.refresh(object.clone()) {
			self.events.emit(&Event::ObjectRefreshed(object));
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use rstest::rstest;
	use serde_json::json;

	use super::*;
	use crate::components::topicmap::{ObjectRef, Role};
	use crate::webclient::testing::{recorded_webclient, webclient_with};
	use crate::selection::HistoryUpdate;

	fn raw(value: Value) -> Vec<RawDirective> {
		serde_json::from_value(value).unwrap()
	}

	#[rstest]
	#[case("UPDATE_TOPIC_TYPE", json!({"uri": "dm4.notes.note"}))]
	#[case("DELETE_TOPIC_TYPE", json!({"uri": "dm4.notes.note"}))]
	#[case("UPDATE_ASSOCIATION_TYPE", json!({"uri": "dm4.core.composition"}))]
	#[case("DELETE_ASSOCIATION_TYPE", json!({"uri": "dm4.core.composition"}))]
	fn type_directives_parse(#[case] kind: &str, #[case] arg: Value) {
		let raw = RawDirective {
			kind: kind.into(),
			arg,
		};
		assert!(Directive::parse(&raw).is_ok());
	}

	#[test]
	fn unknown_directive_is_an_error() {
		let mut wc = webclient_with(&[(1, 0.0, 0.0)], &[]);
		let directives = raw(json!([
			{"type": "UPDATE_TOPIC", "arg": {"id": 1, "type_uri": "dm4.notes.note", "value": "first"}},
			{"type": "RENAME_TOPIC", "arg": {"id": 1}},
			{"type": "DELETE_TOPIC", "arg": {"id": 1}}
		]));
		let err = wc.process_directives(&directives).unwrap_err();
		assert!(matches!(err, Error::UnsupportedDirective(ref t) if t == "RENAME_TOPIC"));
		// applied up to the unknown one, nothing after it
		let tm = wc.state().topicmap().unwrap();
		assert_eq!(tm.topic(1).unwrap().topic.label(), "first");
	}

	#[test]
	fn update_topic_twice_equals_once() {
		let mut wc = webclient_with(&[(1, 0.0, 0.0), (2, 100.0, 0.0)], &[(10, 1, 2)]);
		let update = raw(json!([
			{"type": "UPDATE_TOPIC", "arg": {"id": 1, "type_uri": "dm4.notes.note", "value": "Renamed"}}
		]));
		wc.process_directives(&update).unwrap();
		let once = wc.state().topicmap().unwrap().topic(1).cloned();
		wc.process_directives(&update).unwrap();
		let tm = wc.state().topicmap().unwrap();
		assert_eq!(tm.topic(1).cloned(), once);
		assert_eq!(tm.topic_count(), 2);
		assert_eq!(tm.assoc_count(), 1);
		assert_eq!(wc.state().view().topic(1).unwrap().label, "Renamed");
	}

	#[test]
	fn update_of_absent_object_is_a_noop() {
		let mut wc = webclient_with(&[(1, 0.0, 0.0)], &[]);
		let directives = raw(json!([
			{"type": "UPDATE_TOPIC", "arg": {"id": 99, "type_uri": "dm4.notes.note", "value": "x"}},
			{"type": "DELETE_ASSOCIATION", "arg": {"id": 98}}
		]));
		wc.process_directives(&directives).unwrap();
		let tm = wc.state().topicmap().unwrap();
		assert!(tm.topic(99).is_none());
		assert_eq!(tm.topic_count(), 1);
	}

	#[test]
	fn deleting_the_selected_topic_clears_selection_without_history() {
		let (mut wc, history, events) = recorded_webclient(&[(1, 0.0, 0.0), (2, 100.0, 0.0)], &[(10, 1, 2)]);
		wc.do_select_topic(1, HistoryUpdate::Push).unwrap();
		let pushed = history.borrow().len();

		wc.process_directives(&raw(json!([{"type": "DELETE_TOPIC", "arg": {"id": 1}}])))
			.unwrap();

		let tm = wc.state().topicmap().unwrap();
		assert!(tm.topic(1).is_none());
		assert!(tm.assoc(10).is_none());
		assert_eq!(tm.selection(), None);
		assert!(wc.selection().object().is_none());
		assert_eq!(history.borrow().len(), pushed);
		assert!(events.borrow().contains(&Event::SelectionReset));
		assert_eq!(events.borrow().last(), Some(&Event::DirectivesProcessed(1)));
	}

	#[test]
	fn update_of_selected_assoc_refreshes_without_history() {
		let (mut wc, history, events) = recorded_webclient(&[(1, 0.0, 0.0), (2, 100.0, 0.0)], &[(10, 1, 2)]);
		wc.do_select_assoc(10, HistoryUpdate::Push).unwrap();
		let pushed = history.borrow().len();

		let mut assoc = Association::new(
			10,
			"dm4.core.association",
			Role::topic(1, "dm4.core.default"),
			Role::topic(2, "dm4.core.default"),
		);
		assoc.value = "knows".into();
		let directives = vec![RawDirective {
			kind: "UPDATE_ASSOCIATION".into(),
			arg: serde_json::to_value(&assoc).unwrap(),
		}];
		wc.process_directives(&directives).unwrap();

		assert_eq!(wc.selection().object().map(SelectedObject::label).as_deref(), Some("knows"));
		assert_eq!(wc.state().topicmap().unwrap().selection(), Some(ObjectRef::Assoc(10)));
		assert_eq!(history.borrow().len(), pushed);
		assert!(events
			.borrow()
			.contains(&Event::ObjectRefreshed(SelectedObject::Assoc(assoc))));
	}

	#[test]
	fn deleting_an_assoc_cascades_to_assocs_on_it() {
		let mut wc = webclient_with(&[(1, 0.0, 0.0), (2, 100.0, 0.0), (3, 50.0, 100.0)], &[(10, 1, 2)]);
		let on_assoc = Association::new(
			11,
			"dm4.core.association",
			Role::assoc(10, "dm4.core.default"),
			Role::topic(3, "dm4.core.default"),
		);
		wc.state_mut().add_assoc(on_assoc).unwrap();
		wc.process_directives(&raw(json!([{"type": "DELETE_ASSOCIATION", "arg": {"id": 10}}])))
			.unwrap();
		let tm = wc.state().topicmap().unwrap();
		assert_eq!(tm.assoc_count(), 0);
		assert_eq!(tm.topic_count(), 3);
	}

	#[test]
	fn processed_event_reports_batch_size() {
		let seen = Rc::new(RefCell::new(Vec::new()));
		let mut wc = webclient_with(&[], &[]);
		let sink = seen.clone();
		wc.events_mut().subscribe(move |e| sink.borrow_mut().push(e.clone()));
		wc.process_directives(&[]).unwrap();
		assert_eq!(*seen.borrow(), vec![Event::DirectivesProcessed(0)]);
	}
}
