//! The application context. Owns the displayed topicmap, the selection, the
//! event bus and the permission cache, and turns user actions into local
//! changes plus the persistence commands that confirm them.
//!
//! Local changes are applied before the command is sent. Nothing is rolled
//! back when a command fails.

use log::{debug, warn};

use crate::client::{Command, DmxObject, Outcome, PermissionCache, Permissions, TopicModel};
use crate::components::topicmap::{
	Action, Association, Cursor, Id, Modifiers, ObjectRef, Point, RevealKind, Topic, Topicmap,
	TopicmapData, TopicmapState,
};
use crate::error::{Error, Result};
use crate::events::{Event, EventBus};
use crate::selection::{HistorySink, HistoryState, HistoryUpdate, SelectedObject, Selection};

/// Work left to the caller: commands to send, cursor changes to apply.
#[derive(Clone, Debug, PartialEq)]
pub enum Task {
	Persist(Command),
	SetCursor(Cursor),
}

pub struct Webclient {
	pub(crate) state: TopicmapState,
	pub(crate) selection: Selection,
	pub(crate) events: EventBus,
	pub(crate) permissions: PermissionCache,
}

impl Webclient {
	pub fn new(state: TopicmapState, history: Box<dyn HistorySink>) -> Self {
		Self {
			state,
			selection: Selection::new(history),
			events: EventBus::default(),
			permissions: PermissionCache::default(),
		}
	}

	pub fn state(&self) -> &TopicmapState {
		&self.state
	}

	pub fn state_mut(&mut self) -> &mut TopicmapState {
		&mut self.state
	}

	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	pub fn events_mut(&mut self) -> &mut EventBus {
		&mut self.events
	}

	pub fn permissions_mut(&mut self) -> &mut PermissionCache {
		&mut self.permissions
	}

	pub fn has_write_permission(&self, id: Id) -> bool {
		self.permissions.has_write_permission(id)
	}

	fn topicmap_id(&self) -> Result<Id> {
		self.state.topicmap_id()
	}

	fn is_writable(&self) -> bool {
		self.state.topicmap().is_some_and(|tm| tm.writable)
	}

	/// Shows a fetched topicmap. `selection` restores the object named in the
	/// URL without adding a history entry.
	pub fn display_topicmap(&mut self, data: TopicmapData, writable: bool, selection: Option<ObjectRef>) {
		let topicmap = Topicmap::from_data(data, writable);
		let id = topicmap.id;
		self.permissions.insert(id, writable);
		self.selection.reset(id, HistoryUpdate::Suppress);
		self.state.display(topicmap);
		self.events.emit(&Event::TopicmapDisplayed(id));
		if let Some(object) = selection {
			if let Err(e) = self.do_select(object, HistoryUpdate::Suppress) {
				warn!("initial selection: {e}");
			}
		}
	}

	/// Carries out the actions of a gesture.
	pub fn dispatch(&mut self, actions: Vec<Action>) -> Vec<Task> {
		let mut tasks = Vec::new();
		for action in actions {
			match action {
				Action::Persist(command) => tasks.push(Task::Persist(command)),
				Action::SetCursor(cursor) => tasks.push(Task::SetCursor(cursor)),
				Action::SelectTopic(id) => self.select_or_warn(ObjectRef::Topic(id)),
				Action::SelectAssoc(id) => self.select_or_warn(ObjectRef::Assoc(id)),
				Action::ResetSelection => self.do_reset_selection(HistoryUpdate::Push),
				Action::TopicMoved { id, pos } => self.events.emit(&Event::TopicMoved { id, pos }),
				Action::ClusterMoved(ids) => self.events.emit(&Event::ClusterMoved(ids)),
				Action::CanvasMoved(trans) => self.events.emit(&Event::CanvasMoved(trans)),
			}
		}
		tasks
	}

	fn select_or_warn(&mut self, object: ObjectRef) {
		if let Err(e) = self.do_select(object, HistoryUpdate::Push) {
			warn!("select: {e}");
		}
	}

	// --- Selection ---

	pub fn do_select_topic(&mut self, id: Id, update: HistoryUpdate) -> Result<()> {
		self.do_select(ObjectRef::Topic(id), update)
	}

	pub fn do_select_assoc(&mut self, id: Id, update: HistoryUpdate) -> Result<()> {
		self.do_select(ObjectRef::Assoc(id), update)
	}

	/// Selects an object of the displayed topicmap. Re-selecting the selected
	/// object records no new history entry.
	pub fn do_select(&mut self, object: ObjectRef, update: HistoryUpdate) -> Result<()> {
		let tm = self.state.topicmap().ok_or(Error::NoTopicmap)?;
		let selected = match object {
			ObjectRef::Topic(id) => tm
				.topic(id)
				.map(|vt| SelectedObject::Topic(vt.topic.clone()))
				.ok_or(Error::TopicNotFound(id))?,
			ObjectRef::Assoc(id) => tm
				.assoc(id)
				.map(|assoc| SelectedObject::Assoc(assoc.clone()))
				.ok_or(Error::AssocNotFound(id))?,
		};
		let update = if self.selection.is_selected(object.id()) {
			HistoryUpdate::Suppress
		} else {
			update
		};
		let topicmap_id = tm.id;
		self.selection.select(selected.clone(), topicmap_id, update);
		self.state.set_selection(object);
		self.events.emit(&Event::ObjectSelected(selected));
		Ok(())
	}

	pub fn do_reset_selection(&mut self, update: HistoryUpdate) {
		let Ok(topicmap_id) = self.topicmap_id() else {
			return;
		};
		let update = if self.selection.object().is_none() {
			HistoryUpdate::Suppress
		} else {
			update
		};
		self.selection.reset(topicmap_id, update);
		self.state.reset_selection();
		self.events.emit(&Event::SelectionReset);
	}

	/// Clears the selection if `id` is selected, without a history entry.
	pub(crate) fn unselect(&mut self, id: Id) {
		if self.selection.unselect(id) {
			self.events.emit(&Event::SelectionReset);
		}
	}

	/// Restores the selection of a history entry. Returns false if the entry
	/// belongs to another topicmap, which has to be displayed first.
	pub fn pop_history(&mut self, entry: &HistoryState) -> Result<bool> {
		if self.topicmap_id().ok() != Some(entry.topicmap_id) {
			return Ok(false);
		}
		match entry.selection() {
			Some(object) => self.do_select(object, HistoryUpdate::Suppress)?,
			None => self.do_reset_selection(HistoryUpdate::Suppress),
		}
		Ok(true)
	}

	// --- Reveal ---

	pub fn reveal_topic(&mut self, topic: Topic, pos: Option<Point>, select: bool) -> Result<Vec<Task>> {
		let topicmap_id = self.topicmap_id()?;
		let topic_id = topic.id;
		let op = self.state.reveal_topic(topic, pos, false)?;
		let mut tasks = Vec::new();
		if self.is_writable() {
			match op.kind {
				RevealKind::Add => tasks.push(Task::Persist(Command::AddTopicToTopicmap {
					topicmap_id,
					topic_id,
					view_props: op.view_props.unwrap_or_default(),
				})),
				RevealKind::Show => tasks.push(Task::Persist(Command::SetTopicVisibility {
					topicmap_id,
					topic_id,
					visibility: true,
				})),
				RevealKind::None => debug!("topic {topic_id} is already revealed"),
			}
		}
		if select {
			self.do_select_topic(topic_id, HistoryUpdate::Push)?;
			self.state.scroll_topic_to_center(topic_id)?;
		}
		Ok(tasks)
	}

	pub fn reveal_assoc(&mut self, assoc: Association, select: bool) -> Result<Vec<Task>> {
		let topicmap_id = self.topicmap_id()?;
		let assoc_id = assoc.id;
		let kind = self.state.reveal_assoc(assoc, false)?;
		let mut tasks = Vec::new();
		if kind == RevealKind::Add && self.is_writable() {
			tasks.push(Task::Persist(Command::AddAssocToTopicmap { topicmap_id, assoc_id }));
		}
		if select {
			self.do_select_assoc(assoc_id, HistoryUpdate::Push)?;
		}
		Ok(tasks)
	}

	/// Reveals topics one grid cell after the other, below the topics already
	/// on the map. The first cell is scrolled into view.
	pub fn reveal_topics_in_grid(&mut self, topics: Vec<Topic>) -> Result<Vec<Task>> {
		self.state.start_grid_positioning()?;
		let mut tasks = Vec::new();
		let mut result = Ok(());
		for topic in topics {
			match self.reveal_topic(topic, None, false) {
				Ok(more) => tasks.extend(more),
				Err(e) => {
					result = Err(e);
					break;
				}
			}
		}
		self.state.stop_grid_positioning();
		result.map(|()| tasks)
	}

	/// Reveals a topic together with the association that relates it to a
	/// topic already on the map. Persisted as one command.
	pub fn reveal_related_topic(
		&mut self,
		topic: Topic,
		assoc: Association,
		select: bool,
	) -> Result<Vec<Task>> {
		let topicmap_id = self.topicmap_id()?;
		let (topic_id, assoc_id) = (topic.id, assoc.id);
		let op = self.state.reveal_topic(topic, None, false)?;
		let assoc_kind = self.state.reveal_assoc(assoc, false)?;
		let mut tasks = Vec::new();
		let changed = op.kind != RevealKind::None || assoc_kind != RevealKind::None;
		if changed && self.is_writable() {
			tasks.push(Task::Persist(Command::AddRelatedTopicToTopicmap {
				topicmap_id,
				topic_id,
				assoc_id,
				view_props: op.view_props.unwrap_or_default(),
			}));
		}
		if select {
			self.do_select_topic(topic_id, HistoryUpdate::Push)?;
			self.state.scroll_topic_to_center(topic_id)?;
		}
		Ok(tasks)
	}

	// --- Hide / delete ---

	pub fn hide_topic(&mut self, id: Id) -> Result<Vec<Task>> {
		let topicmap_id = self.topicmap_id()?;
		let removed = self.state.hide_topic(id)?;
		self.reset_if_selected(removed.into_iter().chain([id]));
		Ok(self.persist_if_writable(Command::SetTopicVisibility {
			topicmap_id,
			topic_id: id,
			visibility: false,
		}))
	}

	pub fn hide_assoc(&mut self, id: Id) -> Result<Vec<Task>> {
		let topicmap_id = self.topicmap_id()?;
		if self.state.topicmap().is_some_and(|tm| tm.assoc(id).is_none()) {
			return Err(Error::AssocNotFound(id));
		}
		let removed = self.state.remove_assoc(id)?;
		self.reset_if_selected(removed);
		Ok(self.persist_if_writable(Command::RemoveAssocFromTopicmap {
			topicmap_id,
			assoc_id: id,
		}))
	}

	pub fn delete_topic(&mut self, id: Id) -> Result<Vec<Task>> {
		self.check_write_permission(id)?;
		if self.state.topicmap().is_some_and(|tm| tm.topic(id).is_some()) {
			let removed = self.state.remove_topic(id)?;
			self.reset_if_selected(removed.into_iter().chain([id]));
		}
		Ok(vec![Task::Persist(Command::DeleteTopic(id))])
	}

	pub fn delete_assoc(&mut self, id: Id) -> Result<Vec<Task>> {
		self.check_write_permission(id)?;
		if self.state.topicmap().is_some_and(|tm| tm.assoc(id).is_some()) {
			let removed = self.state.remove_assoc(id)?;
			self.reset_if_selected(removed);
		}
		Ok(vec![Task::Persist(Command::DeleteAssociation(id))])
	}

	fn reset_if_selected(&mut self, ids: impl IntoIterator<Item = Id>) {
		let selected = self.selection.object().map(SelectedObject::id);
		if ids.into_iter().any(|id| Some(id) == selected) {
			self.do_reset_selection(HistoryUpdate::Push);
		}
	}

	fn persist_if_writable(&self, command: Command) -> Vec<Task> {
		if self.is_writable() {
			vec![Task::Persist(command)]
		} else {
			Vec::new()
		}
	}

	fn check_write_permission(&self, id: Id) -> Result<()> {
		if self.permissions.has_write_permission(id) {
			Ok(())
		} else {
			Err(Error::PermissionDenied(id))
		}
	}

	// --- Create / update ---

	/// The topic is revealed at `pos` once the server has created it.
	pub fn create_topic(&self, type_uri: impl Into<String>, pos: Point) -> Vec<Task> {
		vec![Task::Persist(Command::CreateTopic {
			model: TopicModel {
				type_uri: type_uri.into(),
				value: String::new(),
			},
			pos: Some(pos),
		})]
	}

	pub fn update_topic(&mut self, topic: Topic) -> Result<Vec<Task>> {
		self.check_write_permission(topic.id)?;
		self.state.update_topic(&topic);
		if self.selection.refresh(SelectedObject::Topic(topic.clone())) {
			self.events.emit(&Event::ObjectRefreshed(SelectedObject::Topic(topic.clone())));
		}
		Ok(vec![Task::Persist(Command::UpdateTopic(topic))])
	}

	pub fn update_assoc(&mut self, assoc: Association) -> Result<Vec<Task>> {
		self.check_write_permission(assoc.id)?;
		self.state.update_assoc(&assoc);
		if self.selection.refresh(SelectedObject::Assoc(assoc.clone())) {
			self.events.emit(&Event::ObjectRefreshed(SelectedObject::Assoc(assoc.clone())));
		}
		Ok(vec![Task::Persist(Command::UpdateAssociation(assoc))])
	}

	// --- Pointer input, in canvas coordinates ---

	pub fn pointer_down(&mut self, canvas: Point, button: i16, modifiers: Modifiers) -> Vec<Task> {
		let actions = self.state.pointer_down(canvas, button, modifiers);
		self.dispatch(actions)
	}

	pub fn pointer_move(&mut self, canvas: Point) -> Vec<Task> {
		let actions = self.state.pointer_move(canvas);
		self.dispatch(actions)
	}

	pub fn pointer_up(&mut self, canvas: Point) -> Vec<Task> {
		let actions = self.state.pointer_up(canvas);
		self.dispatch(actions)
	}

	pub fn pointer_leave(&mut self, over_topic: bool) -> Vec<Task> {
		let actions = self.state.pointer_leave(over_topic);
		self.dispatch(actions)
	}

	/// Starts drawing an association from a topic, e.g. from the context menu.
	pub fn begin_association(&mut self, topic_id: Id, canvas: Point) -> Vec<Task> {
		let actions = self.state.begin_association(topic_id, canvas);
		self.dispatch(actions)
	}

	/// Emits the double click event for the object under the pointer.
	pub fn double_click(&mut self, canvas: Point) {
		match self.state.object_at(canvas) {
			Some(ObjectRef::Topic(id)) => self.events.emit(&Event::TopicDoubleClicked(id)),
			Some(ObjectRef::Assoc(id)) => self.events.emit(&Event::AssocDoubleClicked(id)),
			None => {}
		}
	}

	// --- Responses ---

	/// Applies the server's answer to a command: reveals created objects and
	/// processes the directives.
	pub fn on_response(&mut self, command: &Command, outcome: Outcome) -> Result<Vec<Task>> {
		let Outcome { object, directives } = outcome;
		let tasks = match (command, object) {
			(Command::CreateTopic { pos, .. }, Some(DmxObject::Topic(topic))) => {
				self.reveal_topic(topic, *pos, true)?
			}
			(Command::CreateAssociation(_), Some(DmxObject::Assoc(assoc))) => {
				self.reveal_assoc(assoc, true)?
			}
			_ => Vec::new(),
		};
		self.process_directives(&directives)?;
		Ok(tasks)
	}

	/// Per-frame work: scroll animation and icon repaint.
	pub fn tick(&mut self) -> Vec<Task> {
		let actions = self.state.tick();
		self.dispatch(actions)
	}
}


#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::testing::*;
	use super::*;
	use crate::components::topicmap::types::PROP_X;

	fn persisted(tasks: &[Task]) -> Vec<&Command> {
		tasks
			.iter()
			.filter_map(|t| match t {
				Task::Persist(cmd) => Some(cmd),
				Task::SetCursor(_) => None,
			})
			.collect()
	}

	#[test]
	fn reveal_topic_persists_add_then_nothing_then_show() {
		let mut wc = webclient_with(&[], &[]);
		let tasks = wc.reveal_topic(topic(5), Some(Point::new(40.0, 60.0)), false).unwrap();
		match persisted(&tasks).as_slice() {
			[Command::AddTopicToTopicmap {
				topicmap_id: 1,
				topic_id: 5,
				view_props,
			}] => assert_eq!(view_props[PROP_X], json!(40.0)),
			other => panic!("unexpected commands {other:?}"),
		}
		assert!(wc.reveal_topic(topic(5), None, false).unwrap().is_empty());

		wc.hide_topic(5).unwrap();
		let tasks = wc.reveal_topic(topic(5), None, false).unwrap();
		assert_eq!(
			persisted(&tasks),
			vec![&Command::SetTopicVisibility {
				topicmap_id: 1,
				topic_id: 5,
				visibility: true,
			}]
		);
		assert_eq!(wc.state().topicmap().unwrap().topic(5).unwrap().pos, Point::new(40.0, 60.0));
	}

	#[test]
	fn grid_reveal_lines_topics_up_below_the_map() {
		let mut wc = webclient_with(&[(1, 100.0, 700.0)], &[]);
		let tasks = wc.reveal_topics_in_grid(vec![topic(5), topic(6)]).unwrap();
		assert_eq!(persisted(&tasks).len(), 2);

		let tm = wc.state().topicmap().unwrap();
		let (p5, p6) = (tm.topic(5).unwrap().pos, tm.topic(6).unwrap().pos);
		assert_eq!((p5.y, p6.y), (780.0, 780.0));
		assert!(p6.x > p5.x);
		// the row lies below the canvas, so it is scrolled into view
		assert!(wc.state().is_animating());

		// back to free placement afterwards
		wc.reveal_topic(topic(7), None, false).unwrap();
		assert_ne!(wc.state().topicmap().unwrap().topic(7).unwrap().pos.y, 780.0);
	}

	#[test]
	fn read_only_topicmap_reveals_locally_only() {
		let mut wc = webclient_with(&[], &[]);
		wc.state_mut().set_writable(false);
		assert!(wc.reveal_topic(topic(5), None, true).unwrap().is_empty());
		assert!(wc.state().view().has_topic(5));
		assert!(wc.selection().is_selected(5));
	}

	#[test]
	fn reveal_related_topic_is_one_command() {
		let mut wc = webclient_with(&[(1, 100.0, 100.0)], &[]);
		let tasks = wc.reveal_related_topic(topic(2), assoc(10, 1, 2), true).unwrap();
		let commands = persisted(&tasks);
		assert_eq!(commands.len(), 1);
		assert!(matches!(
			commands[0],
			Command::AddRelatedTopicToTopicmap {
				topicmap_id: 1,
				topic_id: 2,
				assoc_id: 10,
				..
			}
		));
		assert!(wc.state().topicmap().unwrap().assoc(10).is_some());
		assert!(wc.selection().is_selected(2));
	}

	#[test]
	fn clicking_pushes_history_once() {
		let (mut wc, history, _) = recorded_webclient(&[(1, 100.0, 100.0)], &[]);
		for _ in 0..2 {
			wc.pointer_down(Point::new(100.0, 100.0), 0, Modifiers::default());
			wc.pointer_up(Point::new(100.0, 100.0));
		}
		let urls: Vec<String> = history.borrow().iter().map(HistoryState::url).collect();
		assert_eq!(urls, vec!["/topicmap/1/topic/1"]);
		assert_eq!(wc.state().topicmap().unwrap().selection(), Some(ObjectRef::Topic(1)));
	}

	#[test]
	fn drag_through_dispatch_persists_and_emits() {
		let (mut wc, _, events) = recorded_webclient(&[(1, 100.0, 100.0)], &[]);
		let mut tasks = wc.pointer_down(Point::new(100.0, 100.0), 0, Modifiers::default());
		tasks.extend(wc.pointer_move(Point::new(110.0, 95.0)));
		tasks.extend(wc.pointer_up(Point::new(110.0, 95.0)));

		assert_eq!(
			tasks,
			vec![
				Task::SetCursor(Cursor::Moving),
				Task::SetCursor(Cursor::Default),
				Task::Persist(Command::SetTopicPosition {
					topicmap_id: 1,
					topic_id: 1,
					pos: Point::new(110.0, 95.0),
				}),
			]
		);
		assert!(events.borrow().contains(&Event::TopicMoved {
			id: 1,
			pos: Point::new(110.0, 95.0)
		}));
	}

	#[test]
	fn hiding_the_selected_topic_resets_selection() {
		let (mut wc, history, _) = recorded_webclient(&[(1, 100.0, 100.0), (2, 300.0, 100.0)], &[(10, 1, 2)]);
		wc.do_select_topic(1, HistoryUpdate::Push).unwrap();
		let tasks = wc.hide_topic(1).unwrap();
		assert_eq!(
			persisted(&tasks),
			vec![&Command::SetTopicVisibility {
				topicmap_id: 1,
				topic_id: 1,
				visibility: false,
			}]
		);
		assert!(wc.selection().object().is_none());
		let urls: Vec<String> = history.borrow().iter().map(HistoryState::url).collect();
		assert_eq!(urls, vec!["/topicmap/1/topic/1", "/topicmap/1"]);
	}

	#[test]
	fn hide_assoc_removes_it_from_the_topicmap() {
		let mut wc = webclient_with(&[(1, 100.0, 100.0), (2, 300.0, 100.0)], &[(10, 1, 2)]);
		let tasks = wc.hide_assoc(10).unwrap();
		assert_eq!(
			persisted(&tasks),
			vec![&Command::RemoveAssocFromTopicmap {
				topicmap_id: 1,
				assoc_id: 10,
			}]
		);
		assert!(matches!(wc.hide_assoc(10), Err(Error::AssocNotFound(10))));
	}

	#[test]
	fn delete_needs_write_permission() {
		let mut wc = webclient_with(&[(5, 100.0, 100.0)], &[]);
		assert!(matches!(wc.delete_topic(5), Err(Error::PermissionDenied(5))));
		assert!(wc.state().view().has_topic(5));

		wc.permissions_mut().insert(5, true);
		let tasks = wc.delete_topic(5).unwrap();
		assert_eq!(persisted(&tasks), vec![&Command::DeleteTopic(5)]);
		assert!(wc.state().topicmap().unwrap().topic(5).is_none());
	}

	#[test]
	fn update_refreshes_selection_and_persists() {
		let (mut wc, _, events) = recorded_webclient(&[(1, 100.0, 100.0)], &[]);
		wc.permissions_mut().insert(1, true);
		wc.do_select_topic(1, HistoryUpdate::Push).unwrap();
		let renamed = Topic::new(1, "dm4.notes.note", "Renamed");
		let tasks = wc.update_topic(renamed.clone()).unwrap();
		assert_eq!(persisted(&tasks), vec![&Command::UpdateTopic(renamed.clone())]);
		assert_eq!(wc.state().view().topic(1).unwrap().label, "Renamed");
		assert!(events
			.borrow()
			.contains(&Event::ObjectRefreshed(SelectedObject::Topic(renamed))));
	}

	#[test]
	fn created_topic_is_revealed_and_selected() {
		let mut wc = webclient_with(&[], &[]);
		let tasks = wc.create_topic("dm4.notes.note", Point::new(70.0, 80.0));
		let [Task::Persist(command)] = tasks.as_slice() else {
			panic!("expected one command");
		};
		let outcome = Outcome::from_response(json!({
			"id": 42, "type_uri": "dm4.notes.note", "value": "",
			"directives": [{"type": "UPDATE_TOPIC", "arg": {"id": 42, "type_uri": "dm4.notes.note", "value": ""}}]
		}))
		.unwrap();
		let tasks = wc.on_response(command, outcome).unwrap();
		assert!(matches!(
			persisted(&tasks).as_slice(),
			[Command::AddTopicToTopicmap { topic_id: 42, .. }]
		));
		assert_eq!(wc.state().topicmap().unwrap().topic(42).unwrap().pos, Point::new(70.0, 80.0));
		assert!(wc.selection().is_selected(42));
	}

	#[test]
	fn created_association_is_revealed_and_selected() {
		let mut wc = webclient_with(&[(1, 100.0, 100.0), (2, 300.0, 100.0)], &[]);
		wc.begin_association(1, Point::new(100.0, 100.0));
		let tasks = wc.pointer_up(Point::new(300.0, 100.0));
		let Some(Task::Persist(command)) = tasks.iter().find(|t| matches!(t, Task::Persist(_))) else {
			panic!("expected a create command");
		};
		let outcome = Outcome {
			object: Some(DmxObject::Assoc(assoc(10, 1, 2))),
			directives: Vec::new(),
		};
		let tasks = wc.on_response(command, outcome).unwrap();
		assert_eq!(
			persisted(&tasks),
			vec![&Command::AddAssocToTopicmap {
				topicmap_id: 1,
				assoc_id: 10,
			}]
		);
		assert!(wc.selection().is_selected(10));
	}

	#[test]
	fn pop_history_reselects_without_pushing() {
		let (mut wc, history, _) = recorded_webclient(&[(1, 100.0, 100.0), (2, 300.0, 100.0)], &[(10, 1, 2)]);
		wc.do_select_topic(1, HistoryUpdate::Push).unwrap();
		wc.do_select_assoc(10, HistoryUpdate::Push).unwrap();
		let entries = history.borrow().clone();

		assert!(wc.pop_history(&entries[0]).unwrap());
		assert!(wc.selection().is_selected(1));
		assert_eq!(wc.state().topicmap().unwrap().selection(), Some(ObjectRef::Topic(1)));
		assert!(wc.pop_history(&HistoryState::new(1, None)).unwrap());
		assert!(wc.selection().object().is_none());
		assert_eq!(history.borrow().len(), entries.len());

		assert!(!wc.pop_history(&HistoryState::new(2, None)).unwrap());
	}

	#[test]
	fn double_click_names_the_object() {
		let (mut wc, _, events) = recorded_webclient(&[(1, 100.0, 100.0), (2, 300.0, 100.0)], &[(10, 1, 2)]);
		wc.double_click(Point::new(100.0, 100.0));
		wc.double_click(Point::new(200.0, 100.0));
		wc.double_click(Point::new(200.0, 400.0));
		let clicks: Vec<Event> = events
			.borrow()
			.iter()
			.filter(|e| matches!(e, Event::TopicDoubleClicked(_) | Event::AssocDoubleClicked(_)))
			.cloned()
			.collect();
		assert_eq!(clicks, vec![Event::TopicDoubleClicked(1), Event::AssocDoubleClicked(10)]);
	}
}
