//! Typed application events.

use crate::components::topicmap::{Id, Point};
use crate::selection::SelectedObject;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
	/// A topicmap was loaded and displayed.
	TopicmapDisplayed(Id),
	/// The selection changed, or the selected object's data was refreshed.
	ObjectSelected(SelectedObject),
	SelectionReset,
	ObjectRefreshed(SelectedObject),
	TopicDoubleClicked(Id),
	AssocDoubleClicked(Id),
	TopicMoved { id: Id, pos: Point },
	ClusterMoved(Vec<Id>),
	CanvasMoved(Point),
	DirectivesProcessed(usize),
}

type Listener = Box<dyn Fn(&Event)>;

/// Listeners are called in subscription order.
#[derive(Default)]
pub struct EventBus {
	listeners: Vec<Listener>,
}

impl EventBus {
	pub fn subscribe<F>(&mut self, listener: F)
	where
		F: Fn(&Event) + 'static,
	{
		self.listeners.push(Box::new(listener));
	}

	pub fn emit(&self, event: &Event) {
		for listener in &self.listeners {
			listener(event);
		}
	}
}
