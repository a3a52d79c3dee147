//! The topicmap renderer: viewmodel, interaction state machine, canvas
//! rendering with customizers, and the Leptos component around them.

mod component;
mod customizer;
mod placement;
mod render;
mod state;
pub(crate) mod surface;
mod text;
pub(crate) mod types;
mod view;
mod viewmodel;

pub use component::{TopicmapCanvas, TopicmapHandle};
pub use customizer::Modifiers;
pub use state::{Action, Cursor, TopicmapState};
pub use types::{Association, Id, Player, Point, Role, Topic, TopicmapData, TopicmapTopic, ViewProps};
pub use viewmodel::{ObjectRef, RevealKind, Topicmap, ViewTopic};
