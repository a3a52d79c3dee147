//! Error types for the topicmap client.

use thiserror::Error;

use crate::components::topicmap::{Id, Player};

/// Errors raised by the viewmodel, the directive processor and the persistence boundary.
#[derive(Error, Debug)]
pub enum Error {
	/// The server sent a directive type this client does not know.
	#[error("\"{0}\" is an unsupported directive")]
	UnsupportedDirective(String),

	/// An operation needs a displayed topicmap but none is loaded yet.
	#[error("no topicmap is displayed")]
	NoTopicmap,

	/// The topic is not part of the displayed topicmap.
	#[error("topic {0} is not on the displayed topicmap")]
	TopicNotFound(Id),

	/// The association is not part of the displayed topicmap.
	#[error("association {0} is not on the displayed topicmap")]
	AssocNotFound(Id),

	/// An association refers to a player that is not on the topicmap.
	#[error("association {assoc} refers to {player:?} which is not on the displayed topicmap")]
	DanglingAssociation { assoc: Id, player: Player },

	/// The current user may not modify the object.
	#[error("no write permission for object {0}")]
	PermissionDenied(Id),

	/// A drop carried none of the supported data types.
	#[error("unsupported drop: {0}")]
	UnsupportedDrop(String),

	/// A drop carried a supported data type but unusable content.
	#[error("malformed drop payload: {0}")]
	MalformedDrop(String),

	/// A persistence request failed.
	#[error("request failed: {0}")]
	Request(String),

	/// JSON (de)serialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Invalid client settings.
	#[error("invalid settings: {0}")]
	Settings(String),
}

impl From<reqwest::Error> for Error {
	fn from(e: reqwest::Error) -> Self {
		Error::Request(e.to_string())
	}
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
