use serde::{Deserialize, Serialize};
use time::Time;

use crate::{
	chunk::{Chunk, ChunkHash},
	conditions::history::{ActivationHistory, ActivationRecord},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub text: String,
	pub speaker: String,
	#[serde(default)]
	pub is_user: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationType {
	#[default]
	Normal,
	Swipe,
	Regenerate,
	Continue,
	Impersonate,
	Quiet,
}
impl GenerationType {
	pub const ALL: [Self; 6] =
		[Self::Normal, Self::Swipe, Self::Regenerate, Self::Continue, Self::Impersonate, Self::Quiet];

	pub fn parse(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|kind| kind.as_str().eq_ignore_ascii_case(raw.trim()))
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Normal => "normal",
			Self::Swipe => "swipe",
			Self::Regenerate => "regenerate",
			Self::Continue => "continue",
			Self::Impersonate => "impersonate",
			Self::Quiet => "quiet",
		}
	}
}

/// Conversation snapshot shared by every candidate of one query. `messages` is ordered oldest
/// first and already bounded by the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchContext {
	#[serde(default)]
	pub messages: Vec<ChatMessage>,
	#[serde(default)]
	pub message_count: u32,
	#[serde(default)]
	pub last_speaker: Option<String>,
	#[serde(default)]
	pub generation_type: GenerationType,
	#[serde(default)]
	pub swipe_count: u32,
	#[serde(default)]
	pub active_lorebook_entries: Vec<String>,
	#[serde(default)]
	pub is_group_chat: bool,
	#[serde(default)]
	pub current_character: Option<String>,
	#[serde(with = "crate::conditions::time_serde", default = "midnight")]
	pub time_of_day: Time,
}
impl SearchContext {
	/// Keeps only the newest `window` messages.
	pub fn bounded(mut self, window: usize) -> Self {
		if self.messages.len() > window {
			let excess = self.messages.len() - window;

			self.messages.drain(..excess);
		}

		self
	}

	/// Newest-first view of at most `depth` recent messages.
	pub fn recent(&self, depth: usize) -> impl Iterator<Item = &ChatMessage> {
		self.messages.iter().rev().take(depth)
	}
}
impl Default for SearchContext {
	fn default() -> Self {
		Self {
			messages: Vec::new(),
			message_count: 0,
			last_speaker: None,
			generation_type: GenerationType::Normal,
			swipe_count: 0,
			active_lorebook_entries: Vec::new(),
			is_group_chat: false,
			current_character: None,
			time_of_day: Time::MIDNIGHT,
		}
	}
}

/// Per-candidate view of the snapshot.
#[derive(Clone, Copy, Debug)]
pub struct EvaluationContext<'a> {
	pub search: &'a SearchContext,
	pub score: f32,
	pub chunk_message_index: Option<u32>,
	pub chunk_hash: Option<ChunkHash>,
	pub activation: Option<ActivationRecord>,
}
impl<'a> EvaluationContext<'a> {
	/// Context for collection-level rules, which have no candidate chunk.
	pub fn collection(search: &'a SearchContext) -> Self {
		Self { search, score: 0.0, chunk_message_index: None, chunk_hash: None, activation: None }
	}

	pub fn for_chunk(search: &'a SearchContext, chunk: &Chunk, history: &ActivationHistory) -> Self {
		Self {
			search,
			score: chunk.score,
			chunk_message_index: chunk.message_index(),
			chunk_hash: Some(chunk.hash()),
			activation: history.get(chunk.hash()),
		}
	}
}

fn midnight() -> Time {
	Time::MIDNIGHT
}
