use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

use crate::conditions::ConditionSet;

pub const MIN_KEYWORD_WEIGHT: f32 = 1.0;
pub const MAX_KEYWORD_WEIGHT: f32 = 3.0;

pub type ChunkHash = u64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
	pub text: String,
	pub weight: f32,
}
impl Keyword {
	pub fn new(text: impl Into<String>, weight: f32) -> Self {
		Self { text: text.into(), weight: clamp_weight(weight) }
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
	Hard,
	Soft,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLink {
	pub target: ChunkHash,
	pub kind: LinkKind,
}

/// A retrievable unit of text. `hash` and `text` are fixed at construction; changing the text
/// means building a new chunk and re-embedding it.
#[derive(Clone, Debug, Serialize)]
pub struct Chunk {
	hash: ChunkHash,
	text: String,
	pub score: f32,
	pub keywords: Vec<Keyword>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub conditions: Option<ConditionSet>,
	pub links: Vec<ChunkLink>,
	pub metadata: Map<String, Value>,
}
impl Chunk {
	pub fn new(text: impl Into<String>) -> Self {
		let text = text.into();

		Self::from_stored(chunk_hash(&text), text)
	}

	/// Rebuilds a chunk read back from a store, trusting the stored hash.
	pub fn from_stored(hash: ChunkHash, text: String) -> Self {
		Self {
			hash,
			text,
			score: 0.0,
			keywords: Vec::new(),
			conditions: None,
			links: Vec::new(),
			metadata: Map::new(),
		}
	}

	pub fn hash(&self) -> ChunkHash {
		self.hash
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn with_keywords(mut self, keywords: Vec<Keyword>) -> Self {
		self.keywords = dedup_keywords(keywords);

		self
	}

	pub fn with_links(mut self, links: Vec<ChunkLink>) -> Self {
		self.links = links;

		self
	}

	pub fn with_conditions(mut self, conditions: ConditionSet) -> Self {
		self.conditions = Some(conditions);

		self
	}

	/// Index of the chat message this chunk was cut from, when known.
	pub fn message_index(&self) -> Option<u32> {
		self.metadata
			.get("message_index")
			.and_then(Value::as_u64)
			.and_then(|index| u32::try_from(index).ok())
	}

	pub fn apply_patch(&mut self, patch: ChunkPatch) {
		if let Some(keywords) = patch.keywords {
			self.keywords = dedup_keywords(keywords);
		}
		if let Some(conditions) = patch.conditions {
			self.conditions = conditions;
		}
		if let Some(links) = patch.links {
			self.links = links;
		}
		if let Some(metadata) = patch.metadata {
			for (key, value) in metadata {
				if value.is_null() {
					self.metadata.remove(&key);
				} else {
					self.metadata.insert(key, value);
				}
			}
		}
	}
}

/// Metadata update that leaves the text and its embedding untouched. `None` keeps a field;
/// `conditions: Some(None)` clears the condition set. Metadata keys merge, and a JSON null
/// removes a key.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChunkPatch {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub keywords: Option<Vec<Keyword>>,
	#[serde(
		default,
		deserialize_with = "deserialize_present",
		skip_serializing_if = "Option::is_none"
	)]
	pub conditions: Option<Option<ConditionSet>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub links: Option<Vec<ChunkLink>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Map<String, Value>>,
}
impl ChunkPatch {
	pub fn is_empty(&self) -> bool {
		self.keywords.is_none()
			&& self.conditions.is_none()
			&& self.links.is_none()
			&& self.metadata.is_none()
	}
}

/// NFKC-normalizes `text`, collapses whitespace runs to one space, and trims.
pub fn normalize_text(text: &str) -> String {
	let normalized: String = text.nfkc().collect();
	let mut out = String::with_capacity(normalized.len());

	for word in normalized.split_whitespace() {
		if !out.is_empty() {
			out.push(' ');
		}

		out.push_str(word);
	}

	out
}

/// First eight bytes (little-endian) of the blake3 digest of the normalized text. Texts that
/// normalize identically share a hash, which is how duplicate chunks collapse.
pub fn chunk_hash(text: &str) -> ChunkHash {
	let digest = blake3::hash(normalize_text(text).as_bytes());
	let mut bytes = [0_u8; 8];

	bytes.copy_from_slice(&digest.as_bytes()[..8]);

	u64::from_le_bytes(bytes)
}

/// Drops case-insensitive duplicates, keeping the first entry, and clamps weights.
pub fn dedup_keywords(keywords: Vec<Keyword>) -> Vec<Keyword> {
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(keywords.len());

	for keyword in keywords {
		let trimmed = keyword.text.trim();

		if trimmed.is_empty() || !seen.insert(trimmed.to_lowercase()) {
			continue;
		}

		out.push(Keyword::new(trimmed, keyword.weight));
	}

	out
}

// A present field, null included, is `Some`; an absent one falls back to `default`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	T::deserialize(deserializer).map(Some)
}

fn clamp_weight(weight: f32) -> f32 {
	if weight.is_nan() {
		return MIN_KEYWORD_WEIGHT;
	}

	weight.clamp(MIN_KEYWORD_WEIGHT, MAX_KEYWORD_WEIGHT)
}
