//! Chunk fields as Qdrant payload. Link targets are written as decimal strings because
//! payload integers are signed 64-bit.

use std::collections::HashMap;

use qdrant_client::{
	Payload,
	qdrant::{Value, value::Kind},
};
use serde_json::{Map, Value as JsonValue};

use hare_domain::{
	chunk::{Chunk, ChunkHash, ChunkLink, Keyword, LinkKind},
	conditions::ConditionSet,
};

use crate::{Error, Result};

pub const TEXT_FIELD: &str = "text";
pub const KEYWORDS_FIELD: &str = "keywords";
pub const CONDITIONS_FIELD: &str = "conditions";
pub const LINKS_FIELD: &str = "links";
pub const METADATA_FIELD: &str = "metadata";

pub fn encode_chunk(chunk: &Chunk) -> Map<String, JsonValue> {
	let mut map = Map::new();

	map.insert(TEXT_FIELD.to_string(), JsonValue::from(chunk.text()));
	map.insert(
		KEYWORDS_FIELD.to_string(),
		JsonValue::Array(
			chunk
				.keywords
				.iter()
				.map(|keyword| {
					serde_json::json!({ "text": keyword.text, "weight": keyword.weight as f64 })
				})
				.collect(),
		),
	);
	map.insert(
		CONDITIONS_FIELD.to_string(),
		chunk
			.conditions
			.as_ref()
			.and_then(|set| serde_json::to_value(set).ok())
			.unwrap_or(JsonValue::Null),
	);
	map.insert(
		LINKS_FIELD.to_string(),
		JsonValue::Array(
			chunk
				.links
				.iter()
				.map(|link| {
					serde_json::json!({
						"target": link.target.to_string(),
						"kind": link_kind_str(link.kind),
					})
				})
				.collect(),
		),
	);
	map.insert(METADATA_FIELD.to_string(), JsonValue::Object(chunk.metadata.clone()));

	map
}

pub fn decode_chunk(hash: ChunkHash, score: f32, mut map: Map<String, JsonValue>) -> Result<Chunk> {
	let invalid = |message: String| Error::InvalidPayload { hash, message };
	let text = match map.remove(TEXT_FIELD) {
		Some(JsonValue::String(text)) => text,
		_ => return Err(invalid("text is missing.".to_string())),
	};
	let keywords: Vec<Keyword> = match map.remove(KEYWORDS_FIELD) {
		Some(JsonValue::Null) | None => Vec::new(),
		Some(value) => serde_json::from_value(value)
			.map_err(|err| invalid(format!("keywords are malformed: {err}.")))?,
	};
	let conditions: Option<ConditionSet> = match map.remove(CONDITIONS_FIELD) {
		Some(JsonValue::Null) | None => None,
		Some(value) => Some(
			serde_json::from_value(value)
				.map_err(|err| invalid(format!("conditions are malformed: {err}.")))?,
		),
	};
	let links = match map.remove(LINKS_FIELD) {
		Some(JsonValue::Array(items)) => items
			.iter()
			.map(decode_link)
			.collect::<Option<Vec<_>>>()
			.ok_or_else(|| invalid("links are malformed.".to_string()))?,
		_ => Vec::new(),
	};
	let metadata = match map.remove(METADATA_FIELD) {
		Some(JsonValue::Object(metadata)) => metadata,
		_ => Map::new(),
	};
	let mut chunk = Chunk::from_stored(hash, text).with_keywords(keywords).with_links(links);

	chunk.conditions = conditions;
	chunk.metadata = metadata;
	chunk.score = score;

	Ok(chunk)
}

pub fn to_qdrant_payload(map: Map<String, JsonValue>) -> Payload {
	let fields: HashMap<String, Value> =
		map.into_iter().map(|(key, value)| (key, Value::from(value))).collect();

	Payload::from(fields)
}

pub fn from_qdrant_payload(payload: &HashMap<String, Value>) -> Map<String, JsonValue> {
	payload.iter().map(|(key, value)| (key.clone(), to_json(value))).collect()
}

pub fn to_json(value: &Value) -> JsonValue {
	match value.kind.as_ref() {
		None | Some(Kind::NullValue(_)) => JsonValue::Null,
		Some(Kind::BoolValue(flag)) => JsonValue::Bool(*flag),
		Some(Kind::IntegerValue(number)) => JsonValue::from(*number),
		Some(Kind::DoubleValue(number)) => JsonValue::from(*number),
		Some(Kind::StringValue(text)) => JsonValue::String(text.clone()),
		Some(Kind::ListValue(list)) => JsonValue::Array(list.values.iter().map(to_json).collect()),
		Some(Kind::StructValue(object)) => JsonValue::Object(
			object.fields.iter().map(|(key, value)| (key.clone(), to_json(value))).collect(),
		),
	}
}

fn decode_link(value: &JsonValue) -> Option<ChunkLink> {
	let target = match value.get("target")? {
		JsonValue::String(raw) => raw.parse().ok()?,
		JsonValue::Number(number) => number.as_u64()?,
		_ => return None,
	};
	let kind = match value.get("kind")?.as_str()? {
		"hard" => LinkKind::Hard,
		"soft" => LinkKind::Soft,
		_ => return None,
	};

	Some(ChunkLink { target, kind })
}

fn link_kind_str(kind: LinkKind) -> &'static str {
	match kind {
		LinkKind::Hard => "hard",
		LinkKind::Soft => "soft",
	}
}
