use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::Time;

use crate::conditions::{context::GenerationType, emotion::Emotion, time_serde};

const DEFAULT_PATTERN_DEPTH: usize = 5;
const DEFAULT_EMOTION_DEPTH: usize = 1;
const DEFAULT_CHARACTER_DEPTH: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleKind {
	Pattern,
	/// Legacy alias of `Pattern`.
	Keyword,
	Speaker,
	MessageCount,
	TimeOfDay,
	Emotion,
	CharacterPresent,
	RandomChance,
	GenerationType,
	SwipeCount,
	LorebookActive,
	IsGroupChat,
	ScoreThreshold,
	Recency,
	Frequency,
}
impl RuleKind {
	pub const ALL: [Self; 15] = [
		Self::Pattern,
		Self::Keyword,
		Self::Speaker,
		Self::MessageCount,
		Self::TimeOfDay,
		Self::Emotion,
		Self::CharacterPresent,
		Self::RandomChance,
		Self::GenerationType,
		Self::SwipeCount,
		Self::LorebookActive,
		Self::IsGroupChat,
		Self::ScoreThreshold,
		Self::Recency,
		Self::Frequency,
	];

	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|kind| kind.as_str().eq_ignore_ascii_case(raw))
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pattern => "pattern",
			Self::Keyword => "keyword",
			Self::Speaker => "speaker",
			Self::MessageCount => "messageCount",
			Self::TimeOfDay => "timeOfDay",
			Self::Emotion => "emotion",
			Self::CharacterPresent => "characterPresent",
			Self::RandomChance => "randomChance",
			Self::GenerationType => "generationType",
			Self::SwipeCount => "swipeCount",
			Self::LorebookActive => "lorebookActive",
			Self::IsGroupChat => "isGroupChat",
			Self::ScoreThreshold => "scoreThreshold",
			Self::Recency => "recency",
			Self::Frequency => "frequency",
		}
	}

	/// Kinds that need a candidate chunk and so cannot gate a whole collection.
	pub fn is_chunk_only(self) -> bool {
		matches!(self, Self::ScoreThreshold | Self::Recency | Self::Frequency)
	}
}

/// A rule as authored: a `type`, an optional `settings` object, and an optional flat legacy
/// `value` that older rules carry instead of settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawConditionRule {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub settings: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
	#[serde(default)]
	pub negate: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
	#[default]
	#[serde(alias = "and")]
	And,
	#[serde(alias = "or")]
	Or,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConditionSet {
	#[serde(default = "default_enabled")]
	pub enabled: bool,
	#[serde(default)]
	pub logic: Logic,
	#[serde(default)]
	pub rules: Vec<ConditionRule>,
}
impl ConditionSet {
	pub fn new(logic: Logic, rules: Vec<ConditionRule>) -> Self {
		Self { enabled: true, logic, rules }
	}

	/// Disabled or empty sets activate unconditionally.
	pub fn is_inert(&self) -> bool {
		!self.enabled || self.rules.is_empty()
	}
}

/// A rule normalized once at deserialization. The raw form is kept for round-tripping and
/// validation reports.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "RawConditionRule", into = "RawConditionRule")]
pub struct ConditionRule {
	raw: RawConditionRule,
	predicate: Predicate,
}
impl ConditionRule {
	pub fn raw(&self) -> &RawConditionRule {
		&self.raw
	}

	pub fn predicate(&self) -> &Predicate {
		&self.predicate
	}

	pub fn negate(&self) -> bool {
		self.raw.negate
	}

	pub fn kind(&self) -> Option<RuleKind> {
		RuleKind::parse(&self.raw.kind)
	}
}
impl From<RawConditionRule> for ConditionRule {
	fn from(raw: RawConditionRule) -> Self {
		let normalized = normalize(&raw);
		let predicate = match normalized.predicate {
			Some(predicate) => {
				for problem in &normalized.problems {
					tracing::warn!(rule = %raw.kind, problem = %problem, "Condition rule degraded.");
				}

				predicate
			},
			None => Predicate::Invalid { reason: normalized.problems.join(" ") },
		};

		Self { raw, predicate }
	}
}
impl From<ConditionRule> for RawConditionRule {
	fn from(rule: ConditionRule) -> Self {
		rule.raw
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchMode {
	#[default]
	Any,
	All,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoleFilter {
	#[default]
	Any,
	User,
	Assistant,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectionMethod {
	#[default]
	Auto,
	Expressions,
	Patterns,
	Both,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
	Eq,
	Gte,
	Lte,
	Between,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Comparison {
	pub operator: CompareOp,
	pub value: f64,
	pub upper: f64,
}
impl Comparison {
	pub fn matches(&self, actual: f64) -> bool {
		match self.operator {
			CompareOp::Eq => actual == self.value,
			CompareOp::Gte => actual >= self.value,
			CompareOp::Lte => actual <= self.value,
			CompareOp::Between => actual >= self.value && actual <= self.upper,
		}
	}
}

#[derive(Clone, Debug)]
pub enum TextPattern {
	/// Plain substring, already lowercased when the rule is case-insensitive.
	Substring(String),
	Regex(Regex),
	/// A regex that failed to compile. Never matches.
	Never,
}

#[derive(Clone, Debug)]
pub struct PatternRule {
	pub patterns: Vec<TextPattern>,
	pub match_mode: MatchMode,
	pub role: RoleFilter,
	pub depth: usize,
	pub case_sensitive: bool,
}

/// Canonical form of a rule. Settings and legacy values have already been reconciled.
#[derive(Clone, Debug)]
pub enum Predicate {
	Pattern(PatternRule),
	Speaker { speakers: Vec<String> },
	MessageCount(Comparison),
	TimeOfDay { start: Time, end: Time },
	Emotion { emotions: Vec<Emotion>, method: DetectionMethod, depth: usize },
	CharacterPresent { characters: Vec<String>, depth: usize },
	RandomChance { probability: f64 },
	GenerationType { types: Vec<GenerationType> },
	SwipeCount(Comparison),
	LorebookActive { entries: Vec<String>, match_mode: MatchMode },
	IsGroupChat { is_group: bool },
	ScoreThreshold { threshold: f32 },
	Recency(Comparison),
	Frequency { max_activations: u32, cooldown_messages: u32 },
	/// The rule could not be normalized. Evaluates to false regardless of `negate`.
	Invalid { reason: String },
}

pub(crate) struct Normalized {
	pub predicate: Option<Predicate>,
	/// Every problem found, fatal or not.
	pub problems: Vec<String>,
}

pub(crate) fn normalize(raw: &RawConditionRule) -> Normalized {
	let Some(kind) = RuleKind::parse(&raw.kind) else {
		return Normalized {
			predicate: None,
			problems: vec![format!("Unknown condition type {:?}.", raw.kind)],
		};
	};
	let empty = Map::new();
	let settings = match raw.settings.as_ref() {
		None | Some(Value::Null) => &empty,
		Some(Value::Object(map)) => map,
		Some(_) => {
			return Normalized {
				predicate: None,
				problems: vec!["settings must be an object.".to_string()],
			};
		},
	};
	let mut normalizer = Normalizer {
		settings,
		value: raw.value.as_ref(),
		errors: Vec::new(),
		degraded: Vec::new(),
	};
	let predicate = normalizer.build(kind);
	let Normalizer { errors, degraded, .. } = normalizer;
	let predicate = if errors.is_empty() { predicate } else { None };
	let mut problems = errors;

	problems.extend(degraded);

	Normalized { predicate, problems }
}

struct Normalizer<'a> {
	settings: &'a Map<String, Value>,
	value: Option<&'a Value>,
	errors: Vec<String>,
	degraded: Vec<String>,
}
impl Normalizer<'_> {
	fn build(&mut self, kind: RuleKind) -> Option<Predicate> {
		match kind {
			RuleKind::Pattern | RuleKind::Keyword => self.pattern().map(Predicate::Pattern),
			RuleKind::Speaker => {
				let speakers = self.required_list("speakers")?;

				Some(Predicate::Speaker { speakers })
			},
			RuleKind::MessageCount => self.comparison(CompareOp::Gte).map(Predicate::MessageCount),
			RuleKind::SwipeCount => self.comparison(CompareOp::Gte).map(Predicate::SwipeCount),
			RuleKind::Recency => self.comparison(CompareOp::Lte).map(Predicate::Recency),
			RuleKind::TimeOfDay => self.time_of_day(),
			RuleKind::Emotion => self.emotion(),
			RuleKind::CharacterPresent => {
				let characters = self.required_list("characters")?;
				let depth = self.depth(DEFAULT_CHARACTER_DEPTH)?;

				Some(Predicate::CharacterPresent { characters, depth })
			},
			RuleKind::RandomChance => {
				let probability = self.number("probability").or_else(|| self.legacy_number());
				let Some(probability) = probability else {
					self.error("randomChance requires a probability.");

					return None;
				};

				if !(0.0..=100.0).contains(&probability) {
					self.error("probability must be between 0 and 100.");

					return None;
				}

				Some(Predicate::RandomChance { probability })
			},
			RuleKind::GenerationType => {
				let raw = self.required_list("types")?;
				let mut types = Vec::with_capacity(raw.len());

				for name in raw {
					match GenerationType::parse(&name) {
						Some(kind) => types.push(kind),
						None => self.error(format!("Unknown generation type {name:?}.")),
					}
				}

				Some(Predicate::GenerationType { types })
			},
			RuleKind::LorebookActive => {
				let entries = self.required_list("entries")?;
				let match_mode = self.match_mode()?;

				Some(Predicate::LorebookActive { entries, match_mode })
			},
			RuleKind::IsGroupChat => {
				let is_group =
					self.boolean("isGroup").or_else(|| self.legacy_boolean()).unwrap_or(true);

				Some(Predicate::IsGroupChat { is_group })
			},
			RuleKind::ScoreThreshold => {
				let threshold = self.number("threshold").or_else(|| self.legacy_number());

				match threshold {
					Some(threshold) if threshold.is_finite() =>
						Some(Predicate::ScoreThreshold { threshold: threshold as f32 }),
					_ => {
						self.error("scoreThreshold requires a finite threshold.");

						None
					},
				}
			},
			RuleKind::Frequency => {
				let max_activations =
					self.number("maxActivations").or_else(|| self.legacy_number()).unwrap_or(0.0);
				let cooldown_messages = self.number("cooldownMessages").unwrap_or(0.0);
				let max_activations = self.count(max_activations, "maxActivations")?;
				let cooldown_messages = self.count(cooldown_messages, "cooldownMessages")?;

				Some(Predicate::Frequency { max_activations, cooldown_messages })
			},
		}
	}

	fn pattern(&mut self) -> Option<PatternRule> {
		let raw = self.required_list("patterns")?;
		let case_sensitive = self.boolean("caseSensitive").unwrap_or(false);
		let match_mode = self.match_mode()?;
		let role = match self.text("role").as_deref() {
			None | Some("any") => RoleFilter::Any,
			Some("user") => RoleFilter::User,
			Some("assistant") | Some("character") => RoleFilter::Assistant,
			Some(other) => {
				self.error(format!("role must be one of any, user, or assistant, got {other:?}."));

				return None;
			},
		};
		let depth = self.depth(DEFAULT_PATTERN_DEPTH)?;
		let patterns = raw.iter().map(|pattern| self.text_pattern(pattern, case_sensitive)).collect();

		Some(PatternRule { patterns, match_mode, role, depth, case_sensitive })
	}

	fn text_pattern(&mut self, raw: &str, case_sensitive: bool) -> TextPattern {
		let Some((body, flags)) = split_regex_literal(raw) else {
			return if case_sensitive {
				TextPattern::Substring(raw.to_string())
			} else {
				TextPattern::Substring(raw.to_lowercase())
			};
		};
		let mut builder = RegexBuilder::new(body);

		for flag in flags.chars() {
			match flag {
				'i' => builder.case_insensitive(true),
				'm' => builder.multi_line(true),
				's' => builder.dot_matches_new_line(true),
				'x' => builder.ignore_whitespace(true),
				'g' | 'u' | 'y' => &mut builder,
				other => {
					self.degraded.push(format!("Ignoring unsupported regex flag {other:?} in {raw}."));

					&mut builder
				},
			};
		}

		match builder.build() {
			Ok(regex) => TextPattern::Regex(regex),
			Err(err) => {
				self.degraded.push(format!("Invalid regex {raw}: {err}"));

				TextPattern::Never
			},
		}
	}

	fn comparison(&mut self, legacy_operator: CompareOp) -> Option<Comparison> {
		let operator = match self.text("operator").as_deref() {
			None => legacy_operator,
			Some("eq") => CompareOp::Eq,
			Some("gte") => CompareOp::Gte,
			Some("lte") => CompareOp::Lte,
			Some("between") => CompareOp::Between,
			Some(other) => {
				self.error(format!("operator must be one of eq, gte, lte, or between, got {other:?}."));

				return None;
			},
		};
		let value = self.number("value").or_else(|| self.legacy_number());
		let Some(value) = value else {
			self.error("A numeric value is required.");

			return None;
		};

		if !value.is_finite() || value < 0.0 {
			self.error("value must be a non-negative number.");

			return None;
		}

		let upper = if operator == CompareOp::Between {
			let Some(upper) = self.number("upper") else {
				self.error("between requires an upper bound.");

				return None;
			};

			if !upper.is_finite() || upper < value {
				self.error("upper must be greater than or equal to value.");

				return None;
			}

			upper
		} else {
			value
		};

		Some(Comparison { operator, value, upper })
	}

	fn time_of_day(&mut self) -> Option<Predicate> {
		let (start, end) = match (self.text("start"), self.text("end")) {
			(Some(start), Some(end)) => (start, end),
			(None, None) => match self.value.and_then(Value::as_str) {
				Some(range) => match range.split_once('-') {
					Some((start, end)) => (start.to_string(), end.to_string()),
					None => {
						self.error(format!("Time range {range:?} must look like HH:MM-HH:MM."));

						return None;
					},
				},
				None => {
					self.error("timeOfDay requires start and end times.");

					return None;
				},
			},
			_ => {
				self.error("timeOfDay requires both start and end.");

				return None;
			},
		};
		let parsed_start = time_serde::parse_hh_mm(&start);
		let parsed_end = time_serde::parse_hh_mm(&end);

		if parsed_start.is_none() {
			self.error(format!("Start time {start:?} must be HH:MM."));
		}
		if parsed_end.is_none() {
			self.error(format!("End time {end:?} must be HH:MM."));
		}

		Some(Predicate::TimeOfDay { start: parsed_start?, end: parsed_end? })
	}

	fn emotion(&mut self) -> Option<Predicate> {
		let raw = self.required_list("emotions")?;
		let mut emotions = Vec::with_capacity(raw.len());

		for name in raw {
			match Emotion::parse(&name) {
				Some(emotion) => emotions.push(emotion),
				None => self.error(format!("Unknown emotion {name:?}.")),
			}
		}

		let method = match self.text("detectionMethod").as_deref() {
			None | Some("auto") => DetectionMethod::Auto,
			Some("expressions") => DetectionMethod::Expressions,
			Some("patterns") => DetectionMethod::Patterns,
			Some("both") => DetectionMethod::Both,
			Some(other) => {
				self.error(format!(
					"detectionMethod must be one of auto, expressions, patterns, or both, got {other:?}."
				));

				return None;
			},
		};
		let depth = self.depth(DEFAULT_EMOTION_DEPTH)?;

		Some(Predicate::Emotion { emotions, method, depth })
	}

	fn match_mode(&mut self) -> Option<MatchMode> {
		match self.text("matchMode").as_deref() {
			None | Some("any") => Some(MatchMode::Any),
			Some("all") => Some(MatchMode::All),
			Some(other) => {
				self.error(format!("matchMode must be one of any or all, got {other:?}."));

				None
			},
		}
	}

	fn depth(&mut self, default: usize) -> Option<usize> {
		let Some(depth) = self.number("depth") else { return Some(default) };

		if depth < 1.0 || depth.fract() != 0.0 {
			self.error("depth must be a positive whole number.");

			return None;
		}

		Some(depth as usize)
	}

	fn count(&mut self, value: f64, key: &str) -> Option<u32> {
		if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
			self.error(format!("{key} must be a non-negative whole number."));

			return None;
		}

		Some(value as u32)
	}

	/// Reads `key` from settings, falling back to the comma-separated legacy value.
	fn required_list(&mut self, key: &str) -> Option<Vec<String>> {
		let list = match self.settings.get(key) {
			Some(Value::Array(items)) => {
				let mut out = Vec::with_capacity(items.len());

				for item in items {
					match item {
						Value::String(text) => out.push(text.trim().to_string()),
						Value::Number(number) => out.push(number.to_string()),
						_ => {
							self.error(format!("{key} must contain only strings."));

							return None;
						},
					}
				}

				out
			},
			Some(Value::String(text)) => split_list(text),
			Some(_) => {
				self.error(format!("{key} must be a list of strings."));

				return None;
			},
			None => match self.value {
				Some(Value::String(text)) => split_list(text),
				Some(Value::Array(items)) =>
					items.iter().filter_map(Value::as_str).map(|text| text.trim().to_string()).collect(),
				_ => Vec::new(),
			},
		};
		let list: Vec<String> = list.into_iter().filter(|item| !item.is_empty()).collect();

		if list.is_empty() {
			self.error(format!("{key} must list at least one entry."));

			return None;
		}

		Some(list)
	}

	fn text(&mut self, key: &str) -> Option<String> {
		match self.settings.get(key)? {
			Value::String(text) => Some(text.trim().to_string()),
			Value::Null => None,
			_ => {
				self.error(format!("{key} must be a string."));

				None
			},
		}
	}

	fn number(&mut self, key: &str) -> Option<f64> {
		match self.settings.get(key)? {
			Value::Number(number) => number.as_f64(),
			Value::String(text) => match text.trim().parse::<f64>() {
				Ok(number) => Some(number),
				Err(_) => {
					self.error(format!("{key} must be a number."));

					None
				},
			},
			Value::Null => None,
			_ => {
				self.error(format!("{key} must be a number."));

				None
			},
		}
	}

	fn legacy_number(&mut self) -> Option<f64> {
		match self.value? {
			Value::Number(number) => number.as_f64(),
			Value::String(text) => match text.trim().parse::<f64>() {
				Ok(number) => Some(number),
				Err(_) => {
					self.error(format!("Legacy value {text:?} must be a number."));

					None
				},
			},
			_ => None,
		}
	}

	fn boolean(&mut self, key: &str) -> Option<bool> {
		let value = self.settings.get(key)?;
		let flag = parse_bool(value);

		if flag.is_none() && !value.is_null() {
			self.error(format!("{key} must be a boolean."));
		}

		flag
	}

	fn legacy_boolean(&mut self) -> Option<bool> {
		let value = self.value?;
		let flag = parse_bool(value);

		if flag.is_none() && !value.is_null() {
			self.error("Legacy value must be true or false.");
		}

		flag
	}

	fn error(&mut self, message: impl Into<String>) {
		self.errors.push(message.into());
	}
}

/// Splits `/body/flags` into its body and flags.
fn split_regex_literal(raw: &str) -> Option<(&str, &str)> {
	let rest = raw.strip_prefix('/')?;
	let end = rest.rfind('/')?;

	if end == 0 {
		return None;
	}

	Some((&rest[..end], &rest[end + 1..]))
}

fn parse_bool(value: &Value) -> Option<bool> {
	match value {
		Value::Bool(flag) => Some(*flag),
		Value::String(text) if text.trim().eq_ignore_ascii_case("true") => Some(true),
		Value::String(text) if text.trim().eq_ignore_ascii_case("false") => Some(false),
		_ => None,
	}
}

fn split_list(raw: &str) -> Vec<String> {
	if split_regex_literal(raw.trim()).is_some() {
		return vec![raw.trim().to_string()];
	}

	raw.split(',').map(|item| item.trim().to_string()).collect()
}

fn default_enabled() -> bool {
	true
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn rule(value: Value) -> ConditionRule {
		serde_json::from_value(value).expect("Failed to parse rule.")
	}

	#[test]
	fn legacy_values_normalize_like_settings() {
		let legacy = rule(json!({ "type": "messageCount", "value": 10 }));
		let Predicate::MessageCount(comparison) = legacy.predicate() else {
			panic!("Expected messageCount predicate, got {:?}.", legacy.predicate());
		};

		assert_eq!(comparison.operator, CompareOp::Gte);
		assert_eq!(comparison.value, 10.0);

		let legacy = rule(json!({ "type": "recency", "value": "4" }));
		let Predicate::Recency(comparison) = legacy.predicate() else {
			panic!("Expected recency predicate.");
		};

		assert_eq!(comparison.operator, CompareOp::Lte);

		let legacy = rule(json!({ "type": "keyword", "value": "dragon, castle" }));
		let Predicate::Pattern(pattern) = legacy.predicate() else {
			panic!("Expected pattern predicate.");
		};

		assert_eq!(pattern.patterns.len(), 2);
		assert_eq!(pattern.depth, 5);
	}

	#[test]
	fn regex_literals_parse_flags() {
		let parsed = rule(json!({
			"type": "pattern",
			"settings": { "patterns": ["/drag(on|ons)/i", "/x/gu", "plain"] }
		}));
		let Predicate::Pattern(pattern) = parsed.predicate() else {
			panic!("Expected pattern predicate.");
		};

		assert!(matches!(&pattern.patterns[0], TextPattern::Regex(regex) if regex.is_match("DRAGONS")));
		assert!(matches!(&pattern.patterns[1], TextPattern::Regex(_)));
		assert!(matches!(&pattern.patterns[2], TextPattern::Substring(text) if text == "plain"));
	}

	#[test]
	fn invalid_regex_degrades_to_never() {
		let parsed = rule(json!({ "type": "pattern", "settings": { "patterns": ["/(unclosed/"] } }));
		let Predicate::Pattern(pattern) = parsed.predicate() else {
			panic!("Expected pattern predicate.");
		};

		assert!(matches!(pattern.patterns[0], TextPattern::Never));
	}

	#[test]
	fn unparseable_rules_become_invalid() {
		let parsed = rule(json!({ "type": "teleport" }));

		assert!(matches!(parsed.predicate(), Predicate::Invalid { .. }));

		let parsed =
			rule(json!({ "type": "timeOfDay", "settings": { "start": "25:00", "end": "06:00" } }));

		assert!(matches!(parsed.predicate(), Predicate::Invalid { .. }));

		let parsed = rule(json!({ "type": "randomChance", "settings": { "probability": 140 } }));

		assert!(matches!(parsed.predicate(), Predicate::Invalid { .. }));
	}

	#[test]
	fn time_range_legacy_value_wraps() {
		let parsed = rule(json!({ "type": "timeOfDay", "value": "22:00-06:00" }));
		let Predicate::TimeOfDay { start, end } = parsed.predicate() else {
			panic!("Expected timeOfDay predicate.");
		};

		assert!(start > end);
	}

	#[test]
	fn raw_form_round_trips() {
		let value = json!({
			"type": "frequency",
			"settings": { "maxActivations": 2, "cooldownMessages": 3 },
			"negate": true
		});
		let parsed = rule(value.clone());

		assert!(parsed.negate());
		assert_eq!(serde_json::to_value(&parsed).expect("Failed to serialize rule."), value);
	}

	#[test]
	fn condition_set_defaults() {
		let set: ConditionSet = serde_json::from_value(json!({ "rules": [] }))
			.expect("Failed to parse condition set.");

		assert!(set.enabled);
		assert_eq!(set.logic, Logic::And);
		assert!(set.is_inert());

		let set: ConditionSet = serde_json::from_value(json!({ "logic": "or", "rules": [] }))
			.expect("Failed to parse condition set.");

		assert_eq!(set.logic, Logic::Or);
	}
}
