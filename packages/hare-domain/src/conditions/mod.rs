//! Declarative activation rules gating chunks and collections on conversation state.

pub mod context;
pub mod emotion;
pub mod evaluate;
pub mod history;
pub mod rule;
pub mod time_serde;
pub mod validate;

pub use context::{ChatMessage, EvaluationContext, GenerationType, SearchContext};
pub use emotion::Emotion;
pub use evaluate::{
	ConditionEngine, ConditionOutcome, ExpressionProvider, NoExpressions, RandomSource, RuleResult,
	ThreadRandom,
};
pub use history::{ActivationHistory, ActivationRecord};
pub use rule::{ConditionRule, ConditionSet, Logic, Predicate, RawConditionRule, RuleKind};
pub use validate::{
	ConditionScope, ValidationReport, rule_kinds, validate_condition_set,
	validate_condition_set_value, validate_rule,
};

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use serde_json::{Value, json};
	use time::Time;

	use super::*;
	use crate::chunk::Chunk;

	struct FixedRandom(f64);
	impl RandomSource for FixedRandom {
		fn percent(&self) -> f64 {
			self.0
		}
	}

	struct FixedExpression(Emotion);
	impl ExpressionProvider for FixedExpression {
		fn lookup(&self, _character: &str) -> Option<Emotion> {
			Some(self.0)
		}
	}

	fn engine() -> ConditionEngine {
		ConditionEngine::new(Arc::new(NoExpressions), Arc::new(FixedRandom(50.0)))
	}

	fn rule(value: Value) -> ConditionRule {
		serde_json::from_value(value).expect("Failed to parse rule.")
	}

	fn set(logic: &str, rules: Value) -> ConditionSet {
		serde_json::from_value(json!({ "logic": logic, "rules": rules }))
			.expect("Failed to parse condition set.")
	}

	fn message(speaker: &str, text: &str, is_user: bool) -> ChatMessage {
		ChatMessage { text: text.to_string(), speaker: speaker.to_string(), is_user }
	}

	fn search() -> SearchContext {
		SearchContext {
			messages: vec![
				message("Alice", "We should visit the old castle.", true),
				message("Seraphina", "The dragon sleeps beneath it, I'm scared.", false),
				message("Alice", "Then we go at dawn.", true),
			],
			message_count: 12,
			last_speaker: Some("Alice".to_string()),
			generation_type: GenerationType::Swipe,
			swipe_count: 2,
			active_lorebook_entries: vec!["castle".to_string(), "dragon".to_string()],
			is_group_chat: true,
			current_character: Some("Seraphina".to_string()),
			time_of_day: Time::from_hms(23, 30, 0).expect("Valid time."),
		}
	}

	fn passes(value: Value) -> bool {
		let search = search();

		engine().evaluate_rule(&rule(value), &EvaluationContext::collection(&search))
	}

	#[test]
	fn and_requires_every_rule_or_requires_one() {
		let search = search();
		let ctx = EvaluationContext::collection(&search);
		let rules = json!([
			{ "type": "isGroupChat", "settings": { "isGroup": true } },
			{ "type": "speaker", "settings": { "speakers": ["Bob"] } }
		]);
		let and = engine().evaluate_all(&set("AND", rules.clone()), &ctx);
		let or = engine().evaluate_all(&set("OR", rules), &ctx);

		assert!(!and.activated);
		assert!(or.activated);
		assert_eq!(and.results.len(), 2);
		assert!(and.results[0].passed);
		assert!(!and.results[1].passed);
	}

	#[test]
	fn empty_or_disabled_sets_activate() {
		let search = search();
		let ctx = EvaluationContext::collection(&search);
		let mut disabled = set("AND", json!([{ "type": "speaker", "value": "Bob" }]));

		disabled.enabled = false;

		assert!(engine().evaluate_all(&set("AND", json!([])), &ctx).activated);
		assert!(engine().evaluate_all(&disabled, &ctx).activated);
	}

	#[test]
	fn pattern_honors_role_depth_and_mode() {
		assert!(passes(json!({ "type": "pattern", "settings": { "patterns": ["CASTLE"] } })));
		assert!(!passes(json!({
			"type": "pattern",
			"settings": { "patterns": ["castle"], "caseSensitive": true, "depth": 2 }
		})));
		assert!(!passes(json!({
			"type": "pattern",
			"settings": { "patterns": ["dragon"], "role": "user" }
		})));
		assert!(passes(json!({
			"type": "pattern",
			"settings": { "patterns": ["dragon", "/\\bdawn\\b/"], "matchMode": "all" }
		})));
		assert!(!passes(json!({
			"type": "pattern",
			"settings": { "patterns": ["dragon", "unicorn"], "matchMode": "all" }
		})));
		assert!(!passes(json!({ "type": "pattern", "settings": { "patterns": ["/(broken/"] } })));
	}

	#[test]
	fn counts_and_time_of_day() {
		assert!(passes(json!({ "type": "messageCount", "value": 10 })));
		assert!(!passes(json!({ "type": "messageCount", "settings": { "operator": "eq", "value": 11 } })));
		assert!(passes(json!({
			"type": "swipeCount",
			"settings": { "operator": "between", "value": 1, "upper": 3 }
		})));
		assert!(passes(json!({ "type": "timeOfDay", "value": "22:00-06:00" })));
		assert!(!passes(json!({ "type": "timeOfDay", "settings": { "start": "08:00", "end": "17:00" } })));
	}

	#[test]
	fn time_of_day_ends_are_whole_minutes() {
		let mut search = search();

		search.time_of_day = Time::from_hms(17, 0, 30).expect("Valid time.");

		let ctx = EvaluationContext::collection(&search);
		let window = rule(json!({ "type": "timeOfDay", "settings": { "start": "08:00", "end": "17:00" } }));
		let single = rule(json!({ "type": "timeOfDay", "value": "17:00-17:00" }));

		assert!(engine().evaluate_rule(&window, &ctx));
		assert!(engine().evaluate_rule(&single, &ctx));

		search.time_of_day = Time::from_hms(17, 1, 0).expect("Valid time.");

		assert!(!engine().evaluate_rule(&window, &EvaluationContext::collection(&search)));
	}

	#[test]
	fn rule_kinds_lists_every_accepted_type() {
		let kinds: Vec<&str> = rule_kinds().collect();

		assert_eq!(kinds.len(), 15);
		assert!(kinds.contains(&"keyword"));
		assert!(kinds.contains(&"frequency"));
	}

	#[test]
	fn conversation_state_rules() {
		assert!(passes(json!({ "type": "speaker", "value": "alice" })));
		assert!(passes(json!({ "type": "characterPresent", "settings": { "characters": ["seraphina"] } })));
		assert!(passes(json!({ "type": "generationType", "settings": { "types": ["swipe"] } })));
		assert!(passes(json!({
			"type": "lorebookActive",
			"settings": { "entries": ["castle", "dragon"], "matchMode": "all" }
		})));
		assert!(!passes(json!({ "type": "lorebookActive", "settings": { "entries": ["forest"] } })));
		assert!(passes(json!({ "type": "isGroupChat" })));
		assert!(!passes(json!({ "type": "isGroupChat", "value": false })));
	}

	#[test]
	fn random_chance_compares_against_draw() {
		assert!(!passes(json!({ "type": "randomChance", "settings": { "probability": 0 } })));
		assert!(passes(json!({ "type": "randomChance", "settings": { "probability": 100 } })));
		assert!(passes(json!({ "type": "randomChance", "value": 51 })));
		assert!(!passes(json!({ "type": "randomChance", "value": 50 })));
	}

	#[test]
	fn emotion_detection_methods() {
		let search = search();
		let ctx = EvaluationContext::collection(&search);
		let fear = |method: &str| {
			rule(json!({
				"type": "emotion",
				"settings": { "emotions": ["fear"], "detectionMethod": method, "depth": 2 }
			}))
		};
		let with_expression =
			ConditionEngine::new(Arc::new(FixedExpression(Emotion::Joy)), Arc::new(FixedRandom(0.0)));

		assert!(engine().evaluate_rule(&fear("patterns"), &ctx));
		assert!(engine().evaluate_rule(&fear("auto"), &ctx));
		assert!(!engine().evaluate_rule(&fear("expressions"), &ctx));
		assert!(!engine().evaluate_rule(&fear("both"), &ctx));
		assert!(!with_expression.evaluate_rule(&fear("both"), &ctx));
		assert!(with_expression.evaluate_rule(&fear("auto"), &ctx));

		let scared =
			ConditionEngine::new(Arc::new(FixedExpression(Emotion::Fear)), Arc::new(FixedRandom(0.0)));

		assert!(scared.evaluate_rule(&fear("both"), &ctx));
	}

	#[test]
	fn chunk_only_rules_use_candidate_state() {
		let search = search();
		let history = ActivationHistory::new();
		let mut chunk = Chunk::new("The castle gate is sealed.");

		chunk.score = 0.42;
		chunk.metadata.insert("message_index".to_string(), Value::from(9));

		let ctx = EvaluationContext::for_chunk(&search, &chunk, &history);
		let engine = engine();

		assert!(engine.evaluate_rule(&rule(json!({ "type": "scoreThreshold", "value": 0.4 })), &ctx));
		assert!(!engine.evaluate_rule(&rule(json!({ "type": "scoreThreshold", "value": 0.5 })), &ctx));
		assert!(engine.evaluate_rule(&rule(json!({ "type": "recency", "value": 3 })), &ctx));
		assert!(!engine.evaluate_rule(&rule(json!({ "type": "recency", "value": 2 })), &ctx));

		let collection = EvaluationContext::collection(&search);

		assert!(!engine.evaluate_rule(&rule(json!({ "type": "recency", "value": 100 })), &collection));
	}

	#[test]
	fn frequency_cap_ignores_cooldown_once_reached() {
		let search = search();
		let history = ActivationHistory::new();
		let chunk = Chunk::new("Once only.");
		let capped = rule(json!({
			"type": "frequency",
			"settings": { "maxActivations": 1, "cooldownMessages": 0 }
		}));
		let engine = engine();

		assert!(engine.evaluate_rule(&capped, &EvaluationContext::for_chunk(&search, &chunk, &history)));

		history.record(chunk.hash(), 1);

		assert!(!engine.evaluate_rule(&capped, &EvaluationContext::for_chunk(&search, &chunk, &history)));
	}

	#[test]
	fn frequency_cooldown_counts_messages() {
		let search = search();
		let history = ActivationHistory::new();
		let chunk = Chunk::new("Cooling down.");
		let cooldown = rule(json!({ "type": "frequency", "settings": { "cooldownMessages": 5 } }));
		let engine = engine();

		history.record(chunk.hash(), 9);

		assert!(!engine.evaluate_rule(&cooldown, &EvaluationContext::for_chunk(&search, &chunk, &history)));

		history.reset();
		history.record(chunk.hash(), 7);

		assert!(engine.evaluate_rule(&cooldown, &EvaluationContext::for_chunk(&search, &chunk, &history)));
	}

	#[test]
	fn negation_skips_invalid_rules() {
		assert!(!passes(json!({ "type": "speaker", "value": "alice", "negate": true })));
		assert!(passes(json!({ "type": "speaker", "value": "bob", "negate": true })));
		assert!(!passes(json!({ "type": "teleport", "negate": true })));
		assert!(!passes(json!({ "type": "randomChance", "settings": { "probability": 400 }, "negate": true })));
	}
}
