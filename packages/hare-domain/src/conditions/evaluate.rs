use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use time::Time;

use crate::conditions::{
	context::{ChatMessage, EvaluationContext},
	emotion::{self, Emotion},
	rule::{
		ConditionRule, ConditionSet, DetectionMethod, Logic, MatchMode, PatternRule, Predicate,
		RoleFilter, TextPattern,
	},
};

/// Optional external emotion signal, such as the expression a character sprite is showing.
pub trait ExpressionProvider: Send + Sync {
	fn lookup(&self, character: &str) -> Option<Emotion>;
}

/// Used when no expression signal is installed.
#[derive(Debug, Default)]
pub struct NoExpressions;
impl ExpressionProvider for NoExpressions {
	fn lookup(&self, _character: &str) -> Option<Emotion> {
		None
	}
}

pub trait RandomSource: Send + Sync {
	/// Uniform draw in `[0, 100)`.
	fn percent(&self) -> f64;
}

#[derive(Debug, Default)]
pub struct ThreadRandom;
impl RandomSource for ThreadRandom {
	fn percent(&self) -> f64 {
		rand::rng().random_range(0.0..100.0)
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct RuleResult {
	pub kind: String,
	pub passed: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub invalid: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConditionOutcome {
	pub activated: bool,
	pub results: Vec<RuleResult>,
}

#[derive(Clone)]
pub struct ConditionEngine {
	expressions: Arc<dyn ExpressionProvider>,
	random: Arc<dyn RandomSource>,
}
impl ConditionEngine {
	pub fn new(expressions: Arc<dyn ExpressionProvider>, random: Arc<dyn RandomSource>) -> Self {
		Self { expressions, random }
	}

	/// Evaluates one rule with `negate` applied. Rules that failed to normalize are false even
	/// when negated.
	pub fn evaluate_rule(&self, rule: &ConditionRule, ctx: &EvaluationContext<'_>) -> bool {
		if let Predicate::Invalid { reason } = rule.predicate() {
			tracing::warn!(
				rule = %rule.raw().kind,
				reason = %reason,
				"Skipping invalid condition rule."
			);

			return false;
		}

		let passed = self.evaluate_predicate(rule.predicate(), ctx);

		if rule.negate() { !passed } else { passed }
	}

	/// Evaluates every rule of the set, then folds the results with the set's logic.
	pub fn evaluate_all(&self, set: &ConditionSet, ctx: &EvaluationContext<'_>) -> ConditionOutcome {
		if set.is_inert() {
			return ConditionOutcome { activated: true, results: Vec::new() };
		}

		let results: Vec<RuleResult> = set
			.rules
			.iter()
			.map(|rule| RuleResult {
				kind: rule.raw().kind.clone(),
				passed: self.evaluate_rule(rule, ctx),
				invalid: match rule.predicate() {
					Predicate::Invalid { reason } => Some(reason.clone()),
					_ => None,
				},
			})
			.collect();
		let activated = match set.logic {
			Logic::And => results.iter().all(|result| result.passed),
			Logic::Or => results.iter().any(|result| result.passed),
		};
		let summary: Vec<(&str, bool)> =
			results.iter().map(|result| (result.kind.as_str(), result.passed)).collect();

		tracing::debug!(
			chunk_hash = ?ctx.chunk_hash,
			activated,
			results = ?summary,
			"Evaluated condition set."
		);

		ConditionOutcome { activated, results }
	}

	fn evaluate_predicate(&self, predicate: &Predicate, ctx: &EvaluationContext<'_>) -> bool {
		let search = ctx.search;

		match predicate {
			Predicate::Pattern(rule) => pattern_matches(rule, &search.messages),
			Predicate::Speaker { speakers } => search.last_speaker.as_deref().is_some_and(|last| {
				speakers.iter().any(|speaker| speaker.eq_ignore_ascii_case(last.trim()))
			}),
			Predicate::MessageCount(comparison) => comparison.matches(search.message_count as f64),
			Predicate::SwipeCount(comparison) => comparison.matches(search.swipe_count as f64),
			Predicate::TimeOfDay { start, end } => {
				// Rules are written to the minute; seconds would exclude the final minute.
				let now = Time::from_hms(search.time_of_day.hour(), search.time_of_day.minute(), 0)
					.unwrap_or(search.time_of_day);

				if start <= end { now >= *start && now <= *end } else { now >= *start || now <= *end }
			},
			Predicate::Emotion { emotions, method, depth } =>
				self.emotion_matches(emotions, *method, *depth, ctx),
			Predicate::CharacterPresent { characters, depth } => characters.iter().any(|name| {
				let name = name.trim();

				let is_current = search
					.current_character
					.as_deref()
					.is_some_and(|current| current.trim().eq_ignore_ascii_case(name));

				is_current
					|| search
						.recent(*depth)
						.any(|message| message.speaker.trim().eq_ignore_ascii_case(name))
			}),
			Predicate::RandomChance { probability } => self.random.percent() < *probability,
			Predicate::GenerationType { types } => types.contains(&search.generation_type),
			Predicate::LorebookActive { entries, match_mode } => {
				let active = |entry: &String| {
					search
						.active_lorebook_entries
						.iter()
						.any(|key| key.trim().eq_ignore_ascii_case(entry.trim()))
				};

				match match_mode {
					MatchMode::Any => entries.iter().any(active),
					MatchMode::All => entries.iter().all(active),
				}
			},
			Predicate::IsGroupChat { is_group } => search.is_group_chat == *is_group,
			Predicate::ScoreThreshold { threshold } => ctx.score >= *threshold,
			Predicate::Recency(comparison) => match ctx.chunk_message_index {
				Some(origin) => comparison.matches(search.message_count as f64 - origin as f64),
				None => false,
			},
			Predicate::Frequency { max_activations, cooldown_messages } => {
				let Some(record) = ctx.activation else { return true };

				if *max_activations > 0 && record.count >= *max_activations {
					return false;
				}
				if *cooldown_messages > 0
					&& let Some(last) = record.last_activation_message_index
					&& search.message_count.saturating_sub(last) < *cooldown_messages
				{
					return false;
				}

				true
			},
			Predicate::Invalid { .. } => false,
		}
	}

	fn emotion_matches(
		&self,
		emotions: &[Emotion],
		method: DetectionMethod,
		depth: usize,
		ctx: &EvaluationContext<'_>,
	) -> bool {
		let expression = ctx
			.search
			.current_character
			.as_deref()
			.and_then(|character| self.expressions.lookup(character));
		let expression_match = expression.map(|emotion| emotions.contains(&emotion));
		let pattern_match = ctx.search.recent(depth).any(|message| {
			emotions.iter().any(|emotion| emotion::text_shows_emotion(&message.text, *emotion))
		});

		match method {
			DetectionMethod::Expressions => expression_match.unwrap_or(false),
			DetectionMethod::Patterns => pattern_match,
			DetectionMethod::Auto => expression_match.unwrap_or(false) || pattern_match,
			DetectionMethod::Both => expression_match.unwrap_or(false) && pattern_match,
		}
	}
}
impl Default for ConditionEngine {
	fn default() -> Self {
		Self::new(Arc::new(NoExpressions), Arc::new(ThreadRandom))
	}
}

fn pattern_matches(rule: &PatternRule, messages: &[ChatMessage]) -> bool {
	let window: Vec<&ChatMessage> = messages
		.iter()
		.rev()
		.take(rule.depth)
		.filter(|message| match rule.role {
			RoleFilter::Any => true,
			RoleFilter::User => message.is_user,
			RoleFilter::Assistant => !message.is_user,
		})
		.collect();
	let lowered: Vec<String> = if rule.case_sensitive {
		Vec::new()
	} else {
		window.iter().map(|message| message.text.to_lowercase()).collect()
	};
	let pattern_hit = |pattern: &TextPattern| match pattern {
		TextPattern::Substring(needle) if rule.case_sensitive =>
			window.iter().any(|message| message.text.contains(needle.as_str())),
		TextPattern::Substring(needle) => lowered.iter().any(|text| text.contains(needle.as_str())),
		TextPattern::Regex(regex) => window.iter().any(|message| regex.is_match(&message.text)),
		TextPattern::Never => false,
	};

	match rule.match_mode {
		MatchMode::Any => rule.patterns.iter().any(pattern_hit),
		MatchMode::All => rule.patterns.iter().all(pattern_hit),
	}
}
