use serde::Serialize;
use serde_json::Value;

use crate::conditions::rule::{self, ConditionSet, RawConditionRule, RuleKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionScope {
	Collection,
	Chunk,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
	pub valid: bool,
	pub errors: Vec<String>,
}
impl ValidationReport {
	fn from_errors(errors: Vec<String>) -> Self {
		Self { valid: errors.is_empty(), errors }
	}
}

/// Reports every problem with one rule, including ones that only degrade it at runtime such
/// as a regex that fails to compile.
pub fn validate_rule(raw: &RawConditionRule) -> ValidationReport {
	ValidationReport::from_errors(rule::normalize(raw).problems)
}

pub fn validate_condition_set(set: &ConditionSet, scope: ConditionScope) -> ValidationReport {
	let mut errors = Vec::new();

	for (index, condition) in set.rules.iter().enumerate() {
		let raw = condition.raw();
		let label = format!("Rule {} ({})", index + 1, raw.kind);

		if scope == ConditionScope::Collection
			&& let Some(kind) = condition.kind()
			&& kind.is_chunk_only()
		{
			errors.push(format!("{label}: {} only applies to chunks.", kind.as_str()));
		}

		for problem in rule::normalize(raw).problems {
			errors.push(format!("{label}: {problem}"));
		}
	}

	ValidationReport::from_errors(errors)
}

/// Validates an unparsed condition set, reporting shape errors instead of failing.
pub fn validate_condition_set_value(value: &Value, scope: ConditionScope) -> ValidationReport {
	match serde_json::from_value::<ConditionSet>(value.clone()) {
		Ok(set) => validate_condition_set(&set, scope),
		Err(err) => ValidationReport::from_errors(vec![format!("Malformed condition set: {err}")]),
	}
}

/// Names of all accepted rule types, legacy alias included.
pub fn rule_kinds() -> impl Iterator<Item = &'static str> {
	RuleKind::ALL.into_iter().map(RuleKind::as_str)
}
