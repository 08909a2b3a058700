//! Collection-level activation: whole collections switched on or off by conversation state.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use hare_domain::conditions::{
	ConditionEngine, ConditionScope, ConditionSet, EvaluationContext, SearchContext,
	validate_condition_set,
};

use crate::{Error, Result};

/// Condition sets keyed by collection id, parsed and validated once at construction.
#[derive(Clone, Debug, Default)]
pub struct CollectionConditions {
	sets: HashMap<String, ConditionSet>,
}
impl CollectionConditions {
	pub fn from_config(cfg: &hare_config::Conditions) -> Result<Self> {
		let mut sets = HashMap::with_capacity(cfg.collections.len());

		for (collection, raw) in &cfg.collections {
			let set: ConditionSet = serde_json::from_value(raw.clone()).map_err(|err| {
				config_error(format!("conditions.collections.{collection} is malformed: {err}"))
			})?;
			let report = validate_condition_set(&set, ConditionScope::Collection);

			if !report.valid {
				return Err(config_error(format!(
					"conditions.collections.{collection} is invalid: {}",
					report.errors.join(" ")
				)));
			}

			sets.insert(collection.clone(), set);
		}

		Ok(Self { sets })
	}

	pub fn get(&self, collection: &str) -> Option<&ConditionSet> {
		self.sets.get(collection)
	}

	pub fn len(&self) -> usize {
		self.sets.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sets.is_empty()
	}

	/// Collections without a condition set are always active.
	pub fn is_active(
		&self,
		engine: &ConditionEngine,
		collection: &str,
		search: &SearchContext,
	) -> bool {
		let Some(set) = self.sets.get(collection) else { return true };
		let outcome = engine.evaluate_all(set, &EvaluationContext::collection(search));

		debug!(collection, activated = outcome.activated, "Evaluated collection conditions.");

		outcome.activated
	}

	/// Splits `collections` into active and skipped, keeping the caller's order in both.
	pub fn partition(
		&self,
		engine: &ConditionEngine,
		collections: &[String],
		search: &SearchContext,
	) -> CollectionPartition {
		let mut partition = CollectionPartition::default();

		for collection in collections {
			if self.is_active(engine, collection, search) {
				partition.active.push(collection.clone());
			} else {
				partition.skipped.push(collection.clone());
			}
		}

		partition
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CollectionPartition {
	pub active: Vec<String>,
	pub skipped: Vec<String>,
}

fn config_error(message: String) -> Error {
	Error::Config(hare_config::Error::Validation { message })
}
