use std::{
	collections::HashMap,
	sync::{Mutex, MutexGuard},
};

use crate::chunk::ChunkHash;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActivationRecord {
	pub count: u32,
	pub last_activation_message_index: Option<u32>,
}

/// How often and how recently each chunk satisfied a `frequency` rule. Lives as long as the
/// orchestrator that owns it; entries are only ever added to or cleared wholesale.
#[derive(Debug, Default)]
pub struct ActivationHistory {
	records: Mutex<HashMap<ChunkHash, ActivationRecord>>,
}
impl ActivationHistory {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, hash: ChunkHash) -> Option<ActivationRecord> {
		self.lock().get(&hash).copied()
	}

	pub fn record(&self, hash: ChunkHash, message_index: u32) -> ActivationRecord {
		let mut records = self.lock();
		let record = records.entry(hash).or_default();

		record.count = record.count.saturating_add(1);
		record.last_activation_message_index = Some(message_index);

		*record
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn reset(&self) {
		self.lock().clear();
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<ChunkHash, ActivationRecord>> {
		self.records.lock().unwrap_or_else(|err| err.into_inner())
	}
}
