use hare_domain::chunk::Chunk;

/// A chunk with its precomputed embedding, ready for upsert.
#[derive(Clone, Debug)]
pub struct StoredPoint {
	pub chunk: Chunk,
	pub vector: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
	Text(String),
	Integer(i64),
	Bool(bool),
}

/// Exact match on a chunk metadata key.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMatch {
	pub key: String,
	pub value: FilterValue,
}

/// Conjunction of metadata matches applied inside the vector search.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PayloadFilter {
	pub must: Vec<FieldMatch>,
}
impl PayloadFilter {
	pub fn matching(mut self, key: impl Into<String>, value: FilterValue) -> Self {
		self.must.push(FieldMatch { key: key.into(), value });

		self
	}

	pub fn is_empty(&self) -> bool {
		self.must.is_empty()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionState {
	Existing,
	Created,
	/// Dropped and recreated because the stored dimension differed.
	Recreated,
}
impl CollectionState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Existing => "existing",
			Self::Created => "created",
			Self::Recreated => "recreated",
		}
	}
}
