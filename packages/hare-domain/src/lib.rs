pub mod chunk;
pub mod conditions;
pub mod fusion;
pub mod keywords;
pub mod lexical;
pub mod links;
pub mod ranked;

use std::cmp::Ordering;

/// Descending score order with NaN sorted last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
