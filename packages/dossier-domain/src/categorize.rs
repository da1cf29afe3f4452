use std::collections::BTreeMap;

use crate::evidence::EvidenceSource;

/// Stable partition of ranked evidence into category buckets. The label
/// function is the pluggable strategy point; bucket keys come out sorted and
/// sources keep their ranked order inside each bucket.
pub fn categorize<F>(sources: &[EvidenceSource], mut label: F) -> BTreeMap<String, Vec<String>>
where
	F: FnMut(&EvidenceSource) -> String,
{
	let mut categories: BTreeMap<String, Vec<String>> = BTreeMap::new();

	for source in sources {
		categories.entry(label(source)).or_default().push(source.id.clone());
	}

	categories
}
