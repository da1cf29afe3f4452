mod categorize;
mod citation;
mod evidence;
mod language;
mod snippet;

pub use categorize::categorize;
pub use citation::{Citation, CitationTracker, extract_markers, unknown_markers};
pub use evidence::{EvidenceSource, Origin, merge_ranked};
pub use language::detect_language;
pub use snippet::clean_snippet;
