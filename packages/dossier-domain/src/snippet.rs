use unicode_segmentation::UnicodeSegmentation;

/// Collapses whitespace runs and truncates to at most `max_graphemes`
/// grapheme clusters, never splitting a cluster. Truncated text gets an
/// ellipsis appended.
pub fn clean_snippet(text: &str, max_graphemes: usize) -> String {
	let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

	match collapsed.grapheme_indices(true).nth(max_graphemes) {
		Some((byte_idx, _)) => {
			let mut truncated = collapsed[..byte_idx].trim_end().to_string();

			truncated.push('…');

			truncated
		},
		None => collapsed,
	}
}
