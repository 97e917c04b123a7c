use std::collections::BTreeSet;

const MIN_TOKEN_CHARS: usize = 3;
const STOPWORDS: &[&str] = &[
	"and", "are", "but", "can", "for", "from", "has", "have", "into", "its", "not", "our", "that",
	"the", "their", "them", "this", "was", "were", "will", "with", "you", "your",
];

/// Lowercases and folds every non-alphanumeric character to a single space.
pub fn normalize_term(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	let mut pending_space = false;

	for ch in raw.chars() {
		if ch.is_alphanumeric() {
			if pending_space && !out.is_empty() {
				out.push(' ');
			}

			pending_space = false;

			out.extend(ch.to_lowercase());
		} else {
			pending_space = true;
		}
	}

	out
}

pub fn terms_match(left: &str, right: &str) -> bool {
	let left = normalize_term(left);
	let right = normalize_term(right);

	!left.is_empty() && left == right
}

/// Loose domain comparison: equal after normalization, or one side contains the other as a
/// whole-word phrase ("fintech" matches "fintech payments").
pub fn phrases_overlap(left: &str, right: &str) -> bool {
	let left = normalize_term(left);
	let right = normalize_term(right);

	if left.is_empty() || right.is_empty() {
		return false;
	}
	if left == right {
		return true;
	}

	let padded_left = format!(" {left} ");
	let padded_right = format!(" {right} ");

	padded_left.contains(&padded_right) || padded_right.contains(&padded_left)
}

pub fn tokenize(text: &str) -> BTreeSet<String> {
	normalize_term(text)
		.split(' ')
		.filter(|token| {
			token.chars().count() >= MIN_TOKEN_CHARS || token.chars().all(|ch| ch.is_ascii_digit())
		})
		.filter(|token| !token.is_empty() && !STOPWORDS.contains(token))
		.map(str::to_string)
		.collect()
}

/// Truncates to at most `max_chars` characters without splitting a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	match text.char_indices().nth(max_chars) {
		Some((byte_idx, _)) => text[..byte_idx].to_string(),
		None => text.to_string(),
	}
}
