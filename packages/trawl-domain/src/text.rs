use ahash::AHashSet;
use unicode_normalization::UnicodeNormalization;

const STOPWORDS: [&str; 32] = [
	"a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "is", "it", "of",
	"on", "or", "the", "to", "vs", "what", "when", "where", "which", "who", "why", "with", "about",
	"does", "do", "me", "tell",
];

/// Lowercase, trim, and collapse internal whitespace. Two sub-queries are duplicates when this
/// yields the same string.
pub fn normalize_query(query: &str) -> String {
	query.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Normalization used for cache keys: NFKC plus [`normalize_query`], without trailing
/// punctuation.
pub fn normalize_for_key(query: &str) -> String {
	let composed: String = query.nfkc().collect();
	let normalized = normalize_query(&composed);

	normalized.trim_end_matches(['?', '.', '!', ',', ';', ':']).trim_end().to_string()
}

pub fn tokenize(text: &str) -> Vec<String> {
	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars() {
		if ch.is_alphanumeric() {
			normalized.extend(ch.to_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	let mut out = Vec::new();
	let mut seen = AHashSet::new();

	for token in normalized.split_whitespace() {
		if token.chars().count() < 2 {
			continue;
		}
		if seen.insert(token.to_string()) {
			out.push(token.to_string());
		}
	}

	out
}

pub fn content_tokens(text: &str) -> Vec<String> {
	tokenize(text).into_iter().filter(|token| !STOPWORDS.contains(&token.as_str())).collect()
}

pub fn jaccard(a: &[String], b: &[String]) -> f32 {
	if a.is_empty() || b.is_empty() {
		return 0.0;
	}

	let left: AHashSet<&str> = a.iter().map(String::as_str).collect();
	let right: AHashSet<&str> = b.iter().map(String::as_str).collect();
	let intersection = left.intersection(&right).count();
	let union = left.union(&right).count();

	if union == 0 { 0.0 } else { intersection as f32 / union as f32 }
}

const ELLIPSIS: &str = "...";

/// At most `max_chars` characters, the trailing ellipsis included.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}
	if max_chars <= ELLIPSIS.len() {
		return text.chars().take(max_chars).collect();
	}

	let mut out: String = text.chars().take(max_chars - ELLIPSIS.len()).collect();

	out.push_str(ELLIPSIS);

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalize_query_collapses_case_and_whitespace() {
		assert_eq!(normalize_query("  MV  Ever\tGiven  "), "mv ever given");
	}

	#[test]
	fn key_normalization_drops_trailing_punctuation() {
		assert_eq!(normalize_for_key("Ever Given specs?"), "ever given specs");
		assert_eq!(normalize_for_key("ｅｖｅｒ given"), "ever given");
	}

	#[test]
	fn content_tokens_skip_stopwords() {
		assert_eq!(content_tokens("What is the IMO of Ever Given"), vec!["imo", "ever", "given"]);
	}

	#[test]
	fn truncation_marks_cut_text() {
		assert_eq!(truncate_chars("abcdefgh", 6), "abc...");
		assert_eq!(truncate_chars("abc", 3), "abc");
		assert_eq!(truncate_chars("abcdef", 2), "ab");
		assert_eq!(truncate_chars("船舶登録情報です", 5).chars().count(), 5);
	}
}
