use crate::{links, model::Source, tier};

const MARITIME_KEYWORDS: [&str; 22] = [
	"vessel",
	"ship",
	"imo",
	"mmsi",
	"maritime",
	"marine",
	"tonnage",
	"deadweight",
	"dwt",
	"flag",
	"hull",
	"shipping",
	"port of registry",
	"call sign",
	"shipyard",
	"classification",
	"tanker",
	"bulk carrier",
	"container",
	"offshore",
	"fleet",
	"ais",
];

/// True when a source looks like maritime material by domain or vocabulary.
pub fn has_maritime_signal(source: &Source) -> bool {
	if let Some(host) = links::host_of(&source.url)
		&& (tier::is_industry_host(&host) || tier::is_authoritative_host(&host))
	{
		return true;
	}

	let haystack = format!("{} {} {}", source.url, source.title, source.content).to_lowercase();

	MARITIME_KEYWORDS.iter().any(|keyword| contains_word(&haystack, keyword))
}

fn contains_word(haystack: &str, needle: &str) -> bool {
	haystack.match_indices(needle).any(|(start, _)| {
		let before = haystack[..start].chars().next_back();
		let after = haystack[start + needle.len()..].chars().next();

		!before.map(char::is_alphanumeric).unwrap_or(false)
			&& !after.map(char::is_alphanumeric).unwrap_or(false)
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registry_domains_count_as_maritime() {
		let source = Source::new("https://www.vesselfinder.com/x", "Result", "", None);

		assert!(has_maritime_signal(&source));
	}

	#[test]
	fn keywords_match_whole_words_only() {
		let maritime = Source::new("https://news.net/a", "Bulk carrier sold", "The vessel", None);
		let unrelated = Source::new("https://news.net/b", "Said ships? no", "Relationship advice", None);
		let unrelated = Source { title: "Daily digest".to_string(), ..unrelated };

		assert!(has_maritime_signal(&maritime));
		assert!(!has_maritime_signal(&unrelated));
	}
}
