use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::text;

const MAX_CANONICAL_CHARS: usize = 64;

static IMO_RE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?i)\bIMO(?:\s*(?:no\.?|number|#))?[\s:#-]*(\d{7})\b").ok());
static MMSI_RE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r"(?i)\bMMSI[\s:#-]*(\d{9})\b").ok());
static NAME_FIELD_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"(?im)^\s*(?:entity|name|vessel|ship|company|equipment)\s*[:=]\s*(.+?)\s*$").ok()
});
static QUOTED_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r#""([^"]{2,80})""#).ok());
static CAPITALIZED_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(r"\b(?:[A-Z][A-Za-z0-9&'-]*|[A-Z]{2,})(?:\s+(?:[A-Z][A-Za-z0-9&'-]*|[A-Z]{2,}|\d+))+")
		.ok()
});
static VESSEL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"(?i)\b(vessel|ship|tanker|bulk\s*carrier|container\s*ship|lng\s*carrier|ferry|tug|barge|yacht|trawler|dredger|ro-?ro|m/?v|m/?t|imo\s*\d{7}|mmsi\s*\d{9})\b",
	)
	.ok()
});
static COMPANY_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"(?i)\b(company|ltd|limited|inc|corp|corporation|gmbh|asa|as|plc|llc|s\.?a\.?|shipping|lines|group|holdings|owner|operator|manager)\b",
	)
	.ok()
});
static EQUIPMENT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
	Regex::new(
		r"(?i)\b(engine|pump|compressor|generator|boiler|turbine|propeller|thruster|crane|winch|scrubber|ballast|purifier|separator|gearbox|model|part\s*number|man\s*b&w|wartsila|wärtsilä)\b",
	)
	.ok()
});

/// Broad category of the thing a query is about. Drives heuristic sub-query derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
	Vessel,
	Company,
	Equipment,
}

/// The phrase a query is about, used to weight source relevance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEntity {
	pub phrase: String,
	pub tokens: Vec<String>,
	/// The entity was an identifier number rather than a name.
	pub identifier: bool,
}

/// Stable fingerprint for an entity context. Registry numbers win over names; conversation text
/// never leaks into the key. Empty context yields `None`, meaning the global bucket.
pub fn canonical_entity_id(context: Option<&str>) -> Option<String> {
	let context = context?.trim();

	if context.is_empty() {
		return None;
	}
	if let Some(imo) = capture(&IMO_RE, context) {
		return Some(format!("imo:{imo}"));
	}
	if let Some(mmsi) = capture(&MMSI_RE, context) {
		return Some(format!("mmsi:{mmsi}"));
	}

	let name = capture(&NAME_FIELD_RE, context)
		.or_else(|| context.lines().map(str::trim).find(|line| !line.is_empty()).map(str::to_string))?;
	let canonical = canonicalize_name(&name);

	if canonical.is_empty() { None } else { Some(format!("name:{canonical}")) }
}

pub fn canonicalize_name(name: &str) -> String {
	let composed: String = name.nfkc().collect();
	let mut out = String::with_capacity(composed.len());
	let mut last_dash = true;

	for ch in composed.chars() {
		if ch.is_alphanumeric() {
			out.extend(ch.to_lowercase());

			last_dash = false;
		} else if !last_dash {
			out.push('-');

			last_dash = true;
		}
	}

	let trimmed = out.trim_matches('-');

	trimmed.chars().take(MAX_CANONICAL_CHARS).collect::<String>().trim_end_matches('-').to_string()
}

pub fn imo_number(text: &str) -> Option<String> {
	capture(&IMO_RE, text)
}

/// True when the text names a vessel by registry identifier.
pub fn has_vessel_identifier(text: &str) -> bool {
	is_match(&IMO_RE, text) || is_match(&MMSI_RE, text)
}

pub fn detect_kinds(text: &str) -> Vec<EntityKind> {
	let mut kinds = Vec::new();

	if is_match(&VESSEL_RE, text) {
		kinds.push(EntityKind::Vessel);
	}
	if is_match(&COMPANY_RE, text) {
		kinds.push(EntityKind::Company);
	}
	if is_match(&EQUIPMENT_RE, text) {
		kinds.push(EntityKind::Equipment);
	}

	kinds
}

/// Pulls the most specific entity out of a free-text query: a quoted phrase, then a registry
/// number, then a capitalized name run, then the remaining content words.
pub fn extract_query_entity(query: &str) -> Option<QueryEntity> {
	if let Some(phrase) = capture(&QUOTED_RE, query) {
		return Some(entity_from_phrase(&phrase));
	}
	if let Some(imo) = capture(&IMO_RE, query) {
		return Some(QueryEntity { phrase: imo.clone(), tokens: vec![imo], identifier: true });
	}
	if let Some(phrase) = longest_capitalized_run(query) {
		return Some(entity_from_phrase(&phrase));
	}

	let tokens = text::content_tokens(query);

	if tokens.is_empty() {
		return None;
	}

	Some(QueryEntity { phrase: tokens.join(" "), tokens, identifier: false })
}

fn entity_from_phrase(phrase: &str) -> QueryEntity {
	let phrase = text::normalize_query(phrase);
	let tokens = text::tokenize(&phrase);

	QueryEntity { phrase, tokens, identifier: false }
}

fn longest_capitalized_run(query: &str) -> Option<String> {
	let re = CAPITALIZED_RE.as_ref()?;

	re.find_iter(query)
		.map(|found| found.as_str().to_string())
		.filter(|phrase| !text::content_tokens(phrase).is_empty())
		.max_by_key(|phrase| phrase.len())
}

fn capture(re: &LazyLock<Option<Regex>>, text: &str) -> Option<String> {
	let re = re.as_ref()?;
	let caps = re.captures(text)?;

	caps.get(1).map(|m| m.as_str().trim().to_string()).filter(|value| !value.is_empty())
}

fn is_match(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
	re.as_ref().map(|re| re.is_match(text)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registry_numbers_win_over_names() {
		let ctx = "Vessel: Ever Given\nIMO 9811000\nUser asked about draft earlier.";

		assert_eq!(canonical_entity_id(Some(ctx)).as_deref(), Some("imo:9811000"));
	}

	#[test]
	fn names_are_canonicalized() {
		assert_eq!(
			canonical_entity_id(Some("Company: Maersk  Line A/S ")).as_deref(),
			Some("name:maersk-line-a-s")
		);
		assert_eq!(canonical_entity_id(Some("   ")), None);
		assert_eq!(canonical_entity_id(None), None);
	}

	#[test]
	fn same_entity_in_different_conversations_shares_an_id() {
		let first = canonical_entity_id(Some("name: Ever Given\nprevious turn: draft?"));
		let second = canonical_entity_id(Some("Name = EVER GIVEN\nprevious turn: owner?"));

		assert_eq!(first, second);
	}

	#[test]
	fn detects_vessel_identifiers() {
		assert!(has_vessel_identifier("IMO 9811000 particulars"));
		assert!(has_vessel_identifier("MMSI: 353136000"));
		assert!(!has_vessel_identifier("IMO regulations on ballast water"));
	}

	#[test]
	fn detects_entity_kinds() {
		assert_eq!(detect_kinds("Ever Given container ship"), vec![EntityKind::Vessel]);
		assert_eq!(detect_kinds("MAN B&W 6G70 engine manual"), vec![EntityKind::Equipment]);
		assert!(detect_kinds("Evergreen Marine Corp fleet").contains(&EntityKind::Company));
	}

	#[test]
	fn extracts_capitalized_entity_from_query() {
		let entity = extract_query_entity("what is the gross tonnage of Ever Given").expect("entity");

		assert_eq!(entity.phrase, "ever given");
		assert_eq!(entity.tokens, vec!["ever", "given"]);
	}

	#[test]
	fn quoted_phrases_take_precedence() {
		let entity = extract_query_entity("Find \"MSC Oscar\" specs for IMO 9703291").expect("entity");

		assert_eq!(entity.phrase, "msc oscar");
	}

	#[test]
	fn imo_numbers_are_identifier_entities() {
		let entity = extract_query_entity("particulars of imo 9703291").expect("entity");

		assert!(entity.identifier);
		assert_eq!(entity.phrase, "9703291");
	}
}
