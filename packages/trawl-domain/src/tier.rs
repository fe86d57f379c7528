use crate::{
	entity::QueryEntity,
	links,
	model::{Source, Tier},
	text,
};

/// Government bodies, class societies, and equipment makers.
const AUTHORITATIVE_DOMAINS: [&str; 30] = [
	"imo.org",
	"europa.eu",
	"uscg.mil",
	"iacs.org.uk",
	"dnv.com",
	"lr.org",
	"eagle.org",
	"classnk.or.jp",
	"classnk.com",
	"bureauveritas.com",
	"veristar.com",
	"gc.ca",
	"rina.org",
	"krs.co.kr",
	"ccs.org.cn",
	"irclass.org",
	"prs.pl",
	"crs.hr",
	"man-es.com",
	"wartsila.com",
	"rolls-royce.com",
	"kongsberg.com",
	"cat.com",
	"caterpillar.com",
	"abb.com",
	"alfalaval.com",
	"mitsubishi-heavy.com",
	"hd-hyundai.com",
	"winterthurgd.com",
	"yanmar.com",
];
/// Vessel registries, trackers, and trade press.
const INDUSTRY_DOMAINS: [&str; 24] = [
	"equasis.org",
	"marinetraffic.com",
	"vesselfinder.com",
	"myshiptracking.com",
	"fleetmon.com",
	"vesseltracker.com",
	"balticshipping.com",
	"shipspotting.com",
	"magicport.ai",
	"shipvault.com",
	"maritime-executive.com",
	"splash247.com",
	"tradewindsnews.com",
	"lloydslist.com",
	"lloydslistintelligence.com",
	"safety4sea.com",
	"offshore-energy.biz",
	"marinelink.com",
	"hellenicshippingnews.com",
	"seatrade-maritime.com",
	"gcaptain.com",
	"rivieramm.com",
	"clarksons.com",
	"shipfinder.org",
];
/// Subset of industry domains that index vessels by registry number.
const REGISTRY_DOMAINS: [&str; 9] = [
	"equasis.org",
	"marinetraffic.com",
	"vesselfinder.com",
	"myshiptracking.com",
	"fleetmon.com",
	"vesseltracker.com",
	"balticshipping.com",
	"magicport.ai",
	"shipvault.com",
];
const ERROR_MARKERS: [&str; 12] = [
	"404 not found",
	"page not found",
	"page cannot be found",
	"access denied",
	"403 forbidden",
	"internal server error",
	"service unavailable",
	"enable javascript",
	"please enable cookies",
	"are you a robot",
	"captcha",
	"just a moment",
];
const MIN_CONTENT_CHARS: usize = 40;

pub fn is_authoritative_host(host: &str) -> bool {
	is_government_host(host)
		|| AUTHORITATIVE_DOMAINS.iter().any(|domain| links::host_matches(host, domain))
}

pub fn is_industry_host(host: &str) -> bool {
	INDUSTRY_DOMAINS.iter().any(|domain| links::host_matches(host, domain))
}

pub fn is_registry_host(host: &str) -> bool {
	REGISTRY_DOMAINS.iter().any(|domain| links::host_matches(host, domain))
}

/// Near-empty text or an error/bot-wall page.
pub fn is_low_quality(content: &str) -> bool {
	let trimmed = content.trim();

	if trimmed.chars().count() < MIN_CONTENT_CHARS {
		return true;
	}

	let lower = trimmed.to_lowercase();

	ERROR_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Relevance check used for tiering. Without an entity every source is on topic.
pub fn is_on_topic(source: &Source, entity: Option<&QueryEntity>) -> bool {
	let Some(entity) = entity else { return true };

	if entity.tokens.is_empty() {
		return true;
	}

	let haystack = format!("{} {} {}", source.title, source.content, source.url).to_lowercase();

	if entity.identifier {
		return haystack.contains(&entity.phrase);
	}

	let source_tokens = text::tokenize(&haystack);

	entity.tokens.iter().any(|token| source_tokens.contains(token))
}

pub fn assign_tier(source: &Source, entity: Option<&QueryEntity>) -> Tier {
	let Some(host) = links::host_of(&source.url) else { return Tier::T3 };

	if is_low_quality(&source.content) || !is_on_topic(source, entity) {
		return Tier::T3;
	}
	if is_authoritative_host(&host) {
		return Tier::T1;
	}
	if is_industry_host(&host) {
		return Tier::T2;
	}

	Tier::T3
}

fn is_government_host(host: &str) -> bool {
	let labels: Vec<&str> = host.split('.').collect();
	let Some(last) = labels.last() else { return false };

	if matches!(*last, "gov" | "mil") {
		return true;
	}

	// `gov.uk` and `www.gov.uk` (after prefix stripping) have only two labels.
	labels.len() >= 2
		&& labels[..labels.len() - 1].iter().any(|label| matches!(*label, "gov" | "govt" | "gouv" | "gob" | "go"))
		&& last.len() == 2
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::entity;

	const GOOD_CONTENT: &str =
		"Ever Given is a Golden-class container ship with a gross tonnage of 219,079.";

	fn source(url: &str, content: &str) -> Source {
		Source::new(url, "Ever Given particulars", content, Some(0.8))
	}

	#[test]
	fn class_society_with_content_is_t1() {
		assert_eq!(assign_tier(&source("https://www.dnv.com/vessel/123", GOOD_CONTENT), None), Tier::T1);
	}

	#[test]
	fn government_hosts_are_authoritative() {
		assert!(is_authoritative_host("www.dft.gov.uk"));
		assert!(is_authoritative_host("navcen.uscg.gov"));
		assert!(is_authoritative_host("mpa.gov.sg"));
		assert!(is_authoritative_host("gov.uk"));
		assert!(is_authoritative_host("gov.sg"));
		assert!(is_authoritative_host("gov.au"));
		assert!(!is_authoritative_host("go.com"));
		assert!(!is_authoritative_host("government-news.com"));
	}

	#[test]
	fn apex_government_portal_is_t1() {
		let page = source(
			"https://www.gov.uk/guidance/ship-registration",
			"Ever Given style container ships registered under the UK flag: registration guidance.",
		);

		assert_eq!(assign_tier(&page, None), Tier::T1);
	}

	#[test]
	fn registry_with_content_is_t2() {
		assert_eq!(
			assign_tier(&source("https://www.marinetraffic.com/en/ais/details", GOOD_CONTENT), None),
			Tier::T2
		);
	}

	#[test]
	fn authoritative_error_page_downgrades_to_t3() {
		let page = "404 Not Found. The page you requested could not be located on this server.";

		assert_eq!(assign_tier(&source("https://www.dnv.com/missing", page), None), Tier::T3);
		assert_eq!(assign_tier(&source("https://www.dnv.com/empty", ""), None), Tier::T3);
	}

	#[test]
	fn off_topic_authoritative_content_downgrades_to_t3() {
		let entity = entity::extract_query_entity("MSC Oscar tonnage");
		let off_topic = source(
			"https://www.lr.org/rules",
			"Rules and regulations for the classification of offshore units, updated annually.",
		);
		let off_topic = Source { title: "Rules".to_string(), ..off_topic };

		assert_eq!(assign_tier(&off_topic, entity.as_ref()), Tier::T3);
	}

	#[test]
	fn unknown_domains_are_t3() {
		assert_eq!(assign_tier(&source("https://blog.someone.net/post", GOOD_CONTENT), None), Tier::T3);
	}
}
