use std::net::{IpAddr, Ipv4Addr};

use url::{Host, Url};

pub const REDIRECT_HOST: &str = "vertexaisearch.cloud.google.com";

const TRACKING_PARAMS: [&str; 12] = [
	"gclid", "fbclid", "msclkid", "mc_cid", "mc_eid", "igshid", "ref", "ref_src", "_ga", "_gl",
	"yclid", "spm",
];
const LOCALES: [&str; 24] = [
	"en", "de", "fr", "es", "it", "nl", "pt", "ru", "ja", "zh", "ko", "no", "nb", "sv", "da", "fi",
	"pl", "tr", "el", "ar", "cn", "jp", "kr", "intl",
];
const PLACEHOLDER_HOSTS: [&str; 5] =
	["example.com", "example.org", "example.net", "test.com", "domain.com"];
const LISTING_PATHS: [&str; 6] = ["/search", "/results", "/tag", "/tags", "/category", "/find"];

/// Deduplication key for a URL: host without `www.`/locale labels, path without locale segments,
/// query without tracking parameters. Scheme and fragment never take part in the key.
pub fn normalize_url_key(raw: &str) -> String {
	let trimmed = raw.trim();
	let Ok(url) = Url::parse(trimmed) else { return trimmed.to_lowercase() };
	let Some(host) = url.host_str() else { return trimmed.to_lowercase() };
	let mut key = strip_host_prefixes(&host.to_lowercase());

	if let Some(port) = url.port() {
		key.push(':');
		key.push_str(&port.to_string());
	}

	let segments: Vec<&str> = url
		.path_segments()
		.map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
		.unwrap_or_default();
	let mut first = true;

	for segment in segments {
		if first && is_locale(&segment.to_lowercase()) {
			first = false;

			continue;
		}

		first = false;

		key.push('/');
		key.push_str(segment);
	}

	let mut params: Vec<(String, String)> = url
		.query_pairs()
		.filter(|(name, _)| !is_tracking_param(name))
		.map(|(name, value)| (name.into_owned(), value.into_owned()))
		.collect();

	params.sort();

	if !params.is_empty() {
		key.push('?');

		let joined: Vec<String> = params
			.iter()
			.map(|(name, value)| if value.is_empty() { name.clone() } else { format!("{name}={value}") })
			.collect();

		key.push_str(&joined.join("&"));
	}

	key
}

/// Lowercased host with `www.`/`m.` and locale labels removed.
pub fn host_of(raw: &str) -> Option<String> {
	let url = Url::parse(raw.trim()).ok()?;
	let host = url.host_str()?;

	Some(strip_host_prefixes(&host.to_lowercase()))
}

/// True when `host` is `domain` or a subdomain of it.
pub fn host_matches(host: &str, domain: &str) -> bool {
	host == domain
		|| host.len() > domain.len()
			&& host.ends_with(domain)
			&& host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

pub fn is_redirect_url(raw: &str) -> bool {
	Url::parse(raw.trim())
		.ok()
		.and_then(|url| url.host_str().map(|host| host.eq_ignore_ascii_case(REDIRECT_HOST)))
		.unwrap_or(false)
}

/// Accepts public http(s) URLs that point at a concrete page.
pub fn is_valid_source_url(raw: &str) -> bool {
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return false;
	}

	let Ok(url) = Url::parse(trimmed) else { return false };

	if !matches!(url.scheme(), "http" | "https") {
		return false;
	}

	match url.host() {
		Some(Host::Domain(domain)) => {
			let domain = domain.to_lowercase();

			if domain == "localhost"
				|| domain.ends_with(".localhost")
				|| domain.ends_with(".local")
				|| domain.ends_with(".internal")
				|| !domain.contains('.')
			{
				return false;
			}
			if PLACEHOLDER_HOSTS.iter().any(|placeholder| host_matches(&domain, placeholder)) {
				return false;
			}
		},
		Some(Host::Ipv4(ip)) =>
			if !is_public_ip(IpAddr::V4(ip)) {
				return false;
			},
		Some(Host::Ipv6(ip)) =>
			if !is_public_ip(IpAddr::V6(ip)) {
				return false;
			},
		None => return false,
	}

	!is_generic_listing(&url)
}

fn is_generic_listing(url: &Url) -> bool {
	let path = url.path().trim_end_matches('/').to_lowercase();

	if LISTING_PATHS.iter().any(|listing| path == *listing) {
		return true;
	}

	let has_search_param = url.query_pairs().any(|(name, _)| name == "q" || name == "query");

	has_search_param && (path.is_empty() || path.ends_with("/search"))
}

fn is_public_ip(ip: IpAddr) -> bool {
	match ip {
		IpAddr::V4(v4) => is_public_ipv4(v4),
		IpAddr::V6(v6) => {
			if let Some(mapped) = v6.to_ipv4_mapped() {
				return is_public_ipv4(mapped);
			}

			let first = v6.segments()[0];

			!(v6.is_loopback()
				|| v6.is_unspecified()
				|| (first & 0xfe00) == 0xfc00
				|| (first & 0xffc0) == 0xfe80)
		},
	}
}

fn is_public_ipv4(v4: Ipv4Addr) -> bool {
	let [a, b, ..] = v4.octets();
	// 100.64.0.0/10, carrier-grade NAT.
	let shared = a == 100 && (b & 0xc0) == 64;

	!(v4.is_loopback()
		|| v4.is_private()
		|| v4.is_link_local()
		|| v4.is_unspecified()
		|| v4.is_broadcast()
		|| v4.is_documentation()
		|| shared)
}

fn strip_host_prefixes(host: &str) -> String {
	let mut host = host.trim_end_matches('.');

	for prefix in ["www.", "m."] {
		if let Some(rest) = host.strip_prefix(prefix) {
			host = rest;
		}
	}

	let labels: Vec<&str> = host.split('.').collect();

	if labels.len() >= 3 && is_locale(labels[0]) {
		return labels[1..].join(".");
	}

	host.to_string()
}

fn is_locale(segment: &str) -> bool {
	let mut parts = segment.splitn(2, ['-', '_']);
	let language = parts.next().unwrap_or_default();
	let region_ok = parts
		.next()
		.map(|region| region.len() == 2 && region.chars().all(|ch| ch.is_ascii_alphabetic()))
		.unwrap_or(true);

	region_ok && LOCALES.contains(&language)
}

fn is_tracking_param(name: &str) -> bool {
	let lower = name.to_ascii_lowercase();

	lower.starts_with("utm_") || TRACKING_PARAMS.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tracking_params_and_www_share_a_key() {
		assert_eq!(normalize_url_key("https://a.com?utm_source=x"), normalize_url_key("https://www.a.com"));
		assert_eq!(normalize_url_key("https://www.a.com"), "a.com");
	}

	#[test]
	fn locale_segments_are_stripped() {
		assert_eq!(
			normalize_url_key("https://en.dnv.com/en-us/rules/?gclid=1#top"),
			normalize_url_key("http://dnv.com/rules")
		);
	}

	#[test]
	fn meaningful_query_params_survive_in_sorted_order() {
		assert_eq!(normalize_url_key("https://a.com/p?b=2&a=1&utm_medium=x"), "a.com/p?a=1&b=2");
	}

	#[test]
	fn host_matching_respects_label_boundaries() {
		assert!(host_matches("rules.dnv.com", "dnv.com"));
		assert!(host_matches("dnv.com", "dnv.com"));
		assert!(!host_matches("notdnv.com", "dnv.com"));
	}

	#[test]
	fn rejects_local_placeholder_and_listing_urls() {
		assert!(!is_valid_source_url(""));
		assert!(!is_valid_source_url("http://localhost:8080/page"));
		assert!(!is_valid_source_url("http://192.168.1.10/page"));
		assert!(!is_valid_source_url("https://example.com/vessel"));
		assert!(!is_valid_source_url("https://www.google.com/search?q=ship"));
		assert!(!is_valid_source_url("ftp://files.dnv.com/a"));
		assert!(is_valid_source_url("https://www.dnv.com/rules/ships"));
		assert!(is_valid_source_url("https://8.8.8.8/status"));
	}

	#[test]
	fn rejects_internal_addresses_in_any_form() {
		assert!(!is_valid_source_url("http://[fe80::1]/page"));
		assert!(!is_valid_source_url("http://[::ffff:127.0.0.1]/page"));
		assert!(!is_valid_source_url("http://[::ffff:10.0.0.1]/page"));
		assert!(!is_valid_source_url("http://[fd00::1]/page"));
		assert!(!is_valid_source_url("http://100.64.0.1/page"));
		assert!(!is_valid_source_url("http://100.127.255.254/page"));
		assert!(is_valid_source_url("http://100.128.0.1/page"));
		assert!(is_valid_source_url("http://[2606:4700::1111]/page"));
		assert!(is_valid_source_url("http://[::ffff:8.8.8.8]/page"));
	}

	#[test]
	fn detects_redirector_urls() {
		assert!(is_redirect_url(
			"https://vertexaisearch.cloud.google.com/grounding-api-redirect/AbC123"
		));
		assert!(!is_redirect_url("https://www.dnv.com"));
	}
}
