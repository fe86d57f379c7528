use crate::model::{Confidence, ConfidenceLabel, Source, TierCounts};

const BASE_SCORE: i32 = 50;
const T1_BONUS: i32 = 40;
const T2_BONUS: i32 = 20;
const STRONG_CORROBORATION_BONUS: i32 = 10;
const WEAK_CORROBORATION_BONUS: i32 = 5;
const ONLY_T3_PENALTY: i32 = 10;
const FEW_SOURCES_PENALTY: i32 = 20;

pub fn calculate_confidence(sources: &[Source]) -> Confidence {
	score_tier_counts(TierCounts::from_sources(sources))
}

/// Scores a tier histogram. Sources without a tier count as T3.
pub fn score_tier_counts(counts: TierCounts) -> Confidence {
	let total = counts.total();

	if total == 0 {
		return Confidence {
			score: 0,
			label: ConfidenceLabel::Low,
			tier_counts: counts,
			reasoning: "No sources found.".to_string(),
		};
	}

	let mut score = BASE_SCORE;
	let mut reasons = Vec::new();

	if counts.t1 > 0 {
		score += T1_BONUS;

		reasons.push(format!("{} authoritative (T1) source(s)", counts.t1));
	}
	if counts.t2 > 0 {
		score += T2_BONUS;

		reasons.push(format!("{} industry/registry (T2) source(s)", counts.t2));
	}
	if total >= 5 {
		score += STRONG_CORROBORATION_BONUS;

		reasons.push(format!("corroborated by {total} sources"));
	} else if total >= 3 {
		score += WEAK_CORROBORATION_BONUS;

		reasons.push(format!("partially corroborated by {total} sources"));
	}
	if counts.t1 == 0 && counts.t2 == 0 {
		score -= ONLY_T3_PENALTY;

		reasons.push("only unverified (T3) sources".to_string());
	}
	if total < 3 {
		score -= FEW_SOURCES_PENALTY;

		reasons.push(format!("only {total} source(s) found"));
	}

	let score = score.clamp(0, 100) as u8;
	let label = match score {
		80.. => ConfidenceLabel::High,
		50..=79 => ConfidenceLabel::Medium,
		_ => ConfidenceLabel::Low,
	};
	let mut reasoning = reasons.join("; ");

	if let Some(first) = reasoning.get_mut(0..1) {
		first.make_ascii_uppercase();
	}

	reasoning.push('.');

	Confidence { score, label, tier_counts: counts, reasoning }
}
