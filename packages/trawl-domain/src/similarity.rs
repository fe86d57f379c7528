/// Cosine similarity. Zero when the vectors differ in length or either norm is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (x, y) in a.iter().zip(b) {
		let (x, y) = (f64::from(*x), f64::from(*y));

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	(dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn self_similarity_is_one() {
		let v = [0.3, -1.2, 4.0, 0.01];

		assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
	}

	#[test]
	fn orthogonal_vectors_are_zero() {
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 2.0]), 0.0);
	}

	#[test]
	fn zero_norm_and_mismatched_lengths_are_zero() {
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
		assert_eq!(cosine_similarity(&[1.0], &[1.0, 1.0]), 0.0);
	}
}
