use std::collections::{VecDeque, vec_deque};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fixed-capacity FIFO. Pushing onto a full ring evicts the oldest item. Serializes as a plain
/// sequence, oldest first; a longer sequence keeps only its newest `N` items when decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedRing<T, const N: usize> {
	items: VecDeque<T>,
}
impl<T, const N: usize> BoundedRing<T, N> {
	pub const CAPACITY: usize = N;

	pub fn new() -> Self {
		Self { items: VecDeque::with_capacity(N) }
	}

	/// Returns the evicted item, if any.
	pub fn push(&mut self, item: T) -> Option<T> {
		if N == 0 {
			return Some(item);
		}

		let evicted = if self.items.len() == N { self.items.pop_front() } else { None };

		self.items.push_back(item);

		evicted
	}

	pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
		self.items.retain(keep);
	}

	pub fn iter(&self) -> vec_deque::Iter<'_, T> {
		self.items.iter()
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}
impl<T, const N: usize> Default for BoundedRing<T, N> {
	fn default() -> Self {
		Self::new()
	}
}
impl<T, const N: usize> IntoIterator for BoundedRing<T, N> {
	type IntoIter = vec_deque::IntoIter<T>;
	type Item = T;

	fn into_iter(self) -> Self::IntoIter {
		self.items.into_iter()
	}
}
impl<T, const N: usize> From<Vec<T>> for BoundedRing<T, N> {
	fn from(items: Vec<T>) -> Self {
		let mut ring = Self::new();

		for item in items {
			ring.push(item);
		}

		ring
	}
}
impl<T, const N: usize> Serialize for BoundedRing<T, N>
where
	T: Serialize,
{
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_seq(self.items.iter())
	}
}
impl<'de, T, const N: usize> Deserialize<'de> for BoundedRing<T, N>
where
	T: Deserialize<'de>,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		Vec::<T>::deserialize(deserializer).map(Self::from)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn evicts_oldest_when_full() {
		let mut ring = BoundedRing::<u32, 3>::new();

		assert_eq!(ring.push(1), None);
		assert_eq!(ring.push(2), None);
		assert_eq!(ring.push(3), None);
		assert_eq!(ring.push(4), Some(1));
		assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
	}

	#[test]
	fn decoding_an_oversized_list_keeps_the_newest() {
		let ring: BoundedRing<u32, 20> =
			serde_json::from_str(&serde_json::to_string(&(0..25).collect::<Vec<u32>>()).expect("encode"))
				.expect("decode");

		assert_eq!(ring.len(), 20);
		assert_eq!(ring.iter().next(), Some(&5));
		assert_eq!(serde_json::to_value(&ring).expect("encode")[19], 24);
	}
}
