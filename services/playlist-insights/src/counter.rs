//!
//! src/counter.rs
//!
//! Insertion-ordered tally used by every ranking on the dashboard.
//! Ties in `most_common` keep first-encountered order.
//!

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct Counter<K> {
    index: HashMap<K, usize>,
    slots: Vec<(K, u64)>,
}

impl<K> Default for Counter<K> {
    fn default() -> Self {
        Self { index: HashMap::new(), slots: Vec::new() }
    }
}

impl<K: Eq + Hash + Clone> Counter<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, amount: u64) {
        match self.index.get(&key) {
            Some(&slot) => self.slots[slot].1 += amount,
            None => {
                self.index.insert(key.clone(), self.slots.len());
                self.slots.push((key, amount));
            }
        }
    }

    pub fn get(&self, key: &K) -> u64 {
        self.index.get(key).map(|&slot| self.slots[slot].1).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.slots.iter().map(|(k, n)| (k, *n))
    }

    /// Highest count; the earliest key wins a tie.
    pub fn top(&self) -> Option<(&K, u64)> {
        let mut best: Option<(&K, u64)> = None;
        for (key, count) in self.iter() {
            match best {
                Some((_, n)) if n >= count => {}
                _ => best = Some((key, count)),
            }
        }
        best
    }

    pub fn most_common(&self, k: usize) -> Vec<(K, u64)> {
        let mut ranked: Vec<&(K, u64)> = self.slots.iter().collect();
        // sort_by is stable, so equal counts stay in insertion order
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter()
            .take(k)
            .map(|(key, n)| (key.clone(), *n))
            .collect()
    }
}
