//! This module provides `SyntheticNamespace`, the label allocator used by conversions.
//!
//! A conversion invents states and symbols that have no counterpart in its source machine.
//! Every such label is declared under a composite key (a path of string parts, built with
//! [`key!`](crate::key)). Labels are unique within one namespace: a base label that is already
//! taken is extended with a marker until it is free, and a key that was declared before
//! resolves to the label it got the first time.

use std::collections::{BTreeMap, BTreeSet};

/// A composite namespace key.
pub type Key = Vec<String>;

/// The marker appended to a base label until it no longer collides.
pub const DEFAULT_MARKER: &str = "'";

/// Builds a [`Key`] from any number of displayable parts.
///
/// # Example
///
/// ```
/// use automata::key;
///
/// let state = "q1";
/// assert_eq!(key!["carry", state, 2], vec!["carry", "q1", "2"]);
/// ```
#[macro_export]
macro_rules! key {
    ($($part:expr),* $(,)?) => {
        vec![$(($part).to_string()),*]
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntheticNamespace {
    labels: BTreeMap<Key, String>,
    issued: BTreeSet<String>,
}

impl SyntheticNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a label that should be kept verbatim, such as a state of the source machine.
    ///
    /// Reserved labels are only kept verbatim while they are free, so reservations come first.
    pub fn reserve(&mut self, key: Key, label: &str) -> String {
        self.declare(key, label)
    }

    /// Reserves every label of `labels` under `prefix` followed by the label itself.
    pub fn reserve_all<'a, I>(&mut self, prefix: &str, labels: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for label in labels {
            self.reserve(vec![prefix.to_string(), label.clone()], label);
        }
    }

    /// Allocates a label for `key`, starting from `base` and appending [`DEFAULT_MARKER`] on
    /// collision.
    ///
    /// # Returns
    ///
    /// * The label allocated for `key`, which is the memoized one if `key` was declared before.
    pub fn declare(&mut self, key: Key, base: &str) -> String {
        self.declare_with(key, base, DEFAULT_MARKER)
    }

    /// Allocates a label for `key` like [`declare`](Self::declare), with a custom marker.
    pub fn declare_with(&mut self, key: Key, base: &str, marker: &str) -> String {
        if let Some(label) = self.labels.get(&key) {
            return label.clone();
        }

        let marker = if marker.is_empty() { DEFAULT_MARKER } else { marker };
        let mut label = base.to_string();
        while self.issued.contains(&label) {
            label.push_str(marker);
        }

        self.issued.insert(label.clone());
        self.labels.insert(key, label.clone());
        label
    }

    /// Declares one label per element of the cartesian product of `domains`.
    ///
    /// # Arguments
    ///
    /// * `prefix` - The key parts shared by every declared label.
    /// * `domains` - The key domains. Each tuple of the product is appended to `prefix`.
    /// * `format` - Builds the base label of a tuple.
    ///
    /// # Returns
    ///
    /// * The labels, in the order of the product.
    pub fn declare_product<F>(&mut self, prefix: &[String], domains: &[Vec<String>], format: F) -> Vec<String>
    where
        F: Fn(&[String]) -> String,
    {
        product(domains)
            .into_iter()
            .map(|tuple| {
                let base = format(&tuple);
                let mut key = prefix.to_vec();
                key.extend(tuple);
                self.declare(key, &base)
            })
            .collect()
    }

    /// Looks up the label allocated for `key`.
    pub fn get(&self, key: &[String]) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// The labels of every key starting with `prefix`, in key order.
    pub fn family(&self, prefix: &[String]) -> Vec<&str> {
        self.labels
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, label)| label.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// The cartesian product of `domains`, with the first domain varying slowest.
pub fn product<T: Clone>(domains: &[Vec<T>]) -> Vec<Vec<T>> {
    domains.iter().fold(vec![Vec::new()], |tuples, domain| {
        tuples
            .iter()
            .flat_map(|tuple| {
                domain.iter().map(move |part| {
                    let mut next = tuple.clone();
                    next.push(part.clone());
                    next
                })
            })
            .collect()
    })
}

/// Every subset of `items`, ordered by bitmask over the sorted items.
pub fn subsets<T: Ord + Clone>(items: &BTreeSet<T>) -> Vec<BTreeSet<T>> {
    let items: Vec<&T> = items.iter().collect();
    (0..1usize << items.len())
        .map(|mask| {
            items
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask >> bit & 1 == 1)
                .map(|(_, item)| (*item).clone())
                .collect()
        })
        .collect()
}

/// The first `n` primes.
pub fn primes(n: usize) -> Vec<u64> {
    let mut found: Vec<u64> = Vec::with_capacity(n);
    let mut candidate = 2;
    while found.len() < n {
        if found.iter().all(|p| candidate % p != 0) {
            found.push(candidate);
        }
        candidate += 1;
    }
    found
}
