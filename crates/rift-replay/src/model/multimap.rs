//! Ordered multimap with case-insensitive (lower-cased) keys.
//!
//! Used for both query parameters and request headers. Entries keep their
//! encounter order, and a key may repeat.

/// Ordered multimap whose keys are normalized to lower case on insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multimap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for Multimap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V> Multimap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: V) {
        self.entries.push((key.as_ref().to_lowercase(), value));
    }

    /// All values stored under `key`, in encounter order.
    pub fn get_all<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a V> + 'a {
        let key = key.to_lowercase();
        self.entries
            .iter()
            .filter(move |(k, _)| *k == key)
            .map(|(_, v)| v)
    }

    pub fn first(&self, key: &str) -> Option<&V> {
        self.get_all(key).next()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.first(key).is_some()
    }

    /// Distinct keys in first-encounter order.
    pub fn keys(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for (k, _) in &self.entries {
            if !seen.contains(&k.as_str()) {
                seen.push(k);
            }
        }
        seen
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V> FromIterator<(K, V)> for Multimap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Multimap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}
