//! Keyed URL/email tables with idempotent insertion.

use std::collections::HashMap;

use crate::record::UrlRecord;

/// A per-message keyed set of URLs.
///
/// Identity is the normalized URL text. Re-inserting an equal URL does not
/// duplicate the entry; it increments the existing entry's reference
/// count. Records are addressed by stable index so analyzers can annotate
/// them in place after insertion.
#[derive(Debug, Default)]
pub struct UrlTable {
    records: Vec<UrlRecord>,
    index: HashMap<String, usize>,
}

impl UrlTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `url` or bump the count of the existing equal entry.
    ///
    /// Returns the entry's index and whether it already existed.
    pub fn lookup_or_insert(&mut self, url: UrlRecord) -> (usize, bool) {
        if let Some(&existing) = self.index.get(url.text()) {
            self.records[existing].count += 1;
            return (existing, true);
        }
        let slot = self.records.len();
        self.index.insert(url.text().to_string(), slot);
        self.records.push(url);
        (slot, false)
    }

    pub fn get(&self, index: usize) -> Option<&UrlRecord> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut UrlRecord> {
        self.records.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UrlRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::UrlRecord;

    #[test]
    fn lookup_or_insert_is_idempotent_and_counts() {
        let mut table = UrlTable::new();
        let first = UrlRecord::parse("http://example.com/a").unwrap();
        let again = UrlRecord::parse("http://example.com/a").unwrap();
        let other = UrlRecord::parse("http://example.com/b").unwrap();

        let (i, existed) = table.lookup_or_insert(first);
        assert!(!existed);
        let (j, existed) = table.lookup_or_insert(again);
        assert!(existed);
        assert_eq!(i, j);
        assert_eq!(table.get(i).map(|u| u.count), Some(2));

        let (k, existed) = table.lookup_or_insert(other);
        assert!(!existed);
        assert_ne!(i, k);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn get_mut_allows_in_place_annotation() {
        let mut table = UrlTable::new();
        let url = UrlRecord::parse("http://example.com/").unwrap();
        let (i, _) = table.lookup_or_insert(url);
        table.get_mut(i).unwrap().flags |= crate::flags::PHISHED;
        assert!(table.get(i).unwrap().flags & crate::flags::PHISHED != 0);
    }
}
