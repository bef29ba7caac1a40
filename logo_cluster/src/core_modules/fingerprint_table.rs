// THEORY:
// The `FingerprintTable` is the only shared structure between the acquisition
// phase and the clustering phase. It maps each successfully hashed domain to its
// fingerprint and remembers insertion order, which is the stable enumeration
// order the clusterer depends on.
//
// Domains whose logo could not be fetched or hashed are simply never inserted;
// there is no sentinel value for "missing". Once acquisition finishes the table
// is only ever read.

use crate::core_modules::domain::Domain;
use crate::core_modules::fingerprint::Fingerprint;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Insertion-ordered mapping from domain to fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintTable {
    entries: IndexMap<Domain, Fingerprint>,
}

impl FingerprintTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Appends a domain. Keys are unique; a second insert of the same domain is
    /// rejected and leaves the table untouched.
    pub fn insert(&mut self, domain: Domain, fingerprint: Fingerprint) -> Result<()> {
        if self.entries.contains_key(&domain) {
            return Err(Error::DuplicateDomain {
                domain: domain.to_string(),
            });
        }
        self.entries.insert(domain, fingerprint);
        Ok(())
    }

    pub fn get(&self, domain: &Domain) -> Option<Fingerprint> {
        self.entries.get(domain).copied()
    }

    pub fn contains(&self, domain: &Domain) -> bool {
        self.entries.contains_key(domain)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Domain, Fingerprint)> {
        self.entries.iter().map(|(d, f)| (d, *f))
    }

    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.entries.keys()
    }
}

impl FromIterator<(Domain, Fingerprint)> for FingerprintTable {
    /// Later duplicates are ignored; the first occurrence keeps its position.
    fn from_iter<I: IntoIterator<Item = (Domain, Fingerprint)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (domain, fingerprint) in iter {
            let _ = table.insert(domain, fingerprint);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut table = FingerprintTable::new();
        for name in ["zeta.com", "alpha.com", "mid.org"] {
            table.insert(Domain::from(name), Fingerprint::from_bits(0)).unwrap();
        }
        let order: Vec<&str> = table.domains().map(Domain::as_str).collect();
        assert_eq!(order, ["zeta.com", "alpha.com", "mid.org"]);
    }

    #[test]
    fn rejects_duplicate_domain() {
        let mut table = FingerprintTable::new();
        table.insert("a.com".into(), Fingerprint::from_bits(1)).unwrap();
        let err = table.insert("a.com".into(), Fingerprint::from_bits(2)).unwrap_err();
        assert!(matches!(err, Error::DuplicateDomain { .. }));
        assert_eq!(table.get(&"a.com".into()), Some(Fingerprint::from_bits(1)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn collect_ignores_later_duplicates() {
        let table: FingerprintTable = [
            (Domain::from("a.com"), Fingerprint::from_bits(1)),
            (Domain::from("b.com"), Fingerprint::from_bits(2)),
            (Domain::from("a.com"), Fingerprint::from_bits(3)),
        ]
        .into_iter()
        .collect();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&"a.com".into()), Some(Fingerprint::from_bits(1)));
    }
}
