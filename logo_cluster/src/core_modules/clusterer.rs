// THEORY:
// The `SimilarityClusterer` turns a frozen `FingerprintTable` into a partition of
// its domains. It is a single-anchor greedy scan, not a transitive closure:
//
// 1.  Walk the domains in table (insertion) order.
// 2.  The first domain not yet consumed becomes the **anchor** of a new group.
// 3.  Every later, unconsumed domain whose fingerprint lies within the threshold
//     of the *anchor's* fingerprint joins that group and is consumed.
// 4.  Repeat until every domain has been visited.
//
// Membership is decided against the anchor alone. If A~B and B~C but A and C are
// far apart, C does not join A's group even though B did. Comparing against
// every member would produce different groups.
//
// The "consumed" set is local to one call. The scan is O(n²) in the worst case,
// which is fine for a one-shot batch, and it is deterministic: the same table in
// the same order always yields the same partition.

use crate::core_modules::domain::Domain;
use crate::core_modules::fingerprint::FINGERPRINT_BITS;
use crate::core_modules::fingerprint_table::FingerprintTable;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the clusterer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Maximum Hamming distance (inclusive) between an anchor and a member.
    pub similarity_threshold: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 10,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.similarity_threshold > FINGERPRINT_BITS {
            return Err(Error::InvalidConfig {
                name: "similarity_threshold",
                message: format!("must be at most {FINGERPRINT_BITS} bits"),
            });
        }
        Ok(())
    }
}

/// One similarity cluster. The first member is the anchor; the rest follow in
/// table order. A group is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Domain>", into = "Vec<Domain>")]
pub struct Group(Vec<Domain>);

impl TryFrom<Vec<Domain>> for Group {
    type Error = &'static str;

    fn try_from(members: Vec<Domain>) -> std::result::Result<Self, Self::Error> {
        if members.is_empty() {
            return Err("a group needs at least its anchor");
        }
        Ok(Self(members))
    }
}

impl From<Group> for Vec<Domain> {
    fn from(group: Group) -> Self {
        group.0
    }
}

impl Group {
    fn with_anchor(anchor: Domain) -> Self {
        Self(vec![anchor])
    }

    fn push(&mut self, member: Domain) {
        self.0.push(member);
    }

    pub fn anchor(&self) -> &Domain {
        &self.0[0]
    }

    pub fn members(&self) -> &[Domain] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_members(self) -> Vec<Domain> {
        self.0
    }
}

/// The ordered list of groups produced by one clustering run. Every domain of
/// the input table appears in exactly one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partition(Vec<Group>);

impl Partition {
    pub fn groups(&self) -> &[Group] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Group> {
        self.0.iter()
    }

    /// Total number of domains across all groups.
    pub fn domain_count(&self) -> usize {
        self.0.iter().map(Group::len).sum()
    }

    /// Plain nested lists of domain names, group by group.
    pub fn to_nested(&self) -> Vec<Vec<String>> {
        self.0
            .iter()
            .map(|g| g.members().iter().map(|d| d.to_string()).collect())
            .collect()
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a Group;
    type IntoIter = std::slice::Iter<'a, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Greedy, anchor-based threshold clustering over a fingerprint table.
#[derive(Debug, Clone)]
pub struct SimilarityClusterer {
    config: ClusterConfig,
}

impl SimilarityClusterer {
    pub fn new(config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn threshold(&self) -> u32 {
        self.config.similarity_threshold
    }

    /// Partitions the table's domains. An empty table yields an empty partition.
    pub fn cluster(&self, table: &FingerprintTable) -> Partition {
        let entries: Vec<_> = table.iter().collect();
        let mut consumed = vec![false; entries.len()];
        let mut groups = Vec::new();

        for (i, &(anchor, anchor_fp)) in entries.iter().enumerate() {
            if consumed[i] {
                continue;
            }
            consumed[i] = true;
            let mut group = Group::with_anchor(anchor.clone());

            for (j, &(candidate, candidate_fp)) in entries.iter().enumerate().skip(i + 1) {
                if consumed[j] {
                    continue;
                }
                if anchor_fp.is_similar(candidate_fp, self.config.similarity_threshold) {
                    group.push(candidate.clone());
                    consumed[j] = true;
                }
            }

            groups.push(group);
        }

        Partition(groups)
    }
}

impl Default for SimilarityClusterer {
    fn default() -> Self {
        Self {
            config: ClusterConfig::default(),
        }
    }
}
