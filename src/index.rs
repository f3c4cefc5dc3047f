//! In-memory index over CAIDA AS-relationship records.
//!
//! Provider/customer links are kept in two inverse maps and peer links both
//! as an adjacency map and as a set of unordered pairs, so every pairwise
//! query is a fixed number of hash lookups.

use std::{
    collections::{HashMap, HashSet},
    io,
};

use log::{debug, info, warn};
use serde::Serialize;

use crate::relationship::{AsPair, Malformed, ParsedLine, RelType, RelationRecord, Relationship};

/// Same unordered pair declared twice with different relationships.
///
/// The later declaration wins; the earlier one is kept here for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguousRelationship {
    pub pair: AsPair,
    pub previous: Relationship,
    pub current: Relationship,
    /// 1-based line (or record) number of the overriding declaration.
    pub line: usize,
}

/// Diagnostics collected while building a [`RelationshipIndex`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub total_lines: usize,
    /// Lines that produced a provider/customer or peer record.
    pub records: usize,
    pub provider_customer: usize,
    pub peer_peer: usize,
    pub comments: usize,
    pub blank: usize,
    pub malformed: usize,
    /// Malformed lines whose relation code was an integer other than -1/0.
    pub unrecognized: usize,
    /// `comments + blank + malformed`
    pub skipped: usize,
    pub duplicates: usize,
    pub ambiguities: Vec<AmbiguousRelationship>,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipIndex {
    /// customer -> providers
    providers: HashMap<u32, HashSet<u32>>,
    /// provider -> customers
    customers: HashMap<u32, HashSet<u32>>,
    peers: HashMap<u32, HashSet<u32>>,
    peer_pairs: HashSet<AsPair>,
    asns: HashSet<u32>,
    provider_customer_count: usize,
}

impl RelationshipIndex {
    /// Build an index from raw serial-2 lines.
    ///
    /// Blank lines, comments and malformed records are skipped and counted in
    /// the returned report; they never abort the build.
    pub fn build<I, S>(lines: I) -> (Self, BuildReport)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = RelationshipIndex::default();
        let mut report = BuildReport::default();

        for (lineno, line) in lines.into_iter().enumerate() {
            report.total_lines += 1;
            match RelationRecord::parse_line(line.as_ref()) {
                ParsedLine::Blank => report.blank += 1,
                ParsedLine::Comment => report.comments += 1,
                ParsedLine::Malformed(reason) => {
                    report.malformed += 1;
                    if let Malformed::Unrecognized(code) = reason {
                        report.unrecognized += 1;
                        warn!(
                            "line {}: unrecognized relationship code {}, pair left unknown",
                            lineno + 1,
                            code
                        );
                    } else {
                        debug!("line {}: skipping malformed record: {}", lineno + 1, reason);
                    }
                }
                ParsedLine::Record(record) => {
                    index.insert(record, lineno + 1, &mut report);
                }
            }
        }
        report.skipped = report.comments + report.blank + report.malformed;

        info!(
            "built AS relationship index: {} ASes, {} p2c, {} p2p links ({} lines skipped, {} ambiguous pairs)",
            index.asn_count(),
            index.provider_customer_count(),
            index.peer_count(),
            report.skipped,
            report.ambiguities.len()
        );

        (index, report)
    }

    /// Read a whole serial-2 file. Invalid UTF-8 is replaced rather than rejected.
    pub fn from_caida(mut reader: impl io::Read) -> io::Result<(Self, BuildReport)> {
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;
        let content = String::from_utf8_lossy(&content);

        Ok(Self::build(content.lines()))
    }

    pub fn from_edges(edges: Vec<(u32, u32, RelType)>) -> Self {
        let mut index = RelationshipIndex::default();
        let mut report = BuildReport::default();

        for (position, (asn1, asn2, rel)) in edges.into_iter().enumerate() {
            if asn1 == asn2 {
                continue;
            }
            let record = match rel {
                RelType::CustomerToProvider => RelationRecord {
                    asn1: asn2,
                    asn2: asn1,
                    rel: RelType::ProviderToCustomer,
                },
                rel => RelationRecord { asn1, asn2, rel },
            };
            index.insert(record, position + 1, &mut report);
        }

        index
    }

    fn insert(&mut self, record: RelationRecord, line: usize, report: &mut BuildReport) {
        let RelationRecord { asn1, asn2, rel } = record;
        let current = match rel {
            RelType::ProviderToCustomer => Relationship::ProviderCustomer {
                provider: asn1,
                customer: asn2,
            },
            RelType::CustomerToProvider => Relationship::ProviderCustomer {
                provider: asn2,
                customer: asn1,
            },
            RelType::PeerToPeer => Relationship::PeerPeer,
        };

        report.records += 1;
        match current {
            Relationship::PeerPeer => report.peer_peer += 1,
            _ => report.provider_customer += 1,
        }

        let previous = self.relationship(asn1, asn2);
        if previous == current {
            report.duplicates += 1;
            return;
        }
        if previous.is_known() {
            let pair = AsPair::new(asn1, asn2);
            warn!(
                "line {}: {} redeclared as {:?} (was {:?}), keeping the later record",
                line, pair, current, previous
            );
            self.remove(asn1, asn2, previous);
            report.ambiguities.push(AmbiguousRelationship {
                pair,
                previous,
                current,
                line,
            });
        }

        self.asns.insert(asn1);
        self.asns.insert(asn2);
        match current {
            Relationship::ProviderCustomer { provider, customer } => {
                self.customers.entry(provider).or_default().insert(customer);
                self.providers.entry(customer).or_default().insert(provider);
                self.provider_customer_count += 1;
            }
            _ => {
                self.peers.entry(asn1).or_default().insert(asn2);
                self.peers.entry(asn2).or_default().insert(asn1);
                self.peer_pairs.insert(AsPair::new(asn1, asn2));
            }
        }
    }

    fn remove(&mut self, asn1: u32, asn2: u32, rel: Relationship) {
        fn detach(map: &mut HashMap<u32, HashSet<u32>>, key: u32, value: u32) {
            if let Some(set) = map.get_mut(&key) {
                set.remove(&value);
                if set.is_empty() {
                    map.remove(&key);
                }
            }
        }

        match rel {
            Relationship::ProviderCustomer { provider, customer } => {
                detach(&mut self.customers, provider, customer);
                detach(&mut self.providers, customer, provider);
                self.provider_customer_count -= 1;
            }
            Relationship::PeerPeer => {
                detach(&mut self.peers, asn1, asn2);
                detach(&mut self.peers, asn2, asn1);
                self.peer_pairs.remove(&AsPair::new(asn1, asn2));
            }
            Relationship::Unknown | Relationship::Same => {}
        }
    }

    /// Relationship between `a` and `b`; the result names the provider side
    /// regardless of argument order.
    pub fn relationship(&self, a: u32, b: u32) -> Relationship {
        if a == b {
            return Relationship::Same;
        }
        if self.is_provider_of(a, b) {
            return Relationship::ProviderCustomer {
                provider: a,
                customer: b,
            };
        }
        if self.is_provider_of(b, a) {
            return Relationship::ProviderCustomer {
                provider: b,
                customer: a,
            };
        }
        if self.is_peer_of(a, b) {
            return Relationship::PeerPeer;
        }
        Relationship::Unknown
    }

    pub fn is_provider_of(&self, provider: u32, customer: u32) -> bool {
        self.customers
            .get(&provider)
            .map_or(false, |customers| customers.contains(&customer))
    }

    pub fn is_peer_of(&self, a: u32, b: u32) -> bool {
        self.peer_pairs.contains(&AsPair::new(a, b))
    }

    /// Serial-2 relation code of `a -> b`: `-1` when `a` is the provider,
    /// `1` when `a` is the customer, `0` for peers.
    pub fn relation_code(&self, a: u32, b: u32) -> Option<i8> {
        match self.relationship(a, b) {
            Relationship::ProviderCustomer { provider, .. } if provider == a => Some(-1),
            Relationship::ProviderCustomer { .. } => Some(1),
            Relationship::PeerPeer => Some(0),
            Relationship::Unknown | Relationship::Same => None,
        }
    }

    /// Providers of `asn`, `None` when it has none in this snapshot.
    pub fn providers_of(&self, asn: u32) -> Option<&HashSet<u32>> {
        self.providers.get(&asn)
    }

    pub fn customers_of(&self, asn: u32) -> Option<&HashSet<u32>> {
        self.customers.get(&asn)
    }

    pub fn peers_of(&self, asn: u32) -> Option<&HashSet<u32>> {
        self.peers.get(&asn)
    }

    pub fn contains(&self, asn: u32) -> bool {
        self.asns.contains(&asn)
    }

    pub fn all_asns(&self) -> &HashSet<u32> {
        &self.asns
    }

    pub fn asn_count(&self) -> usize {
        self.asns.len()
    }

    pub fn provider_customer_count(&self) -> usize {
        self.provider_customer_count
    }

    pub fn peer_count(&self) -> usize {
        self.peer_pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asns.is_empty()
    }
}
