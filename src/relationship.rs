use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// Business relationship carried by a link, read in the direction of travel.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelType {
    CustomerToProvider,
    PeerToPeer,
    ProviderToCustomer,
}

// Required to work as a edge
impl Default for RelType {
    fn default() -> Self {
        RelType::ProviderToCustomer
    }
}

impl RelType {
    /// Relationship of the same link read in the opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            RelType::CustomerToProvider => RelType::ProviderToCustomer,
            RelType::PeerToPeer => RelType::PeerToPeer,
            RelType::ProviderToCustomer => RelType::CustomerToProvider,
        }
    }
}

/// Answer to a pairwise relationship query.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize)]
#[serde(tag = "relationship")]
pub enum Relationship {
    #[serde(rename = "p2c")]
    ProviderCustomer { provider: u32, customer: u32 },
    #[serde(rename = "p2p")]
    PeerPeer,
    #[serde(rename = "unknown")]
    Unknown,
    /// Both sides of the query are the same AS.
    #[serde(rename = "self")]
    Same,
}

impl Relationship {
    /// Link type of the hop `from -> other`, or `None` when there is nothing to classify.
    pub fn hop_from(&self, from: u32) -> Option<RelType> {
        match *self {
            Relationship::ProviderCustomer { provider, .. } if provider == from => {
                Some(RelType::ProviderToCustomer)
            }
            Relationship::ProviderCustomer { .. } => Some(RelType::CustomerToProvider),
            Relationship::PeerPeer => Some(RelType::PeerToPeer),
            Relationship::Unknown | Relationship::Same => None,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Relationship::Unknown)
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::ProviderCustomer { provider, customer } => {
                write!(f, "AS{} is a provider of AS{}", provider, customer)
            }
            Relationship::PeerPeer => write!(f, "peers"),
            Relationship::Unknown => write!(f, "unknown"),
            Relationship::Same => write!(f, "same AS"),
        }
    }
}

/// Unordered pair of ASNs, stored lowest first.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, PartialOrd, Ord, Serialize)]
pub struct AsPair(u32, u32);

impl AsPair {
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b {
            AsPair(a, b)
        } else {
            AsPair(b, a)
        }
    }

    pub fn low(&self) -> u32 {
        self.0
    }

    pub fn high(&self) -> u32 {
        self.1
    }
}

impl fmt::Display for AsPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS{}-AS{}", self.0, self.1)
    }
}

/// Parse a caller-supplied ASN such as `13335` or `AS13335`.
pub fn parse_asn(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    let digits = match trimmed.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("as") => &trimmed[2..],
        _ => trimmed,
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidInput(format!("{:?} is not an AS number", input)));
    }
    digits
        .parse::<u32>()
        .map_err(|e| Error::InvalidInput(format!("{:?} is not an AS number: {}", input, e)))
}

/// One `asn1|asn2|code` record of a CAIDA serial-2 file.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct RelationRecord {
    pub asn1: u32,
    pub asn2: u32,
    /// Relationship of `asn1 -> asn2`.
    pub rel: RelType,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Malformed {
    FieldCount(usize),
    Asn(String),
    Code(String),
    /// Integer code other than `-1`/`0`, e.g. a sibling marker.
    Unrecognized(i32),
    /// Both ASNs of the record are the same.
    SelfLink(u32),
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Malformed::FieldCount(n) => write!(f, "expected at least 3 fields, found {}", n),
            Malformed::Asn(s) => write!(f, "invalid ASN {:?}", s),
            Malformed::Code(s) => write!(f, "invalid relationship code {:?}", s),
            Malformed::Unrecognized(code) => write!(f, "unknown relationship type {}", code),
            Malformed::SelfLink(asn) => write!(f, "AS{} related to itself", asn),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParsedLine {
    Blank,
    Comment,
    Record(RelationRecord),
    Malformed(Malformed),
}

impl RelationRecord {
    /// Classify one line of `<asn1>|<asn2>|<code>[|<extra>...]` input.
    pub fn parse_line(line: &str) -> ParsedLine {
        let line = line.trim();
        if line.is_empty() {
            return ParsedLine::Blank;
        }
        if line.starts_with('#') {
            return ParsedLine::Comment;
        }

        let fields = line.split('|').map(str::trim).collect::<Vec<&str>>();
        if fields.len() < 3 {
            return ParsedLine::Malformed(Malformed::FieldCount(fields.len()));
        }

        let asn1 = match fields[0].parse::<u32>() {
            Ok(asn) => asn,
            Err(_) => return ParsedLine::Malformed(Malformed::Asn(fields[0].to_string())),
        };
        let asn2 = match fields[1].parse::<u32>() {
            Ok(asn) => asn,
            Err(_) => return ParsedLine::Malformed(Malformed::Asn(fields[1].to_string())),
        };
        let code = match fields[2].parse::<i32>() {
            Ok(code) => code,
            Err(_) => return ParsedLine::Malformed(Malformed::Code(fields[2].to_string())),
        };

        if asn1 == asn2 {
            return ParsedLine::Malformed(Malformed::SelfLink(asn1));
        }

        match code {
            // asn1 is a provider of asn2
            -1 => ParsedLine::Record(RelationRecord {
                asn1,
                asn2,
                rel: RelType::ProviderToCustomer,
            }),
            // asn1 and asn2 are peers
            0 => ParsedLine::Record(RelationRecord {
                asn1,
                asn2,
                rel: RelType::PeerToPeer,
            }),
            other => ParsedLine::Malformed(Malformed::Unrecognized(other)),
        }
    }
}
