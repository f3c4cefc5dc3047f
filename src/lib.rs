//! asrel-valley indexes CAIDA's AS-relationship data and checks observed AS
//! paths against the valley-free routing principle.
//!
//! ```
//! use asrel_valley::{AsRelService, Relationship};
//!
//! let service = AsRelService::default();
//! service.load_lines("20250801", ["# serial-2", "1|2|-1|bgp", "2|3|0|mlp", "3|4|-1|bgp"]);
//!
//! assert_eq!(
//!     service.relationship(2, 1).unwrap(),
//!     Relationship::ProviderCustomer { provider: 1, customer: 2 }
//! );
//! assert!(service.check_path_str("2 3 4").unwrap().valid);
//! assert_eq!(service.check_path_str("1 2 3").unwrap().failed_at_hop, Some(1));
//! ```

pub mod config;
pub mod error;
pub mod index;
mod propagation;
pub mod relationship;
pub mod service;
pub mod source;
pub mod topology;
pub mod validator;

pub use config::{Config, DatasetConfig};
pub use error::{Error, Result};
pub use index::{AmbiguousRelationship, BuildReport, RelationshipIndex};
pub use relationship::{parse_asn, AsPair, RelType, RelationRecord, Relationship};
pub use service::{AsRelService, Snapshot, SnapshotStats};
pub use source::{FileSource, SnapshotSource};
pub use topology::Topology;
pub use validator::{
    dedup_prepending, is_valley_free, parse_path, PathState, RelationshipOracle, RepeatedPeering,
    UnknownHops, ValidationPolicy, ValidationResult, ValleyFreeValidator, Violation,
};
