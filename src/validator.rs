//! Valley-free classification of observed AS paths.
//!
//! A path is read from its first element to its last. Each hop moves the
//! walk through three phases: uphill (customer to provider), flat (a single
//! peering hop) and downhill (provider to customer). Any hop that climbs
//! back up, or a second peering hop, makes the path a valley.

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    index::RelationshipIndex,
    relationship::{parse_asn, RelType, Relationship},
};

/// Anything able to answer pairwise relationship queries.
pub trait RelationshipOracle {
    fn relationship(&self, a: u32, b: u32) -> Relationship;
}

impl RelationshipOracle for RelationshipIndex {
    fn relationship(&self, a: u32, b: u32) -> Relationship {
        RelationshipIndex::relationship(self, a, b)
    }
}

impl<T: RelationshipOracle + ?Sized> RelationshipOracle for &T {
    fn relationship(&self, a: u32, b: u32) -> Relationship {
        (**self).relationship(a, b)
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathState {
    Uphill,
    Flat,
    Downhill,
}

impl PathState {
    /// Phase a hop of type `rel` belongs to.
    pub fn entered_by(rel: RelType) -> Self {
        match rel {
            RelType::CustomerToProvider => PathState::Uphill,
            RelType::PeerToPeer => PathState::Flat,
            RelType::ProviderToCustomer => PathState::Downhill,
        }
    }
}

/// What to do with a hop whose relationship is not in the dataset.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownHops {
    /// Keep the current phase and move on.
    #[default]
    Skip,
    Reject,
}

/// Whether a peering hop may follow another peering hop.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatedPeering {
    #[default]
    Forbid,
    Allow,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    pub unknown_hops: UnknownHops,
    pub repeated_peering: RepeatedPeering,
}

/// First illegal hop of a path.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Violation {
    /// 0-based hop index over the deduplicated path; hop `i` is `path[i] -> path[i + 1]`.
    pub hop: usize,
    pub from: u32,
    pub to: u32,
    /// Phase the walk was in before the hop.
    pub state: PathState,
    /// Phase the hop would have entered, `None` for a rejected unknown hop.
    pub attempted: Option<PathState>,
    pub relation: Relationship,
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub failed_at_hop: Option<usize>,
    /// Path after collapsing prepended ASNs.
    pub path: Vec<u32>,
    /// Hops that had no relationship data.
    pub unknown_hops: Vec<usize>,
    pub violation: Option<Violation>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValleyFreeValidator {
    policy: ValidationPolicy,
}

impl ValleyFreeValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        ValleyFreeValidator { policy }
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    fn next_state(&self, state: PathState, rel: RelType) -> Option<PathState> {
        match (state, rel) {
            (PathState::Uphill, RelType::CustomerToProvider) => Some(PathState::Uphill),
            (PathState::Uphill, RelType::PeerToPeer) => Some(PathState::Flat),
            (_, RelType::ProviderToCustomer) => Some(PathState::Downhill),
            (PathState::Flat, RelType::PeerToPeer)
                if self.policy.repeated_peering == RepeatedPeering::Allow =>
            {
                Some(PathState::Flat)
            }
            _ => None,
        }
    }

    /// Classify `path`. Never fails: paths with fewer than two distinct hops are valid.
    pub fn check<O>(&self, oracle: &O, path: &[u32]) -> ValidationResult
    where
        O: RelationshipOracle + ?Sized,
    {
        let path = dedup_prepending(path);
        let mut state = PathState::Uphill;
        let mut unknown_hops = Vec::new();

        for (hop, pair) in path.windows(2).enumerate() {
            let (from, to) = (pair[0], pair[1]);
            let relation = oracle.relationship(from, to);

            let rel = match relation.hop_from(from) {
                Some(rel) => rel,
                None => {
                    if self.policy.unknown_hops == UnknownHops::Reject {
                        let violation = Violation {
                            hop,
                            from,
                            to,
                            state,
                            attempted: None,
                            relation,
                        };
                        return ValidationResult::invalid(path, unknown_hops, violation);
                    }
                    unknown_hops.push(hop);
                    continue;
                }
            };

            match self.next_state(state, rel) {
                Some(next) => state = next,
                None => {
                    let violation = Violation {
                        hop,
                        from,
                        to,
                        state,
                        attempted: Some(PathState::entered_by(rel)),
                        relation,
                    };
                    return ValidationResult::invalid(path, unknown_hops, violation);
                }
            }
        }

        ValidationResult {
            valid: true,
            failed_at_hop: None,
            path,
            unknown_hops,
            violation: None,
        }
    }
}

impl ValidationResult {
    fn invalid(path: Vec<u32>, unknown_hops: Vec<usize>, violation: Violation) -> Self {
        ValidationResult {
            valid: false,
            failed_at_hop: Some(violation.hop),
            path,
            unknown_hops,
            violation: Some(violation),
        }
    }
}

/// Check `path` against `oracle` with the default policy.
pub fn is_valley_free<O>(oracle: &O, path: &[u32]) -> ValidationResult
where
    O: RelationshipOracle + ?Sized,
{
    ValleyFreeValidator::default().check(oracle, path)
}

/// Collapse consecutive repeats (AS path prepending) into one hop.
pub fn dedup_prepending(path: &[u32]) -> Vec<u32> {
    let mut path = path.to_vec();
    path.dedup();
    path
}

/// Parse an AS path such as `"3356 174 AS13335"` or `"3356,174,13335"`.
pub fn parse_path(input: &str) -> Result<Vec<u32>> {
    if input.contains(|c: char| c == '{' || c == '}') {
        return Err(Error::InvalidInput(format!(
            "AS sets are not supported in path {:?}",
            input
        )));
    }

    let path = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty())
        .map(parse_asn)
        .collect::<Result<Vec<u32>>>()?;

    if path.is_empty() {
        return Err(Error::InvalidInput("empty AS path".to_string()));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(edges: Vec<(u32, u32, RelType)>) -> RelationshipIndex {
        RelationshipIndex::from_edges(edges)
    }

    #[test]
    /*
     * ┌───────┐
     * │   1   │
     * └───┬───┘
     *     ▼
     * ┌───────┐
     * │   2   │
     * └───┬───┘
     *     ▼
     * ┌───────┐
     * │   3   │
     * └───────┘
     */
    fn downhill_only_is_valid() {
        let index = index(vec![
            (1, 2, RelType::ProviderToCustomer),
            (2, 3, RelType::ProviderToCustomer),
        ]);

        let result = is_valley_free(&index, &[1, 2, 3]);
        assert!(result.valid);
        assert_eq!(result.failed_at_hop, None);

        let result = is_valley_free(&index, &[3, 2, 1]);
        assert!(result.valid);
    }

    #[test]
    /*
     * ┌───────┐    ┌───────┐
     * │   2   │◄──►│   3   │
     * └───▲───┘    └───┬───┘
     *     │            ▼
     * ┌───┴───┐    ┌───────┐
     * │   1   │    │   4   │
     * └───────┘    └───────┘
     */
    fn single_peering_point_is_valid() {
        let index = index(vec![
            (2, 1, RelType::ProviderToCustomer),
            (2, 3, RelType::PeerToPeer),
            (3, 4, RelType::ProviderToCustomer),
        ]);

        let result = is_valley_free(&index, &[1, 2, 3, 4]);
        assert!(result.valid);
        assert!(result.unknown_hops.is_empty());
    }

    #[test]
    fn climbing_after_peering_is_invalid() {
        let index = index(vec![
            (1, 2, RelType::PeerToPeer),
            (3, 2, RelType::ProviderToCustomer),
            (3, 4, RelType::ProviderToCustomer),
        ]);

        let result = is_valley_free(&index, &[1, 2, 3, 4]);
        assert!(!result.valid);
        assert_eq!(result.failed_at_hop, Some(1));
        assert_eq!(
            result.violation,
            Some(Violation {
                hop: 1,
                from: 2,
                to: 3,
                state: PathState::Flat,
                attempted: Some(PathState::Uphill),
                relation: Relationship::ProviderCustomer {
                    provider: 3,
                    customer: 2
                },
            })
        );
    }

    #[test]
    fn climbing_after_downhill_is_invalid() {
        // 1 -> 2 -> 3 down, 3 -> 4 up again
        let index = index(vec![
            (1, 2, RelType::ProviderToCustomer),
            (2, 3, RelType::ProviderToCustomer),
            (4, 3, RelType::ProviderToCustomer),
            (4, 5, RelType::ProviderToCustomer),
        ]);

        let result = is_valley_free(&index, &[1, 2, 3, 4, 5]);
        assert!(!result.valid);
        assert_eq!(result.failed_at_hop, Some(2));
        let violation = result.violation.unwrap();
        assert_eq!(violation.state, PathState::Downhill);
        assert_eq!(violation.attempted, Some(PathState::Uphill));
    }

    #[test]
    fn peering_after_downhill_is_invalid() {
        let index = index(vec![
            (1, 2, RelType::ProviderToCustomer),
            (2, 3, RelType::PeerToPeer),
        ]);

        let result = is_valley_free(&index, &[1, 2, 3]);
        assert_eq!(result.failed_at_hop, Some(1));
        assert_eq!(result.violation.unwrap().attempted, Some(PathState::Flat));
    }

    #[test]
    fn second_peering_hop() {
        let index = index(vec![
            (1, 2, RelType::PeerToPeer),
            (2, 3, RelType::PeerToPeer),
            (3, 4, RelType::ProviderToCustomer),
        ]);

        let result = is_valley_free(&index, &[1, 2, 3, 4]);
        assert!(!result.valid);
        assert_eq!(result.failed_at_hop, Some(1));

        let lenient = ValleyFreeValidator::new(ValidationPolicy {
            repeated_peering: RepeatedPeering::Allow,
            ..Default::default()
        });
        assert!(lenient.check(&index, &[1, 2, 3, 4]).valid);
    }

    #[test]
    fn unknown_hops_are_skipped_by_default() {
        let index = index(vec![
            (2, 1, RelType::ProviderToCustomer),
            (3, 4, RelType::ProviderToCustomer),
        ]);

        // 2 -> 3 has no data
        let result = is_valley_free(&index, &[1, 2, 3, 4]);
        assert!(result.valid);
        assert_eq!(result.unknown_hops, vec![1]);

        let strict = ValleyFreeValidator::new(ValidationPolicy {
            unknown_hops: UnknownHops::Reject,
            ..Default::default()
        });
        let result = strict.check(&index, &[1, 2, 3, 4]);
        assert!(!result.valid);
        assert_eq!(result.failed_at_hop, Some(1));
        let violation = result.violation.unwrap();
        assert_eq!(violation.attempted, None);
        assert_eq!(violation.relation, Relationship::Unknown);
    }

    #[test]
    fn unknown_hop_does_not_hide_a_valley() {
        let index = index(vec![
            (1, 2, RelType::ProviderToCustomer),
            (4, 3, RelType::ProviderToCustomer),
        ]);

        let result = is_valley_free(&index, &[1, 2, 3, 4]);
        assert!(!result.valid);
        assert_eq!(result.unknown_hops, vec![1]);
        assert_eq!(result.failed_at_hop, Some(2));
    }

    #[test]
    fn prepending_is_collapsed() {
        let index = index(vec![
            (1, 2, RelType::ProviderToCustomer),
            (2, 3, RelType::ProviderToCustomer),
        ]);

        let result = is_valley_free(&index, &[1, 1, 1, 2, 3, 3]);
        assert!(result.valid);
        assert_eq!(result.path, vec![1, 2, 3]);
        assert!(result.unknown_hops.is_empty());

        let result = is_valley_free(&index, &[1, 1, 2, 2, 3, 2]);
        assert_eq!(result.path, vec![1, 2, 3, 2]);
        assert_eq!(result.failed_at_hop, Some(2));
    }

    #[test]
    fn trivial_paths_are_valid() {
        let index = RelationshipIndex::default();

        assert!(is_valley_free(&index, &[]).valid);
        assert!(is_valley_free(&index, &[13335]).valid);
        assert!(is_valley_free(&index, &[13335, 13335]).valid);
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("3356 174 13335").unwrap(), vec![3356, 174, 13335]);
        assert_eq!(parse_path(" AS3356, as174,13335 ").unwrap(), vec![3356, 174, 13335]);
        assert_eq!(parse_path("1 1 2").unwrap(), vec![1, 1, 2]);

        assert!(matches!(parse_path(""), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_path(" , "), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_path("1 two 3"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_path("1 2 {3,4}"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_path("1 -2"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_policy_from_toml() {
        let policy: ValidationPolicy = toml::from_str(
            r#"
            unknown_hops = "reject"
            repeated_peering = "allow"
            "#,
        )
        .unwrap();
        assert_eq!(policy.unknown_hops, UnknownHops::Reject);
        assert_eq!(policy.repeated_peering, RepeatedPeering::Allow);

        let policy: ValidationPolicy = toml::from_str("").unwrap();
        assert_eq!(policy, ValidationPolicy::default());
    }
}
