// corpusboard - core/balance.rs
//
// Domain allocation analysis and rebalance planning.
// Core layer: pure functions over domain snapshots.
//
// Target allocations are never renormalised here. A sum that drifts from
// 1.0 is reported, not corrected.

use crate::core::model::Domain;
use serde::Serialize;

/// How a domain's current share compares with its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AllocationStatus {
    /// Current share is below target by more than the tolerance.
    NeedMore,
    /// Current share is within the tolerance band.
    Balanced,
    /// Current share is above target by more than the tolerance.
    Overrepresented,
}

impl AllocationStatus {
    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            AllocationStatus::NeedMore => "Need More",
            AllocationStatus::Balanced => "Balanced",
            AllocationStatus::Overrepresented => "Overrepresented",
        }
    }
}

impl std::fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify one domain against the `[target - tolerance, target + tolerance]` band.
pub fn allocation_status(domain: &Domain, tolerance: f64) -> AllocationStatus {
    if domain.current_allocation < domain.target_allocation - tolerance {
        AllocationStatus::NeedMore
    } else if domain.current_allocation > domain.target_allocation + tolerance {
        AllocationStatus::Overrepresented
    } else {
        AllocationStatus::Balanced
    }
}

/// Sum of target allocations.
pub fn target_total(domains: &[Domain]) -> f64 {
    domains.iter().map(|d| d.target_allocation).sum()
}

/// True when targets sum to 1.0 within `tolerance`.
pub fn is_normalised(domains: &[Domain], tolerance: f64) -> bool {
    (target_total(domains) - 1.0).abs() <= tolerance
}

// =============================================================================
// Rebalance planning
// =============================================================================

/// What a rebalance would do for one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RebalanceAction {
    /// Gather roughly `documents` more for `domain`.
    Collect { domain: String, documents: u64 },
    /// Trim roughly `documents` from `domain`.
    Reduce { domain: String, documents: u64 },
}

impl std::fmt::Display for RebalanceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebalanceAction::Collect { domain, documents } => {
                write!(f, "Collect {documents} more documents for {domain}")
            }
            RebalanceAction::Reduce { domain, documents } => {
                write!(f, "Reduce {domain} by {documents} documents")
            }
        }
    }
}

/// Ordered list of actions, one per unbalanced domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RebalancePlan {
    pub actions: Vec<RebalanceAction>,
}

impl RebalancePlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Build a rebalance plan from the current domain snapshot.
///
/// Document counts are `round(|target - current| * total_documents)`, where
/// the total is the sum over all domains. Domains inside the tolerance band
/// get no action; domains whose gap rounds to zero documents are skipped too.
pub fn plan(domains: &[Domain], tolerance: f64) -> RebalancePlan {
    let total: u64 = domains.iter().map(|d| d.documents).sum();

    let actions = domains
        .iter()
        .filter_map(|domain| {
            let gap = (domain.target_allocation - domain.current_allocation).abs();
            let documents = (gap * total as f64).round() as u64;
            if documents == 0 {
                return None;
            }
            match allocation_status(domain, tolerance) {
                AllocationStatus::NeedMore => Some(RebalanceAction::Collect {
                    domain: domain.name.clone(),
                    documents,
                }),
                AllocationStatus::Overrepresented => Some(RebalanceAction::Reduce {
                    domain: domain.name.clone(),
                    documents,
                }),
                AllocationStatus::Balanced => None,
            }
        })
        .collect();

    RebalancePlan { actions }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_domain(name: &str, target: f64, current: f64, documents: u64) -> Domain {
        Domain {
            name: name.to_string(),
            target_allocation: target,
            current_allocation: current,
            documents,
            quality: 0.8,
            min_quality: 0.75,
            keywords: Vec::new(),
        }
    }

    #[test]
    fn test_status_band_edges() {
        let under = make_domain("a", 0.20, 0.18, 10);
        let over = make_domain("b", 0.12, 0.15, 10);
        let inside = make_domain("c", 0.15, 0.16, 10);
        assert_eq!(allocation_status(&under, 0.01), AllocationStatus::NeedMore);
        assert_eq!(
            allocation_status(&over, 0.01),
            AllocationStatus::Overrepresented
        );
        assert_eq!(allocation_status(&inside, 0.011), AllocationStatus::Balanced);
    }

    #[test]
    fn test_target_total_and_normalisation() {
        let domains = vec![
            make_domain("a", 0.6, 0.5, 1),
            make_domain("b", 0.4, 0.5, 1),
        ];
        assert!((target_total(&domains) - 1.0).abs() < 1e-9);
        assert!(is_normalised(&domains, 0.001));

        let skewed = vec![make_domain("a", 0.7, 0.5, 1), make_domain("b", 0.4, 0.5, 1)];
        assert!(!is_normalised(&skewed, 0.01));
    }

    #[test]
    fn test_plan_sizes_actions_from_total_documents() {
        let domains = vec![
            make_domain("Crypto Derivatives", 0.20, 0.10, 500),
            make_domain("DeFi", 0.30, 0.40, 500),
            make_domain("Valuation", 0.50, 0.50, 0),
        ];
        let plan = plan(&domains, 0.01);
        assert_eq!(
            plan.actions,
            vec![
                RebalanceAction::Collect {
                    domain: "Crypto Derivatives".to_string(),
                    documents: 100,
                },
                RebalanceAction::Reduce {
                    domain: "DeFi".to_string(),
                    documents: 100,
                },
            ]
        );
        assert_eq!(
            plan.actions[0].to_string(),
            "Collect 100 more documents for Crypto Derivatives"
        );
    }

    #[test]
    fn test_balanced_corpus_has_empty_plan() {
        let domains = vec![make_domain("a", 0.5, 0.5, 10), make_domain("b", 0.5, 0.5, 10)];
        assert!(plan(&domains, 0.01).is_empty());
    }
}
