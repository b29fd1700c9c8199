use crate::core::bidding::matching::CandidateSet;
use crate::core::models::ortb::BidRequest;
use crate::core::snapshot::model::{ConfigSnapshot, CreativeId, FolderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub folder: FolderId,
    pub creative: CreativeId,
    /// Effective cpc of the chosen folder
    pub full_price: i64,
}

/// Pluggable decision policy applied once targeting has produced
/// a candidate set
pub trait BiddingStrategy: Send + Sync {
    /// Pick one folder and one of its creatives. The candidate set
    /// carries the summed cpc for weighting strategies.
    fn select(
        &self,
        req: &BidRequest,
        snapshot: &ConfigSnapshot,
        candidates: &CandidateSet,
    ) -> Option<Selection>;

    /// Percent of the full price to bid, clamped by the caller
    fn revenue_share(&self, req: &BidRequest, selection: &Selection) -> f64;

    /// Opaque value substituted for `{ct}` in the click url
    fn tracking_token(&self, req: &BidRequest, selection: &Selection) -> String;
}

/// Picks candidates and creatives uniformly using the exchange
/// supplied random value, ignoring cpc weight
pub struct UniformStrategy {
    revenue_share: f64,
}

impl UniformStrategy {
    pub fn new(revenue_share: f64) -> Self {
        Self { revenue_share }
    }
}

impl BiddingStrategy for UniformStrategy {
    fn select(
        &self,
        req: &BidRequest,
        snapshot: &ConfigSnapshot,
        candidates: &CandidateSet,
    ) -> Option<Selection> {
        if candidates.is_empty() {
            return None;
        }

        let pick = req.rand as usize;
        let candidate = candidates.candidates[pick % candidates.candidates.len()];
        let folder = snapshot.folder(candidate.folder)?;

        if folder.creatives.is_empty() {
            return None;
        }

        Some(Selection {
            folder: folder.id,
            creative: folder.creatives[pick % folder.creatives.len()],
            full_price: candidate.cpc,
        })
    }

    fn revenue_share(&self, _req: &BidRequest, _selection: &Selection) -> f64 {
        self.revenue_share
    }

    fn tracking_token(&self, _req: &BidRequest, _selection: &Selection) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bidding::matching::Candidate;
    use crate::core::snapshot::model::{Creative, Dimensions, Folder, SnapshotSource};
    use std::collections::HashMap;

    fn snapshot(folder_count: u32) -> ConfigSnapshot {
        let folders = (1..=folder_count)
            .map(|id| Folder {
                id,
                parent: None,
                children: vec![],
                creatives: vec![id * 10, id * 10 + 1],
                cpc: 100,
                budget: 0,
                owner: 0,
                active: true,
                targeting: Dimensions::default(),
            })
            .collect();

        let creatives = (1..=folder_count)
            .flat_map(|id| [id * 10, id * 10 + 1])
            .map(|id| Creative {
                id,
                redirect_url: String::new(),
            })
            .collect();

        ConfigSnapshot::build(
            SnapshotSource {
                folders,
                creatives,
                ..Default::default()
            },
            1,
        )
        .unwrap()
    }

    fn candidates(folder_count: u32) -> CandidateSet {
        CandidateSet {
            candidates: (1..=folder_count)
                .map(|folder| Candidate { folder, cpc: 100 })
                .collect(),
            total_cpc: 100 * folder_count as i64,
        }
    }

    fn request(rand: u32) -> BidRequest {
        BidRequest {
            rand,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_candidates_select_nothing() {
        let strategy = UniformStrategy::new(98.0);

        assert_eq!(
            strategy.select(&request(3), &snapshot(1), &CandidateSet::default()),
            None
        );
    }

    #[test]
    fn test_rand_picks_folder_and_creative() {
        let strategy = UniformStrategy::new(98.0);

        let selection = strategy
            .select(&request(4), &snapshot(3), &candidates(3))
            .unwrap();

        assert_eq!(selection.folder, 2);
        assert_eq!(selection.creative, 20);
        assert_eq!(selection.full_price, 100);
    }

    #[test]
    fn test_selection_is_uniform() {
        let strategy = UniformStrategy::new(98.0);
        let snapshot = snapshot(4);
        let set = candidates(4);
        let trials = 100_000;

        let mut hits: HashMap<FolderId, usize> = HashMap::new();
        for _ in 0..trials {
            let req = request(rand::random_range(0..255));
            let selection = strategy.select(&req, &snapshot, &set).unwrap();
            *hits.entry(selection.folder).or_default() += 1;
        }

        let expected = trials as f64 / 4.0;
        for folder in 1..=4 {
            let observed = hits.get(&folder).copied().unwrap_or(0) as f64;
            assert!(
                (observed - expected).abs() / expected < 0.05,
                "folder {} selected {} times, expected about {}",
                folder,
                observed,
                expected
            );
        }
    }

    #[test]
    fn test_defaults_for_share_and_token() {
        let strategy = UniformStrategy::new(98.0);
        let selection = Selection {
            folder: 1,
            creative: 10,
            full_price: 100,
        };

        assert_eq!(strategy.revenue_share(&request(0), &selection), 98.0);
        assert!(strategy.tracking_token(&request(0), &selection).is_empty());
    }
}
