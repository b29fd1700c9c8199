use crate::core::snapshot::model::{ConfigSnapshot, Dimensions, Folder, FolderId};
use strum::{AsRefStr, Display};
use tracing::trace;

/// First predicate a folder failed, for diagnostics only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MismatchReason {
    Inactive,
    Country,
    Brand,
    Network,
    NetworkType,
    SubNetwork,
    Gender,
    DeviceType,
    Vertical,
    Cpc,
}

/// A folder eligible to serve, with its effective cpc
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub folder: FolderId,
    pub cpc: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    pub candidates: Vec<Candidate>,
    /// Sum of candidate cpcs, handed to the selection strategy.
    /// Saturates rather than overflowing on huge configured cpcs.
    pub total_cpc: i64,
}

impl CandidateSet {
    fn push(&mut self, candidate: Candidate) {
        self.total_cpc = self.total_cpc.saturating_add(candidate.cpc);
        self.candidates.push(candidate);
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

fn rejects(folder_value: u32, request_value: u32) -> bool {
    folder_value != 0 && folder_value != request_value
}

/// Evaluates the targeting predicates in order and returns the first
/// failing one. Test traffic skips the country check.
pub fn mismatch(folder: &Folder, dims: &Dimensions, test: bool, bid_floor: i64) -> Option<MismatchReason> {
    let targeting = &folder.targeting;

    if !folder.active {
        return Some(MismatchReason::Inactive);
    }

    if !test && rejects(targeting.country, dims.country) {
        return Some(MismatchReason::Country);
    }

    let checks = [
        (targeting.brand, dims.brand, MismatchReason::Brand),
        (targeting.network, dims.network, MismatchReason::Network),
        (targeting.network_type, dims.network_type, MismatchReason::NetworkType),
        (targeting.sub_network, dims.sub_network, MismatchReason::SubNetwork),
        (targeting.gender, dims.gender, MismatchReason::Gender),
        (targeting.device_type, dims.device_type, MismatchReason::DeviceType),
        (targeting.vertical, dims.vertical, MismatchReason::Vertical),
    ];

    if let Some((_, _, reason)) = checks
        .iter()
        .find(|(folder_value, request_value, _)| rejects(*folder_value, *request_value))
    {
        return Some(*reason);
    }

    if folder.cpc > 0 && folder.cpc < bid_floor {
        return Some(MismatchReason::Cpc);
    }

    None
}

/// A folder's own cpc, or its direct parent's when unset
fn effective_cpc(snapshot: &ConfigSnapshot, folder: &Folder) -> i64 {
    if folder.cpc != 0 {
        return folder.cpc;
    }

    folder
        .parent
        .and_then(|parent| snapshot.folder(parent))
        .map_or(0, |parent| parent.cpc)
}

/// Walks the root folders in snapshot order, descending one level
/// into the declared children of roots that match. Matching folders
/// owning at least one creative become candidates.
pub fn find_candidates(snapshot: &ConfigSnapshot, dims: &Dimensions, test: bool, bid_floor: i64) -> CandidateSet {
    let mut set = CandidateSet::default();

    let visit = |folder: &Folder, set: &mut CandidateSet| -> bool {
        if let Some(reason) = mismatch(folder, dims, test, bid_floor) {
            trace!("Folder {} rejected: {}", folder.id, reason);
            return false;
        }

        if !folder.creatives.is_empty() {
            set.push(Candidate {
                folder: folder.id,
                cpc: effective_cpc(snapshot, folder),
            });
        }

        true
    };

    for root in snapshot.roots() {
        if !visit(root, &mut set) {
            continue;
        }

        for child in root.children.iter().filter_map(|id| snapshot.folder(*id)) {
            visit(child, &mut set);
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::model::{Creative, SnapshotSource};

    fn folder(id: FolderId) -> Folder {
        Folder {
            id,
            parent: None,
            children: vec![],
            creatives: vec![1],
            cpc: 100,
            budget: 0,
            owner: 0,
            active: true,
            targeting: Dimensions::default(),
        }
    }

    fn snapshot(folders: Vec<Folder>) -> ConfigSnapshot {
        let source = SnapshotSource {
            folders,
            creatives: vec![Creative {
                id: 1,
                redirect_url: "http://lander".into(),
            }],
            ..Default::default()
        };

        ConfigSnapshot::build(source, 1).unwrap()
    }

    fn request_dims() -> Dimensions {
        Dimensions {
            country: 1,
            brand: 2,
            network: 3,
            network_type: 4,
            sub_network: 5,
            gender: 6,
            device_type: 7,
            vertical: 8,
        }
    }

    fn set_dimension(dims: &mut Dimensions, reason: MismatchReason, value: u32) {
        match reason {
            MismatchReason::Country => dims.country = value,
            MismatchReason::Brand => dims.brand = value,
            MismatchReason::Network => dims.network = value,
            MismatchReason::NetworkType => dims.network_type = value,
            MismatchReason::SubNetwork => dims.sub_network = value,
            MismatchReason::Gender => dims.gender = value,
            MismatchReason::DeviceType => dims.device_type = value,
            MismatchReason::Vertical => dims.vertical = value,
            MismatchReason::Inactive | MismatchReason::Cpc => {}
        }
    }

    #[test]
    fn test_differing_dimension_excludes_folder() {
        let dims = request_dims();
        let reasons = [
            MismatchReason::Country,
            MismatchReason::Brand,
            MismatchReason::Network,
            MismatchReason::NetworkType,
            MismatchReason::SubNetwork,
            MismatchReason::Gender,
            MismatchReason::DeviceType,
            MismatchReason::Vertical,
        ];

        for reason in reasons {
            let mut excluded = folder(1);
            set_dimension(&mut excluded.targeting, reason, 99);

            let mut wildcard = folder(2);
            set_dimension(&mut wildcard.targeting, reason, 0);

            assert_eq!(mismatch(&excluded, &dims, false, 0), Some(reason));

            let set = find_candidates(&snapshot(vec![excluded, wildcard]), &dims, false, 0);
            assert_eq!(
                set.candidates,
                vec![Candidate { folder: 2, cpc: 100 }],
                "{} mismatch must exclude the folder",
                reason
            );
        }
    }

    #[test]
    fn test_equal_dimensions_match() {
        let mut targeted = folder(1);
        targeted.targeting = request_dims();

        assert_eq!(mismatch(&targeted, &request_dims(), false, 0), None);
    }

    #[test]
    fn test_test_traffic_bypasses_country() {
        let mut foreign = folder(1);
        foreign.targeting.country = 42;

        let dims = request_dims();

        assert_eq!(mismatch(&foreign, &dims, false, 0), Some(MismatchReason::Country));
        assert_eq!(mismatch(&foreign, &dims, true, 0), None);

        foreign.targeting.brand = 42;
        assert_eq!(mismatch(&foreign, &dims, true, 0), Some(MismatchReason::Brand));
    }

    #[test]
    fn test_inactive_and_cpc_checks() {
        let mut inactive = folder(1);
        inactive.active = false;
        assert_eq!(mismatch(&inactive, &request_dims(), false, 0), Some(MismatchReason::Inactive));

        let capped = folder(2);
        assert_eq!(mismatch(&capped, &request_dims(), false, 101), Some(MismatchReason::Cpc));
        assert_eq!(mismatch(&capped, &request_dims(), false, 100), None);

        let mut uncapped = folder(3);
        uncapped.cpc = 0;
        assert_eq!(mismatch(&uncapped, &request_dims(), false, 10_000), None);
    }

    #[test]
    fn test_children_visited_only_under_matching_root() {
        let mut root = folder(1);
        root.children = vec![2];
        root.creatives = vec![];

        let mut child = folder(2);
        child.parent = Some(1);

        let mut closed_root = folder(3);
        closed_root.children = vec![4];
        closed_root.targeting.network = 99;

        let mut orphaned = folder(4);
        orphaned.parent = Some(3);

        let set = find_candidates(
            &snapshot(vec![root, child, closed_root, orphaned]),
            &request_dims(),
            false,
            0,
        );

        let ids: Vec<FolderId> = set.candidates.iter().map(|c| c.folder).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn test_child_inherits_parent_cpc() {
        let mut root = folder(1);
        root.cpc = 250;
        root.children = vec![2, 3];

        let mut inheriting = folder(2);
        inheriting.parent = Some(1);
        inheriting.cpc = 0;

        let mut own = folder(3);
        own.parent = Some(1);
        own.cpc = 80;

        let set = find_candidates(&snapshot(vec![root, inheriting, own]), &request_dims(), false, 0);

        assert_eq!(
            set.candidates,
            vec![
                Candidate { folder: 1, cpc: 250 },
                Candidate { folder: 2, cpc: 250 },
                Candidate { folder: 3, cpc: 80 },
            ]
        );
        assert_eq!(set.total_cpc, 580);
    }

    #[test]
    fn test_total_cpc_saturates() {
        let mut set = CandidateSet::default();
        set.push(Candidate {
            folder: 1,
            cpc: i64::MAX,
        });
        set.push(Candidate { folder: 2, cpc: 5 });

        assert_eq!(set.candidates.len(), 2);
        assert_eq!(set.total_cpc, i64::MAX);
    }

    #[test]
    fn test_folder_without_creatives_is_not_candidate() {
        let mut empty = folder(1);
        empty.creatives = vec![];

        assert!(find_candidates(&snapshot(vec![empty]), &request_dims(), false, 0).is_empty());
    }
}
