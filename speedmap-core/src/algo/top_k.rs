//! Routes whose length best matches an observed trip distance

use hashbrown::HashSet;

use crate::routing::{AllPairsPaths, forward_path};
use crate::{IntersectionId, Path};

/// Detours at or above this are ignored (they involve an unreachable leg)
const MAX_DETOUR: f32 = 1e30;

/// Up to `k` paths `src -> mid -> dst`, each the concatenation of two
/// shortest paths, ordered by how close their length is to `distance`.
///
/// Candidates are de-duplicated on their score truncated to two decimals,
/// so two midpoints with the same rounded score yield only the first one
/// (by intersection id). Identical endpoints, out-of-range ids and an
/// unreachable `dst` give an empty list.
#[allow(clippy::cast_possible_truncation)]
pub fn top_k_paths(
    paths: &AllPairsPaths,
    k: usize,
    src: IntersectionId,
    dst: IntersectionId,
    distance: f32,
) -> Vec<Path> {
    if src == dst || paths.distance(src, dst).is_none() {
        return Vec::new();
    }
    let (Some(predecessors), Some(from_src), Some(to_dst)) = (
        paths.predecessor_row(src),
        paths.distance_row(src),
        paths.transposed_row(dst),
    ) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut candidates: Vec<(i64, IntersectionId)> = predecessors
        .iter()
        .enumerate()
        .filter(|&(mid, &previous)| previous as IntersectionId != mid)
        .filter_map(|(mid, _)| {
            let detour = (from_src[mid] + to_dst[mid] - distance).abs();
            (detour < MAX_DETOUR).then(|| ((detour * 100.0) as i64, mid))
        })
        .filter(|&(score, _)| seen.insert(score))
        .collect();

    let k = k.min(candidates.len());
    if k == 0 {
        return Vec::new();
    }
    candidates.select_nth_unstable(k - 1);
    candidates.truncate(k);
    candidates.sort_unstable();

    candidates
        .into_iter()
        .filter_map(|(_, mid)| {
            let mut route = forward_path(predecessors, src, mid)?;
            let tail = forward_path(paths.predecessor_row(mid)?, mid, dst)?;
            route.extend_from_slice(&tail[1..]);
            Some(route)
        })
        .collect()
}
