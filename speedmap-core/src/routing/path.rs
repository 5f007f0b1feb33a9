//! Path reconstruction from predecessor rows

use crate::{IntersectionId, Path};

/// Walks the predecessor row rooted at `src` back from `dst`.
///
/// The result starts at `dst` and stops before `src`, so `src == dst` gives
/// an empty path. Returns `None` when the walk ends at a root other than
/// `src`, leaves the row, or does not terminate within the row length.
pub fn trace_back(predecessors: &[u32], src: IntersectionId, dst: IntersectionId) -> Option<Path> {
    let mut path = Vec::new();
    let mut node = dst;
    for _ in 0..=predecessors.len() {
        let previous = *predecessors.get(node)? as IntersectionId;
        if previous == node {
            return (node == src).then_some(path);
        }
        path.push(node);
        node = previous;
    }
    None
}

/// Full path `src -> ... -> dst` in travel order, `src` included
pub fn forward_path(
    predecessors: &[u32],
    src: IntersectionId,
    dst: IntersectionId,
) -> Option<Path> {
    let mut path = trace_back(predecessors, src, dst)?;
    path.push(src);
    path.reverse();
    Some(path)
}
