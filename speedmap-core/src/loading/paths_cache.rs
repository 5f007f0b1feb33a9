//! All-pairs cache file: predecessors (`u32`), distances (`f32`) and
//! transposed distances (`f32`), each N x N, native byte order, no header.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use memmap2::Mmap;

use crate::Error;
use crate::routing::AllPairsPaths;

pub fn save_paths(paths: &AllPairsPaths, path: &Path) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    for section in paths.sections() {
        writer.write_all(section)?;
    }
    writer.flush()?;
    log::info!(
        "Saved shortest paths for {} intersections to {}",
        paths.node_count(),
        path.display()
    );
    Ok(())
}

/// Map a cache written for a graph of `node_count` intersections
pub fn load_paths(path: &Path, node_count: usize) -> Result<AllPairsPaths, Error> {
    let file = File::open(path)?;
    let expected = AllPairsPaths::byte_len(node_count)?;
    let actual = file.metadata()?.len();
    if actual != expected as u64 {
        return Err(Error::CacheSizeMismatch {
            expected,
            actual: usize::try_from(actual).unwrap_or(usize::MAX),
        });
    }

    // SAFETY: the mapping is only ever read. Truncating or rewriting the
    // file while it is mapped is undefined behaviour.
    let mmap = unsafe { Mmap::map(&file)? };
    let paths = AllPairsPaths::from_mapped(mmap, node_count)?;
    log::info!(
        "Mapped shortest paths for {node_count} intersections from {}",
        path.display()
    );
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, Street, StreetGraph};

    fn triangle() -> StreetGraph {
        let mut graph = StreetGraph::with_capacity(3, 3);
        for id in 0..3 {
            graph
                .add_intersection(id, Location::new(40.7, -74.0 + id as f64 * 0.01))
                .unwrap();
        }
        graph.add_street(0, Street::new(0, 1), 1.0).unwrap();
        graph.add_street(1, Street::new(1, 2), 2.0).unwrap();
        graph.add_street(2, Street::new(2, 0), 4.0).unwrap();
        graph.finalize();
        graph
    }

    #[test]
    fn mapped_cache_matches_computed() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("paths.bin");
        let computed = AllPairsPaths::compute(&triangle(), |_, _| {});
        save_paths(&computed, &file).unwrap();
        assert_eq!(std::fs::metadata(&file).unwrap().len(), 3 * 9 * 4);

        let mapped = load_paths(&file, 3).unwrap();
        assert!(mapped.is_mapped());
        assert_eq!(mapped.predecessors(), computed.predecessors());
        assert_eq!(mapped.distances(), computed.distances());
        assert_eq!(mapped.transposed(), computed.transposed());
        assert_eq!(mapped.path(2, 1), Some((vec![2, 0, 1], 5.0)));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("paths.bin");
        let computed = AllPairsPaths::compute(&triangle(), |_, _| {});
        save_paths(&computed, &file).unwrap();

        match load_paths(&file, 4) {
            Err(Error::CacheSizeMismatch { expected, actual }) => {
                assert_eq!(expected, 3 * 16 * 4);
                assert_eq!(actual, 3 * 9 * 4);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            load_paths(&dir.path().join("missing.bin"), 3),
            Err(Error::IoError(_))
        ));
    }
}
