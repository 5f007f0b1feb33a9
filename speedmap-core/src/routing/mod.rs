pub mod all_pairs;
pub mod dijkstra;
pub mod path;

pub use all_pairs::AllPairsPaths;
pub use dijkstra::{
    Exhaustive, ShortestPathTree, StopAt, StopAtAll, StopCondition, dijkstra,
};
pub use path::{forward_path, trace_back};
