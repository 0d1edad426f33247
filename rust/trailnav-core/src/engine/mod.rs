pub mod adjacency;
pub mod alternatives;
pub mod search;

pub use adjacency::Adjacency;
pub use alternatives::{k_shortest_paths, ALTERNATIVE_PENALTY, MAX_ALTERNATIVES};
pub use search::{shortest_path, Dijkstra, EdgePenalty, PathHop, PathResult, SearchContext, SearchParams};
