use std::sync::atomic::AtomicBool;

use tracing::debug;

use super::search::{with_search_context, Dijkstra, EdgePenalty, PathResult, SearchParams};
use crate::error::{NavError, NavResult};
use crate::snapshot::GraphSnapshot;

pub const MAX_ALTERNATIVES: u32 = 5;
pub const ALTERNATIVE_PENALTY: f64 = 2.0;
/// Times the penalty is doubled before giving up on finding another path.
const MAX_ESCALATIONS: u32 = 4;

/// The best path followed by up to `alternatives` distinct detours.
///
/// Detours come from re-running the search with every edge already used by a
/// found path penalised by `ALTERNATIVE_PENALTY` (see [`EdgePenalty`]); when a rerun repeats a known
/// path the factor doubles, up to `MAX_ESCALATIONS` times, before giving up.
/// Reported costs are unpenalised.
pub fn k_shortest_paths(
    snapshot: &GraphSnapshot,
    source: u32,
    target: u32,
    directed: bool,
    alternatives: u32,
    cancel: Option<&AtomicBool>,
) -> NavResult<Vec<PathResult>> {
    if alternatives > MAX_ALTERNATIVES {
        return Err(NavError::invalid(format!("at most {} alternatives may be requested", MAX_ALTERNATIVES)));
    }
    let base = SearchParams::new(source, target).directed(directed).cancel(cancel);
    let dijkstra = Dijkstra::new(snapshot);

    with_search_context(|ctx| -> NavResult<Vec<PathResult>> {
        let best = dijkstra.run(&base, ctx)?.ok_or_else(|| NavError::NoPath {
            from: snapshot.node(source).id,
            to: snapshot.node(target).id,
        })?;
        let mut found = vec![best];
        if found[0].is_trivial() {
            return Ok(found);
        }

        let mut penalty = EdgePenalty::new(snapshot.edges().len(), ALTERNATIVE_PENALTY);
        let mut escalations = 0;
        for h in &found[0].hops {
            penalty.mark(h.edge);
        }
        while found.len() <= alternatives as usize {
            let params = SearchParams { penalty: Some(&penalty), ..base };
            let Some(next) = dijkstra.run(&params, ctx)? else { break };
            let edges = next.edges();
            if found.iter().any(|p| p.edges() == edges) {
                if escalations == MAX_ESCALATIONS {
                    debug!(found = found.len(), "no further distinct alternative");
                    break;
                }
                escalations += 1;
                penalty.factor *= ALTERNATIVE_PENALTY;
                continue;
            }
            for h in &next.hops {
                penalty.mark(h.edge);
            }
            escalations = 0;
            penalty.factor = ALTERNATIVE_PENALTY;
            found.push(next);
        }
        Ok(found)
    })
}
