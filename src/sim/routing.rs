use super::{LinkId, LinkSet};

/// Finds the fastest route from `src` to `dst`, both included, using the links'
/// current travel times.
pub(crate) fn find_route(src: LinkId, dst: LinkId, links: &LinkSet) -> Option<Vec<LinkId>> {
    if !links.contains_key(src) || !links.contains_key(dst) {
        return None;
    }
    pathfinding::directed::dijkstra::dijkstra(
        &src,
        |id| successors(*id, links),
        |id| *id == dst,
    )
    .map(|(route, _)| route)
}

/// The links following `link_id`, with the cost of driving them in ms.
fn successors(link_id: LinkId, links: &LinkSet) -> impl Iterator<Item = (LinkId, u64)> + '_ {
    links[link_id].links_out().iter().map(move |id| {
        let cost = (1000.0 * links[*id].travel_time()) as u64;
        (*id, cost)
    })
}
