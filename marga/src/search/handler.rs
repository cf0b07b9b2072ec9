//! Per-worker A* state machine.

use std::sync::Arc;
use std::time::Instant;

use log::{trace, warn};
use parking_lot::Mutex;

use crate::core::Int3;
use crate::data::NavData;
use crate::error::PathError;
use crate::graph::{Connection, NearestNode};
use crate::storage::{NodeIndex, NodeRecord, NodeStorage, ScratchBuffer};

use super::heap::{HeapEntry, OpenList};
use super::heuristic::{Heuristic, HeuristicObjective};
use super::path_node::{FRACTION_CENTER, NOT_IN_HEAP};
use super::temporary::{TemporaryKind, TemporaryNode, TemporaryNodes, is_temporary};
use super::traversal::{DefaultTraversal, TraversalConstraint, TraversalProvider};
use super::{EndpointSnapping, SearchConfig};

/// Fully resolved search parameters
#[derive(Clone)]
pub struct SearchRequest {
    pub start: Int3,
    pub end: Int3,
    pub heuristic: Heuristic,
    pub heuristic_scale: f32,
    pub snapping: EndpointSnapping,
    pub constraint: TraversalConstraint,
    pub provider: Arc<dyn TraversalProvider>,
    /// Return the path to the closest reachable node instead of failing
    pub calculate_partial: bool,
}

impl SearchRequest {
    /// Request with defaults taken from `config`
    pub fn new(start: Int3, end: Int3, config: &SearchConfig) -> Self {
        Self {
            start,
            end,
            heuristic: config.heuristic,
            heuristic_scale: config.heuristic_scale,
            snapping: config.endpoint_snapping,
            constraint: TraversalConstraint::default(),
            provider: Arc::new(DefaultTraversal),
            calculate_partial: false,
        }
    }
}

/// Output of a finished search
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchResult {
    /// Visited nodes, start to goal, one entry per node
    pub nodes: Vec<NodeIndex>,
    /// Waypoints, start point to end point
    pub vector_path: Vec<Int3>,
    /// Total G cost
    pub cost: u32,
    /// Nodes expanded
    pub searched_nodes: usize,
    /// Path ends at the node closest to the target instead of the target
    pub partial: bool,
}

/// Result of one time slice
#[derive(Debug)]
pub enum StepOutcome {
    InProgress,
    Finished(SearchResult),
}

#[derive(Clone, Copy, Debug)]
struct Best {
    node: NodeIndex,
    h: u32,
    g: u32,
}

struct ActiveSearch {
    start_temp: NodeIndex,
    end_temp: NodeIndex,
    objective: HeuristicObjective,
    constraint: TraversalConstraint,
    provider: Arc<dyn TraversalProvider>,
    partial: bool,
    best: Option<Best>,
    expanded: usize,
}

/// Search scratch owned by one worker.
pub struct PathHandler {
    worker_id: usize,
    scratch: Arc<Mutex<ScratchBuffer>>,
    heap: OpenList,
    temporary: TemporaryNodes,
    /// Generation stamp of the current request (never 0)
    stamp: u16,
    /// Path nodes with flags to clear when the request ends
    flagged: Vec<NodeIndex>,
    connections: Vec<Connection>,
    config: SearchConfig,
    active: Option<ActiveSearch>,
}

impl PathHandler {
    /// Create a handler and register its scratch buffer with the arena
    pub fn new(worker_id: usize, storage: &mut NodeStorage, config: SearchConfig) -> Self {
        Self {
            worker_id,
            scratch: storage.register_scratch(),
            heap: OpenList::new(),
            temporary: TemporaryNodes::default(),
            stamp: 0,
            flagged: Vec::new(),
            connections: Vec::new(),
            config,
            active: None,
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Current generation stamp
    pub fn stamp(&self) -> u16 {
        self.stamp
    }

    /// True between a successful `prepare` and the end of the search
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Bind a request: resolve endpoints, check reachability and open the
    /// temporary start node.
    pub fn prepare(&mut self, data: &NavData, request: &SearchRequest) -> Result<(), PathError> {
        let scratch_ref = Arc::clone(&self.scratch);
        let mut scratch = scratch_ref.lock();
        self.clear_request(&mut scratch);

        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            trace!(
                "[AStar] worker {} stamp wrapped, clearing scratch",
                self.worker_id
            );
            scratch.reset_all();
            self.stamp = 1;
        }

        let provider = request.provider.as_ref();
        let constraint = &request.constraint;
        let filter = |_: NodeIndex, record: &NodeRecord| provider.can_traverse_node(constraint, record);
        let max_sqr = self.config.max_nearest_sqr_distance();

        let start = data
            .nearest_node(request.start, &filter, max_sqr)
            .ok_or(PathError::NoStartNode)?;
        let end = data
            .nearest_node(request.end, &filter, max_sqr)
            .ok_or(PathError::NoEndNode)?;

        if !request.calculate_partial && !data.is_reachable(start.node, end.node) {
            return Err(PathError::Unreachable);
        }

        let start_position = snap(data, &start, request.start, request.snapping);
        let end_position = snap(data, &end, request.end, request.snapping);
        let start_temp = self.temporary.add(TemporaryNode {
            kind: TemporaryKind::Start,
            position: start_position,
            associated: start.node,
        });
        let end_temp = self.temporary.add(TemporaryNode {
            kind: TemporaryKind::End,
            position: end_position,
            associated: end.node,
        });
        scratch.reset_temporary(self.temporary.len());

        let variants = data.node(end.node).map_or(1, |r| r.variants) as NodeIndex;
        for v in 0..variants {
            scratch.get_mut(end.node + v).set_flag1(true);
            self.flagged.push(end.node + v);
        }

        let objective =
            HeuristicObjective::new(request.heuristic, request.heuristic_scale, end_position);
        self.heap.reset(request.heuristic.is_active());

        let node = scratch.get_mut(start_temp);
        node.touch(self.stamp);
        node.set_parent(start_temp);
        node.set_fraction(FRACTION_CENTER);
        self.heap
            .push(&mut scratch, start_temp, 0, objective.estimate(start_position));

        trace!(
            "[AStar] worker {} prepared: start node {} end node {} (stamp {})",
            self.worker_id, start.node, end.node, self.stamp
        );
        self.active = Some(ActiveSearch {
            start_temp,
            end_temp,
            objective,
            constraint: request.constraint.clone(),
            provider: Arc::clone(&request.provider),
            partial: request.calculate_partial,
            best: None,
            expanded: 0,
        });
        Ok(())
    }

    /// Advance the search until it finishes or `deadline` passes.
    ///
    /// The deadline is checked once per batch of `batch_size` expansions.
    /// `None` runs to completion.
    pub fn step(&mut self, data: &NavData, deadline: Option<Instant>) -> Result<StepOutcome, PathError> {
        let Some(mut search) = self.active.take() else {
            return Err(PathError::Internal(
                "search step without a prepared request".into(),
            ));
        };
        let scratch_ref = Arc::clone(&self.scratch);
        let mut scratch = scratch_ref.lock();

        let outcome = self.run(&mut search, &mut scratch, data, deadline);
        match outcome {
            Ok(StepOutcome::InProgress) => self.active = Some(search),
            _ => self.clear_request(&mut scratch),
        }
        outcome
    }

    /// Prepare and run a request to completion on this thread
    pub fn search(&mut self, data: &NavData, request: &SearchRequest) -> Result<SearchResult, PathError> {
        self.prepare(data, request)?;
        loop {
            if let StepOutcome::Finished(result) = self.step(data, None)? {
                return Ok(result);
            }
        }
    }

    /// Drop the current request
    pub fn abort(&mut self) {
        let scratch_ref = Arc::clone(&self.scratch);
        let mut scratch = scratch_ref.lock();
        self.clear_request(&mut scratch);
    }

    fn clear_request(&mut self, scratch: &mut ScratchBuffer) {
        for index in self.flagged.drain(..) {
            let node = scratch.get_mut(index);
            node.set_flag1(false);
            node.set_flag2(false);
        }
        self.heap.reset(false);
        self.temporary.clear();
        self.active = None;
    }

    fn run(
        &mut self,
        search: &mut ActiveSearch,
        scratch: &mut ScratchBuffer,
        data: &NavData,
        deadline: Option<Instant>,
    ) -> Result<StepOutcome, PathError> {
        let batch = self.config.batch_size.max(1);
        let limit = self.config.max_expansions;
        loop {
            for _ in 0..batch {
                let Some(entry) = self.heap.pop(scratch) else {
                    return self.exhausted(search, scratch, data);
                };
                if entry.node == search.end_temp {
                    let result = self.trace(search, scratch, data, entry.node, entry.g, false)?;
                    trace!(
                        "[AStar] worker {} SUCCESS: cost {} nodes {} expanded {}",
                        self.worker_id,
                        result.cost,
                        result.nodes.len(),
                        result.searched_nodes
                    );
                    return Ok(StepOutcome::Finished(result));
                }

                search.expanded += 1;
                if limit > 0 && search.expanded > limit {
                    warn!(
                        "[AStar] worker {} FAILED: exceeded {} expansions",
                        self.worker_id, limit
                    );
                    return Err(PathError::SearchLimitExceeded(limit));
                }
                if search.partial
                    && !is_temporary(entry.node)
                    && search.best.is_none_or(|b| entry.h < b.h)
                {
                    search.best = Some(Best {
                        node: entry.node,
                        h: entry.h,
                        g: entry.g,
                    });
                }
                self.expand(search, scratch, data, entry);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(StepOutcome::InProgress);
            }
        }
    }

    fn exhausted(
        &mut self,
        search: &ActiveSearch,
        scratch: &mut ScratchBuffer,
        data: &NavData,
    ) -> Result<StepOutcome, PathError> {
        match search.best {
            Some(best) if search.partial => {
                let result = self.trace(search, scratch, data, best.node, best.g, true)?;
                trace!(
                    "[AStar] worker {} PARTIAL: ended at node {} (h={})",
                    self.worker_id, best.node, best.h
                );
                Ok(StepOutcome::Finished(result))
            }
            _ => {
                trace!(
                    "[AStar] worker {} FAILED: open list exhausted after {} nodes",
                    self.worker_id, search.expanded
                );
                Err(PathError::NoPath {
                    searched: search.expanded,
                })
            }
        }
    }

    fn expand(
        &mut self,
        search: &ActiveSearch,
        scratch: &mut ScratchBuffer,
        data: &NavData,
        entry: HeapEntry,
    ) {
        let storage = data.storage();
        let current = entry.node;
        let mut expansion = Expansion {
            heap: &mut self.heap,
            scratch,
            temporary: &self.temporary,
            data,
            objective: &search.objective,
            stamp: self.stamp,
            parent: current,
        };

        if let Some(temp) = self.temporary.get(current) {
            if temp.kind != TemporaryKind::Start {
                return;
            }
            let node = temp.associated;
            let Some(record) = storage.get(node) else {
                return;
            };
            let Some(graph) = data.graphs().get(record.graph) else {
                return;
            };
            let extra = search.provider.traversal_cost(&search.constraint, record);
            for variant in 0..record.variants {
                let position = graph.variant_position(node, variant, FRACTION_CENTER, storage);
                let g = entry
                    .g
                    .saturating_add(temp.position.cost_to(&position))
                    .saturating_add(extra);
                expansion.consider(node + variant as NodeIndex, g, FRACTION_CENTER);
            }
            return;
        }

        let Some(base) = storage.base_of(current) else {
            return;
        };
        let Some(record) = storage.get(base) else {
            return;
        };
        let Some(graph) = data.graphs().get(record.graph) else {
            return;
        };
        let variant = (current - base) as u8;
        let current_node = *expansion.scratch.get(current);

        self.connections.clear();
        let connections = &mut self.connections;
        graph.for_each_connection(base, variant, storage, &mut |c| connections.push(c));

        for c in self.connections.iter() {
            let Some(target) = storage.get(c.target) else {
                continue;
            };
            if c.target_variant >= target.variants
                || !search
                    .provider
                    .can_traverse_edge(&search.constraint, record, target)
            {
                continue;
            }
            let cost = c
                .cost
                .saturating_add(search.provider.traversal_cost(&search.constraint, target));
            expansion.consider(
                c.target + c.target_variant as NodeIndex,
                entry.g.saturating_add(cost),
                c.fraction,
            );
        }

        if current_node.flag1()
            && let Some(end) = self.temporary.get(search.end_temp)
        {
            let position =
                graph.variant_position(base, variant, current_node.fraction(), storage);
            expansion.consider(
                search.end_temp,
                entry.g.saturating_add(position.cost_to(&end.position)),
                FRACTION_CENTER,
            );
        }
    }

    /// Walk parents from `from` back to the start and build the result
    fn trace(
        &mut self,
        search: &ActiveSearch,
        scratch: &mut ScratchBuffer,
        data: &NavData,
        from: NodeIndex,
        cost: u32,
        partial: bool,
    ) -> Result<SearchResult, PathError> {
        let max = self.config.max_trace_length;
        let mut chain: Vec<(NodeIndex, u8)> = Vec::new();
        let mut current = from;

        while current != search.start_temp {
            if chain.len() >= max {
                warn!(
                    "[AStar] worker {} trace exceeded {} nodes, aborting",
                    self.worker_id, max
                );
                return Err(PathError::TraceTooLong(max));
            }
            let node = scratch.get_mut(current);
            if node.flag2() {
                warn!(
                    "[AStar] worker {} parent chain loops at node {}",
                    self.worker_id, current
                );
                return Err(PathError::TraceTooLong(chain.len()));
            }
            let parent = node.parent();
            if !is_temporary(current) {
                node.set_flag2(true);
                self.flagged.push(current);
                chain.push((current, node.fraction()));
            }
            current = parent;
        }
        chain.reverse();

        let storage = data.storage();
        let mut nodes = Vec::with_capacity(chain.len());
        let mut vector_path = Vec::with_capacity(chain.len() + 2);
        if let Some(start) = self.temporary.get(search.start_temp) {
            push_distinct(&mut vector_path, start.position);
        }
        for (index, fraction) in chain {
            let Some(base) = storage.base_of(index) else {
                return Err(PathError::Internal(format!(
                    "node {} was freed during the search",
                    index
                )));
            };
            // Same node entered through several variants
            if nodes.last() == Some(&base) {
                continue;
            }
            nodes.push(base);
            if let Some(position) = data.path_node_position(index, fraction) {
                push_distinct(&mut vector_path, position);
            }
        }
        if !partial && let Some(end) = self.temporary.get(search.end_temp) {
            push_distinct(&mut vector_path, end.position);
        }

        Ok(SearchResult {
            nodes,
            vector_path,
            cost,
            searched_nodes: search.expanded,
            partial,
        })
    }

    #[cfg(test)]
    pub(crate) fn set_stamp(&mut self, stamp: u16) {
        self.stamp = stamp;
    }

    #[cfg(test)]
    pub(crate) fn scratch(&self) -> Arc<Mutex<ScratchBuffer>> {
        Arc::clone(&self.scratch)
    }
}

/// Borrowed state for relaxing edges out of one node
struct Expansion<'a> {
    heap: &'a mut OpenList,
    scratch: &'a mut ScratchBuffer,
    temporary: &'a TemporaryNodes,
    data: &'a NavData,
    objective: &'a HeuristicObjective,
    stamp: u16,
    parent: NodeIndex,
}

impl Expansion<'_> {
    fn position(&self, node: NodeIndex, fraction: u8) -> Int3 {
        match self.temporary.get(node) {
            Some(temp) => temp.position,
            None => self
                .data
                .path_node_position(node, fraction)
                .unwrap_or(Int3::ZERO),
        }
    }

    fn consider(&mut self, node: NodeIndex, g: u32, fraction: u8) {
        let path_node = *self.scratch.get(node);

        if !path_node.is_current(self.stamp) {
            let h = self.objective.estimate(self.position(node, fraction));
            let fresh = self.scratch.get_mut(node);
            fresh.touch(self.stamp);
            fresh.set_parent(self.parent);
            fresh.set_fraction(fraction);
            self.heap.push(self.scratch, node, g, h);
            return;
        }

        // Settled
        if path_node.heap_index == NOT_IN_HEAP {
            return;
        }

        let open = *self.heap.entry(path_node.heap_index);
        let h = if path_node.fraction() == fraction {
            open.h
        } else {
            self.objective.estimate(self.position(node, fraction))
        };
        if g.saturating_add(h) < open.f {
            let improved = self.scratch.get_mut(node);
            improved.set_parent(self.parent);
            improved.set_fraction(fraction);
            self.heap.decrease(self.scratch, path_node.heap_index, g, h);
        }
    }
}

fn snap(data: &NavData, nearest: &NearestNode, query: Int3, snapping: EndpointSnapping) -> Int3 {
    match snapping {
        EndpointSnapping::NodeCenter => data.node(nearest.node).map_or(query, |r| r.position),
        EndpointSnapping::ClosestOnNode => nearest.closest,
        EndpointSnapping::Original => query,
    }
}

fn push_distinct(path: &mut Vec<Int3>, point: Int3) {
    if path.last() != Some(&point) {
        path.push(point);
    }
}
