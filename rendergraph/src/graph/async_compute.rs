//! Cross-queue scheduling of async compute passes.
//!
//! Async compute passes run on the compute queue in declaration order. Runs of
//! consecutive async passes form a bucket. When the bucket is closed (by the
//! next surviving non-async pass, or at the end of the frame) it is synchronized
//! with the graphics queue:
//!
//! - the latest graphics pass producing something the bucket reads signals the
//!   graphics fence, and the first pass of the bucket waits for it;
//! - the last pass of the bucket signals the compute fence, and the earliest
//!   later graphics pass that consumes what the bucket wrote, or touches what
//!   it read, waits for it.
//!
//! Fence values assigned here are relative to the values the fences held when
//! the frame started. Values on each queue increase in execution order: compute
//! values follow bucket order, graphics values are handed out once every bucket
//! is known, in graphics pass order.

use super::dag::{Dag, NodeId};
use super::pass::PassNode;
use super::{EdgeData, GraphNode};

/// Number of fence values a frame consumes on each queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FenceCounts {
    pub graphics: u64,
    pub compute: u64,
}

#[derive(Debug, Default)]
struct Bucket {
    compute: Vec<usize>,
    pre_graphics: Option<usize>,
    post_graphics: Option<usize>,
}

/// A graphics producer the first pass of a bucket has to wait for.
#[derive(Debug, Clone, Copy)]
struct GraphicsWait {
    producer: usize,
    waiter: usize,
}

impl Bucket {
    fn flush(
        &mut self,
        passes: &mut [PassNode],
        counts: &mut FenceCounts,
        graphics_waits: &mut Vec<GraphicsWait>,
    ) {
        let (Some(&first), Some(&last)) = (self.compute.first(), self.compute.last()) else {
            return;
        };

        if let Some(producer) = self.pre_graphics {
            graphics_waits.push(GraphicsWait {
                producer,
                waiter: first,
            });
        }

        if let Some(post) = self.post_graphics {
            counts.compute += 1;
            let value = counts.compute;
            passes[last].signal_value = Some(value);
            wait_at_least(&mut passes[post], value);
            log::trace!(
                "'{}' waits for '{}' (compute fence +{value})",
                passes[post].name,
                passes[last].name
            );
        }

        *self = Self::default();
    }
}

/// Give every graphics producer a signal value in pass order, then make the
/// async passes wait for them.
fn resolve_graphics_waits(
    passes: &mut [PassNode],
    counts: &mut FenceCounts,
    waits: &[GraphicsWait],
) {
    let mut producers: Vec<usize> = waits.iter().map(|wait| wait.producer).collect();
    producers.sort_unstable();
    producers.dedup();
    for producer in producers {
        counts.graphics += 1;
        passes[producer].signal_value = Some(counts.graphics);
    }

    for wait in waits {
        let Some(value) = passes[wait.producer].signal_value else {
            continue;
        };
        wait_at_least(&mut passes[wait.waiter], value);
        log::trace!(
            "'{}' waits for '{}' (graphics fence +{value})",
            passes[wait.waiter].name,
            passes[wait.producer].name
        );
    }
}

fn wait_at_least(pass: &mut PassNode, value: u64) {
    pass.wait_value = Some(pass.wait_value.map_or(value, |wait| wait.max(value)));
}

fn earliest_after(post: &mut Option<usize>, candidate: Option<usize>, index: usize) {
    if let Some(candidate) = candidate.filter(|&candidate| candidate > index) {
        *post = Some(post.map_or(candidate, |post| post.min(candidate)));
    }
}

fn pass_index(dag: &Dag<GraphNode, EdgeData>, id: NodeId) -> Option<usize> {
    match *dag.node(id) {
        GraphNode::Pass(index) => Some(index),
        GraphNode::Resource(_) => None,
    }
}

/// Assign fence waits and signals for every surviving async compute pass.
pub(crate) fn schedule(dag: &Dag<GraphNode, EdgeData>, passes: &mut [PassNode]) -> FenceCounts {
    let mut counts = FenceCounts::default();
    let mut bucket = Bucket::default();
    let mut graphics_waits = Vec::new();

    for index in 0..passes.len() {
        let pass_id = passes[index].dag_id;
        if dag.is_culled(pass_id) {
            continue;
        }
        if !passes[index].is_async() {
            bucket.flush(passes, &mut counts, &mut graphics_waits);
            continue;
        }

        let is_graphics = |id: NodeId| {
            !dag.is_culled(id) && pass_index(dag, id).is_some_and(|pass| !passes[pass].is_async())
        };

        for &input in dag.incoming_edges(pass_id) {
            let resource = dag.edge(input).from();
            // Producers of everything this pass consumes.
            for &producer in dag.incoming_edges(resource) {
                let writer = dag.edge(producer).from();
                if is_graphics(writer) {
                    let writer = pass_index(dag, writer);
                    bucket.pre_graphics = bucket.pre_graphics.max(writer);
                }
            }
            // Later graphics passes touching the same version must not
            // transition or overwrite it while this pass still reads it.
            for &other in dag.outgoing_edges(resource) {
                let user = dag.edge(other).to();
                if is_graphics(user) {
                    earliest_after(&mut bucket.post_graphics, pass_index(dag, user), index);
                }
            }
        }

        // Consumers of everything this pass produces.
        for &output in dag.outgoing_edges(pass_id) {
            let resource = dag.edge(output).to();
            for &consumer in dag.outgoing_edges(resource) {
                let reader = dag.edge(consumer).to();
                if is_graphics(reader) {
                    earliest_after(&mut bucket.post_graphics, pass_index(dag, reader), index);
                }
            }
        }

        bucket.compute.push(index);
    }
    bucket.flush(passes, &mut counts, &mut graphics_waits);
    resolve_graphics_waits(passes, &mut counts, &graphics_waits);

    counts
}
