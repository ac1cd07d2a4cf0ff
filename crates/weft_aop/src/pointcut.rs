//! Pointcuts: the join points resolved for one component.

use crate::join_point::{BoundJoinPoint, JoinPoint};
use crate::meta::TypeDescriptor;
use core::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Queued {
    order: i32,
    seq: u64,
    join_point: BoundJoinPoint,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order
            .cmp(&other.order)
            .then(self.seq.cmp(&other.seq))
    }
}

/// The join points resolved for one component, ordered by ascending
/// precedence. Equal precedence keeps insertion order.
#[derive(Debug, Clone)]
pub struct Pointcut {
    bean_name: String,
    target_type: Arc<TypeDescriptor>,
    queue: BinaryHeap<Reverse<Queued>>,
    next_seq: u64,
}

impl Pointcut {
    /// Creates an empty pointcut for `bean_name`.
    pub fn new(bean_name: impl Into<String>, target_type: Arc<TypeDescriptor>) -> Self {
        Self {
            bean_name: bean_name.into(),
            target_type,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Name of the advised component.
    #[must_use]
    pub fn bean_name(&self) -> &str {
        &self.bean_name
    }

    /// Declared type of the advised component.
    #[must_use]
    pub fn target_type(&self) -> &Arc<TypeDescriptor> {
        &self.target_type
    }

    /// Adds a join point.
    pub fn add_join_point(&mut self, join_point: BoundJoinPoint) {
        let queued = Queued {
            order: join_point.order(),
            seq: self.next_seq,
            join_point,
        };
        self.next_seq += 1;
        self.queue.push(Reverse(queued));
    }

    /// Removes every join point equal to `join_point`. Returns `true` if
    /// anything was removed.
    pub fn remove_join_point(&mut self, join_point: &BoundJoinPoint) -> bool {
        let before = self.queue.len();
        self.queue
            .retain(|Reverse(queued)| queued.join_point != *join_point);
        self.queue.len() != before
    }

    /// Number of join points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if there are no join points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Join points in precedence order, leaving the pointcut untouched.
    #[must_use]
    pub fn join_points(&self) -> Vec<BoundJoinPoint> {
        let mut queued: Vec<&Queued> = self.queue.iter().map(|Reverse(queued)| queued).collect();
        queued.sort();
        queued
            .into_iter()
            .map(|queued| queued.join_point.clone())
            .collect()
    }

    /// Empties the pointcut, yielding join points in precedence order.
    pub fn drain_ordered(&mut self) -> Vec<BoundJoinPoint> {
        let mut ordered = Vec::with_capacity(self.queue.len());
        while let Some(Reverse(queued)) = self.queue.pop() {
            ordered.push(queued.join_point);
        }
        ordered
    }
}
