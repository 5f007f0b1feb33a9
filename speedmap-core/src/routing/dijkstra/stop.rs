//! Early-exit predicates for the relaxation loop

use std::ops::ControlFlow;

use hashbrown::HashSet;

use crate::IntersectionId;

/// Decides, each time a node's distance becomes final, whether the search
/// may stop.
pub trait StopCondition {
    fn on_settled(&mut self, node: IntersectionId) -> ControlFlow<()>;
}

/// Never stops; settles everything reachable
#[derive(Debug, Clone, Copy, Default)]
pub struct Exhaustive;

impl StopCondition for Exhaustive {
    fn on_settled(&mut self, _node: IntersectionId) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Stops once a single target is settled
#[derive(Debug, Clone, Copy)]
pub struct StopAt(pub IntersectionId);

impl StopCondition for StopAt {
    fn on_settled(&mut self, node: IntersectionId) -> ControlFlow<()> {
        if node == self.0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Removes targets from the set as they settle and stops when it is empty
#[derive(Debug)]
pub struct StopAtAll<'a> {
    targets: &'a mut HashSet<IntersectionId>,
}

impl<'a> StopAtAll<'a> {
    pub fn new(targets: &'a mut HashSet<IntersectionId>) -> Self {
        Self { targets }
    }
}

impl StopCondition for StopAtAll<'_> {
    fn on_settled(&mut self, node: IntersectionId) -> ControlFlow<()> {
        if self.targets.remove(&node) && self.targets.is_empty() {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Any `FnMut(node) -> bool` closure, returning `true` to stop
impl<F> StopCondition for F
where
    F: FnMut(IntersectionId) -> bool,
{
    fn on_settled(&mut self, node: IntersectionId) -> ControlFlow<()> {
        if self(node) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
