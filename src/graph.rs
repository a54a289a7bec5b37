// SPDX-License-Identifier: Apache-2.0

//! Subject graph: the DAG that the mapper covers with LUTs.
//!
//! Nodes are appended in topological order and addressed by a dense id; every
//! fanin id is strictly smaller than the id of the node that uses it, so the id
//! order *is* the topological order and no sort is ever required.
//!
//! Storage is paged: nodes are written into fixed-size pages that are never
//! reallocated or individually freed, the whole graph is dropped at once.

use std::fmt;

const PAGE_BITS: usize = 12;
const PAGE_SIZE: usize = 1 << PAGE_BITS;
const PAGE_MASK: usize = PAGE_SIZE - 1;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeRef {
    pub id: usize,
}

impl NodeRef {
    pub const CONST0: NodeRef = NodeRef { id: 0 };
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Operand {
    pub node: NodeRef,
    pub negated: bool,
}

impl Operand {
    pub const FALSE: Operand = Operand {
        node: NodeRef::CONST0,
        negated: false,
    };
    pub const TRUE: Operand = Operand {
        node: NodeRef::CONST0,
        negated: true,
    };

    pub fn new(id: usize, negated: bool) -> Self {
        Self {
            node: NodeRef { id },
            negated,
        }
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        Self {
            node: self.node,
            negated: !self.negated,
        }
    }

    #[must_use]
    pub fn negate_if(&self, cond: bool) -> Self {
        if cond { self.negate() } else { *self }
    }

    pub fn is_const(&self) -> bool {
        self.node == NodeRef::CONST0
    }

    /// Packs the operand AIGER-style: `id << 1 | negated`.
    pub fn to_raw(&self) -> u32 {
        debug_assert!(self.node.id < (1 << 31));
        ((self.node.id as u32) << 1) | (self.negated as u32)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self {
            node: NodeRef {
                id: (raw >> 1) as usize,
            },
            negated: (raw & 1) != 0,
        }
    }
}

impl From<NodeRef> for Operand {
    fn from(node: NodeRef) -> Self {
        Operand {
            node,
            negated: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Const0,
    /// Combinational input.
    Ci,
    /// Combinational output; its single fanin is the driver.
    Co,
    Buf,
    And,
    Xor,
    /// Fanins are `[d0, d1, sel]`, the output is `sel ? d1 : d0`.
    Mux,
}

impl NodeKind {
    pub fn arity(self) -> usize {
        match self {
            NodeKind::Const0 | NodeKind::Ci => 0,
            NodeKind::Co | NodeKind::Buf => 1,
            NodeKind::And | NodeKind::Xor => 2,
            NodeKind::Mux => 3,
        }
    }

    /// Returns true for nodes that get covered by a LUT.
    pub fn is_logic(self) -> bool {
        matches!(
            self,
            NodeKind::Buf | NodeKind::And | NodeKind::Xor | NodeKind::Mux
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    fanins: [Operand; 3],
    pub sibling: Option<NodeRef>,
    /// Value of the node under the all-zero input assignment.
    pub phase: bool,
}

impl Node {
    pub fn fanins(&self) -> &[Operand] {
        &self.fanins[..self.kind.arity()]
    }

    pub fn fanin(&self, i: usize) -> Operand {
        debug_assert!(i < self.kind.arity());
        self.fanins[i]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    WrongArity {
        kind: NodeKind,
        got: usize,
    },
    ForwardReference {
        node: usize,
        fanin: usize,
    },
    FaninIsOutput {
        node: usize,
        fanin: usize,
    },
    BadSibling {
        node: usize,
        sibling: usize,
        reason: &'static str,
    },
    UnknownNode {
        node: usize,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::WrongArity { kind, got } => write!(
                f,
                "{:?} node expects {} fanins, got {}",
                kind,
                kind.arity(),
                got
            ),
            GraphError::ForwardReference { node, fanin } => write!(
                f,
                "node {} references fanin {} which is not defined before it",
                node, fanin
            ),
            GraphError::FaninIsOutput { node, fanin } => write!(
                f,
                "node {} uses combinational output {} as a fanin",
                node, fanin
            ),
            GraphError::BadSibling {
                node,
                sibling,
                reason,
            } => write!(f, "cannot link sibling {} to node {}: {}", sibling, node, reason),
            GraphError::UnknownNode { node } => write!(f, "node {} does not exist", node),
        }
    }
}

impl std::error::Error for GraphError {}

#[derive(Debug, Clone)]
pub struct SubjectGraph {
    pages: Vec<Vec<Node>>,
    len: usize,
    inputs: Vec<NodeRef>,
    outputs: Vec<NodeRef>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    refs: Vec<u32>,
    choice_count: usize,
}

impl Default for SubjectGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SubjectGraph {
    /// Creates a graph holding only the constant-0 node (id 0).
    pub fn new() -> Self {
        let mut g = SubjectGraph {
            pages: Vec::new(),
            len: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_names: Vec::new(),
            output_names: Vec::new(),
            refs: Vec::new(),
            choice_count: 0,
        };
        g.push_node(Node {
            kind: NodeKind::Const0,
            fanins: [Operand::FALSE; 3],
            sibling: None,
            phase: false,
        });
        g
    }

    fn push_node(&mut self, node: Node) -> NodeRef {
        let id = self.len;
        if id & PAGE_MASK == 0 {
            self.pages.push(Vec::with_capacity(PAGE_SIZE));
        }
        self.pages
            .last_mut()
            .expect("page was just ensured")
            .push(node);
        self.len += 1;
        NodeRef { id }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        // The constant node is always present.
        false
    }

    #[inline]
    pub fn node(&self, r: NodeRef) -> &Node {
        debug_assert!(r.id < self.len, "node {} out of range {}", r.id, self.len);
        &self.pages[r.id >> PAGE_BITS][r.id & PAGE_MASK]
    }

    #[inline]
    fn node_mut(&mut self, r: NodeRef) -> &mut Node {
        &mut self.pages[r.id >> PAGE_BITS][r.id & PAGE_MASK]
    }

    pub fn kind(&self, r: NodeRef) -> NodeKind {
        self.node(r).kind
    }

    pub fn inputs(&self) -> &[NodeRef] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[NodeRef] {
        &self.outputs
    }

    pub fn input_name(&self, index: usize) -> &str {
        &self.input_names[index]
    }

    pub fn output_name(&self, index: usize) -> &str {
        &self.output_names[index]
    }

    /// Returns the operand driving output `co`.
    pub fn output_driver(&self, co: NodeRef) -> Operand {
        debug_assert_eq!(self.kind(co), NodeKind::Co);
        self.node(co).fanin(0)
    }

    /// Appends a node and returns its non-negated literal.
    ///
    /// Fanins must refer to already existing, non-output nodes; this is what
    /// keeps the id order topological.
    pub fn append(&mut self, kind: NodeKind, fanins: &[Operand]) -> Result<Operand, GraphError> {
        if fanins.len() != kind.arity() || kind == NodeKind::Const0 {
            return Err(GraphError::WrongArity {
                kind,
                got: fanins.len(),
            });
        }
        let id = self.len;
        for f in fanins {
            if f.node.id >= id {
                return Err(GraphError::ForwardReference {
                    node: id,
                    fanin: f.node.id,
                });
            }
            if self.kind(f.node) == NodeKind::Co {
                return Err(GraphError::FaninIsOutput {
                    node: id,
                    fanin: f.node.id,
                });
            }
        }
        let value = |g: &Self, o: Operand| g.node(o.node).phase ^ o.negated;
        let phase = match kind {
            NodeKind::Const0 | NodeKind::Ci => false,
            NodeKind::Co | NodeKind::Buf => value(self, fanins[0]),
            NodeKind::And => value(self, fanins[0]) && value(self, fanins[1]),
            NodeKind::Xor => value(self, fanins[0]) ^ value(self, fanins[1]),
            NodeKind::Mux => {
                if value(self, fanins[2]) {
                    value(self, fanins[1])
                } else {
                    value(self, fanins[0])
                }
            }
        };
        let mut slots = [Operand::FALSE; 3];
        slots[..fanins.len()].copy_from_slice(fanins);
        let r = self.push_node(Node {
            kind,
            fanins: slots,
            sibling: None,
            phase,
        });
        match kind {
            NodeKind::Ci => {
                self.input_names.push(format!("i{}", self.inputs.len()));
                self.inputs.push(r);
            }
            NodeKind::Co => {
                self.output_names.push(format!("o{}", self.outputs.len()));
                self.outputs.push(r);
            }
            _ => {}
        }
        Ok(r.into())
    }

    pub fn add_input(&mut self, name: impl Into<String>) -> Operand {
        let op = self
            .append(NodeKind::Ci, &[])
            .expect("inputs have no fanins");
        *self.input_names.last_mut().expect("input was just added") = name.into();
        op
    }

    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        driver: Operand,
    ) -> Result<NodeRef, GraphError> {
        let op = self.append(NodeKind::Co, &[driver])?;
        *self.output_names.last_mut().expect("output was just added") = name.into();
        Ok(op.node)
    }

    /// Adds `a & b`, folding constants and trivially equal operands.
    pub fn add_and(&mut self, a: Operand, b: Operand) -> Result<Operand, GraphError> {
        if a == Operand::FALSE || b == Operand::FALSE || a == b.negate() {
            return Ok(Operand::FALSE);
        }
        if a == Operand::TRUE || a == b {
            return Ok(b);
        }
        if b == Operand::TRUE {
            return Ok(a);
        }
        let (a, b) = if a.node.id <= b.node.id { (a, b) } else { (b, a) };
        self.append(NodeKind::And, &[a, b])
    }

    pub fn add_or(&mut self, a: Operand, b: Operand) -> Result<Operand, GraphError> {
        Ok(self.add_and(a.negate(), b.negate())?.negate())
    }

    /// Adds `a ^ b`; operand negations are pushed to the output.
    pub fn add_xor(&mut self, a: Operand, b: Operand) -> Result<Operand, GraphError> {
        let out_neg = a.negated ^ b.negated;
        let (a, b) = (a.negate_if(a.negated), b.negate_if(b.negated));
        if a == b {
            return Ok(Operand::FALSE.negate_if(out_neg));
        }
        if a.is_const() {
            return Ok(b.negate_if(out_neg));
        }
        if b.is_const() {
            return Ok(a.negate_if(out_neg));
        }
        let (a, b) = if a.node.id <= b.node.id { (a, b) } else { (b, a) };
        Ok(self.append(NodeKind::Xor, &[a, b])?.negate_if(out_neg))
    }

    /// Adds `sel ? d1 : d0`.
    pub fn add_mux(
        &mut self,
        d0: Operand,
        d1: Operand,
        sel: Operand,
    ) -> Result<Operand, GraphError> {
        if sel.is_const() {
            return Ok(if sel.negated { d1 } else { d0 });
        }
        if d0 == d1 {
            return Ok(d0);
        }
        let (d0, d1, sel) = if sel.negated {
            (d1, d0, sel.negate())
        } else {
            (d0, d1, sel)
        };
        self.append(NodeKind::Mux, &[d0, d1, sel])
    }

    pub fn add_buf(&mut self, a: Operand) -> Result<Operand, GraphError> {
        self.append(NodeKind::Buf, &[a])
    }

    /// Links `sibling` as the structural choice of `node`.
    ///
    /// The two nodes must compute the same function up to complement; the
    /// graph cannot check that, but it does check ordering and uniqueness.
    pub fn set_sibling(&mut self, node: NodeRef, sibling: NodeRef) -> Result<(), GraphError> {
        if node.id >= self.len || sibling.id >= self.len {
            return Err(GraphError::UnknownNode {
                node: node.id.max(sibling.id),
            });
        }
        let reject = |reason| GraphError::BadSibling {
            node: node.id,
            sibling: sibling.id,
            reason,
        };
        if sibling.id >= node.id {
            return Err(reject("sibling must precede the node"));
        }
        if !self.kind(node).is_logic() || !self.kind(sibling).is_logic() {
            return Err(reject("only logic nodes can be choices"));
        }
        if self.node(node).sibling.is_some() {
            return Err(reject("node already has a sibling"));
        }
        self.node_mut(node).sibling = Some(sibling);
        self.choice_count += 1;
        Ok(())
    }

    pub fn sibling(&self, node: NodeRef) -> Option<NodeRef> {
        self.node(node).sibling
    }

    /// Iterates the sibling chain of `node`, not including `node` itself.
    pub fn siblings(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        let mut cur = node;
        std::iter::from_fn(move || {
            let next = self.sibling(cur)?;
            cur = next;
            Some(next)
        })
    }

    pub fn has_choices(&self) -> bool {
        self.choice_count > 0
    }

    pub fn topo_order(
        &self,
    ) -> impl DoubleEndedIterator<Item = NodeRef> + ExactSizeIterator + use<> {
        (0..self.len).map(|id| NodeRef { id })
    }

    pub fn reverse_topo_order(&self) -> impl Iterator<Item = NodeRef> + use<> {
        self.topo_order().rev()
    }

    /// Recomputes structural reference counts: one per fanin edge (outputs
    /// included) plus one per sibling-chain membership.
    pub fn reset_references(&mut self) {
        let mut refs = vec![0u32; self.len];
        for r in self.topo_order() {
            let node = self.node(r);
            for f in node.fanins() {
                refs[f.node.id] += 1;
            }
            for s in self.siblings(r) {
                refs[s.id] += 1;
            }
        }
        self.refs = refs;
    }

    pub fn reference_count(&self, node: NodeRef) -> u32 {
        self.refs[node.id]
    }

    /// Decrements the structural reference count of `node` and returns the new
    /// value.
    pub fn decrement_reference(&mut self, node: NodeRef) -> u32 {
        let count = &mut self.refs[node.id];
        assert!(*count > 0, "reference count underflow at node {}", node.id);
        *count -= 1;
        *count
    }

    /// Fanout counts (including output references), independent of the
    /// per-round reference bookkeeping.
    pub fn fanout_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.len];
        for r in self.topo_order() {
            for f in self.node(r).fanins() {
                counts[f.node.id] += 1;
            }
        }
        counts
    }

    /// Largest fanin count over all logic nodes.
    pub fn max_fanin_arity(&self) -> usize {
        self.topo_order()
            .map(|r| self.kind(r))
            .filter(|k| k.is_logic())
            .map(|k| k.arity())
            .max()
            .unwrap_or(0)
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.topo_order().filter(|r| self.kind(*r) == kind).count()
    }

    /// Logic level of every node (inputs and constants are level 0).
    pub fn levels(&self) -> Vec<usize> {
        let mut levels = vec![0usize; self.len];
        for r in self.topo_order() {
            let node = self.node(r);
            let max_fanin = node
                .fanins()
                .iter()
                .map(|f| levels[f.node.id])
                .max()
                .unwrap_or(0);
            levels[r.id] = match node.kind {
                NodeKind::Co | NodeKind::Buf => max_fanin,
                NodeKind::Const0 | NodeKind::Ci => 0,
                _ => max_fanin + 1,
            };
        }
        levels
    }

    /// Rechecks the DAG invariant and the sibling ordering.
    pub fn validate(&self) -> Result<(), GraphError> {
        for r in self.topo_order() {
            let node = self.node(r);
            for f in node.fanins() {
                if f.node.id >= r.id {
                    return Err(GraphError::ForwardReference {
                        node: r.id,
                        fanin: f.node.id,
                    });
                }
            }
            if let Some(s) = node.sibling {
                if s.id >= r.id {
                    return Err(GraphError::BadSibling {
                        node: r.id,
                        sibling: s.id,
                        reason: "sibling must precede the node",
                    });
                }
            }
        }
        Ok(())
    }
}
