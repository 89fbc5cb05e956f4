// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The graph-structured stack.
//!
//! Nodes live in an arena owned by one parse and refer to each other by
//! index. A node is identified by its state, its runtime lookahead and the
//! span it covers, so heads that reach the same key are merged. Edges point
//! from a node to the nodes below it; a node always starts where the nodes
//! below it end.

use std::collections::{BTreeMap, BTreeSet};

use crate::automaton::{LookaheadSet, StateId};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(usize);

/// An interned runtime lookahead set.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LookaheadId(usize);

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeKey {
  pub state: StateId,
  pub lookahead: LookaheadId,
  pub start: usize,
  pub pos: usize,
}

/// What a [`Gss::push`] changed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Pushed {
  pub node: NodeId,
  pub created: bool,
  pub new_edge: bool,
}

struct GssNode {
  key: NodeKey,
  previous: BTreeSet<NodeId>,
  graft_followers: BTreeSet<NodeId>,
}

#[derive(Default)]
pub struct Gss {
  nodes: Vec<GssNode>,
  index: BTreeMap<NodeKey, NodeId>,
  lookaheads: Vec<LookaheadSet>,
  lookahead_index: BTreeMap<LookaheadSet, LookaheadId>,
  edges: usize,
}

impl Gss {
  pub fn new() -> Self {
    Gss::default()
  }

  pub fn intern_lookahead(&mut self, set: LookaheadSet) -> LookaheadId {
    if let Some(id) = self.lookahead_index.get(&set) {
      return *id;
    }
    let id = LookaheadId(self.lookaheads.len());
    self.lookaheads.push(set.clone());
    self.lookahead_index.insert(set, id);
    id
  }

  pub fn lookahead(&self, id: LookaheadId) -> &LookaheadSet {
    &self.lookaheads[id.0]
  }

  pub fn key(&self, node: NodeId) -> &NodeKey {
    &self.nodes[node.0].key
  }

  /// Returns the node for `key`, creating it if needed. The flag is true if
  /// the node is new.
  pub fn node(&mut self, key: NodeKey) -> (NodeId, bool) {
    if let Some(id) = self.index.get(&key) {
      return (*id, false);
    }
    let id = NodeId(self.nodes.len());
    self.nodes.push(GssNode {
      key,
      previous: BTreeSet::new(),
      graft_followers: BTreeSet::new(),
    });
    self.index.insert(key, id);
    (id, true)
  }

  /// Adds an edge from `node` down to `prev`. Returns true if it is new.
  pub fn add_edge(&mut self, node: NodeId, prev: NodeId) -> bool {
    debug_assert_eq!(self.key(node).start, self.key(prev).pos);
    let added = self.nodes[node.0].previous.insert(prev);
    if added {
      self.edges += 1;
    }
    added
  }

  /// Finds or creates the node for `key` and links it to `prev`.
  pub fn push(&mut self, key: NodeKey, prev: NodeId) -> Pushed {
    let (node, created) = self.node(key);
    let new_edge = self.add_edge(node, prev);
    Pushed {
      node,
      created,
      new_edge,
    }
  }

  /// The nodes directly below `node`.
  pub fn previous(&self, node: NodeId) -> Vec<NodeId> {
    self.nodes[node.0].previous.iter().copied().collect()
  }

  /// Records that `follower` was grafted from `node`, so it shares every
  /// node below `node`.
  pub fn add_graft_follower(&mut self, node: NodeId, follower: NodeId) -> bool {
    self.nodes[node.0].graft_followers.insert(follower)
  }

  pub fn graft_followers(&self, node: NodeId) -> Vec<NodeId> {
    self.nodes[node.0].graft_followers.iter().copied().collect()
  }

  pub fn num_nodes(&self) -> usize {
    self.nodes.len()
  }

  pub fn num_edges(&self) -> usize {
    self.edges
  }

  /// The largest number of nodes ending at a single position.
  pub fn max_heads(&self) -> usize {
    let mut per_pos: BTreeMap<usize, usize> = BTreeMap::new();
    for node in &self.nodes {
      *per_pos.entry(node.key.pos).or_default() += 1;
    }
    per_pos.values().copied().max().unwrap_or(0)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn key(gss: &mut Gss, state: usize, start: usize, pos: usize) -> NodeKey {
    NodeKey {
      state: StateId::from_index(state),
      lookahead: gss.intern_lookahead(LookaheadSet::end_of_text()),
      start,
      pos,
    }
  }

  #[test]
  fn test_nodes_are_merged_by_key() {
    let mut gss = Gss::new();
    let k = key(&mut gss, 0, 0, 0);
    let (a, created_a) = gss.node(k);
    let (b, created_b) = gss.node(k);
    assert_eq!(a, b);
    assert!(created_a);
    assert!(!created_b);
    assert_eq!(gss.num_nodes(), 1);
  }

  #[test]
  fn test_push_and_previous() {
    let mut gss = Gss::new();
    let bottom_key = key(&mut gss, 0, 0, 0);
    let (bottom, _) = gss.node(bottom_key);
    let top_key = key(&mut gss, 1, 0, 1);
    let pushed = gss.push(top_key, bottom);
    assert!(pushed.created);
    assert!(pushed.new_edge);
    let top = pushed.node;
    assert_eq!(
      gss.push(top_key, bottom),
      Pushed {
        node: top,
        created: false,
        new_edge: false,
      }
    );
    assert_eq!(gss.previous(top), vec![bottom]);
    assert_eq!(gss.num_edges(), 1);
    assert_eq!(gss.max_heads(), 1);
  }

  #[test]
  fn test_lookaheads_are_interned() {
    let mut gss = Gss::new();
    let a = gss.intern_lookahead(LookaheadSet::any());
    let b = gss.intern_lookahead(LookaheadSet::any());
    assert_eq!(a, b);
    assert_eq!(gss.lookahead(a), &LookaheadSet::any());
  }
}
