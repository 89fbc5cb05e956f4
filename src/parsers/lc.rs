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

//! The left-corner driver.
//!
//! Work is processed in order of input position, first in first out within
//! a position, so every head that reaches a position is merged before any
//! head is advanced past it.

use std::{
  collections::{BTreeMap, BTreeSet, VecDeque},
  sync::Arc,
};

use crate::{
  automaton::{
    Automaton, LookaheadSet, ParserState, StateId, Transition,
    TransitionAction,
  },
  grammar::RuleId,
  parsers::{
    forest::{ChildRef, Forest, LeafMatch},
    gss::{Gss, NodeId, NodeKey},
    issues::Failures,
    scanner::Scanner,
  },
};

enum Work {
  Width(NodeId),
  Ascend(NodeId, NodeId),
}

/// Everything a finished run leaves behind.
pub struct Outcome {
  pub gss: Gss,
  pub forest: Forest,
  pub failures: Failures,
  /// The positions after each accepted derivation of the goal.
  pub accepts: BTreeSet<usize>,
  pub start: usize,
  pub work_items: usize,
}

pub struct Driver<'a> {
  automaton: &'a Automaton,
  scanner: &'a Scanner<'a>,
  states: BTreeMap<StateId, Arc<ParserState>>,
  gss: Gss,
  forest: Forest,
  failures: Failures,
  work: BTreeMap<usize, VecDeque<Work>>,
  accepts: BTreeSet<usize>,
  work_items: usize,
}

impl<'a> Driver<'a> {
  pub fn new(automaton: &'a Automaton, scanner: &'a Scanner<'a>) -> Self {
    Driver {
      automaton,
      scanner,
      states: BTreeMap::new(),
      gss: Gss::new(),
      forest: Forest::new(),
      failures: Failures::new(),
      work: BTreeMap::new(),
      accepts: BTreeSet::new(),
      work_items: 0,
    }
  }

  fn state(&mut self, id: StateId) -> Arc<ParserState> {
    let automaton = self.automaton;
    self
      .states
      .entry(id)
      .or_insert_with(|| automaton.state(id))
      .clone()
  }

  fn queue(&mut self, pos: usize, work: Work) {
    self.work.entry(pos).or_default().push_back(work);
  }

  fn pop_work(&mut self) -> Option<Work> {
    loop {
      let mut entry = self.work.first_entry()?;
      match entry.get_mut().pop_front() {
        Some(work) => return Some(work),
        None => {
          entry.remove();
        }
      }
    }
  }

  /// Parses from `start`, with `lookahead` standing for what must follow
  /// the goal.
  pub fn run(mut self, start: usize, lookahead: LookaheadSet) -> Outcome {
    let lookahead = self.gss.intern_lookahead(lookahead);
    let (root, _) = self.gss.node(NodeKey {
      state: StateId::START,
      lookahead,
      start,
      pos: start,
    });
    self.queue(start, Work::Width(root));

    while let Some(work) = self.pop_work() {
      self.work_items += 1;
      match work {
        Work::Width(node) => self.width(node),
        Work::Ascend(node, prev) => self.ascend(node, prev),
      }
    }

    log::debug!(
      "parse from {} finished: {} nodes, {} edges, {} work items, accepts at \
       {:?}",
      start,
      self.gss.num_nodes(),
      self.gss.num_edges(),
      self.work_items,
      self.accepts
    );

    Outcome {
      gss: self.gss,
      forest: self.forest,
      failures: self.failures,
      accepts: self.accepts,
      start,
      work_items: self.work_items,
    }
  }

  fn goal_tag(&mut self, node: NodeId) -> String {
    let state = self.state(self.gss.key(node).state);
    if state.id() == StateId::START {
      "<GOAL>".to_string()
    } else {
      self.automaton.rules().name(state.rule()).to_string()
    }
  }

  fn child_ref(&mut self, node: NodeId) -> ChildRef {
    let key = *self.gss.key(node);
    let state = self.state(key.state);
    if state.is_leaf() {
      ChildRef::Leaf(state.rule(), key.start)
    } else {
      ChildRef::Branch(state.rule(), key.start, key.pos)
    }
  }

  /// Creates a node if needed, queueing its width work.
  fn node(&mut self, key: NodeKey) -> NodeId {
    let (node, created) = self.gss.node(key);
    if created && !self.state(key.state).is_leaf() {
      self.queue(key.pos, Work::Width(node));
    }
    node
  }

  /// Pushes `key` on top of `prev`, queueing width work for a new node and
  /// ascend work for a new edge.
  fn push(&mut self, key: NodeKey, prev: NodeId) -> NodeId {
    let pushed = self.gss.push(key, prev);
    if pushed.created && !self.state(key.state).is_leaf() {
      self.queue(key.pos, Work::Width(pushed.node));
    }
    if pushed.new_edge {
      self.edge_added(pushed.node, prev);
    }
    pushed.node
  }

  /// Links `node` to `prev`, along with every node grafted from `node`.
  fn link(&mut self, node: NodeId, prev: NodeId) {
    if self.gss.add_edge(node, prev) {
      self.edge_added(node, prev);
    }
  }

  /// Queues ascend work for a new edge and copies the edge to every node
  /// grafted from `node`.
  fn edge_added(&mut self, node: NodeId, prev: NodeId) {
    let mut pending = vec![(node, prev)];
    while let Some((node, prev)) = pending.pop() {
      let key = *self.gss.key(node);
      if self.state(key.state).is_complete() {
        self.queue(key.pos, Work::Ascend(node, prev));
      }
      for follower in self.gss.graft_followers(node) {
        if self.gss.add_edge(follower, prev) {
          pending.push((follower, prev));
        }
      }
    }
  }

  /// Records the growing node for a state over a span, registering the
  /// branches it completes.
  fn grow(
    &mut self,
    key: &NodeKey,
    prev: Option<NodeKey>,
    child: ChildRef,
  ) {
    let state = self.state(key.state);
    let (growing, created) =
      self.forest.growing(key.state, key.start, key.pos);
    if created {
      for option in state.end_options() {
        self.forest.add_branch_alternative(
          state.rule(),
          key.start,
          key.pos,
          option,
          growing,
        );
      }
    }
    let prev = prev.map(|p| self.forest.growing(p.state, p.start, p.pos).0);
    self.forest.add_growing_alternative(growing, prev, child);
  }

  fn width(&mut self, node: NodeId) {
    let key = *self.gss.key(node);
    let widths = self.automaton.widths(key.state);
    for t in widths.iter() {
      let terminal = self.state(t.to).rule();
      match self.scanner.match_at(terminal, key.pos) {
        Some(token) => {
          let up = t.lookahead.up.resolve(self.gss.lookahead(key.lookahead));
          let leaf_key = NodeKey {
            state: t.to,
            lookahead: self.gss.intern_lookahead(up),
            start: key.pos,
            pos: token.next,
          };
          self.forest.add_leaf(
            terminal,
            key.pos,
            LeafMatch {
              end: token.end,
              next: token.next,
              embedded: token.embedded,
            },
          );
          self.push(leaf_key, node);
        }
        None if terminal == RuleId::EMPTY => {}
        None => {
          let goal = self.goal_tag(node);
          self.failures.record(key.pos, Some(terminal), goal);
        }
      }
    }
  }

  fn ascend(&mut self, node: NodeId, prev: NodeId) {
    let key = *self.gss.key(node);
    let prev_key = *self.gss.key(prev);
    let ascends = self.automaton.ascends(prev_key.state, key.state);
    let prev_lookahead = self.gss.lookahead(prev_key.lookahead).clone();

    for t in ascends.iter() {
      let guard = t.lookahead.guard.resolve(&prev_lookahead);
      if !self.scanner.matches_any(&guard, key.pos) {
        log::trace!(
          "{:?} from {:?} over {:?} rejected at {}",
          t.action,
          key.state,
          prev_key.state,
          key.pos
        );
        let goal = self.goal_tag(prev);
        self.failures.record(key.pos, guard.terminals(), goal);
        continue;
      }

      match t.action {
        TransitionAction::Goal => {
          self.accepts.insert(key.pos);
        }
        TransitionAction::Graft => self.graft(t, node, prev),
        TransitionAction::Height => self.height(t, node, prev),
        TransitionAction::Width => {
          unreachable!("width transitions are not ascending")
        }
      }
    }
  }

  fn graft(&mut self, t: &Transition, node: NodeId, prev: NodeId) {
    let key = *self.gss.key(node);
    let prev_key = *self.gss.key(prev);
    let grafted_key = NodeKey {
      state: t.to,
      lookahead: prev_key.lookahead,
      start: prev_key.start,
      pos: key.pos,
    };
    let child = self.child_ref(node);
    self.grow(&grafted_key, Some(prev_key), child);

    let grafted = self.node(grafted_key);
    if self.gss.add_graft_follower(prev, grafted) {
      for below in self.gss.previous(prev) {
        self.link(grafted, below);
      }
    }
  }

  fn height(&mut self, t: &Transition, node: NodeId, prev: NodeId) {
    let key = *self.gss.key(node);
    let prev_key = *self.gss.key(prev);
    let up = t.lookahead.up.resolve(self.gss.lookahead(prev_key.lookahead));
    let grown_key = NodeKey {
      state: t.to,
      lookahead: self.gss.intern_lookahead(up),
      start: key.start,
      pos: key.pos,
    };
    let child = self.child_ref(node);
    self.grow(&grown_key, None, child);

    self.push(grown_key, prev);
  }
}
