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

//! The left-corner automaton of a rule set and goal.
//!
//! States are sets of rule positions that share a rule and the children
//! consumed so far. There are four kinds of transition:
//!
//! - WIDTH shifts a terminal-like rule expected by the closure of a state.
//! - HEIGHT completes a left corner, starting a new rule that expects it.
//! - GRAFT completes a rule expected by a kernel position of the state
//!   below, advancing that state.
//! - GOAL accepts the goal on top of the start state.
//!
//! Transitions are computed lazily and cached, so a parse only pays for the
//! part of the automaton it uses. `complete` computes everything reachable,
//! and yields the same automaton a prebuilt one would have.

pub mod closure;
mod lookahead;
mod render;

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::{Arc, RwLock},
};

use crate::{
  grammar::{RuleId, RuleSet},
  state::{Calculus, Position, RulePosition},
  utils::CollectMap,
};

pub use closure::{Closure, ClosureItem};
pub use lookahead::{LookaheadSet, LookaheadSymbol};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId(usize);

impl StateId {
  /// The state holding only `<GOAL>.0@Start`.
  pub const START: StateId = StateId(0);

  pub fn index(self) -> usize {
    self.0
  }

  #[cfg(test)]
  pub(crate) fn from_index(index: usize) -> Self {
    StateId(index)
  }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParserState {
  id: StateId,
  rule: RuleId,
  positions: BTreeSet<RulePosition>,
  leaf: bool,
}

impl ParserState {
  pub fn id(&self) -> StateId {
    self.id
  }

  pub fn rule(&self) -> RuleId {
    self.rule
  }

  pub fn positions(&self) -> &BTreeSet<RulePosition> {
    &self.positions
  }

  /// True if some position has reached the end of its option.
  pub fn is_complete(&self) -> bool {
    self.positions.iter().any(|rp| rp.is_end())
  }

  /// True for the state reached by shifting a terminal-like rule.
  pub fn is_leaf(&self) -> bool {
    self.leaf
  }

  /// The options of the rule that this state completes.
  pub fn end_options(&self) -> impl Iterator<Item = usize> + '_ {
    self
      .positions
      .iter()
      .filter(|rp| rp.is_end())
      .map(|rp| rp.option())
  }

  pub fn display(&self, rules: &RuleSet) -> String {
    let mut names: Vec<_> =
      self.positions.iter().map(|rp| rp.display(rules)).collect();
    names.sort();
    crate::utils::fmt::display_set(names).to_string()
  }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum TransitionAction {
  Width,
  Height,
  Graft,
  Goal,
}

/// The lookahead of a transition. `guard` must match the input after the
/// completed child for the transition to be taken, and `up` is the
/// lookahead of the node it creates. Both may contain `<RT>`, standing for
/// the lookahead of the stack node below.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Lookahead {
  pub guard: LookaheadSet,
  pub up: LookaheadSet,
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Transition {
  /// The state of the node the transition is taken from.
  pub from: StateId,
  /// The state of the stack node below, for all but WIDTH transitions.
  pub prev: Option<StateId>,
  pub to: StateId,
  pub action: TransitionAction,
  pub lookahead: Lookahead,
}

struct Inner {
  states: Vec<Arc<ParserState>>,
  ids: BTreeMap<BTreeSet<RulePosition>, StateId>,
  closures: BTreeMap<StateId, Arc<Closure>>,
  widths: BTreeMap<StateId, Arc<Vec<Transition>>>,
  ascends: BTreeMap<(StateId, StateId), Arc<Vec<Transition>>>,
}

impl Inner {
  fn intern(
    &mut self,
    calc: &Calculus,
    positions: BTreeSet<RulePosition>,
  ) -> StateId {
    if let Some(id) = self.ids.get(&positions) {
      return *id;
    }

    let rule = positions
      .iter()
      .next()
      .map(|rp| rp.rule())
      .expect("states are never empty");
    debug_assert!(positions.iter().all(|rp| rp.rule() == rule));

    let id = StateId(self.states.len());
    let state = ParserState {
      id,
      rule,
      leaf: calc.rules().is_terminal_like(rule),
      positions: positions.clone(),
    };
    log::trace!("new state {:?}: {}", id, state.display(calc.rules()));
    self.states.push(Arc::new(state));
    self.ids.insert(positions, id);
    id
  }

  fn closure(&mut self, calc: &Calculus, id: StateId) -> Arc<Closure> {
    if let Some(closure) = self.closures.get(&id) {
      return closure.clone();
    }
    let closure =
      Arc::new(Closure::compute(calc, &self.states[id.0].positions));
    self.closures.insert(id, closure.clone());
    closure
  }

  fn widths(&mut self, calc: &Calculus, from: StateId) -> Arc<Vec<Transition>> {
    if let Some(widths) = self.widths.get(&from) {
      return widths.clone();
    }

    let rules = calc.rules();
    let closure = self.closure(calc, from);
    let mut by_terminal: BTreeMap<RuleId, LookaheadSet> = BTreeMap::new();
    for (rp, item) in closure.items() {
      match calc.expected(rp) {
        Some(sym) if rules.is_terminal_like(sym) => {
          by_terminal
            .entry(sym)
            .or_default()
            .union_with(&calc.follow_after(rp, item.lookahead()));
        }
        _ => {}
      }
    }

    let mut transitions = Vec::new();
    for (terminal, up) in by_terminal {
      let leaf = RulePosition::new(terminal, 0, Position::End);
      let to = self.intern(calc, std::iter::once(leaf).collect());
      transitions.push(Transition {
        from,
        prev: None,
        to,
        action: TransitionAction::Width,
        lookahead: Lookahead {
          guard: up.clone(),
          up,
        },
      });
    }

    let transitions = Arc::new(transitions);
    self.widths.insert(from, transitions.clone());
    transitions
  }

  fn ascends(
    &mut self,
    calc: &Calculus,
    goal: RuleId,
    prev: StateId,
    from: StateId,
  ) -> Arc<Vec<Transition>> {
    if let Some(ascends) = self.ascends.get(&(prev, from)) {
      return ascends.clone();
    }

    let completed = self.states[from.0].clone();
    let mut transitions = Vec::new();
    if completed.is_complete() {
      let rule = completed.rule();
      let closure = self.closure(calc, prev);

      if prev == StateId::START && rule == goal {
        let end = RulePosition::new(RuleId::GOAL, 0, Position::End);
        transitions.push(Transition {
          from,
          prev: Some(prev),
          to: self.intern(calc, std::iter::once(end).collect()),
          action: TransitionAction::Goal,
          lookahead: Lookahead {
            guard: LookaheadSet::runtime(),
            up: LookaheadSet::runtime(),
          },
        });
      }

      let mut graft_to = BTreeSet::new();
      let mut graft_guard = LookaheadSet::new();
      for rp in closure.kernel() {
        if rp.rule() == RuleId::GOAL || calc.expected(rp) != Some(rule) {
          continue;
        }
        for next in calc.next(rp) {
          graft_guard
            .union_with(&calc.first_of_rest(&next, &LookaheadSet::runtime()));
          graft_to.insert(next);
        }
      }
      if !graft_to.is_empty() {
        transitions.push(Transition {
          from,
          prev: Some(prev),
          to: self.intern(calc, graft_to),
          action: TransitionAction::Graft,
          lookahead: Lookahead {
            guard: graft_guard,
            up: LookaheadSet::runtime(),
          },
        });
      }

      let mut heights: BTreeMap<
        RuleId,
        (BTreeSet<RulePosition>, LookaheadSet, LookaheadSet),
      > = BTreeMap::new();
      for (rp, item) in closure.items() {
        if item.is_kernel()
          || !rp.is_start()
          || calc.expected(rp) != Some(rule)
        {
          continue;
        }
        let (to, guard, up) = heights.entry(rp.rule()).or_default();
        up.union_with(item.lookahead());
        for next in calc.next(rp) {
          guard.union_with(&calc.first_of_rest(&next, item.lookahead()));
          to.insert(next);
        }
      }
      for (_, (to, guard, up)) in heights {
        transitions.push(Transition {
          from,
          prev: Some(prev),
          to: self.intern(calc, to),
          action: TransitionAction::Height,
          lookahead: Lookahead { guard, up },
        });
      }
    }

    let transitions = Arc::new(transitions);
    self.ascends.insert((prev, from), transitions.clone());
    transitions
  }
}

/// A left-corner automaton for one goal of a rule set.
///
/// The automaton may be shared between threads. Lookups of cached
/// transitions only take a read lock.
pub struct Automaton {
  rules: Arc<RuleSet>,
  goal: RuleId,
  inner: RwLock<Inner>,
}

impl Automaton {
  /// Creates an automaton that computes its transitions on demand.
  pub fn new(rules: Arc<RuleSet>, goal: RuleId) -> Self {
    let mut inner = Inner {
      states: Vec::new(),
      ids: BTreeMap::new(),
      closures: BTreeMap::new(),
      widths: BTreeMap::new(),
      ascends: BTreeMap::new(),
    };
    let start = RulePosition::new(RuleId::GOAL, 0, Position::Start);
    let start_id = inner.intern(
      &Calculus::new(&rules, Some(goal)),
      std::iter::once(start).collect(),
    );
    debug_assert_eq!(start_id, StateId::START);

    Automaton {
      rules,
      goal,
      inner: RwLock::new(inner),
    }
  }

  /// Creates an automaton with every reachable transition computed.
  pub fn prebuilt(rules: Arc<RuleSet>, goal: RuleId) -> Self {
    let automaton = Automaton::new(rules, goal);
    automaton.complete();
    automaton
  }

  pub fn rules(&self) -> &Arc<RuleSet> {
    &self.rules
  }

  pub fn goal(&self) -> RuleId {
    self.goal
  }

  fn calc(&self) -> Calculus<'_> {
    Calculus::new(&self.rules, Some(self.goal))
  }

  pub fn num_states(&self) -> usize {
    self.inner.read().unwrap().states.len()
  }

  pub fn state(&self, id: StateId) -> Arc<ParserState> {
    self.inner.read().unwrap().states[id.0].clone()
  }

  /// Returns the closure of a state, computing it if needed.
  pub fn closure(&self, id: StateId) -> Arc<Closure> {
    if let Some(closure) = self.inner.read().unwrap().closures.get(&id) {
      return closure.clone();
    }
    self.inner.write().unwrap().closure(&self.calc(), id)
  }

  /// The WIDTH transitions out of a state.
  pub fn widths(&self, from: StateId) -> Arc<Vec<Transition>> {
    if let Some(widths) = self.inner.read().unwrap().widths.get(&from) {
      return widths.clone();
    }
    self.inner.write().unwrap().widths(&self.calc(), from)
  }

  /// The GOAL, GRAFT and HEIGHT transitions taken when a node in state
  /// `from` completes on top of a node in state `prev`.
  pub fn ascends(&self, prev: StateId, from: StateId) -> Arc<Vec<Transition>> {
    if let Some(ascends) =
      self.inner.read().unwrap().ascends.get(&(prev, from))
    {
      return ascends.clone();
    }
    self
      .inner
      .write()
      .unwrap()
      .ascends(&self.calc(), self.goal, prev, from)
  }

  /// Computes every transition reachable from the start state.
  ///
  /// This walks pairs of a stack node state and the state of a node below
  /// it, the same pairs a parse could ever ask about.
  pub fn complete(&self) {
    let calc = self.calc();
    let mut inner = self.inner.write().unwrap();

    let mut configs: BTreeSet<(Option<StateId>, StateId)> = BTreeSet::new();
    configs.insert((None, StateId::START));
    let mut pending: Vec<(Option<StateId>, StateId)> =
      configs.iter().copied().collect();
    let mut grafts: CollectMap<StateId, StateId> = CollectMap::new();

    while let Some((prev, state)) = pending.pop() {
      let mut found = Vec::new();
      for width in inner.widths(&calc, state).iter() {
        found.push((Some(state), width.to));
      }

      if let Some(prev) = prev {
        for ascend in inner.ascends(&calc, self.goal, prev, state).iter() {
          match ascend.action {
            TransitionAction::Height => found.push((Some(prev), ascend.to)),
            TransitionAction::Graft => {
              // A grafted node takes over the edges of the node below.
              for (below, _) in configs.iter().filter(|(_, s)| *s == prev) {
                found.push((*below, ascend.to));
              }
              grafts.insert(prev, ascend.to);
            }
            TransitionAction::Goal | TransitionAction::Width => {}
          }
        }
      }

      // Any graft target of `state` also gains the node below `state`.
      if let Some(targets) = grafts.get(&state) {
        found.extend(targets.iter().map(|target| (prev, *target)));
      }

      for config in found {
        if configs.insert(config) {
          pending.push(config);
        }
      }
    }

    log::debug!(
      "completed automaton for {}: {} states, {} stack pairs",
      self.rules.name(self.goal),
      inner.states.len(),
      configs.len()
    );
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::grammar::{examples, ChoiceKind};

  fn automaton(rules: RuleSet) -> Automaton {
    let goal = rules.default_goal().unwrap();
    Automaton::new(Arc::new(rules), goal)
  }

  #[test]
  fn test_start_state() {
    let a = automaton(examples::make_abc());
    let start = a.state(StateId::START);
    assert_eq!(start.rule(), RuleId::GOAL);
    assert!(!start.is_complete());
    assert_eq!(a.num_states(), 1);
  }

  #[test]
  fn test_widths_of_start() {
    let a = automaton(examples::make_abc());
    let widths = a.widths(StateId::START);
    let names: Vec<_> = widths
      .iter()
      .map(|t| a.rules().name(a.state(t.to).rule()).to_string())
      .collect();
    assert_eq!(names, vec!["'a'", "'b'", "'c'"]);
    for width in widths.iter() {
      assert_eq!(width.action, TransitionAction::Width);
      assert!(a.state(width.to).is_leaf());
      assert_eq!(width.lookahead.up, LookaheadSet::runtime());
    }
  }

  #[test]
  fn test_ascend_kinds() {
    let a = automaton(examples::make_split(ChoiceKind::Ambiguous));
    let rules = a.rules().clone();
    let a_leaf = a
      .widths(StateId::START)
      .iter()
      .find(|t| a.state(t.to).rule() == rules.find("'a'").unwrap())
      .unwrap()
      .to;

    // 'a' on top of the start state starts both S.0 and X.0.
    let ascends = a.ascends(StateId::START, a_leaf);
    let actions: Vec<_> = ascends.iter().map(|t| t.action).collect();
    assert_eq!(
      actions,
      vec![TransitionAction::Height, TransitionAction::Height]
    );
    let x_height = ascends
      .iter()
      .find(|t| a.state(t.to).rule() == rules.find("X").unwrap())
      .unwrap();
    assert_eq!(
      x_height.lookahead.up.display(&rules),
      "{'c'}",
      "X is followed by 'c'"
    );
    assert_eq!(x_height.lookahead.guard.display(&rules), "{'b'}");

    // 'b' on top of X.0@1 grafts it to the end.
    let x1 = x_height.to;
    let b_leaf = a
      .widths(x1)
      .iter()
      .find(|t| a.state(t.to).rule() == rules.find("'b'").unwrap())
      .unwrap()
      .to;
    let grafts = a.ascends(x1, b_leaf);
    assert_eq!(grafts.len(), 1);
    assert_eq!(grafts[0].action, TransitionAction::Graft);
    assert!(a.state(grafts[0].to).is_complete());
    assert_eq!(grafts[0].lookahead.guard, LookaheadSet::runtime());
  }

  #[test]
  fn test_goal_transition() {
    let a = automaton(examples::make_abc());
    let rules = a.rules().clone();
    let a_leaf = a.widths(StateId::START)[0].to;
    let height = a.ascends(StateId::START, a_leaf)[0].clone();
    assert_eq!(a.state(height.to).rule(), rules.find("S").unwrap());

    let goal = a.ascends(StateId::START, height.to);
    assert_eq!(goal.len(), 1);
    assert_eq!(goal[0].action, TransitionAction::Goal);
  }

  #[test]
  fn test_transitions_are_cached() {
    let a = automaton(examples::make_left_recursive());
    let first = a.widths(StateId::START);
    let second = a.widths(StateId::START);
    assert!(Arc::ptr_eq(&first, &second));
  }

  #[test]
  fn test_prebuilt_matches_completed_on_demand() {
    for rules in vec![
      examples::make_split(ChoiceKind::Ambiguous),
      examples::make_nullable(),
      examples::make_tvsv(ChoiceKind::LongestPriority),
      examples::make_expressions(),
    ] {
      let rules = Arc::new(rules);
      let goal = rules.default_goal().unwrap();
      let prebuilt = Automaton::prebuilt(rules.clone(), goal);
      let on_demand = Automaton::new(rules.clone(), goal);
      on_demand.widths(StateId::START);
      on_demand.complete();
      assert_eq!(prebuilt.render(), on_demand.render());
      assert_eq!(prebuilt.num_states(), on_demand.num_states());
    }
  }
}
