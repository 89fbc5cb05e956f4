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

//! Text and graphviz renderings of the computed part of an automaton.

use std::{borrow::Cow, collections::BTreeMap, sync::Arc};

use super::{Automaton, ParserState, StateId, Transition, TransitionAction};

struct Snapshot {
  states: Vec<Arc<ParserState>>,
  transitions: Vec<Transition>,
}

impl Automaton {
  fn snapshot(&self) -> Snapshot {
    let inner = self.inner.read().unwrap();
    let mut transitions: Vec<Transition> = inner
      .widths
      .values()
      .flat_map(|ts| ts.iter().cloned())
      .collect();
    transitions.extend(
      inner.ascends.values().flat_map(|ts| ts.iter().cloned()),
    );
    Snapshot {
      states: inner.states.clone(),
      transitions,
    }
  }

  fn describe_transition(
    &self,
    states: &[Arc<ParserState>],
    t: &Transition,
  ) -> String {
    let rules = self.rules();
    let name = |id: StateId| states[id.index()].display(rules);
    let action = match t.action {
      TransitionAction::Width => "WIDTH",
      TransitionAction::Height => "HEIGHT",
      TransitionAction::Graft => "GRAFT",
      TransitionAction::Goal => "GOAL",
    };
    let prev = match t.prev {
      Some(prev) => format!(" [{}]", name(prev)),
      None => String::new(),
    };
    format!(
      "{}{} -> {} guard {} up {}",
      action,
      prev,
      name(t.to),
      t.lookahead.guard.display(rules),
      t.lookahead.up.display(rules)
    )
  }

  /// Renders every state and transition computed so far.
  ///
  /// The output only depends on state contents, not on the order in which
  /// states were discovered, so two automata for the same rule set and goal
  /// render identically once both are complete.
  pub fn render(&self) -> String {
    let snapshot = self.snapshot();
    let rules = self.rules();

    let mut by_state: BTreeMap<String, Vec<String>> = snapshot
      .states
      .iter()
      .map(|s| (s.display(rules), Vec::new()))
      .collect();
    for t in &snapshot.transitions {
      let from = snapshot.states[t.from.index()].display(rules);
      by_state
        .entry(from)
        .or_default()
        .push(self.describe_transition(&snapshot.states, t));
    }

    let mut out = String::new();
    for (state, mut lines) in by_state {
      lines.sort();
      out.push_str(&state);
      out.push('\n');
      for line in lines {
        out.push_str("  ");
        out.push_str(&line);
        out.push('\n');
      }
    }
    out
  }

  /// Renders the computed states and transitions in graphviz dot format.
  pub fn to_dot(&self) -> anyhow::Result<String> {
    let snapshot = self.snapshot();
    let graph = DotGraph {
      automaton: self,
      snapshot,
    };
    let mut out = Vec::new();
    dot::render(&graph, &mut out)?;
    Ok(String::from_utf8(out)?)
  }
}

struct DotGraph<'a> {
  automaton: &'a Automaton,
  snapshot: Snapshot,
}

impl<'a> dot::GraphWalk<'a, StateId, usize> for DotGraph<'a> {
  fn nodes(&'a self) -> dot::Nodes<'a, StateId> {
    self.snapshot.states.iter().map(|s| s.id()).collect()
  }

  fn edges(&'a self) -> dot::Edges<'a, usize> {
    Cow::Owned((0..self.snapshot.transitions.len()).collect())
  }

  fn source(&'a self, e: &usize) -> StateId {
    self.snapshot.transitions[*e].from
  }

  fn target(&'a self, e: &usize) -> StateId {
    self.snapshot.transitions[*e].to
  }
}

impl<'a> dot::Labeller<'a, StateId, usize> for DotGraph<'a> {
  fn graph_id(&'a self) -> dot::Id<'a> {
    dot::Id::new("automaton").unwrap()
  }

  fn node_id(&'a self, n: &StateId) -> dot::Id<'a> {
    dot::Id::new(format!("S{}", n.index())).unwrap()
  }

  fn node_label(&'a self, n: &StateId) -> dot::LabelText<'a> {
    let state = &self.snapshot.states[n.index()];
    dot::LabelText::LabelStr(state.display(self.automaton.rules()).into())
  }

  fn edge_label(&'a self, e: &usize) -> dot::LabelText<'a> {
    let t = &self.snapshot.transitions[*e];
    let rules = self.automaton.rules();
    let label = match (t.action, t.prev) {
      (TransitionAction::Width, _) => {
        format!("W {}", rules.name(self.snapshot.states[t.to.index()].rule()))
      }
      (action, Some(prev)) => format!("{:?} [S{}]", action, prev.index()),
      (action, None) => format!("{:?}", action),
    };
    dot::LabelText::LabelStr(label.into())
  }
}

#[cfg(test)]
mod test {
  use crate::{
    automaton::{Automaton, StateId},
    grammar::examples,
  };
  use std::sync::Arc;

  #[test]
  fn test_render_lists_states_and_transitions() {
    let rules = Arc::new(examples::make_abc());
    let goal = rules.default_goal().unwrap();
    let a = Automaton::prebuilt(rules, goal);
    let text = a.render();
    assert!(text.contains("{<GOAL>.0@Start}\n"));
    assert!(text.contains("  WIDTH -> {'a'.0@End} guard {<RT>} up {<RT>}\n"));
    assert!(text.contains(
      "  GOAL [{<GOAL>.0@Start}] -> {<GOAL>.0@End} guard {<RT>} up {<RT>}\n"
    ));
  }

  #[test]
  fn test_dot_output() {
    let rules = Arc::new(examples::make_abc());
    let goal = rules.default_goal().unwrap();
    let a = Automaton::new(rules, goal);
    a.widths(StateId::START);
    let dot = a.to_dot().unwrap();
    assert!(dot.starts_with("digraph automaton {"));
    assert!(dot.contains("S0 -> S1"));
    assert!(dot.contains("W "));
  }
}
