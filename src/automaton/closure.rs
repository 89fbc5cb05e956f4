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

//! The closure of a parser state: its kernel positions, plus the start
//! positions of every rule they can predict, each with the lookahead that
//! may follow a completion of its rule.

use std::collections::{btree_map, BTreeMap, BTreeSet};

use crate::{
  automaton::LookaheadSet,
  state::{Calculus, RulePosition},
  utils::{change_iter, change_loop, WasChanged},
};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ClosureItem {
  kernel: bool,
  lookahead: LookaheadSet,
}

impl ClosureItem {
  /// True if the position is part of the state itself rather than
  /// predicted.
  pub fn is_kernel(&self) -> bool {
    self.kernel
  }

  /// For kernel items this is always `{<RT>}`.
  pub fn lookahead(&self) -> &LookaheadSet {
    &self.lookahead
  }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Closure(BTreeMap<RulePosition, ClosureItem>);

impl Closure {
  pub fn compute(calc: &Calculus, kernel: &BTreeSet<RulePosition>) -> Self {
    let rules = calc.rules();
    let mut items: BTreeMap<RulePosition, ClosureItem> = kernel
      .iter()
      .filter(|rp| !rp.is_end())
      .map(|rp| {
        (
          *rp,
          ClosureItem {
            kernel: true,
            lookahead: LookaheadSet::runtime(),
          },
        )
      })
      .collect();

    change_loop(|| {
      let snapshot: Vec<(RulePosition, LookaheadSet)> = items
        .iter()
        .map(|(rp, item)| (*rp, item.lookahead.clone()))
        .collect();

      change_iter(snapshot.into_iter(), |(rp, lookahead)| {
        let sym = match calc.expected(&rp) {
          Some(sym) if !rules.is_terminal_like(sym) => sym,
          _ => return WasChanged::Unchanged,
        };

        let follow = calc.follow_after(&rp, &lookahead);
        change_iter(calc.start_positions(sym).into_iter(), |start| {
          match items.entry(start) {
            btree_map::Entry::Occupied(mut occ) => {
              occ.get_mut().lookahead.union_with(&follow)
            }
            btree_map::Entry::Vacant(vac) => {
              vac.insert(ClosureItem {
                kernel: false,
                lookahead: follow.clone(),
              });
              WasChanged::Changed
            }
          }
        })
      })
    });

    Closure(items)
  }

  pub fn items(
    &self,
  ) -> impl Iterator<Item = (&RulePosition, &ClosureItem)> + '_ {
    self.0.iter()
  }

  pub fn get(&self, rp: &RulePosition) -> Option<&ClosureItem> {
    self.0.get(rp)
  }

  pub fn kernel(&self) -> impl Iterator<Item = &RulePosition> + '_ {
    self
      .0
      .iter()
      .filter(|(_, item)| item.kernel)
      .map(|(rp, _)| rp)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    automaton::LookaheadSymbol,
    grammar::{examples, RuleId},
    state::Position,
  };

  #[test]
  fn test_goal_closure_predicts_left_corners() {
    let g = examples::make_split(crate::grammar::ChoiceKind::Ambiguous);
    let s = g.find("S").unwrap();
    let x = g.find("X").unwrap();
    let calc = Calculus::new(&g, Some(s));

    let kernel: BTreeSet<_> =
      vec![RulePosition::new(RuleId::GOAL, 0, Position::Start)]
        .into_iter()
        .collect();
    let closure = Closure::compute(&calc, &kernel);

    let predicted: Vec<_> = closure
      .items()
      .filter(|(_, item)| !item.is_kernel())
      .map(|(rp, _)| rp.display(&g))
      .collect();
    assert_eq!(predicted, vec!["S.0@Start", "S.1@Start", "X.0@Start"]);

    // S completes the goal, so it is followed by whatever follows <GOAL>.
    let s_start = RulePosition::new(s, 0, Position::Start);
    assert_eq!(
      closure.get(&s_start).unwrap().lookahead(),
      &LookaheadSet::runtime()
    );
    // X is followed by 'c'.
    let x_start = RulePosition::new(x, 0, Position::Start);
    let x_la = closure.get(&x_start).unwrap().lookahead();
    assert!(x_la.contains(&LookaheadSymbol::Terminal(g.find("'c'").unwrap())));
    assert!(!x_la.has_runtime());
  }

  #[test]
  fn test_end_positions_are_not_items() {
    let g = examples::make_abc();
    let s = g.find("S").unwrap();
    let calc = Calculus::new(&g, Some(s));
    let kernel: BTreeSet<_> = vec![RulePosition::new(s, 0, Position::End)]
      .into_iter()
      .collect();
    assert_eq!(Closure::compute(&calc, &kernel).items().count(), 0);
  }
}
