// Copyright 2018 Google LLC
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

//! Rule positions, and the calculus of what can come next.

use std::collections::BTreeSet;

use crate::{
  automaton::LookaheadSet,
  grammar::{RuleId, RuleItem, RuleKind, RuleSet, OPTION_LIST_ITEMS},
  utils::breadth_first_search,
};

/// A marker within an option of a rule.
///
/// List options count the items consumed so far. The count saturates at
/// the maximum, or at `max(min, 1)` for unbounded lists, so each list has
/// finitely many positions.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Position {
  Start,
  /// Before the item at the given index of a sequence. Never zero.
  At(usize),
  /// Before another list item, after the given number of items.
  ListItem(usize),
  /// Before a separator, after the given number of items.
  ListSeparator(usize),
  End,
}

/// A dotted rule: a rule, one of its options, and a position within it.
///
/// ```text
/// S.1@2   S = a b . c
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RulePosition {
  rule: RuleId,
  option: usize,
  position: Position,
}

impl RulePosition {
  pub fn new(rule: RuleId, option: usize, position: Position) -> Self {
    RulePosition {
      rule,
      option,
      position,
    }
  }

  pub fn rule(&self) -> RuleId {
    self.rule
  }

  pub fn option(&self) -> usize {
    self.option
  }

  pub fn position(&self) -> Position {
    self.position
  }

  pub fn is_start(&self) -> bool {
    self.position == Position::Start
  }

  pub fn is_end(&self) -> bool {
    self.position == Position::End
  }

  fn at(&self, position: Position) -> Self {
    RulePosition {
      position,
      ..*self
    }
  }

  /// Renders the position as `name.option@marker`.
  pub fn display(&self, rules: &RuleSet) -> String {
    let marker = match self.position {
      Position::Start => "Start".to_string(),
      Position::At(i) => i.to_string(),
      Position::ListItem(k) => format!("i{}", k),
      Position::ListSeparator(k) => format!("s{}", k),
      Position::End => "End".to_string(),
    };
    format!("{}.{}@{}", rules.name(self.rule), self.option, marker)
  }
}

/// Pure functions over the rule positions of one rule set.
///
/// The `<GOAL>` rule has a single option whose only item is the goal given
/// here. A calculus without a goal must never be asked about `<GOAL>`.
#[derive(Copy, Clone)]
pub struct Calculus<'a> {
  rules: &'a RuleSet,
  goal: Option<RuleId>,
}

impl<'a> Calculus<'a> {
  pub fn new(rules: &'a RuleSet, goal: Option<RuleId>) -> Self {
    Calculus { rules, goal }
  }

  pub fn rules(&self) -> &'a RuleSet {
    self.rules
  }

  fn goal(&self) -> RuleId {
    self
      .goal
      .expect("the <GOAL> rule is only defined for a calculus with a goal")
  }

  fn item(&self, rule: RuleId) -> &'a RuleItem {
    match self.rules.rule(rule).kind() {
      RuleKind::NonTerminal(item) => item,
      _ => panic!("{} has no rule item", self.rules.name(rule)),
    }
  }

  /// The positions a derivation of `rule` starts from: one per option, or
  /// the end position for terminal-like rules.
  pub fn start_positions(&self, rule: RuleId) -> Vec<RulePosition> {
    match self.rules.rule(rule).kind() {
      RuleKind::Goal => vec![RulePosition::new(rule, 0, Position::Start)],
      _ if self.rules.is_terminal_like(rule) => {
        vec![RulePosition::new(rule, 0, Position::End)]
      }
      RuleKind::NonTerminal(item) => item
        .options()
        .into_iter()
        .map(|option| RulePosition::new(rule, option, Position::Start))
        .collect(),
      RuleKind::Terminal(_) => unreachable!("terminals are terminal-like"),
    }
  }

  /// The symbol expected at the given position, or `None` at the end.
  pub fn expected(&self, rp: &RulePosition) -> Option<RuleId> {
    if rp.is_end() {
      return None;
    }

    if rp.rule == RuleId::GOAL {
      return Some(self.goal());
    }

    let item = self.item(rp.rule);
    if let Some(seq) = item.sequence(rp.option) {
      let index = match rp.position {
        Position::Start => 0,
        Position::At(i) => i,
        _ => panic!("malformed sequence position {:?}", rp),
      };
      return Some(seq[index]);
    }

    match (item, rp.position) {
      (
        RuleItem::Multi { item, .. } | RuleItem::SeparatedList { item, .. },
        Position::Start | Position::ListItem(_),
      ) => Some(*item),
      (
        RuleItem::SeparatedList { separator, .. },
        Position::ListSeparator(_),
      ) => Some(*separator),
      _ => panic!("malformed rule position {:?}", rp),
    }
  }

  /// The positions reachable from `rp` by consuming its expected symbol.
  ///
  /// Panics if `rp` is at the end of its option.
  pub fn next(&self, rp: &RulePosition) -> Vec<RulePosition> {
    if rp.is_end() {
      panic!("next() requested past the end of {:?}", rp);
    }

    if rp.rule == RuleId::GOAL {
      return vec![rp.at(Position::End)];
    }

    let item = self.item(rp.rule);
    if let Some(seq) = item.sequence(rp.option) {
      let index = match rp.position {
        Position::Start => 0,
        Position::At(i) => i,
        _ => panic!("malformed sequence position {:?}", rp),
      };
      let next = index + 1;
      return if next < seq.len() {
        vec![rp.at(Position::At(next))]
      } else {
        vec![rp.at(Position::End)]
      };
    }

    assert_eq!(rp.option, OPTION_LIST_ITEMS, "malformed list option");
    match (item, rp.position) {
      (RuleItem::Multi { min, max, .. }, Position::Start) => {
        self.after_item(rp, 0, *min, *max, false)
      }
      (RuleItem::Multi { min, max, .. }, Position::ListItem(k)) => {
        self.after_item(rp, k, *min, *max, false)
      }
      (RuleItem::SeparatedList { min, max, .. }, Position::Start) => {
        self.after_item(rp, 0, *min, *max, true)
      }
      (RuleItem::SeparatedList { min, max, .. }, Position::ListItem(k)) => {
        self.after_item(rp, k, *min, *max, true)
      }
      (RuleItem::SeparatedList { .. }, Position::ListSeparator(k)) => {
        vec![rp.at(Position::ListItem(k))]
      }
      _ => panic!("malformed rule position {:?}", rp),
    }
  }

  fn after_item(
    &self,
    rp: &RulePosition,
    consumed: usize,
    min: usize,
    max: Option<usize>,
    separated: bool,
  ) -> Vec<RulePosition> {
    let cap = max.unwrap_or_else(|| min.max(1));
    let count = (consumed + 1).min(cap);

    let mut result = Vec::new();
    if max.map_or(true, |max| count < max) {
      result.push(rp.at(if separated {
        Position::ListSeparator(count)
      } else {
        Position::ListItem(count)
      }));
    }
    if count >= min {
      result.push(rp.at(Position::End));
    }
    result
  }

  /// Every position reachable from `from` by consuming only symbols for
  /// which `step_over` holds, including `from` itself.
  pub fn reachable_over(
    &self,
    from: &RulePosition,
    step_over: impl Fn(RuleId) -> bool,
  ) -> BTreeSet<RulePosition> {
    breadth_first_search(std::iter::once(*from), |rp| match self.expected(rp) {
      Some(sym) if step_over(sym) => self.next(rp),
      _ => Vec::new(),
    })
  }

  /// The terminal-like rules, `<EMPTY>` included, that can be shifted first
  /// from `rp`, looking through the left corners of expected rules.
  pub fn first_terminals(&self, rp: &RulePosition) -> BTreeSet<RuleId> {
    let positions = breadth_first_search(std::iter::once(*rp), |rp| {
      match self.expected(rp) {
        Some(sym) if !self.rules.is_terminal_like(sym) => {
          self.start_positions(sym)
        }
        _ => Vec::new(),
      }
    });

    positions
      .iter()
      .filter_map(|rp| self.expected(rp))
      .filter(|sym| self.rules.is_terminal_like(*sym))
      .collect()
  }

  /// The real terminals that can be matched next once `rp` is reached, with
  /// `follow` standing in for whatever follows the end of its rule.
  pub fn first_of_rest(
    &self,
    rp: &RulePosition,
    follow: &LookaheadSet,
  ) -> LookaheadSet {
    let mut result = LookaheadSet::new();
    for reached in self.reachable_over(rp, |sym| self.rules.is_nullable(sym)) {
      match self.expected(&reached) {
        Some(sym) => {
          result.union_with(&LookaheadSet::from_terminals(
            self.rules.first_set(sym).iter().copied(),
          ));
        }
        None => {
          result.union_with(follow);
        }
      }
    }
    result
  }

  /// What can follow once the symbol expected at `rp` has been consumed.
  pub fn follow_after(
    &self,
    rp: &RulePosition,
    follow: &LookaheadSet,
  ) -> LookaheadSet {
    let mut result = LookaheadSet::new();
    for next in self.next(rp) {
      result.union_with(&self.first_of_rest(&next, follow));
    }
    result
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::grammar::{build, examples, ItemRef, OPTION_LIST_EMPTY};

  fn list_rules(min: usize, max: Option<usize>) -> RuleSet {
    build(|b| {
      b.add_multi("M", min, max, ItemRef::literal("a"))
        .add_separated_list(
          "L",
          min,
          max,
          ItemRef::literal("a"),
          ItemRef::literal(","),
        );
    })
    .unwrap()
  }

  #[test]
  fn test_sequence_next() {
    let g = examples::make_split(crate::grammar::ChoiceKind::Ambiguous);
    let calc = Calculus::new(&g, None);
    let s = g.find("S").unwrap();

    let start = RulePosition::new(s, 0, Position::Start);
    assert_eq!(calc.expected(&start), g.find("'a'"));
    assert_eq!(
      calc.next(&start),
      vec![RulePosition::new(s, 0, Position::At(1))]
    );

    let last = RulePosition::new(s, 0, Position::At(2));
    assert_eq!(calc.expected(&last), g.find("'c'"));
    assert_eq!(calc.next(&last), vec![RulePosition::new(s, 0, Position::End)]);
  }

  #[test]
  #[should_panic]
  fn test_next_past_end_panics() {
    let g = examples::make_abc();
    let calc = Calculus::new(&g, None);
    let s = g.find("S").unwrap();
    calc.next(&RulePosition::new(s, 0, Position::End));
  }

  #[test]
  fn test_bounded_multi() {
    let g = list_rules(1, Some(2));
    let calc = Calculus::new(&g, None);
    let m = g.find("M").unwrap();

    let start = RulePosition::new(m, OPTION_LIST_ITEMS, Position::Start);
    let one = calc.next(&start);
    assert_eq!(
      one,
      vec![
        RulePosition::new(m, OPTION_LIST_ITEMS, Position::ListItem(1)),
        RulePosition::new(m, OPTION_LIST_ITEMS, Position::End),
      ]
    );
    // The maximum is reached after two items.
    assert_eq!(
      calc.next(&one[0]),
      vec![RulePosition::new(m, OPTION_LIST_ITEMS, Position::End)]
    );
  }

  #[test]
  fn test_minimum_forces_another_item() {
    let g = list_rules(2, None);
    let calc = Calculus::new(&g, None);
    let m = g.find("M").unwrap();

    let start = RulePosition::new(m, OPTION_LIST_ITEMS, Position::Start);
    assert_eq!(
      calc.next(&start),
      vec![RulePosition::new(m, OPTION_LIST_ITEMS, Position::ListItem(1))]
    );
    let two = RulePosition::new(m, OPTION_LIST_ITEMS, Position::ListItem(1));
    assert_eq!(
      calc.next(&two),
      vec![
        RulePosition::new(m, OPTION_LIST_ITEMS, Position::ListItem(2)),
        RulePosition::new(m, OPTION_LIST_ITEMS, Position::End),
      ]
    );
    // Unbounded lists saturate their count.
    let many = RulePosition::new(m, OPTION_LIST_ITEMS, Position::ListItem(2));
    assert_eq!(calc.next(&many), calc.next(&two));
  }

  #[test]
  fn test_separated_list_alternates() {
    let g = list_rules(0, None);
    let calc = Calculus::new(&g, None);
    let l = g.find("L").unwrap();

    let options: Vec<_> = calc
      .start_positions(l)
      .into_iter()
      .map(|rp| rp.option())
      .collect();
    assert_eq!(options, vec![OPTION_LIST_ITEMS, OPTION_LIST_EMPTY]);

    let start = RulePosition::new(l, OPTION_LIST_ITEMS, Position::Start);
    let after_item = calc.next(&start);
    let sep =
      RulePosition::new(l, OPTION_LIST_ITEMS, Position::ListSeparator(1));
    assert_eq!(
      after_item,
      vec![sep, RulePosition::new(l, OPTION_LIST_ITEMS, Position::End)]
    );
    assert_eq!(calc.expected(&sep), g.find("','"));
    assert_eq!(
      calc.next(&sep),
      vec![RulePosition::new(l, OPTION_LIST_ITEMS, Position::ListItem(1))]
    );
  }

  #[test]
  fn test_first_terminals_through_left_corners() {
    let g = examples::make_split(crate::grammar::ChoiceKind::Ambiguous);
    let calc = Calculus::new(&g, None);
    let s = g.find("S").unwrap();
    let firsts =
      calc.first_terminals(&RulePosition::new(s, 1, Position::Start));
    assert_eq!(
      firsts.into_iter().collect::<Vec<_>>(),
      vec![g.find("'a'").unwrap()]
    );
  }

  #[test]
  fn test_first_of_rest_uses_follow_when_nullable() {
    let g = examples::make_nullable();
    let calc = Calculus::new(&g, None);
    let s = g.find("S").unwrap();

    // S = A . B, where B is nullable.
    let rest = calc.first_of_rest(
      &RulePosition::new(s, 0, Position::At(1)),
      &LookaheadSet::end_of_text(),
    );
    let mut names: Vec<_> =
      rest.terminals().map(|t| g.name(t).to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["'b'", "'c'", "<EOT>"]);
  }

  #[test]
  fn test_goal_positions() {
    let g = examples::make_abc();
    let s = g.find("S").unwrap();
    let calc = Calculus::new(&g, Some(s));
    let start = RulePosition::new(RuleId::GOAL, 0, Position::Start);
    assert_eq!(calc.expected(&start), Some(s));
    assert_eq!(
      calc.next(&start),
      vec![RulePosition::new(RuleId::GOAL, 0, Position::End)]
    );
    assert_eq!(start.display(&g), "<GOAL>.0@Start");
  }
}
