// Copyright 2020 Google LLC
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

//! Selection among the alternatives packed in a branch.
//!
//! Branches are visited children first. Explicit preference rules are
//! applied before the choice kind of the branch's rule, and neither ever
//! removes the last alternative of a branch.

use std::cmp::Ordering;

use crate::{
  grammar::{Associativity, ChoiceKind, PreferenceRule, RuleId, RuleSet},
  sppt::{SpptAlternative, SpptBranch, SpptNode},
};

/// Counts of preference events, indexed by preference option.
type Counts = Vec<u32>;

/// The preference events of a derivation. Completions followed by a sibling
/// are settled; the completions along the right edge are still pending
/// until the derivation itself is followed by something.
struct Events {
  settled: Counts,
  pending: Counts,
}

impl Events {
  fn new(num_options: usize) -> Self {
    Events {
      settled: vec![0; num_options],
      pending: vec![0; num_options],
    }
  }
}

fn add(sum: &mut [u32], counts: &[u32]) {
  for (sum, count) in sum.iter_mut().zip(counts) {
    *sum += count;
  }
}

/// Disambiguates a list of nodes where children always come before their
/// parents. `follows(terminal, pos)` tells whether a terminal matches at an
/// input position.
pub fn disambiguate(
  rules: &RuleSet,
  nodes: &mut [SpptNode],
  follows: impl Fn(RuleId, usize) -> bool,
) {
  let num_options = rules.preference_options().count();
  let mut events: Vec<Events> = Vec::with_capacity(nodes.len());

  for index in 0..nodes.len() {
    let (done, rest) = nodes.split_at_mut(index);
    let node_events = match &mut rest[0] {
      SpptNode::Leaf(_) => Events::new(num_options),
      SpptNode::Branch(branch) => {
        let mut alt_events: Vec<Events> = branch
          .alternatives
          .iter()
          .map(|alt| {
            alternative_events(
              rules,
              branch,
              alt,
              &events,
              num_options,
              &follows,
            )
          })
          .collect();

        if branch.alternatives.len() > 1 {
          if let Some(preference) = rules.preference_rule(branch.rule) {
            retain_preferred(branch, &mut alt_events, preference);
          }
        }
        if branch.alternatives.len() > 1 {
          if let Some(kind) =
            rules.rule(branch.rule).as_item().and_then(|i| i.choice_kind())
          {
            retain_by_choice_kind(branch, &mut alt_events, kind, done);
          }
        }

        alt_events.swap_remove(0)
      }
    };
    events.push(node_events);
  }
}

fn alternative_events(
  rules: &RuleSet,
  branch: &SpptBranch,
  alt: &SpptAlternative,
  events: &[Events],
  num_options: usize,
  follows: &impl Fn(RuleId, usize) -> bool,
) -> Events {
  let mut result = Events::new(num_options);
  if let Some((last, init)) = alt.children.split_last() {
    for child in init {
      add(&mut result.settled, &events[*child].settled);
      add(&mut result.settled, &events[*child].pending);
    }
    add(&mut result.settled, &events[*last].settled);
    add(&mut result.pending, &events[*last].pending);
  }
  for option in rules.preference_options() {
    if option.spine() == branch.rule
      && option.option() == alt.option
      && option.on().iter().any(|t| follows(*t, branch.next))
    {
      result.pending[option.index()] += 1;
    }
  }
  result
}

/// Compares the settled events of two alternatives over the options of a
/// preference rule, in declaration order. `Greater` means `a` is preferred.
/// Pending events are compared once a derivation encloses them.
fn compare_events(
  preference: &PreferenceRule,
  a: &Events,
  b: &Events,
) -> Ordering {
  for option in preference.options() {
    let index = option.index();
    let (x, y) = (a.settled[index], b.settled[index]);
    let ordering = match option.associativity() {
      Associativity::Left => x.cmp(&y),
      Associativity::Right => y.cmp(&x),
    };
    if ordering != Ordering::Equal {
      return ordering;
    }
  }
  Ordering::Equal
}

fn retain_preferred(
  branch: &mut SpptBranch,
  alt_events: &mut Vec<Events>,
  preference: &PreferenceRule,
) {
  let best = (0..alt_events.len())
    .max_by(|a, b| compare_events(preference, &alt_events[*a], &alt_events[*b]))
    .expect("branches have alternatives");
  let keep: Vec<bool> = alt_events
    .iter()
    .map(|e| {
      compare_events(preference, e, &alt_events[best]) == Ordering::Equal
    })
    .collect();
  retain(branch, alt_events, &keep);
}

/// Compares the child boundaries of two alternatives from the left. The
/// alternative whose first differing child ends later is `Greater`.
fn compare_longest(
  nodes: &[SpptNode],
  a: &SpptAlternative,
  b: &SpptAlternative,
) -> Ordering {
  for (x, y) in a.children.iter().zip(&b.children) {
    let ordering = nodes[*x].next().cmp(&nodes[*y].next());
    if ordering != Ordering::Equal {
      return ordering;
    }
  }
  Ordering::Equal
}

fn retain_by_choice_kind(
  branch: &mut SpptBranch,
  alt_events: &mut Vec<Events>,
  kind: ChoiceKind,
  nodes: &[SpptNode],
) {
  let compare = |a: &SpptAlternative, b: &SpptAlternative| {
    // Lower options are better, so they compare as greater.
    let priority = b.option.cmp(&a.option);
    let longest = compare_longest(nodes, a, b);
    match kind {
      ChoiceKind::Ambiguous => Ordering::Equal,
      ChoiceKind::LongestPriority => longest.then(priority),
      ChoiceKind::PriorityLongest => priority.then(longest),
    }
  };

  let alternatives = &branch.alternatives;
  let best = (0..alternatives.len())
    .max_by(|a, b| compare(&alternatives[*a], &alternatives[*b]))
    .expect("branches have alternatives");
  let keep: Vec<bool> = alternatives
    .iter()
    .map(|alt| compare(alt, &alternatives[best]) == Ordering::Equal)
    .collect();
  retain(branch, alt_events, &keep);
}

fn retain(
  branch: &mut SpptBranch,
  alt_events: &mut Vec<Events>,
  keep: &[bool],
) {
  let mut index = 0;
  branch.alternatives.retain(|_| {
    index += 1;
    keep[index - 1]
  });
  let mut index = 0;
  alt_events.retain(|_| {
    index += 1;
    keep[index - 1]
  });
  debug_assert!(!branch.alternatives.is_empty());
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{grammar::examples, utils::Name};

  fn leaf(rules: &RuleSet, name: &str, start: usize, text: &str) -> SpptNode {
    SpptNode::Leaf(crate::sppt::SpptLeaf {
      rule: rules.find(name).unwrap(),
      name: Name::new(name),
      start,
      end: start + text.len(),
      next: start + text.len(),
      text: text.to_string(),
      embedded: None,
    })
  }

  fn branch(
    rules: &RuleSet,
    name: &str,
    start: usize,
    next: usize,
    alternatives: Vec<(usize, Vec<usize>)>,
  ) -> SpptNode {
    SpptNode::Branch(SpptBranch {
      rule: rules.find(name).unwrap(),
      name: Name::new(name),
      start,
      next,
      alternatives: alternatives
        .into_iter()
        .map(|(option, children)| SpptAlternative { option, children })
        .collect(),
    })
  }

  fn options(node: &SpptNode) -> Vec<usize> {
    node
      .as_branch()
      .unwrap()
      .alternatives()
      .iter()
      .map(|alt| alt.option())
      .collect()
  }

  /// The forest of "abc" in `S = 'a' 'b' 'c' | X 'c'`.
  fn split_forest(rules: &RuleSet) -> Vec<SpptNode> {
    vec![
      leaf(rules, "'a'", 0, "a"),
      leaf(rules, "'b'", 1, "b"),
      leaf(rules, "'c'", 2, "c"),
      branch(rules, "X", 0, 2, vec![(0, vec![0, 1])]),
      branch(rules, "S", 0, 3, vec![(0, vec![0, 1, 2]), (1, vec![3, 2])]),
    ]
  }

  #[test]
  fn test_longest_priority_prefers_longer_first_child() {
    let rules = examples::make_split(ChoiceKind::LongestPriority);
    let mut nodes = split_forest(&rules);
    disambiguate(&rules, &mut nodes, |_, _| false);
    assert_eq!(options(&nodes[4]), vec![1]);
  }

  #[test]
  fn test_priority_longest_prefers_lower_option() {
    let rules = examples::make_split(ChoiceKind::PriorityLongest);
    let mut nodes = split_forest(&rules);
    disambiguate(&rules, &mut nodes, |_, _| false);
    assert_eq!(options(&nodes[4]), vec![0]);
  }

  #[test]
  fn test_ambiguous_keeps_everything() {
    let rules = examples::make_split(ChoiceKind::Ambiguous);
    let mut nodes = split_forest(&rules);
    disambiguate(&rules, &mut nodes, |_, _| false);
    assert_eq!(options(&nodes[4]), vec![0, 1]);
  }

  #[test]
  fn test_right_associative_preference_penalises_events() {
    // "if a then if b then c else d", with the else on either if.
    let rules = examples::make_dangling_else();
    let else_id = rules.find("'else'").unwrap();
    let else_pos = 20;
    let mut nodes = vec![
      leaf(&rules, "'if'", 0, "if"),
      leaf(&rules, "ID", 3, "a"),
      leaf(&rules, "'then'", 5, "then"),
      leaf(&rules, "'if'", 10, "if"),
      leaf(&rules, "ID", 13, "b"),
      leaf(&rules, "'then'", 15, "then"),
      leaf(&rules, "ID", 18, "c"),
      branch(&rules, "S", 18, 20, vec![(1, vec![6])]),
      leaf(&rules, "'else'", 20, "else"),
      leaf(&rules, "ID", 25, "d"),
      branch(&rules, "S", 25, 26, vec![(1, vec![9])]),
      // 11: if b then c
      branch(&rules, "If", 10, 20, vec![(0, vec![3, 4, 5, 7])]),
      // 12: S over 11
      branch(&rules, "S", 10, 20, vec![(0, vec![11])]),
      // 13: if b then c else d
      branch(&rules, "If", 10, 26, vec![(1, vec![3, 4, 5, 7, 8, 10])]),
      // 14: S over 13
      branch(&rules, "S", 10, 26, vec![(0, vec![13])]),
      // 15: both readings of the whole statement
      branch(
        &rules,
        "If",
        0,
        26,
        vec![(0, vec![0, 1, 2, 14]), (1, vec![0, 1, 2, 12, 8, 10])],
      ),
    ];
    disambiguate(&rules, &mut nodes, |t, pos| t == else_id && pos == else_pos);
    assert_eq!(options(&nodes[15]), vec![0]);
  }

  #[test]
  fn test_left_associative_preference_rewards_events() {
    // "1+2+3"
    let rules = examples::make_expressions();
    let plus = rules.find("'+'").unwrap();
    let mut nodes = vec![
      leaf(&rules, "NUM", 0, "1"),
      branch(&rules, "E", 0, 1, vec![(2, vec![0])]),
      leaf(&rules, "'+'", 1, "+"),
      leaf(&rules, "NUM", 2, "2"),
      branch(&rules, "E", 2, 3, vec![(2, vec![3])]),
      leaf(&rules, "'+'", 3, "+"),
      leaf(&rules, "NUM", 4, "3"),
      branch(&rules, "E", 4, 5, vec![(2, vec![6])]),
      // 8: 1+2
      branch(&rules, "E", 0, 3, vec![(0, vec![1, 2, 4])]),
      // 9: 2+3
      branch(&rules, "E", 2, 5, vec![(0, vec![4, 5, 7])]),
      // 10: (1+2)+3 and 1+(2+3)
      branch(&rules, "E", 0, 5, vec![(0, vec![8, 5, 7]), (0, vec![1, 2, 9])]),
    ];
    disambiguate(&rules, &mut nodes, |t, pos| {
      t == plus && (pos == 1 || pos == 3)
    });
    let top = nodes[10].as_branch().unwrap();
    assert_eq!(top.alternatives().len(), 1);
    assert_eq!(top.alternatives()[0].children(), &[8, 5, 7]);
  }
}
