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

//! Extraction of shared packed parse trees from a parse forest.
//!
//! Both the forest and the tree can be deeper than the call stack allows, so
//! every walk here keeps its own stack. Derivations that would contain
//! themselves are cut.

use std::{
  collections::{BTreeMap, BTreeSet},
  rc::Rc,
};

use im::Vector;

use crate::{
  grammar::RuleSet,
  parsers::forest::{ChildRef, Forest, GrowingId},
  sppt::{Sppt, SpptAlternative, SpptBranch, SpptLeaf, SpptNode},
};

enum Slot<T> {
  InProgress,
  Done(T),
}

type Sequences = Rc<Vec<Vector<ChildRef>>>;

/// Expands growing nodes into the child sequences they stand for.
struct Flattener<'a> {
  forest: &'a Forest,
  memo: BTreeMap<GrowingId, Slot<Sequences>>,
}

impl<'a> Flattener<'a> {
  fn new(forest: &'a Forest) -> Self {
    Flattener {
      forest,
      memo: BTreeMap::new(),
    }
  }

  fn sequences(&mut self, root: GrowingId) -> Sequences {
    enum Step {
      Enter(GrowingId),
      Exit(GrowingId),
    }

    let mut stack = vec![Step::Enter(root)];
    while let Some(step) = stack.pop() {
      match step {
        Step::Enter(growing) => {
          if self.memo.contains_key(&growing) {
            continue;
          }
          self.memo.insert(growing, Slot::InProgress);
          stack.push(Step::Exit(growing));
          for (prev, _) in self.forest.growing_alternatives(growing) {
            if let Some(prev) = prev {
              if !self.memo.contains_key(prev) {
                stack.push(Step::Enter(*prev));
              }
            }
          }
        }
        Step::Exit(growing) => {
          let mut sequences = BTreeSet::new();
          for (prev, child) in self.forest.growing_alternatives(growing) {
            match prev {
              None => {
                sequences.insert(Vector::unit(*child));
              }
              Some(prev) => {
                // A prefix still in progress is part of a cycle.
                if let Some(Slot::Done(prefixes)) = self.memo.get(prev) {
                  for prefix in prefixes.iter() {
                    let mut sequence = prefix.clone();
                    sequence.push_back(*child);
                    sequences.insert(sequence);
                  }
                }
              }
            }
          }
          self.memo.insert(
            growing,
            Slot::Done(Rc::new(sequences.into_iter().collect())),
          );
        }
      }
    }

    match self.memo.get(&root) {
      Some(Slot::Done(sequences)) => sequences.clone(),
      _ => unreachable!("the root of a walk is always finished"),
    }
  }
}

/// Collects the nodes reachable from `root`, children before parents.
/// Returns the nodes and the index of the root, or `None` if the root has no
/// derivation.
pub fn extract(
  forest: &Forest,
  rules: &RuleSet,
  text: &str,
  root: ChildRef,
) -> Option<(Vec<SpptNode>, usize)> {
  enum Step {
    Enter(ChildRef),
    Exit(ChildRef, BTreeSet<(usize, Vector<ChildRef>)>),
  }

  let mut flattener = Flattener::new(forest);
  let mut slots: BTreeMap<ChildRef, Slot<Option<usize>>> = BTreeMap::new();
  let mut nodes = Vec::new();
  let mut stack = vec![Step::Enter(root)];

  while let Some(step) = stack.pop() {
    match step {
      Step::Enter(child) => {
        if slots.contains_key(&child) {
          continue;
        }
        match child {
          ChildRef::Leaf(rule, start) => {
            let index = forest.leaf(rule, start).map(|leaf| {
              nodes.push(SpptNode::Leaf(SpptLeaf {
                rule,
                name: rules.name(rule).clone(),
                start,
                end: leaf.end,
                next: leaf.next,
                text: text[start..leaf.end].to_string(),
                embedded: leaf.embedded.clone(),
              }));
              nodes.len() - 1
            });
            slots.insert(child, Slot::Done(index));
          }
          ChildRef::Branch(rule, start, next) => {
            slots.insert(child, Slot::InProgress);
            let mut candidates = BTreeSet::new();
            if let Some(alternatives) =
              forest.branch_alternatives(rule, start, next)
            {
              for (option, growing) in alternatives {
                for sequence in flattener.sequences(*growing).iter() {
                  candidates.insert((*option, sequence.clone()));
                }
              }
            }
            let children: BTreeSet<ChildRef> = candidates
              .iter()
              .flat_map(|(_, sequence)| sequence.iter().copied())
              .collect();
            stack.push(Step::Exit(child, candidates));
            for grandchild in children.into_iter().rev() {
              if !slots.contains_key(&grandchild) {
                stack.push(Step::Enter(grandchild));
              }
            }
          }
        }
      }
      Step::Exit(child, candidates) => {
        let (rule, start, next) = match child {
          ChildRef::Branch(rule, start, next) => (rule, start, next),
          ChildRef::Leaf(..) => unreachable!("leaves are finished on entry"),
        };
        let mut alternatives = Vec::new();
        for (option, sequence) in candidates {
          let children: Option<Vec<usize>> = sequence
            .iter()
            .map(|c| match slots.get(c) {
              Some(Slot::Done(index)) => *index,
              _ => None,
            })
            .collect();
          if let Some(children) = children {
            alternatives.push(SpptAlternative { option, children });
          }
        }

        let index = if alternatives.is_empty() {
          None
        } else {
          nodes.push(SpptNode::Branch(SpptBranch {
            rule,
            name: rules.name(rule).clone(),
            start,
            next,
            alternatives,
          }));
          Some(nodes.len() - 1)
        };
        slots.insert(child, Slot::Done(index));
      }
    }
  }

  match slots.get(&root) {
    Some(Slot::Done(Some(index))) => Some((nodes, *index)),
    _ => None,
  }
}

/// Keeps only the nodes still reachable from `root`, renumbered children
/// first with the root last.
pub fn compact(nodes: Vec<SpptNode>, root: usize) -> Sppt {
  let mut renumbered: Vec<Option<usize>> = vec![None; nodes.len()];
  let mut order = Vec::new();
  let mut stack = vec![(root, false)];
  while let Some((index, expanded)) = stack.pop() {
    if renumbered[index].is_some() {
      continue;
    }
    if expanded {
      renumbered[index] = Some(order.len());
      order.push(index);
      continue;
    }
    stack.push((index, true));
    if let SpptNode::Branch(branch) = &nodes[index] {
      for alt in branch.alternatives.iter().rev() {
        for child in alt.children.iter().rev() {
          if renumbered[*child].is_none() {
            stack.push((*child, false));
          }
        }
      }
    }
  }

  let mut nodes: Vec<Option<SpptNode>> = nodes.into_iter().map(Some).collect();
  let compacted = order
    .iter()
    .map(|index| {
      let mut node = nodes[*index].take().expect("each node is kept once");
      if let SpptNode::Branch(branch) = &mut node {
        for alt in &mut branch.alternatives {
          for child in &mut alt.children {
            *child = renumbered[*child].expect("children are kept first");
          }
        }
      }
      node
    })
    .collect::<Vec<_>>();
  let root = compacted.len() - 1;
  Sppt::new(compacted, root)
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    automaton::StateId,
    grammar::{examples, RuleId},
    parsers::forest::LeafMatch,
  };

  fn leaf_match(end: usize) -> LeafMatch {
    LeafMatch {
      end,
      next: end,
      embedded: None,
    }
  }

  #[test]
  fn test_extract_shares_prefixes() {
    // S = 'a' 'b' 'c' | X 'c' over "abc", with X = 'a' 'b'.
    let rules = examples::make_split(crate::grammar::ChoiceKind::Ambiguous);
    let s = rules.find("S").unwrap();
    let x = rules.find("X").unwrap();
    let [a, b, c] = ["'a'", "'b'", "'c'"].map(|n| rules.find(n).unwrap());

    let mut forest = Forest::new();
    forest.add_leaf(a, 0, leaf_match(1));
    forest.add_leaf(b, 1, leaf_match(2));
    forest.add_leaf(c, 2, leaf_match(3));

    let (g1, _) = forest.growing(StateId::from_index(1), 0, 1);
    forest.add_growing_alternative(g1, None, ChildRef::Leaf(a, 0));
    let (g2, _) = forest.growing(StateId::from_index(2), 0, 2);
    forest.add_growing_alternative(g2, Some(g1), ChildRef::Leaf(b, 1));
    let (g3, _) = forest.growing(StateId::from_index(3), 0, 3);
    forest.add_growing_alternative(g3, Some(g2), ChildRef::Leaf(c, 2));
    forest.add_branch_alternative(s, 0, 3, 0, g3);
    forest.add_branch_alternative(x, 0, 2, 0, g2);

    let (g4, _) = forest.growing(StateId::from_index(4), 0, 2);
    forest.add_growing_alternative(g4, None, ChildRef::Branch(x, 0, 2));
    let (g5, _) = forest.growing(StateId::from_index(5), 0, 3);
    forest.add_growing_alternative(g5, Some(g4), ChildRef::Leaf(c, 2));
    forest.add_branch_alternative(s, 0, 3, 1, g5);

    let (nodes, root) =
      extract(&forest, &rules, "abc", ChildRef::Branch(s, 0, 3)).unwrap();
    let tree = compact(nodes, root);
    assert_eq!(tree.to_string(), "S { 'a' 'b' 'c' | X { 'a' 'b' } 'c' }");
    assert_eq!(tree.nodes().len(), 5);
    assert_eq!(tree.tree_count(), 2);
  }

  #[test]
  fn test_cycles_are_cut() {
    let rules = examples::make_abc();
    let s = rules.find("S").unwrap();
    let a = rules.find("'a'").unwrap();

    let mut forest = Forest::new();
    forest.add_leaf(a, 0, leaf_match(1));
    let (g1, _) = forest.growing(StateId::from_index(1), 0, 1);
    forest.add_growing_alternative(g1, None, ChildRef::Leaf(a, 0));
    let (g2, _) = forest.growing(StateId::from_index(2), 0, 1);
    forest.add_growing_alternative(g2, None, ChildRef::Branch(s, 0, 1));
    forest.add_branch_alternative(s, 0, 1, 0, g1);
    forest.add_branch_alternative(s, 0, 1, 1, g2);

    let (nodes, root) =
      extract(&forest, &rules, "a", ChildRef::Branch(s, 0, 1)).unwrap();
    let tree = compact(nodes, root);
    assert_eq!(tree.to_string(), "S { 'a' }");
  }

  #[test]
  fn test_missing_root() {
    let rules = examples::make_abc();
    let forest = Forest::new();
    let root = ChildRef::Branch(RuleId::GOAL, 0, 0);
    assert!(extract(&forest, &rules, "", root).is_none());
  }

  #[test]
  fn test_compact_drops_unreachable_nodes() {
    let rules = examples::make_abc();
    let s = rules.find("S").unwrap();
    let a = rules.find("'a'").unwrap();
    let mut forest = Forest::new();
    forest.add_leaf(a, 0, leaf_match(1));
    forest.add_leaf(a, 1, leaf_match(2));
    let (g, _) = forest.growing(StateId::from_index(1), 1, 2);
    forest.add_growing_alternative(g, None, ChildRef::Leaf(a, 1));
    forest.add_branch_alternative(s, 1, 2, 0, g);

    let (mut nodes, root) =
      extract(&forest, &rules, "aa", ChildRef::Branch(s, 1, 2)).unwrap();
    nodes.insert(
      0,
      SpptNode::Leaf(SpptLeaf {
        rule: a,
        name: rules.name(a).clone(),
        start: 0,
        end: 1,
        next: 1,
        text: "a".to_string(),
        embedded: None,
      }),
    );
    if let SpptNode::Branch(branch) = &mut nodes[root + 1] {
      branch.alternatives[0].children = vec![1];
    }
    let tree = compact(nodes, root + 1);
    assert_eq!(tree.nodes().len(), 2);
    assert_eq!(tree.root(), 1);
    assert_eq!(tree.to_string(), "S { 'a' }");
  }
}
