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

use super::{Sppt, SpptBranch, SpptLeaf, SpptNode};

/// Callbacks for a depth-first walk of one tree of a forest.
///
/// Branches are visited in document order. Only the alternative returned by
/// `choose_alternative` is descended into; it must be a valid index into
/// the branch's alternatives.
pub trait SpptVisitor {
  fn choose_alternative(&mut self, _branch: &SpptBranch) -> usize {
    0
  }

  fn begin_branch(&mut self, _branch: &SpptBranch, _alternative: usize) {}

  fn leaf(&mut self, _leaf: &SpptLeaf) {}

  fn end_branch(&mut self, _branch: &SpptBranch, _alternative: usize) {}
}

enum Step {
  Enter(usize),
  Exit(usize, usize),
}

impl Sppt {
  /// Walks the tree from the root without recursion, so arbitrarily deep
  /// trees can be visited.
  pub fn walk<V: SpptVisitor + ?Sized>(&self, visitor: &mut V) {
    let mut stack = vec![Step::Enter(self.root())];
    while let Some(step) = stack.pop() {
      match step {
        Step::Enter(index) => match self.node(index) {
          SpptNode::Leaf(leaf) => visitor.leaf(leaf),
          SpptNode::Branch(branch) => {
            let alternative = visitor.choose_alternative(branch);
            visitor.begin_branch(branch, alternative);
            stack.push(Step::Exit(index, alternative));
            let children = branch.alternatives()[alternative].children();
            stack.extend(children.iter().rev().map(|c| Step::Enter(*c)));
          }
        },
        Step::Exit(index, alternative) => {
          if let SpptNode::Branch(branch) = self.node(index) {
            visitor.end_branch(branch, alternative);
          }
        }
      }
    }
  }

  /// The texts of the leaves of the first tree, in input order.
  pub fn leaf_texts(&self) -> Vec<String> {
    struct Texts(Vec<String>);
    impl SpptVisitor for Texts {
      fn leaf(&mut self, leaf: &SpptLeaf) {
        self.0.push(leaf.text().to_string());
      }
    }

    let mut texts = Texts(Vec::new());
    self.walk(&mut texts);
    texts.0
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{grammar::RuleId, sppt::SpptAlternative, utils::Name};

  fn leaf(start: usize, text: &str) -> SpptNode {
    SpptNode::Leaf(SpptLeaf {
      rule: RuleId::from_index(4),
      name: Name::new(&format!("'{}'", text)),
      start,
      end: start + text.len(),
      next: start + text.len(),
      text: text.to_string(),
      embedded: None,
    })
  }

  fn branch(start: usize, next: usize, alts: Vec<Vec<usize>>) -> SpptNode {
    SpptNode::Branch(SpptBranch {
      rule: RuleId::from_index(3),
      name: Name::new("S"),
      start,
      next,
      alternatives: alts
        .into_iter()
        .enumerate()
        .map(|(option, children)| SpptAlternative { option, children })
        .collect(),
    })
  }

  #[derive(Default)]
  struct Events {
    events: Vec<String>,
    pick_last: bool,
  }

  impl SpptVisitor for Events {
    fn choose_alternative(&mut self, branch: &SpptBranch) -> usize {
      if self.pick_last {
        branch.alternatives().len() - 1
      } else {
        0
      }
    }

    fn begin_branch(&mut self, branch: &SpptBranch, alternative: usize) {
      self
        .events
        .push(format!("begin {}.{}", branch.name(), alternative));
    }

    fn leaf(&mut self, leaf: &SpptLeaf) {
      self.events.push(format!("leaf {}", leaf.text()));
    }

    fn end_branch(&mut self, branch: &SpptBranch, _alternative: usize) {
      self.events.push(format!("end {}", branch.name()));
    }
  }

  fn sample() -> Sppt {
    Sppt::new(
      vec![
        leaf(0, "a"),
        leaf(1, "b"),
        branch(0, 1, vec![vec![0]]),
        branch(0, 2, vec![vec![2, 1], vec![0, 1]]),
      ],
      3,
    )
  }

  #[test]
  fn test_walk_order() {
    let mut events = Events::default();
    sample().walk(&mut events);
    assert_eq!(
      events.events,
      vec!["begin S.0", "begin S.0", "leaf a", "end S", "leaf b", "end S"]
    );
  }

  #[test]
  fn test_walk_chosen_alternative() {
    let mut events = Events {
      pick_last: true,
      ..Events::default()
    };
    sample().walk(&mut events);
    assert_eq!(events.events, vec!["begin S.1", "leaf a", "leaf b", "end S"]);
  }

  #[test]
  fn test_walk_deep_tree() {
    let depth = 100_000;
    let mut nodes = vec![leaf(0, "a")];
    for i in 0..depth {
      nodes.push(branch(0, 1, vec![vec![i]]));
    }
    let tree = Sppt::new(nodes, depth);
    assert_eq!(tree.leaf_texts(), vec!["a"]);
  }
}
