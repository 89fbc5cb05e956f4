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

//! Shared packed parse trees.
//!
//! Every node covers a span of input and is shared by all the derivations
//! that use it. Branches pack one alternative per distinct derivation of
//! their span. Nodes are stored children first, so the root is always the
//! last node.

pub mod visitor;

use std::sync::Arc;

use crate::{
  grammar::RuleId,
  utils::{Name, ToDoc},
};

pub use visitor::SpptVisitor;

/// A terminal-like rule matched over `start..end`. `next` is the offset
/// after any skip text that follows it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpptLeaf {
  pub(crate) rule: RuleId,
  pub(crate) name: Name,
  pub(crate) start: usize,
  pub(crate) end: usize,
  pub(crate) next: usize,
  pub(crate) text: String,
  pub(crate) embedded: Option<Arc<Sppt>>,
}

impl SpptLeaf {
  pub fn rule(&self) -> RuleId {
    self.rule
  }

  pub fn name(&self) -> &Name {
    &self.name
  }

  pub fn start(&self) -> usize {
    self.start
  }

  pub fn end(&self) -> usize {
    self.end
  }

  pub fn next(&self) -> usize {
    self.next
  }

  /// The matched text, without any following skip text.
  pub fn text(&self) -> &str {
    &self.text
  }

  /// The tree of an embedded rule set, for leaves of embedded rules.
  pub fn embedded(&self) -> Option<&Arc<Sppt>> {
    self.embedded.as_ref()
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpptAlternative {
  pub(crate) option: usize,
  pub(crate) children: Vec<usize>,
}

impl SpptAlternative {
  /// The option of the rule this alternative derives.
  pub fn option(&self) -> usize {
    self.option
  }

  pub fn children(&self) -> &[usize] {
    &self.children
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpptBranch {
  pub(crate) rule: RuleId,
  pub(crate) name: Name,
  pub(crate) start: usize,
  pub(crate) next: usize,
  pub(crate) alternatives: Vec<SpptAlternative>,
}

impl SpptBranch {
  pub fn rule(&self) -> RuleId {
    self.rule
  }

  pub fn name(&self) -> &Name {
    &self.name
  }

  pub fn start(&self) -> usize {
    self.start
  }

  pub fn next(&self) -> usize {
    self.next
  }

  /// Never empty.
  pub fn alternatives(&self) -> &[SpptAlternative] {
    &self.alternatives
  }

  pub fn is_ambiguous(&self) -> bool {
    self.alternatives.len() > 1
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpptNode {
  Leaf(SpptLeaf),
  Branch(SpptBranch),
}

impl SpptNode {
  pub fn rule(&self) -> RuleId {
    match self {
      SpptNode::Leaf(leaf) => leaf.rule,
      SpptNode::Branch(branch) => branch.rule,
    }
  }

  pub fn name(&self) -> &Name {
    match self {
      SpptNode::Leaf(leaf) => &leaf.name,
      SpptNode::Branch(branch) => &branch.name,
    }
  }

  pub fn start(&self) -> usize {
    match self {
      SpptNode::Leaf(leaf) => leaf.start,
      SpptNode::Branch(branch) => branch.start,
    }
  }

  pub fn next(&self) -> usize {
    match self {
      SpptNode::Leaf(leaf) => leaf.next,
      SpptNode::Branch(branch) => branch.next,
    }
  }

  pub fn as_leaf(&self) -> Option<&SpptLeaf> {
    match self {
      SpptNode::Leaf(leaf) => Some(leaf),
      SpptNode::Branch(_) => None,
    }
  }

  pub fn as_branch(&self) -> Option<&SpptBranch> {
    match self {
      SpptNode::Branch(branch) => Some(branch),
      SpptNode::Leaf(_) => None,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sppt {
  nodes: Vec<SpptNode>,
  root: usize,
}

impl Sppt {
  pub(crate) fn new(nodes: Vec<SpptNode>, root: usize) -> Self {
    debug_assert!(root < nodes.len());
    Sppt { nodes, root }
  }

  pub fn root(&self) -> usize {
    self.root
  }

  pub fn root_node(&self) -> &SpptNode {
    &self.nodes[self.root]
  }

  pub fn node(&self, index: usize) -> &SpptNode {
    &self.nodes[index]
  }

  pub fn nodes(&self) -> &[SpptNode] {
    &self.nodes
  }

  /// True if any node packs more than one alternative.
  pub fn is_ambiguous(&self) -> bool {
    self
      .nodes
      .iter()
      .filter_map(SpptNode::as_branch)
      .any(SpptBranch::is_ambiguous)
  }

  /// The number of distinct trees packed in this forest, saturating at
  /// `u64::MAX`.
  pub fn tree_count(&self) -> u64 {
    let mut counts: Vec<u64> = Vec::with_capacity(self.nodes.len());
    for node in &self.nodes {
      let count = match node {
        SpptNode::Leaf(_) => 1,
        SpptNode::Branch(branch) => {
          branch.alternatives.iter().fold(0u64, |total, alt| {
            let product = alt
              .children
              .iter()
              .fold(1u64, |p, child| p.saturating_mul(counts[*child]));
            total.saturating_add(product)
          })
        }
      };
      counts.push(count);
    }
    counts[self.root]
  }

  pub fn to_pretty(&self) -> String {
    crate::utils::to_pretty_string(self, 80)
  }

  /// Builds the document of every node. Children are stored before their
  /// parents, so each branch reuses the finished documents of its children.
  fn node_docs<'a, DA: pretty::DocAllocator<'a>>(
    &self,
    da: &'a DA,
  ) -> Vec<pretty::DocBuilder<'a, DA>>
  where
    DA::Doc: Clone,
  {
    let mut docs: Vec<pretty::DocBuilder<'a, DA>> =
      Vec::with_capacity(self.nodes.len());
    for node in &self.nodes {
      let doc = match node {
        SpptNode::Leaf(leaf) => leaf_doc(da, leaf),
        SpptNode::Branch(branch) => {
          let alts = branch.alternatives.iter().map(|alt| {
            da.intersperse(
              alt.children.iter().map(|child| docs[*child].clone()),
              da.line(),
            )
          });
          let body = da.intersperse(alts, da.line().append(da.text("| ")));
          branch
            .name
            .to_doc(da)
            .append(da.text(" {"))
            .append(da.line().append(body).nest(2))
            .append(da.line())
            .append(da.text("}"))
            .group()
        }
      };
      docs.push(doc);
    }
    docs
  }
}

fn leaf_doc<'a, DA: pretty::DocAllocator<'a>>(
  da: &'a DA,
  leaf: &SpptLeaf,
) -> pretty::DocBuilder<'a, DA>
where
  DA::Doc: Clone,
{
  let quoted = format!("'{}'", leaf.text);
  if leaf.rule == RuleId::EMPTY || leaf.name.str() == quoted {
    leaf.name.to_doc(da)
  } else if let Some(embedded) = &leaf.embedded {
    leaf
      .name
      .to_doc(da)
      .append(da.text(":["))
      .append(embedded.to_doc(da))
      .append(da.text("]"))
  } else {
    leaf.name.to_doc(da).append(da.text(":")).append(da.text(quoted))
  }
}

impl ToDoc for Sppt {
  fn to_doc<'a, DA: pretty::DocAllocator<'a>>(
    &self,
    da: &'a DA,
  ) -> pretty::DocBuilder<'a, DA>
  where
    DA::Doc: Clone,
  {
    self.node_docs(da).swap_remove(self.root)
  }
}

impl std::fmt::Display for Sppt {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.write_str(&self.to_pretty())
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn leaf(rule: usize, name: &str, start: usize, text: &str) -> SpptNode {
    SpptNode::Leaf(SpptLeaf {
      rule: RuleId::from_index(rule),
      name: Name::new(name),
      start,
      end: start + text.len(),
      next: start + text.len(),
      text: text.to_string(),
      embedded: None,
    })
  }

  fn branch(
    name: &str,
    start: usize,
    next: usize,
    alternatives: Vec<(usize, Vec<usize>)>,
  ) -> SpptNode {
    SpptNode::Branch(SpptBranch {
      rule: RuleId::from_index(3),
      name: Name::new(name),
      start,
      next,
      alternatives: alternatives
        .into_iter()
        .map(|(option, children)| SpptAlternative { option, children })
        .collect(),
    })
  }

  #[test]
  fn test_display_nested() {
    let tree = Sppt::new(
      vec![
        leaf(4, "'a'", 0, "a"),
        branch("S", 0, 1, vec![(0, vec![0])]),
        leaf(4, "'a'", 1, "a"),
        branch("S", 0, 2, vec![(1, vec![1, 2])]),
      ],
      3,
    );
    assert_eq!(tree.to_string(), "S { S { 'a' } 'a' }");
    assert!(!tree.is_ambiguous());
    assert_eq!(tree.tree_count(), 1);
  }

  #[test]
  fn test_display_named_leaf_and_alternatives() {
    let tree = Sppt::new(
      vec![
        leaf(5, "NUM", 0, "12"),
        branch("E", 0, 2, vec![(0, vec![0]), (1, vec![0])]),
      ],
      1,
    );
    assert_eq!(tree.to_string(), "E { NUM:'12' | NUM:'12' }");
    assert!(tree.is_ambiguous());
    assert_eq!(tree.tree_count(), 2);
  }

  #[test]
  fn test_display_deep_tree() {
    let depth = 4_000;
    let mut nodes = vec![leaf(4, "'a'", 0, "a")];
    for i in 0..depth {
      nodes.push(branch("S", 0, 1, vec![(0, vec![i])]));
    }
    let text = Sppt::new(nodes, depth).to_string();
    assert!(text.starts_with("S {\n  S {\n"));
    assert!(text.ends_with("}\n}"));
    assert_eq!(text.matches('{').count(), depth);
    assert_eq!(text.matches('}').count(), depth);
    assert_eq!(text.matches("'a'").count(), 1);
  }
}
