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

//! The parser facade.
//!
//! A `Parser` owns a rule set and caches one automaton per goal, so repeated
//! parses share the states and transitions already computed.

pub mod forest;
pub mod gss;
pub mod issues;
pub mod lc;
pub mod scanner;
pub mod tree;

use std::{
  collections::BTreeMap,
  sync::{Arc, RwLock},
};

use crate::{
  automaton::{Automaton, LookaheadSet},
  disambiguate::disambiguate,
  grammar::{RuleId, RuleItem, RuleSet},
  sppt::Sppt,
};

pub use issues::{InputLocation, ParseIssue};

use forest::ChildRef;
use lc::{Driver, Outcome};
use scanner::Scanner;

/// How the automaton of a goal is built.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum AutomatonKind {
  /// States and transitions are computed when a parse first needs them.
  #[default]
  OnDemand,
  /// The automaton is completed before its first use.
  PreBuilt,
}

#[derive(Clone, Debug, Default)]
pub struct ParserOptions {
  pub automaton_kind: AutomatonKind,
}

/// Options of a single parse.
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
  /// The goal rule. Defaults to the first non-terminal of the rule set.
  pub goal: Option<String>,
  /// The byte offset where parsing starts.
  pub offset: usize,
}

impl ParseOptions {
  pub fn with_goal(goal: &str) -> Self {
    ParseOptions {
      goal: Some(goal.to_string()),
      ..ParseOptions::default()
    }
  }
}

#[derive(thiserror::Error, Clone, PartialEq, Eq, Debug)]
pub enum ParserError {
  #[error("unknown goal rule {0:?}")]
  UnknownGoal(String),
  #[error("goal rule {0:?} is terminal-like")]
  GoalIsTerminal(String),
  #[error("the rule set has no non-terminal to use as a goal")]
  NoGoal,
  #[error("offset {offset} is not a character boundary of a {len} byte input")]
  OffsetOutOfRange { offset: usize, len: usize },
}

/// The failure of a parse, as an error.
#[derive(thiserror::Error, Clone, PartialEq, Eq, Debug)]
#[error("{}", display_issues(.issues))]
pub struct ParseFailure {
  pub issues: Vec<ParseIssue>,
}

fn display_issues(issues: &[ParseIssue]) -> String {
  issues
    .iter()
    .map(ParseIssue::to_string)
    .collect::<Vec<_>>()
    .join("\n")
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct ParseStats {
  pub gss_nodes: usize,
  pub gss_edges: usize,
  pub work_items: usize,
  /// The largest number of stack nodes ending at one input position.
  pub max_heads: usize,
  pub sppt_nodes: usize,
}

#[derive(Clone, Debug)]
pub struct ParseResult {
  sppt: Option<Sppt>,
  issues: Vec<ParseIssue>,
  stats: ParseStats,
}

impl ParseResult {
  pub fn sppt(&self) -> Option<&Sppt> {
    self.sppt.as_ref()
  }

  /// Empty exactly when the parse succeeded.
  pub fn issues(&self) -> &[ParseIssue] {
    &self.issues
  }

  pub fn stats(&self) -> &ParseStats {
    &self.stats
  }

  pub fn is_success(&self) -> bool {
    self.sppt.is_some()
  }

  pub fn into_result(self) -> Result<Sppt, ParseFailure> {
    match self.sppt {
      Some(sppt) => Ok(sppt),
      None => Err(ParseFailure {
        issues: self.issues,
      }),
    }
  }
}

pub struct Parser {
  rules: Arc<RuleSet>,
  options: ParserOptions,
  automata: RwLock<BTreeMap<RuleId, Arc<Automaton>>>,
  embedded: RwLock<BTreeMap<RuleId, Arc<Parser>>>,
}

impl Parser {
  pub fn new(rules: Arc<RuleSet>) -> Self {
    Parser::with_options(rules, ParserOptions::default())
  }

  pub fn with_options(rules: Arc<RuleSet>, options: ParserOptions) -> Self {
    Parser {
      rules,
      options,
      automata: RwLock::new(BTreeMap::new()),
      embedded: RwLock::new(BTreeMap::new()),
    }
  }

  pub fn rules(&self) -> &RuleSet {
    &self.rules
  }

  pub fn rule_set(&self) -> &Arc<RuleSet> {
    &self.rules
  }

  pub fn options(&self) -> &ParserOptions {
    &self.options
  }

  fn resolve_goal(&self, goal: Option<&str>) -> Result<RuleId, ParserError> {
    let id = match goal {
      None => return self.rules.default_goal().ok_or(ParserError::NoGoal),
      Some(name) => self
        .rules
        .find(name)
        .ok_or_else(|| ParserError::UnknownGoal(name.to_string()))?,
    };
    if self.rules.is_terminal_like(id) {
      return Err(ParserError::GoalIsTerminal(self.rules.name(id).to_string()));
    }
    if self.rules.rule(id).as_item().is_none() {
      return Err(ParserError::UnknownGoal(self.rules.name(id).to_string()));
    }
    Ok(id)
  }

  fn automaton_for(&self, goal: RuleId) -> Arc<Automaton> {
    if let Some(automaton) = self.automata.read().unwrap().get(&goal) {
      return automaton.clone();
    }

    let automaton = match self.options.automaton_kind {
      AutomatonKind::OnDemand => Automaton::new(self.rules.clone(), goal),
      AutomatonKind::PreBuilt => Automaton::prebuilt(self.rules.clone(), goal),
    };
    self
      .automata
      .write()
      .unwrap()
      .entry(goal)
      .or_insert_with(|| Arc::new(automaton))
      .clone()
  }

  /// Returns the automaton of a goal, or of the default goal.
  pub fn automaton(
    &self,
    goal: Option<&str>,
  ) -> Result<Arc<Automaton>, ParserError> {
    Ok(self.automaton_for(self.resolve_goal(goal)?))
  }

  /// Completes the automaton of a goal ahead of any parse.
  pub fn build_for(&self, goal: &str) -> Result<Arc<Automaton>, ParserError> {
    let automaton = self.automaton(Some(goal))?;
    automaton.complete();
    Ok(automaton)
  }

  pub fn parse(&self, sentence: &str) -> Result<ParseResult, ParserError> {
    self.parse_with(sentence, &ParseOptions::default())
  }

  pub fn parse_for_goal(
    &self,
    goal: &str,
    sentence: &str,
  ) -> Result<ParseResult, ParserError> {
    self.parse_with(sentence, &ParseOptions::with_goal(goal))
  }

  /// Parses `sentence` from `options.offset` to its end.
  pub fn parse_with(
    &self,
    sentence: &str,
    options: &ParseOptions,
  ) -> Result<ParseResult, ParserError> {
    let goal = self.resolve_goal(options.goal.as_deref())?;
    if !sentence.is_char_boundary(options.offset) {
      return Err(ParserError::OffsetOutOfRange {
        offset: options.offset,
        len: sentence.len(),
      });
    }

    let automaton = self.automaton_for(goal);
    let scanner = Scanner::new(self, sentence);
    let start = scanner.skip(options.offset);
    let outcome =
      Driver::new(&automaton, &scanner).run(start, LookaheadSet::end_of_text());

    let mut stats = ParseStats {
      gss_nodes: outcome.gss.num_nodes(),
      gss_edges: outcome.gss.num_edges(),
      work_items: outcome.work_items,
      max_heads: outcome.gss.max_heads(),
      sppt_nodes: 0,
    };

    let sppt = if outcome.accepts.contains(&sentence.len()) {
      self.assemble(&scanner, &outcome, goal, sentence.len())
    } else {
      None
    };

    let result = match sppt {
      Some(sppt) => {
        stats.sppt_nodes = sppt.nodes().len();
        ParseResult {
          sppt: Some(sppt),
          issues: Vec::new(),
          stats,
        }
      }
      None => {
        let issue = outcome.failures.into_issue(&self.rules, sentence, start);
        ParseResult {
          sppt: None,
          issues: vec![issue],
          stats,
        }
      }
    };

    log::debug!(
      "parsed {} bytes for {}: {} ({:?})",
      sentence.len() - options.offset,
      self.rules.name(goal),
      if result.is_success() { "ok" } else { "failed" },
      result.stats
    );
    Ok(result)
  }

  /// Builds the tree of `goal` over `outcome.start..next`, disambiguated.
  fn assemble(
    &self,
    scanner: &Scanner,
    outcome: &Outcome,
    goal: RuleId,
    next: usize,
  ) -> Option<Sppt> {
    let root = ChildRef::Branch(goal, outcome.start, next);
    let (mut nodes, root) =
      tree::extract(&outcome.forest, &self.rules, scanner.text(), root)?;
    disambiguate(&self.rules, &mut nodes, |terminal, pos| {
      scanner.matches(terminal, pos)
    });
    Some(tree::compact(nodes, root))
  }

  /// The parser of the rule set embedded by `rule`, if it is an embedded
  /// rule.
  pub(crate) fn embedded_parser(&self, rule: RuleId) -> Option<Arc<Parser>> {
    if let Some(parser) = self.embedded.read().unwrap().get(&rule) {
      return Some(parser.clone());
    }

    let rule_set = match self.rules.rule(rule).as_item()? {
      RuleItem::Embedded { rule_set, .. } => rule_set.clone(),
      _ => return None,
    };
    let parser = Parser::with_options(rule_set, self.options.clone());
    Some(
      self
        .embedded
        .write()
        .unwrap()
        .entry(rule)
        .or_insert_with(|| Arc::new(parser))
        .clone(),
    )
  }

  /// Parses the longest non-empty prefix of `text[offset..]` that derives
  /// `goal`. Returns the offset after it, including trailing skip text, and
  /// its tree.
  pub(crate) fn parse_prefix(
    &self,
    goal: RuleId,
    text: &str,
    offset: usize,
  ) -> Option<(usize, Sppt)> {
    let automaton = self.automaton_for(goal);
    let scanner = Scanner::new(self, text);
    let start = scanner.skip(offset);
    let outcome =
      Driver::new(&automaton, &scanner).run(start, LookaheadSet::any());

    let end = outcome.accepts.iter().rev().copied().find(|end| *end > start)?;
    let sppt = self.assemble(&scanner, &outcome, goal, end)?;
    log::trace!(
      "embedded {} matched {}..{}",
      self.rules.name(goal),
      offset,
      end
    );
    Some((end, sppt))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::grammar::{build, examples, ChoiceKind};

  fn parser(rules: RuleSet) -> Parser {
    Parser::new(Arc::new(rules))
  }

  fn tree(parser: &Parser, sentence: &str) -> Sppt {
    parser.parse(sentence).unwrap().into_result().unwrap()
  }

  #[test]
  fn test_single_token() {
    let parser = parser(examples::make_abc());
    let result = parser.parse("b").unwrap();
    assert!(result.is_success());
    assert!(result.issues().is_empty());
    assert_eq!(result.sppt().unwrap().to_string(), "S { 'b' }");
    assert_eq!(result.stats().sppt_nodes, 2);
  }

  #[test]
  fn test_failure_at_start() {
    let parser = parser(examples::make_abc());
    let result = parser.parse("").unwrap();
    assert!(!result.is_success());
    let issue = &result.issues()[0];
    assert_eq!(issue.location.position, 0);
    assert_eq!(issue.expected_terminals, vec!["'a'", "'b'", "'c'"]);
    assert_eq!(issue.expected_goals, vec!["<GOAL>"]);
    assert_eq!(
      issue.message,
      "unexpected end of input, expected one of {'a', 'b', 'c'}"
    );
  }

  #[test]
  fn test_failure_is_furthest() {
    let parser = parser(examples::make_abc());
    let failure = parser.parse("ab").unwrap().into_result().unwrap_err();
    assert_eq!(failure.issues.len(), 1);
    let issue = &failure.issues[0];
    assert_eq!(issue.location.position, 1);
    assert_eq!(issue.location.column, 2);
    assert_eq!(issue.expected_terminals, vec!["<EOT>"]);
    assert_eq!(failure.to_string(), issue.to_string());
  }

  #[test]
  fn test_ambiguity_is_packed() {
    let parser = parser(examples::make_ambiguous());
    let tree = tree(&parser, "aaa");
    let root = tree.root_node().as_branch().unwrap();
    assert!(root.alternatives().len() >= 2);
    assert!(tree.is_ambiguous());
    assert_eq!(tree.leaf_texts(), vec!["a", "a", "a"]);
  }

  #[test]
  fn test_left_and_right_recursion() {
    let sentence = "a".repeat(500);
    for rules in [
      examples::make_left_recursive(),
      examples::make_right_recursive(),
    ] {
      let parser = parser(rules);
      let result = parser.parse(&sentence).unwrap();
      assert!(result.stats().gss_nodes <= 10 * sentence.len());
      let tree = result.into_result().unwrap();
      assert!(!tree.is_ambiguous());
      assert_eq!(tree.tree_count(), 1);
      assert_eq!(tree.leaf_texts().len(), 500);
    }
  }

  #[test]
  fn test_dangling_else_shapes() {
    let sentence = "ttvsv";
    let longest = parser(examples::make_tvsv(ChoiceKind::LongestPriority));
    assert_eq!(
      tree(&longest, sentence).to_string(),
      "E { 't' E { 't' E { 'v' } 's' E { 'v' } } }"
    );

    let priority = parser(examples::make_tvsv(ChoiceKind::PriorityLongest));
    assert_eq!(
      tree(&priority, sentence).to_string(),
      "E { 't' E { 't' E { 'v' } } 's' E { 'v' } }"
    );

    let unambiguous = tree(&longest, "tvsv");
    assert_eq!(
      unambiguous.to_string(),
      "E { 't' E { 'v' } 's' E { 'v' } }"
    );
  }

  #[test]
  fn test_split_choice_under_both_automaton_kinds() {
    for kind in [AutomatonKind::OnDemand, AutomatonKind::PreBuilt] {
      let options = ParserOptions {
        automaton_kind: kind,
      };
      let longest = Parser::with_options(
        Arc::new(examples::make_split(ChoiceKind::LongestPriority)),
        options.clone(),
      );
      assert_eq!(
        tree(&longest, "abc").to_string(),
        "S { X { 'a' 'b' } 'c' }"
      );

      let priority = Parser::with_options(
        Arc::new(examples::make_split(ChoiceKind::PriorityLongest)),
        options,
      );
      assert_eq!(tree(&priority, "abc").to_string(), "S { 'a' 'b' 'c' }");
    }
  }

  #[test]
  fn test_automaton_kinds_agree() {
    let sentences = ["1+2*3", "1 * 2 + 3 * 4", "12", "1+"];
    let on_demand = parser(examples::make_expressions());
    let prebuilt = Parser::with_options(
      Arc::new(examples::make_expressions()),
      ParserOptions {
        automaton_kind: AutomatonKind::PreBuilt,
      },
    );
    for sentence in sentences {
      let a = on_demand.parse(sentence).unwrap();
      let b = prebuilt.parse(sentence).unwrap();
      assert_eq!(a.sppt(), b.sppt());
      assert_eq!(a.issues(), b.issues());
    }

    on_demand.build_for("E").unwrap();
    assert_eq!(
      on_demand.automaton(Some("E")).unwrap().render(),
      prebuilt.automaton(None).unwrap().render()
    );
  }

  #[test]
  fn test_parses_are_deterministic() {
    let parser = parser(examples::make_ambiguous());
    let first = parser.parse("aaaa").unwrap();
    let second = parser.parse("aaaa").unwrap();
    assert_eq!(first.sppt(), second.sppt());
    assert_eq!(first.stats(), second.stats());

    let fresh = self::parser(examples::make_ambiguous());
    assert_eq!(fresh.parse("aaaa").unwrap().sppt(), first.sppt());
  }

  #[test]
  fn test_separated_list() {
    let parser = parser(examples::make_separated());

    let empty = parser.parse("").unwrap();
    assert_eq!(empty.issues()[0].expected_terminals, vec!["'a'"]);

    let one = tree(&parser, "a");
    assert_eq!(one.to_string(), "A { 'a' }");

    let three = tree(&parser, "a,a,a");
    assert!(!three.is_ambiguous());
    let root = three.root_node().as_branch().unwrap();
    assert_eq!(root.alternatives()[0].children().len(), 5);
    assert_eq!(three.leaf_texts(), vec!["a", ",", "a", ",", "a"]);

    let trailing = parser.parse("a,").unwrap();
    assert_eq!(trailing.issues()[0].location.position, 2);
    assert_eq!(trailing.issues()[0].expected_terminals, vec!["'a'"]);
  }

  #[test]
  fn test_dangling_else_binds_to_nearest_if() {
    let parser = parser(examples::make_dangling_else());
    let tree = tree(&parser, "if a then if b then c else d");
    assert!(!tree.is_ambiguous());

    let root = tree.root_node().as_branch().unwrap();
    assert_eq!(root.name().str(), "S");
    let outer = tree
      .node(root.alternatives()[0].children()[0])
      .as_branch()
      .unwrap();
    assert_eq!(outer.name().str(), "If");
    assert_eq!(outer.alternatives()[0].option(), 0);
  }

  #[test]
  fn test_operator_precedence_and_associativity() {
    let parser = parser(examples::make_expressions());
    assert_eq!(
      tree(&parser, "1+2*3").to_string(),
      "E { E { NUM:'1' } '+' E { E { NUM:'2' } '*' E { NUM:'3' } } }"
    );
    assert_eq!(
      tree(&parser, "1*2+3").to_string(),
      "E { E { E { NUM:'1' } '*' E { NUM:'2' } } '+' E { NUM:'3' } }"
    );
    assert_eq!(
      tree(&parser, "1+2+3").to_string(),
      "E { E { E { NUM:'1' } '+' E { NUM:'2' } } '+' E { NUM:'3' } }"
    );
    assert!(!tree(&parser, "1*2*3*4").is_ambiguous());
  }

  #[test]
  fn test_skip_terminals() {
    let parser = parser(examples::make_expressions());
    let tree = tree(&parser, "  1 +\n 2 ");
    assert_eq!(tree.root_node().start(), 2);
    assert_eq!(tree.leaf_texts(), vec!["1", "+", "2"]);

    let result = parser.parse("1 +\n  ").unwrap();
    let location = &result.issues()[0].location;
    assert_eq!((location.line, location.column), (2, 3));
    assert_eq!(result.issues()[0].expected_terminals, vec!["NUM"]);
  }

  #[test]
  fn test_embedded_rule_set() {
    let inner = build(|b| {
      b.add_concatenation("Inner", |ib| {
        ib.add_literal("x").add_literal("y");
      });
    })
    .unwrap();
    let outer = build(|b| {
      b.add_concatenation("S", |ib| {
        ib.add_literal("[").add_ref("Emb").add_literal("]");
      })
      .add_embedded("Emb", Arc::new(inner), "Inner");
    })
    .unwrap();

    let parser = parser(outer);
    assert_eq!(
      tree(&parser, "[xy]").to_string(),
      "S { '[' Emb:[Inner { 'x' 'y' }] ']' }"
    );

    let failure = parser.parse("[xx]").unwrap();
    assert_eq!(failure.issues()[0].location.position, 1);
    assert_eq!(failure.issues()[0].expected_terminals, vec!["Emb"]);
  }

  #[test]
  fn test_goal_and_offset() {
    let parser = parser(examples::make_nullable());
    assert!(parser.parse_for_goal("Plus", "a,a").unwrap().is_success());
    assert!(parser.parse_for_goal("Twice", "bb").unwrap().is_success());
    assert!(!parser.parse_for_goal("Twice", "bbb").unwrap().is_success());
    assert!(parser.parse("").unwrap().is_success());

    let result = parser
      .parse_with(
        "xxac",
        &ParseOptions {
          goal: None,
          offset: 2,
        },
      )
      .unwrap();
    let tree = result.into_result().unwrap();
    assert_eq!(tree.root_node().start(), 2);
    assert_eq!(tree.leaf_texts(), vec!["a", "c"]);
  }

  #[test]
  fn test_parser_errors() {
    let parser = parser(examples::make_abc());
    assert_eq!(
      parser.parse_for_goal("Nope", "a").unwrap_err(),
      ParserError::UnknownGoal("Nope".to_string())
    );
    assert_eq!(
      parser.parse_for_goal("'a'", "a").unwrap_err(),
      ParserError::GoalIsTerminal("'a'".to_string())
    );
    assert_eq!(
      parser
        .parse_with(
          "a",
          &ParseOptions {
            goal: None,
            offset: 2,
          },
        )
        .unwrap_err(),
      ParserError::OffsetOutOfRange { offset: 2, len: 1 }
    );
    assert!(parser.build_for("S").is_ok());
  }
}
