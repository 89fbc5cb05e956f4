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

pub mod builder;
pub mod terminal;

use {
  crate::{
    grammar::preference::{PreferenceOption, PreferenceRule},
    utils::{Name, ToDoc},
  },
  std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
  },
};

pub use terminal::{Pattern, Terminal};

/// The option index of the non-empty alternative of a list rule.
pub const OPTION_LIST_ITEMS: usize = 0;
/// The option index of the empty alternative of a list rule with a minimum
/// of zero items.
pub const OPTION_LIST_EMPTY: usize = 1;

/// An index of a rule within its rule set.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RuleId(usize);

impl RuleId {
  /// The zero-length terminal used to derive empty options.
  pub const EMPTY: RuleId = RuleId(0);
  /// The end of text terminal.
  pub const EOT: RuleId = RuleId(1);
  /// The synthetic rule wrapping the goal of an automaton.
  pub const GOAL: RuleId = RuleId(2);

  pub(crate) const RESERVED: usize = 3;

  pub fn index(self) -> usize {
    self.0
  }

  pub(crate) fn from_index(index: usize) -> Self {
    RuleId(index)
  }
}

const EMPTY_SEQUENCE: &[RuleId] = &[RuleId::EMPTY];

/// How the alternatives of a choice are selected when more than one of them
/// derives the same span of input.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ChoiceKind {
  /// Every alternative is kept.
  Ambiguous,
  /// Leftmost-longest children first, then the earliest declared option.
  LongestPriority,
  /// The earliest declared option first, then leftmost-longest children.
  PriorityLongest,
}

/// The body of a non-terminal rule.
#[derive(Clone, Debug)]
pub enum RuleItem {
  Concatenation(Vec<RuleId>),
  Choice {
    kind: ChoiceKind,
    options: Vec<Vec<RuleId>>,
  },
  Multi {
    min: usize,
    max: Option<usize>,
    item: RuleId,
  },
  SeparatedList {
    min: usize,
    max: Option<usize>,
    item: RuleId,
    separator: RuleId,
  },
  /// A goal rule of another rule set, matched like a terminal.
  Embedded {
    rule_set: Arc<RuleSet>,
    goal: RuleId,
  },
  Empty,
}

impl RuleItem {
  /// Returns the option indexes this item can derive.
  pub fn options(&self) -> Vec<usize> {
    match self {
      RuleItem::Concatenation(_) | RuleItem::Empty => vec![0],
      RuleItem::Choice { options, .. } => (0..options.len()).collect(),
      RuleItem::Multi { min, max, .. }
      | RuleItem::SeparatedList { min, max, .. } => {
        let mut result = Vec::new();
        if *max != Some(0) {
          result.push(OPTION_LIST_ITEMS);
        }
        if *min == 0 {
          result.push(OPTION_LIST_EMPTY);
        }
        result
      }
      RuleItem::Embedded { .. } => Vec::new(),
    }
  }

  /// Returns the fixed item sequence of an option, or `None` if the option is
  /// a list of items or does not exist.
  pub fn sequence(&self, option: usize) -> Option<&[RuleId]> {
    match self {
      RuleItem::Concatenation(items) if option == 0 => Some(items),
      RuleItem::Empty if option == 0 => Some(EMPTY_SEQUENCE),
      RuleItem::Choice { options, .. } => {
        options.get(option).map(|items| items.as_slice())
      }
      RuleItem::Multi { min: 0, .. }
      | RuleItem::SeparatedList { min: 0, .. }
        if option == OPTION_LIST_EMPTY =>
      {
        Some(EMPTY_SEQUENCE)
      }
      _ => None,
    }
  }

  /// Returns the choice kind that governs default disambiguation.
  pub fn choice_kind(&self) -> Option<ChoiceKind> {
    match self {
      RuleItem::Choice { kind, .. } => Some(*kind),
      _ => None,
    }
  }
}

/// The kind of a rule.
#[derive(Clone, Debug)]
pub enum RuleKind {
  Terminal(Terminal),
  NonTerminal(RuleItem),
  /// The reserved goal wrapper. Its single item is fixed per automaton.
  Goal,
}

/// A single named rule.
#[derive(Clone, Debug)]
pub struct Rule {
  id: RuleId,
  name: Name,
  kind: RuleKind,
}

impl Rule {
  pub(crate) fn new(id: RuleId, name: Name, kind: RuleKind) -> Self {
    Rule { id, name, kind }
  }

  pub fn id(&self) -> RuleId {
    self.id
  }

  pub fn name(&self) -> &Name {
    &self.name
  }

  pub fn kind(&self) -> &RuleKind {
    &self.kind
  }

  pub fn as_terminal(&self) -> Option<&Terminal> {
    match &self.kind {
      RuleKind::Terminal(t) => Some(t),
      _ => None,
    }
  }

  pub fn as_item(&self) -> Option<&RuleItem> {
    match &self.kind {
      RuleKind::NonTerminal(item) => Some(item),
      _ => None,
    }
  }

  /// Terminals and embedded rules are shifted as a single token.
  pub fn is_terminal_like(&self) -> bool {
    matches!(
      self.kind,
      RuleKind::Terminal(_)
        | RuleKind::NonTerminal(RuleItem::Embedded { .. })
    )
  }
}

/// Results of the grammar passes, computed once when a rule set is built.
#[derive(Clone, Debug, Default)]
pub struct Analysis {
  pub(crate) nullable: BTreeSet<RuleId>,
  pub(crate) firsts: BTreeMap<RuleId, BTreeSet<RuleId>>,
  pub(crate) productive: BTreeSet<RuleId>,
}

/// An immutable, fully resolved set of rules.
///
/// A rule set consists of
///
/// - The reserved rules `<EMPTY>`, `<EOT>` and `<GOAL>`
/// - Named terminal and non-terminal rules, in declaration order
/// - Anonymous literal and pattern terminals, named by their tags
/// - Skip terminals, consumed between tokens and never part of a tree
/// - Preference rules, keyed by the rule they disambiguate
#[derive(Clone, Debug)]
pub struct RuleSet {
  rules: Vec<Rule>,
  names: BTreeMap<Name, RuleId>,
  skip: BTreeSet<RuleId>,
  preferences: BTreeMap<RuleId, PreferenceRule>,
  default_goal: Option<RuleId>,
  analysis: Analysis,
}

impl RuleSet {
  pub(crate) fn new(
    rules: Vec<Rule>,
    skip: BTreeSet<RuleId>,
    preferences: BTreeMap<RuleId, PreferenceRule>,
    default_goal: Option<RuleId>,
  ) -> Self {
    let names = rules.iter().map(|r| (r.name.clone(), r.id)).collect();
    RuleSet {
      rules,
      names,
      skip,
      preferences,
      default_goal,
      analysis: Analysis::default(),
    }
  }

  pub(crate) fn set_analysis(&mut self, analysis: Analysis) {
    self.analysis = analysis;
  }

  /// Returns all rules, indexed by their id.
  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  pub fn rule(&self, id: RuleId) -> &Rule {
    &self.rules[id.0]
  }

  pub fn name(&self, id: RuleId) -> &Name {
    &self.rule(id).name
  }

  /// Looks up a rule by name.
  pub fn find(&self, name: &str) -> Option<RuleId> {
    self.names.get(&Name::new(name)).copied()
  }

  pub fn skip_rules(&self) -> &BTreeSet<RuleId> {
    &self.skip
  }

  /// The goal used when a parse does not name one: the first declared
  /// non-terminal.
  pub fn default_goal(&self) -> Option<RuleId> {
    self.default_goal
  }

  pub fn is_terminal_like(&self, id: RuleId) -> bool {
    self.rule(id).is_terminal_like()
  }

  /// Returns true if the rule can derive the empty string.
  pub fn is_nullable(&self, id: RuleId) -> bool {
    self.analysis.nullable.contains(&id)
  }

  /// Returns true if the rule can derive at least one finite string.
  pub fn is_productive(&self, id: RuleId) -> bool {
    self.analysis.productive.contains(&id)
  }

  /// The terminal-like rules, other than `<EMPTY>`, that can begin a
  /// derivation of the given rule.
  pub fn first_set(&self, id: RuleId) -> &BTreeSet<RuleId> {
    static NONE: BTreeSet<RuleId> = BTreeSet::new();
    self.analysis.firsts.get(&id).unwrap_or(&NONE)
  }

  pub fn preference_rule(&self, context: RuleId) -> Option<&PreferenceRule> {
    self.preferences.get(&context)
  }

  /// All preference options of all rules, in a fixed order.
  pub fn preference_options(
    &self,
  ) -> impl Iterator<Item = &PreferenceOption> + '_ {
    self.preferences.values().flat_map(|p| p.options())
  }

  /// Returns a pretty-printed representation of the rule set.
  pub fn to_pretty(&self) -> String {
    crate::utils::to_pretty_string(self, 80)
  }

  fn item_doc<'a, DA: pretty::DocAllocator<'a>>(
    &self,
    da: &'a DA,
    items: &[RuleId],
  ) -> pretty::DocBuilder<'a, DA>
  where
    DA::Doc: Clone,
  {
    da.intersperse(
      items.iter().map(|id| self.name(*id).to_doc(da)),
      da.softline(),
    )
  }

  fn list_doc<'a, DA: pretty::DocAllocator<'a>>(
    &self,
    da: &'a DA,
    min: usize,
    max: Option<usize>,
    body: pretty::DocBuilder<'a, DA>,
  ) -> pretty::DocBuilder<'a, DA>
  where
    DA::Doc: Clone,
  {
    let bounds = match max {
      Some(max) => format!("{{{}..{}}}", min, max),
      None => format!("{{{}..}}", min),
    };
    da.text("[ ")
      .append(body)
      .append(da.text(" ]"))
      .append(da.text(bounds))
  }

  fn rule_doc<'a, DA: pretty::DocAllocator<'a>>(
    &self,
    da: &'a DA,
    rule: &Rule,
  ) -> Option<pretty::DocBuilder<'a, DA>>
  where
    DA::Doc: Clone,
  {
    let body = match &rule.kind {
      RuleKind::Goal => return None,
      RuleKind::Terminal(Terminal::Empty | Terminal::EndOfText) => {
        return None
      }
      RuleKind::Terminal(t) => {
        if t.tag() == rule.name.str() {
          return None;
        }
        da.text(t.tag())
      }
      RuleKind::NonTerminal(RuleItem::Concatenation(items)) => {
        self.item_doc(da, items)
      }
      RuleKind::NonTerminal(RuleItem::Choice { kind, options }) => {
        let prefix = match kind {
          ChoiceKind::Ambiguous => da.nil(),
          ChoiceKind::LongestPriority => da.text("[longest] "),
          ChoiceKind::PriorityLongest => da.text("[priority] "),
        };
        prefix.append(da.intersperse(
          options.iter().map(|items| self.item_doc(da, items)),
          da.softline().append(da.text("| ")),
        ))
      }
      RuleKind::NonTerminal(RuleItem::Multi { min, max, item }) => {
        self.list_doc(da, *min, *max, self.name(*item).to_doc(da))
      }
      RuleKind::NonTerminal(RuleItem::SeparatedList {
        min,
        max,
        item,
        separator,
      }) => self.list_doc(
        da,
        *min,
        *max,
        self
          .name(*item)
          .to_doc(da)
          .append(da.text(" / "))
          .append(self.name(*separator).to_doc(da)),
      ),
      RuleKind::NonTerminal(RuleItem::Embedded { rule_set, goal }) => {
        da.text(format!("embedded {}", rule_set.name(*goal)))
      }
      RuleKind::NonTerminal(RuleItem::Empty) => da.text("<EMPTY>"),
    };

    let head = if self.skip.contains(&rule.id) {
      da.text("skip ").append(rule.name.to_doc(da))
    } else {
      rule.name.to_doc(da)
    };

    Some(
      head
        .append(da.text(" ="))
        .append(da.softline().append(body).nest(2))
        .append(da.text(" ;"))
        .group(),
    )
  }
}

impl ToDoc for RuleSet {
  fn to_doc<'a, DA: pretty::DocAllocator<'a>>(
    &self,
    da: &'a DA,
  ) -> pretty::DocBuilder<'a, DA>
  where
    DA::Doc: Clone,
  {
    da.intersperse(
      self.rules.iter().filter_map(|rule| self.rule_doc(da, rule)),
      da.hardline(),
    )
  }
}

/// The problems found while resolving a rule set.
#[derive(thiserror::Error, Clone, Debug, Default, PartialEq, Eq)]
#[error(
  "invalid grammar: duplicate rules {duplicate_rules:?}, unresolved \
   references {unresolved_refs:?}, invalid terminals {invalid_terminals:?}, \
   invalid bounds {invalid_bounds:?}, invalid preferences \
   {invalid_preferences:?}"
)]
pub struct GrammarErrors {
  pub duplicate_rules: BTreeSet<String>,
  pub unresolved_refs: BTreeSet<String>,
  pub invalid_terminals: BTreeSet<String>,
  pub invalid_bounds: BTreeSet<String>,
  pub invalid_preferences: BTreeSet<String>,
}

impl GrammarErrors {
  pub fn is_empty(&self) -> bool {
    self.duplicate_rules.is_empty()
      && self.unresolved_refs.is_empty()
      && self.invalid_terminals.is_empty()
      && self.invalid_bounds.is_empty()
      && self.invalid_preferences.is_empty()
  }

  pub(crate) fn into_result(self) -> Result<(), Self> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(self)
    }
  }
}
