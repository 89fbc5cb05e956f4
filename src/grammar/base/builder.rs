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

use std::{
  collections::{BTreeMap, BTreeSet},
  sync::Arc,
};

use super::{
  ChoiceKind, GrammarErrors, Pattern, Rule, RuleId, RuleItem, RuleKind,
  RuleSet, Terminal,
};
use crate::{
  grammar::{
    passes,
    preference::{Associativity, PreferenceOption, PreferenceRule},
  },
  utils::Name,
};

/// A reference to a rule from within another rule.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum ItemRef {
  /// An anonymous literal terminal, named `'text'`.
  Literal(String),
  /// An anonymous pattern terminal, named `"pattern"`.
  Pattern(String),
  /// A rule declared by name.
  Rule(String),
}

impl ItemRef {
  pub fn literal(text: &str) -> Self {
    ItemRef::Literal(text.to_string())
  }

  pub fn pattern(pattern: &str) -> Self {
    ItemRef::Pattern(pattern.to_string())
  }

  pub fn rule(name: &str) -> Self {
    ItemRef::Rule(name.to_string())
  }
}

pub struct ItemsBuilder {
  items: Vec<ItemRef>,
}

impl ItemsBuilder {
  fn new() -> Self {
    ItemsBuilder { items: Vec::new() }
  }

  pub fn add_item(&mut self, item: ItemRef) -> &mut Self {
    self.items.push(item);
    self
  }

  pub fn add_literal(&mut self, text: &str) -> &mut Self {
    self.add_item(ItemRef::literal(text))
  }

  pub fn add_pattern(&mut self, pattern: &str) -> &mut Self {
    self.add_item(ItemRef::pattern(pattern))
  }

  pub fn add_ref(&mut self, name: &str) -> &mut Self {
    self.add_item(ItemRef::rule(name))
  }
}

// ----------------

pub struct ChoiceBuilder {
  options: Vec<Vec<ItemRef>>,
}

impl ChoiceBuilder {
  pub fn add_option(
    &mut self,
    build_fn: impl FnOnce(&mut ItemsBuilder),
  ) -> &mut Self {
    let mut builder = ItemsBuilder::new();
    build_fn(&mut builder);
    self.options.push(builder.items);
    self
  }
}

// ----------------

struct PreferenceDecl {
  spine: String,
  option: usize,
  on: Vec<ItemRef>,
  associativity: Associativity,
}

pub struct PreferenceBuilder {
  options: Vec<PreferenceDecl>,
}

impl PreferenceBuilder {
  /// Adds an option preferring derivations by how often the given option of
  /// `spine` completes right before one of the `on` terminals.
  pub fn add_option(
    &mut self,
    spine: &str,
    option: usize,
    on: impl IntoIterator<Item = ItemRef>,
    associativity: Associativity,
  ) -> &mut Self {
    self.options.push(PreferenceDecl {
      spine: spine.to_string(),
      option,
      on: on.into_iter().collect(),
      associativity,
    });
    self
  }
}

// ----------------

enum DeclKind {
  Literal(String),
  Pattern(String),
  Concatenation(Vec<ItemRef>),
  Choice(ChoiceKind, Vec<Vec<ItemRef>>),
  Multi {
    min: usize,
    max: Option<usize>,
    item: ItemRef,
  },
  SeparatedList {
    min: usize,
    max: Option<usize>,
    item: ItemRef,
    separator: ItemRef,
  },
  Embedded(Arc<RuleSet>, String),
  Empty,
}

struct RuleDecl {
  name: String,
  kind: DeclKind,
  skip: bool,
}

impl RuleDecl {
  fn is_terminal_like(&self) -> bool {
    matches!(
      self.kind,
      DeclKind::Literal(_) | DeclKind::Pattern(_) | DeclKind::Embedded(..)
    )
  }
}

/// Resolves rule references, interning anonymous terminals as it goes.
struct Resolver<'a> {
  names: BTreeMap<String, RuleId>,
  anonymous: Vec<Rule>,
  next_id: usize,
  errors: &'a mut GrammarErrors,
}

impl<'a> Resolver<'a> {
  fn terminal(&mut self, tag: String, terminal: Terminal) -> RuleId {
    if let Some(id) = self.names.get(&tag) {
      return *id;
    }
    let id = RuleId::from_index(self.next_id);
    self.next_id += 1;
    self.names.insert(tag.clone(), id);
    self.anonymous.push(Rule::new(
      id,
      Name::new(&tag),
      RuleKind::Terminal(terminal),
    ));
    id
  }

  fn resolve(&mut self, context: &str, item: &ItemRef) -> Option<RuleId> {
    match item {
      ItemRef::Rule(name) => match self.names.get(name) {
        Some(id) => Some(*id),
        None => {
          self
            .errors
            .unresolved_refs
            .insert(format!("{} -> {}", context, name));
          None
        }
      },
      ItemRef::Literal(text) => {
        if text.is_empty() {
          self
            .errors
            .invalid_terminals
            .insert(format!("{}: empty literal", context));
          return None;
        }
        let tag = format!("'{}'", text);
        Some(self.terminal(tag, Terminal::Literal(text.clone())))
      }
      ItemRef::Pattern(source) => match Pattern::new(source) {
        Ok(pattern) => {
          let tag = format!("\"{}\"", source);
          Some(self.terminal(tag, Terminal::Pattern(pattern)))
        }
        Err(e) => {
          self
            .errors
            .invalid_terminals
            .insert(format!("{}: {}", context, e));
          None
        }
      },
    }
  }

  fn resolve_all(
    &mut self,
    context: &str,
    items: &[ItemRef],
  ) -> Option<Vec<RuleId>> {
    let resolved: Vec<_> =
      items.iter().map(|i| self.resolve(context, i)).collect();
    let resolved: Option<Vec<_>> = resolved.into_iter().collect();
    resolved.map(|ids| {
      if ids.is_empty() {
        vec![RuleId::EMPTY]
      } else {
        ids
      }
    })
  }
}

fn check_bounds(
  errors: &mut GrammarErrors,
  name: &str,
  min: usize,
  max: Option<usize>,
) {
  if let Some(max) = max {
    if max < min {
      errors
        .invalid_bounds
        .insert(format!("{}: {{{}..{}}}", name, min, max));
    }
  }
}

pub struct RuleSetBuilder {
  rules: Vec<RuleDecl>,
  preferences: Vec<(String, Vec<PreferenceDecl>)>,
}

impl RuleSetBuilder {
  fn new() -> Self {
    RuleSetBuilder {
      rules: Vec::new(),
      preferences: Vec::new(),
    }
  }

  fn add_decl(&mut self, name: &str, kind: DeclKind, skip: bool) -> &mut Self {
    self.rules.push(RuleDecl {
      name: name.to_string(),
      kind,
      skip,
    });
    self
  }

  pub fn add_concatenation(
    &mut self,
    name: &str,
    build_fn: impl FnOnce(&mut ItemsBuilder),
  ) -> &mut Self {
    let mut builder = ItemsBuilder::new();
    build_fn(&mut builder);
    self.add_decl(name, DeclKind::Concatenation(builder.items), false)
  }

  pub fn add_choice(
    &mut self,
    name: &str,
    kind: ChoiceKind,
    build_fn: impl FnOnce(&mut ChoiceBuilder),
  ) -> &mut Self {
    let mut builder = ChoiceBuilder {
      options: Vec::new(),
    };
    build_fn(&mut builder);
    self.add_decl(name, DeclKind::Choice(kind, builder.options), false)
  }

  /// Adds a repetition of `item`. A `max` of `None` is unbounded.
  pub fn add_multi(
    &mut self,
    name: &str,
    min: usize,
    max: Option<usize>,
    item: ItemRef,
  ) -> &mut Self {
    self.add_decl(name, DeclKind::Multi { min, max, item }, false)
  }

  /// Adds a repetition of `item` with `separator` between items.
  pub fn add_separated_list(
    &mut self,
    name: &str,
    min: usize,
    max: Option<usize>,
    item: ItemRef,
    separator: ItemRef,
  ) -> &mut Self {
    self.add_decl(
      name,
      DeclKind::SeparatedList {
        min,
        max,
        item,
        separator,
      },
      false,
    )
  }

  pub fn add_empty(&mut self, name: &str) -> &mut Self {
    self.add_decl(name, DeclKind::Empty, false)
  }

  /// Adds a rule that matches the `goal` rule of another rule set as a
  /// single token.
  pub fn add_embedded(
    &mut self,
    name: &str,
    rule_set: Arc<RuleSet>,
    goal: &str,
  ) -> &mut Self {
    self.add_decl(name, DeclKind::Embedded(rule_set, goal.to_string()), false)
  }

  pub fn add_literal_rule(&mut self, name: &str, text: &str) -> &mut Self {
    self.add_decl(name, DeclKind::Literal(text.to_string()), false)
  }

  pub fn add_pattern_rule(&mut self, name: &str, pattern: &str) -> &mut Self {
    self.add_decl(name, DeclKind::Pattern(pattern.to_string()), false)
  }

  /// Adds a literal that is skipped between tokens.
  pub fn add_skip_literal(&mut self, name: &str, text: &str) -> &mut Self {
    self.add_decl(name, DeclKind::Literal(text.to_string()), true)
  }

  /// Adds a pattern that is skipped between tokens.
  pub fn add_skip_pattern(&mut self, name: &str, pattern: &str) -> &mut Self {
    self.add_decl(name, DeclKind::Pattern(pattern.to_string()), true)
  }

  pub fn add_preference(
    &mut self,
    context: &str,
    build_fn: impl FnOnce(&mut PreferenceBuilder),
  ) -> &mut Self {
    let mut builder = PreferenceBuilder {
      options: Vec::new(),
    };
    build_fn(&mut builder);
    self.preferences.push((context.to_string(), builder.options));
    self
  }

  fn build(self) -> Result<RuleSet, GrammarErrors> {
    let RuleSetBuilder { rules, preferences } = self;
    let mut errors = GrammarErrors::default();

    let mut names = BTreeMap::new();
    for (id, name) in [
      (RuleId::EMPTY, "<EMPTY>"),
      (RuleId::EOT, "<EOT>"),
      (RuleId::GOAL, "<GOAL>"),
    ] {
      names.insert(name.to_string(), id);
    }

    let mut decls = Vec::new();
    for decl in rules {
      if names.contains_key(&decl.name) {
        errors.duplicate_rules.insert(decl.name.clone());
        continue;
      }
      let id = RuleId::from_index(RuleId::RESERVED + decls.len());
      names.insert(decl.name.clone(), id);
      decls.push((id, decl));
    }

    let default_goal = decls
      .iter()
      .find(|(_, decl)| !decl.is_terminal_like())
      .map(|(id, _)| *id);

    let mut resolver = Resolver {
      names,
      anonymous: Vec::new(),
      next_id: RuleId::RESERVED + decls.len(),
      errors: &mut errors,
    };

    let mut resolved = vec![
      Rule::new(
        RuleId::EMPTY,
        Name::new("<EMPTY>"),
        RuleKind::Terminal(Terminal::Empty),
      ),
      Rule::new(
        RuleId::EOT,
        Name::new("<EOT>"),
        RuleKind::Terminal(Terminal::EndOfText),
      ),
      Rule::new(RuleId::GOAL, Name::new("<GOAL>"), RuleKind::Goal),
    ];
    let mut skip = BTreeSet::new();

    for (id, decl) in &decls {
      let name = decl.name.as_str();
      let kind = match &decl.kind {
        DeclKind::Literal(text) => {
          if text.is_empty() {
            resolver
              .errors
              .invalid_terminals
              .insert(format!("{}: empty literal", name));
          }
          Some(RuleKind::Terminal(Terminal::Literal(text.clone())))
        }
        DeclKind::Pattern(source) => match Pattern::new(source) {
          Ok(pattern) => Some(RuleKind::Terminal(Terminal::Pattern(pattern))),
          Err(e) => {
            resolver
              .errors
              .invalid_terminals
              .insert(format!("{}: {}", name, e));
            None
          }
        },
        DeclKind::Concatenation(items) => resolver
          .resolve_all(name, items)
          .map(|items| RuleKind::NonTerminal(RuleItem::Concatenation(items))),
        DeclKind::Choice(kind, options) => {
          let options: Option<Vec<_>> = options
            .iter()
            .map(|items| resolver.resolve_all(name, items))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();
          options.map(|options| {
            RuleKind::NonTerminal(RuleItem::Choice {
              kind: *kind,
              options,
            })
          })
        }
        DeclKind::Multi { min, max, item } => {
          check_bounds(resolver.errors, name, *min, *max);
          resolver.resolve(name, item).map(|item| {
            RuleKind::NonTerminal(RuleItem::Multi {
              min: *min,
              max: *max,
              item,
            })
          })
        }
        DeclKind::SeparatedList {
          min,
          max,
          item,
          separator,
        } => {
          check_bounds(resolver.errors, name, *min, *max);
          let item = resolver.resolve(name, item);
          let separator = resolver.resolve(name, separator);
          item.zip(separator).map(|(item, separator)| {
            RuleKind::NonTerminal(RuleItem::SeparatedList {
              min: *min,
              max: *max,
              item,
              separator,
            })
          })
        }
        DeclKind::Embedded(rule_set, goal) => {
          match rule_set.find(goal) {
            Some(goal_id) if !rule_set.is_terminal_like(goal_id) => {
              Some(RuleKind::NonTerminal(RuleItem::Embedded {
                rule_set: rule_set.clone(),
                goal: goal_id,
              }))
            }
            _ => {
              resolver
                .errors
                .unresolved_refs
                .insert(format!("{} -> embedded {}", name, goal));
              None
            }
          }
        }
        DeclKind::Empty => Some(RuleKind::NonTerminal(RuleItem::Empty)),
      };

      if decl.skip {
        skip.insert(*id);
      }
      // Unresolved rules keep a placeholder so ids stay dense; the errors
      // prevent the rule set from being returned.
      resolved.push(Rule::new(
        *id,
        Name::new(name),
        kind.unwrap_or(RuleKind::NonTerminal(RuleItem::Empty)),
      ));
    }

    let mut preference_decls: BTreeMap<RuleId, Vec<PreferenceDecl>> =
      BTreeMap::new();
    for (context, options) in preferences {
      match resolver.names.get(&context) {
        Some(id)
          if decls
            .iter()
            .any(|(d, decl)| d == id && !decl.is_terminal_like()) =>
        {
          preference_decls.entry(*id).or_default().extend(options);
        }
        _ => {
          resolver
            .errors
            .invalid_preferences
            .insert(format!("unknown context {}", context));
        }
      }
    }

    let mut preference_rules = BTreeMap::new();
    let mut next_index = 0;
    for (context, options) in preference_decls {
      let mut resolved_options = Vec::new();
      for decl in options {
        let spine = resolver.names.get(&decl.spine).copied();
        let spine_options = spine
          .and_then(|s| resolved.get(s.index()))
          .and_then(|r| r.as_item())
          .map(|item| item.options());
        match (spine, spine_options) {
          (Some(spine), Some(spine_options))
            if spine_options.contains(&decl.option) =>
          {
            let on: Option<BTreeSet<_>> = decl
              .on
              .iter()
              .map(|item| resolver.resolve(&decl.spine, item))
              .collect::<Vec<_>>()
              .into_iter()
              .collect();
            if let Some(on) = on {
              resolved_options.push(PreferenceOption::new(
                next_index,
                spine,
                decl.option,
                on,
                decl.associativity,
              ));
              next_index += 1;
            }
          }
          _ => {
            resolver
              .errors
              .invalid_preferences
              .insert(format!("{}.{}", decl.spine, decl.option));
          }
        }
      }
      preference_rules
        .insert(context, PreferenceRule::new(context, resolved_options));
    }

    resolved.extend(resolver.anonymous);
    errors.into_result()?;

    let mut rule_set =
      RuleSet::new(resolved, skip, preference_rules, default_goal);
    let analysis = passes::analyse(&rule_set);
    rule_set.set_analysis(analysis);
    Ok(rule_set)
  }
}

/// Builds a rule set using a builder function.
///
/// Example:
///
/// ```rust
/// # use corner::grammar::{build, ChoiceKind, ItemRef};
/// let rules = build(|b| {
///   b.add_choice("S", ChoiceKind::Ambiguous, |cb| {
///     cb.add_option(|ob| {
///       ob.add_ref("S").add_literal("a");
///     })
///     .add_option(|ob| {
///       ob.add_literal("a");
///     });
///   })
///   .add_multi("As", 0, None, ItemRef::rule("S"));
/// })
/// .unwrap();
/// assert_eq!(rules.default_goal(), rules.find("S"));
/// ```
///
/// Literals and patterns used as items become anonymous terminals named
/// `'text'` and `"pattern"`.
pub fn build(
  build_fn: impl FnOnce(&mut RuleSetBuilder),
) -> Result<RuleSet, GrammarErrors> {
  let mut builder = RuleSetBuilder::new();
  build_fn(&mut builder);
  builder.build()
}
