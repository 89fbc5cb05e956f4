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

//! On-demand, memoized matching of terminal-like rules. All offsets are byte
//! offsets into the sentence.

use std::{cell::RefCell, collections::BTreeMap, sync::Arc};

use crate::{
  automaton::{LookaheadSet, LookaheadSymbol},
  grammar::{RuleId, RuleItem, RuleKind, RuleSet, Terminal},
  parsers::Parser,
  sppt::Sppt,
};

/// A match of a terminal-like rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
  pub rule: RuleId,
  pub start: usize,
  pub end: usize,
  /// The offset after the skip text following the token.
  pub next: usize,
  pub embedded: Option<Arc<Sppt>>,
}

pub struct Scanner<'a> {
  parser: &'a Parser,
  text: &'a str,
  tokens: RefCell<BTreeMap<(RuleId, usize), Option<Token>>>,
  skips: RefCell<BTreeMap<usize, usize>>,
}

impl<'a> Scanner<'a> {
  pub fn new(parser: &'a Parser, text: &'a str) -> Self {
    Scanner {
      parser,
      text,
      tokens: RefCell::new(BTreeMap::new()),
      skips: RefCell::new(BTreeMap::new()),
    }
  }

  pub fn text(&self) -> &'a str {
    self.text
  }

  fn rules(&self) -> &'a RuleSet {
    self.parser.rules()
  }

  /// Returns the offset after the longest run of skip terminals at `pos`.
  pub fn skip(&self, pos: usize) -> usize {
    if let Some(next) = self.skips.borrow().get(&pos) {
      return *next;
    }

    let rules = self.rules();
    let mut next = pos;
    loop {
      let longest = rules
        .skip_rules()
        .iter()
        .filter_map(|id| rules.rule(*id).as_terminal())
        .filter_map(|t| t.match_len(&self.text[next..]))
        .filter(|len| *len > 0)
        .max();
      match longest {
        Some(len) => next += len,
        None => break,
      }
    }

    self.skips.borrow_mut().insert(pos, next);
    next
  }

  /// Matches a terminal-like rule at `pos`.
  pub fn match_at(&self, rule: RuleId, pos: usize) -> Option<Token> {
    if let Some(token) = self.tokens.borrow().get(&(rule, pos)) {
      return token.clone();
    }

    let token = self.scan(rule, pos);
    log::trace!(
      "scan {} at {}: {:?}",
      self.rules().name(rule),
      pos,
      token.as_ref().map(|t| t.end)
    );
    self.tokens.borrow_mut().insert((rule, pos), token.clone());
    token
  }

  fn scan(&self, rule: RuleId, pos: usize) -> Option<Token> {
    let token = |end: usize, next: usize, embedded: Option<Arc<Sppt>>| Token {
      rule,
      start: pos,
      end,
      next,
      embedded,
    };

    match self.rules().rule(rule).kind() {
      RuleKind::Terminal(Terminal::Empty) => Some(token(pos, pos, None)),
      RuleKind::Terminal(Terminal::EndOfText) => {
        if pos == self.text.len() {
          Some(token(pos, pos, None))
        } else {
          None
        }
      }
      RuleKind::Terminal(terminal) => {
        let len = terminal.match_len(&self.text[pos..])?;
        Some(token(pos + len, self.skip(pos + len), None))
      }
      RuleKind::NonTerminal(RuleItem::Embedded { goal, .. }) => {
        let embedded = self.parser.embedded_parser(rule)?;
        let (end, tree) = embedded.parse_prefix(*goal, self.text, pos)?;
        if end == pos {
          return None;
        }
        Some(token(end, self.skip(end), Some(Arc::new(tree))))
      }
      _ => panic!("{} is not terminal-like", self.rules().name(rule)),
    }
  }

  /// Returns true if the terminal could be shifted at `pos`.
  pub fn matches(&self, rule: RuleId, pos: usize) -> bool {
    self.match_at(rule, pos).is_some()
  }

  /// Returns true if some member of a resolved lookahead set matches at
  /// `pos`.
  pub fn matches_any(&self, set: &LookaheadSet, pos: usize) -> bool {
    set.iter().any(|sym| match sym {
      LookaheadSymbol::Any => true,
      LookaheadSymbol::Terminal(t) => self.matches(*t, pos),
      LookaheadSymbol::Runtime => {
        panic!("lookahead must be resolved before it is matched")
      }
    })
  }
}
