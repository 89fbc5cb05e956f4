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

//! Failure reports.

use std::collections::BTreeSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::{
  grammar::{RuleId, RuleSet},
  utils::fmt::display_set,
};

/// A location in the sentence. Lines and columns are 1-based, and columns
/// count grapheme clusters.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct InputLocation {
  pub position: usize,
  pub line: usize,
  pub column: usize,
  /// The length in bytes of the grapheme at `position`, zero at the end.
  pub length: usize,
}

impl InputLocation {
  pub fn of(text: &str, position: usize) -> Self {
    let before = &text[..position];
    let line = 1 + before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = 1 + text[line_start..position].graphemes(true).count();
    let length = text[position..]
      .graphemes(true)
      .next()
      .map_or(0, |g| g.len());
    InputLocation {
      position,
      line,
      column,
      length,
    }
  }
}

impl std::fmt::Display for InputLocation {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParseIssue {
  pub location: InputLocation,
  pub message: String,
  /// Names of the terminals that would have been accepted, sorted.
  pub expected_terminals: Vec<String>,
  /// Tags of the rules being parsed when the input was rejected, sorted.
  /// `<GOAL>` stands for the start of the goal rule.
  pub expected_goals: Vec<String>,
}

impl std::fmt::Display for ParseIssue {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "{}: {}", self.location, self.message)
  }
}

/// Collects the rejections at the furthest position reached.
#[derive(Default)]
pub struct Failures {
  position: Option<usize>,
  expected: BTreeSet<RuleId>,
  goals: BTreeSet<String>,
}

impl Failures {
  pub fn new() -> Self {
    Failures::default()
  }

  pub fn record(
    &mut self,
    position: usize,
    expected: impl IntoIterator<Item = RuleId>,
    goal: String,
  ) {
    match self.position {
      Some(furthest) if furthest > position => return,
      Some(furthest) if furthest == position => {}
      _ => {
        self.position = Some(position);
        self.expected.clear();
        self.goals.clear();
      }
    }
    self.expected.extend(expected);
    self.goals.insert(goal);
  }

  /// Turns the failures into a single issue. Without any recorded failure
  /// the issue is placed at `fallback`.
  pub fn into_issue(
    self,
    rules: &RuleSet,
    text: &str,
    fallback: usize,
  ) -> ParseIssue {
    let position = self.position.unwrap_or(fallback);
    let location = InputLocation::of(text, position);

    let mut expected_terminals: Vec<String> = self
      .expected
      .iter()
      .filter(|t| **t != RuleId::EMPTY)
      .map(|t| rules.name(*t).to_string())
      .collect();
    expected_terminals.sort();
    expected_terminals.dedup();
    let expected_goals: Vec<String> = self.goals.into_iter().collect();

    let found = match text[position..].graphemes(true).next() {
      Some(g) => format!("unexpected {:?}", g),
      None => "unexpected end of input".to_string(),
    };
    let message = if self.position.is_none() {
      "no viable parse".to_string()
    } else if expected_terminals.is_empty() {
      found
    } else {
      format!(
        "{}, expected one of {}",
        found,
        display_set(expected_terminals.iter())
      )
    };

    ParseIssue {
      location,
      message,
      expected_terminals,
      expected_goals,
    }
  }
}
