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

use regex::Regex;

/// A regular expression terminal, matched at a fixed offset of the input.
#[derive(Derivative)]
#[derivative(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
  source: String,
  #[derivative(Debug = "ignore", PartialEq = "ignore")]
  regex: Regex,
}

impl Pattern {
  /// Compiles a pattern. The pattern is anchored so that it only matches at
  /// the start of the text it is given.
  pub fn new(source: &str) -> Result<Self, regex::Error> {
    let regex = Regex::new(&format!("^(?:{})", source))?;
    Ok(Pattern {
      source: source.to_string(),
      regex,
    })
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  /// Returns the length of the longest non-empty match at the start of
  /// `text`.
  pub fn match_len(&self, text: &str) -> Option<usize> {
    self
      .regex
      .find(text)
      .map(|m| m.end())
      .filter(|len| *len > 0)
  }
}

/// The kinds of terminal rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminal {
  /// A literal string.
  Literal(String),
  /// A regular expression.
  Pattern(Pattern),
  /// Matches the empty string at any offset without consuming skip text.
  Empty,
  /// Matches only at the end of the input.
  EndOfText,
}

impl Terminal {
  /// Returns the length of the match of this terminal at the start of
  /// `text`. `Empty` and `EndOfText` are handled by the scanner, since they
  /// depend on the offset rather than the text.
  pub fn match_len(&self, text: &str) -> Option<usize> {
    match self {
      Terminal::Literal(lit) => {
        if text.starts_with(lit.as_str()) {
          Some(lit.len())
        } else {
          None
        }
      }
      Terminal::Pattern(pattern) => pattern.match_len(text),
      Terminal::Empty => Some(0),
      Terminal::EndOfText => {
        if text.is_empty() {
          Some(0)
        } else {
          None
        }
      }
    }
  }

  /// The tag used for anonymous terminals and in failure reports.
  pub fn tag(&self) -> String {
    match self {
      Terminal::Literal(lit) => format!("'{}'", lit),
      Terminal::Pattern(pattern) => format!("\"{}\"", pattern.source()),
      Terminal::Empty => "<EMPTY>".to_string(),
      Terminal::EndOfText => "<EOT>".to_string(),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_pattern_is_anchored() {
    let p = Pattern::new("[0-9]+").unwrap();
    assert_eq!(p.match_len("123abc"), Some(3));
    assert_eq!(p.match_len("abc123"), None);
  }

  #[test]
  fn test_empty_pattern_match_is_no_match() {
    let p = Pattern::new("[0-9]*").unwrap();
    assert_eq!(p.match_len("abc"), None);
    assert_eq!(p.match_len("1abc"), Some(1));
  }

  #[test]
  fn test_alternation_is_grouped() {
    let p = Pattern::new("a|b").unwrap();
    assert_eq!(p.match_len("ba"), Some(1));
    assert_eq!(p.match_len("ca"), None);
  }

  #[test]
  fn test_tags() {
    assert_eq!(Terminal::Literal("if".into()).tag(), "'if'");
    assert_eq!(
      Terminal::Pattern(Pattern::new("[a-z]+").unwrap()).tag(),
      "\"[a-z]+\""
    );
    assert_eq!(Terminal::EndOfText.tag(), "<EOT>");
  }
}
