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

//! A generalized left-corner parsing engine.
//!
//! Rule sets are built with [`grammar::build`] and parsed with a
//! [`Parser`], which explores every viable derivation on a graph-structured
//! stack and returns a shared packed parse tree, or a report of where the
//! input stopped making sense.
//!
//! ```
//! use std::sync::Arc;
//! use corner::{grammar::{build, ChoiceKind}, Parser};
//!
//! let rules = build(|b| {
//!   b.add_choice("S", ChoiceKind::Ambiguous, |cb| {
//!     cb.add_option(|ob| {
//!       ob.add_literal("a");
//!     })
//!     .add_option(|ob| {
//!       ob.add_ref("S").add_literal("a");
//!     });
//!   });
//! })
//! .unwrap();
//!
//! let parser = Parser::new(Arc::new(rules));
//! let tree = parser.parse("aa").unwrap().into_result().unwrap();
//! assert_eq!(tree.to_string(), "S { S { 'a' } 'a' }");
//! ```

#[macro_use]
extern crate derivative;

pub mod automaton;
pub mod disambiguate;
pub mod grammar;
pub mod parsers;
pub mod sppt;
pub mod state;
pub mod utils;

pub use automaton::Automaton;
pub use grammar::{build, RuleId, RuleSet};
pub use parsers::{
  AutomatonKind, InputLocation, ParseFailure, ParseIssue, ParseOptions,
  ParseResult, ParseStats, Parser, ParserError, ParserOptions,
};
pub use sppt::{Sppt, SpptVisitor};
