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

//! A pass is a type of query over the rule set that may be depended on by
//! other passes. This allows us to build each different type of pass in
//! isolation, and then combine them with automatic dependency resolution.

pub mod firsts;
pub mod nullable;
pub mod productive;

use std::{
  any::{Any, TypeId},
  cell::RefCell,
  collections::BTreeMap,
  rc::Rc,
};

use super::{Analysis, RuleSet};

/// A unique placeholder type to represent the value of a pass that hasn't
/// completed.
///
/// This helps us avoid accidental infinite recursion in the case where a pass
/// depends on itself (directly or indirectly).
struct NoCurrentValue;

pub trait Pass: Any + Sized + 'static {
  fn run_pass(pass_map: &PassContext) -> Self;
}

/// A map from passes to their associated results.
pub struct PassContext<'a> {
  rules: &'a RuleSet,
  passes: RefCell<BTreeMap<TypeId, Rc<dyn Any + 'static>>>,
}

impl<'a> PassContext<'a> {
  /// Create a new pass map, where passes derive from the given rule set and
  /// other passes.
  pub fn new(rules: &'a RuleSet) -> Self {
    PassContext {
      rules,
      passes: RefCell::new(BTreeMap::new()),
    }
  }

  /// Returns the underlying rule set.
  pub fn rules(&self) -> &'a RuleSet {
    self.rules
  }

  /// Returns the result of the given pass. Computes it if it hasn't been
  /// computed yet. Passes can depend on other passes.
  pub fn get_pass<P: Pass>(&self) -> Rc<P> {
    let pass_type = TypeId::of::<P>();

    let contains_key = {
      let guard = self.passes.borrow();
      match guard.get(&pass_type) {
        Some(pass) => {
          if pass.downcast_ref::<NoCurrentValue>().is_some() {
            panic!("Detected recursive loop in pass dependencies.")
          }
          true
        }
        None => false,
      }
    };

    if !contains_key {
      {
        // Mark the pass as in process.
        let mut guard = self.passes.borrow_mut();
        guard.insert(pass_type, Rc::new(NoCurrentValue));
      }
      let value = P::run_pass(self);
      let mut guard = self.passes.borrow_mut();
      guard.insert(pass_type, Rc::new(value));
    }

    let any_pass_ref = {
      let guard = self.passes.borrow();
      guard
        .get(&pass_type)
        .expect("existence already checked")
        .clone()
    };

    any_pass_ref
      .downcast::<P>()
      .unwrap_or_else(|_| panic!("type already verified"))
  }
}

/// Runs every pass the parser depends on.
pub fn analyse(rules: &RuleSet) -> Analysis {
  let pass_map = PassContext::new(rules);
  let nullable = pass_map.get_pass::<nullable::Nullable>();
  let firsts = pass_map.get_pass::<firsts::Firsts>();
  let productive = pass_map.get_pass::<productive::Productive>();

  for rule in rules.rules() {
    if rule.as_item().is_some() && !productive.is_productive(rule.id()) {
      log::warn!("rule {} cannot derive any finite input", rule.name());
    }
  }

  Analysis {
    nullable: nullable.nullable_set().clone(),
    firsts: firsts.first_sets().clone(),
    productive: productive.productive_set().clone(),
  }
}
