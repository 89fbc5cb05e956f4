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

use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::sync::Arc;

pub mod fmt;

pub trait ToDoc {
  fn to_doc<'a, DA: pretty::DocAllocator<'a>>(
    &self,
    da: &'a DA,
  ) -> pretty::DocBuilder<'a, DA, ()>
  where
    DA::Doc: Clone;
}

/// Renders a `ToDoc` value into a string, wrapped at the given width.
pub fn to_pretty_string(value: &impl ToDoc, width: usize) -> String {
  let arena = pretty::Arena::new();
  format!("{}", value.to_doc(&arena).into_doc().pretty(width))
}

/// A refcounted name type, used to avoid duplicating rule names throughout
/// rule sets, automata and parse trees.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(Arc<String>);

impl Name {
  /// Creates a new Name containing the given string.
  pub fn new(s: &(impl AsRef<str> + ?Sized)) -> Self {
    Name(Arc::new(s.as_ref().to_string()))
  }

  /// Returns a reference to the internal ref.
  pub fn str(&self) -> &str {
    &self.0
  }
}

impl AsRef<str> for Name {
  fn as_ref(&self) -> &str {
    self.str()
  }
}

impl std::fmt::Debug for Name {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    fmt.write_str(&self.0)
  }
}

impl std::fmt::Display for Name {
  fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
    fmt.write_str(&self.0)
  }
}

impl ToDoc for Name {
  fn to_doc<'a, DA: pretty::DocAllocator<'a>>(
    &self,
    da: &'a DA,
  ) -> pretty::DocBuilder<'a, DA>
  where
    DA::Doc: Clone,
  {
    da.text(self.str().to_string())
  }
}

pub fn breadth_first_search<T, InitI, StepI, F>(
  initial: InitI,
  mut f: F,
) -> BTreeSet<T>
where
  T: Ord + Clone,
  InitI: IntoIterator<Item = T>,
  StepI: IntoIterator<Item = T>,
  F: FnMut(&T) -> StepI,
{
  let mut next_set = BTreeSet::new();
  let mut curr_set: BTreeSet<_> = initial.into_iter().collect();
  let mut seen_set = curr_set.clone();

  while !curr_set.is_empty() {
    for next_item in &curr_set {
      for step_item in f(next_item) {
        if !seen_set.contains(&step_item) {
          next_set.insert(step_item.clone());
          seen_set.insert(step_item);
        }
      }
    }

    std::mem::swap(&mut curr_set, &mut next_set);
    next_set.clear();
  }

  seen_set
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum WasChanged {
  Changed,
  Unchanged,
}

impl WasChanged {
  pub fn from_changed(changed: bool) -> Self {
    if changed {
      WasChanged::Changed
    } else {
      WasChanged::Unchanged
    }
  }

  pub fn join(self, other: Self) -> Self {
    match (self, other) {
      (WasChanged::Changed, _) | (_, WasChanged::Changed) => {
        WasChanged::Changed
      }
      _ => WasChanged::Unchanged,
    }
  }

  pub fn merge(&mut self, other: Self) {
    *self = self.join(other);
  }

  pub fn is_changed(self) -> bool {
    matches!(self, WasChanged::Changed)
  }
}

pub fn change_loop<F>(mut func: F)
where
  F: FnMut() -> WasChanged,
{
  while let WasChanged::Changed = func() {}
}

pub fn change_iter<I, F>(iter: I, mut func: F) -> WasChanged
where
  I: Iterator,
  F: FnMut(I::Item) -> WasChanged,
{
  let mut changed = WasChanged::Unchanged;
  for item in iter {
    changed = changed.join(func(item));
  }

  changed
}

pub struct CollectMap<K, V>(BTreeMap<K, BTreeSet<V>>);

impl<K, V> CollectMap<K, V>
where
  K: Ord,
  V: Ord,
{
  pub fn new() -> Self {
    CollectMap(BTreeMap::new())
  }

  pub fn get(&self, key: &K) -> Option<&BTreeSet<V>> {
    self.0.get(key)
  }

  pub fn insert(&mut self, key: K, value: V) -> WasChanged {
    match self.0.entry(key) {
      btree_map::Entry::Occupied(mut occ) => {
        WasChanged::from_changed(occ.get_mut().insert(value))
      }
      btree_map::Entry::Vacant(vac) => {
        let mut new_set = BTreeSet::new();
        new_set.insert(value);
        vac.insert(new_set);
        WasChanged::Changed
      }
    }
  }

  pub fn insert_from_key_set(&mut self, key: K, src_key: &K) -> WasChanged
  where
    V: Clone,
  {
    if &key == src_key {
      return WasChanged::Unchanged;
    }

    let src_values: Vec<V> = match self.0.get(src_key) {
      Some(src_set) => src_set.iter().cloned().collect(),
      None => return WasChanged::Unchanged,
    };

    let set = self.0.entry(key).or_insert_with(BTreeSet::new);
    change_iter(src_values.into_iter(), |src_value| {
      WasChanged::from_changed(set.insert(src_value))
    })
  }

  pub fn into_inner(self) -> BTreeMap<K, BTreeSet<V>> {
    self.0
  }
}

impl<K: Ord, V: Ord> Default for CollectMap<K, V> {
  fn default() -> Self {
    CollectMap::new()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_breadth_first_search_includes_initial() {
    let seen = breadth_first_search(vec![1u32], |n| {
      if *n < 5 {
        vec![n + 1]
      } else {
        vec![]
      }
    });
    assert_eq!(seen, (1..=5).collect());
  }

  #[test]
  fn test_collect_map_copies_sets() {
    let mut map = CollectMap::new();
    assert_eq!(map.insert("a", 1), WasChanged::Changed);
    assert_eq!(map.insert("a", 1), WasChanged::Unchanged);
    assert_eq!(map.insert_from_key_set("b", &"a"), WasChanged::Changed);
    assert_eq!(map.insert_from_key_set("b", &"a"), WasChanged::Unchanged);
    assert!(map.get(&"b").unwrap().contains(&1));
  }
}
