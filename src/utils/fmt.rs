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

//! Helper functions for formatting collections.

use std::fmt::{Display, Formatter, Result};

#[derive(Clone)]
struct DisplaySetFormatted<C>(C);

impl<C: IntoIterator + Clone> Display for DisplaySetFormatted<C>
where
  C::Item: Display,
{
  fn fmt(&self, fmt: &mut Formatter) -> Result {
    fmt.write_str("{")?;
    for (i, item) in self.0.clone().into_iter().enumerate() {
      if i > 0 {
        fmt.write_str(", ")?;
      }
      Display::fmt(&item, fmt)?;
    }
    fmt.write_str("}")
  }
}

/// Formats the items as a brace-delimited set using their `Display`
/// implementations.
pub fn display_set<C>(items: C) -> impl Display
where
  C: IntoIterator + Clone,
  C::Item: Display,
{
  DisplaySetFormatted(items)
}
