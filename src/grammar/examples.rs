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

//! Example rule sets, shared by tests and demos.

use super::{build, Associativity, ChoiceKind, ItemRef, RuleSet};

/// `S = 'a' | 'b' | 'c'`
pub fn make_abc() -> RuleSet {
  build(|b| {
    b.add_choice("S", ChoiceKind::Ambiguous, |cb| {
      cb.add_option(|ob| {
        ob.add_literal("a");
      })
      .add_option(|ob| {
        ob.add_literal("b");
      })
      .add_option(|ob| {
        ob.add_literal("c");
      });
    });
  })
  .unwrap()
}

/// A rule set where most rules derive the empty string.
pub fn make_nullable() -> RuleSet {
  build(|b| {
    b.add_concatenation("S", |ib| {
      ib.add_ref("A").add_ref("B");
    })
    .add_multi("A", 0, None, ItemRef::literal("a"))
    .add_choice("B", ChoiceKind::Ambiguous, |cb| {
      cb.add_option(|ob| {
        ob.add_ref("Opt");
      })
      .add_option(|ob| {
        ob.add_literal("c");
      });
    })
    .add_choice("Opt", ChoiceKind::Ambiguous, |cb| {
      cb.add_option(|ob| {
        ob.add_literal("b");
      })
      .add_option(|_| {});
    })
    .add_separated_list(
      "Plus",
      1,
      None,
      ItemRef::literal("a"),
      ItemRef::literal(","),
    )
    .add_multi("Twice", 2, Some(2), ItemRef::rule("Opt"));
  })
  .unwrap()
}

/// `S = 'a' | S 'a'`
pub fn make_left_recursive() -> RuleSet {
  build(|b| {
    b.add_choice("S", ChoiceKind::Ambiguous, |cb| {
      cb.add_option(|ob| {
        ob.add_literal("a");
      })
      .add_option(|ob| {
        ob.add_ref("S").add_literal("a");
      });
    });
  })
  .unwrap()
}

/// `S = 'a' | 'a' S`
pub fn make_right_recursive() -> RuleSet {
  build(|b| {
    b.add_choice("S", ChoiceKind::Ambiguous, |cb| {
      cb.add_option(|ob| {
        ob.add_literal("a");
      })
      .add_option(|ob| {
        ob.add_literal("a").add_ref("S");
      });
    });
  })
  .unwrap()
}

/// `S = S S S | S S | 'a'`
pub fn make_ambiguous() -> RuleSet {
  build(|b| {
    b.add_choice("S", ChoiceKind::Ambiguous, |cb| {
      cb.add_option(|ob| {
        ob.add_ref("S").add_ref("S").add_ref("S");
      })
      .add_option(|ob| {
        ob.add_ref("S").add_ref("S");
      })
      .add_option(|ob| {
        ob.add_literal("a");
      });
    });
  })
  .unwrap()
}

/// `E = 'v' | 't' E | 't' E 's' E`, a dangling-else shaped grammar.
pub fn make_tvsv(kind: ChoiceKind) -> RuleSet {
  build(|b| {
    b.add_choice("E", kind, |cb| {
      cb.add_option(|ob| {
        ob.add_literal("v");
      })
      .add_option(|ob| {
        ob.add_literal("t").add_ref("E");
      })
      .add_option(|ob| {
        ob.add_literal("t").add_ref("E").add_literal("s").add_ref("E");
      });
    });
  })
  .unwrap()
}

/// `S = 'a' 'b' 'c' | X 'c'` with `X = 'a' 'b'`.
pub fn make_split(kind: ChoiceKind) -> RuleSet {
  build(|b| {
    b.add_choice("S", kind, |cb| {
      cb.add_option(|ob| {
        ob.add_literal("a").add_literal("b").add_literal("c");
      })
      .add_option(|ob| {
        ob.add_ref("X").add_literal("c");
      });
    })
    .add_concatenation("X", |ib| {
      ib.add_literal("a").add_literal("b");
    });
  })
  .unwrap()
}

/// `A = ['a' / ',']+`
pub fn make_separated() -> RuleSet {
  build(|b| {
    b.add_separated_list(
      "A",
      1,
      None,
      ItemRef::literal("a"),
      ItemRef::literal(","),
    );
  })
  .unwrap()
}

/// Statements with an optional else, resolved by binding each else to the
/// nearest if.
pub fn make_dangling_else() -> RuleSet {
  build(|b| {
    b.add_choice("S", ChoiceKind::Ambiguous, |cb| {
      cb.add_option(|ob| {
        ob.add_ref("If");
      })
      .add_option(|ob| {
        ob.add_ref("ID");
      });
    })
    .add_choice("If", ChoiceKind::Ambiguous, |cb| {
      cb.add_option(|ob| {
        ob.add_literal("if").add_ref("ID").add_literal("then").add_ref("S");
      })
      .add_option(|ob| {
        ob.add_literal("if")
          .add_ref("ID")
          .add_literal("then")
          .add_ref("S")
          .add_literal("else")
          .add_ref("S");
      });
    })
    .add_pattern_rule("ID", "[a-z]+")
    .add_skip_pattern("WS", "\\s+")
    .add_preference("If", |pb| {
      pb.add_option(
        "If",
        0,
        vec![ItemRef::literal("else")],
        Associativity::Right,
      );
    });
  })
  .unwrap()
}

/// Binary expressions where `*` binds tighter than `+`, both left
/// associative.
pub fn make_expressions() -> RuleSet {
  build(|b| {
    b.add_choice("E", ChoiceKind::Ambiguous, |cb| {
      cb.add_option(|ob| {
        ob.add_ref("E").add_literal("+").add_ref("E");
      })
      .add_option(|ob| {
        ob.add_ref("E").add_literal("*").add_ref("E");
      })
      .add_option(|ob| {
        ob.add_ref("NUM");
      });
    })
    .add_pattern_rule("NUM", "[0-9]+")
    .add_skip_pattern("WS", "\\s+")
    .add_preference("E", |pb| {
      pb.add_option(
        "E",
        1,
        vec![ItemRef::literal("*"), ItemRef::literal("+")],
        Associativity::Left,
      )
      .add_option("E", 0, vec![ItemRef::literal("*")], Associativity::Right)
      .add_option("E", 0, vec![ItemRef::literal("+")], Associativity::Left);
    });
  })
  .unwrap()
}
