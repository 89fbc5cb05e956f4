use std::sync::Arc;

use corner::{grammar::examples::make_dangling_else, Parser};

fn main() -> anyhow::Result<()> {
  let parser = Parser::new(Arc::new(make_dangling_else()));
  let automaton = parser.build_for("S")?;

  eprintln!("{}", automaton.render());
  println!("{}", automaton.to_dot()?);
  Ok(())
}
