use std::sync::Arc;

use corner::{grammar::examples::make_expressions, Parser};

fn main() -> anyhow::Result<()> {
  let parser = Parser::new(Arc::new(make_expressions()));

  for sentence in ["1 + 2 * 3", "1 * 2 + 3 * 4", "1 + + 2"] {
    let result = parser.parse(sentence)?;
    eprintln!("Stats: {:?}", result.stats());
    match result.into_result() {
      Ok(tree) => println!("{:?} => {}", sentence, tree),
      Err(failure) => println!("{:?} failed at {}", sentence, failure),
    }
  }

  Ok(())
}
