/// Augment
/// Appends every adjacent pair `a_b` after the unigrams, left to right.
pub fn augment(tokens: Vec<String>) -> Vec<String> {
  let pairs: Vec<String> = tokens
    .windows(2)
    .map(|pair| format!("{}_{}", pair[0], pair[1]))
    .collect();

  let mut augmented: Vec<String> = tokens;
  augmented.extend(pairs);
  augmented
}
