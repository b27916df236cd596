/// Both values of a pair, or nothing when either is missing.
#[inline]
pub fn only_with_values<A, B>(pair: (Option<A>, Option<B>)) -> Option<(A, B)> {
  match pair {
    (Some(a), Some(b)) => Some((a, b)),
    _ => None,
  }
}
