use std::mem;

/// Machine word size. Every request is rounded up to a multiple of this so
/// that headers carved after a payload stay naturally aligned.
pub const WORD: usize = mem::size_of::<usize>();

/// Rounds `value` up to the next multiple of [`WORD`].
///
/// Returns `None` when the rounded value does not fit in a `usize`.
///
/// # Examples
///
/// ```rust
/// use flalloc::align::align_word;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align_word(13), Some(16)), // 64 bit machine.
///     4 => assert_eq!(align_word(11), Some(12)), // 32 bit machine.
///     _ => {},
/// };
/// assert_eq!(align_word(usize::MAX), None);
/// ```
pub const fn align_word(value: usize) -> Option<usize> {
  match value.checked_add(WORD - 1) {
    Some(bumped) => Some(bumped & !(WORD - 1)),
    None => None,
  }
}
