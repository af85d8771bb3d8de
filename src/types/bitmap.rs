//! Fixed-capacity bit vector, one bit per switch port.
//!
//! ## Layout
//!
//! Bits live in `WORDS` little-endian `u64` words; bit `i` is bit `i % 64` of
//! word `i / 64`. Every position in `0..CAPACITY` is addressable; touching a
//! position at or beyond `CAPACITY` is a caller bug and panics.
//!
//! ## Text Format
//!
//! Bitmaps round-trip through a one-character-per-bit ASCII form used in
//! trace snapshots:
//!
//! ```text
//! 0110\n
//! ```
//!
//! `to_text(n)` emits exactly `n` characters followed by a newline.
//! `parse` reads up to the first space or newline; any character other than
//! `'0'` or `'1'` before that point is a [`CodecError`].
//!
//! ## Example
//!
//! ```
//! use crossbar_match::types::Bitmap;
//!
//! let mut b = Bitmap::new();
//! b.set_bit(1);
//! b.set_bit(2);
//!
//! assert_eq!(b.to_text(4), "0110\n");
//! assert_eq!(Bitmap::parse("0110\n").unwrap(), b);
//! assert_eq!(b.pop_count(), 2);
//! ```

use std::fmt;
use std::sync::OnceLock;

use rand::Rng;

use crate::types::error::CodecError;

/// Number of addressable bit positions (and the largest supported port count).
pub const CAPACITY: usize = 256;

const WORD_BITS: usize = u64::BITS as usize;
const WORDS: usize = CAPACITY / WORD_BITS;

/// Set-bit counts for every byte value, built on first use.
static POP_TABLE: OnceLock<[u8; 256]> = OnceLock::new();

fn pop_table() -> &'static [u8; 256] {
    POP_TABLE.get_or_init(|| {
        let mut table = [0u8; 256];
        for value in 1..256 {
            table[value] = table[value >> 1] + (value & 1) as u8;
        }
        table
    })
}

/// A fixed-capacity ordered set of bit positions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bitmap {
    words: [u64; WORDS],
}

impl Bitmap {
    /// Create an empty bitmap.
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Create a bitmap with the given positions set.
    ///
    /// # Panics
    ///
    /// Panics if any index is `>= CAPACITY`.
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let mut b = Self::new();
        for i in indices {
            b.set_bit(i);
        }
        b
    }

    /// Create a bitmap with positions `0..num_bits` set.
    ///
    /// # Panics
    ///
    /// Panics if `num_bits > CAPACITY`.
    pub fn full(num_bits: usize) -> Self {
        assert!(num_bits <= CAPACITY, "bitmap length {num_bits} exceeds capacity {CAPACITY}");
        Self::from_indices(0..num_bits)
    }

    #[inline]
    fn locate(index: usize) -> (usize, u64) {
        assert!(index < CAPACITY, "bit index {index} out of range 0..{CAPACITY}");
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }

    /// Clear every bit.
    #[inline]
    pub fn reset(&mut self) {
        self.words = [0; WORDS];
    }

    /// Set bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= CAPACITY`.
    #[inline]
    pub fn set_bit(&mut self, index: usize) {
        let (word, mask) = Self::locate(index);
        self.words[word] |= mask;
    }

    /// Clear bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= CAPACITY`.
    #[inline]
    pub fn clear_bit(&mut self, index: usize) {
        let (word, mask) = Self::locate(index);
        self.words[word] &= !mask;
    }

    /// Test bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= CAPACITY`.
    #[inline]
    pub fn test_bit(&self, index: usize) -> bool {
        let (word, mask) = Self::locate(index);
        self.words[word] & mask != 0
    }

    /// True if at least one bit is set.
    #[inline]
    pub fn any_bit_set(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    /// Number of set bits, counted a byte at a time through a shared table.
    pub fn pop_count(&self) -> usize {
        let table = pop_table();
        self.words
            .iter()
            .flat_map(|w| w.to_le_bytes())
            .map(|byte| table[byte as usize] as usize)
            .sum()
    }

    /// Overwrite positions `0..num_bits` with independent fair coin flips.
    ///
    /// Positions at or beyond `num_bits` are left as they were. The same
    /// generator state always produces the same fill.
    ///
    /// # Panics
    ///
    /// Panics if `num_bits > CAPACITY`.
    ///
    /// # Example
    ///
    /// ```
    /// use crossbar_match::types::Bitmap;
    /// use rand::SeedableRng;
    /// use rand_chacha::ChaCha8Rng;
    ///
    /// let mut a = Bitmap::new();
    /// let mut b = Bitmap::new();
    /// a.random_fill(&mut ChaCha8Rng::seed_from_u64(7), 32);
    /// b.random_fill(&mut ChaCha8Rng::seed_from_u64(7), 32);
    /// assert_eq!(a, b);
    /// ```
    pub fn random_fill<R: Rng + ?Sized>(&mut self, rng: &mut R, num_bits: usize) {
        assert!(num_bits <= CAPACITY, "bitmap length {num_bits} exceeds capacity {CAPACITY}");
        for i in 0..num_bits {
            if rng.gen::<bool>() {
                self.set_bit(i);
            } else {
                self.clear_bit(i);
            }
        }
    }

    // ========================================================================
    // Set Operations
    // ========================================================================

    /// Positions set in both `self` and `other`.
    pub fn and(&self, other: &Bitmap) -> Bitmap {
        let mut out = *self;
        for (w, o) in out.words.iter_mut().zip(other.words.iter()) {
            *w &= *o;
        }
        out
    }

    /// Positions set in `self` but not in `other`.
    pub fn and_not(&self, other: &Bitmap) -> Bitmap {
        let mut out = *self;
        for (w, o) in out.words.iter_mut().zip(other.words.iter()) {
            *w &= !*o;
        }
        out
    }

    /// Positions set in either bitmap.
    pub fn or(&self, other: &Bitmap) -> Bitmap {
        let mut out = *self;
        for (w, o) in out.words.iter_mut().zip(other.words.iter()) {
            *w |= *o;
        }
        out
    }

    /// Iterate set positions in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(wi * WORD_BITS + bit)
            })
        })
    }

    /// First set position in `0..len`, scanning circularly from `start`.
    ///
    /// This is the rotating-priority search: positions `start, start+1, ...,
    /// len-1, 0, ..., start-1` are tried in that order.
    ///
    /// # Example
    ///
    /// ```
    /// use crossbar_match::types::Bitmap;
    ///
    /// let b = Bitmap::from_indices([0, 2]);
    /// assert_eq!(b.next_set_circular(1, 4), Some(2));
    /// assert_eq!(b.next_set_circular(3, 4), Some(0));
    /// ```
    pub fn next_set_circular(&self, start: usize, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let start = start % len;
        (start..len)
            .chain(0..start)
            .find(|&i| self.test_bit(i))
    }

    // ========================================================================
    // Text Codec
    // ========================================================================

    /// Write `num_bits` characters of `'0'`/`'1'` followed by a newline.
    ///
    /// # Panics
    ///
    /// Panics if `num_bits > CAPACITY`.
    pub fn write_text<W: fmt::Write>(&self, out: &mut W, num_bits: usize) -> fmt::Result {
        assert!(num_bits <= CAPACITY, "bitmap length {num_bits} exceeds capacity {CAPACITY}");
        for i in 0..num_bits {
            out.write_char(if self.test_bit(i) { '1' } else { '0' })?;
        }
        out.write_char('\n')
    }

    /// Render the first `num_bits` positions in the text format.
    ///
    /// # Panics
    ///
    /// Panics if `num_bits > CAPACITY`.
    pub fn to_text(&self, num_bits: usize) -> String {
        let mut s = String::with_capacity(num_bits + 1);
        self.write_text(&mut s, num_bits)
            .expect("writing to a String cannot fail");
        s
    }

    /// Decode the text format, returning the bitmap and the number of bit
    /// characters consumed.
    ///
    /// Decoding stops at the first space or newline, or at end of input.
    pub fn decode(text: &str) -> Result<(Bitmap, usize), CodecError> {
        let mut b = Bitmap::new();
        let mut len = 0;
        for (position, ch) in text.chars().enumerate() {
            match ch {
                ' ' | '\n' => break,
                '0' | '1' => {
                    if len == CAPACITY {
                        return Err(CodecError::TooLong { len: len + 1, capacity: CAPACITY });
                    }
                    if ch == '1' {
                        b.set_bit(len);
                    }
                    len += 1;
                }
                found => return Err(CodecError::InvalidChar { found, position }),
            }
        }
        Ok((b, len))
    }

    /// Decode the text format, discarding the length.
    pub fn parse(text: &str) -> Result<Bitmap, CodecError> {
        Self::decode(text).map(|(b, _)| b)
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

impl fmt::Display for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (n, i) in self.iter_ones().enumerate() {
            if n > 0 {
                write!(f, ",")?;
            }
            write!(f, "{i}")?;
        }
        write!(f, "}}")
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_pop_table_matches_count_ones() {
        let table = pop_table();
        for v in 0..256usize {
            assert_eq!(table[v] as u32, (v as u8).count_ones(), "entry {v}");
        }
    }

    #[test]
    fn test_set_clear_test() {
        let mut b = Bitmap::new();
        assert!(!b.any_bit_set());

        b.set_bit(0);
        b.set_bit(63);
        b.set_bit(64);
        b.set_bit(CAPACITY - 1);
        assert!(b.test_bit(0));
        assert!(b.test_bit(63));
        assert!(b.test_bit(64));
        assert!(b.test_bit(CAPACITY - 1));
        assert!(!b.test_bit(1));
        assert_eq!(b.pop_count(), 4);

        b.clear_bit(63);
        assert!(!b.test_bit(63));
        assert_eq!(b.pop_count(), 3);

        b.reset();
        assert!(!b.any_bit_set());
        assert_eq!(b.pop_count(), 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_set_out_of_range_panics() {
        let mut b = Bitmap::new();
        b.set_bit(CAPACITY);
    }

    #[test]
    fn test_iter_ones_ascending() {
        let b = Bitmap::from_indices([130, 2, 64, 7]);
        let ones: Vec<usize> = b.iter_ones().collect();
        assert_eq!(ones, vec![2, 7, 64, 130]);
    }

    #[test]
    fn test_next_set_circular() {
        let b = Bitmap::from_indices([1, 3]);
        assert_eq!(b.next_set_circular(0, 4), Some(1));
        assert_eq!(b.next_set_circular(1, 4), Some(1));
        assert_eq!(b.next_set_circular(2, 4), Some(3));
        assert_eq!(b.next_set_circular(4, 4), Some(1)); // wraps via modulo
        assert_eq!(Bitmap::new().next_set_circular(0, 4), None);
        // bits beyond len are ignored
        assert_eq!(Bitmap::from_indices([5]).next_set_circular(0, 4), None);
    }

    #[test]
    fn test_set_operations() {
        let a = Bitmap::from_indices([0, 1, 2]);
        let b = Bitmap::from_indices([1, 2, 3]);
        assert_eq!(a.and(&b), Bitmap::from_indices([1, 2]));
        assert_eq!(a.and_not(&b), Bitmap::from_indices([0]));
        assert_eq!(a.or(&b), Bitmap::from_indices([0, 1, 2, 3]));
        assert_eq!(Bitmap::full(3), a);
    }

    #[test]
    fn test_text_print() {
        let b = Bitmap::from_indices([0, 3]);
        assert_eq!(b.to_text(5), "10010\n");
        assert_eq!(b.to_text(0), "\n");
    }

    #[test]
    fn test_text_print_full_capacity() {
        let text = Bitmap::full(CAPACITY).to_text(CAPACITY);
        assert_eq!(text.len(), CAPACITY + 1);
        assert!(text.trim_end().chars().all(|c| c == '1'));
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn test_text_print_over_capacity_panics() {
        Bitmap::new().to_text(CAPACITY + 1);
    }

    #[test]
    fn test_text_parse_terminators() {
        let (b, len) = Bitmap::decode("101 trailing").unwrap();
        assert_eq!(len, 3);
        assert_eq!(b, Bitmap::from_indices([0, 2]));

        let (b, len) = Bitmap::decode("0011\nnext").unwrap();
        assert_eq!(len, 4);
        assert_eq!(b, Bitmap::from_indices([2, 3]));

        let (b, len) = Bitmap::decode("").unwrap();
        assert_eq!(len, 0);
        assert!(!b.any_bit_set());
    }

    #[test]
    fn test_text_parse_invalid_char() {
        assert_eq!(
            Bitmap::parse("01x1\n"),
            Err(CodecError::InvalidChar { found: 'x', position: 2 })
        );
        assert!(Bitmap::parse("01\t1").is_err());
    }

    #[test]
    fn test_text_parse_too_long() {
        let text = "1".repeat(CAPACITY + 1);
        assert!(matches!(Bitmap::parse(&text), Err(CodecError::TooLong { .. })));
        assert_eq!(Bitmap::parse(&"1".repeat(CAPACITY)).unwrap(), Bitmap::full(CAPACITY));
    }

    #[test]
    fn test_random_fill_is_seeded() {
        let mut a = Bitmap::new();
        let mut b = Bitmap::new();
        a.random_fill(&mut ChaCha8Rng::seed_from_u64(42), 200);
        b.random_fill(&mut ChaCha8Rng::seed_from_u64(42), 200);
        assert_eq!(a, b);

        let mut c = Bitmap::new();
        c.random_fill(&mut ChaCha8Rng::seed_from_u64(43), 200);
        assert_ne!(a, c);
    }

    #[test]
    fn test_random_fill_leaves_tail_alone() {
        let mut b = Bitmap::from_indices([100]);
        b.random_fill(&mut ChaCha8Rng::seed_from_u64(1), 16);
        assert!(b.test_bit(100));
        assert!(b.iter_ones().all(|i| i < 16 || i == 100));
    }

    #[test]
    fn test_round_trip_and_pop_count_agree() {
        let mut rng = ChaCha8Rng::seed_from_u64(2024);
        for len in [0usize, 1, 7, 8, 63, 64, 65, 200, CAPACITY] {
            let mut b = Bitmap::new();
            b.random_fill(&mut rng, len);
            let text = b.to_text(len);
            assert_eq!(Bitmap::parse(&text).unwrap(), b, "round trip at len {len}");
            assert_eq!(b.pop_count(), text.chars().filter(|&c| c == '1').count());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Bitmap::from_indices([1, 4]).to_string(), "{1,4}");
        assert_eq!(Bitmap::new().to_string(), "{}");
    }
}
