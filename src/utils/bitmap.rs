// Slot occupancy bitmaps. Bit `i` lives in byte `i / 8` at position `i % 8`.

pub const BITMAP_WIDTH: usize = 8;

/// Number of bytes needed to hold `num_bits` bits.
pub fn bytes_for(num_bits: usize) -> usize {
    (num_bits + BITMAP_WIDTH - 1) / BITMAP_WIDTH
}

pub fn init(bitmap: &mut [u8]) {
    bitmap.fill(0);
}

fn bit_mask(pos: usize) -> u8 {
    1 << (pos % BITMAP_WIDTH)
}

pub fn set(bitmap: &mut [u8], pos: usize) {
    bitmap[pos / BITMAP_WIDTH] |= bit_mask(pos);
}

pub fn reset(bitmap: &mut [u8], pos: usize) {
    bitmap[pos / BITMAP_WIDTH] &= !bit_mask(pos);
}

pub fn is_set(bitmap: &[u8], pos: usize) -> bool {
    bitmap[pos / BITMAP_WIDTH] & bit_mask(pos) != 0
}

/// First position in `0..max_n` whose bit equals `bit`.
pub fn first_bit(bit: bool, bitmap: &[u8], max_n: usize) -> Option<usize> {
    (0..max_n).find(|&pos| is_set(bitmap, pos) == bit)
}

/// First position after `curr` (or from 0 when `curr` is `None`) in
/// `0..max_n` whose bit equals `bit`.
pub fn next_bit(bit: bool, bitmap: &[u8], max_n: usize, curr: Option<usize>) -> Option<usize> {
    let start = curr.map_or(0, |pos| pos + 1);
    (start..max_n).find(|&pos| is_set(bitmap, pos) == bit)
}

#[cfg(test)]
pub mod test {
    use super::*;

    #[test]
    fn set_reset_and_search() {
        let mut bitmap = [0u8; 3];
        init(&mut bitmap);

        assert_eq!(bytes_for(20), 3);
        assert_eq!(first_bit(true, &bitmap, 20), None);
        assert_eq!(first_bit(false, &bitmap, 20), Some(0));

        set(&mut bitmap, 0);
        set(&mut bitmap, 9);
        set(&mut bitmap, 19);

        assert!(is_set(&bitmap, 9));
        assert!(!is_set(&bitmap, 8));
        assert_eq!(first_bit(false, &bitmap, 20), Some(1));

        assert_eq!(next_bit(true, &bitmap, 20, None), Some(0));
        assert_eq!(next_bit(true, &bitmap, 20, Some(0)), Some(9));
        assert_eq!(next_bit(true, &bitmap, 20, Some(9)), Some(19));
        assert_eq!(next_bit(true, &bitmap, 20, Some(19)), None);
        // Bits past max_n are never reported.
        assert_eq!(next_bit(true, &bitmap, 19, Some(9)), None);

        reset(&mut bitmap, 9);
        assert!(!is_set(&bitmap, 9));
        assert_eq!(next_bit(true, &bitmap, 20, Some(0)), Some(19));
    }
}
