//! Format constants for the FITS block and card layout

/// Length of a single card image
pub const CARD_SIZE: usize = 80;

/// Length of a physical block
pub const BLOCK_SIZE: usize = 2880;

/// Cards held by one physical block
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Width of the keyword field
pub const KEYWORD_LEN: usize = 8;

/// Columns available for a value after the `= ` indicator
pub const MAX_VALUE_LEN: usize = 70;

/// Longest escaped string that fits between the quotes
pub const MAX_STRING_LEN: usize = MAX_VALUE_LEN - 2;

/// Longest escaped fragment of a long string, leaving room for `&`
pub const LONG_STRING_CHUNK: usize = MAX_STRING_LEN - 1;

/// Column of the closing quote for short strings
pub const STRING_MIN_END: usize = 19;

/// Column where right-justified scalar values end
pub const FIXED_VALUE_END: usize = 30;

/// Width of a right-justified scalar field
pub const NUMBER_WIDTH: usize = 20;

/// Initial heap capacity on first growth
pub const MIN_HEAP_CAPACITY: usize = 16384;

/// Padding byte for header blocks
pub const HEADER_FILL: u8 = b' ';

/// Padding byte for data and heap blocks
pub const DATA_FILL: u8 = 0;

/// Bytes needed to pad `size` up to a whole number of blocks
pub const fn padding_for(size: u64) -> u64 {
    let rem = size % BLOCK_SIZE as u64;
    if rem == 0 {
        0
    } else {
        BLOCK_SIZE as u64 - rem
    }
}

/// `size` rounded up to a whole number of blocks
pub const fn padded_size(size: u64) -> u64 {
    size + padding_for(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_arithmetic() {
        assert_eq!(CARDS_PER_BLOCK, 36);
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(80), 2800);
        assert_eq!(padded_size(2880), 2880);
        assert_eq!(padded_size(2881), 5760);
    }
}
