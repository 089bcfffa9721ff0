//! Static palette for split colors. Values are CSS hex strings so the
//! frontend can apply them directly.

pub const PALETTE_SIZE: usize = 10;

pub const PALETTE: [&str; PALETTE_SIZE] = [
    "#2D95CA",
    "#E4A83A",
    "#D36FA4",
    "#66CC86",
    "#8476B2",
    "#E48353",
    "#E09BDB",
    "#45A860",
    "#B7BB53",
    "#B8698C",
];

/// Returns the CSS color string bound to a slot, if the slot exists.
#[inline]
pub fn color_at(index: usize) -> Option<&'static str> {
    PALETTE.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_at_returns_tokens_in_palette_order() {
        assert_eq!(color_at(0), Some("#2D95CA"));
        assert_eq!(color_at(1), Some("#E4A83A"));
        assert_eq!(color_at(9), Some("#B8698C"));
    }

    #[test]
    fn color_at_out_of_range_is_none() {
        assert_eq!(color_at(PALETTE_SIZE), None);
    }
}
