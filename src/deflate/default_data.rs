//! The fixed Huffman codes of RFC 1951 section 3.2.6, built once per process.

use lazy_static::lazy_static;

use crate::huff_tree::{HuffTree, RleRange};

lazy_static! {
  pub static ref FIXED_LITLEN_TREE: HuffTree =
    HuffTree::from_ranges(&fixed_litlen_ranges()).expect("fixed literal/length code is complete");
  pub static ref FIXED_DIST_TREE: HuffTree =
    HuffTree::from_ranges(&fixed_dist_ranges()).expect("fixed distance code is complete");
}

/*
  Lit Value    Bits        Codes
  ---------    ----        -----
    0 - 143     8          00110000 through
                           10111111
  144 - 255     9          110010000 through
                           111111111
  256 - 279     7          0000000 through
                           0010111
  280 - 287     8          11000000 through
                           11000111
*/
pub fn fixed_litlen_ranges() -> Vec<RleRange> {
  vec![
    RleRange::new(143, 8),
    RleRange::new(255, 9),
    RleRange::new(279, 7),
    RleRange::new(287, 8),
  ]
}

/// All 32 five-bit codes. Codes 30 and 31 decode here and are rejected later
/// as distance symbols.
pub fn fixed_dist_ranges() -> Vec<RleRange> {
  vec![RleRange::new(31, 5)]
}
