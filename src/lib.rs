/*! A decoder for gzip members (RFC 1952) carrying DEFLATE streams (RFC 1951).

The pipeline is pull-based: the gzip framer strips the member header, the
inflater pulls Huffman-coded symbols out of a little-endian [`BitReader`],
and the expanded bytes land in a [`SlidingWindow`].

```no_run
let data = std::fs::read("genesis.txt.gz").unwrap();
let decoded = gzinflate::gzip::reader::decompress(&data[..], &Default::default()).unwrap();
```

[`BitReader`]: bitstream::BitReader
[`SlidingWindow`]: sliding_window::SlidingWindow
*/

pub mod bitstream;
pub mod deflate;
pub mod gzip;
pub mod huff_tree;
pub mod sliding_window;
