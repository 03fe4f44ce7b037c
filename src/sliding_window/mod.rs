use crate::deflate::decoder::DeflateReadError;

/// How far back a DEFLATE back-reference may reach.
pub const WINDOW_SIZE: usize = 32768;

/** The decoded output of one DEFLATE stream. The whole output is retained, so
the window is simply its last `WINDOW_SIZE` bytes.
*/
#[derive(Debug, Default, Clone)]
pub struct SlidingWindow {
  data: Vec<u8>,
}

impl SlidingWindow {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, byte: u8) {
    self.data.push(byte);
  }

  pub fn extend_from_slice(&mut self, bytes: &[u8]) {
    self.data.extend_from_slice(bytes);
  }

  /// Copy `length` bytes starting `distance` bytes behind the write head.
  pub fn copy_backref(&mut self, length: u16, distance: u16) -> Result<(), DeflateReadError> {
    let available = self.data.len();
    let dist = distance as usize;
    if dist == 0 || dist > available || dist > WINDOW_SIZE {
      return Err(DeflateReadError::DistanceTooFar {
        distance,
        available: available.min(WINDOW_SIZE),
      });
    }
    let first_i = available - dist;
    self.data.reserve(length as usize);
    // Byte at a time: when length > distance the source runs into bytes this
    // same copy has just written.
    for i in 0..length as usize {
      let target = self.data[first_i + i];
      self.data.push(target);
    }
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_slice(&self) -> &[u8] {
    &self.data
  }

  pub fn into_inner(self) -> Vec<u8> {
    self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use quickcheck::quickcheck;

  #[test]
  fn plain_copy() {
    let mut win = SlidingWindow::new();
    win.extend_from_slice(b"abcdef");
    win.copy_backref(3, 5).unwrap();
    assert_eq!(win.as_slice(), b"abcdefbcd");
  }

  #[test]
  fn overlapping_copy_repeats_pattern() {
    let mut win = SlidingWindow::new();
    win.extend_from_slice(b"xy");
    win.copy_backref(7, 2).unwrap();
    assert_eq!(win.as_slice(), b"xyxyxyxyx");
  }

  #[test]
  fn distance_past_start() {
    let mut win = SlidingWindow::new();
    win.extend_from_slice(b"abc");
    match win.copy_backref(3, 4) {
      Err(DeflateReadError::DistanceTooFar {
        distance: 4,
        available: 3,
      }) => {}
      other => panic!("expected DistanceTooFar, got {:?}", other),
    }
    assert_eq!(win.len(), 3);
    assert!(matches!(
      SlidingWindow::new().copy_backref(3, 1),
      Err(DeflateReadError::DistanceTooFar { .. })
    ));
  }

  #[test]
  fn window_is_32k() {
    let mut win = SlidingWindow::new();
    win.extend_from_slice(&vec![7u8; WINDOW_SIZE + 10]);
    win.copy_backref(258, 32768).unwrap();
    assert!(matches!(
      win.copy_backref(3, 32769),
      Err(DeflateReadError::DistanceTooFar { .. })
    ));
  }

  quickcheck! {
    fn self_overlap(x: u8, n: u16) -> bool {
      let n = 3 + n % 256;
      let mut win = SlidingWindow::new();
      win.push(x);
      win.copy_backref(n, 1).unwrap();
      win.into_inner() == vec![x; n as usize + 1]
    }
  }
}
