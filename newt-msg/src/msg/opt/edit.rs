//! In-place insertion & removal of options in an already-serialized
//! message tail.
//!
//! These functions operate on the byte region that starts at the first
//! option (immediately after the token) and runs to the end of the
//! message: options, then optionally the payload marker and payload.
//!
//! The interesting part is the delta encoding: inserting or removing an
//! option changes the *following* option's delta, whose wire size may
//! shrink or grow by up to two bytes. Both functions re-encode that
//! header and shift the tail accordingly.
//!
//! This is what makes it possible to, say, bump the Block2 number in a
//! retained request buffer between block transfers without
//! re-serializing the whole message.

use newt_common::{Array, Cursor, GetSize};
use tinyvec::ArrayVec;

use super::{encode_len_or_delta, opt_header, parse_opt_len_or_delta, OptNumber, OptParseError};

/// Errors encounterable while editing serialized options
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EditError {
  /// No option with the requested number is present
  NotFound(OptNumber),
  /// The grown message would not fit in the buffer
  TooLong {
    /// Storage capacity, in bytes
    capacity: usize,
    /// Bytes the edit would have needed
    needed: usize,
  },
  /// The buffer does not hold well-formed options
  Malformed(OptParseError),
}

#[derive(Copy, Clone, Debug, Default)]
struct Scanned {
  pos: usize,
  number: u32,
  head_len: usize,
  value_len: usize,
}

impl Scanned {
  fn total_len(&self) -> usize {
    self.head_len + self.value_len
  }

  fn end(&self) -> usize {
    self.pos + self.total_len()
  }
}

/// Read the option TLV starting at `pos`, yielding `None` at the end
/// of the option region (end of buffer or payload marker).
fn scan_one(buf: &[u8], pos: usize, prev: u32) -> Result<Option<Scanned>, OptParseError> {
  let mut cur = Cursor::new(&buf[pos..]);

  let header = match opt_header(&mut cur) {
    | Ok(b) => b,
    | Err(OptParseError::OptionsExhausted) => return Ok(None),
    | Err(e) => return Err(e),
  };

  let delta = parse_opt_len_or_delta(header >> 4, &mut cur, OptParseError::ReservedDeltaNibble)?;
  let len = parse_opt_len_or_delta(header & 0b1111, &mut cur, OptParseError::ReservedLengthNibble)?
            as usize;
  let head_len = cur.position();

  if cur.remaining() < len {
    return Err(OptParseError::eof());
  }

  Ok(Some(Scanned { pos,
                    number: prev + delta,
                    head_len,
                    value_len: len }))
}

fn render_head(delta: u32, len: u32) -> ArrayVec<[u8; 5]> {
  let (d, d_ext) = encode_len_or_delta(delta);
  let (l, l_ext) = encode_len_or_delta(len);

  let mut out = ArrayVec::new();
  out.push(d << 4 | l);
  out.extend(d_ext);
  out.extend(l_ext);
  out
}

/// Insert an option into a serialized option region, keeping the
/// region sorted by number.
///
/// Repeated numbers insert after their last existing instance.
pub fn insert<A>(buf: &mut A, number: OptNumber, value: &[u8]) -> Result<(), EditError>
  where A: Array<Item = u8>
{
  let old_len = buf.get_size();

  // Walk to the insertion point: the first option numbered above `number`.
  let mut pos = 0;
  let mut pred = 0u32;
  let mut succ: Option<Scanned> = None;

  loop {
    match scan_one(buf, pos, pred).map_err(EditError::Malformed)? {
      | Some(s) if s.number > number.0 => {
        succ = Some(s);
        break;
      },
      | Some(s) => {
        pred = s.number;
        pos = s.end();
      },
      | None => break,
    }
  }

  let new_head = render_head(number.0 - pred, value.len() as u32);
  let new_total = new_head.len() + value.len();

  let (ins_pos, shift, succ_rewrite) = match succ {
    | Some(s) => {
      let new_succ_head = render_head(s.number - number.0, s.value_len as u32);
      let shift = new_total + new_succ_head.len() - s.head_len;
      (s.pos, shift, Some((s, new_succ_head)))
    },
    | None => (pos, new_total, None),
  };

  if let Some(max) = buf.max_size() {
    if old_len + shift > max {
      return Err(EditError::TooLong { capacity: max,
                                      needed: old_len + shift });
    }
  }

  buf.extend(core::iter::repeat(0u8).take(shift));

  match succ_rewrite {
    | Some((s, new_succ_head)) => {
      // Everything from the successor's value onward moves right wholesale;
      // its header is re-encoded against the inserted option.
      let value_dst = ins_pos + new_total + new_succ_head.len();
      buf.copy_within(s.pos + s.head_len..old_len, value_dst);
      buf[ins_pos + new_total..value_dst].copy_from_slice(&new_succ_head);
    },
    | None => {
      // No following option; the marker & payload (if any) move as one block.
      buf.copy_within(ins_pos..old_len, ins_pos + new_total);
    },
  }

  buf[ins_pos..ins_pos + new_head.len()].copy_from_slice(&new_head);
  buf[ins_pos + new_head.len()..ins_pos + new_total].copy_from_slice(value);

  Ok(())
}

/// Remove the first option with the given number from a serialized
/// option region.
pub fn remove<A>(buf: &mut A, number: OptNumber) -> Result<(), EditError>
  where A: Array<Item = u8>
{
  let old_len = buf.get_size();

  let mut pos = 0;
  let mut pred = 0u32;

  let target = loop {
    match scan_one(buf, pos, pred).map_err(EditError::Malformed)? {
      | Some(s) if s.number == number.0 => break s,
      | Some(s) if s.number > number.0 => return Err(EditError::NotFound(number)),
      | Some(s) => {
        pred = s.number;
        pos = s.end();
      },
      | None => return Err(EditError::NotFound(number)),
    }
  };

  let succ = scan_one(buf, target.end(), target.number).map_err(EditError::Malformed)?;

  match succ {
    | Some(s) => {
      // The successor's delta now spans the removed option; its header
      // can grow, but never by more than the removed bytes.
      let new_succ_head = render_head(s.number - pred, s.value_len as u32);
      let value_dst = target.pos + new_succ_head.len();

      buf[target.pos..value_dst].copy_from_slice(&new_succ_head);
      buf.copy_within(s.pos + s.head_len..old_len, value_dst);
      buf.trunc(old_len - target.total_len() - s.head_len + new_succ_head.len());
    },
    | None => {
      buf.copy_within(target.end()..old_len, target.pos);
      buf.trunc(old_len - target.total_len());
    },
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn region(opts: &[(u32, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut prev = 0u32;

    for (num, val) in opts {
      out.extend(render_head(num - prev, val.len() as u32));
      out.extend(*val);
      prev = *num;
    }

    out
  }

  #[test]
  fn insert_between() {
    let mut buf = region(&[(3, b"host"), (60, &[1])]);
    insert(&mut buf, OptNumber(11), b"time").unwrap();

    assert_eq!(buf, region(&[(3, b"host"), (11, b"time"), (60, &[1])]));
  }

  #[test]
  fn insert_at_ends() {
    let mut buf = region(&[(11, b"time")]);
    insert(&mut buf, OptNumber(3), b"h").unwrap();
    insert(&mut buf, OptNumber(60), &[2]).unwrap();

    assert_eq!(buf, region(&[(3, b"h"), (11, b"time"), (60, &[2])]));
  }

  #[test]
  fn insert_repeated_goes_after() {
    let mut buf = region(&[(11, b"a")]);
    insert(&mut buf, OptNumber(11), b"b").unwrap();

    assert_eq!(buf, region(&[(11, b"a"), (11, b"b")]));
  }

  #[test]
  fn insert_shrinks_successor_delta() {
    // successor's delta goes from 269 (2 ext bytes) to 9 (none)
    let mut buf = region(&[(269, b"x")]);
    insert(&mut buf, OptNumber(260), b"y").unwrap();

    assert_eq!(buf, region(&[(260, b"y"), (269, b"x")]));
  }

  #[test]
  fn remove_regrows_successor_delta() {
    let mut buf = region(&[(260, b"y"), (269, b"x")]);
    remove(&mut buf, OptNumber(260)).unwrap();

    assert_eq!(buf, region(&[(269, b"x")]));
  }

  #[test]
  fn remove_then_insert_is_identity() {
    let orig = region(&[(3, b"host"), (11, b"time"), (12, &[]), (60, &[4])]);

    for num in [3u32, 11, 12, 60] {
      let mut buf = orig.clone();
      let value: Vec<u8> = {
        let mut cur = Cursor::new(&orig[..]);
        let mut prev = 0;
        loop {
          let o = super::super::consume_opt::<_, Vec<u8>>(&mut cur, OptNumber(prev)).unwrap();
          if o.number.0 == num {
            break o.value.0;
          }
          prev = o.number.0;
        }
      };

      remove(&mut buf, OptNumber(num)).unwrap();
      insert(&mut buf, OptNumber(num), &value).unwrap();
      assert_eq!(buf, orig, "removing & reinserting {}", num);
    }
  }

  #[test]
  fn remove_missing() {
    let mut buf = region(&[(11, b"a")]);
    assert_eq!(remove(&mut buf, OptNumber(12)),
               Err(EditError::NotFound(OptNumber(12))));
  }

  #[test]
  fn edits_leave_payload_alone() {
    let mut buf = region(&[(11, b"time")]);
    buf.push(0xFF);
    buf.extend(b"payload");

    insert(&mut buf, OptNumber(60), &[1]).unwrap();

    let mut expected = region(&[(11, b"time"), (60, &[1])]);
    expected.push(0xFF);
    expected.extend(b"payload");
    assert_eq!(buf, expected);

    remove(&mut buf, OptNumber(11)).unwrap();

    let mut expected = region(&[(60, &[1])]);
    expected.push(0xFF);
    expected.extend(b"payload");
    assert_eq!(buf, expected);
  }

  #[test]
  fn insert_into_full_fixed_buffer() {
    let mut buf: tinyvec::ArrayVec<[u8; 7]> = region(&[(11, b"abcde")]).into_iter().collect();
    assert_eq!(insert(&mut buf, OptNumber(12), &[1]),
               Err(EditError::TooLong { capacity: 7,
                                        needed: 8 }));
  }
}
