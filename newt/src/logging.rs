use core::fmt::Write;

use newt_common::{GetSize, Writable};
use tinyvec::ArrayVec;

use crate::config::{self, Config};

pub(crate) fn msg_summary<Cfg: Config>(msg: &config::Message<Cfg>)
                                       -> Writable<ArrayVec<[u8; 64]>> {
  let mut buf: Writable<ArrayVec<[u8; 64]>> = Default::default();
  let code = msg.code.to_human();
  write!(buf,
         "{:?} {}{}{}{} mid {} with {} byte payload",
         msg.ty,
         code[0],
         code[1],
         code[2],
         code[3],
         msg.id.0,
         msg.payload.0.get_size()).ok();
  buf
}
