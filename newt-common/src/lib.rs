//! Common structs and abstractions used by `newt`

#![cfg_attr(all(not(test), feature = "no_std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![allow(clippy::unused_unit)]
#![deny(missing_docs)]

extern crate alloc;

/// Extensions to Result
pub mod result;
pub use result::*;

/// Cursor
pub mod cursor;
pub use cursor::*;

/// Array
pub mod array;
pub use array::*;

/// Writable
pub mod writable;
pub use writable::*;
