//! `newt` is a CoAP runtime: it drives the confirmable-message
//! retransmission state machine, matches responses to outstanding
//! requests, and routes incoming requests through a tree of resources.
//!
//! ## CoAP
//! CoAP is an application-level network protocol that copies the semantics of HTTP
//! to an environment conducive to **constrained** devices. (weak hardware, small battery capacity, etc.)
//!
//! This means that you can write and run two-way RESTful communication
//! between devices very similarly to the networking semantics you are
//! most likely very familiar with.
//!
//! ### Similarities to HTTP
//! CoAP has the same verbs and many of the same semantics as HTTP;
//! - GET, POST, PUT, DELETE (and FETCH, PATCH, iPATCH from RFC 8132)
//! - Headers (renamed to [Options](https://datatracker.ietf.org/doc/html/rfc7252#section-5.10))
//! - Data format independent (via the [Content-Format](https://datatracker.ietf.org/doc/html/rfc7252#section-12.3) Option)
//! - [Response status codes](https://datatracker.ietf.org/doc/html/rfc7252#section-5.9)
//!
//! ### Differences from HTTP
//! - CoAP customarily sits on top of UDP (an adaptation for reliable
//!   byte streams exists in [RFC 8323](https://datatracker.ietf.org/doc/html/rfc8323))
//! - Because UDP is a "connectionless" protocol, it offers no guarantee of "conversation" between traditional client and server roles. All the UDP transport layer gives you is a method to listen for messages thrown at you, and to throw messages at someone. Owing to this, CoAP machines are expected to perform both client and server roles (or more accurately, _sender_ and _receiver_ roles)
//! - While _classes_ of status codes are the same (Success 2xx -> 2.xx, Client error 4xx -> 4.xx, Server error 5xx -> 5.xx), the semantics of the individual response codes differ.

#![cfg_attr(all(not(test), feature = "no_std"), no_std)]
#![cfg_attr(not(test), deny(unsafe_code))]
#![deny(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc as std_alloc;

/// Customizable retrying of fallible operations
pub mod retry;

/// Time abstractions
pub mod time;

/// Sockets & network addressing
pub mod net;

/// Runtime configuration
pub mod config;

/// Error taxonomy
pub mod error;

/// CoAP URI parsing & composition
pub mod uri;

/// Requests
pub mod req;

/// Responses
pub mod resp;

/// The resource tree served by server-profile runtimes
pub mod resource;

/// In-flight confirmable transactions
pub mod transaction;

/// The runtime core
pub mod core;

/// `std` platform bindings
#[cfg(feature = "std")]
pub mod std;

mod logging;

#[cfg(test)]
pub(crate) mod test;
