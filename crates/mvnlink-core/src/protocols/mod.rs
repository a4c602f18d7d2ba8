//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: byte offsets, type codes and protocol constants
//! - `reader`: safe byte access and wire conventions
//! - `header`/`datagram`/`records`: domain-level decoding (no byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Decoders are pure and contain no I/O; sources and the replay layer handle
//! transport and aggregation.

pub mod mxtp;
