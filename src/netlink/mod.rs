//! Generic-netlink protocol engine.
//!
//! This module carries everything protocol-generic: raw socket
//! sessions, the wire codec for the fixed envelope and its
//! tag-length-value attributes, and family-name resolution through the
//! generic-netlink controller. The taskstats-specific layer on top
//! lives in [`crate::taskstats`].
//!
//! # Key Components
//!
//! - [`NetlinkSocket`] — RAII socket session with optional
//!   receive-buffer sizing and a bounded receive wait.
//! - [`message`] — request encoder, envelope validation, and the
//!   bounds-checked [`message::AttrCursor`] attribute iterator.
//! - [`resolve_family_id`] — controller round-trip mapping a family
//!   name to its numeric id.
//!
//! # Platform Requirements
//!
//! Linux only: netlink is a Linux-specific kernel interface.

pub mod error;
mod family;
pub mod message;
mod socket;

pub use family::resolve_family_id;
pub use socket::{NetlinkSocket, SocketConfig};
