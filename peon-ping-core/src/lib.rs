//! peon-ping setup core
//!
//! Everything the `peon-ping-setup` binary does lives here: detecting which
//! supported agent hosts exist on the machine, resolving sound packs against
//! the remote registry, maintaining the shared checksum-gated pack cache, and
//! idempotently registering the notification hooks into each host.

pub mod hosts;
pub mod migrate;
pub mod packs;
pub mod registrar;
pub mod registry;
pub mod setup;
