//! Wire protocol, clock sync and multicast transport for murmur.
//!
//! Everything between the UDP socket and the delta queue: the ASCII
//! message parser, remote-to-local time translation, the peer sync table
//! with rank assignment, and the message router tying them together.

mod parser;
mod receiver;
mod socket;
mod sync;
mod timebase;

pub use parser::{parse_line, ParsedLine};
pub use receiver::{Receiver, ReceiverConfig, GROUP_BASE, GROUP_COUNT};
pub use socket::{MulticastSocket, NetError};
pub use sync::{Peer, PeerTable, PEER_SLOTS};
pub use timebase::Timebase;
