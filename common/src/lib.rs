//! Types shared between the drawing client, the simulator and the archive tool.
//!
//! The wire format lives in [`packet`]; everything here is pure data and codec logic so both
//! ends of a connection agree on it bit for bit.

pub mod assembler;
pub mod color;
pub mod packet;

pub use self::{
    assembler::AnimationAssembler,
    color::{ParseColorError, Rgb},
    packet::{
        Ack, ControlCommand, FramePacket, Packet, PacketHeader, PacketKind, ProtocolError,
        TextPacket,
    },
};

use rkyv::{Archive, Deserialize, Serialize};

/// Width of the display in pixels.
pub const WIDTH: usize = 64;

/// Height of the display in pixels.
pub const HEIGHT: usize = 64;

/// Size of one row-major RGB frame.
pub const FRAME_BYTES: usize = WIDTH * HEIGHT * 3;

/// Most frames a single animation may carry.
pub const MAX_FRAMES: usize = 60;

/// Frame as stored in an animation archive.
#[derive(Archive, Clone, Debug, Deserialize, Serialize)]
pub struct StoredFrame {
    pub duration_ms: u16,
    // layout: Y(X(rgb))
    pub rgb: Vec<u8>,
}
