//! Turns canvases and animations into wire bytes.
//!
//! Encoding is pure: the same input always produces the same bytes, so an [`EncodedFrame`] can
//! be resent after a failed transmission without redrawing anything.

use crate::{
    animation::Animation,
    canvas::Canvas,
    error::{Error, Result},
};
use pixmatrix_common::{ControlCommand, FramePacket, Packet, ProtocolError, TextPacket};

/// Pic id used for a standalone still image.
pub const STILL_PIC_ID: u32 = 1;

/// Display time for frames that do not specify one.
pub const DEFAULT_FRAME_DURATION_MS: u16 = 100;

/// Ready-to-send packets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFrame {
    bytes: Vec<u8>,
    packets: usize,
}

impl EncodedFrame {
    pub fn from_packets<'a>(packets: impl IntoIterator<Item = &'a Packet>) -> Result<Self> {
        let mut bytes = Vec::new();
        let mut count = 0;
        for packet in packets {
            packet.encode(&mut bytes).map_err(protocol_to_invalid)?;
            count += 1;
        }

        Ok(Self {
            bytes,
            packets: count,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of packets, and so of acknowledgements to expect.
    pub fn packets(&self) -> usize {
        self.packets
    }
}

fn protocol_to_invalid(err: ProtocolError) -> Error {
    Error::invalid(err.to_string())
}

/// Single canvas as a one-frame animation.
pub fn encode_canvas(canvas: &Canvas, pic_id: u32, duration_ms: u16) -> EncodedFrame {
    let packet = Packet::Frame(FramePacket {
        pic_id,
        pic_offset: 0,
        frame_count: 1,
        duration_ms,
        pixels: canvas.to_rgb(),
    });

    let mut bytes = Vec::new();
    // a canvas always yields a full, in-range frame
    if let Err(err) = packet.encode(&mut bytes) {
        unreachable!("canvas frame failed to encode: {err}");
    }

    EncodedFrame { bytes, packets: 1 }
}

pub fn encode_still(canvas: &Canvas) -> EncodedFrame {
    encode_canvas(canvas, STILL_PIC_ID, DEFAULT_FRAME_DURATION_MS)
}

pub fn encode_animation(animation: &Animation, pic_id: u32) -> Result<EncodedFrame> {
    if animation.is_empty() {
        return Err(Error::invalid("no frames to display"));
    }

    let frame_count = u16::try_from(animation.len())
        .map_err(|_| Error::invalid("animation has too many frames"))?;

    let packets: Vec<Packet> = animation
        .frames()
        .iter()
        .zip(0..)
        .map(|(frame, pic_offset)| {
            Packet::Frame(FramePacket {
                pic_id,
                pic_offset,
                frame_count,
                duration_ms: frame.duration_ms,
                pixels: frame.frame.rgb().to_vec(),
            })
        })
        .collect();

    EncodedFrame::from_packets(&packets)
}

pub fn encode_text(text: TextPacket) -> Result<EncodedFrame> {
    EncodedFrame::from_packets(&[Packet::Text(text)])
}

pub fn encode_control(command: ControlCommand) -> Result<EncodedFrame> {
    EncodedFrame::from_packets(&[Packet::Control(command)])
}
