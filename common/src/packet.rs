//! Wire format spoken by the device, the simulator and the client.
//!
//! Packet layout (all integers big-endian):
//! - MAGIC (2 bytes): `PX`
//! - VERSION (1 byte): protocol version, currently 1
//! - KIND (1 byte): 1 frame, 2 text, 3 control
//! - LENGTH (4 bytes): body length
//! - BODY (LENGTH bytes): kind-specific data
//!
//! Frame body:
//! - PIC_ID (4), PIC_OFFSET (2), FRAME_COUNT (2), FRAME_DURATION_MS (2)
//! - PIXELS (64 * 64 * 3): row-major RGB
//!
//! Every packet is answered by a 4 byte acknowledgement: `PA`, VERSION, STATUS.

use crate::{FRAME_BYTES, MAX_FRAMES, Rgb};
use std::str;

/// Packet synchronization bytes
pub const MAGIC: [u8; 2] = *b"PX";

/// Acknowledgement synchronization bytes
pub const ACK_MAGIC: [u8; 2] = *b"PA";

/// Version written into every header
pub const PROTOCOL_VERSION: u8 = 1;

/// Largest body a peer will accept
pub const MAX_BODY_LEN: u32 = 64 * 1024;

const FRAME_FIELDS_LEN: usize = 4 + 2 + 2 + 2;
const TEXT_FIELDS_LEN: usize = 1 + 1 + 1 + 3 + 1 + 1 + 1 + 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("bad magic bytes {0:02x?}")]
    BadMagic([u8; 2]),
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
    #[error("unknown packet kind {0:#04x}")]
    UnknownKind(u8),
    #[error("unknown control opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("body of {0} bytes exceeds the limit")]
    BodyTooLarge(u32),
    #[error("{0} trailing bytes after packet body")]
    TrailingBytes(usize),
    #[error("frame {offset} is outside an animation of {count} frames")]
    BadFrameIndex { offset: u16, count: u16 },
    #[error("frame {offset} of animation {pic_id} arrived out of order")]
    OutOfOrder { pic_id: u32, offset: u16 },
    #[error("text is not valid utf-8")]
    InvalidText(#[from] str::Utf8Error),
    #[error("text of {0} bytes is too long")]
    TextTooLong(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    Frame = 0x01,
    Text = 0x02,
    Control = 0x03,
}

impl TryFrom<u8> for PacketKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Frame),
            0x02 => Ok(Self::Text),
            0x03 => Ok(Self::Control),
            other => Err(ProtocolError::UnknownKind(other)),
        }
    }
}

/// Fixed-size prefix of every packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketHeader {
    pub kind: PacketKind,
    pub body_len: u32,
}

impl PacketHeader {
    pub const LEN: usize = 8;

    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(bytes);
        let magic = [reader.u8()?, reader.u8()?];
        if magic != MAGIC {
            return Err(ProtocolError::BadMagic(magic));
        }

        let version = reader.u8()?;
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let kind = PacketKind::try_from(reader.u8()?)?;
        let body_len = reader.u32()?;
        if body_len > MAX_BODY_LEN {
            return Err(ProtocolError::BodyTooLarge(body_len));
        }

        Ok(Self { kind, body_len })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.push(PROTOCOL_VERSION);
        out.push(self.kind as u8);
        out.extend_from_slice(&self.body_len.to_be_bytes());
    }
}

/// One frame of an animation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePacket {
    /// Animation this frame belongs to
    pub pic_id: u32,
    /// Position of the frame within the animation
    pub pic_offset: u16,
    /// Number of frames in the animation
    pub frame_count: u16,
    /// How long the frame stays on screen
    pub duration_ms: u16,
    /// Row-major RGB, exactly [`FRAME_BYTES`] long
    pub pixels: Vec<u8>,
}

/// Device-rendered text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextPacket {
    pub text_id: u8,
    pub x: u8,
    pub y: u8,
    pub color: Rgb,
    pub font: u8,
    /// Scroll speed, 0 keeps the text still
    pub speed: u8,
    /// Width in pixels the device may use before clipping
    pub text_width: u8,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    SetBrightness(u8),
    Reboot,
    SetTimer {
        minutes: u8,
        seconds: u8,
        running: bool,
    },
    SetScoreboard {
        blue: u16,
        red: u16,
    },
    PlayBuzzer {
        active_ms: u16,
        off_ms: u16,
        total_ms: u16,
    },
}

impl ControlCommand {
    fn opcode(&self) -> u8 {
        match self {
            Self::SetBrightness(..) => 0x01,
            Self::Reboot => 0x02,
            Self::SetTimer { .. } => 0x03,
            Self::SetScoreboard { .. } => 0x04,
            Self::PlayBuzzer { .. } => 0x05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Packet {
    Frame(FramePacket),
    Text(TextPacket),
    Control(ControlCommand),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Frame(..) => PacketKind::Frame,
            Self::Text(..) => PacketKind::Text,
            Self::Control(..) => PacketKind::Control,
        }
    }

    /// Append the encoded packet to `out`.
    ///
    /// Encoding is deterministic: equal packets always produce equal bytes.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
        let mut body = Vec::new();
        match self {
            Self::Frame(frame) => {
                if frame.pixels.len() != FRAME_BYTES {
                    return Err(ProtocolError::Truncated {
                        expected: FRAME_BYTES,
                        actual: frame.pixels.len(),
                    });
                }
                check_frame_index(frame.pic_offset, frame.frame_count)?;

                body.reserve(FRAME_FIELDS_LEN + FRAME_BYTES);
                body.extend_from_slice(&frame.pic_id.to_be_bytes());
                body.extend_from_slice(&frame.pic_offset.to_be_bytes());
                body.extend_from_slice(&frame.frame_count.to_be_bytes());
                body.extend_from_slice(&frame.duration_ms.to_be_bytes());
                body.extend_from_slice(&frame.pixels);
            }
            Self::Text(text) => {
                let len = u16::try_from(text.text.len())
                    .map_err(|_| ProtocolError::TextTooLong(text.text.len()))?;

                body.extend_from_slice(&[text.text_id, text.x, text.y]);
                body.extend_from_slice(&text.color.to_bytes());
                body.extend_from_slice(&[text.font, text.speed, text.text_width]);
                body.extend_from_slice(&len.to_be_bytes());
                body.extend_from_slice(text.text.as_bytes());
            }
            Self::Control(command) => {
                body.push(command.opcode());
                match *command {
                    ControlCommand::SetBrightness(level) => body.push(level),
                    ControlCommand::Reboot => {}
                    ControlCommand::SetTimer {
                        minutes,
                        seconds,
                        running,
                    } => body.extend_from_slice(&[minutes, seconds, running as u8]),
                    ControlCommand::SetScoreboard { blue, red } => {
                        body.extend_from_slice(&blue.to_be_bytes());
                        body.extend_from_slice(&red.to_be_bytes());
                    }
                    ControlCommand::PlayBuzzer {
                        active_ms,
                        off_ms,
                        total_ms,
                    } => {
                        body.extend_from_slice(&active_ms.to_be_bytes());
                        body.extend_from_slice(&off_ms.to_be_bytes());
                        body.extend_from_slice(&total_ms.to_be_bytes());
                    }
                }
            }
        }

        let body_len = body.len() as u32;
        if body_len > MAX_BODY_LEN {
            return Err(ProtocolError::BodyTooLarge(body_len));
        }

        PacketHeader {
            kind: self.kind(),
            body_len,
        }
        .write(out);
        out.extend_from_slice(&body);

        Ok(())
    }

    /// Decode the body that followed `header`.
    pub fn decode_body(kind: PacketKind, body: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(body);
        let packet = match kind {
            PacketKind::Frame => {
                let pic_id = reader.u32()?;
                let pic_offset = reader.u16()?;
                let frame_count = reader.u16()?;
                let duration_ms = reader.u16()?;
                check_frame_index(pic_offset, frame_count)?;
                let pixels = reader.take(FRAME_BYTES)?.to_vec();

                Self::Frame(FramePacket {
                    pic_id,
                    pic_offset,
                    frame_count,
                    duration_ms,
                    pixels,
                })
            }
            PacketKind::Text => {
                let [text_id, x, y] = reader.array()?;
                let color = Rgb::from_bytes(reader.array()?);
                let [font, speed, text_width] = reader.array()?;
                let len = reader.u16()? as usize;
                let text = str::from_utf8(reader.take(len)?)?.to_owned();

                Self::Text(TextPacket {
                    text_id,
                    x,
                    y,
                    color,
                    font,
                    speed,
                    text_width,
                    text,
                })
            }
            PacketKind::Control => {
                let command = match reader.u8()? {
                    0x01 => ControlCommand::SetBrightness(reader.u8()?),
                    0x02 => ControlCommand::Reboot,
                    0x03 => {
                        let [minutes, seconds, running] = reader.array()?;
                        ControlCommand::SetTimer {
                            minutes,
                            seconds,
                            running: running != 0,
                        }
                    }
                    0x04 => ControlCommand::SetScoreboard {
                        blue: reader.u16()?,
                        red: reader.u16()?,
                    },
                    0x05 => ControlCommand::PlayBuzzer {
                        active_ms: reader.u16()?,
                        off_ms: reader.u16()?,
                        total_ms: reader.u16()?,
                    },
                    other => return Err(ProtocolError::UnknownOpcode(other)),
                };

                Self::Control(command)
            }
        };

        if reader.remaining() != 0 {
            return Err(ProtocolError::TrailingBytes(reader.remaining()));
        }

        Ok(packet)
    }

    /// Decode one packet from the front of `bytes`.
    ///
    /// Returns the packet and the number of bytes it occupied.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), ProtocolError> {
        let header = PacketHeader::parse(bytes)?;
        let total = PacketHeader::LEN + header.body_len as usize;
        if bytes.len() < total {
            return Err(ProtocolError::Truncated {
                expected: total,
                actual: bytes.len(),
            });
        }

        let packet = Self::decode_body(header.kind, &bytes[PacketHeader::LEN..total])?;
        Ok((packet, total))
    }

    /// Decode a stream of back-to-back packets.
    pub fn decode_all(mut bytes: &[u8]) -> Result<Vec<Self>, ProtocolError> {
        let mut packets = Vec::new();
        while !bytes.is_empty() {
            let (packet, used) = Self::decode(bytes)?;
            packets.push(packet);
            bytes = &bytes[used..];
        }

        Ok(packets)
    }
}

fn check_frame_index(offset: u16, count: u16) -> Result<(), ProtocolError> {
    if count == 0 || count as usize > MAX_FRAMES || offset >= count {
        return Err(ProtocolError::BadFrameIndex { offset, count });
    }

    Ok(())
}

/// Peer reply to a single packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ack {
    pub status: u8,
}

impl Ack {
    pub const LEN: usize = 4;
    pub const OK: Self = Self { status: 0 };
    /// Status sent back for packets the peer could not decode.
    pub const MALFORMED: Self = Self { status: 1 };

    pub fn is_ok(&self) -> bool {
        self.status == 0
    }

    pub fn encode(&self) -> [u8; Self::LEN] {
        [ACK_MAGIC[0], ACK_MAGIC[1], PROTOCOL_VERSION, self.status]
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(bytes);
        let magic = [reader.u8()?, reader.u8()?];
        if magic != ACK_MAGIC {
            return Err(ProtocolError::BadMagic(magic));
        }

        let version = reader.u8()?;
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        Ok(Self {
            status: reader.u8()?,
        })
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < len {
            return Err(ProtocolError::Truncated {
                expected: self.pos + len,
                actual: self.bytes.len(),
            });
        }

        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_be_bytes(self.array()?))
    }
}
