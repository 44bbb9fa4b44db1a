use crate::packet::{FramePacket, ProtocolError};

/// Receiving side of an animation transfer.
///
/// Frames arrive one packet at a time. Offset 0 opens a new animation and the frame at
/// `frame_count - 1` completes it, replacing whatever was on screen before.
#[derive(Debug, Default)]
pub struct AnimationAssembler {
    pending: Vec<FramePacket>,
    current: Vec<FramePacket>,
}

impl AnimationAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame.
    ///
    /// Returns the finished animation once its last frame arrived.
    pub fn push(&mut self, frame: FramePacket) -> Result<Option<&[FramePacket]>, ProtocolError> {
        if frame.pic_offset == 0 {
            self.pending.clear();
        } else {
            let in_sequence = self.pending.last().is_some_and(|last| {
                last.pic_id == frame.pic_id
                    && last.frame_count == frame.frame_count
                    && last.pic_offset + 1 == frame.pic_offset
            });

            if !in_sequence {
                let error = ProtocolError::OutOfOrder {
                    pic_id: frame.pic_id,
                    offset: frame.pic_offset,
                };
                self.pending.clear();
                return Err(error);
            }
        }

        let complete = frame.pic_offset + 1 == frame.frame_count;
        self.pending.push(frame);

        if complete {
            self.current = std::mem::take(&mut self.pending);
            return Ok(Some(&self.current));
        }

        Ok(None)
    }

    /// Animation currently on screen.
    pub fn current(&self) -> &[FramePacket] {
        &self.current
    }

    /// Whether an animation is partially received.
    pub fn is_receiving(&self) -> bool {
        !self.pending.is_empty()
    }
}
