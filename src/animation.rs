use crate::{
    canvas::{Canvas, Frame},
    error::{Error, Result},
};
use pixmatrix_common::{ArchivedStoredFrame, MAX_FRAMES};
use rkyv::vec::ArchivedVec;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationFrame {
    pub frame: Frame,
    pub duration_ms: u16,
}

/// Ordered frames shown as one display operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Animation {
    frames: Vec<AnimationFrame>,
}

impl Animation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame, failing once the animation is full.
    pub fn push(&mut self, frame: Frame, duration_ms: u16) -> Result<()> {
        if self.frames.len() >= MAX_FRAMES {
            return Err(Error::invalid(format!(
                "animations hold at most {MAX_FRAMES} frames"
            )));
        }

        self.frames.push(AnimationFrame { frame, duration_ms });
        Ok(())
    }

    pub fn push_canvas(&mut self, canvas: &Canvas, duration_ms: u16) -> Result<()> {
        self.push(canvas.snapshot(), duration_ms)
    }

    pub fn frames(&self) -> &[AnimationFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Load an archive written by the `process` tool.
    pub fn from_archive(bytes: &[u8]) -> Result<Self> {
        let stored = rkyv::access::<ArchivedVec<ArchivedStoredFrame>, rkyv::rancor::Error>(bytes)
            .map_err(|err| Error::invalid(format!("bad animation archive: {err}")))?;

        let mut animation = Self::new();
        for frame in stored.iter() {
            let rgb = Frame::from_rgb(frame.rgb.as_slice())?;
            animation.push(rgb, frame.duration_ms.to_native())?;
        }

        debug!(frames = animation.len(), "loaded animation archive");
        Ok(animation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixmatrix_common::{FRAME_BYTES, Rgb, StoredFrame};

    #[test]
    fn keeps_insertion_order() {
        let mut animation = Animation::new();
        for shade in [10u8, 20, 30] {
            let canvas = Canvas::filled(Rgb::new(shade, 0, 0));
            animation.push_canvas(&canvas, shade as u16).unwrap();
        }

        let durations: Vec<u16> = animation.frames().iter().map(|f| f.duration_ms).collect();
        assert_eq!(durations, [10, 20, 30]);
        assert_eq!(animation.frames()[1].frame.pixel(0, 0).unwrap(), Rgb::new(20, 0, 0));
    }

    #[test]
    fn rejects_frame_past_limit() {
        let mut animation = Animation::new();
        let canvas = Canvas::new();
        for _ in 0..MAX_FRAMES {
            animation.push_canvas(&canvas, 100).unwrap();
        }

        assert!(matches!(
            animation.push_canvas(&canvas, 100),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(animation.len(), MAX_FRAMES);
    }

    #[test]
    fn loads_archive() {
        let stored = vec![
            StoredFrame {
                duration_ms: 40,
                rgb: vec![1; FRAME_BYTES],
            },
            StoredFrame {
                duration_ms: 80,
                rgb: vec![2; FRAME_BYTES],
            },
        ];
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&stored).unwrap();

        let animation = Animation::from_archive(&bytes).unwrap();
        assert_eq!(animation.len(), 2);
        assert_eq!(animation.frames()[1].duration_ms, 80);
        assert_eq!(animation.frames()[0].frame.pixel(63, 63).unwrap(), Rgb::new(1, 1, 1));
    }

    #[test]
    fn archive_with_short_frame_is_rejected() {
        let stored = vec![StoredFrame {
            duration_ms: 40,
            rgb: vec![0; 5],
        }];
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&stored).unwrap();

        assert!(matches!(
            Animation::from_archive(&bytes),
            Err(Error::InvalidArgument(_))
        ));
    }
}
