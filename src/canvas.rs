use crate::error::{Error, Result};
use pixmatrix_common::{FRAME_BYTES, HEIGHT, Rgb, WIDTH};

/// The display's pixel state.
///
/// Direct pixel access is strict about coordinates; [`Canvas::plot`] clips instead and is what
/// the shape primitives draw through.
#[derive(Clone, PartialEq, Eq)]
pub struct Canvas {
    pixels: Box<[[Rgb; Self::WIDTH]; Self::HEIGHT]>,
}

impl Canvas {
    pub const WIDTH: usize = WIDTH;
    pub const HEIGHT: usize = HEIGHT;

    pub fn new() -> Self {
        Self::filled(Rgb::BLACK)
    }

    pub fn filled(color: Rgb) -> Self {
        Self {
            pixels: Box::new([[color; Self::WIDTH]; Self::HEIGHT]),
        }
    }

    #[inline]
    fn index(x: i32, y: i32) -> Option<(usize, usize)> {
        let x = usize::try_from(x).ok().filter(|&x| x < Self::WIDTH)?;
        let y = usize::try_from(y).ok().filter(|&y| y < Self::HEIGHT)?;
        Some((x, y))
    }

    pub fn contains(x: i32, y: i32) -> bool {
        Self::index(x, y).is_some()
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<()> {
        let (col, row) = Self::index(x, y).ok_or(Error::OutOfBounds { x, y })?;
        self.pixels[row][col] = color;
        Ok(())
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Result<Rgb> {
        let (col, row) = Self::index(x, y).ok_or(Error::OutOfBounds { x, y })?;
        Ok(self.pixels[row][col])
    }

    /// Write a pixel if it lies on the canvas.
    ///
    /// Returns whether anything was written.
    #[inline]
    pub fn plot(&mut self, x: i32, y: i32, color: Rgb) -> bool {
        match Self::index(x, y) {
            Some((col, row)) => {
                self.pixels[row][col] = color;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, color: Rgb) {
        for row in self.pixels.iter_mut() {
            row.fill(color);
        }
    }

    /// Row-major RGB bytes, the frame payload layout.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_BYTES);
        for pixel in self.pixels.iter().flatten() {
            out.extend_from_slice(&pixel.to_bytes());
        }
        out
    }

    pub fn snapshot(&self) -> Frame {
        Frame {
            rgb: self.to_rgb().into_boxed_slice(),
        }
    }

    /// Replace the canvas content with a snapshot.
    pub fn load(&mut self, frame: &Frame) {
        for (pixel, rgb) in self
            .pixels
            .iter_mut()
            .flatten()
            .zip(frame.rgb.chunks_exact(3))
        {
            *pixel = Rgb::new(rgb[0], rgb[1], rgb[2]);
        }
    }

    /// Coordinates of every pixel that differs from `color`.
    pub(crate) fn cells_not(&self, color: Rgb) -> Vec<(i32, i32)> {
        let mut cells = Vec::new();
        for (y, row) in self.pixels.iter().enumerate() {
            for (x, pixel) in row.iter().enumerate() {
                if *pixel != color {
                    cells.push((x as i32, y as i32));
                }
            }
        }
        cells
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("lit", &self.cells_not(Rgb::BLACK).len())
            .finish()
    }
}

/// Immutable copy of a canvas, ready to be encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    rgb: Box<[u8]>,
}

impl Frame {
    /// Wrap raw row-major RGB bytes.
    pub fn from_rgb(rgb: impl Into<Vec<u8>>) -> Result<Self> {
        let rgb = rgb.into();
        if rgb.len() != FRAME_BYTES {
            return Err(Error::invalid(format!(
                "frame has {} bytes, expected {FRAME_BYTES}",
                rgb.len()
            )));
        }

        Ok(Self {
            rgb: rgb.into_boxed_slice(),
        })
    }

    pub fn rgb(&self) -> &[u8] {
        &self.rgb
    }

    pub fn pixel(&self, x: i32, y: i32) -> Result<Rgb> {
        let (col, row) = Canvas::index(x, y).ok_or(Error::OutOfBounds { x, y })?;
        let start = (row * Canvas::WIDTH + col) * 3;
        Ok(Rgb::new(
            self.rgb[start],
            self.rgb[start + 1],
            self.rgb[start + 2],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn set_then_get_roundtrips(x in 0..64i32, y in 0..64i32, r: u8, g: u8, b: u8) {
            let mut canvas = Canvas::new();
            let color = Rgb::new(r, g, b);
            canvas.set_pixel(x, y, color).unwrap();
            prop_assert_eq!(canvas.get_pixel(x, y).unwrap(), color);
        }

        #[test]
        fn outside_coordinates_are_rejected(
            x in prop_oneof![i32::MIN..0, 64..i32::MAX],
            y in any::<i32>(),
        ) {
            let mut canvas = Canvas::new();
            for (x, y) in [(x, y), (y, x)] {
                if Canvas::contains(x, y) {
                    continue;
                }
                let set_rejected = matches!(
                    canvas.set_pixel(x, y, Rgb::RED),
                    Err(Error::OutOfBounds { .. })
                );
                let get_rejected = matches!(
                    canvas.get_pixel(x, y),
                    Err(Error::OutOfBounds { .. })
                );
                prop_assert!(set_rejected);
                prop_assert!(get_rejected);
            }
            prop_assert!(canvas.cells_not(Rgb::BLACK).is_empty());
        }
    }

    #[test]
    fn edges_are_inclusive() {
        let mut canvas = Canvas::new();
        for (x, y) in [(0, 0), (63, 0), (0, 63), (63, 63)] {
            canvas.set_pixel(x, y, Rgb::GREEN).unwrap();
        }
        assert_eq!(canvas.cells_not(Rgb::BLACK).len(), 4);

        assert!(matches!(
            canvas.set_pixel(64, 0, Rgb::GREEN),
            Err(Error::OutOfBounds { x: 64, y: 0 })
        ));
        assert!(matches!(
            canvas.get_pixel(0, -1),
            Err(Error::OutOfBounds { x: 0, y: -1 })
        ));
    }

    #[test]
    fn plot_clips_silently() {
        let mut canvas = Canvas::new();
        assert!(!canvas.plot(-1, 5, Rgb::RED));
        assert!(!canvas.plot(5, 64, Rgb::RED));
        assert!(canvas.plot(5, 5, Rgb::RED));
        assert_eq!(canvas.cells_not(Rgb::BLACK), [(5, 5)]);
    }

    #[test]
    fn clear_resets_every_cell() {
        let mut canvas = Canvas::new();
        canvas.set_pixel(3, 4, Rgb::RED).unwrap();
        canvas.clear(Rgb::WHITE);
        assert!(canvas.cells_not(Rgb::WHITE).is_empty());
    }

    #[test]
    fn rgb_is_row_major() {
        let mut canvas = Canvas::new();
        canvas.set_pixel(1, 0, Rgb::new(1, 2, 3)).unwrap();
        canvas.set_pixel(0, 1, Rgb::new(4, 5, 6)).unwrap();

        let rgb = canvas.to_rgb();
        assert_eq!(rgb.len(), FRAME_BYTES);
        assert_eq!(&rgb[3..6], &[1, 2, 3]);
        assert_eq!(&rgb[Canvas::WIDTH * 3..Canvas::WIDTH * 3 + 3], &[4, 5, 6]);
    }

    #[test]
    fn snapshot_is_detached_from_canvas() {
        let mut canvas = Canvas::new();
        canvas.set_pixel(10, 20, Rgb::BLUE).unwrap();
        let frame = canvas.snapshot();
        canvas.clear(Rgb::BLACK);

        assert_eq!(frame.pixel(10, 20).unwrap(), Rgb::BLUE);

        canvas.load(&frame);
        assert_eq!(canvas.get_pixel(10, 20).unwrap(), Rgb::BLUE);
        assert_eq!(canvas.cells_not(Rgb::BLACK).len(), 1);
    }

    #[test]
    fn frame_requires_full_payload() {
        assert!(matches!(
            Frame::from_rgb(vec![0; 12]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(Frame::from_rgb(vec![0; FRAME_BYTES]).is_ok());
    }
}
