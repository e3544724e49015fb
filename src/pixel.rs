use crate::error::Error;

/// Number of channels every pixel carries.
pub const CHANNELS: u8 = 3;

/// An 8-bit RGB pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pixel([u8; 3]);

impl Pixel {
    /// The value the previous-pixel register holds before the first pixel.
    pub const BLACK: Pixel = Pixel([0, 0, 0]);

    pub const fn new(r: u8, g: u8, b: u8) -> Pixel {
        Pixel([r, g, b])
    }

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Per-channel difference from `previous`, wrapping modulo 256 so that
    /// e.g. 255 -> 0 is a step of +1.
    pub fn delta(&self, previous: &Pixel) -> Delta {
        Delta {
            r: self.r().wrapping_sub(previous.r()) as i8,
            g: self.g().wrapping_sub(previous.g()) as i8,
            b: self.b().wrapping_sub(previous.b()) as i8,
        }
    }

    /// Inverse of [`Pixel::delta`].
    pub fn offset(&self, delta: Delta) -> Pixel {
        Pixel::new(
            self.r().wrapping_add(delta.r as u8),
            self.g().wrapping_add(delta.g as u8),
            self.b().wrapping_add(delta.b as u8),
        )
    }
}

impl From<[u8; 3]> for Pixel {
    fn from(channels: [u8; 3]) -> Self {
        Pixel(channels)
    }
}

impl From<Pixel> for [u8; 3] {
    fn from(pixel: Pixel) -> Self {
        pixel.0
    }
}

/// Signed per-channel difference between two consecutive pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delta {
    pub r: i8,
    pub g: i8,
    pub b: i8,
}

impl Delta {
    /// Red and blue relative to green, as used by the luma opcode.
    pub fn chroma(&self) -> (i16, i16) {
        (
            self.r as i16 - self.g as i16,
            self.b as i16 - self.g as i16,
        )
    }
}

/// A row-major, top-to-bottom image of RGB pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl PixelGrid {
    pub fn new(width: u32, height: u32, pixels: Vec<Pixel>) -> Result<Self, Error> {
        let expected = (width as usize).checked_mul(height as usize);
        if expected != Some(pixels.len()) {
            return Err(Error::DimensionMismatch {
                width,
                height,
                pixels: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<Pixel> {
        self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize)
    }

    pub fn rows(&self) -> impl DoubleEndedIterator<Item = &[Pixel]> {
        // chunks() rejects a zero size
        self.pixels.chunks(self.width.max(1) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_wraps() {
        let previous = Pixel::new(255, 0, 10);
        let pixel = Pixel::new(0, 255, 10);

        let delta = pixel.delta(&previous);
        assert_eq!(delta, Delta { r: 1, g: -1, b: 0 });
        assert_eq!(previous.offset(delta), pixel);
    }

    #[test]
    fn test_chroma() {
        let delta = Pixel::new(42, 50, 57).delta(&Pixel::new(10, 20, 30));
        assert_eq!(delta, Delta { r: 32, g: 30, b: 27 });
        assert_eq!(delta.chroma(), (2, -3));
    }

    #[test]
    fn test_grid_rejects_wrong_length() {
        let pixels = vec![Pixel::BLACK; 5];
        assert!(matches!(
            PixelGrid::new(2, 3, pixels),
            Err(Error::DimensionMismatch {
                width: 2,
                height: 3,
                pixels: 5
            })
        ));
    }

    #[test]
    fn test_grid_indexing() {
        let pixels = (0..6).map(|i| Pixel::new(i, i, i)).collect();
        let grid = PixelGrid::new(3, 2, pixels).unwrap();

        assert_eq!(grid.get(2, 1), Some(&Pixel::new(5, 5, 5)));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.rows().count(), 2);
    }

    #[test]
    fn test_empty_grid() {
        let grid = PixelGrid::new(0, 7, vec![]).unwrap();
        assert_eq!(grid.rows().count(), 0);
    }
}
