use log::debug;

use crate::cache::ColorCache;
use crate::error::Error;
use crate::pixel::{Delta, Pixel, PixelGrid};

/// Longest run a single run opcode can describe.
pub const MAX_RUN: usize = 62;

const OP_RGB: u8 = 0b11111110;
const OP_RGBA: u8 = 0b11111111;
const OP_INDEX: u8 = 0b00000000;
const OP_DIFF: u8 = 0b01000000;
const OP_LUMA: u8 = 0b10000000;
const OP_RUN: u8 = 0b11000000;
const TAG_MASK: u8 = 0b11000000;

/// One unit of the opcode stream. Fields hold the biased, unsigned values
/// exactly as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpCode {
    Run(u8),
    Index(u8),
    Diff(u8, u8, u8),
    Luma(u8, u8, u8),
    Rgb(u8, u8, u8),
}

impl OpCode {
    /// Reads the opcode starting at `offset`. Returns `Ok(None)` when the
    /// stream is exhausted.
    fn from_bytes(bytes: &[u8], offset: usize) -> Result<Option<Self>, Error> {
        use OpCode::*;

        let Some(&first_byte) = bytes.get(offset) else {
            return Ok(None);
        };
        let op_code = match first_byte {
            OP_RGB => match bytes.get(offset + 1..offset + 4) {
                Some(&[r, g, b]) => Rgb(r, g, b),
                _ => return Err(Error::TruncatedStream { offset }),
            },
            OP_RGBA => {
                return Err(Error::UnsupportedOpcode {
                    opcode: first_byte,
                    offset,
                })
            }
            x if x & TAG_MASK == OP_INDEX => Index(x & 0b00111111),
            x if x & TAG_MASK == OP_DIFF => Diff(
                (x & 0b00110000) >> 4,
                (x & 0b00001100) >> 2,
                x & 0b00000011,
            ),
            x if x & TAG_MASK == OP_LUMA => {
                let second_byte = bytes
                    .get(offset + 1)
                    .ok_or(Error::TruncatedStream { offset })?;
                Luma(
                    x & 0b00111111,
                    (second_byte & 0b11110000) >> 4,
                    second_byte & 0b00001111,
                )
            }
            x => Run(x & 0b00111111),
        };
        Ok(Some(op_code))
    }

    fn write(self, bytes: &mut Vec<u8>) {
        use OpCode::*;
        match self {
            Rgb(r, g, b) => bytes.extend_from_slice(&[OP_RGB, r, g, b]),
            Run(run) => {
                // A biased run of 62 or 63 would collide with OP_RGB/OP_RGBA
                debug_assert!((run as usize) < MAX_RUN);
                bytes.push(OP_RUN | run)
            }
            Index(index) => {
                debug_assert!(index < 64);
                bytes.push(OP_INDEX | index)
            }
            Diff(dr, dg, db) => {
                debug_assert!(dr < 4 && dg < 4 && db < 4);
                bytes.push(OP_DIFF | (dr << 4) | (dg << 2) | db)
            }
            Luma(dg, dr_dg, db_dg) => {
                debug_assert!(dg < 64 && dr_dg < 16 && db_dg < 16);
                bytes.extend_from_slice(&[OP_LUMA | dg, (dr_dg << 4) | db_dg])
            }
        }
    }

    fn len(&self) -> usize {
        use OpCode::*;
        match self {
            Rgb(_, _, _) => 4,
            Luma(_, _, _) => 2,
            Run(_) | Index(_) | Diff(_, _, _) => 1,
        }
    }
}

/// State of a single encode pass.
struct Encoder {
    cache: ColorCache,
    previous_pixel: Pixel,
}

impl Encoder {
    fn new() -> Self {
        Self {
            cache: ColorCache::new(),
            previous_pixel: Pixel::BLACK,
        }
    }

    fn push(&mut self, pixels: &[Pixel]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(pixels.len());
        let mut position = 0;

        while let Some(&pixel) = pixels.get(position) {
            if position > 0 && pixel == self.previous_pixel {
                let run = self.run(&pixels[position..]);
                OpCode::Run((run - 1) as u8).write(&mut bytes);
                for _ in 0..run {
                    self.remember(pixel);
                }
                position += run;
                continue;
            }

            let delta = pixel.delta(&self.previous_pixel);
            self.diff(delta)
                .or_else(|| self.luma(delta))
                .or_else(|| self.index(&pixel))
                .unwrap_or_else(|| Self::rgb(&pixel))
                .write(&mut bytes);
            self.remember(pixel);
            position += 1;
        }

        bytes
    }

    /// Length of the run of pixels equal to the previous one at the start
    /// of `pixels`, capped at [`MAX_RUN`].
    fn run(&self, pixels: &[Pixel]) -> usize {
        pixels
            .iter()
            .take(MAX_RUN)
            .take_while(|&&pixel| pixel == self.previous_pixel)
            .count()
    }

    fn diff(&self, delta: Delta) -> Option<OpCode> {
        let fits = |d: i8| (-2..=1).contains(&d);
        if fits(delta.r) && fits(delta.g) && fits(delta.b) {
            Some(OpCode::Diff(
                (delta.r + 2) as u8,
                (delta.g + 2) as u8,
                (delta.b + 2) as u8,
            ))
        } else {
            None
        }
    }

    fn luma(&self, delta: Delta) -> Option<OpCode> {
        let (dr_dg, db_dg) = delta.chroma();
        let fits = |d: i16| (-8..=7).contains(&d);
        if (-32..=31).contains(&delta.g) && fits(dr_dg) && fits(db_dg) {
            Some(OpCode::Luma(
                (delta.g + 32) as u8,
                (dr_dg + 8) as u8,
                (db_dg + 8) as u8,
            ))
        } else {
            None
        }
    }

    /// Only hits on a slot that already holds this exact pixel. A miss
    /// emits nothing here; the slot is filled by `remember` afterwards.
    fn index(&self, pixel: &Pixel) -> Option<OpCode> {
        self.cache.find(pixel).map(OpCode::Index)
    }

    fn rgb(pixel: &Pixel) -> OpCode {
        OpCode::Rgb(pixel.r(), pixel.g(), pixel.b())
    }

    fn remember(&mut self, pixel: Pixel) {
        self.cache.insert(pixel);
        self.previous_pixel = pixel;
    }
}

/// State of a single decode pass. Mirrors [`Encoder`] update for update.
struct Decoder {
    cache: ColorCache,
    previous_pixel: Pixel,
}

impl Decoder {
    fn new() -> Self {
        Self {
            cache: ColorCache::new(),
            previous_pixel: Pixel::BLACK,
        }
    }

    fn push(&mut self, bytes: &[u8], pixel_count: usize) -> Result<Vec<Pixel>, Error> {
        // A single byte yields at most MAX_RUN pixels
        let capacity = pixel_count.min(bytes.len().saturating_mul(MAX_RUN));
        let mut pixels = Vec::with_capacity(capacity);
        let mut offset = 0;

        while pixels.len() < pixel_count {
            let op_code = OpCode::from_bytes(bytes, offset)?
                .ok_or(Error::TruncatedStream { offset })?;

            use OpCode::*;
            match op_code {
                Rgb(r, g, b) => self.emit(Pixel::new(r, g, b), &mut pixels),
                Index(index) => {
                    let pixel = self
                        .cache
                        .get(index)
                        .ok_or(Error::IndexNotPresent { index, offset })?;
                    self.emit(pixel, &mut pixels)
                }
                Diff(dr, dg, db) => self.emit(self.diff(dr, dg, db), &mut pixels),
                Luma(dg, dr_dg, db_dg) => self.emit(self.luma(dg, dr_dg, db_dg), &mut pixels),
                Run(run) => {
                    let run = run as usize + 1;
                    let remaining = pixel_count - pixels.len();
                    if run > remaining {
                        return Err(Error::RunOverflow {
                            run,
                            remaining,
                            offset,
                        });
                    }
                    for _ in 0..run {
                        self.emit(self.previous_pixel, &mut pixels);
                    }
                }
            }
            offset += op_code.len();
        }

        if offset < bytes.len() {
            return Err(Error::UnexpectedTrailingData {
                remaining: bytes.len() - offset,
            });
        }
        Ok(pixels)
    }

    fn emit(&mut self, pixel: Pixel, pixels: &mut Vec<Pixel>) {
        self.cache.insert(pixel);
        self.previous_pixel = pixel;
        pixels.push(pixel);
    }

    fn diff(&self, dr: u8, dg: u8, db: u8) -> Pixel {
        // The encoder stores each difference with a bias of 2
        self.previous_pixel.offset(Delta {
            r: dr as i8 - 2,
            g: dg as i8 - 2,
            b: db as i8 - 2,
        })
    }

    fn luma(&self, dg: u8, dr_dg: u8, db_dg: u8) -> Pixel {
        let g = dg as i8 - 32;
        self.previous_pixel.offset(Delta {
            r: g + (dr_dg as i8 - 8),
            g,
            b: g + (db_dg as i8 - 8),
        })
    }
}

/// Encodes `grid` into an opcode stream, without container framing.
pub fn encode(grid: &PixelGrid) -> Vec<u8> {
    encode_pixels(grid.pixels())
}

/// Encodes a row-major pixel sequence into an opcode stream.
pub fn encode_pixels(pixels: &[Pixel]) -> Vec<u8> {
    let bytes = Encoder::new().push(pixels);
    debug!(
        "encoded {} pixels into {} bytes ({:.1}% of raw)",
        pixels.len(),
        bytes.len(),
        percent_of_raw(bytes.len(), pixels.len())
    );
    bytes
}

/// Decodes an opcode stream that must describe exactly `pixel_count`
/// pixels and nothing more.
pub fn decode(bytes: &[u8], pixel_count: usize) -> Result<Vec<Pixel>, Error> {
    let pixels = Decoder::new().push(bytes, pixel_count)?;
    debug!("decoded {} bytes into {} pixels", bytes.len(), pixels.len());
    Ok(pixels)
}

/// Size of `encoded` bytes relative to the raw RGB size of `pixels` pixels.
pub fn percent_of_raw(encoded: usize, pixels: usize) -> f64 {
    if pixels == 0 {
        return 0.0;
    }
    encoded as f64 * 100.0 / (pixels as f64 * 3.0)
}
