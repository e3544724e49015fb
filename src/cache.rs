use crate::pixel::Pixel;

pub const CACHE_SLOTS: usize = 64;

/// Slot of `pixel` in the color cache.
pub fn hash(pixel: &Pixel) -> u8 {
    ((pixel.r() as u16 * 3 + pixel.g() as u16 * 5 + pixel.b() as u16 * 7) % CACHE_SLOTS as u16)
        as u8
}

/// Direct-mapped table of recently seen pixels.
///
/// A fresh cache is created for every encode and decode pass; the encoder and
/// the decoder each update their own copy with the same rule, so both hold
/// identical contents after the same pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorCache {
    slots: [Option<Pixel>; CACHE_SLOTS],
}

impl ColorCache {
    pub fn new() -> Self {
        Self {
            slots: [None; CACHE_SLOTS],
        }
    }

    pub fn get(&self, index: u8) -> Option<Pixel> {
        self.slots.get(index as usize).copied().flatten()
    }

    /// Slot holding exactly `pixel`, if any.
    pub fn find(&self, pixel: &Pixel) -> Option<u8> {
        let index = hash(pixel);
        match self.get(index) {
            Some(seen) if seen == *pixel => Some(index),
            _ => None,
        }
    }

    /// Stores `pixel` in its slot, evicting whatever was there.
    pub fn insert(&mut self, pixel: Pixel) -> u8 {
        let index = hash(&pixel);
        self.slots[index as usize] = Some(pixel);
        index
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for ColorCache {
    fn default() -> Self {
        Self::new()
    }
}
