use crate::bits;
use log::trace;

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;
/// Packed size: one bit per pixel, eight pixels per byte.
pub const BYTES: usize = WIDTH * HEIGHT / 8;

const ROW_BYTES: usize = WIDTH / 8;

wrapper! {
    PackedPixels => BYTES
}

/// The 64x32 monochrome display, row-major, most significant bit leftmost.
///
/// Every mutation raises a one-shot `changed` flag which [`take_changed`]
/// reads and clears.
///
/// [`take_changed`]: Framebuffer::take_changed
#[derive(Debug, Clone, Default)]
pub struct Framebuffer {
    pixels: PackedPixels,
    changed: bool,
}

impl Framebuffer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn clear(&mut self) {
        self.pixels = PackedPixels::default();
        self.changed = true;
    }

    /// Whether the pixel at (x, y) is lit. Coordinates wrap.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let (idx, bit) = Self::locate(x, y);
        bits::set(bit, self.pixels[idx])
    }

    /// XORs one 8-pixel sprite row onto the display at (x, y), wrapping at
    /// the edges. Returns true if any lit pixel was turned off.
    pub fn draw_row(&mut self, x: usize, y: usize, sprite: u8) -> bool {
        let mut collision = false;
        for column in 0..8 {
            if !bits::set(7 - column as u8, sprite) {
                continue;
            }
            let (idx, bit) = Self::locate(x + column, y);
            let mask = 1 << bit;
            if self.pixels[idx] & mask != 0 {
                collision = true;
            }
            self.pixels[idx] ^= mask;
            trace!("Flipped pixel at ({}, {})", (x + column) % WIDTH, y % HEIGHT);
        }
        self.changed = true;
        collision
    }

    /// Flags the display as changed without touching any pixel.
    pub fn touch(&mut self) {
        self.changed = true;
    }

    /// Returns whether the display changed since the last call, then resets.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn as_bytes(&self) -> &[u8; BYTES] {
        &self.pixels
    }

    fn locate(x: usize, y: usize) -> (usize, u8) {
        let x = x % WIDTH;
        let y = y % HEIGHT;
        (y * ROW_BYTES + x / 8, 7 - (x % 8) as u8)
    }
}
