use super::{DISPLAY_X, DISPLAY_Y, Grid};

/// The 64x32 monochrome framebuffer.
///
/// Only the processor mutates it; renderers get `&DisplayBuffer` or a
/// [`snapshot`](DisplayBuffer::snapshot) copy, so a draw instruction is never
/// observed half-applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayBuffer {
    pixels: Grid<bool>,
}

impl DisplayBuffer {
    pub fn new() -> Self {
        Self {
            pixels: [[false; DISPLAY_X]; DISPLAY_Y],
        }
    }

    /// Turns every pixel off.
    pub fn clear(&mut self) {
        self.pixels = [[false; DISPLAY_X]; DISPLAY_Y];
    }

    /// Get the state of a pixel (true = on). Coordinates wrap around the edges.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[y % DISPLAY_Y][x % DISPLAY_X]
    }

    /// XORs a sprite bit into the pixel at `(x, y)`, wrapping around the edges.
    ///
    /// Returns true on collision: the pixel was on and the sprite bit was set.
    pub(crate) fn xor_pixel(&mut self, x: usize, y: usize, sprite_bit: bool) -> bool {
        let pixel = &mut self.pixels[y % DISPLAY_Y][x % DISPLAY_X];
        let old = *pixel;
        *pixel = old ^ sprite_bit;
        old && sprite_bit
    }

    pub fn rows(&self) -> &Grid<bool> {
        &self.pixels
    }

    /// Copies out the whole grid, e.g. to hand to a render thread.
    pub fn snapshot(&self) -> Grid<bool> {
        self.pixels
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().flatten().filter(|&&p| p).count()
    }
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}
