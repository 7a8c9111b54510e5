use crate::bits;
use crate::framebuffer::{self, HEIGHT, WIDTH};
use log::info;
use pixels::{Pixels, SurfaceTexture};
use winit::window::Window;
use winit::{dpi::LogicalSize, event_loop::EventLoop, window::WindowBuilder};

const SCALE: f64 = 10.0;
const LIT: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];
const UNLIT: [u8; 4] = [0x00, 0x00, 0x00, 0xFF];

#[derive(thiserror::Error, Debug)]
pub enum DisplayError {
    #[error("failed to create window")]
    Window(#[from] winit::error::OsError),
    #[error("failed to render")]
    Pixels(#[from] pixels::Error),
}

/// A window showing the framebuffer, scaled up.
#[derive(Debug)]
pub struct Display {
    scratch_pixels: [u8; WIDTH * HEIGHT * 4], // RGBA
    _window: Window, // Keeps the window alive
    pixels: Pixels,
}

impl Display {
    pub fn new(event_loop: &EventLoop<()>) -> Result<Self, DisplayError> {
        let window = {
            let size = LogicalSize::new(WIDTH as u32, HEIGHT as u32);
            let scaled_size = LogicalSize::new(WIDTH as f64 * SCALE, HEIGHT as f64 * SCALE);
            WindowBuilder::new()
                .with_title("chipvm")
                .with_inner_size(scaled_size)
                .with_min_inner_size(size)
                .with_resizable(false)
                .build(event_loop)?
        };

        let pixels = {
            let size = window.inner_size();
            let texture = SurfaceTexture::new(size.width, size.height, &window);
            Pixels::new(WIDTH as u32, HEIGHT as u32, texture)?
        };

        info!("Attached display [{}x{}]", WIDTH, HEIGHT);
        Ok(Self {
            scratch_pixels: [0; WIDTH * HEIGHT * 4],
            _window: window,
            pixels,
        })
    }

    /// Unpacks `framebuffer` and presents it.
    pub fn show(&mut self, framebuffer: &[u8; framebuffer::BYTES]) -> Result<(), DisplayError> {
        unpack(framebuffer, &mut self.scratch_pixels);
        self.render()
    }

    /// Presents the last frame again.
    pub fn render(&mut self) -> Result<(), DisplayError> {
        self.draw();
        self.pixels.render()?;
        Ok(())
    }

    fn draw(&mut self) {
        let frame = self.pixels.get_frame_mut();
        for (pixel, scratch_pixel) in frame
            .chunks_exact_mut(4)
            .zip(self.scratch_pixels.chunks_exact(4))
        {
            pixel.copy_from_slice(scratch_pixel);
        }
    }
}

/// Expands one bit per pixel into RGBA.
fn unpack(packed: &[u8], rgba: &mut [u8]) {
    for (byte, chunk) in packed.iter().zip(rgba.chunks_exact_mut(8 * 4)) {
        for (n, pixel) in chunk.chunks_exact_mut(4).enumerate() {
            let lit = bits::set(7 - n as u8, *byte);
            pixel.copy_from_slice(if lit { &LIT } else { &UNLIT });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_expands_msb_first() {
        let mut rgba = [0; 16 * 4];
        unpack(&[0b1000_0000, 0b0000_0001], &mut rgba);
        assert_eq!(&rgba[..4], &LIT);
        assert_eq!(&rgba[4..8], &UNLIT);
        assert_eq!(&rgba[15 * 4..], &LIT);
        assert_eq!(&rgba[14 * 4..15 * 4], &UNLIT);
    }
}
