use c64_core::prelude::PixelSink;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};

const NATIVE_WIDTH: u32 = 320;
const NATIVE_HEIGHT: u32 = 200;

pub struct Video {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
}

impl Video {
    pub fn new(sdl_video: &sdl2::VideoSubsystem, title: &str, scale: u32) -> Self {
        let window = sdl_video
            .window(title, NATIVE_WIDTH * scale, NATIVE_HEIGHT * scale)
            .position_centered()
            .build()
            .expect("Failed to create window");

        let canvas = window
            .into_canvas()
            .accelerated()
            .present_vsync()
            .build()
            .expect("Failed to create canvas");

        let texture_creator = canvas.texture_creator();

        Self { canvas, texture_creator }
    }
}

impl PixelSink for Video {
    /// `rgba` is 0xAARRGGBB per pixel, row `199 - y` holds scanline `y` (the
    /// core's framebuffer is bottom-up); SDL expects row 0 at the top of the
    /// window, so rows are flipped here rather than in the core.
    fn present(&mut self, rgba: &[u32; (NATIVE_WIDTH * NATIVE_HEIGHT) as usize]) {
        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::ARGB8888, NATIVE_WIDTH, NATIVE_HEIGHT)
            .expect("Failed to create texture");

        let mut flipped = [0u32; (NATIVE_WIDTH * NATIVE_HEIGHT) as usize];
        let w = NATIVE_WIDTH as usize;
        let h = NATIVE_HEIGHT as usize;
        for y in 0..h {
            let src = &rgba[(h - 1 - y) * w..(h - y) * w];
            flipped[y * w..(y + 1) * w].copy_from_slice(src);
        }

        let bytes: &[u8] = as_byte_slice(&flipped);
        texture
            .update(None, bytes, (NATIVE_WIDTH * 4) as usize)
            .expect("Failed to update texture");

        self.canvas.clear();
        self.canvas.copy(&texture, None, None).expect("Failed to copy texture");
        self.canvas.present();
    }
}

/// Reinterprets a `u32` pixel buffer as its little-endian byte
/// representation without an extra allocation.
fn as_byte_slice(pixels: &[u32; (NATIVE_WIDTH * NATIVE_HEIGHT) as usize]) -> &[u8] {
    // Safety: `u32` has no padding and this host is little-endian (the same
    // assumption the pixel format documented in `PixelSink` already makes).
    unsafe {
        std::slice::from_raw_parts(pixels.as_ptr() as *const u8, std::mem::size_of_val(pixels))
    }
}
