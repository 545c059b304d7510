use c64_core::prelude::{Machine, PixelSink};
use sdl2::event::Event;

use crate::audio::Audio;
use crate::input;
use crate::overlay;
use crate::video::Video;

const TARGET_FRAME: std::time::Duration = std::time::Duration::from_micros(1_000_000 / 50);

/// Wraps [`Video`] to stamp an FPS counter onto the frame before it's
/// presented, without the core needing to know overlays exist.
struct OverlaySink<'a> {
    video: &'a mut Video,
    fps_text: &'a str,
}

impl PixelSink for OverlaySink<'_> {
    fn present(&mut self, rgba: &[u32; 320 * 200]) {
        let mut frame = *rgba;
        overlay::draw_fps(&mut frame, 320, 200, self.fps_text);
        self.video.present(&frame);
    }
}

pub fn run(machine: &mut Machine, scale: u32) {
    let sdl_context = sdl2::init().expect("Failed to initialize SDL2");
    let sdl_video = sdl_context.video().expect("Failed to init SDL video");
    let sdl_audio = sdl_context.audio().expect("Failed to init SDL audio");

    let mut video = Video::new(&sdl_video, "C64", scale);
    let mut audio = Audio::new(&sdl_audio);
    let mut event_pump = sdl_context.event_pump().expect("Failed to get event pump");

    let mut frame_count: u64 = 0;
    let mut last_fps_tick = std::time::Instant::now();
    let mut fps_text = String::from("--");

    'main: loop {
        let frame_start = std::time::Instant::now();

        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } => break 'main,
                Event::KeyDown { scancode: Some(sc), repeat: false, .. } => {
                    if let Some(code) = input::key_code(sc) {
                        machine.handle_key(code, true);
                    }
                }
                Event::KeyUp { scancode: Some(sc), .. } => {
                    if let Some(code) = input::key_code(sc) {
                        machine.handle_key(code, false);
                    }
                }
                _ => {}
            }
        }

        let mut sink = OverlaySink { video: &mut video, fps_text: &fps_text };
        machine.update(&mut sink);
        machine.queue_audio(&mut audio);

        frame_count += 1;
        let elapsed_since_tick = last_fps_tick.elapsed();
        if elapsed_since_tick >= std::time::Duration::from_secs(1) {
            let fps = frame_count as f64 / elapsed_since_tick.as_secs_f64();
            log::debug!("{fps:.1} fps");
            fps_text = format!("{fps:.0}");
            frame_count = 0;
            last_fps_tick = std::time::Instant::now();
        }

        if machine.jammed() {
            log::warn!("CPU jammed on an illegal opcode; reset to continue");
        }

        let elapsed = frame_start.elapsed();
        if elapsed < TARGET_FRAME {
            std::thread::sleep(TARGET_FRAME - elapsed);
        }
    }

    audio.begin_shutdown();
}
