use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use c64_core::prelude::AudioOut;
use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};

/// Number of samples over which to fade in/out (~5.8 ms at 44.1 kHz).
const FADE_SAMPLES: u32 = 256;

/// Ring capacity in whole 882-sample audio frames before `num_free_buffers`
/// reports backpressure to the core.
const RING_CAPACITY_FRAMES: usize = 8;
const FRAME_SAMPLES: usize = 882;

struct AudioPlayer {
    buffer: Arc<Mutex<VecDeque<i16>>>,
    fade_in_pos: u32,
    fading_out: Arc<AtomicBool>,
    fade_out_pos: u32,
}

impl AudioCallback for AudioPlayer {
    type Channel = i16;
    fn callback(&mut self, out: &mut [i16]) {
        let mut buf = self.buffer.lock().unwrap();
        for sample in out.iter_mut() {
            let raw = buf.pop_front().unwrap_or(0);

            if self.fade_in_pos < FADE_SAMPLES {
                let gain = self.fade_in_pos as f32 / FADE_SAMPLES as f32;
                *sample = (raw as f32 * gain) as i16;
                self.fade_in_pos += 1;
            } else if self.fading_out.load(Ordering::Relaxed) {
                if self.fade_out_pos < FADE_SAMPLES {
                    let gain = 1.0 - (self.fade_out_pos as f32 / FADE_SAMPLES as f32);
                    *sample = (raw as f32 * gain) as i16;
                    self.fade_out_pos += 1;
                } else {
                    *sample = 0;
                }
            } else {
                *sample = raw;
            }
        }
    }
}

/// The concrete [`AudioOut`] the frontend hands the core: an SDL2 playback
/// device fed through a shared ring buffer.
pub struct Audio {
    device: AudioDevice<AudioPlayer>,
    ring: Arc<Mutex<VecDeque<i16>>>,
    fade_out: Arc<AtomicBool>,
    resumed: bool,
}

impl Audio {
    pub fn new(sdl_audio: &sdl2::AudioSubsystem) -> Self {
        let ring = Arc::new(Mutex::new(VecDeque::with_capacity(RING_CAPACITY_FRAMES * FRAME_SAMPLES)));
        let fade_out = Arc::new(AtomicBool::new(false));

        let desired_spec = AudioSpecDesired {
            freq: Some(44100),
            channels: Some(1),
            samples: Some(512),
        };

        let device = sdl_audio
            .open_playback(None, &desired_spec, |_spec| AudioPlayer {
                buffer: Arc::clone(&ring),
                fade_in_pos: 0,
                fading_out: Arc::clone(&fade_out),
                fade_out_pos: 0,
            })
            .expect("Failed to open SDL audio device");

        Self { device, ring, fade_out, resumed: false }
    }

    /// Ramp the callback to silence and give it time to finish before the
    /// device is dropped.
    pub fn begin_shutdown(&self) {
        self.fade_out.store(true, Ordering::Relaxed);
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
}

impl AudioOut for Audio {
    fn num_free_buffers(&self) -> usize {
        let len = self.ring.lock().unwrap().len();
        RING_CAPACITY_FRAMES.saturating_sub(len / FRAME_SAMPLES)
    }

    fn queue_buffer(&mut self, samples: &[i16]) {
        self.ring.lock().unwrap().extend(samples.iter().copied());
        if !self.resumed {
            self.device.resume();
            self.resumed = true;
        }
    }
}
