use std::{sync::Arc, time::Duration};

use polysampler_core::library::{SampleEntry, SampleLibrary};
use polysampler_realtime::{RealtimeConfig, RealtimeSampler};

fn decaying_sine(frequency: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let len = (sample_rate as f32 * seconds) as usize;
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (t * frequency * std::f32::consts::TAU).sin() * (-t * 3.0).exp() * 0.3
        })
        .collect()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // A4 covers the octave around it, lower and higher notes get their own sample
    let library = SampleLibrary::build([
        SampleEntry::mono("a3", 57, 45..=62, decaying_sine(220.0, 48000, 2.0), 48000),
        SampleEntry::mono("a4", 69, 63..=74, decaying_sine(440.0, 48000, 2.0), 48000)
            .with_release(0.3),
        SampleEntry::mono("a5", 81, 75..=93, decaying_sine(880.0, 48000, 2.0), 48000),
    ])
    .unwrap();

    let sampler =
        RealtimeSampler::open_with_default_output(Arc::new(library), RealtimeConfig::default())
            .unwrap();
    let sender = sampler.get_sender();
    let stats = sampler.get_stats();

    for key in [60u8, 62, 64, 65, 67, 69, 71, 72, 76, 79, 84] {
        sender.send_midi(&[0x90, key, 100]);
        std::thread::sleep(Duration::from_millis(250));
        println!("Voice count: {}", stats.voice_count());
        sender.send_midi(&[0x80, key, 0]);
    }

    // Chord held through the sustain pedal
    sender.send_midi(&[0xB0, 64, 127]);
    for key in [60u8, 64, 67, 72] {
        sender.send_midi(&[0x90, key, 90]);
        sender.send_midi(&[0x80, key, 0]);
    }
    std::thread::sleep(Duration::from_millis(1000));
    println!("Sounding notes: {:?}", stats.sounding_notes().iter().collect::<Vec<_>>());
    sender.send_midi(&[0xB0, 64, 0]);

    std::thread::sleep(Duration::from_millis(1000));
}
