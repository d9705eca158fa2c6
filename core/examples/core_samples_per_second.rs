use std::{sync::Arc, time::Instant};

use polysampler_core::{
    engine::{SamplerConfig, SamplerEngine},
    library::{SampleEntry, SampleLibrary},
    pool::NoteEvent,
    voice::Interpolator,
    AudioPipe, AudioStreamParams,
};

pub fn main() {
    let args = std::env::args().collect::<Vec<String>>();
    let voice_count = args
        .get(1)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(128);

    let stream_params = AudioStreamParams::new(48000, 2);

    println!("Building sample library...");

    let pcm: Vec<f32> = (0..48000 * 20)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 48000.0).sin() * 0.1)
        .collect();
    let library = Arc::new(
        SampleLibrary::build([SampleEntry::mono("sine", 69, 0..=127, pcm, 48000)
            .with_max_duration(20.0)])
        .unwrap(),
    );

    println!("Initializing engine");

    let mut engine = SamplerEngine::new(
        library,
        SamplerConfig {
            voice_count,
            interpolator: Interpolator::Nearest,
            ..Default::default()
        },
    )
    .unwrap();
    engine.prepare(stream_params, 4800);

    for i in 0..voice_count {
        engine.process_event(NoteEvent::NoteOn {
            key: (i % 128) as u8,
            vel: 1.0,
        });
    }

    let mut buffer = vec![0.0; 4800];
    engine.read_samples(&mut buffer);

    println!("Running bench with {} voices", voice_count);
    println!("Voice count: {}", engine.get_stats().voice_count());

    let now = Instant::now();
    let loops = 10;
    for _ in 0..loops {
        engine.read_samples(&mut buffer);
    }

    println!("Render time: {} seconds", now.elapsed().as_secs_f64());

    let samples_rendered = voice_count as u64 * buffer.len() as u64 * loops;
    let seconds = now.elapsed().as_secs_f64();
    let samples_per_second = samples_rendered as f64 / seconds;

    println!("Samples per second: {}", samples_per_second);
}
