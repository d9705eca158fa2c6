#![allow(clippy::let_and_return)]
#![allow(non_local_definitions)]

pub mod engine;

pub mod library;

pub mod params;

pub mod pool;

pub mod voice;

mod audio_pipe;
pub use audio_pipe::*;

mod audio_stream;
pub use audio_stream::*;

pub mod helpers;
