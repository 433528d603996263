pub mod wave;

pub use wave::{NewWave, WaveRecord, WaveStatus};
