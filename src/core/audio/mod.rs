pub mod wav;

pub use wav::{merge_chunks, parse_wav, write_wav, WavParams};
