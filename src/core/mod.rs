pub mod bit_coder;
pub mod mesh;
pub mod mixing;
pub mod progress;
pub mod shared;
