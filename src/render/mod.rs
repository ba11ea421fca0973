//! Visualization of analysed clips

pub mod waveform;

pub use waveform::{render_base64, render_image, render_png, PLOT_HEIGHT, PLOT_WIDTH};
