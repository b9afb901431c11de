pub mod blur;
pub mod composite;
pub mod cpu;

/// Raw pixel readback of a composited slide.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}
