//! Drawing client for 64x64 RGB pixel displays.
//!
//! Shapes are rasterized onto a local [`Canvas`]; a [`Session`] encodes it and ships the frame
//! to either a networked display or the simulator. Both backends speak the same protocol, see
//! [`pixmatrix_common::packet`].

#[macro_use]
extern crate tracing;

pub mod animation;
pub mod canvas;
pub mod config;
pub mod encoder;
pub mod error;
pub mod glyph;
pub mod raster;
pub mod session;
pub mod transport;

pub use self::{
    animation::{Animation, AnimationFrame},
    canvas::{Canvas, Frame},
    config::{Endpoint, SessionConfig, TextMode, TextStyle},
    encoder::EncodedFrame,
    error::{Error, Result, TransportError},
    raster::ShapeStyle,
    session::{Session, TextOutcome},
    transport::{Ack, Backend, DeviceTransport, NetworkBackend, SimulatorBackend},
};
pub use pixmatrix_common::Rgb;
