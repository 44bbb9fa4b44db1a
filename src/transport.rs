//! Backends frames are shipped to.
//!
//! [`NetworkBackend`] talks to a display on the network, [`SimulatorBackend`] to the simulator
//! on loopback. Both drive the same [`link::Link`], so a caller cannot tell them apart by
//! anything but the address they dial.

mod link;
mod network;
mod simulator;

pub use self::{network::NetworkBackend, simulator::SimulatorBackend};
pub use pixmatrix_common::Ack;

use crate::{
    config::Endpoint,
    encoder::EncodedFrame,
    error::{Result, TransportError},
};
use std::{net::SocketAddr, time::Duration};

pub trait DeviceTransport: Sized {
    /// Open a session with the peer behind `endpoint`.
    ///
    /// `timeout` bounds the connect and every later send.
    fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self>;

    /// Send every packet of `frame` and wait for their acknowledgements.
    fn send_frame(&mut self, frame: &EncodedFrame) -> Result<Ack, TransportError>;

    /// Release the connection. Sending afterwards fails with [`TransportError::Closed`].
    fn close(&mut self);

    fn peer(&self) -> SocketAddr;
}

/// Whichever backend the configured endpoint calls for.
pub enum Backend {
    Network(NetworkBackend),
    Simulator(SimulatorBackend),
}

impl DeviceTransport for Backend {
    fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self> {
        match endpoint {
            Endpoint::Device(..) => NetworkBackend::connect(endpoint, timeout).map(Self::Network),
            Endpoint::Simulator { .. } => {
                SimulatorBackend::connect(endpoint, timeout).map(Self::Simulator)
            }
        }
    }

    fn send_frame(&mut self, frame: &EncodedFrame) -> Result<Ack, TransportError> {
        match self {
            Self::Network(backend) => backend.send_frame(frame),
            Self::Simulator(backend) => backend.send_frame(frame),
        }
    }

    fn close(&mut self) {
        match self {
            Self::Network(backend) => backend.close(),
            Self::Simulator(backend) => backend.close(),
        }
    }

    fn peer(&self) -> SocketAddr {
        match self {
            Self::Network(backend) => backend.peer(),
            Self::Simulator(backend) => backend.peer(),
        }
    }
}
