use super::{DeviceTransport, link::Link};
use crate::{
    config::Endpoint,
    encoder::EncodedFrame,
    error::{Error, Result, TransportError},
};
use pixmatrix_common::Ack;
use std::{net::SocketAddr, time::Duration};

/// The simulator process on loopback.
pub struct SimulatorBackend {
    link: Link,
}

impl DeviceTransport for SimulatorBackend {
    fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self> {
        if !matches!(endpoint, Endpoint::Simulator { .. }) {
            return Err(Error::invalid(format!(
                "simulator backend needs a simulator endpoint, got {endpoint}"
            )));
        }

        Link::open(endpoint.addr(), timeout).map(|link| Self { link })
    }

    fn send_frame(&mut self, frame: &EncodedFrame) -> Result<Ack, TransportError> {
        self.link.send(frame)
    }

    fn close(&mut self) {
        self.link.close();
    }

    fn peer(&self) -> SocketAddr {
        self.link.peer()
    }
}
