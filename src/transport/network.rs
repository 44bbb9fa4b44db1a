use super::{DeviceTransport, link::Link};
use crate::{
    config::Endpoint,
    encoder::EncodedFrame,
    error::{Error, Result, TransportError},
};
use pixmatrix_common::Ack;
use std::{net::SocketAddr, time::Duration};

/// A physical display reachable over the network.
pub struct NetworkBackend {
    link: Link,
}

impl DeviceTransport for NetworkBackend {
    fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self> {
        let Endpoint::Device(addr) = *endpoint else {
            return Err(Error::invalid(format!(
                "network backend needs a device address, got {endpoint}"
            )));
        };

        Link::open(addr, timeout).map(|link| Self { link })
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
