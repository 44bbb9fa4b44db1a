use crate::{
    encoder::EncodedFrame,
    error::{Error, Result, TransportError},
};
use monoio::{
    LegacyDriver, Runtime, RuntimeBuilder,
    io::{AsyncReadRentExt, AsyncWriteRent, AsyncWriteRentExt},
    net::TcpStream,
    time::TimeDriver,
};
use pixmatrix_common::Ack;
use std::{io, net::SocketAddr, time::Duration};

type Driver = TimeDriver<LegacyDriver>;

macro_rules! attempt {
    ($io:expr) => {{
        let (result, buf) = { $io };
        result?;
        buf
    }};
}

enum State {
    Open(TcpStream),
    /// The last send failed; the next one dials again
    Broken,
    Closed,
}

/// Blocking, timeout-bounded packet exchange with one peer.
///
/// Owns a current-thread runtime so callers never see async code. Sockets are only ever
/// dropped inside that runtime.
pub(crate) struct Link {
    runtime: Runtime<Driver>,
    state: State,
    peer: SocketAddr,
    timeout: Duration,
}

async fn connect(addr: SocketAddr) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

async fn dial(addr: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
    match monoio::time::timeout(timeout, connect(addr)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("no connection within {timeout:?}"),
        )),
    }
}

async fn exchange(
    stream: &mut TcpStream,
    bytes: Vec<u8>,
    packets: usize,
) -> Result<Ack, TransportError> {
    attempt!(stream.write_all(bytes).await);
    stream.flush().await?;

    let mut last = Ack::OK;
    for _ in 0..packets {
        let buf = attempt!(stream.read_exact(Vec::with_capacity(Ack::LEN)).await);
        let ack = Ack::parse(&buf)?;
        if !ack.is_ok() {
            return Err(TransportError::Rejected(ack.status));
        }
        last = ack;
    }

    Ok(last)
}

impl Link {
    pub(crate) fn open(peer: SocketAddr, timeout: Duration) -> Result<Self> {
        let connection_error = |source| Error::Connection {
            endpoint: peer.to_string(),
            source,
        };

        let mut runtime = RuntimeBuilder::<Driver>::new()
            .build()
            .map_err(connection_error)?;
        let stream = runtime
            .block_on(dial(peer, timeout))
            .map_err(connection_error)?;

        info!(%peer, "connected");

        Ok(Self {
            runtime,
            state: State::Open(stream),
            peer,
            timeout,
        })
    }

    pub(crate) fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub(crate) fn send(&mut self, frame: &EncodedFrame) -> Result<Ack, TransportError> {
        let (peer, timeout) = (self.peer, self.timeout);

        let mut stream = match std::mem::replace(&mut self.state, State::Broken) {
            State::Open(stream) => stream,
            State::Broken => {
                debug!(%peer, "dialing again after a failed send");
                self.runtime.block_on(dial(peer, timeout))?
            }
            State::Closed => {
                self.state = State::Closed;
                return Err(TransportError::Closed);
            }
        };

        let bytes = frame.bytes().to_vec();
        let packets = frame.packets();
        trace!(%peer, packets, len = bytes.len(), "sending");

        let outcome = self.runtime.block_on(async move {
            let result = match monoio::time::timeout(timeout, exchange(&mut stream, bytes, packets))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(timeout)),
            };
            result.map(|ack| (ack, stream))
        });

        match outcome {
            Ok((ack, stream)) => {
                self.state = State::Open(stream);
                Ok(ack)
            }
            Err(error) => {
                warn!(%peer, ?error, "send failed, dropping connection");
                Err(error)
            }
        }
    }

    pub(crate) fn close(&mut self) {
        if let State::Open(stream) = std::mem::replace(&mut self.state, State::Closed) {
            self.runtime.block_on(async move { drop(stream) });
            info!(peer = %self.peer, "connection closed");
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.close();
    }
}
