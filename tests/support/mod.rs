use pixmatrix_common::{Ack, PacketHeader};
use std::{
    io::{ErrorKind, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    thread::{self, JoinHandle},
};

#[derive(Clone, Copy)]
pub enum Reply {
    Status(u8),
    /// Read everything, never answer
    Silent,
}

/// Blocking stand-in for a display.
///
/// Serves `connections` connections one after another and records every packet it read.
pub struct MockPeer {
    addr: SocketAddr,
    handle: JoinHandle<Vec<u8>>,
}

impl MockPeer {
    pub fn spawn(reply: Reply, connections: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut received = Vec::new();
            for _ in 0..connections {
                let (stream, _) = listener.accept().unwrap();
                serve(stream, reply, &mut received);
            }
            received
        });

        Self { addr, handle }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Wait for the peer to see its last connection close and return what it read.
    pub fn finish(self) -> Vec<u8> {
        self.handle.join().unwrap()
    }
}

fn serve(mut stream: TcpStream, reply: Reply, received: &mut Vec<u8>) {
    loop {
        let mut header = [0; PacketHeader::LEN];
        match stream.read_exact(&mut header) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return,
            Err(err) if err.kind() == ErrorKind::ConnectionReset => return,
            Err(err) => panic!("mock peer read failed: {err}"),
        }

        let parsed = PacketHeader::parse(&header).unwrap();
        let mut body = vec![0; parsed.body_len as usize];
        if stream.read_exact(&mut body).is_err() {
            return;
        }

        received.extend_from_slice(&header);
        received.extend_from_slice(&body);

        if let Reply::Status(status) = reply {
            if stream.write_all(&Ack { status }.encode()).is_err() {
                return;
            }
        }
    }
}

/// An address nothing listens on.
pub fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}
