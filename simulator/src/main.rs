#[macro_use]
extern crate tracing;

use image::RgbImage;
use monoio::{
    LegacyDriver, RuntimeBuilder,
    io::{AsyncReadRentExt, AsyncWriteRentExt},
    net::{TcpListener, TcpStream},
};
use pixmatrix_common::{
    Ack, AnimationAssembler, ControlCommand, FramePacket, HEIGHT, Packet, PacketHeader, WIDTH,
};
use std::{
    cell::RefCell,
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    path::{Path, PathBuf},
    rc::Rc,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

macro_rules! attempt {
    ($io:expr) => {{
        let (result, buf) = { $io };
        result?;
        buf
    }};
}

#[derive(argh::FromArgs)]
/// headless stand-in for a 64x64 pixel display
struct Args {
    #[argh(option, default = "8079")]
    /// port to listen on
    port: u16,

    #[argh(option)]
    /// write every finished animation frame as a PNG into this directory
    snapshot_dir: Option<PathBuf>,
}

/// Everything the simulated display shows, shared by all connections.
struct Screen {
    animations: AnimationAssembler,
    brightness: u8,
    text: Option<String>,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            animations: AnimationAssembler::new(),
            brightness: 100,
            text: None,
        }
    }
}

fn save_snapshot(dir: &Path, frame: &FramePacket) -> anyhow::Result<()> {
    let image = RgbImage::from_raw(WIDTH as u32, HEIGHT as u32, frame.pixels.clone())
        .ok_or_else(|| anyhow::anyhow!("frame has {} bytes", frame.pixels.len()))?;
    let path = dir.join(format!("pic{}_{:02}.png", frame.pic_id, frame.pic_offset));
    image.save(&path)?;
    trace!(path = %path.display(), "saved snapshot");
    Ok(())
}

fn apply(screen: &RefCell<Screen>, packet: Packet, snapshot_dir: Option<&Path>) -> Ack {
    let mut screen = screen.borrow_mut();

    match packet {
        Packet::Frame(frame) => {
            let (pic_id, offset) = (frame.pic_id, frame.pic_offset);
            match screen.animations.push(frame) {
                Ok(Some(frames)) => {
                    info!(pic_id, frames = frames.len(), "animation on screen");
                    if let Some(dir) = snapshot_dir {
                        for frame in frames {
                            if let Err(error) = save_snapshot(dir, frame) {
                                warn!(?error, "failed to save snapshot");
                            }
                        }
                    }
                }
                Ok(None) => debug!(pic_id, offset, "frame buffered"),
                Err(error) => {
                    warn!(%error, "dropping animation");
                    return Ack::MALFORMED;
                }
            }
        }
        Packet::Text(text) => {
            info!(x = text.x, y = text.y, color = %text.color, text = %text.text, "text on screen");
            if let Some(previous) = screen.text.replace(text.text) {
                debug!(%previous, "text replaced");
            }
        }
        Packet::Control(command) => {
            info!(?command, "control command");
            match command {
                ControlCommand::SetBrightness(level) => {
                    let previous = std::mem::replace(&mut screen.brightness, level);
                    debug!(previous, level, "brightness changed");
                }
                ControlCommand::Reboot => *screen = Screen::default(),
                _ => {}
            }
        }
    }

    Ack::OK
}

async fn handle_connection(
    mut stream: TcpStream,
    screen: Rc<RefCell<Screen>>,
    snapshot_dir: Option<Rc<Path>>,
) -> io::Result<()> {
    loop {
        let header = match stream.read_exact(Vec::with_capacity(PacketHeader::LEN)).await {
            (Ok(_), header) => header,
            (Err(error), _) if error.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            (Err(error), _) => return Err(error),
        };

        let header = match PacketHeader::parse(&header) {
            Ok(header) => header,
            Err(error) => {
                // framing is lost, so the connection cannot continue
                warn!(%error, "malformed header");
                attempt!(stream.write_all(Ack::MALFORMED.encode().to_vec()).await);
                return Ok(());
            }
        };

        let body = attempt!(
            stream
                .read_exact(Vec::with_capacity(header.body_len as usize))
                .await
        );

        let ack = match Packet::decode_body(header.kind, &body) {
            Ok(packet) => apply(&screen, packet, snapshot_dir.as_deref()),
            Err(error) => {
                warn!(%error, kind = ?header.kind, "malformed packet");
                Ack::MALFORMED
            }
        };

        attempt!(stream.write_all(ack.encode().to_vec()).await);
    }
}

async fn serve(listener: TcpListener, snapshot_dir: Option<PathBuf>) -> anyhow::Result<()> {
    let screen = Rc::new(RefCell::new(Screen::default()));
    let snapshot_dir: Option<Rc<Path>> = snapshot_dir.map(Rc::from);

    loop {
        let (stream, peer) = listener.accept().await?;
        stream.set_nodelay(true)?;
        debug!(%peer, "client connected");

        let screen = Rc::clone(&screen);
        let snapshot_dir = snapshot_dir.clone();
        monoio::spawn(async move {
            if let Err(error) = handle_connection(stream, screen, snapshot_dir).await {
                warn!(%peer, %error, "connection failed");
            }
            debug!(%peer, "client disconnected");
        });
    }
}

async fn listen(args: Args) -> anyhow::Result<()> {
    let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, args.port));
    let listener = TcpListener::bind(addr)?;
    info!(%addr, "simulator listening");

    serve(listener, args.snapshot_dir).await
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args: Args = argh::from_env();

    if let Some(dir) = &args.snapshot_dir {
        std::fs::create_dir_all(dir)?;
    }

    let mut runtime = RuntimeBuilder::<LegacyDriver>::new()
        .enable_timer()
        .build()?;

    runtime.block_on(listen(args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixmatrix::{
        Animation, Canvas, DeviceTransport, Endpoint, SimulatorBackend, TransportError,
        encoder::{self, EncodedFrame},
    };
    use pixmatrix_common::{FRAME_BYTES, Rgb, TextPacket};
    use std::{
        io::{Read, Write},
        time::Duration,
    };

    fn frame(pic_id: u32, pic_offset: u16, frame_count: u16) -> FramePacket {
        FramePacket {
            pic_id,
            pic_offset,
            frame_count,
            duration_ms: 100,
            pixels: vec![pic_offset as u8; FRAME_BYTES],
        }
    }

    #[test]
    fn completed_animation_is_accepted() {
        let screen = RefCell::new(Screen::default());
        for offset in 0..3 {
            let ack = apply(&screen, Packet::Frame(frame(4, offset, 3)), None);
            assert_eq!(ack, Ack::OK);
        }

        let screen = screen.borrow();
        assert!(!screen.animations.is_receiving());
        let offsets: Vec<u16> = screen
            .animations
            .current()
            .iter()
            .map(|frame| frame.pic_offset)
            .collect();
        assert_eq!(offsets, [0, 1, 2]);
    }

    #[test]
    fn out_of_order_frame_is_malformed() {
        let screen = RefCell::new(Screen::default());
        assert_eq!(apply(&screen, Packet::Frame(frame(4, 0, 3)), None), Ack::OK);
        assert_eq!(
            apply(&screen, Packet::Frame(frame(4, 2, 3)), None),
            Ack::MALFORMED
        );

        let screen = screen.borrow();
        assert!(!screen.animations.is_receiving());
        assert!(screen.animations.current().is_empty());
    }

    #[test]
    fn reboot_resets_screen() {
        let screen = RefCell::new(Screen::default());
        apply(&screen, Packet::Frame(frame(1, 0, 1)), None);
        apply(&screen, Packet::Control(ControlCommand::SetBrightness(20)), None);
        apply(
            &screen,
            Packet::Text(TextPacket {
                text_id: 1,
                x: 0,
                y: 40,
                color: Rgb::WHITE,
                font: 1,
                speed: 0,
                text_width: 64,
                text: "hello".into(),
            }),
            None,
        );
        {
            let screen = screen.borrow();
            assert_eq!(screen.brightness, 20);
            assert_eq!(screen.text.as_deref(), Some("hello"));
        }

        let ack = apply(&screen, Packet::Control(ControlCommand::Reboot), None);
        assert_eq!(ack, Ack::OK);

        let screen = screen.borrow();
        assert_eq!(screen.brightness, 100);
        assert_eq!(screen.text, None);
        assert!(screen.animations.current().is_empty());
    }

    #[test]
    fn finished_animation_is_saved_as_png() {
        let dir = std::env::temp_dir().join(format!("pixmatrix-snapshots-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let screen = RefCell::new(Screen::default());
        apply(&screen, Packet::Frame(frame(7, 0, 2)), Some(&dir));
        assert!(!dir.join("pic7_00.png").exists());
        apply(&screen, Packet::Frame(frame(7, 1, 2)), Some(&dir));

        for name in ["pic7_00.png", "pic7_01.png"] {
            let image = image::open(dir.join(name)).unwrap().to_rgb8();
            assert_eq!(image.dimensions(), (WIDTH as u32, HEIGHT as u32));
        }
        let second = image::open(dir.join("pic7_01.png")).unwrap().to_rgb8();
        assert_eq!(second.get_pixel(0, 0).0, [1, 1, 1]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    async fn serve_std(listener: std::net::TcpListener) -> anyhow::Result<()> {
        serve(TcpListener::from_std(listener)?, None).await
    }

    /// Run the simulator on an ephemeral port in its own thread.
    fn spawn_simulator() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let port = listener.local_addr().unwrap().port();

        std::thread::spawn(move || {
            let mut runtime = RuntimeBuilder::<LegacyDriver>::new()
                .enable_timer()
                .build()
                .unwrap();
            runtime.block_on(serve_std(listener)).unwrap();
        });

        port
    }

    #[test]
    fn backend_animation_roundtrip() {
        let port = spawn_simulator();
        let endpoint = Endpoint::Simulator { port };
        let mut backend = SimulatorBackend::connect(&endpoint, Duration::from_secs(5)).unwrap();

        let mut animation = Animation::new();
        for shade in [10u8, 20, 30] {
            animation
                .push_canvas(&Canvas::filled(Rgb::new(shade, 0, 0)), 100)
                .unwrap();
        }
        let encoded = encoder::encode_animation(&animation, 5).unwrap();
        assert_eq!(backend.send_frame(&encoded).unwrap(), Ack::OK);

        // a frame that does not continue any animation
        let stray = EncodedFrame::from_packets(&[Packet::Frame(frame(6, 1, 3))]).unwrap();
        assert!(matches!(
            backend.send_frame(&stray),
            Err(TransportError::Rejected(1))
        ));

        // the backend dials again and the simulator still accepts good frames
        assert_eq!(backend.send_frame(&encoded).unwrap(), Ack::OK);
        backend.close();
    }

    #[test]
    fn broken_header_is_rejected_and_closes() {
        let port = spawn_simulator();
        let mut stream = std::net::TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        stream.write_all(b"XX\x01\x01\x00\x00\x00\x00").unwrap();

        let mut ack = [0; Ack::LEN];
        stream.read_exact(&mut ack).unwrap();
        assert_eq!(Ack::parse(&ack).unwrap(), Ack::MALFORMED);

        let mut rest = Vec::new();
        assert_eq!(stream.read_to_end(&mut rest).unwrap(), 0);
    }
}
