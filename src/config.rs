use crate::error::Error;
use pixmatrix_common::Rgb;
use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    str::FromStr,
    time::Duration,
};

/// Port the simulator listens on.
pub const SIMULATOR_PORT: u16 = 8079;

/// Port assumed when a device address has none.
pub const DEVICE_PORT: u16 = 80;

/// Where frames are sent.
///
/// Parses from `simulator`, `simulator:PORT`, `IP` or `IP:PORT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Device(SocketAddr),
    Simulator { port: u16 },
}

impl Endpoint {
    pub const fn simulator() -> Self {
        Self::Simulator {
            port: SIMULATOR_PORT,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        match *self {
            Self::Device(addr) => addr,
            Self::Simulator { port } => SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port),
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::simulator()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(addr) => write!(f, "{addr}"),
            Self::Simulator { port } => write!(f, "simulator:{port}"),
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("simulator") {
            let port = match rest.strip_prefix(':') {
                Some(port) => port
                    .parse()
                    .map_err(|_| Error::invalid(format!("invalid simulator port in {s:?}")))?,
                None if rest.is_empty() => SIMULATOR_PORT,
                None => return Err(Error::invalid(format!("unknown endpoint {s:?}"))),
            };

            return Ok(Self::Simulator { port });
        }

        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Ok(Self::Device(addr));
        }

        s.parse::<IpAddr>()
            .map(|ip| Self::Device(SocketAddr::new(ip, DEVICE_PORT)))
            .map_err(|_| Error::invalid(format!("unknown endpoint {s:?}")))
    }
}

/// How [`Session::display_text`](crate::Session::display_text) renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextMode {
    /// Rasterize with the built-in font and push the canvas
    #[default]
    Raster,
    /// Let the display render the text with its own font
    Native,
}

impl FromStr for TextMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raster" => Ok(Self::Raster),
            "native" => Ok(Self::Native),
            other => Err(Error::invalid(format!("unknown text mode {other:?}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextStyle {
    pub x: i32,
    pub y: i32,
    pub color: Rgb,
    /// Font index for native rendering
    pub font: u8,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            x: 0,
            y: 40,
            color: Rgb::WHITE,
            font: 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub endpoint: Endpoint,
    /// Bound on connecting and on every send
    pub timeout: Duration,
    /// Last pic id considered used; the first push gets the next one
    pub initial_pic_id: u32,
    pub frame_duration_ms: u16,
    pub text_style: TextStyle,
    pub text_mode: TextMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            timeout: Duration::from_secs(5),
            initial_pic_id: 0,
            frame_duration_ms: 100,
            text_style: TextStyle::default(),
            text_mode: TextMode::default(),
        }
    }
}
