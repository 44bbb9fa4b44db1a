use crate::{
    animation::Animation,
    canvas::Canvas,
    config::{SessionConfig, TextMode, TextStyle},
    encoder::{self, EncodedFrame},
    error::{Error, Result},
    glyph::{self, Area},
    raster::{self, ShapeStyle},
    transport::{Ack, Backend, DeviceTransport},
};
use pixmatrix_common::{ControlCommand, Rgb, TextPacket};

/// What [`Session::display_text`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextOutcome {
    pub mode: TextMode,
    /// Canvas cells the text covers, only known when rasterized
    pub area: Option<Area>,
    /// Some of the text did not fit and was cut off.
    ///
    /// In [`TextMode::Native`] the display renders with its own font, so this is an estimate
    /// from the built-in font's metrics against the packet's text width.
    pub clipped: bool,
    pub ack: Ack,
}

/// One display, its canvas and the connection to it.
///
/// Drawing calls only touch the local canvas; nothing reaches the display until [`push`],
/// [`display_animation`] or [`display_text`] is called.
///
/// [`push`]: Session::push
/// [`display_animation`]: Session::display_animation
/// [`display_text`]: Session::display_text
pub struct Session<T = Backend> {
    canvas: Canvas,
    transport: T,
    last_pic_id: u32,
    frame_duration_ms: u16,
    text_style: TextStyle,
    text_mode: TextMode,
}

impl Session<Backend> {
    /// Connect to the backend the configured endpoint names.
    pub fn connect(config: &SessionConfig) -> Result<Self> {
        let transport = Backend::connect(&config.endpoint, config.timeout)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T> Session<T>
where
    T: DeviceTransport,
{
    pub fn with_transport(transport: T, config: &SessionConfig) -> Self {
        Self {
            canvas: Canvas::new(),
            transport,
            last_pic_id: config.initial_pic_id,
            frame_duration_ms: config.frame_duration_ms,
            text_style: config.text_style,
            text_mode: config.text_mode,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn set_text_style(&mut self, style: TextStyle) {
        self.text_style = style;
    }

    pub fn set_text_mode(&mut self, mode: TextMode) {
        self.text_mode = mode;
    }

    fn next_pic_id(&mut self) -> u32 {
        self.last_pic_id = self.last_pic_id.wrapping_add(1);
        self.last_pic_id
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<()> {
        self.canvas.set_pixel(x, y, color)
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Result<Rgb> {
        self.canvas.get_pixel(x, y)
    }

    pub fn clear(&mut self, color: Rgb) {
        self.canvas.clear(color);
    }

    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb) {
        raster::draw_line(&mut self.canvas, x0, y0, x1, y1, color);
    }

    pub fn draw_circle(
        &mut self,
        cx: i32,
        cy: i32,
        radius: i32,
        style: impl Into<ShapeStyle>,
    ) -> Result<()> {
        raster::draw_circle(&mut self.canvas, cx, cy, radius, style.into())
    }

    pub fn draw_rectangle(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
        style: impl Into<ShapeStyle>,
    ) {
        raster::draw_rectangle(&mut self.canvas, x0, y0, x1, y1, style.into());
    }

    /// Send already encoded packets as they are.
    ///
    /// Encoded frames are deterministic, so a frame whose send failed can be passed here again.
    pub fn send(&mut self, frame: &EncodedFrame) -> Result<Ack> {
        Ok(self.transport.send_frame(frame)?)
    }

    /// Encode the canvas as a one-frame animation without sending it.
    pub fn encode(&mut self, pic_id: Option<u32>) -> EncodedFrame {
        let pic_id = pic_id.unwrap_or_else(|| self.next_pic_id());
        encoder::encode_canvas(&self.canvas, pic_id, self.frame_duration_ms)
    }

    /// Show the canvas on the display.
    ///
    /// Without an explicit `pic_id` the session's counter supplies the next one.
    pub fn push(&mut self, pic_id: Option<u32>) -> Result<Ack> {
        let frame = self.encode(pic_id);
        debug!(packets = frame.packets(), "pushing canvas");
        self.send(&frame)
    }

    pub fn display_animation(&mut self, animation: &Animation, pic_id: Option<u32>) -> Result<()> {
        if animation.is_empty() {
            return Err(Error::invalid("no frames to display"));
        }

        let pic_id = pic_id.unwrap_or_else(|| self.next_pic_id());
        let frame = encoder::encode_animation(animation, pic_id)?;
        info!(pic_id, frames = animation.len(), "displaying animation");

        self.send(&frame)?;
        Ok(())
    }

    /// Show `text` using the session's text style and mode.
    pub fn display_text(&mut self, text: &str) -> Result<TextOutcome> {
        let style = self.text_style;
        self.display_text_with(text, &style)
    }

    pub fn display_text_with(&mut self, text: &str, style: &TextStyle) -> Result<TextOutcome> {
        match self.text_mode {
            TextMode::Raster => {
                let layout =
                    glyph::draw_text(&mut self.canvas, style.x, style.y, text, style.color);
                let ack = self.push(None)?;

                Ok(TextOutcome {
                    mode: TextMode::Raster,
                    area: layout.area,
                    clipped: layout.clipped,
                    ack,
                })
            }
            TextMode::Native => {
                let (x, y) = match (u8::try_from(style.x), u8::try_from(style.y)) {
                    (Ok(x), Ok(y)) if Canvas::contains(style.x, style.y) => (x, y),
                    _ => return Err(Error::OutOfBounds {
                        x: style.x,
                        y: style.y,
                    }),
                };
                let text_width = Canvas::WIDTH as u8 - x;

                let frame = encoder::encode_text(TextPacket {
                    text_id: 1,
                    x,
                    y,
                    color: style.color,
                    font: style.font,
                    speed: 0,
                    text_width,
                    text: text.to_owned(),
                })?;
                let ack = self.send(&frame)?;

                Ok(TextOutcome {
                    mode: TextMode::Native,
                    area: None,
                    // estimate, the display's font may be narrower or wider
                    clipped: glyph::text_width(text) > text_width as i64,
                    ack,
                })
            }
        }
    }

    pub fn control(&mut self, command: ControlCommand) -> Result<Ack> {
        debug!(?command, "sending control command");
        let frame = encoder::encode_control(command)?;
        self.send(&frame)
    }

    /// Brightness in percent.
    pub fn set_brightness(&mut self, brightness: u8) -> Result<Ack> {
        if brightness > 100 {
            return Err(Error::invalid(format!(
                "brightness {brightness} is above 100"
            )));
        }
        self.control(ControlCommand::SetBrightness(brightness))
    }

    pub fn reboot(&mut self) -> Result<Ack> {
        self.control(ControlCommand::Reboot)
    }

    pub fn set_timer(&mut self, minutes: u8, seconds: u8, running: bool) -> Result<Ack> {
        if seconds > 59 {
            return Err(Error::invalid(format!("{seconds} is not a valid second")));
        }
        self.control(ControlCommand::SetTimer {
            minutes,
            seconds,
            running,
        })
    }

    pub fn set_scoreboard(&mut self, blue: u16, red: u16) -> Result<Ack> {
        if blue > 999 || red > 999 {
            return Err(Error::invalid("scores go up to 999"));
        }
        self.control(ControlCommand::SetScoreboard { blue, red })
    }

    pub fn play_buzzer(&mut self, active_ms: u16, off_ms: u16, total_ms: u16) -> Result<Ack> {
        self.control(ControlCommand::PlayBuzzer {
            active_ms,
            off_ms,
            total_ms,
        })
    }

    pub fn close(mut self) {
        self.transport.close();
    }
}
