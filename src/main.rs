#[macro_use]
extern crate tracing;

use pixmatrix::{Animation, Endpoint, Rgb, Session, SessionConfig, ShapeStyle, TextMode, TextStyle};
use std::{fs::File, path::PathBuf, str::FromStr, time::Duration};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(argh::FromArgs)]
/// Draw on a 64x64 pixel display or its simulator
struct Args {
    #[argh(option, default = "Endpoint::simulator()")]
    /// display address: `simulator`, `simulator:PORT`, `IP` or `IP:PORT`
    endpoint: Endpoint,

    #[argh(option, default = "5000")]
    /// connect and send timeout in milliseconds
    timeout_ms: u64,

    #[argh(option, default = "0")]
    /// last pic id used on the display; pushes continue after it
    initial_pic_id: u32,

    #[argh(subcommand)]
    command: Command,
}

#[derive(argh::FromArgs)]
#[argh(subcommand)]
enum Command {
    Pattern(PatternCommand),
    Text(TextCommand),
    Play(PlayCommand),
    Brightness(BrightnessCommand),
}

#[derive(argh::FromArgs)]
#[argh(subcommand, name = "pattern")]
/// draw a test pattern
struct PatternCommand {
    #[argh(positional, default = "Pattern::SwissFlag")]
    /// one of swiss-flag, windows-flag, lines, circles, rectangles, pixels
    pattern: Pattern,
}

#[derive(argh::FromArgs)]
#[argh(subcommand, name = "text")]
/// show a line of text
struct TextCommand {
    #[argh(positional)]
    /// text to show
    text: String,

    #[argh(option, default = "TextMode::Raster")]
    /// raster draws with the built-in font, native lets the display render
    mode: TextMode,

    #[argh(option, default = "0")]
    /// left edge of the text
    x: i32,

    #[argh(option, default = "40")]
    /// top edge of the text
    y: i32,

    #[argh(option, default = "Rgb::WHITE")]
    /// text color as #rrggbb
    color: Rgb,
}

#[derive(argh::FromArgs)]
#[argh(subcommand, name = "play")]
/// play an animation archive written by pixmatrix-process
struct PlayCommand {
    #[argh(option)]
    /// file containing the frame data
    data: PathBuf,

    #[argh(option)]
    /// pic id to use instead of the next one
    pic_id: Option<u32>,
}

#[derive(argh::FromArgs)]
#[argh(subcommand, name = "brightness")]
/// set the display brightness
struct BrightnessCommand {
    #[argh(positional)]
    /// brightness in percent
    level: u8,
}

#[derive(Clone, Copy)]
enum Pattern {
    SwissFlag,
    WindowsFlag,
    Lines,
    Circles,
    Rectangles,
    Pixels,
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "swiss-flag" => Self::SwissFlag,
            "windows-flag" => Self::WindowsFlag,
            "lines" => Self::Lines,
            "circles" => Self::Circles,
            "rectangles" => Self::Rectangles,
            "pixels" => Self::Pixels,
            other => return Err(format!("unknown pattern {other:?}")),
        })
    }
}

fn draw_pattern(session: &mut Session, pattern: Pattern) -> anyhow::Result<()> {
    match pattern {
        Pattern::SwissFlag => {
            session.clear(Rgb::RED);
            // arms are roughly a sixth of the flag wide
            let (arm_start, arm_end) = (27, 37);
            let (bar_start, bar_end) = (12, 52);
            let cross = ShapeStyle::filled(Rgb::WHITE);
            session.draw_rectangle(arm_start, bar_start, arm_end, bar_end, cross);
            session.draw_rectangle(bar_start, arm_start, bar_end, arm_end, cross);
        }
        Pattern::WindowsFlag => {
            session.clear(Rgb::BLACK);
            session.draw_rectangle(12, 12, 30, 28, ShapeStyle::filled(Rgb::BLUE));
            session.draw_rectangle(12, 34, 30, 50, ShapeStyle::filled(Rgb::GREEN));
            session.draw_rectangle(34, 12, 52, 28, ShapeStyle::filled(Rgb::RED));
            session.draw_rectangle(34, 34, 52, 50, ShapeStyle::filled(Rgb::YELLOW));
            session.draw_line(12, 22, 52, 18, Rgb::WHITE);
            session.draw_line(12, 40, 52, 36, Rgb::WHITE);
        }
        Pattern::Lines => {
            session.clear(Rgb::BLACK);
            session.draw_line(0, 10, 63, 10, Rgb::RED);
            session.draw_line(20, 0, 20, 63, Rgb::GREEN);
            session.draw_line(0, 0, 63, 63, Rgb::BLUE);
            session.draw_line(63, 0, 0, 63, Rgb::WHITE);
        }
        Pattern::Circles => {
            let dark_green = Rgb::new(0, 128, 0);
            session.clear(Rgb::BLACK);
            session.draw_circle(32, 32, 20, Rgb::RED)?;
            let ring = ShapeStyle::outline(Rgb::GREEN).with_fill(dark_green);
            session.draw_circle(32, 32, 15, ring)?;
            let core = ShapeStyle::outline(Rgb::BLUE).with_fill(Rgb::YELLOW);
            session.draw_circle(32, 32, 10, core)?;
        }
        Pattern::Rectangles => {
            let dark_green = Rgb::new(0, 128, 0);
            session.clear(Rgb::BLACK);
            session.draw_rectangle(10, 10, 54, 54, Rgb::RED);
            let middle = ShapeStyle::outline(Rgb::GREEN).with_fill(dark_green);
            session.draw_rectangle(16, 16, 48, 48, middle);
            let inner = ShapeStyle::outline(Rgb::BLUE).with_fill(Rgb::YELLOW);
            session.draw_rectangle(20, 20, 44, 44, inner);
        }
        Pattern::Pixels => {
            session.clear(Rgb::BLACK);
            session.set_pixel(0, 0, Rgb::RED)?;
            session.set_pixel(1, 1, Rgb::GREEN)?;
            session.set_pixel(2, 2, Rgb::BLUE)?;
            for i in 3..10 {
                session.set_pixel(i, i, Rgb::YELLOW)?;
            }
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args: Args = argh::from_env();

    let config = SessionConfig {
        endpoint: args.endpoint,
        timeout: Duration::from_millis(args.timeout_ms),
        initial_pic_id: args.initial_pic_id,
        ..SessionConfig::default()
    };

    info!(endpoint = %config.endpoint, "connecting");
    let mut session = Session::connect(&config)?;

    match args.command {
        Command::Pattern(PatternCommand { pattern }) => {
            draw_pattern(&mut session, pattern)?;
            session.push(None)?;
        }
        Command::Text(TextCommand {
            text,
            mode,
            x,
            y,
            color,
        }) => {
            session.set_text_mode(mode);
            let style = TextStyle {
                x,
                y,
                color,
                ..TextStyle::default()
            };
            let outcome = session.display_text_with(&text, &style)?;
            info!(?outcome, "text shown");
        }
        Command::Play(PlayCommand { data, pic_id }) => {
            info!("loading data..");
            let data_file = File::open(&data)?;
            let data = unsafe { memmap2::Mmap::map(&data_file)? };
            let animation = Animation::from_archive(&data)?;
            info!(frames = animation.len(), "loaded data successfully");

            session.display_animation(&animation, pic_id)?;
        }
        Command::Brightness(BrightnessCommand { level }) => {
            session.set_brightness(level)?;
        }
    }

    session.close();

    Ok(())
}
