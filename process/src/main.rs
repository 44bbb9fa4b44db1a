#[macro_use]
extern crate tracing;

use image::{
    AnimationDecoder, DynamicImage, RgbImage,
    codecs::gif::GifDecoder,
    imageops::{self, FilterType},
};
use itertools::Itertools;
use pixmatrix_common::{HEIGHT, MAX_FRAMES, StoredFrame, WIDTH};
use rkyv::{
    api::serialize_using,
    rancor::Strategy,
    ser::{allocator::Arena, sharing::Share, writer::IoWriter},
};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(argh::FromArgs)]
/// turn a directory of images or a GIF into an animation archive for pixmatrix
struct Args {
    #[argh(positional)]
    /// path to a directory with image files or to a GIF
    path: PathBuf,

    #[argh(option)]
    /// path to output file
    output: PathBuf,

    #[argh(option, default = "100")]
    /// display time of each frame in milliseconds, unless the GIF says otherwise
    frame_duration: u16,
}

fn to_frame(image: RgbImage, duration_ms: u16) -> StoredFrame {
    let image = if image.dimensions() == (WIDTH as u32, HEIGHT as u32) {
        image
    } else {
        imageops::resize(&image, WIDTH as u32, HEIGHT as u32, FilterType::Lanczos3)
    };

    StoredFrame {
        duration_ms,
        rgb: image.into_raw(),
    }
}

fn read_directory(path: &Path, frame_duration: u16) -> anyhow::Result<Vec<StoredFrame>> {
    let files: Vec<PathBuf> = fs::read_dir(path)?
        .map_ok(|entry| entry.path())
        .filter_ok(|path| path.is_file())
        .try_collect()?;

    files
        .into_iter()
        .sorted()
        .map(|file| -> anyhow::Result<StoredFrame> {
            debug!(file = %file.display(), "reading frame");
            let image = image::open(&file)?;
            Ok(to_frame(image.to_rgb8(), frame_duration))
        })
        .collect()
}

/// GIF delays of zero fall back to `fallback`, long ones saturate.
fn gif_duration(numer: u32, denom: u32, fallback: u16) -> u16 {
    let delay = numer.checked_div(denom).unwrap_or(0);
    match u16::try_from(delay) {
        Ok(0) => fallback,
        Ok(delay) => delay,
        Err(_) => u16::MAX,
    }
}

fn read_gif(path: &Path, frame_duration: u16) -> anyhow::Result<Vec<StoredFrame>> {
    let decoder = GifDecoder::new(BufReader::new(File::open(path)?))?;

    decoder
        .into_frames()
        .map(|frame| -> anyhow::Result<StoredFrame> {
            let frame = frame?;
            let (numer, denom) = frame.delay().numer_denom_ms();
            let duration_ms = gif_duration(numer, denom, frame_duration);

            let image = DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8();
            Ok(to_frame(image, duration_ms))
        })
        .collect()
}

/// Read every frame under `path`, keeping at most [`MAX_FRAMES`].
fn load_frames(path: &Path, frame_duration: u16) -> anyhow::Result<Vec<StoredFrame>> {
    let is_gif = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gif"));

    let mut frames = if is_gif {
        read_gif(path, frame_duration)?
    } else {
        read_directory(path, frame_duration)?
    };

    anyhow::ensure!(!frames.is_empty(), "no frames found in {}", path.display());

    if frames.len() > MAX_FRAMES {
        warn!(
            found = frames.len(),
            kept = MAX_FRAMES,
            "too many frames, dropping the rest"
        );
        frames.truncate(MAX_FRAMES);
    }

    Ok(frames)
}

fn write_archive(frames: Vec<StoredFrame>, output: &Path) -> anyhow::Result<()> {
    let file = File::create(output)?;
    let mut file = BufWriter::new(file);

    let mut arena = Arena::new();
    let mut serializer = rkyv::ser::Serializer {
        writer: IoWriter::new(&mut file),
        allocator: arena.acquire(),
        sharing: Share::new(),
    };
    let serializer = Strategy::<_, rkyv::rancor::Error>::wrap(&mut serializer);
    serialize_using(&frames, serializer)?;

    file.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args: Args = argh::from_env();

    let frames = load_frames(&args.path, args.frame_duration)?;
    let count = frames.len();
    write_archive(frames, &args.output)?;

    info!(frames = count, output = %args.output.display(), "wrote archive");

    Ok(())
}
