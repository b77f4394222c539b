//! Common `CaptureSource` instance loader.

use log::*;
use motrail::prelude::v1::*;
use std::io::{BufReader, Read};
use std::net::{TcpListener, TcpStream};

/// Create a capture source depending on the input.
///
/// `.fraw` inputs are interpreted as raw frame files; `tcp://` inputs are
/// interpreted as a TCP network stream carrying the same format. A
/// `synth:WxH` input builds a synthetic moving-square source, useful for
/// demos and tests.
pub fn create_capture(input: &str) -> Result<Box<dyn CaptureSource>> {
    if let Some(dims) = input.strip_prefix("synth:") {
        let (width, height) = dims
            .split_once('x')
            .ok_or_else(|| anyhow!("synthetic input must be formatted as synth:WxH"))?;

        return Ok(Box::new(SyntheticCapture::new(
            str::parse(width)?,
            str::parse(height)?,
        )));
    }

    if input.ends_with(".fraw") || input.starts_with("tcp://") {
        let reader = open_input(input)?;
        let capture = FrawCapture::try_new(BufReader::new(reader))?;

        return Ok(Box::new(capture));
    }

    Err(anyhow!("unrecognised capture input {}", input))
}

/// Open a file or an input stream.
fn open_input(input: &str) -> Result<Box<dyn Read + Send>> {
    if let Some(input) = input.strip_prefix("tcp://") {
        let (addr, port) = input
            .split_once(':')
            .ok_or_else(|| anyhow!("invalid tcp input format"))?;
        let port: usize = str::parse(port)?;

        let stream = if addr == "@" {
            let listener = TcpListener::bind(format!("0.0.0.0:{}", port))?;
            let (sock, addr) = listener.accept()?;
            info!("accepted frame stream from {}", addr);
            sock
        } else {
            info!("connecting to {}", input);
            TcpStream::connect(input)?
        };

        Ok(Box::new(stream))
    } else {
        std::fs::File::open(input)
            .map(|i| Box::new(i) as _)
            .map_err(Into::into)
    }
}

const FRAW_MAGIC: [u8; 4] = *b"FRAW";

/// Raw frame stream reader.
///
/// The format is a `FRAW` magic followed by width and height as 32-bit LE
/// integers, then tightly packed RGBA frames.
pub struct FrawCapture<T> {
    reader: T,
    width: usize,
    height: usize,
}

impl<T: Read> FrawCapture<T> {
    /// Parse the stream header and prepare to read frames.
    ///
    /// # Arguments
    ///
    /// * `reader` - byte source positioned at the start of the stream.
    pub fn try_new(mut reader: T) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        if magic != FRAW_MAGIC {
            return Err(anyhow!("missing FRAW magic"));
        }

        let mut dim = [0u8; std::mem::size_of::<u32>()];
        reader.read_exact(&mut dim)?;
        let width = u32::from_le_bytes(dim) as usize;
        reader.read_exact(&mut dim)?;
        let height = u32::from_le_bytes(dim) as usize;

        if width == 0 || height == 0 {
            return Err(anyhow!("degenerate frame dimensions {}x{}", width, height));
        }

        Ok(Self {
            reader,
            width,
            height,
        })
    }
}

impl<T: Read> CaptureSource for FrawCapture<T> {
    fn grab_frame(&mut self, frame: &mut Frame) -> Result<bool> {
        self.reader.read_exact(frame.as_bytes_mut())?;
        Ok(true)
    }

    fn get_framerate(&self) -> Option<f64> {
        None
    }

    fn get_dimensions(&self) -> Option<(usize, usize)> {
        Some((self.width, self.height))
    }
}

const SQUARE_SIZE: usize = 10;
const SQUARE_STEP: usize = 3;

/// Synthetic capture source: a bright square drifting over a dark
/// background, wrapping around at the right edge.
pub struct SyntheticCapture {
    width: usize,
    height: usize,
    ticks: usize,
}

impl SyntheticCapture {
    /// Create a synthetic source.
    ///
    /// # Arguments
    ///
    /// * `width` - frame width, at least twice the square size.
    /// * `height` - frame height, at least twice the square size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width.max(2 * SQUARE_SIZE),
            height: height.max(2 * SQUARE_SIZE),
            ticks: 0,
        }
    }
}

impl CaptureSource for SyntheticCapture {
    fn grab_frame(&mut self, frame: &mut Frame) -> Result<bool> {
        let x0 = (self.ticks * SQUARE_STEP) % (self.width - SQUARE_SIZE);
        let y0 = (self.height - SQUARE_SIZE) / 2;
        self.ticks += 1;

        for px in frame.pixels_mut() {
            *px = Rgba::from_rgb_slice(&[16, 16, 16]);
        }

        for y in y0..y0 + SQUARE_SIZE {
            for x in x0..x0 + SQUARE_SIZE {
                frame.pixels_mut()[y * self.width + x] = Rgba::from_rgb_slice(&[230, 230, 230]);
            }
        }

        Ok(true)
    }

    fn get_framerate(&self) -> Option<f64> {
        Some(30.0)
    }

    fn get_dimensions(&self) -> Option<(usize, usize)> {
        Some((self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = FRAW_MAGIC.to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes
    }

    #[test]
    fn fraw_header_round_trip() {
        let mut bytes = header(3, 2);
        bytes.extend_from_slice(&[128u8; 3 * 2 * 4]);

        let mut capture = FrawCapture::try_new(bytes.as_slice()).unwrap();
        assert_eq!(capture.get_dimensions(), Some((3, 2)));

        let mut frame = Frame::new(3, 2);
        assert!(capture.grab_frame(&mut frame).unwrap());
        assert_eq!(frame.pixel(2, 1).g, 128);

        // Stream exhausted.
        assert!(capture.grab_frame(&mut frame).is_err());
    }

    #[test]
    fn bad_headers_rejected() {
        assert!(FrawCapture::try_new(&b"WARF\x01\x00\x00\x00\x01\x00\x00\x00"[..]).is_err());
        assert!(FrawCapture::try_new(header(0, 2).as_slice()).is_err());
    }

    #[test]
    fn synthetic_dispatch() {
        let capture = create_capture("synth:64x48").unwrap();
        assert_eq!(capture.get_dimensions(), Some((64, 48)));

        assert!(create_capture("synth:64").is_err());
        assert!(create_capture("movie.mp4").is_err());
    }
}
