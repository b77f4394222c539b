//! # Frame capture boundary

use crate::prelude::v1::*;

/// Live frame source.
pub trait CaptureSource {
    /// Grab the next frame in the stream.
    ///
    /// This function will attempt to fill `frame` with the next captured
    /// frame. If a frame was produced, `Ok(true)` is returned and `frame`
    /// holds its pixel data. If the source has nothing to deliver yet (for
    /// instance before the very first frame of a live stream), `Ok(false)`
    /// is returned and `frame` is left untouched. If there is an error
    /// while capturing, `Err` is returned.
    ///
    /// # Arguments
    ///
    /// * `frame` - destination frame, sized to the source's dimensions.
    fn grab_frame(&mut self, frame: &mut Frame) -> Result<bool>;

    /// Get the framerate of the stream.
    ///
    /// This will return `Some(framerate)` if it is known. On realtime
    /// streams it may not always be known. In such cases, `None` is
    /// returned.
    fn get_framerate(&self) -> Option<f64>;

    /// Get the frame dimensions of the stream.
    ///
    /// Sources feeding a processing pipeline must know their dimensions
    /// up-front, since the retained frame pair is allocated once.
    fn get_dimensions(&self) -> Option<(usize, usize)>;
}
