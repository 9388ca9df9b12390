//! Render backend abstraction

use super::{CommandRecorder, Extent2D, RecordedCommand, RecordingCommandBuffer, RenderError};

/// A graphics backend as seen by the engine loop
pub trait RenderBackend {
    /// Current size of the presentation surface
    fn surface_extent(&self) -> Extent2D;

    /// Prepare to record a frame
    fn begin_frame(&mut self) -> Result<(), RenderError>;

    /// Recorder for the frame being built
    fn recorder(&mut self) -> &mut dyn CommandRecorder;

    /// Submit and present the frame
    fn end_frame(&mut self) -> Result<(), RenderError>;
}

/// Backend without a GPU that keeps the commands of the last frame
#[derive(Debug)]
pub struct HeadlessBackend {
    extent: Extent2D,
    recording: RecordingCommandBuffer,
    last_frame: Vec<RecordedCommand>,
    frames: u64,
}

impl HeadlessBackend {
    /// Backend with a virtual surface of `extent`
    pub fn new(extent: Extent2D) -> Self {
        Self {
            extent,
            recording: RecordingCommandBuffer::new(),
            last_frame: Vec::new(),
            frames: 0,
        }
    }

    /// Resize the virtual surface
    pub fn resize(&mut self, extent: Extent2D) {
        self.extent = extent;
    }

    /// Commands of the last completed frame
    pub fn last_frame(&self) -> &[RecordedCommand] {
        &self.last_frame
    }

    /// Number of completed frames
    pub const fn frame_count(&self) -> u64 {
        self.frames
    }
}

impl RenderBackend for HeadlessBackend {
    fn surface_extent(&self) -> Extent2D {
        self.extent
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.recording.clear();
        Ok(())
    }

    fn recorder(&mut self) -> &mut dyn CommandRecorder {
        &mut self.recording
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.last_frame = self.recording.take();
        self.frames += 1;
        log::trace!("Headless frame {} recorded {} commands", self.frames, self.last_frame.len());
        Ok(())
    }
}
