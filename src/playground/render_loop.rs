//! Render/execution loop state machine
//!
//! Frames are driven cooperatively from the UI thread: every call to
//! [`RenderLoop::tick`] advances the machine by at most one setup or one
//! frame. Run requests land in a single-slot inbox, so a burst of requests
//! collapses to the most recent one.

use crate::utils::ShaderError;

/// What the loop asks of the GPU side.
pub trait FrameDriver {
    type Request;

    /// Allocate resources and build pipelines for a request.
    fn setup(&mut self, request: Self::Request) -> Result<(), ShaderError>;

    /// Submit one frame and wait for it to complete.
    fn frame(&mut self) -> Result<FrameOutcome, ShaderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Schedule another frame.
    Continue,
    /// Single-shot work is done; go idle.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    SettingUp,
    Running,
    Aborting,
}

pub struct RenderLoop<D: FrameDriver> {
    driver: D,
    state: LoopState,
    inbox: Option<D::Request>,
    last_error: Option<ShaderError>,
}

impl<D: FrameDriver> RenderLoop<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            state: LoopState::Idle,
            inbox: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Error from the last failed setup or frame, cleared on read.
    pub fn take_error(&mut self) -> Option<ShaderError> {
        self.last_error.take()
    }

    /// Queue a (re)start. Replaces any request not yet picked up.
    pub fn request(&mut self, request: D::Request) {
        if self.inbox.replace(request).is_some() {
            log::debug!("[RenderLoop] Coalesced pending run request");
        }
        if self.state == LoopState::Running {
            log::debug!("[RenderLoop] Aborting active frame loop");
            self.state = LoopState::Aborting;
        }
    }

    /// Whether the host should keep calling `tick` every frame.
    pub fn is_active(&self) -> bool {
        self.state != LoopState::Idle || self.inbox.is_some()
    }

    /// Advance by one step.
    pub fn tick(&mut self) {
        match self.state {
            LoopState::Aborting => {
                // frames complete synchronously, so nothing is in flight here
                self.state = LoopState::Idle;
                self.start_pending();
            }
            LoopState::Idle => self.start_pending(),
            LoopState::Running => self.run_frame(),
            LoopState::SettingUp => {}
        }
    }

    fn start_pending(&mut self) {
        let Some(request) = self.inbox.take() else {
            return;
        };

        self.state = LoopState::SettingUp;
        match self.driver.setup(request) {
            Ok(()) => {
                log::debug!("[RenderLoop] Setup complete, running");
                self.state = LoopState::Running;
            }
            Err(err) => {
                self.fail(err);
            }
        }
    }

    fn run_frame(&mut self) {
        match self.driver.frame() {
            Ok(FrameOutcome::Continue) => {}
            Ok(FrameOutcome::Finished) => {
                self.state = LoopState::Idle;
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: ShaderError) {
        self.state = LoopState::Idle;
        if err.is_not_ready() {
            log::debug!("[RenderLoop] {}", err);
            return;
        }
        log::error!("[RenderLoop] {}", err);
        self.last_error = Some(err);
    }
}
