use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cloneable handle that ends the render loop at its next frame.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct FrameLoop {
    stop: StopHandle,
    max_frames: Option<u64>,
    frames: u64,
}

impl FrameLoop {
    pub fn new(max_frames: Option<u64>) -> Self {
        Self {
            stop: StopHandle::default(),
            max_frames,
            frames: 0,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Called at the top of every frame. Returns false once the loop should end.
    pub fn begin_frame(&mut self) -> bool {
        if self.stop.is_stopped() {
            return false;
        }

        if let Some(max_frames) = self.max_frames {
            if self.frames >= max_frames {
                log::info!("Frame limit of {} reached", max_frames);
                self.stop.stop();
                return false;
            }
        }

        self.frames += 1;
        true
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_until_stopped() {
        let mut frame_loop = FrameLoop::new(None);
        let handle = frame_loop.stop_handle();

        assert!(frame_loop.begin_frame());
        assert!(frame_loop.begin_frame());

        handle.stop();
        assert!(!frame_loop.begin_frame());
        assert_eq!(frame_loop.frames(), 2);
    }

    #[test]
    fn frame_limit_stops_the_loop() {
        let mut frame_loop = FrameLoop::new(Some(3));

        let rendered = std::iter::from_fn(|| frame_loop.begin_frame().then_some(()))
            .take(10)
            .count();

        assert_eq!(rendered, 3);
        assert!(frame_loop.stop_handle().is_stopped());
    }

    #[test]
    fn stop_is_visible_from_other_threads() {
        let frame_loop = FrameLoop::new(None);
        let handle = frame_loop.stop_handle();

        std::thread::spawn(move || handle.stop()).join().unwrap();
        assert!(frame_loop.stop_handle().is_stopped());
    }
}
