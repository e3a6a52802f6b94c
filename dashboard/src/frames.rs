use std::{collections::HashMap, time::Duration};

use incubator_common::{FrameId, FrameScheduler};
use tokio::{sync::mpsc, task::JoinHandle};

#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub id: FrameId,
    pub at: std::time::Instant,
}

/// Delivers frames on a channel after a fixed interval, one sleeping task per
/// requested frame.
#[derive(Debug)]
pub struct TokioFrameScheduler {
    interval: Duration,
    next: FrameId,
    tasks: HashMap<FrameId, JoinHandle<()>>,
    frames: mpsc::UnboundedSender<Frame>,
}

impl TokioFrameScheduler {
    pub fn new(interval: Duration, frames: mpsc::UnboundedSender<Frame>) -> Self {
        Self {
            interval,
            next: 0,
            tasks: HashMap::new(),
            frames,
        }
    }
}

impl FrameScheduler for TokioFrameScheduler {
    fn request_frame(&mut self) -> FrameId {
        self.tasks.retain(|_, task| !task.is_finished());

        self.next = self.next.wrapping_add(1);
        let id = self.next;
        let interval = self.interval;
        let frames = self.frames.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let at = tokio::time::Instant::now().into_std();
            let _ = frames.send(Frame { id, at });
        });
        self.tasks.insert(id, task);
        id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if let Some(task) = self.tasks.remove(&id) {
            task.abort();
        }
    }
}

impl Drop for TokioFrameScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
