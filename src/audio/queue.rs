/// Pending audio frames awaiting transmission.
///
/// The capture callback appends between send ticks; each tick drains the
/// queue atomically (read-then-clear) into one contiguous payload. Frames
/// are always concatenated in enqueue order.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: Vec<Vec<u8>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Vec<u8>) {
        if !frame.is_empty() {
            self.frames.push(frame);
        }
    }

    /// Concatenate and clear all pending frames. Returns `None` when the
    /// queue is empty so an idle tick produces no send.
    pub fn drain(&mut self) -> Option<Vec<u8>> {
        if self.frames.is_empty() {
            return None;
        }
        let total: usize = self.frames.iter().map(|f| f.len()).sum();
        let mut payload = Vec::with_capacity(total);
        for frame in self.frames.drain(..) {
            payload.extend_from_slice(&frame);
        }
        Some(payload)
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_concatenates_in_enqueue_order() {
        let mut q = FrameQueue::new();
        q.push(vec![1, 2]);
        q.push(vec![3]);
        q.push(vec![4, 5, 6]);
        assert_eq!(q.drain(), Some(vec![1, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn drain_clears_the_queue() {
        let mut q = FrameQueue::new();
        q.push(vec![9]);
        assert!(q.drain().is_some());
        assert!(q.is_empty());
        assert_eq!(q.drain(), None);
    }

    #[test]
    fn empty_queue_yields_no_payload() {
        let mut q = FrameQueue::new();
        assert_eq!(q.drain(), None);
    }

    #[test]
    fn empty_frames_are_not_enqueued() {
        let mut q = FrameQueue::new();
        q.push(Vec::new());
        assert!(q.is_empty());
    }
}
