use std::collections::VecDeque;

/// Bounded FIFO of the most recent lines read, used as before-context.
/// Pushing past capacity drops the oldest line.
#[derive(Debug, Clone)]
pub struct ContextQueue {
    lines: VecDeque<(usize, String)>,
    capacity: usize,
}

impl ContextQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, line_number: usize, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back((line_number, line));
    }

    /// Removes and returns every queued line, oldest first
    pub fn drain(&mut self) -> Vec<(usize, String)> {
        self.lines.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
