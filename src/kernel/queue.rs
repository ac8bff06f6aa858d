// Admission FIFO for the dispatcher. Fixed capacity, items are only
// ever taken out by the first match for a given session.

pub struct RingQueue<T, const N: usize> {
    buf: [Option<T>; N],
    head: usize,
    tail: usize,
    len: usize,
}

impl<T: Copy, const N: usize> RingQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            buf: [None; N],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.len >= N {
            return Err(item);
        }
        self.buf[self.tail] = Some(item);
        self.tail = (self.tail + 1) % N;
        self.len += 1;
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.buf[self.head].take();
        self.head = (self.head + 1) % N;
        self.len -= 1;
        item
    }

    /// Remove and return the oldest item matching `pred`, keeping the
    /// order of everything else.
    pub fn take_first(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        let mut found = None;
        for _ in 0..self.len {
            let Some(item) = self.pop() else { break };
            if found.is_none() && pred(&item) {
                found = Some(item);
            } else {
                // a slot was just freed
                let _ = self.push(item);
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
