/// A fixed-capacity FIFO window over `Copy` samples.
///
/// Storage is allocated once. When the window is full, pushing overwrites the
/// oldest sample.
///
/// Data layout is as follows:
///
/// xxT.....Hxxxxx
///
/// H: head (oldest sample)
/// T: one past the newest sample, wrapping around the end
/// x: data
#[derive(Debug, Clone)]
pub struct SampleWindow<T> {
    buffer: Box<[T]>,

    /// The index of the oldest sample
    head: usize,

    /// The number of stored samples
    len: usize,
}

impl<T: Copy + Default> SampleWindow<T> {
    /// Creates an empty window. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![T::default(); capacity.max(1)].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Pushes a sample, returning the evicted oldest sample if the window was full.
    pub fn push(&mut self, sample: T) -> Option<T> {
        let capacity = self.capacity();

        if self.len < capacity {
            self.buffer[(self.head + self.len) % capacity] = sample;
            self.len += 1;
            None
        } else {
            let evicted = core::mem::replace(&mut self.buffer[self.head], sample);
            self.head = (self.head + 1) % capacity;
            Some(evicted)
        }
    }

    /// Iterates from the oldest to the newest sample.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        let capacity = self.capacity();
        (0..self.len).map(move |i| self.buffer[(self.head + i) % capacity])
    }

    /// Clears the window.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Returns the number of samples in the window.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_up_to_capacity() {
        let mut window = SampleWindow::new(3);
        assert!(window.is_empty());

        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.len(), 2);
        assert_eq!(window.push(3), None);
        assert_eq!(window.len(), window.capacity());

        assert_eq!(window.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut window = SampleWindow::new(3);
        for i in 1..=3 {
            window.push(i);
        }

        assert_eq!(window.push(4), Some(1));
        assert_eq!(window.push(5), Some(2));
        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
    }

    #[test]
    fn wraps_many_times() {
        let mut window = SampleWindow::new(4);
        for i in 0..103 {
            window.push(i);
        }
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![99, 100, 101, 102]);
    }

    #[test]
    fn clear_starts_over() {
        let mut window = SampleWindow::new(2);
        window.push(1.0);
        window.push(2.0);
        window.push(3.0);
        window.clear();

        assert!(window.is_empty());
        assert_eq!(window.len(), 0);
        window.push(4.0);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![4.0]);
    }

    #[test]
    fn zero_capacity_holds_one_sample() {
        let mut window = SampleWindow::new(0);
        assert_eq!(window.capacity(), 1);
        window.push('a');
        assert_eq!(window.push('b'), Some('a'));
    }
}
