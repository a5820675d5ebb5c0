use std::collections::VecDeque;
use ndarray::Array2;
use crate::drivers::AcquisitionError;
fn trim_front(queue: &mut VecDeque<f64>, capacity: usize) {
    let excess = queue.len().saturating_sub(capacity);
    queue.drain(..excess);
}
/// Rolling window holding the most recent `capacity` samples of every channel.
#[derive(Clone, Debug)]
pub struct RollingMatrix {
    per_channel: Vec<VecDeque<f64>>, // channel -> samples
    capacity: usize,
}
impl RollingMatrix {
    pub fn new(channels: usize, capacity: usize) -> Self {
        Self {
            per_channel: (0..channels)
                .map(|_| VecDeque::with_capacity(capacity))
                .collect(),
            capacity,
        }
    }
    pub fn channels(&self) -> usize {
        self.per_channel.len()
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    /// Samples held per channel.
    pub fn len(&self) -> usize {
        self.per_channel.first().map_or(0, VecDeque::len)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Appends a channels x samples block and drops whatever falls out of the window.
    pub fn append(&mut self, samples: &Array2<f64>) -> Result<(), AcquisitionError> {
        if samples.nrows() != self.per_channel.len() {
            return Err(AcquisitionError::Dimension {
                expected: self.per_channel.len(),
                actual: samples.nrows(),
            });
        }
        let keep = samples.ncols().min(self.capacity);
        let skip = samples.ncols() - keep;
        for (queue, row) in self.per_channel.iter_mut().zip(samples.rows()) {
            queue.extend(row.iter().skip(skip).copied());
            trim_front(queue, self.capacity);
        }
        Ok(())
    }
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        for queue in &mut self.per_channel {
            trim_front(queue, capacity);
        }
    }
    pub fn channel(&self, index: usize) -> Option<Vec<f64>> {
        self.per_channel
            .get(index)
            .map(|queue| queue.iter().copied().collect())
    }
    pub fn mean(&self, index: usize) -> Option<f64> {
        let queue = self.per_channel.get(index)?;
        if queue.is_empty() {
            return None;
        }
        Some(queue.iter().sum::<f64>() / queue.len() as f64)
    }
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.channels(), self.len()), |(row, column)| {
            self.per_channel[row][column]
        })
    }
}
/// Single-channel rolling window, used for the reconstructed force.
#[derive(Clone, Debug)]
pub struct RollingSeries {
    data: VecDeque<f64>,
    capacity: usize,
}
impl RollingSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn append(&mut self, values: &[f64]) {
        let skip = values.len().saturating_sub(self.capacity);
        self.data.extend(values[skip..].iter().copied());
        trim_front(&mut self.data, self.capacity);
    }
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        trim_front(&mut self.data, capacity);
    }
    /// Zeroes every held value without changing the window length.
    pub fn zero_fill(&mut self) {
        self.data.iter_mut().for_each(|v| *v = 0.0);
    }
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }
}
