/// The bus pool: one contiguous float arena ferrying samples between
/// units within a block.
///
/// Buses are fixed-stride slices of `stride` (= `max_block_size`)
/// frames, addressed by the ids the scheduler mints. The whole pool is
/// zeroed in a single pass at the top of each sub-block, so producers
/// can accumulate without anyone clearing per bus.
pub struct BusPool {
    data: Vec<f32>,
    stride: usize,
    capacity: usize,
}

impl BusPool {
    pub fn new(stride: usize, capacity: usize) -> Self {
        Self {
            data: vec![0.0; stride * capacity],
            stride,
            capacity,
        }
    }

    /// Number of buses available.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// One contiguous memset over the whole arena.
    pub fn zero_all(&mut self) {
        self.data.fill(0.0);
    }

    /// Read bus `id` at the current block length.
    pub fn bus(&self, id: usize, len: usize) -> &[f32] {
        debug_assert!(id < self.capacity && len <= self.stride);
        let start = id * self.stride;
        &self.data[start..start + len]
    }

    /// Add `src` onto bus `id`.
    pub fn accumulate(&mut self, id: usize, src: &[f32]) {
        debug_assert!(id < self.capacity && src.len() <= self.stride);
        let start = id * self.stride;
        for (dst, &s) in self.data[start..start + src.len()].iter_mut().zip(src) {
            *dst += s;
        }
    }
}
