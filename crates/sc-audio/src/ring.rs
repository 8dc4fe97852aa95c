/// Fixed-capacity ring histories sharing a single write cursor.
///
/// `lanes` rings of `capacity` slots live in one flat lane-major allocation.
/// Every lane is written at the same cursor position; the cursor advances
/// once per block, modulo `capacity`. Never resized after construction.
///
/// # Example
/// ```
/// use sc_audio::ring::RingArena;
/// let mut ring = RingArena::new(2, 3, 0.0f32);
/// ring.write(0, 1.0);
/// ring.write(1, 2.0);
/// ring.advance();
/// assert_eq!(ring.lane(0), &[1.0, 0.0, 0.0]);
/// assert_eq!(ring.lane(1), &[2.0, 0.0, 0.0]);
/// assert_eq!(ring.cursor(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct RingArena<T> {
    slots: Vec<T>,
    lanes: usize,
    capacity: usize,
    cursor: usize,
}

impl<T: Copy> RingArena<T> {
    /// Allocate `lanes × capacity` slots, all set to `fill`.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(lanes: usize, capacity: usize, fill: T) -> Self {
        assert!(capacity > 0, "ring capacity must be > 0");
        Self {
            slots: vec![fill; lanes * capacity],
            lanes,
            capacity,
            cursor: 0,
        }
    }

    /// All slots of one lane, in storage order (not chronological).
    #[inline]
    #[must_use]
    pub fn lane(&self, lane: usize) -> &[T] {
        let start = lane * self.capacity;
        &self.slots[start..start + self.capacity]
    }

    /// Store `value` in `lane` at the cursor, returning the value it replaces.
    ///
    /// The replaced value is the one written `capacity` blocks ago.
    #[inline]
    pub fn write(&mut self, lane: usize, value: T) -> T {
        let slot = &mut self.slots[lane * self.capacity + self.cursor];
        std::mem::replace(slot, value)
    }

    /// Move the shared cursor to the next slot.
    #[inline]
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// Current cursor position in `0..capacity`.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Slots per lane.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of lanes.
    #[must_use]
    pub fn lanes(&self) -> usize {
        self.lanes
    }
}
