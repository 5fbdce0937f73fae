//! Ping-pong storage
//!
//! Two interchangeable slots, one settled (last fully written, safe to read) and
//! one working (destination of the next step). Every field that has to stay
//! consistent with the others lives inside the same slot value, so a single
//! role index swaps all of them together.

/// Identifies one of the two slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    pub fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }

    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

#[derive(Debug)]
pub struct PingPong<T> {
    slots: [T; 2],
    settled: Slot,
    commits: u64,
}

impl<T> PingPong<T> {
    /// Slot A starts out settled.
    pub fn new(a: T, b: T) -> Self {
        Self {
            slots: [a, b],
            settled: Slot::A,
            commits: 0,
        }
    }

    pub fn settled(&self) -> &T {
        &self.slots[self.settled.index()]
    }

    pub fn working(&self) -> &T {
        &self.slots[self.settled.other().index()]
    }

    /// Settled slot for reading alongside the working slot for writing.
    pub fn split_mut(&mut self) -> (&T, &mut T) {
        let [a, b] = &mut self.slots;
        match self.settled {
            Slot::A => (&*a, b),
            Slot::B => (&*b, a),
        }
    }

    /// Promote the working slot to settled.
    ///
    /// Must only be called once the step writing the working slot has completed.
    pub fn commit(&mut self) {
        self.settled = self.settled.other();
        self.commits += 1;
    }

    pub fn settled_slot(&self) -> Slot {
        self.settled
    }

    pub fn working_slot(&self) -> Slot {
        self.settled.other()
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn slot(&self, slot: Slot) -> &T {
        &self.slots[slot.index()]
    }
}
