use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Returned by [`OrderGates::wait_turn`] after the chain was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// A binary semaphore: closed until released, consumed by one acquire.
#[derive(Debug, Default)]
struct Gate {
    open: Mutex<bool>,
    ready: Condvar,
}

impl Gate {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Chain of hand-off gates that serializes per-block writes in index order.
///
/// There are `num_blocks + 1` gates. Gate 0 starts open, every other gate
/// starts closed. The worker holding block `i` waits on gate `i`, writes, and
/// then opens gate `i + 1`. The last gate is released but never waited on.
///
/// Cancelling wakes every waiter and makes all further waits fail, so a fatal
/// error on one block cannot leave the workers behind it parked forever.
#[derive(Debug)]
pub struct OrderGates {
    gates: Vec<Gate>,
    cancelled: AtomicBool,
}

impl OrderGates {
    pub fn new(num_blocks: usize) -> Self {
        let gates: Vec<Gate> = (0..=num_blocks).map(|_| Gate::default()).collect();
        *gates[0].lock() = true;
        Self {
            gates,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Number of blocks this chain orders (one less than the gate count).
    pub fn num_blocks(&self) -> usize {
        self.gates.len() - 1
    }

    /// Block until it is `index`'s turn, then take the gate.
    pub fn wait_turn(&self, index: usize) -> Result<(), Cancelled> {
        let gate = &self.gates[index];
        let mut open = gate.lock();
        while !*open {
            if self.is_cancelled() {
                return Err(Cancelled);
            }
            open = gate.ready.wait(open).unwrap_or_else(PoisonError::into_inner);
        }
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        *open = false;
        Ok(())
    }

    /// Hand the turn to block `index + 1`.
    pub fn advance_turn(&self, index: usize) {
        let gate = &self.gates[index + 1];
        let mut open = gate.lock();
        debug_assert!(!*open, "gate {} released twice", index + 1);
        *open = true;
        gate.ready.notify_one();
    }

    /// Whether the final gate has been opened, i.e. every block took its turn.
    pub fn is_complete(&self) -> bool {
        self.gates.last().is_some_and(|gate| *gate.lock())
    }

    /// Wake all waiters and refuse every further turn.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        for gate in &self.gates {
            let _guard = gate.lock();
            gate.ready.notify_all();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
