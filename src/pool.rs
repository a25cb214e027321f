//! Fixed-capacity task pool allocator (spec.md §4.1)
//!
//! Ported from `original_source/ribezal.c`'s `task_pool`/`task_pool_head`
//! intrusive free list. spec.md §9 asks for "pool indices, not pointers";
//! this is the safe port: slots live in a `Vec`, the free list threads
//! through a `next: Option<usize>` field instead of aliasing storage, and
//! "in pool" is a type invariant ([`TaskRef`] can only be produced by
//! [`Pool::allocate`]) instead of a pointer-range check.

use crate::error::{Error, Kind};
use crate::task::Task;

/// A non-owning reference to a task slot. Never constructed outside of
/// [`Pool::allocate`]; indices from one pool must never be used with another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskRef(usize);

enum Slot {
    Free { next: Option<usize> },
    Occupied(Task),
}

/// Fixed-capacity arena of task slots backing the whole task tree.
pub struct Pool {
    slots: Vec<Slot>,
    head: Option<usize>,
    live: usize,
}

impl Pool {
    /// Creates a pool with `capacity` slots, all initially free.
    ///
    /// Mirrors `task_free_all`: every slot is linked into the free list
    /// up-front so `head` points at the highest index first.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for i in 0..capacity {
            let next = if i == 0 { None } else { Some(i - 1) };
            slots.push(Slot::Free { next });
        }
        Self {
            slots,
            head: capacity.checked_sub(1),
            live: 0,
        }
    }

    /// Total slot count, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots not on the free list (spec.md §8 property 6).
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Pops the free list head and stores `task` in it.
    pub fn allocate(&mut self, task: Task) -> Result<TaskRef, Error> {
        let index = self.head.ok_or_else(|| {
            Error::new(Kind::PoolExhausted, "task pool exhausted")
        })?;
        let next = match &self.slots[index] {
            Slot::Free { next } => *next,
            Slot::Occupied(_) => unreachable!("free list pointed at an occupied slot"),
        };
        self.head = next;
        self.slots[index] = Slot::Occupied(task);
        self.live += 1;
        Ok(TaskRef(index))
    }

    /// Pushes `slot` back onto the free list head.
    ///
    /// Releasing a [`TaskRef`] that isn't currently occupied is a
    /// programmer error and panics, matching the original's
    /// `task_in_pool`/`assert` pairing around `task_free`.
    pub fn release(&mut self, slot: TaskRef) -> Task {
        let index = slot.0;
        let prior = std::mem::replace(&mut self.slots[index], Slot::Free { next: self.head });
        let task = match prior {
            Slot::Occupied(task) => task,
            Slot::Free { .. } => panic!("released a task slot that was already free"),
        };
        self.head = Some(index);
        self.live -= 1;
        task
    }

    /// Borrows the task at `slot`.
    pub fn get(&self, slot: TaskRef) -> &Task {
        match &self.slots[slot.0] {
            Slot::Occupied(task) => task,
            Slot::Free { .. } => panic!("accessed a free task slot"),
        }
    }

    /// Mutably borrows the task at `slot`.
    pub fn get_mut(&mut self, slot: TaskRef) -> &mut Task {
        match &mut self.slots[slot.0] {
            Slot::Occupied(task) => task,
            Slot::Free { .. } => panic!("accessed a free task slot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::PollResult;

    #[test]
    fn allocates_and_releases_in_lifo_order() {
        let mut pool = Pool::new(4);
        let a = pool.allocate(Task::Const(PollResult::done_void())).unwrap();
        let b = pool.allocate(Task::Const(PollResult::done_void())).unwrap();
        assert_eq!(pool.live_count(), 2);

        pool.release(b);
        assert_eq!(pool.live_count(), 1);

        let c = pool.allocate(Task::Const(PollResult::done_void())).unwrap();
        assert_eq!(c, b, "freed slot should be reused before a fresh one");

        pool.release(a);
        pool.release(c);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn exhaustion_is_an_error_not_a_panic() {
        let mut pool = Pool::new(1);
        let _a = pool.allocate(Task::Const(PollResult::done_void())).unwrap();
        let err = pool.allocate(Task::Const(PollResult::done_void())).unwrap_err();
        assert_eq!(err.kind(), Kind::PoolExhausted);
    }

    #[test]
    #[should_panic]
    fn releasing_a_free_slot_panics() {
        let mut pool = Pool::new(1);
        let a = pool.allocate(Task::Const(PollResult::done_void())).unwrap();
        pool.release(a);
        pool.release(a);
    }
}
