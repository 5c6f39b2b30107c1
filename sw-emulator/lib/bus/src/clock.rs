/*++

Licensed under the Apache-2.0 license.

File Name:

    clock.rs

Abstract:

    File contains the simulated cycle counter and the timers peripherals use
    to schedule work at a future cycle. Peripherals clocked at different rates
    all schedule against this one counter, so their deadlines are ordered
    against each other exactly.

--*/
use std::{
    cell::{Cell, RefCell},
    collections::BTreeSet,
    rc::Rc,
};

use crate::Device;

/// Scheduling handle held by a peripheral.
///
/// A peripheral keeps the `ActionHandle` of each pending deadline in an
/// `Option` slot and checks it from [`Device::poll`]:
///
/// ```
/// use escrst_emu_bus::{ActionHandle, Clock, Device, Timer};
///
/// struct Countdown {
///     timer: Timer,
///     expiry: Option<ActionHandle>,
///     expired: bool,
/// }
/// impl Device for Countdown {
///     fn poll(&mut self) {
///         if self.timer.fired(&mut self.expiry) {
///             self.expired = true;
///         }
///     }
/// }
///
/// let clock = Clock::new();
/// let timer = Timer::new(&clock);
/// let expiry = Some(timer.schedule_poll_in(10));
/// let mut countdown = Countdown { timer, expiry, expired: false };
/// clock.increment_and_poll(10, &mut countdown);
/// assert!(countdown.expired);
/// ```
#[derive(Clone)]
pub struct Timer {
    clock: Rc<ClockImpl>,
}

impl Timer {
    pub fn new(clock: &Clock) -> Self {
        Self {
            clock: Rc::clone(&clock.clock),
        }
    }

    /// Cycles elapsed since simulation start
    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now.get()
    }

    /// True (and `action` emptied) once the cycle of `action` has been
    /// reached. False if the slot is empty or the action is still pending.
    pub fn fired(&self, action: &mut Option<ActionHandle>) -> bool {
        match action {
            Some(handle) => {
                self.check_owner(handle);
                if handle.time <= self.now() {
                    *action = None;
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    /// Schedule a [`Device::poll`] at cycle `time`. A time in the past fires
    /// on the next clock increment.
    pub fn schedule_poll_at(&self, time: u64) -> ActionHandle {
        let handle = ActionHandle {
            time,
            id: self.clock.next_id.replace(self.clock.next_id.get() + 1),
            owner: Rc::as_ptr(&self.clock),
        };
        self.clock
            .pending
            .borrow_mut()
            .insert((handle.time, handle.id));
        handle
    }

    /// Schedule a [`Device::poll`] `cycles` from now.
    pub fn schedule_poll_in(&self, cycles: u64) -> ActionHandle {
        self.schedule_poll_at(self.now().saturating_add(cycles))
    }

    /// # Panics
    ///
    /// Panics if `handle` was scheduled on a different clock.
    pub fn cancel(&self, handle: ActionHandle) {
        self.check_owner(&handle);
        self.clock
            .pending
            .borrow_mut()
            .remove(&(handle.time, handle.id));
    }

    /// Cancel the action in `slot`, if any.
    pub fn cancel_opt(&self, slot: &mut Option<ActionHandle>) {
        if let Some(handle) = slot.take() {
            self.cancel(handle);
        }
    }

    fn check_owner(&self, handle: &ActionHandle) {
        assert!(
            std::ptr::eq(handle.owner, Rc::as_ptr(&self.clock)),
            "Action was scheduled on a different clock"
        );
    }
}

/// A future poll scheduled through a [`Timer`]. Not `Clone`: each handle is
/// either fired or cancelled exactly once.
#[derive(Debug)]
pub struct ActionHandle {
    time: u64,
    id: u64,
    owner: *const ClockImpl,
}

impl ActionHandle {
    /// Cycle at which the action fires
    pub fn time(&self) -> u64 {
        self.time
    }
}

struct ClockImpl {
    now: Cell<u64>,
    next_id: Cell<u64>,
    /// (time, id) of every action not yet due or cancelled
    pending: RefCell<BTreeSet<(u64, u64)>>,
}

#[derive(Clone)]
pub struct Clock {
    clock: Rc<ClockImpl>,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self {
            clock: Rc::new(ClockImpl {
                now: Cell::new(0),
                next_id: Cell::new(0),
                pending: RefCell::new(BTreeSet::new()),
            }),
        }
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now.get()
    }

    /// Cycles until the earliest pending action, zero if one is already due,
    /// `None` if nothing is scheduled.
    pub fn ticks_until_next_action(&self) -> Option<u64> {
        let pending = self.clock.pending.borrow();
        let (time, _) = pending.first()?;
        Some(time.saturating_sub(self.now()))
    }

    /// Advance by `delta` cycles. Returns true if any pending action is now
    /// due; due actions leave the schedule and their owners observe them
    /// through [`Timer::fired`].
    pub fn increment(&self, delta: u64) -> bool {
        let now = self
            .now()
            .checked_add(delta)
            .expect("cycle counter overflow");
        self.clock.now.set(now);

        let mut pending = self.clock.pending.borrow_mut();
        let mut any_due = false;
        while pending.first().map_or(false, |(time, _)| *time <= now) {
            pending.pop_first();
            any_due = true;
        }
        any_due
    }

    /// Advance by `delta` cycles, then poll `device` if any action became
    /// due.
    pub fn increment_and_poll(&self, delta: u64, device: &mut impl Device) -> bool {
        let due = self.increment(delta);
        if due {
            device.poll();
        }
        due
    }
}
