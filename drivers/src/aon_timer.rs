/*++

Licensed under the Apache-2.0 license.

File Name:

    aon_timer.rs

Abstract:

    File contains the always-on timer capability (wakeup timer and watchdog)
    and the watchdog arming and shutdown helpers.

--*/

use crate::{EscError, EscResult};

/// Always-on timer capability
pub trait AonTimer {
    /// Start the watchdog. `bark_threshold` and `bite_threshold` are counted
    /// in always-on clock cycles from the moment of the call.
    fn watchdog_start(
        &self,
        bark_threshold: u32,
        bite_threshold: u32,
        pause_in_sleep: bool,
        lock: bool,
    ) -> EscResult<()>;

    /// Stop the watchdog and zero its counter.
    fn watchdog_stop(&self) -> EscResult<()>;

    /// Stop the wakeup timer and zero its counter.
    fn wakeup_stop(&self) -> EscResult<()>;

    /// Clear the bark and wakeup interrupt state.
    fn irq_acknowledge_all(&self) -> EscResult<()>;

    /// Active (bark, bite) thresholds, or `None` when the watchdog is off.
    fn watchdog_thresholds(&self) -> EscResult<Option<(u32, u32)>>;
}

/// Arm the watchdog with fresh thresholds.
///
/// # Arguments
///
/// * `timer` - Always-on timer
/// * `bark_cycles` - Bark threshold
/// * `bite_cycles` - Bite threshold, must be above the bark threshold
/// * `pause_in_sleep` - Stop counting while the core sleeps
pub fn watchdog_config<T: AonTimer + ?Sized>(
    timer: &T,
    bark_cycles: u32,
    bite_cycles: u32,
    pause_in_sleep: bool,
) -> EscResult<()> {
    if bark_cycles >= bite_cycles {
        return Err(EscError::DRIVER_AON_TIMER_BAD_THRESHOLDS);
    }
    timer.watchdog_stop()?;
    timer.irq_acknowledge_all()?;
    timer.watchdog_start(bark_cycles, bite_cycles, pause_in_sleep, false)
}

/// Turn the always-on timer hardware off completely.
pub fn shutdown<T: AonTimer + ?Sized>(timer: &T) -> EscResult<()> {
    timer.wakeup_stop()?;
    timer.watchdog_stop()?;
    timer.irq_acknowledge_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};
    use std::vec::Vec;

    #[derive(Default)]
    struct FakeTimer {
        calls: RefCell<Vec<&'static str>>,
        thresholds: Cell<Option<(u32, u32)>>,
    }

    impl AonTimer for FakeTimer {
        fn watchdog_start(&self, bark: u32, bite: u32, _pause: bool, _lock: bool) -> EscResult<()> {
            self.calls.borrow_mut().push("start");
            self.thresholds.set(Some((bark, bite)));
            Ok(())
        }
        fn watchdog_stop(&self) -> EscResult<()> {
            self.calls.borrow_mut().push("stop");
            self.thresholds.set(None);
            Ok(())
        }
        fn wakeup_stop(&self) -> EscResult<()> {
            self.calls.borrow_mut().push("wakeup_stop");
            Ok(())
        }
        fn irq_acknowledge_all(&self) -> EscResult<()> {
            self.calls.borrow_mut().push("ack");
            Ok(())
        }
        fn watchdog_thresholds(&self) -> EscResult<Option<(u32, u32)>> {
            Ok(self.thresholds.get())
        }
    }

    #[test]
    fn test_watchdog_config() {
        let timer = FakeTimer::default();
        watchdog_config(&timer, 60, 160, false).unwrap();
        assert_eq!(*timer.calls.borrow(), ["stop", "ack", "start"]);
        assert_eq!(timer.watchdog_thresholds(), Ok(Some((60, 160))));
    }

    #[test]
    fn test_watchdog_config_rejects_bark_after_bite() {
        let timer = FakeTimer::default();
        assert_eq!(
            watchdog_config(&timer, 160, 160, false),
            Err(EscError::DRIVER_AON_TIMER_BAD_THRESHOLDS)
        );
        assert!(timer.calls.borrow().is_empty());
    }

    #[test]
    fn test_shutdown() {
        let timer = FakeTimer::default();
        watchdog_config(&timer, 1, 2, true).unwrap();
        shutdown(&timer).unwrap();
        assert_eq!(timer.watchdog_thresholds(), Ok(None));
    }
}
