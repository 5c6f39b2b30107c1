/*++

Licensed under the Apache-2.0 license.

File Name:

    plic.rs

Abstract:

    File contains the platform-level interrupt controller capability and the
    claim guard used by interrupt handlers.

--*/

use crate::{EscError, EscResult};

/// Interrupt source id
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct IrqId(pub u32);

/// Interrupt target (a hart context)
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PlicTarget(pub u32);

/// Lowest priority that still delivers an interrupt
pub const MIN_PRIORITY: u32 = 1;

/// Interrupt controller capability
pub trait Plic {
    fn irq_set_priority(&self, irq: IrqId, priority: u32) -> EscResult<()>;

    fn irq_set_enabled(&self, target: PlicTarget, irq: IrqId, enabled: bool) -> EscResult<()>;

    fn target_set_threshold(&self, target: PlicTarget, threshold: u32) -> EscResult<()>;

    /// Claim the highest priority pending interrupt for `target`.
    fn claim(&self, target: PlicTarget) -> EscResult<IrqId>;

    /// Release an interrupt id previously returned by `claim`.
    fn complete(&self, target: PlicTarget, irq: IrqId) -> EscResult<()>;
}

/// Enable every interrupt id in `low..=high` for `target` at the minimum
/// priority, and open the target's threshold.
pub fn irq_range_enable<P: Plic + ?Sized>(
    plic: &P,
    target: PlicTarget,
    low: IrqId,
    high: IrqId,
) -> EscResult<()> {
    if low > high {
        return Err(EscError::DRIVER_PLIC_BAD_RANGE);
    }
    for id in low.0..=high.0 {
        plic.irq_set_priority(IrqId(id), MIN_PRIORITY)?;
        plic.irq_set_enabled(target, IrqId(id), true)?;
    }
    plic.target_set_threshold(target, 0)
}

/// A claimed interrupt. The id is completed exactly once: explicitly through
/// [`ClaimedIrq::complete`], or on drop.
pub struct ClaimedIrq<'a, P: Plic + ?Sized> {
    plic: &'a P,
    target: PlicTarget,
    id: IrqId,
    completed: bool,
}

impl<'a, P: Plic + ?Sized> ClaimedIrq<'a, P> {
    pub fn claim(plic: &'a P, target: PlicTarget) -> EscResult<Self> {
        let id = plic.claim(target)?;
        Ok(Self {
            plic,
            target,
            id,
            completed: false,
        })
    }

    pub fn id(&self) -> IrqId {
        self.id
    }

    pub fn complete(mut self) -> EscResult<()> {
        self.completed = true;
        self.plic.complete(self.target, self.id)
    }
}

impl<P: Plic + ?Sized> Drop for ClaimedIrq<'_, P> {
    fn drop(&mut self) {
        if !self.completed {
            self.completed = true;
            // Errors cannot propagate out of drop; the controller's ledger
            // still records the completion attempt.
            let _ = self.plic.complete(self.target, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use std::vec::Vec;

    #[derive(Default)]
    struct FakePlic {
        log: RefCell<Vec<(&'static str, u32)>>,
    }

    impl Plic for FakePlic {
        fn irq_set_priority(&self, irq: IrqId, _priority: u32) -> EscResult<()> {
            self.log.borrow_mut().push(("priority", irq.0));
            Ok(())
        }
        fn irq_set_enabled(&self, _target: PlicTarget, irq: IrqId, _en: bool) -> EscResult<()> {
            self.log.borrow_mut().push(("enable", irq.0));
            Ok(())
        }
        fn target_set_threshold(&self, _target: PlicTarget, threshold: u32) -> EscResult<()> {
            self.log.borrow_mut().push(("threshold", threshold));
            Ok(())
        }
        fn claim(&self, _target: PlicTarget) -> EscResult<IrqId> {
            self.log.borrow_mut().push(("claim", 42));
            Ok(IrqId(42))
        }
        fn complete(&self, _target: PlicTarget, irq: IrqId) -> EscResult<()> {
            self.log.borrow_mut().push(("complete", irq.0));
            Ok(())
        }
    }

    #[test]
    fn test_irq_range_enable() {
        let plic = FakePlic::default();
        irq_range_enable(&plic, PlicTarget(0), IrqId(3), IrqId(4)).unwrap();
        assert_eq!(
            *plic.log.borrow(),
            [
                ("priority", 3),
                ("enable", 3),
                ("priority", 4),
                ("enable", 4),
                ("threshold", 0)
            ]
        );
        assert_eq!(
            irq_range_enable(&plic, PlicTarget(0), IrqId(5), IrqId(4)),
            Err(EscError::DRIVER_PLIC_BAD_RANGE)
        );
    }

    #[test]
    fn test_claim_completes_on_drop() {
        let plic = FakePlic::default();
        {
            let claimed = ClaimedIrq::claim(&plic, PlicTarget(0)).unwrap();
            assert_eq!(claimed.id(), IrqId(42));
        }
        assert_eq!(*plic.log.borrow(), [("claim", 42), ("complete", 42)]);
    }

    #[test]
    fn test_claim_completes_once() {
        let plic = FakePlic::default();
        let claimed = ClaimedIrq::claim(&plic, PlicTarget(0)).unwrap();
        claimed.complete().unwrap();
        assert_eq!(*plic.log.borrow(), [("claim", 42), ("complete", 42)]);
    }
}
