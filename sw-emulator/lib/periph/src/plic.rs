/*++

Licensed under the Apache-2.0 license.

File Name:

    plic.rs

Abstract:

    File contains the emulated platform-level interrupt controller. Sources
    are level triggered: a gateway latches a high level into the pending
    bit, a claim moves it to in-service, and a completion re-arms the gateway
    if the source line is still high at that moment.

--*/

use escrst_drivers::top::{PLIC_IRQ_ID_LAST, PLIC_TARGET_COUNT};
use escrst_drivers::{EscError, EscResult, IrqId, Plic as PlicCapability, PlicTarget};
use std::cell::RefCell;
use std::rc::Rc;

const SOURCE_COUNT: usize = PLIC_IRQ_ID_LAST.0 as usize + 1;
const TARGET_COUNT: usize = PLIC_TARGET_COUNT as usize;

/// Reads the current level of a source line; `None` for unconnected sources
pub type LineSampler = Rc<dyn Fn(IrqId) -> Option<bool>>;

/// Interrupt controller
#[derive(Clone, Default)]
pub struct Plic {
    regs: Rc<RefCell<PlicImpl>>,
}

struct PlicImpl {
    priority: Vec<u32>,
    level: Vec<bool>,
    pending: Vec<bool>,
    in_service: Vec<bool>,
    enabled: Vec<Vec<bool>>,
    threshold: Vec<u32>,

    /// Completions without a matching claim
    unmatched_completions: u32,

    sampler: Option<LineSampler>,
}

impl Default for PlicImpl {
    fn default() -> Self {
        Self {
            priority: vec![0; SOURCE_COUNT],
            level: vec![false; SOURCE_COUNT],
            pending: vec![false; SOURCE_COUNT],
            in_service: vec![false; SOURCE_COUNT],
            enabled: vec![vec![false; SOURCE_COUNT]; TARGET_COUNT],
            threshold: vec![0; TARGET_COUNT],
            unmatched_completions: 0,
            sampler: None,
        }
    }
}

fn source_index(irq: IrqId) -> EscResult<usize> {
    if irq.0 == 0 || irq.0 > PLIC_IRQ_ID_LAST.0 {
        return Err(EscError::DRIVER_PLIC_BAD_IRQ_ID);
    }
    Ok(irq.0 as usize)
}

fn target_index(target: PlicTarget) -> EscResult<usize> {
    if target.0 >= PLIC_TARGET_COUNT {
        return Err(EscError::DRIVER_PLIC_BAD_TARGET);
    }
    Ok(target.0 as usize)
}

impl PlicImpl {
    /// Highest priority deliverable source, lowest id on ties
    fn best_candidate(&self, target: usize) -> Option<usize> {
        let mut best: Option<usize> = None;
        for id in 1..SOURCE_COUNT {
            if !self.pending[id]
                || !self.enabled[target][id]
                || self.priority[id] <= self.threshold[target]
            {
                continue;
            }
            if best.map_or(true, |b| self.priority[id] > self.priority[b]) {
                best = Some(id);
            }
        }
        best
    }
}

impl Plic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the level of an interrupt source.
    pub fn set_level(&self, irq: IrqId, high: bool) {
        let Ok(id) = source_index(irq) else {
            return;
        };
        let mut regs = self.regs.borrow_mut();
        regs.level[id] = high;
        if high && !regs.in_service[id] {
            regs.pending[id] = true;
        }
    }

    /// Whether `target` has an interrupt to take
    pub fn has_deliverable(&self, target: PlicTarget) -> bool {
        match target_index(target) {
            Ok(t) => self.regs.borrow().best_candidate(t).is_some(),
            Err(_) => false,
        }
    }

    pub fn is_pending(&self, irq: IrqId) -> bool {
        source_index(irq).map_or(false, |id| self.regs.borrow().pending[id])
    }

    /// Number of claims not yet completed
    pub fn outstanding_claims(&self) -> usize {
        self.regs.borrow().in_service.iter().filter(|s| **s).count()
    }

    pub fn unmatched_completions(&self) -> u32 {
        self.regs.borrow().unmatched_completions
    }

    /// Wire the source lines so a completion sees their live level.
    pub fn connect_lines(&self, sampler: impl Fn(IrqId) -> Option<bool> + 'static) {
        self.regs.borrow_mut().sampler = Some(Rc::new(sampler));
    }

    /// Reset the controller state. Line wiring is kept.
    pub fn reset(&self) {
        let mut regs = self.regs.borrow_mut();
        let sampler = regs.sampler.take();
        *regs = PlicImpl {
            sampler,
            ..PlicImpl::default()
        };
    }
}

impl PlicCapability for Plic {
    fn irq_set_priority(&self, irq: IrqId, priority: u32) -> EscResult<()> {
        let id = source_index(irq)?;
        self.regs.borrow_mut().priority[id] = priority;
        Ok(())
    }

    fn irq_set_enabled(&self, target: PlicTarget, irq: IrqId, enabled: bool) -> EscResult<()> {
        let t = target_index(target)?;
        let id = source_index(irq)?;
        self.regs.borrow_mut().enabled[t][id] = enabled;
        Ok(())
    }

    fn target_set_threshold(&self, target: PlicTarget, threshold: u32) -> EscResult<()> {
        let t = target_index(target)?;
        self.regs.borrow_mut().threshold[t] = threshold;
        Ok(())
    }

    fn claim(&self, target: PlicTarget) -> EscResult<IrqId> {
        let t = target_index(target)?;
        let mut regs = self.regs.borrow_mut();
        let id = regs
            .best_candidate(t)
            .ok_or(EscError::DRIVER_PLIC_NOTHING_PENDING)?;
        regs.pending[id] = false;
        regs.in_service[id] = true;
        Ok(IrqId(id as u32))
    }

    fn complete(&self, target: PlicTarget, irq: IrqId) -> EscResult<()> {
        target_index(target)?;
        let id = source_index(irq)?;
        let mut regs = self.regs.borrow_mut();
        if !regs.in_service[id] {
            regs.unmatched_completions += 1;
            return Err(EscError::DRIVER_PLIC_COMPLETE_NOT_CLAIMED);
        }
        regs.in_service[id] = false;
        let sampled = regs.sampler.as_ref().and_then(|sample| sample(irq));
        if let Some(level) = sampled {
            regs.level[id] = level;
        }
        if regs.level[id] {
            regs.pending[id] = true;
        }
        Ok(())
    }
}
