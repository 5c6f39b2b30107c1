// Licensed under the Apache-2.0 license

use crate::context::TestContext;
use escrst_drivers::{log_info, Cpu, Platform};

/// Trigger the clock manager idle-count fault. The platform turns an aborted
/// core into a stalled idle counter, which raises the clock manager's fatal
/// alert.
pub fn inject<P: Platform>(ctx: &TestContext<P>) {
    log_info!("Ready for error injection");
    ctx.cpu().abort();
}
