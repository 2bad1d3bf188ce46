//! Real-time scheduling helpers (Linux SCHED_FIFO and mlockall).
//!
//! Applied to the main thread before the dispatcher spawns its timing
//! thread, which inherits the policy.
#![cfg(target_os = "linux")]

use crate::cli::RtLock;

fn is_retryable_memlock_error(err: &std::io::Error) -> bool {
    matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
}

fn memlock_limit_hint() -> Option<String> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit only writes into the provided struct.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: rc == 0 means the struct was initialized.
    let cur = unsafe { rlim.assume_init() }.rlim_cur;
    if cur == libc::RLIM_INFINITY {
        Some("memlock limit: unlimited".to_string())
    } else {
        Some(format!("memlock limit: {} KiB", cur / 1024))
    }
}

fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
    // SAFETY: mlockall has no memory-safety preconditions.
    if unsafe { libc::mlockall(flags) } != 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn try_apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    let result = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => mlockall(libc::MCL_CURRENT),
        RtLock::All => mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE),
    };
    let Err(err) = result else {
        return Ok(());
    };

    // All failed on limits: Current may still fit
    if lock == RtLock::All && is_retryable_memlock_error(&err) && mlockall(libc::MCL_CURRENT).is_ok()
    {
        tracing::warn!(error = %err, "mlockall(current|future) failed; locked current pages only");
        return Ok(());
    }

    let mut msg = format!("mlockall failed: {err}");
    if is_retryable_memlock_error(&err) {
        if let Some(h) = memlock_limit_hint() {
            msg.push_str(&format!("; {h}"));
        }
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

fn try_apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    // SAFETY: plain syscalls without pointer arguments.
    let (min, max) = unsafe {
        let min = libc::sched_get_priority_min(libc::SCHED_FIFO);
        let max = libc::sched_get_priority_max(libc::SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let prio_val = prio.unwrap_or(max).clamp(min, max);
    let param = libc::sched_param {
        sched_priority: prio_val,
    };
    // SAFETY: param outlives the call.
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        eyre::bail!(
            "{err}; hint: run as root or grant CAP_SYS_NICE: 'sudo setcap cap_sys_nice=ep /path/to/bramp'"
        );
    }
    Ok(prio_val)
}

pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        match try_apply_mem_lock(lock) {
            Ok(()) => tracing::info!(mode = ?lock, "RT: memory lock applied"),
            Err(err) => tracing::warn!(error = %err, "RT: memory lock not applied"),
        }
        match try_apply_fifo_priority(prio) {
            Ok(p) => tracing::info!(prio = p, "RT: SCHED_FIFO enabled"),
            Err(err) => tracing::warn!(error = %err, "RT: sched_setscheduler(SCHED_FIFO) failed"),
        }
    });
}
