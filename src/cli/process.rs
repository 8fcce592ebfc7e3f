use std::{ffi::OsString, path::Path, process::Stdio};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, ProcessesToUpdate, Signal, System};
use tracing::info;

/// Terminates every other process running the same executable. Returns how many were stopped.
pub fn kill_previous_instances(name: &Path) -> Result<usize> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't find own process id {e}"))?;
    let mut stopped = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping previous instance {pid}");
            // This will forcefully terminate the process on Windows.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            stopped += 1;
        }
    }
    Ok(stopped)
}

/// Replaces running instances with a detached one started with `args`.
pub fn restart_in_background(args: Vec<OsString>) -> Result<()> {
    let process_name = std::env::current_exe()?;
    kill_previous_instances(&process_name)?;
    let mut command = std::process::Command::new(process_name);
    command.args(args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    #[cfg(feature = "win")]
    {
        use std::os::windows::process::CommandExt;
        use windows::Win32::System::Threading::DETACHED_PROCESS;
        command.creation_flags(DETACHED_PROCESS.0);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    #[allow(clippy::zombie_processes)]
    let child = command.spawn()?;
    info!("Spawned background instance {}", child.id());
    Ok(())
}
