//! Keeping a clone and everything it starts killable as one unit.
//!
//! `git clone` forks helpers (`ssh`, `git-remote-https`, `index-pack`) that
//! inherit the output pipes. Killing only the direct child on timeout would
//! leave them running with the pipes held open, so the child becomes leader
//! of a fresh process group before exec and the whole group is killed.

use std::io;

use tokio::process::Child;

/// Runs in the forked child before exec.
///
/// Makes the child leader of its own process group. On Linux it also asks
/// for SIGTERM when `parent_pid` goes away, so an aborted census run does not
/// leave clones behind.
#[cfg(unix)]
#[cfg_attr(not(target_os = "linux"), allow(unused_variables))]
pub(crate) fn detach_into_own_group(parent_pid: libc::pid_t) -> io::Result<()> {
    if unsafe { libc::setpgid(0, 0) } == -1 {
        return Err(io::Error::last_os_error());
    }
    #[cfg(target_os = "linux")]
    exit_with_parent(parent_pid)?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn exit_with_parent(parent_pid: libc::pid_t) -> io::Result<()> {
    if unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) } == -1 {
        return Err(io::Error::last_os_error());
    }
    // The parent may have exited between fork and prctl.
    if unsafe { libc::getppid() } != parent_pid {
        unsafe {
            libc::raise(libc::SIGTERM);
        }
    }
    Ok(())
}

/// SIGKILL the clone's whole process group.
///
/// A child that was already reaped, or a group that is already empty, is not
/// an error.
#[cfg(unix)]
pub(crate) fn kill_clone_group(child: &Child) -> io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    // The child leads its own group, so its pid is the group id.
    if unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) } == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn kill_clone_group(_child: &Child) -> io::Result<()> {
    Ok(())
}
