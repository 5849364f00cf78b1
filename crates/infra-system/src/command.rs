// Shared tokio::process::Command construction for executor and launcher
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;

use testbed_core::domain::OutputMode;
use testbed_core::port::Invocation;

/// Build a command from an invocation: argv, working dir, env overrides, output mode
pub(crate) fn prepare(invocation: &Invocation<'_>) -> Command {
    let mut cmd = Command::new(invocation.command.program());
    cmd.args(invocation.command.args())
        .current_dir(invocation.working_dir)
        .stdin(Stdio::null());

    for key in invocation.env.removed() {
        cmd.env_remove(key);
    }
    cmd.envs(invocation.env.vars());

    match invocation.output {
        OutputMode::Streamed => cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit()),
        OutputMode::Suppressed => cmd.stdout(Stdio::null()).stderr(Stdio::null()),
    };
    cmd
}

/// Exit code of a finished process; `-N` when killed by signal N
pub(crate) fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}
