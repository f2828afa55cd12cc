use std::io;
use std::io::Read;
use std::process::{Child, ChildStdout, Command, Output, Stdio};
use std::time::{Duration, Instant};

/// Live log stream backed by a child process; the child is killed when the
/// stream is dropped so a `--follow` invocation does not outlive the caller.
pub(crate) struct LogStream {
    child: Child,
    stdout: ChildStdout,
}

impl LogStream {
    pub(crate) fn new(child: Child, stdout: ChildStdout) -> Self {
        Self { child, stdout }
    }
}

impl Read for LogStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Run a command to completion with a wall-clock bound.
///
/// Returns `Ok(None)` when the deadline expires; the child is killed and
/// reaped before returning. Used for engine detection probes, which must
/// never hang the orchestrator on a wedged daemon socket.
pub(crate) fn run_with_timeout(
    command: &mut Command,
    timeout: Duration,
) -> io::Result<Option<Output>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            return child.wait_with_output().map(Some);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(25));
    }
}

/// Probe for a binary by running it with the given arguments and a short
/// timeout; true only on a zero exit within the deadline.
pub(crate) fn probe_command(bin: &str, args: &[&str], timeout: Duration) -> bool {
    let mut cmd = Command::new(bin);
    cmd.args(args);
    matches!(run_with_timeout(&mut cmd, timeout), Ok(Some(out)) if out.status.success())
}
