use std::{
    os::unix::process::ExitStatusExt,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use futures::StreamExt;
use libc::{killpg, setsid, SIGINT, SIGKILL};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
};
use tokio_stream::wrappers::SplitStream;

use crate::{
    error::{Error, Result},
    process_manager::{
        base::ProcessManager,
        types::{BoxStream, CommandSpec, ProcId, Spawned},
    },
};

#[derive(Debug)]
struct ChildRec {
    child: Child,
    pgid: libc::pid_t,
}

/// Unix-specific process manager.
///
/// Every process is started as the leader of a new session, so signals are
/// delivered to the whole process group, including any workers it forked.
#[derive(Debug, Default)]
pub struct UnixProcessManager {
    processes: Vec<Option<ChildRec>>,
}

impl UnixProcessManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, id: ProcId) -> Result<usize> {
        usize::try_from(id.0)
            .ok()
            .filter(|index| *index < self.processes.len())
            .ok_or(Error::UnknownProcess(id))
    }

    fn record_mut(&mut self, id: ProcId) -> Result<&mut ChildRec> {
        let index = self.index(id)?;
        self.processes[index]
            .as_mut()
            .ok_or(Error::AlreadyExited(id))
    }

    fn signal_group(&mut self, id: ProcId, signal: libc::c_int) -> Result<()> {
        let pgid = self.record_mut(id)?.pgid;

        tracing::debug!("Sending signal {signal} to process group {pgid}");
        #[allow(unsafe_code)]
        unsafe {
            if killpg(pgid, signal) == -1 {
                return Err(Error::IOError(std::io::Error::last_os_error()));
            }
        }

        Ok(())
    }

    fn reap(&mut self, id: ProcId, status: ExitStatus) -> Result<i32> {
        let index = self.index(id)?;
        self.processes[index] = None;
        Ok(exit_code(status))
    }
}

#[async_trait::async_trait]
impl ProcessManager for UnixProcessManager {
    async fn spawn(&mut self, spec: CommandSpec) -> Result<Spawned> {
        let Some((program, args)) = spec.cmd.split_first() else {
            return Err(Error::EmptyCommand(spec.name));
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }

        #[allow(unsafe_code)]
        unsafe {
            cmd.pre_exec(|| {
                if setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;

        let pid = child.id();
        let pgid = pid
            .and_then(|pid| libc::pid_t::try_from(pid).ok())
            .ok_or_else(|| Error::IOError(std::io::Error::other("pid not available")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::IOError(std::io::Error::other("stdout not piped")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::IOError(std::io::Error::other("stderr not piped")))?;

        tracing::debug!("Spawned `{}` as pid {pgid}", spec.name);

        let id = ProcId(self.processes.len() as u64);
        self.processes.push(Some(ChildRec { child, pgid }));

        Ok(Spawned {
            id,
            pid,
            stdout: lines(stdout),
            stderr: lines(stderr),
        })
    }

    async fn shutdown(&mut self, id: ProcId) -> Result<()> {
        self.signal_group(id, SIGINT)
    }

    async fn wait(&mut self, id: ProcId, d: Duration) -> Result<Option<i32>> {
        let proc = self.record_mut(id)?;
        let waited = tokio::time::timeout(d, proc.child.wait()).await;
        match waited {
            Ok(status) => Ok(Some(self.reap(id, status?)?)),
            Err(_) => Ok(None),
        }
    }

    async fn wait_exit(&mut self, id: ProcId) -> Result<i32> {
        let status = self.record_mut(id)?.child.wait().await?;
        self.reap(id, status)
    }

    async fn kill(&mut self, id: ProcId) -> Result<()> {
        self.signal_group(id, SIGKILL)
    }
}

fn lines<R>(reader: R) -> BoxStream<String>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let stream = SplitStream::new(BufReader::new(reader).split(b'\n')).filter_map(|res| async move {
        res.ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).trim_end_matches('\r').to_owned())
    });
    Box::pin(stream)
}

/// Exit code of a finished process; death by signal `n` reports `128 + n`.
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}
