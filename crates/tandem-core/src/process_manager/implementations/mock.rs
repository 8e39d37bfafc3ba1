use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{
    error::{Error, Result},
    process_manager::{
        base::ProcessManager,
        types::{CommandSpec, ProcId, Spawned},
    },
};

/// Scripted behaviour shared by every [`MockProcessManager`] built from it.
#[derive(Debug)]
pub struct MockScript {
    fail_spawn: bool,
    exit_code: Option<i32>,
    honor_sigint: bool,
    output: Vec<String>,
    calls: Mutex<Vec<&'static str>>,
    specs: Mutex<Vec<CommandSpec>>,
    exit: watch::Sender<Option<i32>>,
}

impl MockScript {
    fn build(fail_spawn: bool, exit_code: Option<i32>, honor_sigint: bool) -> Self {
        Self {
            fail_spawn,
            exit_code,
            honor_sigint,
            output: Vec::new(),
            calls: Mutex::new(Vec::new()),
            specs: Mutex::new(Vec::new()),
            exit: watch::channel(None).0,
        }
    }

    pub fn exits_with(code: i32) -> Self {
        Self::build(false, Some(code), true)
    }

    pub fn runs_until_signalled(honor_sigint: bool) -> Self {
        Self::build(false, None, honor_sigint)
    }

    pub fn fails_to_spawn() -> Self {
        Self::build(true, None, true)
    }

    pub fn with_output(mut self, lines: &[&str]) -> Self {
        self.output = lines.iter().map(|line| (*line).to_owned()).collect();
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.specs.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn terminate(&self, code: i32) {
        self.exit.send_if_modified(|exit| {
            if exit.is_none() {
                *exit = Some(code);
                true
            } else {
                false
            }
        });
    }
}

#[derive(Debug, Clone)]
pub struct MockProcessManager {
    script: Arc<MockScript>,
}

impl MockProcessManager {
    pub fn new(script: Arc<MockScript>) -> Self {
        Self { script }
    }
}

#[async_trait]
impl ProcessManager for MockProcessManager {
    async fn spawn(&mut self, spec: CommandSpec) -> Result<Spawned> {
        self.script.record("spawn");
        self.script.specs.lock().unwrap().push(spec);

        if self.script.fail_spawn {
            return Err(Error::IOError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            )));
        }
        if let Some(code) = self.script.exit_code {
            self.script.terminate(code);
        }

        Ok(Spawned {
            id: ProcId(0),
            pid: Some(4242),
            stdout: Box::pin(futures::stream::iter(self.script.output.clone())),
            stderr: Box::pin(futures::stream::empty()),
        })
    }

    async fn shutdown(&mut self, _id: ProcId) -> Result<()> {
        self.script.record("shutdown");
        if self.script.honor_sigint {
            self.script.terminate(130);
        }
        Ok(())
    }

    async fn wait(&mut self, id: ProcId, d: Duration) -> Result<Option<i32>> {
        tokio::time::timeout(d, self.wait_exit(id)).await.ok().transpose()
    }

    async fn wait_exit(&mut self, _id: ProcId) -> Result<i32> {
        let mut exit = self.script.exit.subscribe();
        let code = *exit
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::IOError(std::io::Error::other("mock closed")))?;
        Ok(code.unwrap_or_default())
    }

    async fn kill(&mut self, _id: ProcId) -> Result<()> {
        self.script.record("kill");
        self.script.terminate(137);
        Ok(())
    }
}
