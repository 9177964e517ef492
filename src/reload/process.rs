//! HAProxy process supervisor.

use std::process::{Child, Command};

use crate::reload::{ReloadError, Reloader};

/// Runs the HAProxy command and replaces it on every reload.
#[derive(Debug)]
pub struct HaproxyProcess {
    command: Vec<String>,
    current: Option<Child>,
}

impl HaproxyProcess {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            current: None,
        }
    }

    /// PID of the running process, if one was started.
    pub fn pid(&self) -> Option<u32> {
        self.current.as_ref().map(Child::id)
    }

    fn spawn(&self, previous: Option<u32>) -> Result<Child, ReloadError> {
        let (program, args) = self.command.split_first().ok_or(ReloadError::EmptyCommand)?;
        let mut command = Command::new(program);
        command.args(args);
        if let Some(pid) = previous {
            command.arg("-sf").arg(pid.to_string());
        }

        command.spawn().map_err(|source| ReloadError::Spawn {
            command: self.command.join(" "),
            source,
        })
    }
}

impl Reloader for HaproxyProcess {
    fn reload(&mut self) -> Result<(), ReloadError> {
        match self.current.take() {
            None => {
                let child = self.spawn(None)?;
                tracing::info!(pid = child.id(), "HAProxy started");
                self.current = Some(child);
            }
            Some(mut old) => {
                let old_pid = old.id();
                let child = match self.spawn(Some(old_pid)) {
                    Ok(child) => child,
                    Err(e) => {
                        // keep supervising the process that is still serving
                        self.current = Some(old);
                        return Err(e);
                    }
                };
                tracing::info!(pid = child.id(), old_pid, "HAProxy reloading");
                self.current = Some(child);

                let status = old.wait().map_err(|source| ReloadError::Wait {
                    pid: old_pid,
                    source,
                })?;
                tracing::info!(old_pid, %status, "Previous HAProxy exited");
            }
        }
        Ok(())
    }
}
