//! PTY (Pseudo-Terminal) transport for local shell sessions

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use std::io::{Read, Write};

use super::Transport;

/// Maximum time to retry writes before giving up
const WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);
/// Delay between retry attempts when the kernel buffer is full
const WRITE_RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(1);

/// Information about a process exit
#[derive(Debug, Clone)]
pub struct ExitInfo {
    /// Exit code (0 for success, non-zero for error)
    pub code: i32,
    /// Whether the process exited successfully
    pub success: bool,
}

impl ExitInfo {
    /// Format the exit reason as a human-readable string
    pub fn format_reason(&self) -> String {
        if self.success {
            "Exited normally".to_string()
        } else {
            format!("Exit code: {}", self.code)
        }
    }
}

/// Handle to a PTY with a spawned process
pub struct PtyTransport {
    master: Box<dyn MasterPty + Send>,
    child: Box<dyn Child + Send + Sync>,
    writer: Box<dyn Write + Send>,
    reader: Box<dyn Read + Send>,
}

impl PtyTransport {
    /// Spawn a shell command in a PTY sized to the engine's screen
    pub fn spawn(shell: &str, rows: u16, cols: u16) -> Result<Self> {
        let pty_system = native_pty_system();

        let pair = pty_system
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to open PTY")?;

        let mut parts = shell.split_whitespace();
        let program = parts.next().unwrap_or("/bin/sh");
        let mut cmd = CommandBuilder::new(program);
        cmd.args(parts);
        cmd.env("TERM", "ansi");

        let child = pair
            .slave
            .spawn_command(cmd)
            .context("Failed to spawn command in PTY")?;

        let reader = pair
            .master
            .try_clone_reader()
            .context("Failed to clone PTY reader")?;
        let writer = pair
            .master
            .take_writer()
            .context("Failed to take PTY writer")?;

        // Set non-blocking mode on Unix so polling never stalls the loop
        #[cfg(unix)]
        if let Some(fd) = pair.master.as_raw_fd() {
            unsafe {
                let flags = libc::fcntl(fd, libc::F_GETFL);
                if flags != -1 {
                    libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                }
            }
        }

        Ok(Self {
            master: pair.master,
            child,
            writer,
            reader,
        })
    }

    /// Write all bytes with retry logic for the non-blocking PTY
    fn write_all_with_retry(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        let start = std::time::Instant::now();

        while written < data.len() {
            if start.elapsed() > WRITE_TIMEOUT {
                anyhow::bail!(
                    "Timed out writing to PTY after {:?} ({} of {} bytes written)",
                    WRITE_TIMEOUT,
                    written,
                    data.len()
                );
            }

            match self.writer.write(&data[written..]) {
                Ok(0) => anyhow::bail!("Write returned 0 bytes"),
                Ok(n) => written += n,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(WRITE_RETRY_DELAY);
                }
                Err(e) => return Err(e).context("Failed to write to PTY"),
            }
        }
        Ok(())
    }

    /// Resize the PTY
    pub fn resize(&self, rows: u16, cols: u16) -> Result<()> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to resize PTY")
    }

    /// Check whether the child has exited
    pub fn check_exit(&mut self) -> Option<ExitInfo> {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                let code = status.exit_code() as i32;
                Some(ExitInfo {
                    code,
                    success: status.success(),
                })
            }
            _ => None,
        }
    }

    /// Terminate the child process
    pub fn shutdown(&mut self) {
        let _ = self.child.kill();
    }
}

impl Transport for PtyTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.reader.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e).context("Failed to read from PTY"),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.write_all_with_retry(data)?;
        self.writer.flush().context("Failed to flush PTY writer")?;
        Ok(data.len())
    }
}
