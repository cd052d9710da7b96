//! mpv player driver.
//!
//! The daemon needs three verbs from the media engine (load a stream,
//! stop, set volume), none of which require reading command responses, so
//! the IPC here is fire-and-forget JSON lines.  A drain task consumes
//! everything mpv writes back (logged at debug) so the socket buffer never
//! fills.  The process is spawned lazily on first use and respawned once
//! if a write hits a dead pipe.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use tuner_core::platform;

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

#[cfg(unix)]
type PipeWriter = tokio::net::unix::OwnedWriteHalf;
#[cfg(windows)]
type PipeWriter = tokio::io::WriteHalf<tokio::net::windows::named_pipe::NamedPipeClient>;

/// External playback capability.  One shared handle; no overlapping audio.
#[async_trait]
pub trait Player {
    /// Start playing `url`, replacing any current playback.
    async fn play(&mut self, url: &str) -> anyhow::Result<()>;
    /// Stop playback.  Idempotent; a no-op when nothing is playing.
    async fn stop(&mut self) -> anyhow::Result<()>;
    /// Set output volume, clamped to 0..=100.
    async fn set_volume(&mut self, volume: u8) -> anyhow::Result<()>;
}

pub struct MpvPlayer {
    socket_name: String,
    process: Option<tokio::process::Child>,
    writer: Option<PipeWriter>,
    volume: u8,
}

impl MpvPlayer {
    pub fn new(volume: u8) -> Self {
        Self {
            socket_name: platform::mpv_socket_name(),
            process: None,
            writer: None,
            volume: volume.min(100),
        }
    }

    fn process_alive(&mut self) -> bool {
        if let Some(ref mut child) = self.process {
            child.try_wait().ok().flatten().is_none()
        } else {
            false
        }
    }

    async fn kill(&mut self) {
        self.writer = None;
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }
    }

    fn spawn_process(&mut self) -> anyhow::Result<()> {
        let mpv_binary = platform::find_mpv_binary().context("mpv binary not found")?;
        let child = tokio::process::Command::new(mpv_binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg(platform::mpv_socket_arg())
            .arg("--quiet")
            .arg(format!("--volume={}", self.volume))
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        self.process = Some(child);
        Ok(())
    }

    #[cfg(unix)]
    async fn spawn_and_connect(&mut self) -> anyhow::Result<()> {
        self.kill().await;

        let socket_path = std::path::PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        info!("mpv: spawning new process");
        self.spawn_process()?;

        // Wait for socket to appear
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            if socket_path.exists() {
                break;
            }
        }
        if !socket_path.exists() {
            anyhow::bail!("mpv IPC socket did not appear");
        }

        let stream = UnixStream::connect(&socket_path).await?;
        let (read_half, write_half) = stream.into_split();
        spawn_drain(BufReader::new(read_half));
        self.writer = Some(write_half);
        info!("mpv: connected to IPC socket");
        Ok(())
    }

    #[cfg(windows)]
    async fn spawn_and_connect(&mut self) -> anyhow::Result<()> {
        self.kill().await;

        info!("mpv: spawning new process");
        self.spawn_process()?;

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                let (read_half, write_half) = tokio::io::split(client);
                spawn_drain(BufReader::new(read_half));
                self.writer = Some(write_half);
                info!("mpv: connected to named pipe");
                return Ok(());
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }

    async fn ensure_connected(&mut self) -> anyhow::Result<()> {
        if self.writer.is_some() && self.process_alive() {
            return Ok(());
        }
        self.spawn_and_connect().await
    }

    async fn send(&mut self, command: Value) -> anyhow::Result<()> {
        let mut raw = serde_json::to_string(&json!({ "command": command }))?;
        raw.push('\n');

        self.ensure_connected().await?;
        if let Err(err) = self.write_raw(&raw).await {
            // one respawn attempt on a dead pipe
            warn!(error = %err, "mpv: write failed, respawning");
            self.spawn_and_connect().await?;
            self.write_raw(&raw).await?;
        }
        Ok(())
    }

    async fn write_raw(&mut self, raw: &str) -> anyhow::Result<()> {
        let writer = self.writer.as_mut().context("mpv IPC not connected")?;
        writer.write_all(raw.as_bytes()).await?;
        Ok(())
    }
}

#[async_trait]
impl Player for MpvPlayer {
    async fn play(&mut self, url: &str) -> anyhow::Result<()> {
        // "replace" unloads whatever is playing before starting the new
        // stream, so there is never overlapping audio
        self.send(json!(["loadfile", url, "replace"])).await
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if self.writer.is_none() {
            // nothing was ever played; do not spawn mpv just to stop it
            return Ok(());
        }
        self.send(json!(["stop"])).await
    }

    async fn set_volume(&mut self, volume: u8) -> anyhow::Result<()> {
        let volume = volume.min(100);
        self.volume = volume;
        if self.writer.is_none() {
            // remembered and applied via --volume at spawn time
            return Ok(());
        }
        self.send(json!(["set_property", "volume", volume])).await
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        if let Some(mut p) = self.process.take() {
            let _ = p.start_kill();
        }
    }
}

fn spawn_drain<R>(mut reader: BufReader<R>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    debug!("mpv: IPC connection closed");
                    break;
                }
                Ok(_) => debug!(reply = %line.trim(), "mpv"),
                Err(err) => {
                    debug!(error = %err, "mpv: IPC read failed");
                    break;
                }
            }
        }
    });
}
