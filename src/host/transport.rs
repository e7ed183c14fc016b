//! Transport
//!
//! Carries serialized update batches to the host side. The engine only
//! needs `send` plus `reopen` for the one-retry policy; the concrete
//! implementation here speaks length-prefixed frames over a unix socket.

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// Channel to the host-side consumer of update batches.
pub trait Transport {
    /// Send one already-framed batch.
    fn send(&mut self, frame: &[u8]) -> Result<()>;
    /// Tear down and re-establish the channel.
    fn reopen(&mut self) -> Result<()>;
}

/// Default socket path, scoped to the current user's runtime directory.
pub fn socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .unwrap_or_else(|_| format!("/run/user/{}", unsafe { libc::getuid() }));
    PathBuf::from(runtime_dir).join("mirage.sock")
}

/// Unix-socket transport. The connection is established lazily on the first
/// send so the agent can start before the host-side listener does.
pub struct UnixTransport {
    path: PathBuf,
    stream: Option<UnixStream>,
}

impl UnixTransport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stream: None,
        }
    }

    fn connect(&mut self) -> Result<&mut UnixStream> {
        if self.stream.is_none() {
            let stream = UnixStream::connect(&self.path)
                .with_context(|| format!("connecting to {}", self.path.display()))?;
            info!("transport connected to {}", self.path.display());
            self.stream = Some(stream);
        }
        Ok(self.stream.as_mut().expect("just connected"))
    }
}

impl Transport for UnixTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let stream = self.connect()?;
        if let Err(err) = stream.write_all(frame).and_then(|_| stream.flush()) {
            // A dead peer must not leave a half-written stream around.
            self.stream = None;
            return Err(err).context("writing update batch");
        }
        Ok(())
    }

    fn reopen(&mut self) -> Result<()> {
        self.stream = None;
        self.connect()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::os::unix::net::UnixListener;

    #[test]
    fn test_send_over_socket() {
        let dir = std::env::temp_dir().join(format!("mirage-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("t.sock");
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).unwrap();

        let mut transport = UnixTransport::new(&path);
        transport.send(b"\x00\x00\x00\x02[]").unwrap();

        let (mut peer, _) = listener.accept().unwrap();
        let mut buf = [0u8; 6];
        peer.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"\x00\x00\x00\x02[]");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_send_without_listener_fails_then_reopens() {
        let dir = std::env::temp_dir().join(format!("mirage-test2-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("t.sock");
        let _ = std::fs::remove_file(&path);

        let mut transport = UnixTransport::new(&path);
        assert!(transport.send(b"x").is_err());

        // A listener appears; reopen establishes the channel.
        let listener = UnixListener::bind(&path).unwrap();
        transport.reopen().unwrap();
        transport.send(b"y").unwrap();
        drop(listener);
        std::fs::remove_file(&path).ok();
    }
}
