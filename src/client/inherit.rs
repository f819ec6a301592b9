//! Handing the server connection to child processes.
//!
//! A child receives the connection on a well-known file descriptor and the
//! injected allowlist in an environment variable. The list a parent passes
//! is its own; a child has no way to widen it.

use std::io;
use std::os::unix::io::{FromRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use super::{Client, Connection};

/// Environment variable naming the connection fd.
pub const ENV_FD: &str = "LLMBOX_VFS_FD";
/// Environment variable carrying the injected allowlist as a JSON array.
pub const ENV_INJECT: &str = "LLMBOX_VFS_INJECT";
/// Conventional fd the connection lands on in the child.
pub const DEFAULT_FD: RawFd = 3;

/// Arrange for `cmd` to inherit the connection at [`DEFAULT_FD`] and the
/// injected allowlist in the environment. `conn_fd` must stay open in the
/// parent until the child has spawned.
pub fn configure_command(
    cmd: &mut Command,
    conn_fd: RawFd,
    injected: &[PathBuf],
) -> io::Result<()> {
    let payload = serde_json::to_string(injected)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
    cmd.env(ENV_INJECT, payload);
    cmd.env(ENV_FD, DEFAULT_FD.to_string());

    // SAFETY: dup2 is async-signal-safe; conn_fd is owned by the caller
    unsafe {
        cmd.pre_exec(move || {
            if libc::dup2(conn_fd, DEFAULT_FD) < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
    Ok(())
}

/// Build a client from the inherited fd and environment. Virtual mode is
/// always on in children: the LLM drives them.
pub fn from_env() -> io::Result<Client> {
    let fd: RawFd = match std::env::var(ENV_FD) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad LLMBOX_VFS_FD"))?,
        Err(_) => DEFAULT_FD,
    };

    let injected: Vec<PathBuf> = match std::env::var(ENV_INJECT) {
        Ok(raw) => serde_json::from_str(&raw)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?,
        Err(_) => Vec::new(),
    };

    // SAFETY: the fd was placed there for us by configure_command
    let stream = unsafe { std::os::unix::net::UnixStream::from_raw_fd(fd) };
    stream.set_nonblocking(true)?;
    let stream = tokio::net::UnixStream::from_std(stream)?;
    let (reader, writer) = stream.into_split();

    Ok(Client::new(Connection::new(reader, writer), injected, true))
}
