//! Integration test common infrastructure.
//!
//! Provides a scripted IRC server the relay binary connects to, plus
//! helpers for writing configs and spawning the built binary.

pub mod server;

#[allow(unused_imports)]
pub use server::{ScriptedServer, ServerConn};

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

/// A spawned relay process, killed on drop.
pub struct RelayProc {
    child: Child,
    data_dir: tempfile::TempDir,
}

/// Options for the generated test config.
pub struct RelayOptions {
    pub irc_port: u16,
    pub udp_port: u16,
    pub channel: String,
    pub encoding: String,
    pub password: Option<String>,
    /// Plant a marker before spawning, as if another instance ran.
    pub preexisting_pidfile: bool,
}

impl RelayOptions {
    pub fn new(irc_port: u16, udp_port: u16) -> Self {
        Self {
            irc_port,
            udp_port,
            channel: "#demo".to_string(),
            encoding: "raw".to_string(),
            password: None,
            preexisting_pidfile: false,
        }
    }
}

impl RelayProc {
    /// Write a config pointing at the scripted server and spawn the
    /// binary with it.
    pub fn spawn(options: RelayOptions) -> anyhow::Result<Self> {
        let data_dir = tempfile::tempdir()?;
        let config_path = data_dir.path().join("udpircd.toml");
        let pidfile = data_dir.path().join("udpircd.pid");

        let password_line = options
            .password
            .as_deref()
            .map(|p| format!("password = \"{p}\"\n"))
            .unwrap_or_default();
        let config_content = format!(
            r#"
[server]
host = "127.0.0.1"
port = {irc_port}
nickname = "relay"
{password_line}
[instance]
pidfile = "{pidfile}"

[[bridge]]
udp_port = {udp_port}
channels = ["{channel}"]
encoding = "{encoding}"
"#,
            irc_port = options.irc_port,
            udp_port = options.udp_port,
            channel = options.channel,
            encoding = options.encoding,
            pidfile = pidfile.display(),
        );
        std::fs::write(&config_path, config_content)?;

        if options.preexisting_pidfile {
            std::fs::write(&pidfile, "99999\n")?;
        }

        let child = Command::new(env!("CARGO_BIN_EXE_udpircd"))
            .arg(&config_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, data_dir })
    }

    /// The pidfile path the spawned process was told to use.
    #[allow(dead_code)]
    pub fn pidfile(&self) -> PathBuf {
        self.data_dir.path().join("udpircd.pid")
    }

    /// Wait for the process to exit, polling with a deadline.
    #[allow(dead_code)]
    pub fn wait_for_exit(
        &mut self,
        timeout: std::time::Duration,
    ) -> anyhow::Result<std::process::ExitStatus> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            if std::time::Instant::now() >= deadline {
                anyhow::bail!("process did not exit within {timeout:?}");
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
    }
}

impl Drop for RelayProc {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Reserve a UDP port by binding to 0 and releasing the socket.
pub fn free_udp_port() -> anyhow::Result<u16> {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0")?;
    Ok(socket.local_addr()?.port())
}
