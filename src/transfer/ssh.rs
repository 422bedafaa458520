use std::fs::File;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use super::helpers::{display_path, remote_file_path};
use super::session::{RemoteSession, Transport};
use crate::JobError;
use crate::config::Credential;
use crate::parse::RemoteTarget;

/// SCP over libssh2. Connection timeouts are fixed transport defaults.
#[derive(Debug, Clone)]
pub struct Ssh2Transport {
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
}

impl Default for Ssh2Transport {
    fn default() -> Self {
        Self { connect_timeout: Duration::from_secs(10), io_timeout: Duration::from_secs(30) }
    }
}

impl Ssh2Transport {
    fn create_tcp_connection(&self, addr: &str) -> Result<TcpStream, JobError> {
        let mut addrs = addr
            .to_socket_addrs()
            .map_err(|e| JobError::Connection(format!("cannot resolve {}: {}", addr, e)))?;
        let sock = addrs
            .next()
            .ok_or_else(|| JobError::Connection(format!("no address for {}", addr)))?;
        let tcp = TcpStream::connect_timeout(&sock, self.connect_timeout)
            .map_err(|e| JobError::Connection(format!("{}: {}", addr, e)))?;
        let _ = tcp.set_read_timeout(Some(self.io_timeout));
        let _ = tcp.set_write_timeout(Some(self.io_timeout));
        Ok(tcp)
    }
}

impl Transport for Ssh2Transport {
    fn connect(
        &self,
        target: &RemoteTarget,
        credential: &Credential,
        port: u16,
    ) -> Result<Box<dyn RemoteSession>, JobError> {
        let addr = format!("{}:{}", target.host, port);
        let tcp = self.create_tcp_connection(&addr)?;
        let mut sess = ssh2::Session::new()
            .map_err(|e| JobError::Connection(format!("cannot create SSH session: {}", e)))?;
        sess.set_tcp_stream(tcp);
        sess.handshake()
            .map_err(|e| JobError::Connection(format!("SSH handshake with {} failed: {}", addr, e)))?;

        if authenticate(&mut sess, &target.principal, credential) {
            tracing::debug!(%addr, user = %target.principal, "SSH session authenticated");
            Ok(Box::new(Ssh2Session { sess, addr }))
        } else {
            let _ = sess.disconnect(None, "authentication failed", None);
            Err(JobError::Auth(format!("{}@{}", target.principal, addr)))
        }
    }
}

fn authenticate(sess: &mut ssh2::Session, username: &str, credential: &Credential) -> bool {
    match credential {
        Credential::Password(password) => {
            let _ = sess.userauth_password(username, password);
        }
        Credential::KeyFile { path, passphrase } => {
            let _ = sess.userauth_pubkey_file(username, None, path, passphrase.as_deref());
        }
        Credential::Agent => {
            let _ = sess.userauth_agent(username);
        }
        Credential::Default => {
            if !try_key_authentication(sess, username) {
                let _ = sess.userauth_agent(username);
            }
        }
    }
    sess.authenticated()
}

/// Try the usual private keys under ~/.ssh.
fn try_key_authentication(sess: &mut ssh2::Session, username: &str) -> bool {
    if sess.authenticated() {
        return true;
    }
    if let Some(home_p) = dirs::home_dir() {
        for name in ["id_ed25519", "id_rsa", "id_ecdsa"] {
            let p = home_p.join(".ssh").join(name);
            if p.exists() {
                let _ = sess.userauth_pubkey_file(username, None, &p, None);
                if sess.authenticated() {
                    return true;
                }
            }
        }
    }
    false
}

struct Ssh2Session {
    sess: ssh2::Session,
    addr: String,
}

impl RemoteSession for Ssh2Session {
    fn upload(&mut self, local: &Path, remote_dir: &str) -> Result<(), String> {
        let name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("invalid local file name: {}", display_path(local)))?;
        let remote = remote_file_path(remote_dir, name);

        let mut file = File::open(local)
            .map_err(|e| format!("local open failed: {}: {}", display_path(local), e))?;
        let size = file
            .metadata()
            .map_err(|e| format!("local stat failed: {}: {}", display_path(local), e))?
            .len();
        let mut channel = self
            .sess
            .scp_send(Path::new(&remote), 0o644, size, None)
            .map_err(|e| format!("remote create failed: {}: {}", remote, e))?;
        std::io::copy(&mut file, &mut channel)
            .map_err(|e| format!("remote write failed: {}: {}", remote, e))?;
        channel.send_eof().map_err(|e| format!("finishing {} failed: {}", remote, e))?;
        channel.wait_eof().map_err(|e| format!("finishing {} failed: {}", remote, e))?;
        channel.close().map_err(|e| format!("closing channel for {} failed: {}", remote, e))?;
        channel.wait_close().map_err(|e| format!("closing channel for {} failed: {}", remote, e))?;
        tracing::debug!(addr = %self.addr, %remote, bytes = size, "scp upload complete");
        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.sess.disconnect(None, "transfer run complete", None) {
            tracing::debug!(addr = %self.addr, "disconnect failed: {}", e);
        }
    }
}
