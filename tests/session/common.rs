use std::path::PathBuf;

use tempfile::TempDir;
use tokio::task::JoinHandle;

use llmbox::client::{Client, Connection};
use llmbox::server::admission::Allowlist;
use llmbox::server::{serve, ServeError, ServerConfig};
use llmbox::server::state::DEFAULT_CHUNK_CAP;

/// One in-process session: a server task on the far end of a duplex pipe
/// and a client in virtual mode on the near end.
pub struct Fixture {
    pub tempdir: TempDir,
    pub client: Client,
    pub server: JoinHandle<Result<(), ServeError>>,
}

impl Fixture {
    /// Allowlist the whole tempdir in both directions, inject nothing.
    pub fn new() -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        let root = tempdir.path().to_path_buf();
        Self::build(tempdir, Some((vec![root.clone()], vec![root])), Vec::new())
    }

    /// Allowlist and inject exactly the named entries, resolved inside the
    /// fixture's tempdir. Entries need not exist yet.
    pub fn with_injected(inputs: &[&str], outputs: &[&str]) -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        let inputs: Vec<PathBuf> = inputs.iter().map(|rel| tempdir.path().join(rel)).collect();
        let outputs: Vec<PathBuf> = outputs.iter().map(|rel| tempdir.path().join(rel)).collect();
        let injected = inputs.iter().chain(outputs.iter()).cloned().collect();
        Self::build(tempdir, Some((inputs, outputs)), injected)
    }

    /// No startup allowlist; the first `init` installs one.
    pub fn bare() -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        Self::build(tempdir, None, Vec::new())
    }

    fn build(
        tempdir: TempDir,
        lists: Option<(Vec<PathBuf>, Vec<PathBuf>)>,
        injected: Vec<PathBuf>,
    ) -> Self {
        let allowlist = lists
            .map(|(read, write)| Allowlist::new(read, write).expect("build allowlist"));
        let config = ServerConfig { allowlist, chunk_cap: DEFAULT_CHUNK_CAP };

        let (near, far) = tokio::io::duplex(1 << 16);
        let (server_read, server_write) = tokio::io::split(far);
        let server = tokio::spawn(serve(server_read, server_write, config));

        let (client_read, client_write) = tokio::io::split(near);
        let client = Client::new(Connection::new(client_read, client_write), injected, true);

        Self { tempdir, client, server }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.tempdir.path().join(rel)
    }

    pub fn path_str(&self, rel: &str) -> String {
        self.path(rel).to_string_lossy().into_owned()
    }

    pub fn write_file(&self, rel: &str, data: &[u8]) {
        std::fs::write(self.path(rel), data).expect("write fixture file");
    }

    pub fn read_file(&self, rel: &str) -> Vec<u8> {
        std::fs::read(self.path(rel)).expect("read fixture file")
    }
}
