//! Running `solc --standard-json` as a child process.

use crate::{
    compile::{Compiler, CompilerOutput, SolcInput},
    errors::SolcError,
};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::{Duration, Instant},
};
use tokio::{io::AsyncWriteExt, process::Command};

/// Prefix of the names given to compiler containers.
pub const CONTAINER_PREFIX: &str = "solc-select-solc";

/// Where the compiler binary comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolcMode {
    /// A local binary, resolved per version.
    #[default]
    Native,
    /// `solc-select` inside a container.
    Docker,
}

/// A `solc` runner that speaks standard-json over stdin/stdout.
///
/// Every invocation runs on its own current-thread runtime, so the runner can be shared by
/// synchronous worker threads.
#[derive(Clone, Debug)]
pub struct Solc {
    mode: SolcMode,
    binary: Option<PathBuf>,
    svm_home: Option<PathBuf>,
    docker_image: String,
    timeout: Duration,
}

impl Default for Solc {
    fn default() -> Self {
        Self {
            mode: SolcMode::Native,
            binary: None,
            svm_home: None,
            docker_image: "solc_select_solc".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl Solc {
    /// Creates a runner for the given mode with default settings.
    pub fn new(mode: SolcMode) -> Self {
        Self { mode, ..Default::default() }
    }

    /// Always use this binary, regardless of the requested version.
    #[must_use]
    pub fn binary(mut self, binary: Option<PathBuf>) -> Self {
        self.binary = binary;
        self
    }

    /// Root of the per-version installs, the `svm` data directory by default.
    #[must_use]
    pub fn svm_home(mut self, svm_home: Option<PathBuf>) -> Self {
        self.svm_home = svm_home;
        self
    }

    /// Image used in [`SolcMode::Docker`].
    #[must_use]
    pub fn docker_image(mut self, image: impl Into<String>) -> Self {
        self.docker_image = image.into();
        self
    }

    /// Wall-clock limit of a single invocation.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the binary used for `version` in [`SolcMode::Native`].
    ///
    /// An explicitly configured binary wins, then the `svm` install of `version` below the
    /// configured home or the `svm` data directory, then `solc` from `PATH`.
    pub fn binary_for(&self, version: &Version) -> PathBuf {
        if let Some(binary) = &self.binary {
            return binary.clone();
        }
        let installed = match &self.svm_home {
            Some(home) => svm_binary(home, version),
            None => svm::version_binary(&version.to_string()),
        };
        if installed.is_file() {
            return installed;
        }
        trace!(target: "solidifi::solc", %version, "no svm install, falling back to `solc` on PATH");
        PathBuf::from("solc")
    }

    /// Returns the command that compiles standard-json read from stdin.
    ///
    /// In [`SolcMode::Docker`] the container is named `container`, so it can be removed if the
    /// client is killed.
    pub fn command(&self, version: &Version, container: &str) -> Command {
        match self.mode {
            SolcMode::Native => {
                let mut cmd = Command::new(self.binary_for(version));
                cmd.arg("--standard-json");
                cmd
            }
            SolcMode::Docker => {
                let mut cmd = Command::new("docker");
                cmd.args(["run", "--rm", "-i", "--name", container, &self.docker_image])
                    .args(["/bin/bash", "-c"])
                    .arg(format!("solc-select use {version} && solc --standard-json"));
                cmd
            }
        }
    }

    fn run(&self, version: &Version, input: &str) -> Result<Vec<u8>, SolcError> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(self.run_async(version, input))
    }

    async fn run_async(&self, version: &Version, input: &str) -> Result<Vec<u8>, SolcError> {
        let container = format!("{CONTAINER_PREFIX}-{}", uuid::Uuid::new_v4());
        let mut cmd = self.command(version, &container);
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
        trace!(target: "solidifi::solc", cmd = ?cmd.as_std(), "spawning compiler");
        let program = PathBuf::from(cmd.as_std().get_program());
        let mut child =
            cmd.spawn().map_err(|source| SolcError::Spawn { program: program.clone(), source })?;

        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input.as_bytes()).await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let run = async move { tokio::join!(write, child.wait_with_output()) };

        let Ok((write_result, output)) = tokio::time::timeout(self.timeout, run).await else {
            warn!(target: "solidifi::solc", program = %program.display(), "compiler timed out, killed it");
            if self.mode == SolcMode::Docker {
                remove_container(&container).await;
            }
            return Err(SolcError::Timeout(self.timeout));
        };
        let output = output?;
        if !output.status.success() && output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(SolcError::Exit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        // A compiler that rejects the input early may close stdin before reading it all.
        if let Err(err) = write_result
            && output.stdout.is_empty()
        {
            return Err(err.into());
        }
        Ok(output.stdout)
    }
}

impl Compiler for Solc {
    fn compile(&self, version: &Version, input: &SolcInput) -> Result<CompilerOutput, SolcError> {
        let json = serde_json::to_string(input)?;
        let start = Instant::now();
        let stdout = self.run(version, &json)?;
        debug!(target: "solidifi::solc", %version, elapsed = ?start.elapsed(), "compiled");
        Ok(serde_json::from_slice(&stdout)?)
    }
}

/// Returns the path `svm` installs `version` to below `home`.
pub fn svm_binary(home: &Path, version: &Version) -> PathBuf {
    home.join(version.to_string()).join(format!("solc-{version}"))
}

/// Force-removes a container whose `docker run` client was killed.
async fn remove_container(name: &str) {
    let status = Command::new("docker")
        .args(["rm", "-f", name])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => {
            debug!(target: "solidifi::solc", container = name, "removed timed out container")
        }
        Ok(status) => {
            warn!(target: "solidifi::solc", container = name, %status, "failed to remove container")
        }
        Err(err) => {
            warn!(target: "solidifi::solc", container = name, %err, "failed to run `docker rm`")
        }
    }
}
