use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::command::{format_command, CommandOutput, CommandRunner, DefaultCommandRunner};
use crate::{BuildError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenConfig {
    /// Maven executable to use. A bare name is looked up on `PATH`. When unset
    /// the project's wrapper is tried, then `mvn` on `PATH`.
    pub executable: Option<PathBuf>,
    /// Prefer the Maven wrapper (`mvnw`) when the project ships one.
    pub prefer_wrapper: bool,
    /// Wall-clock limit for a single Maven run.
    pub timeout: Option<Duration>,
}

impl Default for MavenConfig {
    fn default() -> Self {
        Self {
            executable: None,
            prefer_wrapper: true,
            timeout: None,
        }
    }
}

/// How `dependency:tree` is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationMode {
    /// Quiet batch run that writes the tree to a file Maven is told about.
    Embedded,
    /// Regular batch run; the tree is scraped from Maven's log on stdout.
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTreeRequest {
    pub pom: PathBuf,
    pub local_repository: Option<PathBuf>,
    pub offline: bool,
    /// Profiles in `-P` syntax (`a,!b`).
    pub profiles: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DependencyTreeRun {
    pub command: String,
    pub output: CommandOutput,
    /// Tree text: the output file for [`InvocationMode::Embedded`], stdout for
    /// [`InvocationMode::External`].
    pub tree: String,
}

impl DependencyTreeRun {
    pub fn exit_code(&self) -> Option<i32> {
        self.output.status.code()
    }

    pub fn success(&self) -> bool {
        self.output.status.success()
    }

    pub fn into_error(self) -> BuildError {
        BuildError::CommandFailed {
            tool: "maven",
            errors: self.output.maven_errors(),
            command: self.command,
            code: self.output.status.code(),
            stdout: self.output.stdout,
            stderr: self.output.stderr,
        }
    }
}

#[derive(Debug)]
pub struct MavenBuild {
    config: MavenConfig,
    runner: Arc<dyn CommandRunner>,
}

impl MavenBuild {
    pub fn new(config: MavenConfig) -> Self {
        let runner = Arc::new(DefaultCommandRunner::new(config.timeout));
        Self::with_runner(config, runner)
    }

    pub fn with_runner(config: MavenConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &MavenConfig {
        &self.config
    }

    /// Finds the Maven executable for a project: the configured one, then the
    /// wrapper in `project_dir` or one of its ancestors, then `PATH`.
    pub fn locate_executable(&self, project_dir: &Path) -> Option<PathBuf> {
        let path_var = std::env::var_os("PATH").unwrap_or_default();

        if let Some(configured) = &self.config.executable {
            if configured.components().count() > 1 || configured.is_absolute() {
                return configured.is_file().then(|| configured.clone());
            }
            return find_in_path(&path_var, &[configured.as_os_str()]);
        }

        if self.config.prefer_wrapper {
            let wrapper = if cfg!(windows) { "mvnw.cmd" } else { "mvnw" };
            if let Some(found) = project_dir
                .ancestors()
                .map(|dir| dir.join(wrapper))
                .find(|candidate| candidate.is_file())
            {
                return Some(found);
            }
        }

        let names: &[&str] = if cfg!(windows) {
            &["mvn.cmd", "mvn.bat", "mvn.exe", "mvnw.cmd"]
        } else {
            &["mvn", "mvnw"]
        };
        let names: Vec<&OsStr> = names.iter().map(OsStr::new).collect();
        find_in_path(&path_var, &names)
    }

    /// Runs `dependency:tree` for `request.pom`.
    ///
    /// A non-zero exit is not an error here; callers decide what a failed run
    /// means. A missing executable is [`BuildError::ExecutableNotFound`].
    pub fn dependency_tree(
        &self,
        request: &DependencyTreeRequest,
        mode: InvocationMode,
    ) -> Result<DependencyTreeRun> {
        let project_dir = request
            .pom
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let program = self
            .locate_executable(project_dir)
            .ok_or_else(|| BuildError::ExecutableNotFound {
                name: "mvn".to_string(),
            })?;

        let output_file = match mode {
            InvocationMode::Embedded => Some(
                tempfile::Builder::new()
                    .prefix("pomkit-tree-")
                    .suffix(".txt")
                    .tempfile()?,
            ),
            InvocationMode::External => None,
        };
        let args = dependency_tree_args(request, mode, output_file.as_ref().map(|f| f.path()));
        let command = format_command(&program, &args);

        let output = self
            .runner
            .run(project_dir, &program, &args)
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => BuildError::ExecutableNotFound {
                    name: program.display().to_string(),
                },
                _ => BuildError::Io(err),
            })?;

        let tree = match &output_file {
            Some(file) => std::fs::read_to_string(file.path()).unwrap_or_default(),
            None => output.stdout.clone(),
        };

        Ok(DependencyTreeRun {
            command,
            output,
            tree,
        })
    }
}

pub(crate) fn dependency_tree_args(
    request: &DependencyTreeRequest,
    mode: InvocationMode,
    output_file: Option<&Path>,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-B".into()];
    if mode == InvocationMode::Embedded {
        args.push("-q".into());
    }
    args.push("-f".into());
    args.push(request.pom.to_string_lossy().to_string());
    if let Some(repo) = &request.local_repository {
        args.push(format!("-Dmaven.repo.local={}", repo.display()));
    }
    if request.offline {
        args.push("-o".into());
    }
    if let Some(profiles) = &request.profiles {
        args.push("-P".into());
        args.push(profiles.clone());
    }
    args.push("dependency:tree".into());
    if let Some(file) = output_file {
        args.push(format!("-DoutputFile={}", file.display()));
        args.push("-DoutputType=text".into());
        args.push("-DappendOutput=false".into());
    }
    args
}

fn find_in_path(path_var: &OsStr, names: &[&OsStr]) -> Option<PathBuf> {
    std::env::split_paths(path_var)
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}
