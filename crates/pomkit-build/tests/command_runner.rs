use pomkit_build::{
    parse_dependency_tree, BuildError, CommandOutput, CommandRunner, DependencyTreeRequest,
    InvocationMode, MavenBuild, MavenConfig,
};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    cwd: PathBuf,
    program: PathBuf,
    args: Vec<String>,
}

/// Records invocations and, when Maven is asked for `-DoutputFile`, writes
/// `file_contents` there the way the dependency plugin would.
#[derive(Debug)]
struct FakeCommandRunner {
    invocations: Mutex<Vec<Invocation>>,
    output: CommandOutput,
    file_contents: Option<String>,
}

impl FakeCommandRunner {
    fn new(output: CommandOutput, file_contents: Option<&str>) -> Self {
        Self {
            invocations: Mutex::new(Vec::new()),
            output,
            file_contents: file_contents.map(str::to_string),
        }
    }

    fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeCommandRunner {
    fn run(&self, cwd: &Path, program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        self.invocations.lock().unwrap().push(Invocation {
            cwd: cwd.to_path_buf(),
            program: program.to_path_buf(),
            args: args.to_vec(),
        });
        if let Some(contents) = &self.file_contents {
            if let Some(file) = args.iter().find_map(|arg| arg.strip_prefix("-DoutputFile=")) {
                std::fs::write(file, contents)?;
            }
        }
        Ok(self.output.clone())
    }
}

#[cfg(unix)]
fn output(code: i32, stdout: &str) -> CommandOutput {
    CommandOutput {
        status: std::process::ExitStatus::from_raw(code << 8),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn project() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let pom = tmp.path().join("pom.xml");
    std::fs::write(&pom, "<project/>").unwrap();
    let mvn = tmp.path().join("mvn");
    std::fs::write(&mvn, "").unwrap();
    (tmp, pom, mvn)
}

#[cfg(unix)]
#[test]
fn embedded_run_reads_tree_from_output_file() {
    let (_tmp, pom, mvn) = project();
    let runner = Arc::new(FakeCommandRunner::new(
        output(0, ""),
        Some("com.example:app:jar:1.0\n\\- org.slf4j:slf4j-api:jar:2.0.3:compile\n"),
    ));
    let build = MavenBuild::with_runner(
        MavenConfig {
            executable: Some(mvn.clone()),
            ..MavenConfig::default()
        },
        runner.clone(),
    );

    let run = build
        .dependency_tree(
            &DependencyTreeRequest {
                pom: pom.clone(),
                local_repository: None,
                offline: true,
                profiles: None,
            },
            InvocationMode::Embedded,
        )
        .unwrap();

    assert!(run.success());
    let nodes = parse_dependency_tree(&run.tree).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].dependency.artifact_id, "slf4j-api");

    let invocations = runner.invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].program, mvn);
    assert_eq!(invocations[0].cwd, pom.parent().unwrap());
    assert!(invocations[0].args.contains(&"-q".to_string()));
    assert!(invocations[0].args.contains(&"-o".to_string()));
}

#[cfg(unix)]
#[test]
fn external_run_keeps_stdout_and_failure_status() {
    let (_tmp, pom, mvn) = project();
    let runner = Arc::new(FakeCommandRunner::new(
        output(1, "[ERROR] Failed to execute goal"),
        None,
    ));
    let build = MavenBuild::with_runner(
        MavenConfig {
            executable: Some(mvn),
            ..MavenConfig::default()
        },
        runner,
    );

    let run = build
        .dependency_tree(
            &DependencyTreeRequest {
                pom,
                local_repository: None,
                offline: false,
                profiles: Some("ci".to_string()),
            },
            InvocationMode::External,
        )
        .unwrap();

    assert_eq!(run.exit_code(), Some(1));
    assert_eq!(run.tree, "[ERROR] Failed to execute goal");
    match run.into_error() {
        BuildError::CommandFailed {
            tool, code, errors, ..
        } => {
            assert_eq!(tool, "maven");
            assert_eq!(code, Some(1));
            assert_eq!(errors, ["Failed to execute goal"]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn missing_executable_is_reported() {
    let (tmp, pom, _mvn) = project();
    let build = MavenBuild::new(MavenConfig {
        executable: Some(tmp.path().join("bin/missing-mvn")),
        ..MavenConfig::default()
    });

    let err = build
        .dependency_tree(
            &DependencyTreeRequest {
                pom,
                local_repository: None,
                offline: false,
                profiles: None,
            },
            InvocationMode::Embedded,
        )
        .unwrap_err();
    assert!(matches!(err, BuildError::ExecutableNotFound { .. }), "{err:?}");
}
