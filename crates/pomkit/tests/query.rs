use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pomkit::{query_dependency_with, PomError, ProjectModelFactory, QueryEnvironment, QueryType};
use pomkit_build::{ArtifactFetcher, CommandOutput, CommandRunner, MavenConfig};
use pomkit_project::{artifact_path, pom_path, MavenEnvironment};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

const APP_POM: &str = r#"<project>
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>app</artifactId>
  <version>1.0.0</version>
  <properties>
    <junit.version>5.10.0</junit.version>
  </properties>
  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
      <version>32.1.2-jre</version>
    </dependency>
    <dependency>
      <groupId>org.junit.jupiter</groupId>
      <artifactId>junit-jupiter</artifactId>
      <version>${junit.version}</version>
      <scope>test</scope>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>internal</artifactId>
      <version>${internal.version}</version>
    </dependency>
  </dependencies>
</project>
"#;

const MALFORMED_POM: &str = r#"<project>
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.example</groupId>
  <artifactId>app</artifactId>
  <version>1.0.0</version>
  <dependencies>
    <dependency>
      <groupId>com.google.guava</groupId>
      <artifactId>guava</artifactId>
    </dependency>
  </dependencies>
</project>
"#;

/// Answers every command with a fixed output and, for `-DoutputFile`, writes
/// `file_contents` there.
#[derive(Debug)]
struct FakeCommandRunner {
    output: CommandOutput,
    file_contents: Option<String>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeCommandRunner {
    fn new(output: CommandOutput, file_contents: Option<&str>) -> Self {
        Self {
            output,
            file_contents: file_contents.map(str::to_string),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeCommandRunner {
    fn run(&self, _cwd: &Path, _program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(args.to_vec());
        if let Some(contents) = &self.file_contents {
            if let Some(file) = args.iter().find_map(|arg| arg.strip_prefix("-DoutputFile=")) {
                std::fs::write(file, contents)?;
            }
        }
        Ok(self.output.clone())
    }
}

/// A remote repository held in memory.
#[derive(Debug, Default)]
struct FakeFetcher {
    files: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn serve_pom(mut self, g: &str, a: &str, v: &str, dependencies: &str) -> Self {
        let pom = format!(
            "<project><modelVersion>4.0.0</modelVersion><groupId>{g}</groupId>\
             <artifactId>{a}</artifactId><version>{v}</version>\
             <dependencies>{dependencies}</dependencies></project>"
        );
        self.files.insert(artifact_path(g, a, v, None, "pom"), pom);
        self
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl ArtifactFetcher for FakeFetcher {
    fn fetch(&self, relative_path: &str) -> pomkit_build::Result<Option<Vec<u8>>> {
        self.requests.lock().unwrap().push(relative_path.to_string());
        Ok(self.files.get(relative_path).map(|s| s.as_bytes().to_vec()))
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

/// Offline environment over an empty local repository inside `dir`.
fn environment(dir: &Path) -> (QueryEnvironment, PathBuf) {
    let repository = dir.join("m2").join("repository");
    let mut env = QueryEnvironment::default().with_maven_environment(MavenEnvironment::default());
    env.local_repository = Some(repository.clone());
    env.offline = true;
    (env, repository)
}

fn project(dir: &Path, pom: &str) -> (PathBuf, PathBuf) {
    let pom_path = dir.join("pom.xml");
    std::fs::write(&pom_path, pom).unwrap();
    let mvn = dir.join("mvn");
    std::fs::write(&mvn, "").unwrap();
    (pom_path, mvn)
}

#[test]
fn none_query_returns_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let (env, repository) = environment(tmp.path());
    let model = ProjectModelFactory::from_bytes(APP_POM)
        .unwrap()
        .with_query_type(QueryType::None)
        .build();

    assert!(query_dependency_with(&model, &env).unwrap().is_empty());
    assert!(!repository.exists());
}

#[test]
fn safe_offline_query_falls_back_to_static_parse() {
    let tmp = tempfile::tempdir().unwrap();
    let (env, repository) = environment(tmp.path());
    let model = ProjectModelFactory::from_bytes(APP_POM)
        .unwrap()
        .with_query_type(QueryType::Safe)
        .build();

    let dependencies = query_dependency_with(&model, &env).unwrap();

    assert!(repository.is_dir());
    let listed: Vec<String> = dependencies
        .iter()
        .map(|dep| format!("{dep} ({})", dep.scope))
        .collect();
    assert_eq!(
        listed,
        vec![
            "com.google.guava:guava:jar:32.1.2-jre (compile)",
            "org.junit.jupiter:junit-jupiter:jar:5.10.0 (test)",
            "org.example:internal:jar:UNKNOWN (compile)",
        ]
    );
}

#[test]
fn safe_online_query_resolves_transitively_through_the_remote_repository() {
    let tmp = tempfile::tempdir().unwrap();
    let (env, repository) = environment(tmp.path());
    let fetcher = Arc::new(
        FakeFetcher::default()
            .serve_pom(
                "com.google.guava",
                "guava",
                "32.1.2-jre",
                "<dependency><groupId>com.google.guava</groupId>\
                 <artifactId>failureaccess</artifactId><version>1.0.1</version></dependency>",
            )
            .serve_pom("com.google.guava", "failureaccess", "1.0.1", "")
            .serve_pom("org.junit.jupiter", "junit-jupiter", "5.10.0", ""),
    );
    let mut env = env.with_fetcher(fetcher.clone());
    env.offline = false;
    let pom = APP_POM.replace(
        "    <dependency>\n      <groupId>org.example</groupId>\n      <artifactId>internal</artifactId>\n      <version>${internal.version}</version>\n    </dependency>\n",
        "",
    );
    let model = ProjectModelFactory::from_bytes(pom.as_str())
        .unwrap()
        .with_query_type(QueryType::Safe)
        .build();

    let dependencies = query_dependency_with(&model, &env).unwrap();

    let listed: Vec<String> = dependencies
        .iter()
        .map(|dep| format!("{dep} ({})", dep.scope))
        .collect();
    assert_eq!(
        listed,
        vec![
            "com.google.guava:guava:jar:32.1.2-jre (compile)",
            "org.junit.jupiter:junit-jupiter:jar:5.10.0 (test)",
            "com.google.guava:failureaccess:jar:1.0.1 (compile)",
        ]
    );
    assert_eq!(fetcher.requests().len(), 3);
    assert!(pom_path(&repository, "com.google.guava", "failureaccess", "1.0.1").is_file());
}

#[test]
fn safe_query_of_a_malformed_project_is_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let (env, _repository) = environment(tmp.path());
    let model = ProjectModelFactory::from_bytes(MALFORMED_POM)
        .unwrap()
        .with_query_type(QueryType::Safe)
        .build();

    assert!(query_dependency_with(&model, &env).unwrap().is_empty());
}

#[test]
fn request_repository_path_wins_over_the_environment() {
    let tmp = tempfile::tempdir().unwrap();
    let (env, env_repository) = environment(tmp.path());
    let explicit = tmp.path().join("explicit-repo");
    let model = ProjectModelFactory::from_bytes(APP_POM)
        .unwrap()
        .with_query_type(QueryType::Safe)
        .with_repository_path(&explicit)
        .build();

    query_dependency_with(&model, &env).unwrap();
    assert!(explicit.is_dir());
    assert!(!env_repository.exists());
}

#[cfg(unix)]
#[test]
fn unsafe_query_answers_from_the_maven_tree() {
    let tmp = tempfile::tempdir().unwrap();
    let (env, _repository) = environment(tmp.path());
    let (pom, mvn) = project(tmp.path(), APP_POM);
    let runner = Arc::new(FakeCommandRunner::new(
        output(0, ""),
        Some(
            "com.example:app:jar:1.0.0\n\
             +- com.google.guava:guava:jar:32.1.2-jre:compile\n\
             |  \\- com.google.guava:failureaccess:jar:1.0.1:compile\n\
             \\- org.junit.jupiter:junit-jupiter:jar:5.10.0:test\n",
        ),
    ));
    let env = env.with_runner(runner.clone()).with_maven(MavenConfig {
        executable: Some(mvn),
        ..MavenConfig::default()
    });
    let model = ProjectModelFactory::load(&pom)
        .unwrap()
        .with_query_type(QueryType::Unsafe)
        .build();

    let dependencies = query_dependency_with(&model, &env).unwrap();

    let artifacts: Vec<&str> = dependencies
        .iter()
        .map(|dep| dep.artifact_id.as_str())
        .collect();
    assert_eq!(artifacts, vec!["guava", "failureaccess", "junit-jupiter"]);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1, "the embedder answers before the invoker runs");
    assert!(calls[0].iter().any(|arg| arg == "-o"));
}

#[cfg(unix)]
#[test]
fn unsafe_query_of_a_malformed_project_fails_in_the_invoker() {
    let tmp = tempfile::tempdir().unwrap();
    let (env, _repository) = environment(tmp.path());
    let (pom, mvn) = project(tmp.path(), MALFORMED_POM);
    let runner = Arc::new(FakeCommandRunner::new(
        output(1, "[ERROR] 'dependencies.dependency.version' for com.google.guava:guava:jar is missing."),
        None,
    ));
    let env = env.with_runner(runner.clone()).with_maven(MavenConfig {
        executable: Some(mvn),
        ..MavenConfig::default()
    });
    let model = ProjectModelFactory::load(&pom)
        .unwrap()
        .with_query_type(QueryType::Unsafe)
        .build();

    match query_dependency_with(&model, &env) {
        Err(PomError::StrategyFailed { strategy, .. }) => assert_eq!(strategy, "invoker"),
        other => panic!("expected the invoker to fail, got {other:?}"),
    }
    assert_eq!(runner.calls().len(), 2);
}

#[test]
fn unsafe_query_without_maven_uses_static_parse() {
    let tmp = tempfile::tempdir().unwrap();
    let (env, _repository) = environment(tmp.path());
    let (pom, _mvn) = project(tmp.path(), APP_POM);
    let env = env.with_maven(MavenConfig {
        executable: Some(tmp.path().join("no-such-mvn")),
        ..MavenConfig::default()
    });
    let model = ProjectModelFactory::load(&pom)
        .unwrap()
        .with_query_type(QueryType::Unsafe)
        .build();

    let dependencies = query_dependency_with(&model, &env).unwrap();
    assert_eq!(dependencies.len(), 3);
}
