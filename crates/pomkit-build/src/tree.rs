use pomkit_project::Dependency;

use crate::{BuildError, Result};

/// One entry of `dependency:tree` output below the project itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub dependency: Dependency,
    /// 1 for direct dependencies.
    pub depth: usize,
    pub optional: bool,
}

/// Parses the text form of `dependency:tree`, either as written to
/// `-DoutputFile` or as logged by Maven (`[INFO] ` prefixed lines).
pub fn parse_dependency_tree(text: &str) -> Result<Vec<DependencyNode>> {
    let lines: Vec<&str> = text
        .lines()
        .map(strip_log_prefix)
        .map(|line| line.trim_end())
        .collect();

    let start = lines
        .iter()
        .position(|line| line.contains("maven-dependency-plugin") && line.contains(":tree"))
        .map_or(0, |header| header + 1);

    let Some((root_index, _)) = lines
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, line)| !line.is_empty() && parse_coordinate(line).is_some())
    else {
        return Err(BuildError::Parse("no dependency tree root found".to_string()));
    };

    let mut nodes = Vec::new();
    for line in &lines[root_index + 1..] {
        let body_start = line
            .find(|c: char| !matches!(c, '|' | '+' | '\\' | '-' | ' '))
            .unwrap_or(line.len());
        if body_start == 0 || body_start == line.len() {
            break;
        }

        let body = &line[body_start..];
        let dependency = parse_coordinate(body)
            .ok_or_else(|| BuildError::Parse(format!("unrecognized tree line `{line}`")))?;
        nodes.push(DependencyNode {
            dependency,
            depth: body_start / 3,
            optional: body.contains("(optional"),
        });
    }
    Ok(nodes)
}

fn strip_log_prefix(line: &str) -> &str {
    for prefix in ["[INFO] ", "[INFO]"] {
        if let Some(rest) = line.strip_prefix(prefix) {
            return rest;
        }
    }
    line
}

/// `g:a:type:version[:scope]` or `g:a:type:classifier:version:scope`.
fn parse_coordinate(text: &str) -> Option<Dependency> {
    let token = text.split_whitespace().next()?;
    let parts: Vec<&str> = token.split(':').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let (group, artifact, packaging) = (parts.first()?, parts.get(1)?, parts.get(2)?);
    let (classifier, version, scope) = match parts.len() {
        4 => (None, parts[3], None),
        5 => (None, parts[3], Some(parts[4])),
        6 => (Some(parts[3]), parts[4], Some(parts[5])),
        _ => return None,
    };

    let mut dependency = Dependency::new(*group, *artifact, Some(version.to_string()))
        .with_packaging(*packaging);
    if let Some(scope) = scope {
        dependency = dependency.with_scope(scope);
    }
    dependency.classifier = classifier.map(str::to_string);
    Some(dependency)
}
