//! Strategies that add or upgrade the requested dependency, tried in order.

use pomkit_project::{Dependency, ProjectModel};

use crate::chain::{Command, Outcome};
use crate::edit::{PomEditor, DEPENDENCIES, MANAGED_DEPENDENCIES};
use crate::version_policy::{new_slot_text, update_slot, VersionChange};
use crate::Result;

fn requested(model: &ProjectModel) -> Option<Dependency> {
    model.dependency().cloned()
}

/// Upgrades a versioned entry found under `container` in the target.
fn upgrade_in_target(model: &mut ProjectModel, container: &[&str]) -> Result<Outcome> {
    let Some(dependency) = requested(model) else {
        return Ok(Outcome::NotApplicable);
    };
    let slot = model.document_mut(0).and_then(|doc| {
        let editor = PomEditor::new(doc)?;
        let node = editor.find_dependency(container, &dependency.group_id, &dependency.artifact_id)?;
        editor.version_slot(node)
    });
    let Some(slot) = slot else {
        return Ok(Outcome::NotApplicable);
    };

    if let Some(version) = &dependency.version {
        let change = update_slot(model, 0, slot, &dependency.artifact_id, version)?;
        tracing::debug!(
            target: "pomkit.insert",
            dependency = %dependency,
            container = container.join("/"),
            skipped = change == VersionChange::Skipped,
            "upgraded in place"
        );
    }
    Ok(Outcome::Handled)
}

/// Upgrades `project/dependencies/dependency`.
#[derive(Debug, Default)]
pub struct SimpleUpgrade;

impl Command<ProjectModel> for SimpleUpgrade {
    fn name(&self) -> &'static str {
        "simple-upgrade"
    }

    fn execute(&mut self, model: &mut ProjectModel) -> Result<Outcome> {
        upgrade_in_target(model, DEPENDENCIES)
    }
}

/// Upgrades `project/dependencyManagement/dependencies/dependency`.
#[derive(Debug, Default)]
pub struct SimpleDependencyManagement;

impl Command<ProjectModel> for SimpleDependencyManagement {
    fn name(&self) -> &'static str {
        "simple-dependency-management"
    }

    fn execute(&mut self, model: &mut ProjectModel) -> Result<Outcome> {
        upgrade_in_target(model, MANAGED_DEPENDENCIES)
    }
}

/// Writes the managed entry of `dependency` into document `index`, creating
/// it if needed.
fn manage_in(model: &mut ProjectModel, index: usize, dependency: &Dependency) -> Result<()> {
    let existing = model.document_mut(index).and_then(|doc| {
        let editor = PomEditor::new(doc)?;
        let node = editor.find_dependency(
            MANAGED_DEPENDENCIES,
            &dependency.group_id,
            &dependency.artifact_id,
        )?;
        Some((node, editor.version_slot(node)))
    });
    let Some(version) = dependency.version.as_deref() else {
        if existing.is_none() {
            if let Some(mut editor) = model.document_mut(index).and_then(PomEditor::new) {
                let container = editor.ensure_path(MANAGED_DEPENDENCIES);
                editor.append_dependency(container, dependency, None);
            }
        }
        return Ok(());
    };

    match existing {
        Some((_, Some(slot))) => {
            update_slot(model, index, slot, &dependency.artifact_id, version)?;
        }
        Some((node, None)) => {
            let text = new_slot_text(model, index, &dependency.artifact_id, version)?;
            if let Some(mut editor) = model.document_mut(index).and_then(PomEditor::new) {
                editor.add_version(node, &text);
            }
        }
        None => {
            let text = new_slot_text(model, index, &dependency.artifact_id, version)?;
            if let Some(mut editor) = model.document_mut(index).and_then(PomEditor::new) {
                let container = editor.ensure_path(MANAGED_DEPENDENCIES);
                editor.append_dependency(container, dependency, Some(&text));
            }
        }
    }
    Ok(())
}

/// Makes sure the target lists `dependency` under `<dependencies>` without a
/// version.
fn reference_in_target(model: &mut ProjectModel, dependency: &Dependency) {
    let Some(mut editor) = model.document_mut(0).and_then(PomEditor::new) else {
        return;
    };
    if editor
        .find_dependency(DEPENDENCIES, &dependency.group_id, &dependency.artifact_id)
        .is_none()
    {
        let container = editor.ensure_path(DEPENDENCIES);
        editor.append_dependency(container, dependency, None);
    }
}

/// Multi-module insert: the version goes into the designated ancestor's
/// `dependencyManagement`, the target references it without a version.
#[derive(Debug, Default)]
pub struct CompositeDependencyManagement;

impl Command<ProjectModel> for CompositeDependencyManagement {
    fn name(&self) -> &'static str {
        "composite-dependency-management"
    }

    fn execute(&mut self, model: &mut ProjectModel) -> Result<Outcome> {
        let (Some(dependency), Some(index)) = (requested(model), model.managed_document_index())
        else {
            return Ok(Outcome::NotApplicable);
        };
        manage_in(model, index, &dependency)?;
        reference_in_target(model, &dependency);
        tracing::debug!(
            target: "pomkit.insert",
            dependency = %dependency,
            ancestor = index,
            "inserted through parent dependencyManagement"
        );
        Ok(Outcome::Handled)
    }
}

/// Single-document insert. With properties the version is managed in the
/// target's own `dependencyManagement`; otherwise the entry is versioned
/// directly.
#[derive(Debug, Default)]
pub struct SimpleInsert;

impl Command<ProjectModel> for SimpleInsert {
    fn name(&self) -> &'static str {
        "simple-insert"
    }

    fn execute(&mut self, model: &mut ProjectModel) -> Result<Outcome> {
        let Some(dependency) = requested(model) else {
            return Ok(Outcome::NotApplicable);
        };

        if model.use_properties() {
            manage_in(model, 0, &dependency)?;
            reference_in_target(model, &dependency);
        } else {
            let existing = model.document_mut(0).and_then(|doc| {
                PomEditor::new(doc)?.find_dependency(
                    DEPENDENCIES,
                    &dependency.group_id,
                    &dependency.artifact_id,
                )
            });
            let version = dependency.version.as_deref();
            if let Some(mut editor) = model.document_mut(0).and_then(PomEditor::new) {
                match (existing, version) {
                    (Some(node), Some(version)) => editor.add_version(node, version),
                    (Some(_), None) => {}
                    (None, version) => {
                        let container = editor.ensure_path(DEPENDENCIES);
                        editor.append_dependency(container, &dependency, version);
                    }
                }
            }
        }

        tracing::debug!(target: "pomkit.insert", dependency = %dependency, "inserted");
        Ok(Outcome::Handled)
    }
}
