//! How a requested version is written into a version slot.
//!
//! With `use_properties` the slot holds `${name}` and the number lives in a
//! `<properties>` entry; `skip_if_newer` turns downgrades into no-ops.
//! References to built-in properties such as `${project.version}` are never
//! turned into `<properties>` entries; the slot gets its own property instead.

use pomkit_project::{interpolate, version, ProjectModel};
use pomkit_xml::NodeId;

use crate::edit::{PomEditor, PropertyScope};
use crate::{PomError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VersionChange {
    Applied,
    Skipped,
}

/// Upgrades the existing `<version>` element `slot` of document `index`.
pub(crate) fn update_slot(
    model: &mut ProjectModel,
    index: usize,
    slot: NodeId,
    artifact_id: &str,
    requested: &str,
) -> Result<VersionChange> {
    let current = match editor(model, index) {
        Some(editor) => editor.text(slot),
        None => return Ok(VersionChange::Skipped),
    };
    let resolved = interpolate(&current, &model.resolved_properties());

    if model.skip_if_newer() {
        match version::is_newer(requested, &resolved) {
            Some(false) => {
                tracing::debug!(
                    target: "pomkit.version",
                    current = %resolved,
                    requested,
                    "requested version is not newer; skipping"
                );
                return Ok(VersionChange::Skipped);
            }
            Some(true) => {}
            None => tracing::warn!(
                target: "pomkit.version",
                current = %resolved,
                requested,
                "cannot compare versions; applying the requested one"
            ),
        }
    }

    let text = if model.use_properties() {
        let name = property_reference(&current)
            .filter(|name| !is_builtin_property(name))
            .map(str::to_string)
            .unwrap_or_else(|| synthesized_property(artifact_id));
        write_property(model, index, &name, requested)?;
        format!("${{{name}}}")
    } else {
        requested.to_string()
    };

    if let Some(mut editor) = editor(model, index) {
        editor.set_text(slot, &text);
    }
    Ok(VersionChange::Applied)
}

/// Text for a new version slot in document `index`, writing the backing
/// property when properties are in use.
pub(crate) fn new_slot_text(
    model: &mut ProjectModel,
    index: usize,
    artifact_id: &str,
    requested: &str,
) -> Result<String> {
    if !model.use_properties() {
        return Ok(requested.to_string());
    }
    let name = synthesized_property(artifact_id);
    write_property(model, index, &name, requested)?;
    Ok(format!("${{{name}}}"))
}

fn synthesized_property(artifact_id: &str) -> String {
    format!("versions.{artifact_id}")
}

/// `name` when `text` is exactly `${name}`.
fn property_reference(text: &str) -> Option<&str> {
    let name = text.strip_prefix("${")?.strip_suffix('}')?;
    (!name.is_empty() && !name.contains(['$', '{', '}'])).then_some(name)
}

/// Properties Maven supplies itself; writing them into `<properties>` would
/// shadow the model value.
fn is_builtin_property(name: &str) -> bool {
    const PREFIXES: &[&str] = &["project.", "pom.", "env.", "settings.", "java.", "os.", "user."];
    matches!(name, "basedir" | "version" | "groupId" | "artifactId")
        || PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Sets property `name` to `value` where it is already declared (`owner`
/// first, then the rest of the request), or in `owner`'s project properties.
fn write_property(model: &mut ProjectModel, owner: usize, name: &str, value: &str) -> Result<()> {
    let count = model.all_documents().len();
    let declaring = std::iter::once(owner)
        .chain((0..count).filter(|i| *i != owner))
        .find_map(|i| {
            let scope = declaring_scope(model, i, name);
            let existing = editor(model, i)?.property(&scope, name)?;
            Some((i, scope, existing))
        });

    let (index, scope) = match declaring {
        Some((index, scope, existing)) => {
            if existing != value && !model.override_if_already_exists() {
                let reference = format!("${{{name}}}");
                let uses: usize = model
                    .all_documents()
                    .iter()
                    .map(|doc| doc.original_text().matches(&reference).count())
                    .sum();
                if uses > 1 {
                    return Err(PomError::AmbiguousProperty {
                        property: name.to_string(),
                        existing,
                        requested: value.to_string(),
                    });
                }
            }
            (index, scope)
        }
        None => (owner, PropertyScope::Project),
    };

    if let Some(mut editor) = editor(model, index) {
        editor.set_property(&scope, name, value);
    }
    Ok(())
}

/// Which `<properties>` block supplies `name` in document `index`: the last
/// active profile that defines it, otherwise the project's own.
fn declaring_scope(model: &ProjectModel, index: usize, name: &str) -> PropertyScope {
    let selection = model.profile_selection();
    model
        .all_documents()
        .get(index)
        .and_then(|doc| {
            doc.raw()
                .active_profiles(&selection)
                .filter(|profile| profile.properties.contains_key(name))
                .last()
                .map(|profile| PropertyScope::Profile(profile.id.clone()))
        })
        .unwrap_or(PropertyScope::Project)
}

fn editor(model: &mut ProjectModel, index: usize) -> Option<PomEditor<'_>> {
    PomEditor::new(model.document_mut(index)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_whole_property_references_only() {
        assert_eq!(property_reference("${slf4j.version}"), Some("slf4j.version"));
        assert_eq!(property_reference("${a}-${b}"), None);
        assert_eq!(property_reference("1.0"), None);
        assert_eq!(property_reference("${}"), None);
    }

    #[test]
    fn model_supplied_properties_are_built_in() {
        assert!(is_builtin_property("project.version"));
        assert!(is_builtin_property("pom.version"));
        assert!(is_builtin_property("env.HOME"));
        assert!(is_builtin_property("basedir"));
        assert!(!is_builtin_property("slf4j.version"));
        assert!(!is_builtin_property("versions.guava"));
    }
}
