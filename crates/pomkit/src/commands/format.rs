use pomkit_project::ProjectModel;

use crate::chain::{Command, Outcome};
use crate::Result;

/// Captures each document's formatting before any edit and writes the result
/// bytes back in that formatting on the way out.
#[derive(Debug, Default)]
pub struct FormatCommand;

impl Command<ProjectModel> for FormatCommand {
    fn name(&self) -> &'static str {
        "format"
    }

    fn is_support(&self) -> bool {
        true
    }

    fn execute(&mut self, model: &mut ProjectModel) -> Result<Outcome> {
        for doc in model.all_documents_mut() {
            doc.capture_format()?;
        }
        Ok(Outcome::NotApplicable)
    }

    fn post_process(&mut self, model: &mut ProjectModel) -> Result<bool> {
        for doc in model.all_documents_mut() {
            if !doc.has_semantic_changes() {
                if doc.result_bytes().is_none() {
                    doc.discard_changes();
                }
                continue;
            }

            let serialized = doc.serialize_result();
            let bytes = doc.capture_format()?.restore(&serialized)?;
            tracing::debug!(
                target: "pomkit.format",
                document = %doc.source(),
                bytes = bytes.len(),
                "restored formatting"
            );
            doc.set_result_bytes(bytes);
            doc.mark_dirty();
        }
        Ok(false)
    }
}

/// Drops edits that changed nothing semantically so a no-op modification
/// yields the original bytes.
#[derive(Debug, Default)]
pub struct DiscardFormatCommand;

impl Command<ProjectModel> for DiscardFormatCommand {
    fn name(&self) -> &'static str {
        "discard-format"
    }

    fn is_support(&self) -> bool {
        true
    }

    fn execute(&mut self, _model: &mut ProjectModel) -> Result<Outcome> {
        Ok(Outcome::NotApplicable)
    }

    fn post_process(&mut self, model: &mut ProjectModel) -> Result<bool> {
        let mut discarded = 0;
        for doc in model.all_documents_mut() {
            if !doc.has_semantic_changes() {
                doc.discard_changes();
                discarded += 1;
            }
        }

        let unchanged = discarded == model.all_documents().len();
        if unchanged && !model.is_modified_by_command() {
            tracing::debug!(target: "pomkit.format", "no semantic change; keeping original bytes");
            return Ok(true);
        }
        Ok(false)
    }
}
