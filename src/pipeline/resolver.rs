//! Document set resolution.
//!
//! Walks the record's document-bearing locations, as declared in the
//! registry, and flattens them into independent extraction tasks carrying
//! enough addressing to write results back. Read-only with respect to the
//! record; an application with no documents resolves to an empty list.

use serde_json::Value;
use tracing::debug;

use super::extraction::{ExtractionTask, WriteBack};
use super::record::ApplicationRecord;
use super::registry::{self, SectionKind};

/// Flatten the record's document graph into extraction tasks.
///
/// Keys whose locator value is empty or absent produce no task; their
/// absence is not an error at this stage. List indices are captured as they
/// stand now and must still be valid at consolidation time.
pub fn resolve(record: &ApplicationRecord) -> Vec<ExtractionTask> {
    let mut tasks = Vec::new();

    if let Some(documents) = record.documents() {
        for (document_key, content_key) in registry::MAIN_DOCUMENTS {
            if let Some(locator) = present_locator(documents.get(*document_key)) {
                tasks.push(ExtractionTask {
                    application_id: record.application_id.clone(),
                    document_key: (*document_key).to_string(),
                    locator: locator.to_string(),
                    target: WriteBack::Main {
                        content_key: (*content_key).to_string(),
                    },
                });
            }
        }
    }

    for section in registry::NESTED_SECTIONS {
        match section.kind {
            SectionKind::Singular => {
                let Some(sub_object) = record.value_at(section.path) else {
                    continue;
                };
                for slot in section.slots {
                    if let Some(locator) =
                        present_locator(sub_object.get(slot.document_field))
                    {
                        tasks.push(ExtractionTask {
                            application_id: record.application_id.clone(),
                            document_key: format!("{}.{}", section.name, slot.document_field),
                            locator: locator.to_string(),
                            target: WriteBack::NestedSingular {
                                section: section.name.to_string(),
                                content_key: slot.content_field.to_string(),
                            },
                        });
                    }
                }
            }
            SectionKind::List => {
                let Some(entries) = record.value_at(section.path).and_then(Value::as_array)
                else {
                    continue;
                };
                for (index, entry) in entries.iter().enumerate() {
                    for slot in section.slots {
                        if let Some(locator) = present_locator(entry.get(slot.document_field)) {
                            tasks.push(ExtractionTask {
                                application_id: record.application_id.clone(),
                                document_key: format!(
                                    "{}[{index}].{}",
                                    section.name, slot.document_field
                                ),
                                locator: locator.to_string(),
                                target: WriteBack::NestedIndexed {
                                    section: section.name.to_string(),
                                    index,
                                    content_key: slot.content_field.to_string(),
                                },
                            });
                        }
                    }
                }
            }
        }
    }

    debug!(
        application_id = %record.application_id,
        tasks = tasks.len(),
        "resolved document set"
    );
    tasks
}

fn present_locator(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|locator| !locator.is_empty())
}
