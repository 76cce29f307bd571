//! The study-resource library.

use qifa_shared::error::require_text;
use qifa_shared::schedule::to_iso;
use qifa_shared::{new_id, ResourceDraft, ResourceSource, StudyResource, ValidationError};

use crate::error::{AppError, Result};
use crate::store::AppStore;

impl AppStore {
    /// Publish a resource. It needs a download link or an uploaded file.
    pub fn add_resource(&mut self, draft: ResourceDraft) -> Result<StudyResource> {
        self.require_admin()?;
        let title = require_text(&draft.title, ValidationError::EmptyTitle)?.to_string();
        let source = draft.source.ok_or(ValidationError::MissingResourceSource)?;

        let resource = StudyResource {
            id: new_id(),
            title,
            category: draft.category,
            description: draft.description,
            author: draft.author,
            download_count: 0,
            size: draft.size,
            file_type: draft.file_type,
            upload_date: to_iso(self.today()),
            source: Some(source),
        };
        self.state.resources.insert(0, resource.clone());
        self.persist();
        tracing::info!(resource = %resource.id, "resource added");
        Ok(resource)
    }

    pub fn delete_resource(&mut self, resource_id: &str) -> Result<()> {
        self.require_admin()?;
        let before = self.state.resources.len();
        self.state.resources.retain(|r| r.id != resource_id);
        if self.state.resources.len() == before {
            return Err(AppError::NotFound(format!("resource {resource_id}")));
        }
        self.persist();
        Ok(())
    }

    /// Count a download and return where to fetch the file from. Seeded
    /// catalog entries have no locator.
    pub fn download_resource(&mut self, resource_id: &str) -> Result<Option<ResourceSource>> {
        let resource = self
            .state
            .resources
            .iter_mut()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| AppError::NotFound(format!("resource {resource_id}")))?;
        resource.download_count += 1;
        let source = resource.source.clone();
        self.persist();
        Ok(source)
    }
}
