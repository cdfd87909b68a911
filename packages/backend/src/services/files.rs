use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use uuid::Uuid;

use review_core::{validate_upload_with_limit, FileKind, ModerationDecision, ValidationErrors};

use super::{catalog, ServiceError, ServiceResult};
use crate::models::{CourseFile, NewCourseFile};
use crate::storage::{object_path, ObjectStorage};
use crate::store::{ContentStore, FileQuery};

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: FileKind,
    /// File bytes, standard base64
    pub content: String,
}

fn default_kind() -> FileKind {
    FileKind::Other
}

/// Stores the object first, then the unverified metadata row. If the row
/// cannot be written the object is removed again.
pub async fn upload(
    store: &dyn ContentStore,
    storage: &dyn ObjectStorage,
    max_upload_bytes: u64,
    user_id: Uuid,
    course_id: Uuid,
    request: UploadRequest,
) -> ServiceResult<CourseFile> {
    let bytes = STANDARD
        .decode(request.content.trim())
        .map_err(|_| ValidationErrors::single("content", "is not valid base64"))?;
    validate_upload_with_limit(
        &request.file_name,
        &request.content_type,
        bytes.len() as u64,
        max_upload_bytes,
    )?;
    catalog::require_course(store, course_id).await?;

    let file_name = request.file_name.trim().to_string();
    let path = object_path(course_id, &file_name);
    let file_size = bytes.len() as i64;
    let url = storage
        .put(&path, Bytes::from(bytes), &request.content_type)
        .await?;

    let inserted = store
        .insert_file(NewCourseFile {
            course_id,
            user_id,
            kind: request.kind,
            file_name,
            file_path: path.clone(),
            file_url: url,
            content_type: request.content_type,
            file_size,
        })
        .await;

    match inserted {
        Ok(file) => {
            tracing::info!(file_id = %file.id, course_id = %course_id, size = file_size, "File uploaded");
            Ok(file)
        }
        Err(err) => {
            if let Err(cleanup) = storage.remove(&path).await {
                tracing::warn!(path = %path, error = %cleanup, "Failed to remove orphaned upload");
            }
            Err(err.into())
        }
    }
}

/// Verified, visible files of a course.
pub async fn course_files(store: &dyn ContentStore, course_id: Uuid) -> ServiceResult<Vec<CourseFile>> {
    catalog::require_course(store, course_id).await?;
    Ok(store
        .list_files(&FileQuery {
            course_id: Some(course_id),
            verified: Some(true),
            include_hidden: false,
        })
        .await?)
}

pub async fn pending_files(store: &dyn ContentStore) -> ServiceResult<Vec<CourseFile>> {
    Ok(store
        .list_files(&FileQuery {
            verified: Some(false),
            include_hidden: true,
            ..FileQuery::default()
        })
        .await?)
}

/// Loads a file that is still awaiting moderation.
async fn pending_file(
    store: &dyn ContentStore,
    id: Uuid,
    decision: ModerationDecision,
) -> ServiceResult<CourseFile> {
    let file = store.get_file(id).await?.ok_or(ServiceError::NotFound("file"))?;
    file.moderation_status().decide(decision)?;
    Ok(file)
}

fn already_decided() -> ServiceError {
    ServiceError::Conflict("File was already decided".to_string())
}

pub async fn approve_file(store: &dyn ContentStore, id: Uuid) -> ServiceResult<CourseFile> {
    pending_file(store, id, ModerationDecision::Approve).await?;
    if !store.mark_file_verified(id).await? {
        return Err(already_decided());
    }
    tracing::info!(file_id = %id, "File approved");
    store.get_file(id).await?.ok_or(ServiceError::NotFound("file"))
}

/// Deletes the pending row, then the stored object. A storage failure is
/// logged and the rejection stands.
pub async fn reject_file(
    store: &dyn ContentStore,
    storage: &dyn ObjectStorage,
    id: Uuid,
) -> ServiceResult<CourseFile> {
    let file = pending_file(store, id, ModerationDecision::Reject).await?;
    if !store.delete_pending_file(id).await? {
        return Err(already_decided());
    }

    if let Err(err) = storage.remove(&file.file_path).await {
        tracing::error!(
            file_id = %file.id,
            path = %file.file_path,
            error = %err,
            "Failed to remove stored object of rejected file"
        );
    }
    tracing::info!(file_id = %id, "File rejected");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Course;
    use crate::storage::memory::MemoryObjectStorage;
    use crate::store::MemoryStore;

    const LIMIT: u64 = 1024;

    fn request(content: &[u8]) -> UploadRequest {
        UploadRequest {
            file_name: "midterm.pdf".into(),
            content_type: "application/pdf".into(),
            kind: FileKind::Exam,
            content: STANDARD.encode(content),
        }
    }

    fn seeded() -> (MemoryStore, MemoryObjectStorage, Course) {
        let store = MemoryStore::new();
        let faculty = store.add_faculty("Engineering", None);
        let course = store.add_course(Course::new(faculty.id, "CENG101", "Intro"));
        (store, MemoryObjectStorage::new(), course)
    }

    #[tokio::test]
    async fn upload_is_stored_unverified() {
        let (store, storage, course) = seeded();
        let file = upload(&store, &storage, LIMIT, Uuid::new_v4(), course.id, request(b"%PDF-1.7"))
            .await
            .unwrap();

        assert!(!file.is_verified);
        assert!(file.file_path.starts_with(&course.id.to_string()));
        assert!(storage.contains(&file.file_path));
        assert!(course_files(&store, course.id).await.unwrap().is_empty());
        assert_eq!(pending_files(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversized_or_unsupported_upload_is_rejected() {
        let (store, storage, course) = seeded();
        let big = vec![0u8; LIMIT as usize + 1];
        let err = upload(&store, &storage, LIMIT, Uuid::new_v4(), course.id, request(&big))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let mut exe = request(b"MZ");
        exe.content_type = "application/x-msdownload".into();
        let err = upload(&store, &storage, LIMIT, Uuid::new_v4(), course.id, exe)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn rejection_deletes_row_even_if_storage_fails() {
        let (store, storage, course) = seeded();
        let file = upload(&store, &storage, LIMIT, Uuid::new_v4(), course.id, request(b"%PDF"))
            .await
            .unwrap();

        storage.fail_removes(true);
        reject_file(&store, &storage, file.id).await.unwrap();

        assert!(store.get_file(file.id).await.unwrap().is_none());
        assert!(storage.contains(&file.file_path));
    }

    #[tokio::test]
    async fn approval_makes_file_public() {
        let (store, storage, course) = seeded();
        let file = upload(&store, &storage, LIMIT, Uuid::new_v4(), course.id, request(b"%PDF"))
            .await
            .unwrap();
        approve_file(&store, file.id).await.unwrap();
        assert_eq!(course_files(&store, course.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approved_file_cannot_be_decided_again() {
        let (store, storage, course) = seeded();
        let file = upload(&store, &storage, LIMIT, Uuid::new_v4(), course.id, request(b"%PDF"))
            .await
            .unwrap();
        approve_file(&store, file.id).await.unwrap();

        let err = approve_file(&store, file.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Transition(_)));

        let err = reject_file(&store, &storage, file.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Transition(_)));
        assert!(store.get_file(file.id).await.unwrap().unwrap().is_verified);
        assert!(storage.contains(&file.file_path));
    }

    #[tokio::test]
    async fn rejected_file_is_gone() {
        let (store, storage, course) = seeded();
        let file = upload(&store, &storage, LIMIT, Uuid::new_v4(), course.id, request(b"%PDF"))
            .await
            .unwrap();
        reject_file(&store, &storage, file.id).await.unwrap();

        let err = approve_file(&store, file.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("file")));
        assert!(!storage.contains(&file.file_path));
    }

    #[tokio::test]
    async fn conditional_store_updates_skip_verified_files() {
        let (store, storage, course) = seeded();
        let file = upload(&store, &storage, LIMIT, Uuid::new_v4(), course.id, request(b"%PDF"))
            .await
            .unwrap();
        assert!(store.mark_file_verified(file.id).await.unwrap());
        assert!(!store.mark_file_verified(file.id).await.unwrap());
        assert!(!store.delete_pending_file(file.id).await.unwrap());
        assert!(store.get_file(file.id).await.unwrap().is_some());
    }
}
