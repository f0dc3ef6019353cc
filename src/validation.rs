//! Input rules checked before anything is persisted.

use crate::error::{DomainError, DomainResult};
use crate::models::{AttachmentFile, AttachmentMeta, Id, NewAttachment, NewMember, NewPost, PostStatus};

pub const MAX_FILE_SIZE: i64 = 10_000_000;
pub const MAX_ATTACHMENTS_PER_POST: usize = 5;
pub const ALLOWED_FILE_TYPES: &[&str] = &[
    "image/jpeg", "image/png", "image/gif",
    "application/pdf", "application/msword",
];

pub const POST_CONTENT_MAX_CHARS: usize = 5000;
pub const MAX_PAGE_SIZE: u32 = 100;

fn invalid(msg: impl Into<String>) -> DomainError {
    DomainError::InvalidArgument(msg.into())
}

// ---------------- Attachments ----------------

/// Admission gate for attachment metadata.
#[derive(Clone, Debug)]
pub struct AttachmentRules {
    pub max_file_size: i64,
    pub max_per_post: usize,
    pub allowed_types: &'static [&'static str],
}

impl Default for AttachmentRules {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            max_per_post: MAX_ATTACHMENTS_PER_POST,
            allowed_types: ALLOWED_FILE_TYPES,
        }
    }
}

impl AttachmentRules {
    /// Post presence is checked before any file rule so its message wins.
    pub fn validate_new(&self, new: &NewAttachment) -> DomainResult<(Id, AttachmentMeta)> {
        let post_id = new
            .post_id
            .ok_or_else(|| invalid("attachment must belong to a post"))?;
        Ok((post_id, self.validate(&new.file)?))
    }

    /// Name, then size, then type.
    pub fn validate(&self, file: &AttachmentFile) -> DomainResult<AttachmentMeta> {
        if file.file_name.trim().is_empty() {
            return Err(invalid("file name is required"));
        }
        let file_size = match file.file_size {
            None => return Err(invalid("invalid file size")),
            Some(size) if size <= 0 => return Err(invalid("invalid file size")),
            Some(size) if size > self.max_file_size => {
                return Err(invalid("file size exceeds limit of 10MB"))
            }
            Some(size) => size,
        };
        if !self.allowed_types.contains(&file.file_type.as_str()) {
            return Err(invalid(format!("unsupported file type '{}'", file.file_type)));
        }
        Ok(AttachmentMeta {
            file_name: file.file_name.clone(),
            file_type: file.file_type.clone(),
            file_size,
        })
    }

    /// Creation-time quota; `existing` is the post's current attachment count.
    pub fn validate_count(&self, existing: usize) -> DomainResult<()> {
        if existing >= self.max_per_post {
            return Err(DomainError::InvalidState(format!(
                "a post may hold at most {} attachments",
                self.max_per_post
            )));
        }
        Ok(())
    }
}

// ---------------- Posts ----------------

pub fn validate_post_fields(name: &str, content: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(invalid("post title is required"));
    }
    if content.trim().is_empty() {
        return Err(invalid("post content is required"));
    }
    if content.chars().count() > POST_CONTENT_MAX_CHARS {
        return Err(invalid(format!("post content cannot exceed {POST_CONTENT_MAX_CHARS} characters")));
    }
    Ok(())
}

pub fn validate_new_post(new: &NewPost) -> DomainResult<()> {
    if new.status == Some(PostStatus::Deleted) {
        return Err(invalid("a post cannot be created as DELETED"));
    }
    validate_post_fields(&new.name, &new.content)
}

pub fn validate_paging(page: u32, size: u32) -> DomainResult<()> {
    if page < 1 {
        return Err(invalid("page must be 1 or greater"));
    }
    if size < 1 || size > MAX_PAGE_SIZE {
        return Err(invalid(format!("page size must be between 1 and {MAX_PAGE_SIZE}")));
    }
    Ok(())
}

// ---------------- Members ----------------

pub fn validate_new_member(new: &NewMember) -> DomainResult<()> {
    if new.age <= 0 {
        return Err(invalid("age must be positive"));
    }
    if !new.email.contains('@') {
        return Err(invalid("a valid email address is required"));
    }
    if new.username.trim().is_empty() {
        return Err(invalid("username is required"));
    }
    if new.password.trim().is_empty() {
        return Err(invalid("password is required"));
    }
    Ok(())
}

pub fn validate_member_update(username: &str, age: i32) -> DomainResult<()> {
    if username.trim().is_empty() {
        return Err(invalid("username is required"));
    }
    if age < 0 {
        return Err(invalid("age cannot be negative"));
    }
    Ok(())
}
