use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::DomainError;

pub type Id = i64;

/// Upper bound on comment content, counted in characters.
pub const COMMENT_MAX_CHARS: usize = 1000;

// ---------------------------------------------------------------------------
// Status enums (stored as TEXT, serialised in SCREAMING_SNAKE_CASE)
// ---------------------------------------------------------------------------

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self { $($name::$variant => $text),+ }
            }
        }

        impl TryFrom<String> for $name {
            type Error = DomainError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                match value.as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::InvalidArgument(
                        format!("unknown {} '{}'", stringify!($name), other),
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    Draft,
    Public,
    Deleted,
}
text_enum!(PostStatus { Draft => "DRAFT", Public => "PUBLIC", Deleted => "DELETED" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentStatus {
    Active,
    Deleted,
}
text_enum!(CommentStatus { Active => "ACTIVE", Deleted => "DELETED" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberGrade {
    Admin,
    Member,
}
text_enum!(MemberGrade { Admin => "ADMIN", Member => "MEMBER" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Active,
    Inactive,
    Suspended,
}
text_enum!(MemberStatus { Active => "ACTIVE", Inactive => "INACTIVE", Suspended => "SUSPENDED" });

/// Which post counter a conditional update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostCounter {
    Views,
    Likes,
}

impl PostCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostCounter::Views => "view_count",
            PostCounter::Likes => "like_count",
        }
    }
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Member {
    pub id: Id,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    #[schema(skip)]
    pub password_hash: String,
    pub phone_num: Option<String>,
    pub age: i32,
    #[sqlx(try_from = "String")]
    pub grade: MemberGrade,
    #[sqlx(try_from = "String")]
    pub status: MemberStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewMember {
    pub email: String,
    pub username: String,
    pub password: String,
    pub phone_num: Option<String>,
    pub age: i32,
    #[serde(default = "default_grade")]
    pub grade: MemberGrade,
}

fn default_grade() -> MemberGrade { MemberGrade::Member }

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberUpdate {
    pub username: String,
    pub phone_num: Option<String>,
    pub age: i32,
    pub grade: MemberGrade,
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct PostCategory {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewCategory {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Post {
    pub id: Id,
    pub category_id: Id,
    pub member_id: Id,
    pub name: String,
    pub content: String,
    pub view_count: i64,
    pub like_count: i64,
    /// Optimistic-lock version; bumped by exactly one per successful conditional update.
    pub version: i64,
    #[sqlx(try_from = "String")]
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn is_deleted(&self) -> bool {
        self.status == PostStatus::Deleted
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPost {
    pub category_id: Id,
    pub member_id: Id,
    pub name: String,
    pub content: String,
    pub status: Option<PostStatus>,
}

/// Partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PostUpdate {
    pub name: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub current_page: u32,
    pub page_size: u32,
    pub total_count: i64,
    pub total_pages: i64,
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub id: Id,
    pub post_id: Id,
    pub member_id: Id,
    /// Non-owning back-reference; `None` for root comments.
    pub parent_id: Option<Id>,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub status: CommentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub child_comments: Vec<Comment>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.status == CommentStatus::Deleted
    }

    /// Stricter than `!is_deleted()`: only ACTIVE comments may be edited.
    pub fn is_editable(&self) -> bool {
        self.status == CommentStatus::Active
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Attaches `child` as a reply. The child's back-reference is pointed at `self`.
    pub fn add_child_comment(&mut self, child: Option<Comment>) -> Result<(), DomainError> {
        if self.is_deleted() {
            return Err(DomainError::InvalidState("cannot reply to deleted comment".into()));
        }
        let mut child = child
            .ok_or_else(|| DomainError::InvalidArgument("reply comment is required".into()))?;
        child.parent_id = Some(self.id);
        self.child_comments.push(child);
        Ok(())
    }

    /// Replaces the content. Does not consult `is_editable`; callers gate that.
    pub fn update_content(&mut self, content: &str) -> Result<(), DomainError> {
        validate_comment_content(content)?;
        self.content = content.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// ACTIVE -> DELETED is the only transition; there is no way back.
    pub fn change_status(&mut self, status: CommentStatus) -> Result<(), DomainError> {
        if self.is_deleted() && status != CommentStatus::Deleted {
            return Err(DomainError::InvalidState("deleted comment cannot be restored".into()));
        }
        self.status = status;
        Ok(())
    }
}

pub fn validate_comment_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::InvalidArgument("content is required".into()));
    }
    if content.chars().count() > COMMENT_MAX_CHARS {
        return Err(DomainError::InvalidArgument(format!(
            "content cannot exceed {COMMENT_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub post_id: Id,
    pub member_id: Id,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentEdit {
    pub content: String,
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Attachment {
    pub id: Id,
    pub post_id: Id,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// File metadata as submitted; validated before it reaches a repository.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentFile {
    pub file_name: String,
    pub file_type: String,
    pub file_size: Option<i64>,
}

/// Metadata that passed admission; the only form repositories accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewAttachment {
    pub post_id: Option<Id>,
    pub file: AttachmentFile,
}
