//! Business operations over the repository traits.
//!
//! Services own validation and state rules; repositories only store. Each
//! service holds trait objects so tests can swap a backend for a wrapper.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use tracing::{debug, info};

use crate::error::{DomainError, DomainResult};
use crate::models::*;
use crate::repo::{AttachmentRepo, CategoryRepo, CommentRepo, MemberRepo, PostRepo, Repo, RepoError};
use crate::retry::{AttemptError, RetryExecutor};
use crate::validation::{self, AttachmentRules};

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepo>,
    retry: RetryExecutor,
}

impl PostService {
    pub fn new(posts: Arc<dyn PostRepo>, retry: RetryExecutor) -> Self {
        Self { posts, retry }
    }

    pub async fn create_post(&self, new: NewPost) -> DomainResult<Post> {
        validation::validate_new_post(&new)?;
        let post = self.posts.create_post(new).await?;
        debug!(post_id = post.id, "post created");
        Ok(post)
    }

    pub async fn find_post(&self, id: Id) -> DomainResult<Post> {
        Ok(self.posts.get_post(id).await?)
    }

    pub async fn list_posts(&self, page: u32, size: u32) -> DomainResult<PostPage> {
        validation::validate_paging(page, size)?;
        let offset = i64::from(page - 1) * i64::from(size);
        let posts = self.posts.list_posts(offset, i64::from(size)).await?;
        let total_count = self.posts.count_posts().await?;
        let size_i = i64::from(size);
        Ok(PostPage {
            posts,
            current_page: page,
            page_size: size,
            total_count,
            total_pages: (total_count + size_i - 1) / size_i,
        })
    }

    pub async fn search(&self, keyword: &str) -> DomainResult<Vec<Post>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(DomainError::InvalidArgument("search keyword is required".into()));
        }
        Ok(self.posts.search_posts(keyword).await?)
    }

    pub async fn posts_by_author(&self, member_id: Id) -> DomainResult<Vec<Post>> {
        Ok(self.posts.list_posts_by_member(member_id).await?)
    }

    pub async fn update_post(&self, id: Id, upd: PostUpdate) -> DomainResult<Post> {
        let current = self.posts.get_post(id).await?;
        if current.is_deleted() {
            return Err(DomainError::InvalidState("deleted post cannot be edited".into()));
        }
        let name = upd.name.as_deref().unwrap_or(&current.name);
        let content = upd.content.as_deref().unwrap_or(&current.content);
        validation::validate_post_fields(name, content)?;
        Ok(self.posts.update_post(id, &upd).await?)
    }

    /// Soft delete; the row and its counters are kept.
    pub async fn delete_post(&self, id: Id) -> DomainResult<()> {
        let post = self.posts.get_post(id).await?;
        if post.is_deleted() {
            return Ok(());
        }
        self.posts.set_post_status(id, PostStatus::Deleted).await?;
        info!(post_id = id, "post soft-deleted");
        Ok(())
    }

    pub async fn increment_view_count(&self, post_id: Id) -> DomainResult<()> {
        self.increment(post_id, PostCounter::Views).await
    }

    pub async fn increment_like_count(&self, post_id: Id) -> DomainResult<()> {
        self.increment(post_id, PostCounter::Likes).await
    }

    /// One attempt = read the version, then one conditional update against it.
    /// Another writer can slip in between the two; that surfaces as a conflict
    /// and is retried.
    async fn increment(&self, post_id: Id, counter: PostCounter) -> DomainResult<()> {
        let posts = &self.posts;
        self.retry
            .execute(counter.as_str(), || async move {
                let version = posts.post_version(post_id).await?;
                match posts.increment_counter(post_id, counter, version).await? {
                    0 => Err(AttemptError::VersionConflict),
                    _ => Ok::<(), AttemptError>(()),
                }
            })
            .await
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepo>,
    posts: Arc<dyn PostRepo>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepo>, posts: Arc<dyn PostRepo>) -> Self {
        Self { comments, posts }
    }

    async fn ensure_post_open(&self, post_id: Id) -> DomainResult<()> {
        let post = self.posts.get_post(post_id).await?;
        if post.is_deleted() {
            return Err(DomainError::InvalidState("cannot comment on a deleted post".into()));
        }
        Ok(())
    }

    pub async fn add_comment(&self, new: NewComment) -> DomainResult<Comment> {
        validate_comment_content(&new.content)?;
        self.ensure_post_open(new.post_id).await?;
        Ok(self.comments.create_comment(&new, None).await?)
    }

    /// Attaches a reply under `parent_id`. The parent's rules run before
    /// anything is stored.
    pub async fn reply(&self, parent_id: Id, new: NewComment) -> DomainResult<Comment> {
        let mut parent = self.comments.get_comment(parent_id).await?;
        if parent.post_id != new.post_id {
            return Err(DomainError::InvalidArgument("reply must belong to the parent's post".into()));
        }
        validate_comment_content(&new.content)?;
        let now = Utc::now();
        let draft = Comment {
            id: 0,
            post_id: new.post_id,
            member_id: new.member_id,
            parent_id: None,
            content: new.content.clone(),
            status: CommentStatus::Active,
            created_at: now,
            updated_at: now,
            child_comments: Vec::new(),
        };
        parent.add_child_comment(Some(draft))?;
        self.ensure_post_open(new.post_id).await?;
        Ok(self.comments.create_comment(&new, Some(parent.id)).await?)
    }

    pub async fn find_comment(&self, id: Id) -> DomainResult<Comment> {
        Ok(self.comments.get_comment(id).await?)
    }

    /// Only ACTIVE comments can be edited.
    pub async fn update_comment(&self, id: Id, content: &str) -> DomainResult<Comment> {
        let mut comment = self.comments.get_comment(id).await?;
        if !comment.is_editable() {
            return Err(DomainError::InvalidState("comment is not editable".into()));
        }
        comment.update_content(content)?;
        Ok(self.comments.update_comment_content(id, &comment.content).await?)
    }

    pub async fn delete_comment(&self, id: Id) -> DomainResult<()> {
        let mut comment = self.comments.get_comment(id).await?;
        if comment.is_deleted() {
            return Ok(());
        }
        comment.change_status(CommentStatus::Deleted)?;
        self.comments.set_comment_status(id, comment.status).await?;
        info!(comment_id = id, "comment soft-deleted");
        Ok(())
    }

    /// Non-deleted roots, each carrying its non-deleted direct replies.
    pub async fn comments_for_post(&self, post_id: Id) -> DomainResult<Vec<Comment>> {
        self.posts.get_post(post_id).await?;
        let mut roots = self.comments.list_root_comments(post_id).await?;
        for root in roots.iter_mut() {
            root.child_comments = self.replies(root.id).await?;
        }
        Ok(roots)
    }

    pub async fn replies(&self, parent_id: Id) -> DomainResult<Vec<Comment>> {
        let children = self.comments.list_child_comments(parent_id).await?;
        Ok(children.into_iter().filter(|c| !c.is_deleted()).collect())
    }
}

// ---------------------------------------------------------------------------
// Attachments
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AttachmentService {
    attachments: Arc<dyn AttachmentRepo>,
    rules: AttachmentRules,
}

impl AttachmentService {
    pub fn new(attachments: Arc<dyn AttachmentRepo>, rules: AttachmentRules) -> Self {
        Self { attachments, rules }
    }

    /// Post presence, file rules, then the per-post quota.
    pub async fn add_attachment(&self, new: NewAttachment) -> DomainResult<Attachment> {
        let (post_id, meta) = self.rules.validate_new(&new)?;
        let existing = self.attachments.count_attachments(post_id).await?;
        self.rules.validate_count(existing)?;
        Ok(self.attachments.create_attachment(post_id, &meta).await?)
    }

    /// Replaces file metadata. The quota is not consulted.
    pub async fn update_attachment(&self, id: Id, file: AttachmentFile) -> DomainResult<Attachment> {
        self.attachments.get_attachment(id).await?;
        let meta = self.rules.validate(&file)?;
        Ok(self.attachments.update_attachment(id, &meta).await?)
    }

    pub async fn find(&self, id: Id) -> DomainResult<Attachment> {
        Ok(self.attachments.get_attachment(id).await?)
    }

    pub async fn list_for_post(&self, post_id: Id) -> DomainResult<Vec<Attachment>> {
        Ok(self.attachments.list_attachments(post_id).await?)
    }

    pub async fn delete(&self, id: Id) -> DomainResult<()> {
        Ok(self.attachments.delete_attachment(id).await?)
    }
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

fn hash_password(password: &str) -> DomainResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| DomainError::Repo(RepoError::Internal(format!("password hashing failed: {e}"))))
}

/// True when `password` matches the stored Argon2 hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

#[derive(Clone)]
pub struct MemberService {
    members: Arc<dyn MemberRepo>,
}

impl MemberService {
    pub fn new(members: Arc<dyn MemberRepo>) -> Self {
        Self { members }
    }

    pub async fn join(&self, new: NewMember) -> DomainResult<Member> {
        if self.members.find_member_by_email(&new.email).await?.is_some() {
            return Err(RepoError::Conflict.into());
        }
        validation::validate_new_member(&new)?;
        let hash = hash_password(&new.password)?;
        let member = self.members.create_member(&new, &hash).await?;
        info!(member_id = member.id, "member joined");
        Ok(member)
    }

    pub async fn find(&self, id: Id) -> DomainResult<Member> {
        Ok(self.members.get_member(id).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> DomainResult<Member> {
        self.members
            .find_member_by_email(email)
            .await?
            .ok_or_else(|| RepoError::NotFound.into())
    }

    pub async fn list(&self) -> DomainResult<Vec<Member>> {
        Ok(self.members.list_members().await?)
    }

    pub async fn update(&self, id: Id, upd: MemberUpdate) -> DomainResult<Member> {
        validation::validate_member_update(&upd.username, upd.age)?;
        Ok(self.members.update_member(id, &upd).await?)
    }

    pub async fn change_status(&self, id: Id, status: MemberStatus) -> DomainResult<Member> {
        Ok(self.members.set_member_status(id, status).await?)
    }

    pub async fn change_password(&self, id: Id, password: &str) -> DomainResult<()> {
        if password.trim().is_empty() {
            return Err(DomainError::InvalidArgument("password is required".into()));
        }
        let hash = hash_password(password)?;
        Ok(self.members.set_member_password(id, &hash).await?)
    }

    pub async fn delete(&self, id: Id) -> DomainResult<()> {
        Ok(self.members.delete_member(id).await?)
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CategoryService {
    categories: Arc<dyn CategoryRepo>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepo>) -> Self {
        Self { categories }
    }

    pub async fn create(&self, new: NewCategory) -> DomainResult<PostCategory> {
        if new.name.trim().is_empty() {
            return Err(DomainError::InvalidArgument("category name is required".into()));
        }
        Ok(self.categories.create_category(new).await?)
    }

    pub async fn list(&self) -> DomainResult<Vec<PostCategory>> {
        Ok(self.categories.list_categories().await?)
    }
}

/// Every service wired to one backend.
#[derive(Clone)]
pub struct Services {
    pub members: MemberService,
    pub categories: CategoryService,
    pub posts: PostService,
    pub comments: CommentService,
    pub attachments: AttachmentService,
}

impl Services {
    pub fn new<R: Repo + 'static>(repo: Arc<R>, retry: RetryExecutor) -> Self {
        Self {
            members: MemberService::new(repo.clone()),
            categories: CategoryService::new(repo.clone()),
            posts: PostService::new(repo.clone(), retry),
            comments: CommentService::new(repo.clone(), repo.clone()),
            attachments: AttachmentService::new(repo, AttachmentRules::default()),
        }
    }
}
