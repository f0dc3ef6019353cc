use async_trait::async_trait;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("storage error: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

#[async_trait]
pub trait MemberRepo: Send + Sync {
    /// Fails with `Conflict` when the email is already taken.
    async fn create_member(&self, new: &NewMember, password_hash: &str) -> RepoResult<Member>;
    async fn get_member(&self, id: Id) -> RepoResult<Member>;
    async fn find_member_by_email(&self, email: &str) -> RepoResult<Option<Member>>;
    async fn list_members(&self) -> RepoResult<Vec<Member>>;
    async fn update_member(&self, id: Id, upd: &MemberUpdate) -> RepoResult<Member>;
    async fn set_member_status(&self, id: Id, status: MemberStatus) -> RepoResult<Member>;
    async fn set_member_password(&self, id: Id, password_hash: &str) -> RepoResult<()>;
    async fn delete_member(&self, id: Id) -> RepoResult<()>;
}

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn create_category(&self, new: NewCategory) -> RepoResult<PostCategory>;
    async fn list_categories(&self) -> RepoResult<Vec<PostCategory>>;
}

#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Fails with `NotFound` when the category or author does not exist.
    async fn create_post(&self, new: NewPost) -> RepoResult<Post>;
    async fn get_post(&self, id: Id) -> RepoResult<Post>;
    /// Non-deleted posts, newest first.
    async fn list_posts(&self, offset: i64, limit: i64) -> RepoResult<Vec<Post>>;
    async fn count_posts(&self) -> RepoResult<i64>;
    /// Case-insensitive match on title or content; deleted posts excluded.
    async fn search_posts(&self, keyword: &str) -> RepoResult<Vec<Post>>;
    async fn list_posts_by_member(&self, member_id: Id) -> RepoResult<Vec<Post>>;
    /// Applies the present fields and bumps the version.
    async fn update_post(&self, id: Id, upd: &PostUpdate) -> RepoResult<Post>;
    async fn set_post_status(&self, id: Id, status: PostStatus) -> RepoResult<Post>;

    /// Current version, for a subsequent conditional update.
    async fn post_version(&self, id: Id) -> RepoResult<i64>;
    /// `counter += 1, version += 1` only if the row exists, is not DELETED and
    /// still carries `expected_version`. Returns the number of rows affected.
    async fn increment_counter(&self, id: Id, counter: PostCounter, expected_version: i64) -> RepoResult<u64>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn create_comment(&self, new: &NewComment, parent_id: Option<Id>) -> RepoResult<Comment>;
    async fn get_comment(&self, id: Id) -> RepoResult<Comment>;
    async fn update_comment_content(&self, id: Id, content: &str) -> RepoResult<Comment>;
    async fn set_comment_status(&self, id: Id, status: CommentStatus) -> RepoResult<Comment>;
    /// Non-deleted root comments of a post, oldest first.
    async fn list_root_comments(&self, post_id: Id) -> RepoResult<Vec<Comment>>;
    /// Every direct reply to `parent_id`, oldest first.
    async fn list_child_comments(&self, parent_id: Id) -> RepoResult<Vec<Comment>>;
}

#[async_trait]
pub trait AttachmentRepo: Send + Sync {
    async fn create_attachment(&self, post_id: Id, meta: &AttachmentMeta) -> RepoResult<Attachment>;
    async fn get_attachment(&self, id: Id) -> RepoResult<Attachment>;
    async fn update_attachment(&self, id: Id, meta: &AttachmentMeta) -> RepoResult<Attachment>;
    async fn list_attachments(&self, post_id: Id) -> RepoResult<Vec<Attachment>>;
    async fn count_attachments(&self, post_id: Id) -> RepoResult<usize>;
    async fn delete_attachment(&self, id: Id) -> RepoResult<()>;
}

pub trait Repo: MemberRepo + CategoryRepo + PostRepo + CommentRepo + AttachmentRepo {}

impl<T> Repo for T where T: MemberRepo + CategoryRepo + PostRepo + CommentRepo + AttachmentRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

    #[derive(Default)]
    struct State {
        members: HashMap<Id, Member>,
        categories: HashMap<Id, PostCategory>,
        posts: HashMap<Id, Post>,
        comments: HashMap<Id, Comment>,
        attachments: HashMap<Id, Attachment>,
        next_id: Id,
    }

    impl State {
        fn next_id(&mut self) -> Id {
            self.next_id += 1;
            self.next_id
        }
    }

    /// Process-local store. Every mutation happens under one write lock, which
    /// is what makes `increment_counter` a compare-and-swap.
    #[derive(Clone, Default)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
    }

    impl InMemRepo {
        pub fn new() -> Self {
            Self::default()
        }

        fn read(&self) -> RepoResult<RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }
    }

    fn sorted_by_id<T, F: Fn(&T) -> Id>(mut v: Vec<T>, key: F, newest_first: bool) -> Vec<T> {
        if newest_first {
            v.sort_by_key(|x| std::cmp::Reverse(key(x)));
        } else {
            v.sort_by_key(|x| key(x));
        }
        v
    }

    #[async_trait]
    impl MemberRepo for InMemRepo {
        async fn create_member(&self, new: &NewMember, password_hash: &str) -> RepoResult<Member> {
            let mut s = self.write()?;
            if s.members.values().any(|m| m.email == new.email) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let now = Utc::now();
            let member = Member {
                id,
                email: new.email.clone(),
                username: new.username.clone(),
                password_hash: password_hash.to_string(),
                phone_num: new.phone_num.clone(),
                age: new.age,
                grade: new.grade,
                status: MemberStatus::Active,
                created_at: now,
                updated_at: now,
            };
            s.members.insert(id, member.clone());
            Ok(member)
        }
        async fn get_member(&self, id: Id) -> RepoResult<Member> {
            self.read()?.members.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn find_member_by_email(&self, email: &str) -> RepoResult<Option<Member>> {
            Ok(self.read()?.members.values().find(|m| m.email == email).cloned())
        }
        async fn list_members(&self) -> RepoResult<Vec<Member>> {
            let members = self.read()?.members.values().cloned().collect();
            Ok(sorted_by_id(members, |m: &Member| m.id, false))
        }
        async fn update_member(&self, id: Id, upd: &MemberUpdate) -> RepoResult<Member> {
            let mut s = self.write()?;
            let m = s.members.get_mut(&id).ok_or(RepoError::NotFound)?;
            m.username = upd.username.clone();
            m.phone_num = upd.phone_num.clone();
            m.age = upd.age;
            m.grade = upd.grade;
            m.updated_at = Utc::now();
            Ok(m.clone())
        }
        async fn set_member_status(&self, id: Id, status: MemberStatus) -> RepoResult<Member> {
            let mut s = self.write()?;
            let m = s.members.get_mut(&id).ok_or(RepoError::NotFound)?;
            m.status = status;
            m.updated_at = Utc::now();
            Ok(m.clone())
        }
        async fn set_member_password(&self, id: Id, password_hash: &str) -> RepoResult<()> {
            let mut s = self.write()?;
            let m = s.members.get_mut(&id).ok_or(RepoError::NotFound)?;
            m.password_hash = password_hash.to_string();
            m.updated_at = Utc::now();
            Ok(())
        }
        async fn delete_member(&self, id: Id) -> RepoResult<()> {
            let mut s = self.write()?;
            if !s.members.contains_key(&id) {
                return Err(RepoError::NotFound);
            }
            // mirrors the FKs from posts.member_id and comments.member_id
            let has_posts = s.posts.values().any(|p| p.member_id == id);
            if has_posts || s.comments.values().any(|c| c.member_id == id) {
                return Err(RepoError::Conflict);
            }
            s.members.remove(&id);
            Ok(())
        }
    }

    #[async_trait]
    impl CategoryRepo for InMemRepo {
        async fn create_category(&self, new: NewCategory) -> RepoResult<PostCategory> {
            let mut s = self.write()?;
            if s.categories.values().any(|c| c.name == new.name) {
                return Err(RepoError::Conflict);
            }
            let id = s.next_id();
            let category = PostCategory { id, name: new.name };
            s.categories.insert(id, category.clone());
            Ok(category)
        }
        async fn list_categories(&self) -> RepoResult<Vec<PostCategory>> {
            let v = self.read()?.categories.values().cloned().collect();
            Ok(sorted_by_id(v, |c: &PostCategory| c.id, false))
        }
    }

    #[async_trait]
    impl PostRepo for InMemRepo {
        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let mut s = self.write()?;
            if !s.categories.contains_key(&new.category_id) || !s.members.contains_key(&new.member_id) {
                return Err(RepoError::NotFound);
            }
            let id = s.next_id();
            let now = Utc::now();
            let post = Post {
                id,
                category_id: new.category_id,
                member_id: new.member_id,
                name: new.name,
                content: new.content,
                view_count: 0,
                like_count: 0,
                version: 0,
                status: new.status.unwrap_or(PostStatus::Public),
                created_at: now,
                updated_at: now,
            };
            s.posts.insert(id, post.clone());
            Ok(post)
        }
        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            self.read()?.posts.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn list_posts(&self, offset: i64, limit: i64) -> RepoResult<Vec<Post>> {
            let live: Vec<Post> = self.read()?.posts.values().filter(|p| !p.is_deleted()).cloned().collect();
            Ok(sorted_by_id(live, |p: &Post| p.id, true)
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .collect())
        }
        async fn count_posts(&self) -> RepoResult<i64> {
            Ok(self.read()?.posts.values().filter(|p| !p.is_deleted()).count() as i64)
        }
        async fn search_posts(&self, keyword: &str) -> RepoResult<Vec<Post>> {
            let needle = keyword.to_lowercase();
            let hits: Vec<Post> = self
                .read()?
                .posts
                .values()
                .filter(|p| !p.is_deleted())
                .filter(|p| p.name.to_lowercase().contains(&needle) || p.content.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            Ok(sorted_by_id(hits, |p: &Post| p.id, true))
        }
        async fn list_posts_by_member(&self, member_id: Id) -> RepoResult<Vec<Post>> {
            let v: Vec<Post> = self.read()?.posts.values().filter(|p| p.member_id == member_id).cloned().collect();
            Ok(sorted_by_id(v, |p: &Post| p.id, true))
        }
        async fn update_post(&self, id: Id, upd: &PostUpdate) -> RepoResult<Post> {
            let mut s = self.write()?;
            let p = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            if let Some(name) = &upd.name { p.name = name.clone(); }
            if let Some(content) = &upd.content { p.content = content.clone(); }
            p.version += 1;
            p.updated_at = Utc::now();
            Ok(p.clone())
        }
        async fn set_post_status(&self, id: Id, status: PostStatus) -> RepoResult<Post> {
            let mut s = self.write()?;
            let p = s.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
            p.status = status;
            p.version += 1;
            p.updated_at = Utc::now();
            Ok(p.clone())
        }
        async fn post_version(&self, id: Id) -> RepoResult<i64> {
            self.read()?.posts.get(&id).map(|p| p.version).ok_or(RepoError::NotFound)
        }
        async fn increment_counter(&self, id: Id, counter: PostCounter, expected_version: i64) -> RepoResult<u64> {
            let mut s = self.write()?;
            let Some(p) = s.posts.get_mut(&id) else { return Ok(0) };
            if p.version != expected_version || p.is_deleted() {
                return Ok(0);
            }
            match counter {
                PostCounter::Views => p.view_count += 1,
                PostCounter::Likes => p.like_count += 1,
            }
            p.version += 1;
            Ok(1)
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn create_comment(&self, new: &NewComment, parent_id: Option<Id>) -> RepoResult<Comment> {
            let mut s = self.write()?;
            if !s.posts.contains_key(&new.post_id) || !s.members.contains_key(&new.member_id) {
                return Err(RepoError::NotFound);
            }
            if let Some(pid) = parent_id {
                if !s.comments.contains_key(&pid) { return Err(RepoError::NotFound); }
            }
            let id = s.next_id();
            let now = Utc::now();
            let comment = Comment {
                id,
                post_id: new.post_id,
                member_id: new.member_id,
                parent_id,
                content: new.content.clone(),
                status: CommentStatus::Active,
                created_at: now,
                updated_at: now,
                child_comments: Vec::new(),
            };
            s.comments.insert(id, comment.clone());
            Ok(comment)
        }
        async fn get_comment(&self, id: Id) -> RepoResult<Comment> {
            self.read()?.comments.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn update_comment_content(&self, id: Id, content: &str) -> RepoResult<Comment> {
            let mut s = self.write()?;
            let c = s.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
            c.content = content.to_string();
            c.updated_at = Utc::now();
            Ok(c.clone())
        }
        async fn set_comment_status(&self, id: Id, status: CommentStatus) -> RepoResult<Comment> {
            let mut s = self.write()?;
            let c = s.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
            c.status = status;
            c.updated_at = Utc::now();
            Ok(c.clone())
        }
        async fn list_root_comments(&self, post_id: Id) -> RepoResult<Vec<Comment>> {
            let v: Vec<Comment> = self
                .read()?
                .comments
                .values()
                .filter(|c| c.post_id == post_id && c.parent_id.is_none() && !c.is_deleted())
                .cloned()
                .collect();
            Ok(sorted_by_id(v, |c: &Comment| c.id, false))
        }
        async fn list_child_comments(&self, parent_id: Id) -> RepoResult<Vec<Comment>> {
            let v: Vec<Comment> = self
                .read()?
                .comments
                .values()
                .filter(|c| c.parent_id == Some(parent_id))
                .cloned()
                .collect();
            Ok(sorted_by_id(v, |c: &Comment| c.id, false))
        }
    }

    #[async_trait]
    impl AttachmentRepo for InMemRepo {
        async fn create_attachment(&self, post_id: Id, meta: &AttachmentMeta) -> RepoResult<Attachment> {
            let mut s = self.write()?;
            if !s.posts.contains_key(&post_id) {
                return Err(RepoError::NotFound);
            }
            let id = s.next_id();
            let now = Utc::now();
            let attachment = Attachment {
                id,
                post_id,
                file_name: meta.file_name.clone(),
                file_type: meta.file_type.clone(),
                file_size: meta.file_size,
                created_at: now,
                updated_at: now,
            };
            s.attachments.insert(id, attachment.clone());
            Ok(attachment)
        }
        async fn get_attachment(&self, id: Id) -> RepoResult<Attachment> {
            self.read()?.attachments.get(&id).cloned().ok_or(RepoError::NotFound)
        }
        async fn update_attachment(&self, id: Id, meta: &AttachmentMeta) -> RepoResult<Attachment> {
            let mut s = self.write()?;
            let a = s.attachments.get_mut(&id).ok_or(RepoError::NotFound)?;
            a.file_name = meta.file_name.clone();
            a.file_type = meta.file_type.clone();
            a.file_size = meta.file_size;
            a.updated_at = Utc::now();
            Ok(a.clone())
        }
        async fn list_attachments(&self, post_id: Id) -> RepoResult<Vec<Attachment>> {
            let v: Vec<Attachment> = self.read()?.attachments.values().filter(|a| a.post_id == post_id).cloned().collect();
            Ok(sorted_by_id(v, |a: &Attachment| a.id, false))
        }
        async fn count_attachments(&self, post_id: Id) -> RepoResult<usize> {
            Ok(self.read()?.attachments.values().filter(|a| a.post_id == post_id).count())
        }
        async fn delete_attachment(&self, id: Id) -> RepoResult<()> {
            self.write()?.attachments.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    const MEMBER_COLS: &str = "id, email, username, password_hash, phone_num, age, grade, status, created_at, updated_at";
    const POST_COLS: &str = "id, category_id, member_id, name, content, view_count, like_count, version, status, created_at, updated_at";
    const COMMENT_COLS: &str = "id, post_id, member_id, parent_id, content, status, created_at, updated_at";
    const ATTACHMENT_COLS: &str = "id, post_id, file_name, file_type, file_size, created_at, updated_at";

    /// Unique violations become `Conflict`, foreign-key violations `NotFound`.
    fn db_err(e: sqlx::Error) -> RepoError {
        match &e {
            sqlx::Error::RowNotFound => RepoError::NotFound,
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("23505") => RepoError::Conflict,
                Some("23503") => RepoError::NotFound,
                _ => RepoError::Internal(e.to_string()),
            },
            _ => RepoError::Internal(e.to_string()),
        }
    }

    /// Makes `%`, `_` and `\` match literally under `ESCAPE '\'`.
    fn escape_like(keyword: &str) -> String {
        let mut out = String::with_capacity(keyword.len());
        for ch in keyword.chars() {
            if matches!(ch, '\\' | '%' | '_') {
                out.push('\\');
            }
            out.push(ch);
        }
        out
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }
    }

    #[async_trait]
    impl MemberRepo for PgRepo {
        async fn create_member(&self, new: &NewMember, password_hash: &str) -> RepoResult<Member> {
            sqlx::query_as::<_, Member>(&format!(
                "INSERT INTO members (email, username, password_hash, phone_num, age, grade, status) \
                 VALUES ($1,$2,$3,$4,$5,$6,'ACTIVE') RETURNING {MEMBER_COLS}"
            ))
            .bind(&new.email)
            .bind(&new.username)
            .bind(password_hash)
            .bind(&new.phone_num)
            .bind(new.age)
            .bind(new.grade.as_str())
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn get_member(&self, id: Id) -> RepoResult<Member> {
            sqlx::query_as::<_, Member>(&format!("SELECT {MEMBER_COLS} FROM members WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn find_member_by_email(&self, email: &str) -> RepoResult<Option<Member>> {
            sqlx::query_as::<_, Member>(&format!("SELECT {MEMBER_COLS} FROM members WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool).await.map_err(db_err)
        }
        async fn list_members(&self) -> RepoResult<Vec<Member>> {
            sqlx::query_as::<_, Member>(&format!("SELECT {MEMBER_COLS} FROM members ORDER BY id"))
                .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn update_member(&self, id: Id, upd: &MemberUpdate) -> RepoResult<Member> {
            sqlx::query_as::<_, Member>(&format!(
                "UPDATE members SET username = $2, phone_num = $3, age = $4, grade = $5, updated_at = now() \
                 WHERE id = $1 RETURNING {MEMBER_COLS}"
            ))
            .bind(id)
            .bind(&upd.username)
            .bind(&upd.phone_num)
            .bind(upd.age)
            .bind(upd.grade.as_str())
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn set_member_status(&self, id: Id, status: MemberStatus) -> RepoResult<Member> {
            sqlx::query_as::<_, Member>(&format!(
                "UPDATE members SET status = $2, updated_at = now() WHERE id = $1 RETURNING {MEMBER_COLS}"
            ))
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn set_member_password(&self, id: Id, password_hash: &str) -> RepoResult<()> {
            let res = sqlx::query("UPDATE members SET password_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool).await.map_err(db_err)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
        async fn delete_member(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM members WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await
                .map_err(|e| match db_err(e) {
                    // still referenced by posts or comments
                    RepoError::NotFound => RepoError::Conflict,
                    other => other,
                })?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

    #[async_trait]
    impl CategoryRepo for PgRepo {
        async fn create_category(&self, new: NewCategory) -> RepoResult<PostCategory> {
            sqlx::query_as::<_, PostCategory>("INSERT INTO post_categories (name) VALUES ($1) RETURNING id, name")
                .bind(&new.name)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn list_categories(&self) -> RepoResult<Vec<PostCategory>> {
            sqlx::query_as::<_, PostCategory>("SELECT id, name FROM post_categories ORDER BY id")
                .fetch_all(&self.pool).await.map_err(db_err)
        }
    }

    #[async_trait]
    impl PostRepo for PgRepo {
        async fn create_post(&self, new: NewPost) -> RepoResult<Post> {
            let status = new.status.unwrap_or(PostStatus::Public);
            sqlx::query_as::<_, Post>(&format!(
                "INSERT INTO posts (category_id, member_id, name, content, status) \
                 VALUES ($1,$2,$3,$4,$5) RETURNING {POST_COLS}"
            ))
            .bind(new.category_id)
            .bind(new.member_id)
            .bind(&new.name)
            .bind(&new.content)
            .bind(status.as_str())
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn get_post(&self, id: Id) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLS} FROM posts WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn list_posts(&self, offset: i64, limit: i64) -> RepoResult<Vec<Post>> {
            sqlx::query_as::<_, Post>(&format!(
                "SELECT {POST_COLS} FROM posts WHERE status <> 'DELETED' \
                 ORDER BY created_at DESC, id DESC OFFSET $1 LIMIT $2"
            ))
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn count_posts(&self) -> RepoResult<i64> {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE status <> 'DELETED'")
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn search_posts(&self, keyword: &str) -> RepoResult<Vec<Post>> {
            sqlx::query_as::<_, Post>(&format!(
                "SELECT {POST_COLS} FROM posts WHERE status <> 'DELETED' \
                 AND (name ILIKE $1 ESCAPE '\\' OR content ILIKE $1 ESCAPE '\\') ORDER BY id DESC"
            ))
            .bind(format!("%{}%", escape_like(keyword)))
            .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn list_posts_by_member(&self, member_id: Id) -> RepoResult<Vec<Post>> {
            sqlx::query_as::<_, Post>(&format!("SELECT {POST_COLS} FROM posts WHERE member_id = $1 ORDER BY id DESC"))
                .bind(member_id)
                .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn update_post(&self, id: Id, upd: &PostUpdate) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(&format!(
                "UPDATE posts SET name = COALESCE($2, name), content = COALESCE($3, content), \
                 version = version + 1, updated_at = now() WHERE id = $1 RETURNING {POST_COLS}"
            ))
            .bind(id)
            .bind(upd.name.as_ref())
            .bind(upd.content.as_ref())
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn set_post_status(&self, id: Id, status: PostStatus) -> RepoResult<Post> {
            sqlx::query_as::<_, Post>(&format!(
                "UPDATE posts SET status = $2, version = version + 1, updated_at = now() \
                 WHERE id = $1 RETURNING {POST_COLS}"
            ))
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn post_version(&self, id: Id) -> RepoResult<i64> {
            sqlx::query_scalar::<_, i64>("SELECT version FROM posts WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn increment_counter(&self, id: Id, counter: PostCounter, expected_version: i64) -> RepoResult<u64> {
            let sql = match counter {
                PostCounter::Views => "UPDATE posts SET view_count = view_count + 1, version = version + 1 \
                                       WHERE id = $1 AND version = $2 AND status <> 'DELETED'",
                PostCounter::Likes => "UPDATE posts SET like_count = like_count + 1, version = version + 1 \
                                       WHERE id = $1 AND version = $2 AND status <> 'DELETED'",
            };
            let res = sqlx::query(sql)
                .bind(id)
                .bind(expected_version)
                .execute(&self.pool).await.map_err(db_err)?;
            Ok(res.rows_affected())
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn create_comment(&self, new: &NewComment, parent_id: Option<Id>) -> RepoResult<Comment> {
            sqlx::query_as::<_, Comment>(&format!(
                "INSERT INTO comments (post_id, member_id, parent_id, content, status) \
                 VALUES ($1,$2,$3,$4,'ACTIVE') RETURNING {COMMENT_COLS}"
            ))
            .bind(new.post_id)
            .bind(new.member_id)
            .bind(parent_id)
            .bind(&new.content)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn get_comment(&self, id: Id) -> RepoResult<Comment> {
            sqlx::query_as::<_, Comment>(&format!("SELECT {COMMENT_COLS} FROM comments WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn update_comment_content(&self, id: Id, content: &str) -> RepoResult<Comment> {
            sqlx::query_as::<_, Comment>(&format!(
                "UPDATE comments SET content = $2, updated_at = now() WHERE id = $1 RETURNING {COMMENT_COLS}"
            ))
            .bind(id)
            .bind(content)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn set_comment_status(&self, id: Id, status: CommentStatus) -> RepoResult<Comment> {
            sqlx::query_as::<_, Comment>(&format!(
                "UPDATE comments SET status = $2, updated_at = now() WHERE id = $1 RETURNING {COMMENT_COLS}"
            ))
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn list_root_comments(&self, post_id: Id) -> RepoResult<Vec<Comment>> {
            sqlx::query_as::<_, Comment>(&format!(
                "SELECT {COMMENT_COLS} FROM comments \
                 WHERE post_id = $1 AND parent_id IS NULL AND status <> 'DELETED' ORDER BY id"
            ))
            .bind(post_id)
            .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn list_child_comments(&self, parent_id: Id) -> RepoResult<Vec<Comment>> {
            sqlx::query_as::<_, Comment>(&format!("SELECT {COMMENT_COLS} FROM comments WHERE parent_id = $1 ORDER BY id"))
                .bind(parent_id)
                .fetch_all(&self.pool).await.map_err(db_err)
        }
    }

    #[async_trait]
    impl AttachmentRepo for PgRepo {
        async fn create_attachment(&self, post_id: Id, meta: &AttachmentMeta) -> RepoResult<Attachment> {
            sqlx::query_as::<_, Attachment>(&format!(
                "INSERT INTO attachments (post_id, file_name, file_type, file_size) \
                 VALUES ($1,$2,$3,$4) RETURNING {ATTACHMENT_COLS}"
            ))
            .bind(post_id)
            .bind(&meta.file_name)
            .bind(&meta.file_type)
            .bind(meta.file_size)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn get_attachment(&self, id: Id) -> RepoResult<Attachment> {
            sqlx::query_as::<_, Attachment>(&format!("SELECT {ATTACHMENT_COLS} FROM attachments WHERE id = $1"))
                .bind(id)
                .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn update_attachment(&self, id: Id, meta: &AttachmentMeta) -> RepoResult<Attachment> {
            sqlx::query_as::<_, Attachment>(&format!(
                "UPDATE attachments SET file_name = $2, file_type = $3, file_size = $4, updated_at = now() \
                 WHERE id = $1 RETURNING {ATTACHMENT_COLS}"
            ))
            .bind(id)
            .bind(&meta.file_name)
            .bind(&meta.file_type)
            .bind(meta.file_size)
            .fetch_one(&self.pool).await.map_err(db_err)
        }
        async fn list_attachments(&self, post_id: Id) -> RepoResult<Vec<Attachment>> {
            sqlx::query_as::<_, Attachment>(&format!("SELECT {ATTACHMENT_COLS} FROM attachments WHERE post_id = $1 ORDER BY id"))
                .bind(post_id)
                .fetch_all(&self.pool).await.map_err(db_err)
        }
        async fn count_attachments(&self, post_id: Id) -> RepoResult<usize> {
            let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attachments WHERE post_id = $1")
                .bind(post_id)
                .fetch_one(&self.pool).await.map_err(db_err)?;
            Ok(n as usize)
        }
        async fn delete_attachment(&self, id: Id) -> RepoResult<()> {
            let res = sqlx::query("DELETE FROM attachments WHERE id = $1")
                .bind(id)
                .execute(&self.pool).await.map_err(db_err)?;
            if res.rows_affected() == 0 { return Err(RepoError::NotFound); }
            Ok(())
        }
    }

}
