#![cfg(feature = "inmem-store")]

use board::error::DomainError;
use board::models::*;
use board::repo::{inmem::InMemRepo, RepoError};
// Bring trait method namespaces into scope so calls on InMemRepo resolve.
use board::repo::{CategoryRepo, CommentRepo, MemberRepo, PostRepo};
use board::retry::{RetryExecutor, RetryPolicy};
use board::Services;
use std::sync::Arc;

fn new_member(email: &str) -> NewMember {
    NewMember {
        email: email.into(),
        username: "bob".into(),
        password: "hunter2".into(),
        phone_num: None,
        age: 25,
        grade: MemberGrade::Member,
    }
}

fn services() -> Services {
    Services::new(Arc::new(InMemRepo::new()), RetryExecutor::new(RetryPolicy::default()))
}

#[tokio::test]
async fn member_join_rules() {
    let svc = services();
    let m = svc.members.join(new_member("bob@example.com")).await.unwrap();
    assert_eq!(m.status, MemberStatus::Active);

    // duplicate email → conflict
    let err = svc.members.join(new_member("bob@example.com")).await.unwrap_err();
    assert!(matches!(err, DomainError::Repo(RepoError::Conflict)));

    let mut bad = new_member("no-at-sign");
    assert!(matches!(svc.members.join(bad.clone()).await, Err(DomainError::InvalidArgument(_))));
    bad.email = "x@y.z".into();
    bad.age = 0;
    assert!(matches!(svc.members.join(bad).await, Err(DomainError::InvalidArgument(_))));

    let found = svc.members.find_by_email("bob@example.com").await.unwrap();
    assert_eq!(found.id, m.id);
    assert!(matches!(svc.members.find_by_email("ghost@example.com").await, Err(DomainError::Repo(RepoError::NotFound))));
}

#[tokio::test]
async fn member_update_status_and_delete() {
    let svc = services();
    let m = svc.members.join(new_member("dana@example.com")).await.unwrap();

    let upd = MemberUpdate { username: "dana".into(), phone_num: Some("555".into()), age: 0, grade: MemberGrade::Admin };
    let m2 = svc.members.update(m.id, upd.clone()).await.unwrap();
    assert_eq!(m2.username, "dana");
    assert_eq!(m2.grade, MemberGrade::Admin);

    let blank = MemberUpdate { username: "  ".into(), ..upd.clone() };
    assert!(matches!(svc.members.update(m.id, blank).await, Err(DomainError::InvalidArgument(_))));
    let negative = MemberUpdate { age: -1, ..upd };
    assert!(matches!(svc.members.update(m.id, negative).await, Err(DomainError::InvalidArgument(_))));

    let suspended = svc.members.change_status(m.id, MemberStatus::Suspended).await.unwrap();
    assert_eq!(suspended.status, MemberStatus::Suspended);

    assert!(matches!(svc.members.change_password(m.id, "").await, Err(DomainError::InvalidArgument(_))));

    svc.members.delete(m.id).await.unwrap();
    assert!(matches!(svc.members.find(m.id).await, Err(DomainError::Repo(RepoError::NotFound))));
    assert!(svc.members.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn category_names_are_unique() {
    let r = InMemRepo::new();
    r.create_category(NewCategory { name: "news".into() }).await.unwrap();
    let err = r.create_category(NewCategory { name: "news".into() }).await.unwrap_err();
    assert!(matches!(err, RepoError::Conflict));
    assert_eq!(r.list_categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn post_lifecycle_paging_and_search() {
    let r = InMemRepo::new();
    let author = r.create_member(&new_member("erin@example.com"), "h").await.unwrap();
    let cat = r.create_category(NewCategory { name: "misc".into() }).await.unwrap();
    let svc = Services::new(Arc::new(r.clone()), RetryExecutor::new(RetryPolicy::default()));

    let mut ids = Vec::new();
    for i in 0..12 {
        let p = svc
            .posts
            .create_post(NewPost {
                category_id: cat.id,
                member_id: author.id,
                name: format!("Post {i}"),
                content: if i == 3 { "Rust ownership notes".into() } else { format!("body {i}") },
                status: None,
            })
            .await
            .unwrap();
        assert_eq!((p.view_count, p.like_count, p.version), (0, 0, 0));
        assert_eq!(p.status, PostStatus::Public);
        ids.push(p.id);
    }

    let page = svc.posts.list_posts(1, 5).await.unwrap();
    assert_eq!(page.total_count, 12);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.posts.len(), 5);
    // newest first
    assert_eq!(page.posts[0].id, *ids.last().unwrap());
    assert_eq!(svc.posts.list_posts(3, 5).await.unwrap().posts.len(), 2);
    assert!(matches!(svc.posts.list_posts(0, 5).await, Err(DomainError::InvalidArgument(_))));
    assert!(matches!(svc.posts.list_posts(1, 101).await, Err(DomainError::InvalidArgument(_))));

    let hits = svc.posts.search("rust").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ids[3]);

    let edited = svc
        .posts
        .update_post(ids[0], PostUpdate { name: Some("Renamed".into()), content: None })
        .await
        .unwrap();
    assert_eq!(edited.name, "Renamed");
    assert_eq!(edited.content, "body 0");
    assert_eq!(edited.version, 1);

    let too_long = PostUpdate { name: None, content: Some("a".repeat(5001)) };
    assert!(matches!(svc.posts.update_post(ids[0], too_long).await, Err(DomainError::InvalidArgument(_))));

    svc.posts.delete_post(ids[3]).await.unwrap();
    assert_eq!(svc.posts.list_posts(1, 100).await.unwrap().total_count, 11);
    assert!(svc.posts.search("rust").await.unwrap().is_empty());
    // soft delete keeps the row
    assert_eq!(svc.posts.find_post(ids[3]).await.unwrap().status, PostStatus::Deleted);
    let err = svc.posts.update_post(ids[3], PostUpdate::default()).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));

    assert_eq!(svc.posts.posts_by_author(author.id).await.unwrap().len(), 12);
}

#[tokio::test]
async fn post_requires_existing_category_and_author() {
    let r = InMemRepo::new();
    let err = r
        .create_post(NewPost { category_id: 1, member_id: 2, name: "n".into(), content: "c".into(), status: None })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound));
}

#[tokio::test]
async fn author_with_posts_cannot_be_deleted() {
    let r = InMemRepo::new();
    let author = r.create_member(&new_member("gil@example.com"), "h").await.unwrap();
    let cat = r.create_category(NewCategory { name: "c".into() }).await.unwrap();
    r.create_post(NewPost { category_id: cat.id, member_id: author.id, name: "n".into(), content: "c".into(), status: None })
        .await
        .unwrap();
    assert!(matches!(r.delete_member(author.id).await, Err(RepoError::Conflict)));
}

#[tokio::test]
async fn commenter_cannot_be_deleted() {
    let r = InMemRepo::new();
    let author = r.create_member(&new_member("hal@example.com"), "h").await.unwrap();
    let commenter = r.create_member(&new_member("ida@example.com"), "h").await.unwrap();
    let cat = r.create_category(NewCategory { name: "c".into() }).await.unwrap();
    let post = r
        .create_post(NewPost { category_id: cat.id, member_id: author.id, name: "n".into(), content: "c".into(), status: None })
        .await
        .unwrap();
    r.create_comment(&NewComment { post_id: post.id, member_id: commenter.id, content: "hi".into() }, None)
        .await
        .unwrap();
    assert!(matches!(r.delete_member(commenter.id).await, Err(RepoError::Conflict)));
    assert!(r.get_member(commenter.id).await.is_ok());
}

#[tokio::test]
async fn post_cannot_be_created_deleted() {
    let r = InMemRepo::new();
    let author = r.create_member(&new_member("jo@example.com"), "h").await.unwrap();
    let cat = r.create_category(NewCategory { name: "c".into() }).await.unwrap();
    let svc = Services::new(Arc::new(r.clone()), RetryExecutor::new(RetryPolicy::default()));
    let new = NewPost {
        category_id: cat.id,
        member_id: author.id,
        name: "n".into(),
        content: "c".into(),
        status: Some(PostStatus::Deleted),
    };
    assert!(matches!(svc.posts.create_post(new).await, Err(DomainError::InvalidArgument(_))));
    assert_eq!(r.count_posts().await.unwrap(), 0);
}
