#![cfg(feature = "inmem-store")]

use board::error::DomainError;
use board::models::*;
use board::repo::inmem::InMemRepo;
use board::repo::RepoError;
use board::retry::{RetryExecutor, RetryPolicy};
use board::Services;
use std::sync::Arc;

async fn setup() -> (Services, Post, Member) {
    let svc = Services::new(Arc::new(InMemRepo::new()), RetryExecutor::new(RetryPolicy::default()));
    let member = svc
        .members
        .join(NewMember {
            email: "c@d.e".into(),
            username: "carol".into(),
            password: "pw".into(),
            phone_num: Some("010-0000-0000".into()),
            age: 41,
            grade: MemberGrade::Member,
        })
        .await
        .unwrap();
    let cat = svc.categories.create(NewCategory { name: "talk".into() }).await.unwrap();
    let post = svc
        .posts
        .create_post(NewPost {
            category_id: cat.id,
            member_id: member.id,
            name: "thread".into(),
            content: "opening".into(),
            status: None,
        })
        .await
        .unwrap();
    (svc, post, member)
}

fn new_comment(post: &Post, member: &Member, text: &str) -> NewComment {
    NewComment { post_id: post.id, member_id: member.id, content: text.into() }
}

#[tokio::test]
async fn replies_hang_off_their_root() {
    let (svc, post, member) = setup().await;
    let root = svc.comments.add_comment(new_comment(&post, &member, "first")).await.unwrap();
    let r1 = svc.comments.reply(root.id, new_comment(&post, &member, "re: first")).await.unwrap();
    let r2 = svc.comments.reply(root.id, new_comment(&post, &member, "re: first again")).await.unwrap();
    assert_eq!(r1.parent_id, Some(root.id));
    assert!(r1.is_reply());

    let tree = svc.comments.comments_for_post(post.id).await.unwrap();
    assert_eq!(tree.len(), 1);
    let ids: Vec<Id> = tree[0].child_comments.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![r1.id, r2.id]);
}

#[tokio::test]
async fn deleted_parent_refuses_replies_and_stores_nothing() {
    let (svc, post, member) = setup().await;
    let root = svc.comments.add_comment(new_comment(&post, &member, "soon gone")).await.unwrap();
    svc.comments.delete_comment(root.id).await.unwrap();

    let err = svc.comments.reply(root.id, new_comment(&post, &member, "too late")).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(ref m) if m == "cannot reply to deleted comment"));
    assert!(svc.comments.replies(root.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn reply_must_stay_on_the_parent_post() {
    let (svc, post, member) = setup().await;
    let root = svc.comments.add_comment(new_comment(&post, &member, "here")).await.unwrap();
    let mut stray = new_comment(&post, &member, "elsewhere");
    stray.post_id = post.id + 1000;
    let err = svc.comments.reply(root.id, stray).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidArgument(_)));
}

#[tokio::test]
async fn content_limits_apply_on_create_and_edit() {
    let (svc, post, member) = setup().await;
    let err = svc.comments.add_comment(new_comment(&post, &member, "  ")).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidArgument(_)));

    let c = svc.comments.add_comment(new_comment(&post, &member, &"x".repeat(1000))).await.unwrap();
    let err = svc.comments.update_comment(c.id, &"x".repeat(1001)).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidArgument(_)));
    // rejected edit leaves stored content alone
    assert_eq!(svc.comments.find_comment(c.id).await.unwrap().content.len(), 1000);

    let edited = svc.comments.update_comment(c.id, "shorter").await.unwrap();
    assert_eq!(edited.content, "shorter");
}

#[tokio::test]
async fn deleted_comments_are_hidden_and_frozen() {
    let (svc, post, member) = setup().await;
    let keep = svc.comments.add_comment(new_comment(&post, &member, "keep")).await.unwrap();
    let drop = svc.comments.add_comment(new_comment(&post, &member, "drop")).await.unwrap();
    let reply = svc.comments.reply(keep.id, new_comment(&post, &member, "hidden reply")).await.unwrap();
    svc.comments.delete_comment(drop.id).await.unwrap();
    svc.comments.delete_comment(reply.id).await.unwrap();
    // deleting twice is a no-op
    svc.comments.delete_comment(drop.id).await.unwrap();

    let tree = svc.comments.comments_for_post(post.id).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, keep.id);
    assert!(tree[0].child_comments.is_empty());

    let err = svc.comments.update_comment(drop.id, "revive").await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
    let stored = svc.comments.find_comment(drop.id).await.unwrap();
    assert_eq!(stored.status, CommentStatus::Deleted);
    assert_eq!(stored.content, "drop");
}

#[tokio::test]
async fn comments_require_a_live_post() {
    let (svc, post, member) = setup().await;
    let mut orphan = new_comment(&post, &member, "nowhere");
    orphan.post_id = 424242;
    let err = svc.comments.add_comment(orphan).await.unwrap_err();
    assert!(matches!(err, DomainError::Repo(RepoError::NotFound)));

    svc.posts.delete_post(post.id).await.unwrap();
    let err = svc.comments.add_comment(new_comment(&post, &member, "late")).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidState(_)));
}
