use crate::models::{
    Attachment, AttachmentFile, Comment, CommentEdit, CommentStatus, Member, MemberGrade, MemberStatus,
    MemberUpdate, NewAttachment, NewCategory, NewComment, NewMember, NewPost, Post, PostCategory, PostPage,
    PostStatus, PostUpdate,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_members,
        crate::routes::join_member,
        crate::routes::get_member,
        crate::routes::update_member,
        crate::routes::delete_member,
        crate::routes::change_member_status,
        crate::routes::change_member_password,
        crate::routes::posts_by_author,
        crate::routes::list_categories,
        crate::routes::create_category,
        crate::routes::list_posts,
        crate::routes::create_post,
        crate::routes::search_posts,
        crate::routes::get_post,
        crate::routes::update_post,
        crate::routes::delete_post,
        crate::routes::like_post,
        crate::routes::view_post,
        crate::routes::list_post_comments,
        crate::routes::create_comment,
        crate::routes::get_comment,
        crate::routes::edit_comment,
        crate::routes::delete_comment,
        crate::routes::list_replies,
        crate::routes::create_reply,
        crate::routes::create_attachment,
        crate::routes::list_post_attachments,
        crate::routes::get_attachment,
        crate::routes::update_attachment,
        crate::routes::delete_attachment,
    ),
    components(schemas(
        Member, NewMember, MemberUpdate, MemberGrade, MemberStatus,
        PostCategory, NewCategory,
        Post, NewPost, PostUpdate, PostPage, PostStatus,
        Comment, NewComment, CommentEdit, CommentStatus,
        Attachment, AttachmentFile, NewAttachment,
        crate::routes::StatusChange, crate::routes::PasswordChange,
    )),
    tags(
        (name = "members", description = "Member operations"),
        (name = "posts", description = "Post and counter operations"),
        (name = "comments", description = "Comment operations"),
        (name = "attachments", description = "Attachment metadata operations"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/v1/members/{id}",
            "/api/v1/members/{id}/status",
            "/api/v1/members/{id}/password",
            "/api/v1/members/{id}/posts",
            "/api/v1/posts/{id}",
            "/api/v1/posts/{id}/attachments",
            "/api/v1/comments/{id}",
            "/api/v1/comments/{id}/replies",
            "/api/v1/attachments/{id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing from ApiDoc");
        }
        assert_eq!(doc.paths.paths.len(), 18);
    }

    #[test]
    fn member_schema_hides_password_hash() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("\"Member\""));
        assert!(!json.contains("password_hash"));
    }
}
