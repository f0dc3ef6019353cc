use std::sync::Arc;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::models::*;
use crate::repo::Repo;
use crate::retry::RetryExecutor;
use crate::services::Services;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::resource("/members")
                    .route(web::get().to(list_members))
                    .route(web::post().to(join_member)),
            )
            .service(
                web::resource("/members/{id}")
                    .route(web::get().to(get_member))
                    .route(web::put().to(update_member))
                    .route(web::delete().to(delete_member)),
            )
            .service(web::resource("/members/{id}/status").route(web::put().to(change_member_status)))
            .service(web::resource("/members/{id}/password").route(web::put().to(change_member_password)))
            .service(web::resource("/members/{id}/posts").route(web::get().to(posts_by_author)))
            .service(
                web::resource("/categories")
                    .route(web::get().to(list_categories))
                    .route(web::post().to(create_category)),
            )
            .service(
                web::resource("/posts")
                    .route(web::get().to(list_posts))
                    .route(web::post().to(create_post)),
            )
            // registered before /posts/{id} so "search" is not taken for an id
            .service(web::resource("/posts/search").route(web::get().to(search_posts)))
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(get_post))
                    .route(web::patch().to(update_post))
                    .route(web::delete().to(delete_post)),
            )
            .service(web::resource("/posts/{id}/like").route(web::post().to(like_post)))
            .service(web::resource("/posts/{id}/view").route(web::post().to(view_post)))
            .service(web::resource("/posts/{id}/comments").route(web::get().to(list_post_comments)))
            .service(web::resource("/posts/{id}/attachments").route(web::get().to(list_post_attachments)))
            .service(web::resource("/comments").route(web::post().to(create_comment)))
            .service(
                web::resource("/comments/{id}")
                    .route(web::get().to(get_comment))
                    .route(web::patch().to(edit_comment))
                    .route(web::delete().to(delete_comment)),
            )
            .service(
                web::resource("/comments/{id}/replies")
                    .route(web::get().to(list_replies))
                    .route(web::post().to(create_reply)),
            )
            .service(web::resource("/attachments").route(web::post().to(create_attachment)))
            .service(
                web::resource("/attachments/{id}")
                    .route(web::get().to(get_attachment))
                    .route(web::put().to(update_attachment))
                    .route(web::delete().to(delete_attachment)),
            ),
    );
}

#[derive(Clone)]
pub struct AppState { pub services: Services }

impl AppState {
    pub fn new<R: Repo + 'static>(repo: Arc<R>, retry: RetryExecutor) -> Self {
        Self { services: Services::new(repo, retry) }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1)
    pub page: Option<u32>,
    /// Page size, 1..=100 (default 10)
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    pub keyword: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChange { pub status: MemberStatus }

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordChange { pub password: String }

// ---------------- Members ----------------

#[utoipa::path(
    get,
    path = "/api/v1/members",
    responses((status = 200, description = "List members", body = [Member]))
)]
pub async fn list_members(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.members.list().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/members",
    request_body = NewMember,
    responses(
        (status = 201, description = "Member joined", body = Member),
        (status = 400, description = "Invalid member fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn join_member(data: web::Data<AppState>, payload: web::Json<NewMember>) -> Result<HttpResponse, ApiError> {
    let member = data.services.members.join(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(member))
}

#[utoipa::path(
    get,
    path = "/api/v1/members/{id}",
    params(("id" = Id, Path, description = "Member id")),
    responses(
        (status = 200, description = "Member", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.members.find(path.into_inner()).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/members/{id}",
    params(("id" = Id, Path, description = "Member id")),
    request_body = MemberUpdate,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 400, description = "Invalid member fields"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn update_member(data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<MemberUpdate>) -> Result<HttpResponse, ApiError> {
    let member = data.services.members.update(path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[utoipa::path(
    put,
    path = "/api/v1/members/{id}/status",
    params(("id" = Id, Path, description = "Member id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status changed", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn change_member_status(data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<StatusChange>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.members.change_status(path.into_inner(), payload.status).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/members/{id}/password",
    params(("id" = Id, Path, description = "Member id")),
    request_body = PasswordChange,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Empty password"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn change_member_password(data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<PasswordChange>) -> Result<HttpResponse, ApiError> {
    data.services.members.change_password(path.into_inner(), &payload.password).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    delete,
    path = "/api/v1/members/{id}",
    params(("id" = Id, Path, description = "Member id")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found"),
        (status = 409, description = "Member still has posts or comments")
    )
)]
pub async fn delete_member(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    data.services.members.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------- Categories ----------------

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "List categories", body = [PostCategory]))
)]
pub async fn list_categories(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.categories.list().await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = NewCategory,
    responses(
        (status = 201, description = "Category created", body = PostCategory),
        (status = 409, description = "Duplicate name")
    )
)]
pub async fn create_category(data: web::Data<AppState>, payload: web::Json<NewCategory>) -> Result<HttpResponse, ApiError> {
    let category = data.services.categories.create(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(category))
}

// ---------------- Posts ----------------

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of posts, newest first", body = PostPage),
        (status = 400, description = "Invalid paging")
    )
)]
pub async fn list_posts(data: web::Data<AppState>, query: web::Query<PageQuery>) -> Result<HttpResponse, ApiError> {
    let page = data.services.posts.list_posts(query.page.unwrap_or(1), query.size.unwrap_or(10)).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = NewPost,
    responses(
        (status = 201, description = "Post created", body = Post),
        (status = 400, description = "Invalid post fields"),
        (status = 404, description = "Category or member not found")
    )
)]
pub async fn create_post(data: web::Data<AppState>, payload: web::Json<NewPost>) -> Result<HttpResponse, ApiError> {
    let post = data.services.posts.create_post(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/search",
    params(SearchQuery),
    responses((status = 200, description = "Matching posts", body = [Post]))
)]
pub async fn search_posts(data: web::Data<AppState>, query: web::Query<SearchQuery>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.posts.search(&query.keyword).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.posts.find_post(path.into_inner()).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    request_body = PostUpdate,
    responses(
        (status = 200, description = "Post updated", body = Post),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Post is deleted")
    )
)]
pub async fn update_post(data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<PostUpdate>) -> Result<HttpResponse, ApiError> {
    let post = data.services.posts.update_post(path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post marked DELETED"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn delete_post(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    data.services.posts.delete_post(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/members/{id}/posts",
    params(("id" = Id, Path, description = "Member id")),
    responses((status = 200, description = "Posts written by the member", body = [Post]))
)]
pub async fn posts_by_author(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.posts.posts_by_author(path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/like",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 204, description = "Like recorded"),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Concurrent modification; retry the request"),
        (status = 503, description = "Interrupted during shutdown")
    )
)]
pub async fn like_post(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    data.services.posts.increment_like_count(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/v1/posts/{id}/view",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 204, description = "View recorded"),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Concurrent modification; retry the request")
    )
)]
pub async fn view_post(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    data.services.posts.increment_view_count(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ---------------- Comments ----------------

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}/comments",
    params(("id" = Id, Path, description = "Post id")),
    responses(
        (status = 200, description = "Root comments with their replies", body = [Comment]),
        (status = 404, description = "Post not found")
    )
)]
pub async fn list_post_comments(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.comments.comments_for_post(path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments",
    request_body = NewComment,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, description = "Invalid content"),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Post is deleted")
    )
)]
pub async fn create_comment(data: web::Data<AppState>, payload: web::Json<NewComment>) -> Result<HttpResponse, ApiError> {
    let comment = data.services.comments.add_comment(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(comment))
}

#[utoipa::path(
    get,
    path = "/api/v1/comments/{id}",
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 200, description = "Comment", body = Comment),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn get_comment(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.comments.find_comment(path.into_inner()).await?))
}

#[utoipa::path(
    patch,
    path = "/api/v1/comments/{id}",
    params(("id" = Id, Path, description = "Comment id")),
    request_body = CommentEdit,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 400, description = "Invalid content"),
        (status = 409, description = "Comment is not editable")
    )
)]
pub async fn edit_comment(data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<CommentEdit>) -> Result<HttpResponse, ApiError> {
    let comment = data.services.comments.update_comment(path.into_inner(), &payload.content).await?;
    Ok(HttpResponse::Ok().json(comment))
}

#[utoipa::path(
    delete,
    path = "/api/v1/comments/{id}",
    params(("id" = Id, Path, description = "Comment id")),
    responses(
        (status = 204, description = "Comment marked DELETED"),
        (status = 404, description = "Comment not found")
    )
)]
pub async fn delete_comment(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    data.services.comments.delete_comment(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/v1/comments/{id}/replies",
    params(("id" = Id, Path, description = "Parent comment id")),
    responses((status = 200, description = "Direct replies that are not deleted", body = [Comment]))
)]
pub async fn list_replies(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.comments.replies(path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/comments/{id}/replies",
    params(("id" = Id, Path, description = "Parent comment id")),
    request_body = NewComment,
    responses(
        (status = 201, description = "Reply created", body = Comment),
        (status = 404, description = "Parent comment not found"),
        (status = 409, description = "Parent comment is deleted")
    )
)]
pub async fn create_reply(data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<NewComment>) -> Result<HttpResponse, ApiError> {
    let reply = data.services.comments.reply(path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(reply))
}

// ---------------- Attachments ----------------

#[utoipa::path(
    post,
    path = "/api/v1/attachments",
    request_body = NewAttachment,
    responses(
        (status = 201, description = "Attachment registered", body = Attachment),
        (status = 400, description = "Missing post or invalid file metadata"),
        (status = 404, description = "Post not found"),
        (status = 409, description = "Post already holds the maximum number of attachments")
    )
)]
pub async fn create_attachment(data: web::Data<AppState>, payload: web::Json<NewAttachment>) -> Result<HttpResponse, ApiError> {
    let attachment = data.services.attachments.add_attachment(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(attachment))
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}/attachments",
    params(("id" = Id, Path, description = "Post id")),
    responses((status = 200, description = "Attachments of the post", body = [Attachment]))
)]
pub async fn list_post_attachments(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.attachments.list_for_post(path.into_inner()).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/attachments/{id}",
    params(("id" = Id, Path, description = "Attachment id")),
    responses(
        (status = 200, description = "Attachment", body = Attachment),
        (status = 404, description = "Attachment not found")
    )
)]
pub async fn get_attachment(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(data.services.attachments.find(path.into_inner()).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/attachments/{id}",
    params(("id" = Id, Path, description = "Attachment id")),
    request_body = AttachmentFile,
    responses(
        (status = 200, description = "Attachment updated", body = Attachment),
        (status = 400, description = "Invalid file metadata"),
        (status = 404, description = "Attachment not found")
    )
)]
pub async fn update_attachment(data: web::Data<AppState>, path: web::Path<Id>, payload: web::Json<AttachmentFile>) -> Result<HttpResponse, ApiError> {
    let attachment = data.services.attachments.update_attachment(path.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(attachment))
}

#[utoipa::path(
    delete,
    path = "/api/v1/attachments/{id}",
    params(("id" = Id, Path, description = "Attachment id")),
    responses(
        (status = 204, description = "Attachment removed"),
        (status = 404, description = "Attachment not found")
    )
)]
pub async fn delete_attachment(data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    data.services.attachments.delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
