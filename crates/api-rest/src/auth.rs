use axum::{extract::Path, response::Json};
use tinycm_uuid::Uuid;

use api_shared::TokenRes;

#[utoipa::path(
    post,
    path = "/auth/realms/{realm}/protocol/openid-connect/token",
    params(("realm" = String, Path, description = "Realm name, echoed into the token")),
    responses(
        (status = 200, description = "A throwaway bearer token", body = TokenRes)
    )
)]
/// Development token endpoint
///
/// Mimics the shape of an OpenID Connect token response so front ends can run without an
/// identity provider. The token is random and nothing ever checks it.
#[axum::debug_handler]
pub(crate) async fn issue_token(Path(realm): Path<String>) -> Json<TokenRes> {
    Json(TokenRes {
        token_type: "bearer".into(),
        access_token: format!("{}-{}", Uuid::new_v4(), realm),
    })
}
