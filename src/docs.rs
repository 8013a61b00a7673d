use utoipa::OpenApi;
use crate::modules::upload::dto::UploadUrlResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::upload::handler::get_upload_url,
    ),
    components(
        schemas(UploadUrlResponse)
    ),
    tags(
        (name = "Upload", description = "Direct-to-bucket video uploads")
    )
)]
pub struct ApiDoc;
