use crate::routes::{health, waves};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "waverunner-server",
    description = "Fetch audio from video URLs and serve it as WAV",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(waves::WavesApi::openapi());
    root
}
