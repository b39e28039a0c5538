use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use futures::TryStreamExt;
use serde_json::json;

use crate::{configuration::ScraperSettings, domain::profile_link::harvest_profile_links};

use super::ApiError;

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

#[post("/upload_html")]
async fn upload_html(
    mut payload: Multipart,
    settings: web::Data<ScraperSettings>,
) -> Result<HttpResponse, ApiError> {
    let mut upload: Option<UploadedFile> = None;

    while let Some(mut field) = payload.try_next().await? {
        let content_disposition = field.content_disposition().cloned();
        let name = content_disposition.as_ref().and_then(|cd| cd.get_name());

        let mut bytes = vec![];
        while let Some(chunk) = field.try_next().await? {
            if name == Some("file") {
                if bytes.len() + chunk.len() > settings.upload_max_bytes {
                    return Err(ApiError::BadRequest("File too large".to_string()));
                }
                bytes.extend_from_slice(&chunk);
            }
        }

        if name == Some("file") {
            let filename = content_disposition
                .as_ref()
                .and_then(|cd| cd.get_filename())
                .unwrap_or_default()
                .to_string();
            upload = Some(UploadedFile { filename, bytes });
        }
    }

    let file = upload.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    if file.filename.is_empty() {
        return Err(ApiError::BadRequest("No file selected".to_string()));
    }
    if !file.filename.ends_with(".html") {
        return Err(ApiError::BadRequest("Invalid file format".to_string()));
    }

    let html = String::from_utf8(file.bytes)
        .map_err(|_| ApiError::BadRequest("File is not valid UTF-8".to_string()))?;
    let links = harvest_profile_links(&html, Some(&settings.harvest_base_url));
    log::info!("Harvested {} links from {}", links.len(), file.filename);

    Ok(HttpResponse::Ok().json(json!({
        "message": "File processed successfully",
        "links_found": links.len(),
        "links": links.iter().take(settings.upload_preview_limit).collect::<Vec<_>>(),
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;

    use crate::{
        configuration::ScraperSettings,
        routes::api_scope,
        test_utils::{FakeWeb, TestDeps},
    };

    const BOUNDARY: &str = "pagescout-boundary";

    fn multipart_request(field: &str, filename: &str, content: &str) -> test::TestRequest {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: text/html\r\n\r\n{content}\r\n--{b}--\r\n",
            b = BOUNDARY,
        );
        test::TestRequest::post()
            .uri("/api/upload_html")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    async fn upload(req: test::TestRequest) -> (StatusCode, Value) {
        upload_capped(req, ScraperSettings::default().upload_max_bytes).await
    }

    async fn upload_capped(req: test::TestRequest, max_bytes: usize) -> (StatusCode, Value) {
        let mut deps = TestDeps::new(FakeWeb::new());
        deps.settings.upload_max_bytes = max_bytes;
        let app =
            test::init_service(App::new().configure(|cfg| deps.register(cfg)).service(api_scope()))
                .await;
        let resp = test::call_service(&app, req.to_request()).await;
        let status = resp.status();
        (status, test::read_body_json(resp).await)
    }

    #[actix_web::test]
    async fn html_upload_returns_harvested_links() {
        let html = r#"<a href="/acme.foods">a</a><a href="/acme.foods">b</a><a href="https://example.com/x">c</a>"#;
        let (status, body) = upload(multipart_request("file", "saved.html", html)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["links_found"], 1);
        assert_eq!(body["links"][0], "https://www.facebook.com/acme.foods");
    }

    #[actix_web::test]
    async fn upload_without_file_field_is_rejected() {
        let (status, body) = upload(multipart_request("other", "saved.html", "<p></p>")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file provided");
    }

    #[actix_web::test]
    async fn non_html_upload_is_rejected() {
        let (status, body) = upload(multipart_request("file", "links.txt", "x")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid file format");
    }

    #[actix_web::test]
    async fn oversized_upload_is_rejected() {
        let html = format!("<p>{}</p>", "x".repeat(64));
        let (status, body) = upload_capped(multipart_request("file", "big.html", &html), 16).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "File too large");
    }
}
