mod csv;
pub mod documents;
mod handlers;
mod pdf;
pub mod repo;
pub mod services;

use axum::{
    http::header,
    response::{IntoResponse, Response},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::routes()
}

/// File download response.
pub fn attachment(content_type: &'static str, filename: &str, body: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_sets_download_headers() {
        let res = attachment("text/csv; charset=utf-8", "a.csv", b"x".to_vec());
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        assert_eq!(
            res.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"a.csv\""
        );
    }
}
