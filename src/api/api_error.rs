use crate::error::Error;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl APIError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<Error>() {
            Some(
                Error::InvalidRange(_, _)
                | Error::RangeTooLarge { .. }
                | Error::InvalidAddress(_)
                | Error::InvalidGroupName(_)
                | Error::InvalidDomain(_),
            ) => StatusCode::BAD_REQUEST,
            Some(Error::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(Error::StoreTimeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Some(Error::JsonExtractorRejection(rejection)) => match rejection {
                JsonRejection::JsonDataError(_) => StatusCode::UNPROCESSABLE_ENTITY,
                JsonRejection::JsonSyntaxError(_) => StatusCode::BAD_REQUEST,
                JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:#}", self.0);
        }
        let body = Json(json!({
            "error": format!("{:#}", self.0),
        }));
        (status, body).into_response()
    }
}

/// Lets extractors reject with an [`Error`] directly, e.g. `WithRejection<Json<T>, Error>`.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        APIError::from(self).into_response()
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::PolicyBlock;
    use axum::body::Body;
    use axum::extract::FromRequest;
    use axum::http::{header, Request};
    use axum_extra::extract::WithRejection;

    async fn submit(content_type: Option<&str>, body: &str) -> StatusCode {
        let mut req = Request::builder().method("POST").uri("/v1/acl/ip/cidr");
        if let Some(content_type) = content_type {
            req = req.header(header::CONTENT_TYPE, content_type);
        }
        let req = req.body(Body::from(body.to_string())).unwrap();
        match WithRejection::<Json<PolicyBlock>, Error>::from_request(req, &()).await {
            Ok(_) => StatusCode::OK,
            Err(err) => {
                assert!(matches!(err, Error::JsonExtractorRejection(_)));
                err.into_response().status()
            }
        }
    }

    #[tokio::test]
    async fn body_rejections_map_to_client_errors() {
        let json = Some("application/json");
        assert_eq!(submit(json, r#"{"cidr": "10.0.0.0/30"}"#).await, StatusCode::OK);
        assert_eq!(submit(json, "{broken").await, StatusCode::BAD_REQUEST);
        assert_eq!(
            submit(json, r#"{"netmask": "wide"}"#).await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            submit(None, r#"{"cidr": "10.0.0.0/30"}"#).await,
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    fn status_of(err: Error) -> StatusCode {
        APIError::from(err).into_response().status()
    }

    #[test]
    fn maps_error_kinds_to_status() {
        assert_eq!(
            status_of(Error::InvalidAddress("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::RangeTooLarge {
                cidr: "fd00::/64".to_string(),
                candidates: 1 << 64,
                limit: 1 << 16,
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::NotFound("10.0.0.1".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(Error::StoreTimeout("get".to_string())),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(Error::IO(std::io::Error::new(
                std::io::ErrorKind::Other,
                "boom"
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
