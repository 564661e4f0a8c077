//! Problem documents returned by the HTTP API

use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use recommender_lib::RecommenderError;
use serde::{Deserialize, Serialize};

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

pub const VALIDATION_PROBLEM: &str = "validation problem";
pub const RECOMMENDATION_PROBLEM: &str = "recommendation problem";

/// Error document served with `application/problem+json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            problem_type: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "a valid bearer token is required",
        )
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<&RecommenderError> for Problem {
    fn from(err: &RecommenderError) -> Self {
        match err {
            RecommenderError::Validation(message) => {
                Problem::new(StatusCode::BAD_REQUEST, VALIDATION_PROBLEM, message.clone())
            }
            RecommenderError::CatalogUnavailable(_) => Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                RECOMMENDATION_PROBLEM,
                "failed to connect to the cloud info service",
            ),
            RecommenderError::CatalogNotFound { .. } => Problem::new(
                StatusCode::BAD_REQUEST,
                RECOMMENDATION_PROBLEM,
                "no cloud information available for the request",
            ),
            RecommenderError::NoAttributeValues(_)
            | RecommenderError::NoFeasiblePlan
            | RecommenderError::AlreadySatisfied { .. }
            | RecommenderError::RatioInfeasible { .. } => {
                Problem::new(StatusCode::BAD_REQUEST, RECOMMENDATION_PROBLEM, err.to_string())
            }
            RecommenderError::Cancelled => Problem::new(
                StatusCode::SERVICE_UNAVAILABLE,
                RECOMMENDATION_PROBLEM,
                err.to_string(),
            ),
            RecommenderError::Internal(_) => Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                RECOMMENDATION_PROBLEM,
                err.to_string(),
            ),
        }
    }
}

impl From<RecommenderError> for Problem {
    fn from(err: RecommenderError) -> Self {
        Problem::from(&err)
    }
}

/// Malformed bodies are validation problems
pub fn body_rejection(rejection: JsonRejection) -> RecommenderError {
    RecommenderError::Validation(rejection.body_text())
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            [(header::CONTENT_TYPE, PROBLEM_CONTENT_TYPE)],
            Json(self),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recommender_lib::{Attribute, CatalogTarget};

    #[test]
    fn test_problem_table() {
        let cases = [
            (RecommenderError::Validation("bad".into()), 400, VALIDATION_PROBLEM),
            (RecommenderError::CatalogUnavailable("refused".into()), 500, RECOMMENDATION_PROBLEM),
            (
                RecommenderError::CatalogNotFound {
                    target: CatalogTarget::new("amazon", "compute", "mars-1"),
                    reason: "404".into(),
                },
                400,
                RECOMMENDATION_PROBLEM,
            ),
            (RecommenderError::NoAttributeValues(Attribute::Cpu), 400, RECOMMENDATION_PROBLEM),
            (RecommenderError::NoFeasiblePlan, 400, RECOMMENDATION_PROBLEM),
            (
                RecommenderError::AlreadySatisfied { cpu: 8.0, memory: 32.0 },
                400,
                RECOMMENDATION_PROBLEM,
            ),
            (RecommenderError::Cancelled, 503, RECOMMENDATION_PROBLEM),
            (RecommenderError::Internal("boom".into()), 500, RECOMMENDATION_PROBLEM),
        ];

        for (err, status, title) in cases {
            let problem = Problem::from(&err);
            assert_eq!(problem.status, status, "{err}");
            assert_eq!(problem.title, title, "{err}");
        }
    }

    #[test]
    fn test_catalog_details_are_fixed() {
        let problem = Problem::from(RecommenderError::CatalogUnavailable("dial tcp: refused".into()));
        assert_eq!(problem.detail, "failed to connect to the cloud info service");
    }

    #[test]
    fn test_response_content_type() {
        let response = Problem::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            PROBLEM_CONTENT_TYPE
        );
    }
}
