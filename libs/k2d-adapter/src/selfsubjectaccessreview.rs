//! SelfSubjectAccessReview sub-adapter: unconditionally reports
//! `allowed=true`. k2d has no RBAC model; every caller that can reach the
//! façade is trusted.

use k8s_openapi::api::authorization::v1::{SelfSubjectAccessReview, SelfSubjectAccessReviewStatus};

pub fn create(mut review: SelfSubjectAccessReview) -> SelfSubjectAccessReview {
    review.status = SelfSubjectAccessReviewStatus {
        allowed: true,
        ..Default::default()
    };
    review
}
