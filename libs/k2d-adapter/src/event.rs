//! Event sub-adapter. k2d performs no reconciliation and emits no
//! Kubernetes Events; this exists only so the façade's list-events
//! endpoint returns a well-formed empty response instead of 404.

use k8s_openapi::api::core::v1::Event;

pub fn list() -> Vec<Event> {
    Vec::new()
}
