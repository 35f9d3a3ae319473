use k2d_util::error::Error as CoreError;

/// Maps a `bollard` transport error onto the shared error type, collapsing
/// the engine's own 404 status into [`CoreError::NotFound`] so the adapter
/// never has to special-case a specific client library.
pub fn map_engine_error(what: &str, error: bollard::errors::Error) -> CoreError {
    if is_not_found(&error) {
        CoreError::not_found(what.to_string())
    } else {
        CoreError::Engine(format!("{what}: {error}"))
    }
}

fn is_not_found(error: &bollard::errors::Error) -> bool {
    matches!(
        error,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}
