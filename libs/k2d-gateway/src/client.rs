use k2d_util::error::Result;

use std::time::Duration;

use bollard::Docker;

use crate::error::map_engine_error;

/// Thin, typed wrapper over the container engine API. Holds no state
/// beyond the client handle and the configured operation timeout, which
/// is applied uniformly to every call; there is no per-operation
/// override.
#[derive(Clone)]
pub struct Gateway {
    pub(crate) docker: Docker,
    pub(crate) timeout: Duration,
}

impl Gateway {
    /// Connect using the platform default transport (the local Unix socket
    /// on Linux/macOS, the named pipe on Windows), honoring `DOCKER_HOST`.
    pub fn connect(timeout: Duration) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| map_engine_error("connecting to container engine", e))?;
        Ok(Gateway {
            docker: docker.with_timeout(timeout),
            timeout,
        })
    }

    /// Connect to a plain-HTTP engine endpoint, e.g. a dockerd exposed by a
    /// docker-in-docker test container. Not used outside integration tests;
    /// production deployments always go through [`Gateway::connect`].
    pub fn connect_with_uri(uri: &str, timeout: Duration) -> Result<Self> {
        let docker = Docker::connect_with_http(uri, timeout.as_secs(), bollard::API_DEFAULT_VERSION)
            .map_err(|e| map_engine_error("connecting to container engine", e))?;
        Ok(Gateway { docker, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
