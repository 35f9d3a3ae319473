use k2d_util::error::Result;

use k2d_convert::engine::model::EngineSystemInfo;

use crate::error::map_engine_error;
use crate::Gateway;

impl Gateway {
    pub async fn system_info(&self) -> Result<EngineSystemInfo> {
        let info = self
            .docker
            .info()
            .await
            .map_err(|e| map_engine_error("reading engine system info", e))?;
        Ok(EngineSystemInfo {
            node_name: info.name.unwrap_or_default(),
            architecture: info.architecture.unwrap_or_default(),
            os_type: info.os_type.unwrap_or_default(),
            kernel_version: info.kernel_version.unwrap_or_default(),
            ncpu: info.ncpu.unwrap_or_default(),
            mem_total_bytes: info.mem_total.unwrap_or_default(),
            engine_version: self.engine_version().await.unwrap_or_default(),
        })
    }

    async fn engine_version(&self) -> Result<String> {
        let version = self
            .docker
            .version()
            .await
            .map_err(|e| map_engine_error("reading engine version", e))?;
        Ok(version.version.unwrap_or_default())
    }

    /// Liveness probe against the engine itself, used by the server's own
    /// `/healthz` so readiness mirrors the engine connection.
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| map_engine_error("pinging container engine", e))
    }
}
