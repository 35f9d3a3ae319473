use k2d_util::error::Result;

use bollard::auth::DockerCredentials;
use bollard::image::CreateImageOptions;
use futures::StreamExt;

use crate::error::map_engine_error;
use crate::Gateway;

/// Username/password pulled out of a registry `Secret`, assembled by the
/// adapter from the image's registry domain and the matching credential.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
    pub server_address: Option<String>,
}

impl Gateway {
    /// Pull `image` into the engine's local image store, authenticating with
    /// `auth` when the image's registry requires it.
    pub async fn pull_image(&self, image: &str, auth: Option<RegistryAuth>) -> Result<()> {
        let credentials = auth.map(|auth| DockerCredentials {
            username: Some(auth.username),
            password: Some(auth.password),
            serveraddress: auth.server_address,
            ..Default::default()
        });

        let mut stream = self.docker.create_image(
            Some(CreateImageOptions {
                from_image: image.to_string(),
                ..Default::default()
            }),
            None,
            credentials,
        );

        while let Some(progress) = stream.next().await {
            progress.map_err(|e| map_engine_error(&format!("pulling image {image}"), e))?;
        }
        Ok(())
    }

    pub async fn image_exists(&self, image: &str) -> Result<bool> {
        match self.docker.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(map_engine_error(&format!("inspecting image {image}"), e)),
        }
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
