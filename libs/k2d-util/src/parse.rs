//! Small parsing helpers shared by the converter, gateway and adapter.

/// Split an image reference into its registry domain and the remainder of the reference.
///
/// Follows the usual Docker convention: the first path segment is a registry
/// domain only if it contains a `.`, a `:` (port) or is `localhost`;
/// otherwise the image is assumed to live on the default public registry and
/// the domain is returned as `docker.io`.
pub fn split_image_reference(image: &str) -> (String, String) {
    match image.split_once('/') {
        Some((maybe_domain, rest)) if looks_like_registry_domain(maybe_domain) => {
            (maybe_domain.to_string(), rest.to_string())
        }
        _ => ("docker.io".to_string(), image.to_string()),
    }
}

fn looks_like_registry_domain(segment: &str) -> bool {
    segment == "localhost" || segment.contains('.') || segment.contains(':')
}

/// Parse a `"major.minor.patch"`-ish semantic version string, tolerating a
/// trailing pre-release/build suffix on the patch component.
pub fn parse_semver(tag: &str) -> Option<(u64, u64, u64)> {
    let parts: Vec<_> = tag.trim_start_matches('v').split('.').collect();
    if parts.len() >= 3 {
        let major = parts[0].parse().ok()?;
        let minor = parts[1].parse().ok()?;
        let patch = parts[2]
            .split(|c: char| !c.is_ascii_digit())
            .next()?
            .parse()
            .ok()?;
        Some((major, minor, patch))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_explicit_registry() {
        assert_eq!(
            split_image_reference("r.example.com/p/q:v"),
            ("r.example.com".to_string(), "p/q:v".to_string())
        );
    }

    #[test]
    fn splits_localhost_registry() {
        assert_eq!(
            split_image_reference("localhost:5000/p/q"),
            ("localhost:5000".to_string(), "p/q".to_string())
        );
    }

    #[test]
    fn defaults_to_docker_hub() {
        assert_eq!(
            split_image_reference("nginx:1.25"),
            ("docker.io".to_string(), "nginx:1.25".to_string())
        );
        assert_eq!(
            split_image_reference("library/nginx:1.25"),
            ("docker.io".to_string(), "library/nginx:1.25".to_string())
        );
    }

    #[test]
    fn parses_semver_with_suffix() {
        assert_eq!(parse_semver("v1.2.3-rc1"), Some((1, 2, 3)));
        assert_eq!(parse_semver("27.3.1"), Some((27, 3, 1)));
        assert_eq!(parse_semver("not-a-version"), None);
    }
}
