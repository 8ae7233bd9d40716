use std::path::PathBuf;

use skillswap_domain::DomainResult;
use skillswap_domain::error::DomainError;
use skillswap_domain::ports::BoxFuture;
use skillswap_domain::ports::blob::BlobStore;
use skillswap_domain::util::uuid_v7_without_dashes;

use crate::config::AppConfig;

/// Local-disk blob store for portfolio uploads. Object names get a uuid
/// prefix so two uploads of `logo.png` never collide.
#[derive(Clone)]
pub struct FsBlobStore {
    dir: PathBuf,
    base_url: String,
}

impl FsBlobStore {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.upload_dir),
            base_url: config.upload_base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl BlobStore for FsBlobStore {
    fn store(&self, filename: &str, bytes: Vec<u8>) -> BoxFuture<'_, DomainResult<String>> {
        let object_name = format!("{}-{}", uuid_v7_without_dashes(), sanitize(filename));
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|err| DomainError::Upstream(format!("create upload dir: {err}")))?;
            let path = self.dir.join(&object_name);
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|err| DomainError::Upstream(format!("write upload: {err}")))?;
            tracing::debug!(path = %path.display(), "stored portfolio upload");
            Ok(format!("{}/{}", self.base_url, object_name))
        })
    }
}

fn sanitize(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(sanitize("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize("logo file.png"), "logo_file.png");
        assert_eq!(sanitize(""), "upload");
    }
}
