use std::time::Duration;

use async_trait::async_trait;

use super::SupabaseClient;
use super::rows::{SignRequest, SignedUrlResponse};
use crate::repository::{ObjectStore, StorageError};

/// Percent-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.endpoint(&format!(
            "storage/v1/object/public/{bucket}/{}",
            encode_path(path)
        ))
    }

    async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let url = self.endpoint(&format!("storage/v1/object/sign/{bucket}/{}", encode_path(path)));
        let response: SignedUrlResponse = self
            .send_json(self.http.post(url).json(&SignRequest {
                expires_in: expires_in.as_secs(),
            }))
            .await?;
        // The signed path is relative to the storage API root.
        Ok(self.endpoint(&format!(
            "storage/v1/{}",
            response.signed_url.trim_start_matches('/')
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::SupabaseConfig;

    #[test]
    fn public_url_encodes_segments() {
        let client = SupabaseClient::new(SupabaseConfig::new("https://abc.supabase.co", "anon"));
        assert_eq!(
            client.public_url("lectures", "law/week 1.pdf"),
            "https://abc.supabase.co/storage/v1/object/public/lectures/law/week%201.pdf"
        );
    }
}
