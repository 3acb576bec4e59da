use crate::backend::{BackendClient, BackendRequest, DataError, RequestBody};
use http::Method;

/// One bucket of the object store.
pub struct ObjectStore<'a> {
    client: &'a BackendClient,
    bucket: String,
}

impl<'a> ObjectStore<'a> {
    pub(crate) const fn new(client: &'a BackendClient, bucket: String) -> Self {
        Self { client, bucket }
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Write `data` under `key`. Fails with a conflict if the key is taken.
    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), DataError> {
        let url = self.client.endpoint(
            ["storage", "v1", "object", self.bucket.as_str()]
                .into_iter()
                .chain(key.split('/')),
        )?;
        let mut headers = self.client.auth_headers();
        headers.push(("x-upsert".to_string(), "false".to_string()));

        self.client
            .execute(BackendRequest {
                method: Method::POST,
                url,
                headers,
                body: RequestBody::Bytes {
                    content_type: content_type.to_string(),
                    data,
                },
            })
            .await?;
        Ok(())
    }

    /// Public URL of an object. Pure, no request is made.
    pub fn public_url(&self, key: &str) -> Result<String, DataError> {
        let url = self.client.endpoint(
            ["storage", "v1", "object", "public", self.bucket.as_str()]
                .into_iter()
                .chain(key.split('/')),
        )?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::backend::RequestBody;
    use crate::test_support::{FakeTransport, json_response, test_client};
    use serde_json::json;

    #[tokio::test]
    async fn uploads_bytes_under_bucket_key() {
        let transport =
            FakeTransport::new(|_| json_response(200, json!({"Key": "photos/a/b/1.jpg"})));
        let client = test_client(transport.clone());

        client
            .storage("photos")
            .upload("a/b/1.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .expect("upload");

        let request = transport.last_request();
        assert_eq!(request.url.path(), "/storage/v1/object/photos/a/b/1.jpg");
        assert_eq!(request.header("x-upsert"), Some("false"));
        assert_eq!(
            request.body,
            RequestBody::Bytes {
                content_type: "image/jpeg".to_string(),
                data: vec![1, 2, 3]
            }
        );
    }

    #[test]
    fn public_url_is_derived_without_a_request() {
        let transport = FakeTransport::new(|_| json_response(500, json!({})));
        let client = test_client(transport.clone());

        let url = client.storage("photos").public_url("u1/v1/17.png").expect("url");
        assert_eq!(url, "https://backend.test/storage/v1/object/public/photos/u1/v1/17.png");
        assert_eq!(transport.request_count(), 0);
    }
}
