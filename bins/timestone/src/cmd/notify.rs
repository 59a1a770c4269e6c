use serde::Serialize;

#[derive(Serialize)]
struct Message<'a> {
    text: &'a str,
}

/// Posts short summaries to a chat webhook. Failures are logged only.
pub struct Notifier {
    http: reqwest::Client,
    url: Option<String>,
}

impl Notifier {
    pub fn new(url: Option<&str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.map(str::to_string),
        }
    }

    pub async fn send(&self, text: &str) {
        let Some(url) = &self.url else {
            return;
        };
        let body = match serde_json::to_vec(&Message { text }) {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "notification not encoded");
                return;
            }
        };

        let result = self
            .http
            .post(url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        match result {
            Ok(_) => tracing::debug!("notification sent"),
            Err(e) => tracing::warn!(error = %e, "notification failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_shape() {
        let body = serde_json::to_string(&Message { text: "staged 3 files" }).unwrap();
        assert_eq!(body, r#"{"text":"staged 3 files"}"#);
    }

    #[tokio::test]
    async fn test_without_url_is_noop() {
        Notifier::new(None).send("ignored").await;
    }
}
