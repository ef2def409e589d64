use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One server-side topic (a named recording session container).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    pub title_id: String,
    pub title_name: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    titles: Vec<Topic>,
}

/// Stored transcripts for one topic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicDetail {
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub translated_text: String,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    #[serde(default)]
    ok: bool,
}

/// Client for the topic HTTP API. Audio streaming never goes through here;
/// this only manages the containers sessions record into.
pub struct TopicsClient {
    http: reqwest::Client,
    base_url: String,
}

impl TopicsClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create a topic. The server assigns the id.
    pub async fn create(&self, title_name: &str) -> Result<Topic> {
        let url = format!("{}/api/new_topic", self.base_url);
        let topic: Topic = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "title_name": title_name }))
            .send()
            .await
            .context("Failed to reach the topic API")?
            .error_for_status()
            .context("Topic creation rejected")?
            .json()
            .await
            .context("Malformed topic response")?;

        info!("Created topic {} ({})", topic.title_name, topic.title_id);
        Ok(topic)
    }

    /// All topics, most recent first as the server returns them.
    pub async fn list(&self) -> Result<Vec<Topic>> {
        let url = format!("{}/api/record_history", self.base_url);
        let history: HistoryResponse = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to reach the topic API")?
            .error_for_status()
            .context("History request rejected")?
            .json()
            .await
            .context("Malformed history response")?;

        Ok(history.titles)
    }

    /// Stored source/target transcripts for one topic.
    pub async fn detail(&self, title_id: &str) -> Result<TopicDetail> {
        let url = format!("{}/api/record_detail", self.base_url);
        let detail: TopicDetail = self
            .http
            .get(&url)
            .query(&[("title_id", title_id)])
            .send()
            .await
            .context("Failed to reach the topic API")?
            .error_for_status()
            .context("Detail request rejected")?
            .json()
            .await
            .context("Malformed detail response")?;

        Ok(detail)
    }

    /// Delete a topic and its transcripts. Returns whether the server
    /// acknowledged the deletion.
    pub async fn delete(&self, title_id: &str) -> Result<bool> {
        let url = format!("{}/api/delete_topic", self.base_url);
        let response: DeleteResponse = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "title_id": title_id }))
            .send()
            .await
            .context("Failed to reach the topic API")?
            .error_for_status()
            .context("Delete request rejected")?
            .json()
            .await
            .context("Malformed delete response")?;

        if response.ok {
            info!("Deleted topic {}", title_id);
        }
        Ok(response.ok)
    }
}
