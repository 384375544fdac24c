//! Aisle ordering
//!
//! Best-effort reordering of a grocery list into the order items are found
//! in a typical store, using a Haiku model. Any failure falls back to the
//! aggregator's order.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grocery::GroceryItem;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_TIMEOUT_SECS: u64 = 20;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that organizes grocery lists in the order \
items would typically be found in a grocery store. Organize items by sections: Produce, Dairy, \
Meat/Seafood, Bakery, Canned Goods, Pasta/Grains, Frozen Foods, Condiments/Sauces, Spices/Baking, \
and Other. Return ONLY a JSON array of the sorted ingredient strings, exactly as given, with no \
additional text or explanation.";

/// Aisle ordering errors
#[derive(Debug, Error)]
pub enum AisleError {
    #[error("ANTHROPIC_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API response contained no text")]
    EmptyResponse,

    #[error("Could not parse sorted list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings read from the environment
#[derive(Debug, Clone)]
pub struct AisleConfig {
    pub api_key: Option<String>,
    /// API root, without the `/v1/messages` path
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl AisleConfig {
    /// `ANTHROPIC_API_KEY`, `PANTRY_AISLE_BASE_URL`, `PANTRY_AISLE_MODEL`,
    /// `PANTRY_AISLE_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let base_url = std::env::var("PANTRY_AISLE_BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("PANTRY_AISLE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("PANTRY_AISLE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_key,
            base_url,
            model,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Something that can put display lines into store order
#[async_trait]
pub trait AisleClient: Send + Sync {
    async fn sort_labels(&self, labels: &[String]) -> Result<Vec<String>, AisleError>;
}

// ============================================================================
// Anthropic client
// ============================================================================

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<RequestMessage>,
}

#[derive(Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Aisle ordering through the Anthropic Messages API
pub struct AnthropicAisleClient {
    http: reqwest::Client,
    messages_url: String,
    api_key: String,
    model: String,
}

impl AnthropicAisleClient {
    pub fn new(config: &AisleConfig) -> Result<Self, AisleError> {
        let api_key = config.api_key.clone().ok_or(AisleError::MissingApiKey)?;
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            messages_url: format!("{}{}", config.base_url.trim_end_matches('/'), MESSAGES_PATH),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl AisleClient for AnthropicAisleClient {
    async fn sort_labels(&self, labels: &[String]) -> Result<Vec<String>, AisleError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: 2048,
            temperature: 0.3,
            system: SYSTEM_PROMPT,
            messages: vec![RequestMessage {
                role: "user",
                content: format!(
                    "Sort this grocery list in the order items would be found in a typical grocery store: {}",
                    serde_json::to_string(labels)?
                ),
            }],
        };

        let response = self
            .http
            .post(&self.messages_url)
            .header("x-api-key", self.api_key.as_str())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AisleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .find_map(|block| block.text)
            .ok_or(AisleError::EmptyResponse)?;

        parse_sorted_labels(&text)
    }
}

// ============================================================================
// Response handling
// ============================================================================

/// Parse a JSON string array, tolerating a Markdown code fence around it
pub fn parse_sorted_labels(text: &str) -> Result<Vec<String>, AisleError> {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        cleaned = rest.strip_suffix("```").unwrap_or(rest).trim();
    }
    if cleaned.is_empty() {
        return Err(AisleError::EmptyResponse);
    }
    Ok(serde_json::from_str(cleaned)?)
}

/// Put items into the order of `sorted_labels`
///
/// Labels are matched to display lines exactly, then case-insensitively.
/// Items the model dropped are appended in their original order. Returns
/// None when fewer than half the items could be matched.
pub fn reorder_by_labels(items: &[GroceryItem], sorted_labels: &[String]) -> Option<Vec<GroceryItem>> {
    if items.is_empty() {
        return Some(Vec::new());
    }

    let lines: Vec<String> = items.iter().map(GroceryItem::display_line).collect();

    // Duplicate lines queue up so each label claims one item
    let mut exact: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut loose: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, line) in lines.iter().enumerate().rev() {
        exact.entry(line.as_str()).or_default().push(i);
        loose.entry(line.trim().to_lowercase()).or_default().push(i);
    }

    let mut taken = vec![false; items.len()];
    let mut ordered = Vec::with_capacity(items.len());

    for label in sorted_labels {
        let candidates = [
            exact.get_mut(label.as_str()),
            loose.get_mut(&label.trim().to_lowercase()),
        ];
        let found = candidates.into_iter().flatten().find_map(|queue| {
            while let Some(i) = queue.pop() {
                if !taken[i] {
                    return Some(i);
                }
            }
            None
        });
        if let Some(i) = found {
            taken[i] = true;
            ordered.push(items[i].clone());
        }
    }

    let matched = ordered.len();
    if matched * 2 < items.len() {
        tracing::warn!("Aisle ordering matched only {} of {} items", matched, items.len());
        return None;
    }

    ordered.extend(
        items
            .iter()
            .zip(&taken)
            .filter(|&(_, &was_taken)| !was_taken)
            .map(|(item, _)| item.clone()),
    );
    Some(ordered)
}

/// Result of a best-effort aisle sort
#[derive(Debug, Clone)]
pub struct AisleOutcome {
    pub items: Vec<GroceryItem>,
    pub aisle_sorted: bool,
    /// Why the original order was kept, when it was
    pub fallback_reason: Option<String>,
}

impl AisleOutcome {
    fn unsorted(items: Vec<GroceryItem>, reason: impl Into<String>) -> Self {
        Self {
            items,
            aisle_sorted: false,
            fallback_reason: Some(reason.into()),
        }
    }
}

/// Reorder items by aisle, keeping the original order on any failure
pub async fn sort_by_aisle(client: Option<&dyn AisleClient>, items: Vec<GroceryItem>) -> AisleOutcome {
    let Some(client) = client else {
        return AisleOutcome::unsorted(items, AisleError::MissingApiKey.to_string());
    };
    if items.len() < 2 {
        return AisleOutcome {
            items,
            aisle_sorted: true,
            fallback_reason: None,
        };
    }

    let labels: Vec<String> = items.iter().map(GroceryItem::display_line).collect();
    match client.sort_labels(&labels).await {
        Ok(sorted) => match reorder_by_labels(&items, &sorted) {
            Some(ordered) => {
                tracing::info!("Sorted {} grocery items by aisle", ordered.len());
                AisleOutcome {
                    items: ordered,
                    aisle_sorted: true,
                    fallback_reason: None,
                }
            }
            None => AisleOutcome::unsorted(items, "sorted list did not match the grocery items"),
        },
        Err(e) => {
            tracing::warn!("Aisle ordering failed, keeping original order: {}", e);
            AisleOutcome::unsorted(items, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grocery::{aggregate, IngredientEntry};

    struct FixedClient(Result<Vec<String>, ()>);

    #[async_trait]
    impl AisleClient for FixedClient {
        async fn sort_labels(&self, _labels: &[String]) -> Result<Vec<String>, AisleError> {
            self.0.clone().map_err(|_| AisleError::EmptyResponse)
        }
    }

    fn sample_items() -> Vec<GroceryItem> {
        aggregate(&[
            IngredientEntry::new("Flour", 2.0, "cup"),
            IngredientEntry::new("Milk", 1.0, "cup"),
            IngredientEntry::new("Apples", 3.0, "each"),
        ])
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_plain_array() {
        let labels = parse_sorted_labels(r#"["a", "b"]"#).unwrap();
        assert_eq!(labels, strings(&["a", "b"]));
    }

    #[test]
    fn test_parse_fenced_array() {
        let labels = parse_sorted_labels("```json\n[\"a\", \"b\"]\n```").unwrap();
        assert_eq!(labels, strings(&["a", "b"]));

        let labels = parse_sorted_labels("```\n[\"c\"]\n```").unwrap();
        assert_eq!(labels, strings(&["c"]));
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(parse_sorted_labels("Here you go!"), Err(AisleError::Parse(_))));
        assert!(matches!(parse_sorted_labels("  "), Err(AisleError::EmptyResponse)));
    }

    #[test]
    fn test_reorder_by_labels() {
        let items = sample_items();
        let sorted = strings(&["3 each Apples", "1 cup milk", "2 cup Flour"]);
        let ordered = reorder_by_labels(&items, &sorted).unwrap();

        let names: Vec<_> = ordered.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["apples", "milk", "flour"]);
    }

    #[test]
    fn test_reorder_appends_dropped_items() {
        let items = sample_items();
        let sorted = strings(&["3 each Apples", "2 cup Flour", "Bananas"]);
        let ordered = reorder_by_labels(&items, &sorted).unwrap();

        let names: Vec<_> = ordered.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["apples", "flour", "milk"]);
    }

    #[test]
    fn test_reorder_rejects_poor_match() {
        let items = sample_items();
        let sorted = strings(&["Produce", "Dairy", "2 cup Flour"]);
        assert!(reorder_by_labels(&items, &sorted).is_none());
    }

    #[test]
    fn test_reorder_handles_duplicate_lines() {
        let salt = IngredientEntry {
            name: "Salt".to_string(),
            unit: "pinch".to_string(),
            ..Default::default()
        };
        let items = aggregate(&[salt.clone(), salt]);
        let ordered = reorder_by_labels(&items, &strings(&["pinch Salt", "pinch Salt"])).unwrap();
        assert_eq!(ordered.len(), 2);
    }

    #[tokio::test]
    async fn test_sort_by_aisle_without_client_keeps_order() {
        let items = sample_items();
        let outcome = sort_by_aisle(None, items.clone()).await;
        assert!(!outcome.aisle_sorted);
        assert_eq!(outcome.items, items);
        assert!(outcome.fallback_reason.is_some());
    }

    #[tokio::test]
    async fn test_sort_by_aisle_falls_back_on_error() {
        let items = sample_items();
        let client = FixedClient(Err(()));
        let outcome = sort_by_aisle(Some(&client as &dyn AisleClient), items.clone()).await;
        assert!(!outcome.aisle_sorted);
        assert_eq!(outcome.items, items);
    }

    #[tokio::test]
    async fn test_sort_by_aisle_uses_client_order() {
        let client = FixedClient(Ok(strings(&["3 each Apples", "1 cup Milk", "2 cup Flour"])));
        let outcome = sort_by_aisle(Some(&client as &dyn AisleClient), sample_items()).await;
        assert!(outcome.aisle_sorted);
        assert_eq!(outcome.items[0].name, "apples");
        assert_eq!(outcome.items.len(), 3);
    }

    mod anthropic {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn client_for(server: &MockServer) -> AnthropicAisleClient {
            let config = AisleConfig {
                api_key: Some("test-key".to_string()),
                base_url: server.uri(),
                model: "test-model".to_string(),
                timeout: Duration::from_secs(5),
            };
            AnthropicAisleClient::new(&config).unwrap()
        }

        #[tokio::test]
        async fn test_sort_labels_reads_text_block() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/messages"))
                .and(header("x-api-key", "test-key"))
                .and(header("anthropic-version", "2023-06-01"))
                .and(body_partial_json(json!({"model": "test-model", "system": SYSTEM_PROMPT})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "content": [
                        {"type": "thinking", "thinking": "produce first"},
                        {"type": "text", "text": "```json\n[\"3 each Apples\", \"2 cup Flour\"]\n```"}
                    ]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let labels = client_for(&server)
                .sort_labels(&strings(&["2 cup Flour", "3 each Apples"]))
                .await
                .unwrap();
            assert_eq!(labels, strings(&["3 each Apples", "2 cup Flour"]));
        }

        #[tokio::test]
        async fn test_sort_labels_reports_error_status() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/messages"))
                .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
                .mount(&server)
                .await;

            let err = client_for(&server)
                .sort_labels(&strings(&["2 cup Flour"]))
                .await
                .unwrap_err();
            match err {
                AisleError::Status { status, body } => {
                    assert_eq!(status, 500);
                    assert_eq!(body, "overloaded");
                }
                other => panic!("expected status error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_sort_labels_without_text_block() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/messages"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "content": [{"type": "tool_use", "id": "t1", "name": "x", "input": {}}]
                })))
                .mount(&server)
                .await;

            let err = client_for(&server)
                .sort_labels(&strings(&["2 cup Flour"]))
                .await
                .unwrap_err();
            assert!(matches!(err, AisleError::EmptyResponse));
        }

        #[tokio::test]
        async fn test_failed_request_falls_back_in_sort_by_aisle() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let client = client_for(&server);
            let items = sample_items();
            let outcome = sort_by_aisle(Some(&client as &dyn AisleClient), items.clone()).await;
            assert!(!outcome.aisle_sorted);
            assert_eq!(outcome.items, items);
            assert!(outcome.fallback_reason.unwrap().contains("500"));
        }

        #[test]
        fn test_client_requires_api_key() {
            let config = AisleConfig {
                api_key: None,
                base_url: DEFAULT_BASE_URL.to_string(),
                model: DEFAULT_MODEL.to_string(),
                timeout: Duration::from_secs(1),
            };
            assert!(matches!(
                AnthropicAisleClient::new(&config),
                Err(AisleError::MissingApiKey)
            ));
        }
    }
}
