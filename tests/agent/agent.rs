use async_trait::async_trait;
use chrono::NaiveDate;
use marketdigest::agent::prompt::{Source, ECB_MARKET_URL, SYSTEM_PROMPT};
use marketdigest::agent::{CompletionProvider, CompletionRequest, DigestAgent};
use std::sync::Mutex;

#[derive(Default)]
struct StubProvider {
    reply: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, anyhow::Error> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.clone())
    }
}

struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, anyhow::Error> {
        Err(anyhow::anyhow!("provider unavailable"))
    }
}

#[tokio::test]
async fn generate_sends_both_prompts_and_returns_text() {
    let provider = StubProvider {
        reply: "## Головні події\n- Ринок зріс\n\n".to_string(),
        ..StubProvider::default()
    };
    let agent = DigestAgent::new(provider, Vec::new(), true);
    let date = NaiveDate::from_ymd_opt(2025, 10, 20).expect("valid date");

    let text = agent.generate(date).await.expect("generate failed");

    assert_eq!(text, "## Головні події\n- Ринок зріс");
    let requests = agent.provider().requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(*request, agent.request_for(date));
    assert_eq!(request.system, SYSTEM_PROMPT);
    assert!(request.user.contains(ECB_MARKET_URL));
    assert!(request.web_search);
}

#[tokio::test]
async fn generate_passes_extra_sources_and_web_search_flag() {
    let provider = StubProvider::default();
    let extra = vec![Source::new("Fed", "https://www.federalreserve.gov")];
    let agent = DigestAgent::new(provider, extra, false);
    let date = NaiveDate::from_ymd_opt(2025, 11, 3).expect("valid date");

    let text = agent.generate(date).await.expect("generate failed");

    assert!(text.is_empty());
    let request = agent.provider().requests.lock().unwrap()[0].clone();
    assert!(!request.web_search);
    assert!(request.user.contains("- Fed: https://www.federalreserve.gov"));
    assert!(!request.user.contains(ECB_MARKET_URL));
}

#[tokio::test]
async fn generate_propagates_provider_errors() {
    let agent = DigestAgent::new(FailingProvider, Vec::new(), true);
    let date = NaiveDate::from_ymd_opt(2025, 11, 3).expect("valid date");

    let err = agent.generate(date).await.expect_err("Expected failure");

    assert!(err.to_string().contains("provider unavailable"));
}
