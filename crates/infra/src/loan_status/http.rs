use std::time::Duration;

use async_trait::async_trait;

use super::{LoanStatusError, LoanStatusSnapshot, LoanStatusSource};

/// `GET {base}/loan/status` against the loan service.
#[derive(Debug, Clone)]
pub struct HttpLoanStatusClient {
    client: reqwest::Client,
    url: String,
}

impl HttpLoanStatusClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LoanStatusError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                LoanStatusError::Unavailable(format!("failed to build http client: {e}"))
            })?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self {
            client,
            url: format!("{}/loan/status", base.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LoanStatusSource for HttpLoanStatusClient {
    async fn loan_status(&self) -> Result<LoanStatusSnapshot, LoanStatusError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LoanStatusError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LoanStatusError::Unavailable(format!(
                "loan service returned {status}: {body}"
            )));
        }

        resp.json::<LoanStatusSnapshot>()
            .await
            .map_err(|e| LoanStatusError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_status_url() {
        let c = HttpLoanStatusClient::with_client(reqwest::Client::new(), "http://loans:3000/");
        assert_eq!(c.url(), "http://loans:3000/loan/status");
    }
}
