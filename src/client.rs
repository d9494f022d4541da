//! A blocking HTTP client wrapper for driving the REST API.
//!
//! Used by the `remote` binary to talk to a running server. Session cookies
//! are kept in a cookie jar and can be exported/restored as a header string
//! so a session survives between invocations.

use std::sync::Arc;

use reqwest::{
    Url,
    blocking::{Client, Response},
    cookie::{CookieStore, Jar},
};
use serde::Serialize;
use serde_json::json;
use time::Date;

use crate::{Error, category::TransactionType, endpoints, transaction::Transaction};

/// The fields sent to create a transaction through the API.
#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    /// The amount of money spent or earned. Must be positive.
    pub amount: f64,
    /// Whether the transaction is income or spending.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// A category from the set for `transaction_type`.
    pub category: String,
    /// A free-text description. May be empty.
    pub description: String,
    /// The transaction date. `None` lets the server default to today.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Date>,
}

/// A blocking client for the REST API holding the session cookie jar.
pub struct ApiClient {
    base_url: Url,
    jar: Arc<Jar>,
    http: Client,
}

impl ApiClient {
    /// Create a client for the server at `base_url`, e.g.
    /// "http://127.0.0.1:3000".
    ///
    /// # Errors
    /// Returns [Error::Http] if `base_url` is not a valid URL or the client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)
            .map_err(|error| Error::Http(format!("invalid base URL \"{base_url}\": {error}")))?;
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(jar.clone())
            .build()
            .map_err(|error| Error::Http(error.to_string()))?;

        Ok(Self {
            base_url,
            jar,
            http,
        })
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path)
            .map_err(|error| Error::Http(format!("invalid endpoint path \"{path}\": {error}")))
    }

    /// Map an HTTP response to an error unless it is a success.
    ///
    /// A 401 becomes [Error::InvalidCredentials] so callers can offer to log
    /// in again. Everything else non-2xx becomes [Error::Http].
    fn check(response: Response) -> Result<Response, Error> {
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::InvalidCredentials);
        }

        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .ok()
                .and_then(|body| body["error"].as_str().map(str::to_string))
                .unwrap_or_else(|| status.to_string());

            return Err(Error::Http(message));
        }

        Ok(response)
    }

    /// Log in with `email` and `password`, storing the session cookies on
    /// success. Returns `false` when the credentials are rejected.
    ///
    /// # Errors
    /// Returns [Error::Http] if the request fails or the server reports an
    /// unexpected error.
    pub fn log_in(&self, email: &str, password: &str) -> Result<bool, Error> {
        let response = self
            .http
            .post(self.url(endpoints::LOG_IN_API)?)
            .json(&json!({"email": email, "password": password}))
            .send()
            .map_err(|error| Error::Http(error.to_string()))?;

        match Self::check(response) {
            Ok(_) => Ok(true),
            Err(Error::InvalidCredentials) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Log out, invalidating the session on the server and clearing the
    /// local cookies.
    ///
    /// # Errors
    /// Returns [Error::Http] if the request fails.
    pub fn log_out(&self) -> Result<(), Error> {
        let response = self
            .http
            .get(self.url(endpoints::LOG_OUT)?)
            .send()
            .map_err(|error| Error::Http(error.to_string()))?;
        Self::check(response)?;

        Ok(())
    }

    /// Whether the stored session cookies are accepted by the server.
    ///
    /// # Errors
    /// Returns [Error::Http] if the request fails.
    pub fn is_authenticated(&self) -> Result<bool, Error> {
        let response = self
            .http
            .get(self.url(endpoints::TRANSACTIONS_API)?)
            .query(&[("limit", 1)])
            .send()
            .map_err(|error| Error::Http(error.to_string()))?;

        match Self::check(response) {
            Ok(_) => Ok(true),
            Err(Error::InvalidCredentials) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Fetch one page of the logged in user's transactions, newest first.
    ///
    /// # Errors
    /// Returns [Error::InvalidCredentials] if the session is missing or
    /// expired, or [Error::Http] if the request fails.
    pub fn list_transactions(&self, limit: u64, offset: u64) -> Result<Vec<Transaction>, Error> {
        let response = self
            .http
            .get(self.url(endpoints::TRANSACTIONS_API)?)
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .map_err(|error| Error::Http(error.to_string()))?;

        Self::check(response)?
            .json()
            .map_err(|error| Error::Http(error.to_string()))
    }

    /// Fetch all of the logged in user's transactions by paging until a
    /// short page is returned.
    ///
    /// # Errors
    /// Returns [Error::InvalidCredentials] if the session is missing or
    /// expired, or [Error::Http] if a request fails.
    pub fn list_all_transactions(&self, page_size: u64) -> Result<Vec<Transaction>, Error> {
        let mut transactions = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.list_transactions(page_size, offset)?;
            let page_length = page.len() as u64;
            transactions.extend(page);

            if page_length < page_size {
                return Ok(transactions);
            }

            offset += page_size;
        }
    }

    /// Create a transaction and return the stored row.
    ///
    /// # Errors
    /// Returns [Error::InvalidCredentials] if the session is missing or
    /// expired, or [Error::Http] if the request fails or validation is
    /// rejected.
    pub fn create_transaction(&self, transaction: &NewTransaction) -> Result<Transaction, Error> {
        let response = self
            .http
            .post(self.url(endpoints::TRANSACTIONS_API)?)
            .json(transaction)
            .send()
            .map_err(|error| Error::Http(error.to_string()))?;

        Self::check(response)?
            .json()
            .map_err(|error| Error::Http(error.to_string()))
    }

    /// Fetch the statistics report, optionally selecting the category
    /// breakdown month as "YYYY-MM".
    ///
    /// # Errors
    /// Returns [Error::InvalidCredentials] if the session is missing or
    /// expired, or [Error::Http] if the request fails.
    pub fn stats(&self, month: Option<&str>) -> Result<serde_json::Value, Error> {
        let mut request = self.http.get(self.url(endpoints::STATS)?);
        if let Some(month) = month {
            request = request.query(&[("month", month)]);
        }

        let response = request
            .send()
            .map_err(|error| Error::Http(error.to_string()))?;

        Self::check(response)?
            .json()
            .map_err(|error| Error::Http(error.to_string()))
    }

    /// The session cookies as a "name=value; name=value" header string, or
    /// `None` when no session is stored.
    pub fn session_cookies(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|header| header.to_str().map(str::to_string).ok())
    }

    /// Restore session cookies previously exported with
    /// [ApiClient::session_cookies].
    pub fn restore_session_cookies(&self, cookie_header: &str) {
        for cookie in cookie_header.split("; ") {
            if !cookie.trim().is_empty() {
                self.jar.add_cookie_str(cookie, &self.base_url);
            }
        }
    }
}

#[cfg(test)]
mod client_tests {
    use super::ApiClient;

    #[test]
    fn rejects_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn session_cookies_round_trip_through_the_jar() {
        let client = ApiClient::new("http://127.0.0.1:3000").unwrap();
        assert_eq!(client.session_cookies(), None);

        client.restore_session_cookies("user_id=abc123; expiry=def456");

        let cookies = client.session_cookies().unwrap();
        assert!(cookies.contains("user_id=abc123"));
        assert!(cookies.contains("expiry=def456"));
    }

    #[test]
    fn url_joins_endpoint_paths() {
        let client = ApiClient::new("http://127.0.0.1:3000").unwrap();

        let url = client.url("/api/transactions").unwrap();

        assert_eq!(url.as_str(), "http://127.0.0.1:3000/api/transactions");
    }
}
