//! Mock TrueLayer server for testing
//!
//! Simulates the three endpoints the sync pipeline calls:
//! - POST /connect/token returns { access_token, refresh_token }
//! - GET /data/v1/accounts returns { results: [...] }
//! - GET /data/v1/accounts/{id}/transactions returns { results: [...] }

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Serialize;

/// Access token the mock hands out and accepts
pub const MOCK_ACCESS_TOKEN: &str = "mock_access_token";

/// Mock TrueLayer server for testing
pub struct MockTrueLayerServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<RequestCounts>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Number of requests each endpoint has served
#[derive(Debug, Default)]
pub struct RequestCounts {
    pub token: AtomicUsize,
    pub accounts: AtomicUsize,
    pub transactions: AtomicUsize,
}

/// Configuration for mock responses
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub num_accounts: usize,
    pub num_transactions: usize,
    /// Token endpoint answers 400 invalid_grant
    pub fail_token: bool,
    /// Token endpoint answers 200 without an access token
    pub omit_access_token: bool,
    pub include_refresh_token: bool,
    /// Transactions endpoint answers 403
    pub fail_transactions: bool,
    /// Append one transaction record without a timestamp
    pub malformed_transaction: bool,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_accounts: 2,
            num_transactions: 6,
            fail_token: false,
            omit_access_token: false,
            include_refresh_token: true,
            fail_transactions: false,
            malformed_transaction: false,
            delay_ms: 0,
        }
    }
}

#[derive(Serialize)]
struct Results<T> {
    results: Vec<T>,
}

#[derive(Serialize)]
struct MockAccount {
    account_id: String,
    display_name: String,
    account_type: String,
    currency: String,
}

#[derive(Serialize)]
struct MockTransaction {
    transaction_id: String,
    timestamp: String,
    description: String,
    amount: f64,
    currency: String,
    merchant_name: Option<String>,
}

impl MockTrueLayerServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(RequestCounts::default());

        // Non-blocking so the accept loop can observe shutdown
        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let requests_clone = requests.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let counts = requests_clone.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &counts));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn auth_url(&self) -> String {
        format!("http://127.0.0.1:{}/connect/token", self.port)
    }

    pub fn api_url(&self) -> String {
        format!("http://127.0.0.1:{}/data/v1", self.port)
    }

    pub fn requests(&self) -> &RequestCounts {
        &self.requests
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockTrueLayerServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, counts: &RequestCounts) {
    // Accepted sockets may inherit non-blocking mode from the listener
    let _ = stream.set_nonblocking(false);
    let Some(request) = read_request(&mut stream) else {
        return;
    };

    if config.delay_ms > 0 {
        thread::sleep(std::time::Duration::from_millis(config.delay_ms));
    }

    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"error":"invalid_request"}"#);
        return;
    }
    let (method, path) = (parts[0], parts[1].split('?').next().unwrap_or(parts[1]));

    let authorized = request
        .to_lowercase()
        .contains(&format!("authorization: bearer {}", MOCK_ACCESS_TOKEN));

    match (method, path) {
        ("POST", "/connect/token") => {
            counts.token.fetch_add(1, Ordering::SeqCst);
            if config.fail_token {
                send_response(
                    &mut stream,
                    400,
                    "Bad Request",
                    r#"{"error":"invalid_grant","error_description":"code expired"}"#,
                );
            } else if config.omit_access_token {
                send_response(&mut stream, 200, "OK", r#"{"token_type":"Bearer"}"#);
            } else {
                let body = serde_json::json!({
                    "access_token": MOCK_ACCESS_TOKEN,
                    "expires_in": 3600,
                    "token_type": "Bearer",
                    "refresh_token": config.include_refresh_token.then_some("mock_refresh_token"),
                });
                send_response(&mut stream, 200, "OK", &body.to_string());
            }
        }
        ("GET", _) if !authorized => {
            send_response(&mut stream, 401, "Unauthorized", r#"{"error":"invalid_token"}"#);
        }
        ("GET", "/data/v1/accounts") => {
            counts.accounts.fetch_add(1, Ordering::SeqCst);
            let body = Results {
                results: generate_mock_accounts(config.num_accounts),
            };
            send_json(&mut stream, &body);
        }
        ("GET", p) if p.starts_with("/data/v1/accounts/") && p.ends_with("/transactions") => {
            counts.transactions.fetch_add(1, Ordering::SeqCst);
            if config.fail_transactions {
                send_response(&mut stream, 403, "Forbidden", r#"{"error":"insufficient_scope"}"#);
                return;
            }
            let account_id = p.split('/').nth(4).unwrap_or("acc-1");
            let mut results: Vec<serde_json::Value> =
                generate_mock_transactions(account_id, config.num_transactions)
                    .iter()
                    .filter_map(|tx| serde_json::to_value(tx).ok())
                    .collect();
            if config.malformed_transaction {
                results.push(serde_json::json!({
                    "transaction_id": format!("{}-tx-bad", account_id),
                    "description": "CORRUPTED RECORD",
                    "amount": -1.0,
                    "currency": "GBP"
                }));
            }
            send_json(&mut stream, &Results { results });
        }
        _ => send_response(&mut stream, 404, "Not Found", r#"{"error":"not_found"}"#),
    }
}

/// Read headers plus a Content-Length body so the client never sees a reset
fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.trim()
                        .eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    Some(String::from_utf8_lossy(&data).into_owned())
}

fn send_json<T: Serialize>(stream: &mut TcpStream, body: &T) {
    match serde_json::to_string(body) {
        Ok(json) => send_response(stream, 200, "OK", &json),
        Err(_) => send_response(stream, 500, "Internal Server Error", "{}"),
    }
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

fn generate_mock_accounts(count: usize) -> Vec<MockAccount> {
    (0..count)
        .map(|i| MockAccount {
            account_id: format!("acc-{}", i + 1),
            display_name: format!("Mock Current Account {}", i + 1),
            account_type: "TRANSACTION".to_string(),
            currency: "GBP".to_string(),
        })
        .collect()
}

fn generate_mock_transactions(account_id: &str, count: usize) -> Vec<MockTransaction> {
    let merchants = [
        ("TESCO STORES 3054", Some("Tesco"), -12.50),
        ("TFL TRAVEL CHARGE", Some("TfL"), -7.40),
        ("NETFLIX.COM", Some("Netflix"), -10.99),
        ("SALARY PAYMENT", None, 2500.00),
        ("STARBUCKS LONDON", Some("Starbucks"), -3.85),
        ("MYSTERY VENDOR 42", None, -20.00),
    ];

    (0..count)
        .map(|i| {
            let (description, merchant, amount) = merchants[i % merchants.len()];
            MockTransaction {
                transaction_id: format!("{}-tx-{}", account_id, i + 1),
                timestamp: format!("2024-03-{:02}T10:00:00+00:00", (i % 28) + 1),
                description: description.to_string(),
                amount,
                currency: "GBP".to_string(),
                merchant_name: merchant.map(|m| m.to_string()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbStore;
    use crate::adapters::truelayer::TrueLayerClient;
    use crate::domain::result::Error;
    use crate::ports::TransactionStore;
    use crate::domain::{Credentials, Environment};
    use crate::services::{ItemOutcome, SyncEvent, SyncObserver, SyncState};
    use std::time::Duration;

    fn client_for(server: &MockTrueLayerServer) -> TrueLayerClient {
        TrueLayerClient::new_with_urls(Environment::Sandbox, &server.auth_url(), &server.api_url())
            .unwrap()
    }

    fn credentials() -> Credentials {
        Credentials {
            client_id: "sandbox-client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "https://console.truelayer.com/redirect-page".to_string(),
            authorization_code: "auth-code".to_string(),
            environment: Environment::Sandbox,
        }
    }

    #[test]
    fn test_exchange_code() {
        let server = MockTrueLayerServer::start(MockConfig::default()).unwrap();
        let tokens = client_for(&server).exchange_code(&credentials()).unwrap();

        assert_eq!(tokens.access_token, MOCK_ACCESS_TOKEN);
        assert_eq!(tokens.refresh_token.as_deref(), Some("mock_refresh_token"));
        assert_eq!(server.requests().token.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exchange_code_without_refresh_token() {
        let server = MockTrueLayerServer::start(MockConfig {
            include_refresh_token: false,
            ..Default::default()
        })
        .unwrap();
        let tokens = client_for(&server).exchange_code(&credentials()).unwrap();
        assert!(tokens.refresh_token.is_none());
    }

    #[test]
    fn test_exchange_code_rejected() {
        let server = MockTrueLayerServer::start(MockConfig {
            fail_token: true,
            ..Default::default()
        })
        .unwrap();
        let err = client_for(&server).exchange_code(&credentials()).unwrap_err();

        assert!(matches!(err, Error::Auth { .. }));
        assert!(err.to_string().contains("HTTP 400"));
        assert!(err.to_string().contains("invalid_grant"));
        assert!(err.hints().iter().any(|h| h.contains("10 minutes")));
    }

    #[test]
    fn test_exchange_code_missing_access_token() {
        let server = MockTrueLayerServer::start(MockConfig {
            omit_access_token: true,
            ..Default::default()
        })
        .unwrap();
        let err = client_for(&server).exchange_code(&credentials()).unwrap_err();

        assert!(matches!(err, Error::Auth { .. }));
        assert!(err.to_string().contains("No access token"));
    }

    #[test]
    fn test_accounts_and_transactions() {
        let server = MockTrueLayerServer::start(MockConfig {
            num_accounts: 3,
            num_transactions: 4,
            ..Default::default()
        })
        .unwrap();
        let client = client_for(&server);

        let accounts = client.get_accounts(MOCK_ACCESS_TOKEN).unwrap();
        assert_eq!(accounts.len(), 3);
        assert_eq!(accounts[0].account_id, "acc-1");

        let txs = client.get_transactions(MOCK_ACCESS_TOKEN, "acc-1").unwrap();
        assert_eq!(txs.len(), 4);
        let first = txs[0].parse().unwrap();
        assert_eq!(first.transaction_id, "acc-1-tx-1");
        assert_eq!(first.date(), "2024-03-01");
    }

    #[test]
    fn test_malformed_record_does_not_fail_the_page() {
        let server = MockTrueLayerServer::start(MockConfig {
            num_transactions: 2,
            malformed_transaction: true,
            ..Default::default()
        })
        .unwrap();
        let txs = client_for(&server)
            .get_transactions(MOCK_ACCESS_TOKEN, "acc-1")
            .unwrap();

        assert_eq!(txs.len(), 3);
        assert!(txs[0].parse().is_ok());
        assert!(txs[1].parse().is_ok());
        assert_eq!(txs[2].id(), Some("acc-1-tx-bad"));
        assert!(matches!(txs[2].parse(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_slow_server_times_out_as_transient() {
        let server = MockTrueLayerServer::start(MockConfig {
            delay_ms: 1500,
            ..Default::default()
        })
        .unwrap();
        let client = TrueLayerClient::new_with_timeout(
            Environment::Sandbox,
            &server.auth_url(),
            &server.api_url(),
            Duration::from_millis(200),
        )
        .unwrap();

        let err = client.exchange_code(&credentials()).unwrap_err();
        assert!(matches!(err, Error::Transient(_)));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_accounts_with_bad_token() {
        let server = MockTrueLayerServer::start(MockConfig::default()).unwrap();
        let err = client_for(&server).get_accounts("wrong").unwrap_err();

        assert!(matches!(err, Error::Auth { .. }));
        assert!(err.to_string().contains("HTTP 401"));
        assert!(err.hints().iter().any(|h| h.contains("SANDBOX")));
    }

    #[test]
    fn test_transactions_scope_failure() {
        let server = MockTrueLayerServer::start(MockConfig {
            fail_transactions: true,
            ..Default::default()
        })
        .unwrap();
        let err = client_for(&server)
            .get_transactions(MOCK_ACCESS_TOKEN, "acc-1")
            .unwrap_err();

        assert!(matches!(err, Error::Auth { .. }));
        assert!(err.hints().iter().any(|h| h.contains("'transactions' scope")));
    }

    #[test]
    fn test_connection_refused_is_transient() {
        let mut server = MockTrueLayerServer::start(MockConfig::default()).unwrap();
        let client = client_for(&server);
        server.stop();
        drop(server);

        let err = client.get_accounts(MOCK_ACCESS_TOKEN).unwrap_err();
        assert!(matches!(err, Error::Transient(_)));
    }

    // Whole pipeline against the mock server and a real local store

    fn pipeline(server: &MockTrueLayerServer) -> (crate::services::SyncService, Arc<DuckDbStore>) {
        let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
        let service = crate::services::SyncService::with_provider(
            Arc::new(client_for(server)),
            Arc::new(crate::services::RuleCategorizer::new()),
            store.clone(),
        );
        (service, store)
    }

    #[test]
    fn test_pipeline_syncs_first_account() {
        let server = MockTrueLayerServer::start(MockConfig::default()).unwrap();
        let (service, store) = pipeline(&server);

        let report = service
            .sync(&credentials(), false, &mut crate::services::NoopObserver)
            .unwrap();

        assert_eq!(report.summary_line(), "synced 6/6");
        assert_eq!(report.accounts_found, 2);
        assert_eq!(report.refresh_token.as_deref(), Some("mock_refresh_token"));
        assert_eq!(server.requests().transactions.load(Ordering::SeqCst), 1);

        let tesco = store.get_transaction("acc-1-tx-1").unwrap().unwrap();
        assert_eq!(tesco.category, "Groceries");
        assert_eq!(tesco.amount.to_string(), "12.5");
        assert_eq!(tesco.merchant_name, "Tesco");
        assert_eq!(tesco.date, "2024-03-01");

        let salary = store.get_transaction("acc-1-tx-4").unwrap().unwrap();
        assert_eq!(salary.category, "Income");
        assert!(salary.is_income);

        let mystery = store.get_transaction("acc-1-tx-6").unwrap().unwrap();
        assert_eq!(mystery.category, "Unclear");
    }

    #[test]
    fn test_pipeline_rerun_is_idempotent() {
        let server = MockTrueLayerServer::start(MockConfig::default()).unwrap();
        let (service, store) = pipeline(&server);

        service
            .sync(&credentials(), false, &mut crate::services::NoopObserver)
            .unwrap();
        let first = store.list_transactions().unwrap();
        service
            .sync(&credentials(), false, &mut crate::services::NoopObserver)
            .unwrap();

        assert_eq!(store.count().unwrap(), 6);
        assert_eq!(store.list_transactions().unwrap(), first);
    }

    #[test]
    fn test_pipeline_token_failure_stops_early() {
        let server = MockTrueLayerServer::start(MockConfig {
            fail_token: true,
            ..MockConfig::default()
        })
        .unwrap();
        let (service, store) = pipeline(&server);

        let err = service
            .sync(&credentials(), false, &mut crate::services::NoopObserver)
            .unwrap_err();

        assert!(matches!(err, Error::Auth { .. }));
        assert_eq!(server.requests().accounts.load(Ordering::SeqCst), 0);
        assert_eq!(server.requests().transactions.load(Ordering::SeqCst), 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[derive(Default)]
    struct FailedStates(Vec<SyncState>);

    impl SyncObserver for FailedStates {
        fn notify(&mut self, event: SyncEvent<'_>) {
            if let SyncEvent::Failed { state, .. } = event {
                self.0.push(state);
            }
        }
    }

    #[test]
    fn test_pipeline_timeout_aborts_before_accounts() {
        let server = MockTrueLayerServer::start(MockConfig {
            delay_ms: 1500,
            ..MockConfig::default()
        })
        .unwrap();
        let store = Arc::new(DuckDbStore::open_in_memory().unwrap());
        let client = TrueLayerClient::new_with_timeout(
            Environment::Sandbox,
            &server.auth_url(),
            &server.api_url(),
            Duration::from_millis(200),
        )
        .unwrap();
        let service = crate::services::SyncService::with_provider(
            Arc::new(client),
            Arc::new(crate::services::RuleCategorizer::new()),
            store.clone(),
        );
        let mut failed = FailedStates::default();

        let err = service.sync(&credentials(), false, &mut failed).unwrap_err();

        assert!(matches!(err, Error::Transient(_)));
        assert_eq!(failed.0, vec![SyncState::NetworkFailed]);
        assert_eq!(server.requests().accounts.load(Ordering::SeqCst), 0);
        assert_eq!(server.requests().transactions.load(Ordering::SeqCst), 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_pipeline_skips_only_the_malformed_record() {
        let server = MockTrueLayerServer::start(MockConfig {
            malformed_transaction: true,
            ..MockConfig::default()
        })
        .unwrap();
        let (service, store) = pipeline(&server);

        let report = service
            .sync(&credentials(), false, &mut crate::services::NoopObserver)
            .unwrap();

        assert_eq!(report.summary_line(), "synced 6/7");
        assert_eq!(report.failed, 1);
        let bad = &report.items[6];
        assert_eq!(bad.transaction_id, "acc-1-tx-bad");
        assert!(matches!(&bad.outcome, ItemOutcome::Failed(e) if e.contains("timestamp")));
        assert_eq!(store.count().unwrap(), 6);
        assert!(store.get_transaction("acc-1-tx-bad").unwrap().is_none());
    }

    #[test]
    fn test_pipeline_without_accounts() {
        let server = MockTrueLayerServer::start(MockConfig {
            num_accounts: 0,
            ..MockConfig::default()
        })
        .unwrap();
        let (service, _store) = pipeline(&server);

        let report = service
            .sync(&credentials(), false, &mut crate::services::NoopObserver)
            .unwrap();

        assert_eq!(report.outcome, crate::services::SyncOutcome::NoAccounts);
        assert_eq!(server.requests().transactions.load(Ordering::SeqCst), 0);
    }
}
