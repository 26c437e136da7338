//! Listings service client: login, grid fetch, directory refresh.
//!
//! Every refresh logs in afresh; the session token is used for exactly one
//! grid fetch and then dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::directory::{ChannelDirectory, DirectoryHandle};
use super::grid::Grid;
use super::{ListingsError, Result};

/// Default listings service root.
pub const DEFAULT_BASE_URL: &str = "https://tvlistings.zap2it.com/";
pub const LOGIN_PATH: &str = "api/user/login";
pub const GRID_PATH: &str = "api/grid";

/// Timeout for each listings HTTP call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

// Login response property keys.
const PROP_ZIP: &str = "2002";
const PROP_COUNTRY: &str = "2003";
const PROP_LINEUP: &str = "2004";

/// Device code sent with token-based grid requests.
const GRID_DEVICE: &str = "X";

// ---------------------------------------------------------------------------
// HTTP seam
// ---------------------------------------------------------------------------

/// Minimal request/response HTTP collaborator.
pub trait HttpClient: Send + Sync {
    /// POST `body` as JSON and return the response body.
    fn post_json(&self, url: &str, body: &Value) -> Result<String>;

    /// GET with query parameters and extra headers, returning the body.
    fn get(&self, url: &str, query: &[(String, String)], headers: &[(&str, &str)]) -> Result<String>;
}

/// Blocking HTTP over `ureq`.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(HTTP_TIMEOUT)
            .timeout_read(HTTP_TIMEOUT)
            .timeout_write(HTTP_TIMEOUT)
            .build();
        Self { agent }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for UreqClient {
    fn post_json(&self, url: &str, body: &Value) -> Result<String> {
        let resp = self
            .agent
            .post(url)
            .set("content-type", "application/json")
            .send_string(&body.to_string());
        read_body(url, resp)
    }

    fn get(&self, url: &str, query: &[(String, String)], headers: &[(&str, &str)]) -> Result<String> {
        let mut req = self.agent.get(url);
        for (k, v) in query {
            req = req.query(k, v);
        }
        for (k, v) in headers {
            req = req.set(k, v);
        }
        read_body(url, req.call())
    }
}

/// Body of any response, whatever its status.
///
/// The service reports bad credentials and bad grid requests in the body, so
/// an error status is handed to the body parsers instead of becoming
/// [`ListingsError::Http`]. Only transport failures map to `Http`.
fn read_body(url: &str, result: std::result::Result<ureq::Response, ureq::Error>) -> Result<String> {
    let resp = match result {
        Ok(resp) => resp,
        Err(ureq::Error::Status(code, resp)) => {
            debug!(%url, code, "listings service returned an error status");
            resp
        }
        Err(ureq::Error::Transport(e)) => return Err(ListingsError::Http(format!("{url}: {e}"))),
    };
    resp.into_string().map_err(|e| ListingsError::Http(format!("{url}: {e}")))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Listings account credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of a successful login. Scoped to a single refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingsSession {
    pub token: String,
    pub postal_code: String,
    pub country: String,
    pub lineup_id: String,
    pub device: String,
}

impl ListingsSession {
    /// Postal codes starting with a letter are Canadian.
    pub fn uses_postal_code_lookup(&self) -> bool {
        self.postal_code.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
    }
}

#[derive(Debug, Deserialize)]
struct LoginWire {
    token: Option<String>,
    #[serde(default)]
    properties: HashMap<String, Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Listings service client.
pub struct ListingsClient<H = UreqClient> {
    http: H,
    credentials: Credentials,
    base_url: String,
}

impl ListingsClient<UreqClient> {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_http(UreqClient::new(), credentials)
    }
}

impl<H: HttpClient> ListingsClient<H> {
    pub fn with_http(http: H, credentials: Credentials) -> Self {
        Self { http, credentials, base_url: DEFAULT_BASE_URL.to_owned() }
    }

    /// Override the service root (a trailing `/` is added if missing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.base_url = url;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    /// Log in and read the account's region and lineup.
    pub fn login(&self) -> Result<ListingsSession> {
        let url = format!("{}{LOGIN_PATH}", self.base_url);
        let body = json!({
            "emailid": self.credentials.username,
            "password": self.credentials.password,
            "usertype": "0",
            "facebookuser": "false",
        });
        let text = self.http.post_json(&url, &body)?;
        let session = parse_login(&text)?;
        debug!(postal_code = %session.postal_code, lineup = %session.lineup_id, "listings login ok");
        Ok(session)
    }

    /// Query parameters for a one-hour grid starting at `now`.
    pub fn grid_params(&self, session: &ListingsSession, now: DateTime<Utc>) -> Result<Vec<(String, String)>> {
        // Postal-code lineups need a lineup/device split the account
        // properties do not provide.
        if session.uses_postal_code_lookup() {
            return Err(ListingsError::UnsupportedRegion { postal_code: session.postal_code.clone() });
        }

        let params = [
            ("time", now.timestamp().to_string()),
            ("timespan", "1".to_owned()),
            ("pref", "-".to_owned()),
            ("token", session.token.clone()),
            ("lineupId", format!("{}-{}-DEFAULT", session.country, session.lineup_id)),
            ("headendId", session.lineup_id.clone()),
            ("device", GRID_DEVICE.to_owned()),
            ("postalCode", session.postal_code.clone()),
            ("country", session.country.clone()),
            ("aid", "gapzap".to_owned()),
            ("TMSID", String::new()),
            ("FromPage", "TV Grid".to_owned()),
            ("ActivityID", "1".to_owned()),
            ("OVDID", String::new()),
            ("isOverride", "true".to_owned()),
        ];
        Ok(params.into_iter().map(|(k, v)| (k.to_owned(), v)).collect())
    }

    /// Fetch the one-hour grid for an authenticated session.
    pub fn fetch_grid(&self, session: &ListingsSession, now: DateTime<Utc>) -> Result<Grid> {
        let url = format!("{}{GRID_PATH}", self.base_url);
        let params = self.grid_params(session, now)?;
        let text = self.http.get(&url, &params, &[("X-Requested-With", "XMLHttpRequest")])?;
        Grid::parse(&text)
    }

    /// Log in, fetch the grid, and build a directory as of `now`.
    pub fn fetch_directory(&self, now: DateTime<Utc>) -> Result<ChannelDirectory> {
        let session = self.login()?;
        let grid = self.fetch_grid(&session, now)?;
        Ok(grid.to_directory(now))
    }

    /// Rebuild the directory and publish it to `handle`.
    ///
    /// On any error the handle keeps its previous directory.
    pub fn refresh(&self, handle: &DirectoryHandle) -> Result<Arc<ChannelDirectory>> {
        let directory = self.fetch_directory(Utc::now())?;
        info!(
            channels = directory.len(),
            titles = directory.titles().len(),
            "program guide refreshed"
        );
        handle.publish(directory);
        Ok(handle.load())
    }
}

fn parse_login(text: &str) -> Result<ListingsSession> {
    let wire: LoginWire = serde_json::from_str(text).map_err(|e| ListingsError::Authentication {
        message: format!("login response is not valid JSON: {e}"),
    })?;
    let Some(token) = wire.token.filter(|t| !t.is_empty()) else {
        return Err(ListingsError::Authentication { message: "login response has no token".into() });
    };

    let postal_code = property(&wire.properties, PROP_ZIP)?;
    let country = property(&wire.properties, PROP_COUNTRY)?;
    let lineup = property(&wire.properties, PROP_LINEUP)?;
    let Some((lineup_id, device)) = lineup.split_once(':') else {
        return Err(ListingsError::Authentication {
            message: format!("lineup property {lineup:?} is not <lineup>:<device>"),
        });
    };

    Ok(ListingsSession {
        token,
        postal_code,
        country,
        lineup_id: lineup_id.to_owned(),
        device: device.to_owned(),
    })
}

fn property(props: &HashMap<String, Value>, key: &str) -> Result<String> {
    match props.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ListingsError::Authentication {
            message: format!("login response is missing property {key}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::protocol::Channel;

    pub(crate) const LOGIN_OK: &str = r#"{
        "token": "tok-123",
        "properties": { "2002": "10001", "2003": "USA", "2004": "NY31519:X" }
    }"#;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Post { url: String, body: Value },
        Get { url: String, query: Vec<(String, String)>, headers: Vec<(String, String)> },
    }

    /// Canned HTTP: returns `login` for every POST and `grid` for every GET.
    pub(crate) struct FakeHttp {
        pub login: Result<String>,
        pub grid: Result<String>,
        pub calls: Mutex<Vec<Call>>,
    }

    impl FakeHttp {
        pub(crate) fn new(login: &str, grid: &str) -> Self {
            Self { login: Ok(login.to_owned()), grid: Ok(grid.to_owned()), calls: Mutex::new(Vec::new()) }
        }

        fn clone_result(r: &Result<String>) -> Result<String> {
            match r {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(ListingsError::Http(e.to_string())),
            }
        }
    }

    impl HttpClient for FakeHttp {
        fn post_json(&self, url: &str, body: &Value) -> Result<String> {
            self.calls.lock().unwrap().push(Call::Post { url: url.to_owned(), body: body.clone() });
            Self::clone_result(&self.login)
        }

        fn get(&self, url: &str, query: &[(String, String)], headers: &[(&str, &str)]) -> Result<String> {
            self.calls.lock().unwrap().push(Call::Get {
                url: url.to_owned(),
                query: query.to_vec(),
                headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            });
            Self::clone_result(&self.grid)
        }
    }

    /// Grid with one channel airing "now" and one already finished.
    pub(crate) fn live_grid() -> String {
        let now = Utc::now();
        let fmt = |t: DateTime<Utc>| t.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        json!({
            "channels": [
                { "channelNo": "612", "callSign": "WXYZ", "events": [
                    { "startTime": fmt(now - chrono::Duration::minutes(10)),
                      "endTime": fmt(now + chrono::Duration::minutes(20)),
                      "program": { "title": "Evening News" } } ] },
                { "channelNo": "7", "callSign": "KABC", "events": [
                    { "startTime": fmt(now - chrono::Duration::hours(2)),
                      "endTime": fmt(now - chrono::Duration::hours(1)),
                      "program": { "title": "Old Show" } } ] }
            ]
        })
        .to_string()
    }

    fn client(http: FakeHttp) -> ListingsClient<FakeHttp> {
        ListingsClient::with_http(http, Credentials::new("me@example.com", "hunter2"))
    }

    #[test]
    fn login_posts_credentials() {
        let c = client(FakeHttp::new(LOGIN_OK, "{}"));
        let session = c.login().unwrap();

        assert_eq!(session.token, "tok-123");
        assert_eq!(session.postal_code, "10001");
        assert_eq!(session.country, "USA");
        assert_eq!(session.lineup_id, "NY31519");
        assert_eq!(session.device, "X");

        let calls = c.http.calls.lock().unwrap();
        let Call::Post { url, body } = &calls[0] else { panic!("expected POST") };
        assert_eq!(url, "https://tvlistings.zap2it.com/api/user/login");
        assert_eq!(body["emailid"], "me@example.com");
        assert_eq!(body["password"], "hunter2");
        assert_eq!(body["usertype"], "0");
        assert_eq!(body["facebookuser"], "false");
    }

    #[test]
    fn login_without_token_is_auth_error() {
        let c = client(FakeHttp::new(r#"{"properties": {}}"#, "{}"));
        assert!(matches!(c.login(), Err(ListingsError::Authentication { .. })));
    }

    #[test]
    fn login_non_json_is_auth_error() {
        let c = client(FakeHttp::new("Forbidden", "{}"));
        assert!(matches!(c.login(), Err(ListingsError::Authentication { .. })));
    }

    #[test]
    fn login_missing_property_is_auth_error() {
        let body = r#"{"token": "t", "properties": {"2002": "10001", "2003": "USA"}}"#;
        let err = client(FakeHttp::new(body, "{}")).login().unwrap_err();
        assert!(err.to_string().contains("2004"), "{err}");
    }

    #[test]
    fn login_lineup_without_device_is_auth_error() {
        let body = r#"{"token": "t", "properties": {"2002": "10001", "2003": "USA", "2004": "NY31519"}}"#;
        assert!(matches!(
            client(FakeHttp::new(body, "{}")).login(),
            Err(ListingsError::Authentication { .. })
        ));
    }

    #[test]
    fn grid_params_token_branch() {
        let c = client(FakeHttp::new(LOGIN_OK, "{}"));
        let session = c.login().unwrap();
        let now = DateTime::from_timestamp(1_714_586_400, 0).unwrap();
        let params: HashMap<_, _> = c.grid_params(&session, now).unwrap().into_iter().collect();

        assert_eq!(params["time"], "1714586400");
        assert_eq!(params["timespan"], "1");
        assert_eq!(params["pref"], "-");
        assert_eq!(params["token"], "tok-123");
        assert_eq!(params["lineupId"], "USA-NY31519-DEFAULT");
        assert_eq!(params["headendId"], "NY31519");
        assert_eq!(params["device"], "X");
        assert_eq!(params["postalCode"], "10001");
        assert_eq!(params["country"], "USA");
        assert_eq!(params["aid"], "gapzap");
        assert_eq!(params["TMSID"], "");
        assert_eq!(params["FromPage"], "TV Grid");
        assert_eq!(params["ActivityID"], "1");
        assert_eq!(params["OVDID"], "");
        assert_eq!(params["isOverride"], "true");
    }

    #[test]
    fn postal_code_branch_is_unsupported() {
        let body = r#"{"token": "t", "properties": {"2002": "M5V 3L9", "2003": "CAN", "2004": "CAN-1:-"}}"#;
        let c = client(FakeHttp::new(body, "{}"));
        let session = c.login().unwrap();
        assert!(session.uses_postal_code_lookup());
        assert!(matches!(
            c.grid_params(&session, Utc::now()),
            Err(ListingsError::UnsupportedRegion { .. })
        ));
    }

    #[test]
    fn fetch_grid_sends_xhr_header() {
        let c = client(FakeHttp::new(LOGIN_OK, &live_grid()));
        let session = c.login().unwrap();
        c.fetch_grid(&session, Utc::now()).unwrap();

        let calls = c.http.calls.lock().unwrap();
        let Call::Get { url, headers, .. } = &calls[1] else { panic!("expected GET") };
        assert_eq!(url, "https://tvlistings.zap2it.com/api/grid");
        assert_eq!(headers, &vec![("X-Requested-With".to_string(), "XMLHttpRequest".to_string())]);
    }

    #[test]
    fn refresh_publishes_directory() {
        let c = client(FakeHttp::new(LOGIN_OK, &live_grid()));
        let handle = DirectoryHandle::new();
        let dir = c.refresh(&handle).unwrap();

        let news = Channel::parse("612").unwrap();
        let old = Channel::parse("7").unwrap();
        assert_eq!(dir.title(&news), Some("Evening News"));
        assert_eq!(dir.title(&old), None);
        assert_eq!(dir.call_sign(&old), Some("KABC"));
        assert_eq!(handle.load().len(), 2);
    }

    #[test]
    fn every_refresh_logs_in_again() {
        let c = client(FakeHttp::new(LOGIN_OK, &live_grid()));
        let handle = DirectoryHandle::new();
        c.refresh(&handle).unwrap();
        c.refresh(&handle).unwrap();

        let calls = c.http.calls.lock().unwrap();
        let posts = calls.iter().filter(|c| matches!(c, Call::Post { .. })).count();
        assert_eq!(posts, 2);
    }

    #[test]
    fn failed_refresh_keeps_previous_directory() {
        let good = client(FakeHttp::new(LOGIN_OK, &live_grid()));
        let handle = DirectoryHandle::new();
        good.refresh(&handle).unwrap();

        let bad_grid = client(FakeHttp::new(LOGIN_OK, r#"{"nope": []}"#));
        assert!(matches!(bad_grid.refresh(&handle), Err(ListingsError::Fetch { .. })));

        let bad_login = client(FakeHttp::new(r#"{}"#, &live_grid()));
        assert!(matches!(bad_login.refresh(&handle), Err(ListingsError::Authentication { .. })));

        assert_eq!(handle.load().len(), 2);
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let c = client(FakeHttp::new(LOGIN_OK, "{}")).with_base_url("http://localhost:8080");
        assert_eq!(c.base_url(), "http://localhost:8080/");
        c.login().unwrap();
        let calls = c.http.calls.lock().unwrap();
        assert!(matches!(&calls[0], Call::Post { url, .. } if url == "http://localhost:8080/api/user/login"));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let dbg = format!("{:?}", Credentials::new("me", "hunter2"));
        assert!(!dbg.contains("hunter2"));
    }

    // -- UreqClient over a local HTTP stub --

    mod over_http {
        use super::*;
        use std::io::{Read, Write};
        use std::net::TcpListener;
        use std::thread::{self, JoinHandle};

        /// Serve one canned `(status line, body)` per connection and hand back
        /// every request as received.
        fn http_stub(replies: Vec<(&'static str, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base = format!("http://{}/", listener.local_addr().unwrap());
            let server = thread::spawn(move || {
                let mut requests = Vec::new();
                for (status, body) in replies {
                    let (mut stream, _) = listener.accept().unwrap();
                    requests.push(read_request(&mut stream));
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    stream.write_all(response.as_bytes()).unwrap();
                }
                requests
            });
            (base, server)
        }

        fn read_request(stream: &mut std::net::TcpStream) -> String {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf).into_owned();
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            if name.eq_ignore_ascii_case("content-length") { value.trim().parse::<usize>().ok() } else { None }
                        })
                        .unwrap_or(0);
                    if buf.len() >= head_end + 4 + content_length || n == 0 {
                        return text;
                    }
                } else if n == 0 {
                    return text;
                }
            }
        }

        fn stub_client(base: &str) -> ListingsClient {
            ListingsClient::new(Credentials::new("me@example.com", "hunter2")).with_base_url(base)
        }

        #[test]
        fn login_posts_json() {
            let (base, server) = http_stub(vec![("200 OK", LOGIN_OK)]);
            let session = stub_client(&base).login().unwrap();
            assert_eq!(session.token, "tok-123");

            let requests = server.join().unwrap();
            let request = &requests[0];
            assert!(request.starts_with("POST /api/user/login HTTP/1.1\r\n"), "{request}");
            assert!(request.to_ascii_lowercase().contains("content-type: application/json"), "{request}");
            let body: Value = serde_json::from_str(request.split("\r\n\r\n").nth(1).unwrap()).unwrap();
            assert_eq!(body["emailid"], "me@example.com");
            assert_eq!(body["usertype"], "0");
        }

        #[test]
        fn rejected_login_is_authentication_error() {
            let (base, server) =
                http_stub(vec![("401 Unauthorized", r#"{"errorMessage":"Invalid email or password"}"#)]);
            let err = stub_client(&base).login().unwrap_err();
            assert!(matches!(err, ListingsError::Authentication { .. }), "{err:?}");
            server.join().unwrap();
        }

        #[test]
        fn grid_error_status_is_fetch_error() {
            let (base, server) = http_stub(vec![("200 OK", LOGIN_OK), ("500 Internal Server Error", "<html>oops</html>")]);
            let err = stub_client(&base).fetch_directory(Utc::now()).unwrap_err();
            assert!(matches!(err, ListingsError::Fetch { .. }), "{err:?}");
            server.join().unwrap();
        }

        #[test]
        fn get_sends_query_and_headers() {
            let (base, server) = http_stub(vec![("200 OK", r#"{"channels":[]}"#)]);
            let query = vec![
                ("FromPage".to_owned(), "TV Grid".to_owned()),
                ("TMSID".to_owned(), String::new()),
                ("device".to_owned(), "X".to_owned()),
            ];
            let body = UreqClient::new()
                .get(&format!("{base}{GRID_PATH}"), &query, &[("X-Requested-With", "XMLHttpRequest")])
                .unwrap();
            assert_eq!(body, r#"{"channels":[]}"#);

            let requests = server.join().unwrap();
            let request_line = requests[0].lines().next().unwrap().to_owned();
            assert!(request_line.starts_with("GET /api/grid?"), "{request_line}");
            assert!(
                request_line.contains("FromPage=TV+Grid") || request_line.contains("FromPage=TV%20Grid"),
                "{request_line}"
            );
            assert!(request_line.contains("TMSID=&device=X"), "{request_line}");
            assert!(requests[0].to_ascii_lowercase().contains("x-requested-with: xmlhttprequest"));
        }

        #[test]
        fn unreachable_service_is_http_error() {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base = format!("http://{}/", listener.local_addr().unwrap());
            drop(listener);

            let err = stub_client(&base).login().unwrap_err();
            assert!(matches!(err, ListingsError::Http(_)), "{err:?}");
        }
    }
}
