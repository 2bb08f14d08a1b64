use crate::error::Result;
use log::{debug, warn};
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use std::time::Duration;
use url::Url;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

#[derive(Debug, Clone)]
pub struct Fetched {
    pub url: String,
    pub status: u16,
    pub body: String,
}

pub trait Transport {
    fn get(&mut self, url: &Url) -> Result<Fetched>;

    fn post_form(&mut self, url: &Url, referer: &str, fields: &[(String, String)]) -> Result<Fetched>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(ReqwestTransport { client })
    }

    fn get_random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }

    fn finish(resp: reqwest::blocking::Response) -> Result<Fetched> {
        let url = resp.url().to_string();
        let status = resp.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            warn!("Blocked at {}: {}", url, status);
        }
        let body = resp.text()?;
        debug!("Fetched {} ({}, {} bytes)", url, status, body.len());
        Ok(Fetched {
            url,
            status: status.as_u16(),
            body,
        })
    }
}

impl Transport for ReqwestTransport {
    fn get(&mut self, url: &Url) -> Result<Fetched> {
        let resp = self
            .client
            .get(url.as_str())
            .header(USER_AGENT, self.get_random_user_agent())
            .send()?;
        Self::finish(resp)
    }

    fn post_form(&mut self, url: &Url, referer: &str, fields: &[(String, String)]) -> Result<Fetched> {
        let resp = self
            .client
            .post(url.as_str())
            .header(USER_AGENT, self.get_random_user_agent())
            .header(REFERER, referer)
            .form(fields)
            .send()?;
        Self::finish(resp)
    }
}
