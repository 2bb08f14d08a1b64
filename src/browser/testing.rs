use super::transport::{Fetched, Transport};
use crate::error::Result;
use std::collections::HashMap;
use url::Url;

pub(crate) const BASE: &str = "https://screener.test";

pub(crate) struct StaticSite {
    pages: HashMap<String, String>,
    login: Option<LoginRule>,
    protected_prefix: Option<String>,
    logged_in: bool,
    pub(crate) logins: usize,
    pub(crate) requests: Vec<String>,
    pub(crate) last_form: Vec<(String, String)>,
}

struct LoginRule {
    url: String,
    username: String,
    password: String,
    success_url: String,
}

impl StaticSite {
    pub(crate) fn new() -> Self {
        StaticSite {
            pages: HashMap::new(),
            login: None,
            protected_prefix: None,
            logged_in: false,
            logins: 0,
            requests: Vec::new(),
            last_form: Vec::new(),
        }
    }

    pub(crate) fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub(crate) fn with_login(mut self, url: &str, username: &str, password: &str) -> Self {
        self.pages.insert(url.to_string(), login_page());
        self.login = Some(LoginRule {
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            success_url: format!("{}/dash/", BASE),
        });
        self
    }

    pub(crate) fn protect(mut self, prefix: &str) -> Self {
        self.protected_prefix = Some(prefix.to_string());
        self
    }

    pub(crate) fn logged_in(mut self) -> Self {
        self.logged_in = true;
        self
    }

    pub(crate) fn gets_of(&self, url: &str) -> usize {
        self.requests.iter().filter(|r| r.as_str() == url).count()
    }

    fn serve(&self, url: &str) -> Fetched {
        match self.pages.get(url) {
            Some(body) => Fetched {
                url: url.to_string(),
                status: 200,
                body: body.clone(),
            },
            None => Fetched {
                url: url.to_string(),
                status: 404,
                body: "<html><body><h1>Not Found</h1></body></html>".to_string(),
            },
        }
    }
}

impl Transport for StaticSite {
    fn get(&mut self, url: &Url) -> Result<Fetched> {
        let url = url.as_str().to_string();
        self.requests.push(url.clone());

        let guarded = self
            .protected_prefix
            .as_ref()
            .is_some_and(|prefix| url.starts_with(prefix.as_str()));
        if guarded && !self.logged_in {
            if let Some(rule) = &self.login {
                let mut fetched = self.serve(&rule.url);
                fetched.url = format!("{}?next={}", rule.url, url);
                return Ok(fetched);
            }
        }
        Ok(self.serve(&url))
    }

    fn post_form(&mut self, url: &Url, _referer: &str, fields: &[(String, String)]) -> Result<Fetched> {
        self.requests.push(format!("POST {}", url));
        self.last_form = fields.to_vec();

        let field = |name: &str| {
            fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };
        if let Some(rule) = &self.login {
            if url.as_str() == rule.url {
                let accepted = field("csrfmiddlewaretoken") == Some("tok")
                    && field("username") == Some(rule.username.as_str())
                    && field("password") == Some(rule.password.as_str());
                if accepted {
                    self.logged_in = true;
                    self.logins += 1;
                    let success = rule.success_url.clone();
                    return Ok(self.serve(&success));
                }
                let login_url = rule.url.clone();
                return Ok(self.serve(&login_url));
            }
        }
        Ok(self.serve(url.as_str()))
    }
}

pub(crate) fn login_page() -> String {
    r#"<html><body>
        <form method="post" action="/login/">
          <input type="hidden" name="csrfmiddlewaretoken" value="tok">
          <input type="email" name="username" id="id_username" placeholder="Email">
          <input type="password" name="password" id="id_password">
          <button class="button-primary" type="submit">Login</button>
        </form>
        <a href="/register/">Register</a>
    </body></html>"#
        .to_string()
}

pub(crate) fn listing_page(page: u32, total: u32, rows: &[(&str, &str)]) -> String {
    let mut html = String::from(
        r#"<html><body><a href="/logout/">Logout</a>
        <table class="data-table text-nowrap striped mark-visited no-scroll-right"><tbody>
        <tr><th>S.No.</th><th>Name</th></tr>"#,
    );
    for (i, (name, href)) in rows.iter().enumerate() {
        html.push_str(&format!(
            r#"<tr data-row-company-id="{}"><td>{}.</td><td><a href="{}" target="_blank">{}</a></td></tr>"#,
            1000 + i,
            i + 1,
            href,
            name
        ));
    }
    html.push_str("</tbody></table><div class=\"pagination\">");
    for p in 1..=total {
        if p == page {
            html.push_str(&format!("<span class=\"this-page\">{}</span>", p));
        } else {
            html.push_str(&format!("<a href=\"?page={}\" class=\"ink-900\"> {} </a>", p, p));
        }
    }
    html.push_str("</div></body></html>");
    html
}
