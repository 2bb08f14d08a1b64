use crate::browser::{Browser, Element, Locator};
use crate::config::{Credentials, Timing};
use crate::delay_manager;
use crate::error::{Result, ScreenerError};
use log::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    TypeIs(&'static str),
    IdContains(&'static str),
    PlaceholderContains(&'static str),
    LabelIs(&'static str),
}

impl FieldRule {
    pub fn matches(&self, element: &Element) -> bool {
        let lower = |name: &str| element.attr(name).unwrap_or("").to_lowercase();
        match self {
            FieldRule::TypeIs(kind) => element.input_type() == *kind,
            FieldRule::IdContains(needle) => lower("id").contains(needle),
            FieldRule::PlaceholderContains(needle) => lower("placeholder").contains(needle),
            FieldRule::LabelIs(label) => element.text().trim().to_lowercase() == *label,
        }
    }
}

pub const CREDENTIAL_FIELD_RULES: &[FieldRule] = &[
    FieldRule::TypeIs("email"),
    FieldRule::IdContains("email"),
    FieldRule::IdContains("username"),
    FieldRule::PlaceholderContains("email"),
    FieldRule::PlaceholderContains("username"),
];

pub const SECRET_FIELD_RULES: &[FieldRule] = &[FieldRule::TypeIs("password")];

// An exact label beats a merely submit-typed button.
pub const SUBMIT_CONTROL_RULES: &[FieldRule] = &[FieldRule::LabelIs("login"), FieldRule::TypeIs("submit")];

pub fn first_matching_any<'a>(elements: &'a [Element], rules: &[FieldRule]) -> Option<&'a Element> {
    elements
        .iter()
        .find(|element| rules.iter().any(|rule| rule.matches(element)))
}

pub fn first_by_priority<'a>(elements: &'a [Element], rules: &[FieldRule]) -> Option<&'a Element> {
    rules
        .iter()
        .find_map(|rule| elements.iter().find(|element| rule.matches(element)))
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub credential: Option<Element>,
    pub secret: Option<Element>,
    pub submit: Option<Element>,
}

impl LoginForm {
    pub fn discover(inputs: &[Element], buttons: &[Element]) -> Self {
        LoginForm {
            credential: first_matching_any(inputs, CREDENTIAL_FIELD_RULES).cloned(),
            secret: first_matching_any(inputs, SECRET_FIELD_RULES).cloned(),
            submit: first_by_priority(buttons, SUBMIT_CONTROL_RULES).cloned(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.credential.is_some() && self.secret.is_some() && self.submit.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    location: String,
    authenticated: bool,
}

impl Session {
    pub fn new(location: impl Into<String>, authenticated: bool) -> Self {
        Session {
            location: location.into(),
            authenticated,
        }
    }

    pub fn unauthenticated(location: impl Into<String>) -> Self {
        Self::new(location, false)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

pub struct SessionAuthenticator {
    login_url: Url,
    credentials: Credentials,
    timing: Timing,
}

impl SessionAuthenticator {
    pub fn new(login_url: Url, credentials: Credentials, timing: Timing) -> Self {
        SessionAuthenticator {
            login_url,
            credentials,
            timing,
        }
    }

    // Also true for redirects onto the login page (`/login/?next=...`).
    pub fn is_login_location(&self, location: &str) -> bool {
        match Url::parse(location) {
            Ok(url) => url.host_str() == self.login_url.host_str() && url.path().starts_with(self.login_url.path()),
            Err(_) => location.contains(self.login_url.path()),
        }
    }

    // Errors only when nothing could be submitted. Staying on the login page
    // still yields a session, marked unauthenticated.
    pub fn authenticate(&self, browser: &mut dyn Browser) -> Result<Session> {
        info!("Opening login page {}", self.login_url);
        browser.navigate(self.login_url.as_str())?;

        let inputs = browser.find_elements(&Locator::css("input"))?;
        let buttons = browser.find_elements(&Locator::css("button"))?;
        debug!("Found {} input elements and {} button elements", inputs.len(), buttons.len());
        let form = LoginForm::discover(&inputs, &buttons);

        if let Some(field) = &form.credential {
            debug!("Found username field: id={:?}, name={:?}", field.attr("id"), field.attr("name"));
            browser.type_text(field, &self.credentials.username)?;
        }
        if let Some(field) = &form.secret {
            debug!("Found password field: id={:?}, name={:?}", field.attr("id"), field.attr("name"));
            browser.type_text(field, &self.credentials.password)?;
        }

        let submitted = match (&form.submit, form.is_complete()) {
            (Some(submit), true) => {
                info!("Attempting to login...");
                match browser.click(submit) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Could not click login button: {}", e);
                        false
                    }
                }
            }
            _ => {
                warn!(
                    "Could not find all required login elements: username={} password={} button={}",
                    found(&form.credential),
                    found(&form.secret),
                    found(&form.submit)
                );
                false
            }
        };
        if !submitted {
            self.click_any_submit(browser)?;
        }

        let left_login = delay_manager::wait_until(self.timing.login_wait, self.timing.poll, || {
            !self.is_login_location(browser.current_url())
        });
        if left_login {
            info!("Successfully redirected to: {}", browser.current_url());
            delay_manager::settle(self.timing.settle);
        } else {
            warn!("Login redirect timeout, still at {}", browser.current_url());
        }

        let authenticated = self.is_authenticated(&*browser);
        Ok(Session::new(browser.current_url(), authenticated))
    }

    pub fn is_authenticated(&self, browser: &dyn Browser) -> bool {
        let markers = [
            Locator::contains_text("a", "Logout"),
            Locator::contains_text("a", "Sign Out"),
            Locator::css("div[class*='user']"),
            Locator::css("span[class*='user']"),
        ];
        for marker in &markers {
            match browser.find_elements(marker) {
                Ok(found) if found.iter().any(Element::is_displayed) => {
                    debug!("User is logged in ({})", marker);
                    return true;
                }
                Ok(_) => {}
                Err(e) => debug!("Session marker {} failed: {}", marker, e),
            }
        }

        if self.is_login_location(browser.current_url()) {
            debug!("User is not logged in (on login page)");
        } else {
            debug!("Could not determine login status");
        }
        false
    }

    fn click_any_submit(&self, browser: &mut dyn Browser) -> Result<()> {
        info!("Trying to find any working submit button...");
        let buttons = browser.find_elements(&Locator::css("button"))?;
        for (i, button) in buttons.iter().enumerate() {
            if button.input_type() != "submit" {
                continue;
            }
            match browser.click(button) {
                Ok(()) => {
                    info!("Successfully clicked button {}: {}", i, button.text());
                    return Ok(());
                }
                Err(e) => warn!("Button {} not clickable: {}", i, e),
            }
        }
        Err(ScreenerError::Authentication(format!(
            "no usable submit control on {}",
            browser.current_url()
        )))
    }
}

fn found(element: &Option<Element>) -> &'static str {
    if element.is_some() {
        "found"
    } else {
        "missing"
    }
}
