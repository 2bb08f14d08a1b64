mod html;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use html::HtmlBrowser;
pub use transport::{Fetched, ReqwestTransport, Transport};

use crate::error::{Result, ScreenerError};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    ExactText { tag: String, text: String },
    ContainsText { tag: String, text: String },
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn exact_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::ExactText {
            tag: tag.into(),
            text: text.into(),
        }
    }

    pub fn contains_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::ContainsText {
            tag: tag.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(selector) => write!(f, "{}", selector),
            Locator::ExactText { tag, text } => write!(f, "<{}> with text '{}'", tag, text),
            Locator::ContainsText { tag, text } => write!(f, "<{}> containing '{}'", tag, text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    index: usize,
    generation: u64,
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    displayed: bool,
}

impl Element {
    pub fn new(
        index: usize,
        generation: u64,
        tag: impl Into<String>,
        attributes: BTreeMap<String, String>,
        text: impl Into<String>,
        displayed: bool,
    ) -> Self {
        Self {
            index,
            generation,
            tag: tag.into(),
            attributes,
            text: text.into(),
            displayed,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    pub fn input_type(&self) -> String {
        effective_type(&self.tag, self.attr("type"))
    }
}

pub trait Browser {
    fn navigate(&mut self, url: &str) -> Result<()>;

    fn current_url(&self) -> &str;

    fn find_elements(&self, locator: &Locator) -> Result<Vec<Element>>;

    fn find_elements_in(&self, scope: &Element, locator: &Locator) -> Result<Vec<Element>>;

    fn click(&mut self, element: &Element) -> Result<()>;

    fn type_text(&mut self, element: &Element, text: &str) -> Result<()>;

    fn find_element(&self, locator: &Locator) -> Result<Element> {
        self.find_elements(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| ScreenerError::ElementNotFound {
                locator: locator.to_string(),
            })
    }

    fn find_element_in(&self, scope: &Element, locator: &Locator) -> Result<Element> {
        self.find_elements_in(scope, locator)?
            .into_iter()
            .next()
            .ok_or_else(|| ScreenerError::ElementNotFound {
                locator: locator.to_string(),
            })
    }
}

pub(crate) fn effective_type(tag: &str, type_attr: Option<&str>) -> String {
    match type_attr.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => t.to_lowercase(),
        None => match tag {
            "button" => "submit".to_string(),
            "input" => "text".to_string(),
            _ => String::new(),
        },
    }
}

pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
