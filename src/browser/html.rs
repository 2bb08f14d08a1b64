use super::transport::{Fetched, Transport};
use super::{effective_type, normalize_text, Browser, Element, Locator};
use crate::error::{Result, ScreenerError};
use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

const BLANK: &str = "about:blank";

enum Matcher {
    Css(Selector),
    Text { tag: String, text: String, exact: bool },
}

impl Matcher {
    fn compile(locator: &Locator) -> Result<Self> {
        match locator {
            Locator::Css(selector) => Selector::parse(selector)
                .map(Matcher::Css)
                .map_err(|e| ScreenerError::InvalidLocator(format!("{}: {:?}", selector, e))),
            Locator::ExactText { tag, text } => Ok(Matcher::Text {
                tag: tag.to_lowercase(),
                text: normalize_text(text),
                exact: true,
            }),
            Locator::ContainsText { tag, text } => Ok(Matcher::Text {
                tag: tag.to_lowercase(),
                text: normalize_text(text),
                exact: false,
            }),
        }
    }

    fn matches(&self, element: &ElementRef<'_>) -> bool {
        match self {
            Matcher::Css(selector) => selector.matches(element),
            Matcher::Text { tag, text, exact } => {
                if element.value().name() != tag {
                    return false;
                }
                let content = normalize_text(&element.text().collect::<String>());
                if *exact {
                    content == *text
                } else {
                    content.contains(text.as_str())
                }
            }
        }
    }
}

// Links and forms go through the transport, so hidden fields and cookies travel
// with every request. No scripts run.
pub struct HtmlBrowser<T: Transport> {
    transport: T,
    current_url: String,
    document: Html,
    generation: u64,
    typed: HashMap<usize, String>,
    everything: Selector,
    options: Selector,
}

impl<T: Transport> HtmlBrowser<T> {
    pub fn new(transport: T) -> Self {
        HtmlBrowser {
            transport,
            current_url: BLANK.to_string(),
            document: Html::new_document(),
            generation: 0,
            typed: HashMap::new(),
            everything: Selector::parse("*").expect("universal selector"),
            options: Selector::parse("option").expect("option selector"),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn load(&mut self, fetched: Fetched) {
        if fetched.status >= 400 {
            warn!("{} answered with status {}", fetched.url, fetched.status);
        }
        self.current_url = fetched.url;
        self.document = Html::parse_document(&fetched.body);
        self.generation += 1;
        self.typed.clear();
    }

    fn resolve(&self, href: &str) -> Result<Url> {
        match Url::parse(href) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Url::parse(&self.current_url)?.join(href)?),
            Err(e) => Err(e.into()),
        }
    }

    fn element_at(&self, index: usize) -> Option<ElementRef<'_>> {
        self.document.select(&self.everything).nth(index)
    }

    fn live(&self, element: &Element) -> Result<ElementRef<'_>> {
        if element.generation() != self.generation {
            return Err(ScreenerError::StaleElement);
        }
        self.element_at(element.index()).ok_or(ScreenerError::StaleElement)
    }

    fn snapshot(&self, index: usize, element: ElementRef<'_>) -> Element {
        let attributes = element
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let text = normalize_text(&element.text().collect::<String>());
        Element::new(
            index,
            self.generation,
            element.value().name(),
            attributes,
            text,
            is_displayed(&element),
        )
    }

    fn collect<F>(&self, locator: &Locator, mut keep: F) -> Result<Vec<Element>>
    where
        F: FnMut(&ElementRef<'_>) -> bool,
    {
        let matcher = Matcher::compile(locator)?;
        Ok(self
            .document
            .select(&self.everything)
            .enumerate()
            .filter(|(_, el)| keep(el) && matcher.matches(el))
            .map(|(index, el)| self.snapshot(index, el))
            .collect())
    }

    fn form_submission(&self, submitter: usize) -> Result<(Url, String, Vec<(String, String)>)> {
        let button = self.element_at(submitter).ok_or(ScreenerError::StaleElement)?;
        let form = button
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "form")
            .ok_or_else(|| ScreenerError::NotInteractable {
                tag: format!("{} outside a form", button.value().name()),
            })?;

        let action = match form.value().attr("action").map(str::trim).filter(|a| !a.is_empty()) {
            Some(action) => self.resolve(action)?,
            None => Url::parse(&self.current_url)?,
        };
        let method = form.value().attr("method").unwrap_or("get").trim().to_lowercase();
        let form_id = form.id();

        let mut fields = Vec::new();
        for (index, el) in self.document.select(&self.everything).enumerate() {
            if !el.ancestors().any(|node| node.id() == form_id) {
                continue;
            }
            let node = el.value();
            let Some(name) = node.attr("name").filter(|n| !n.is_empty()) else {
                continue;
            };
            if node.attr("disabled").is_some() {
                continue;
            }
            let typed = self.typed.get(&index).cloned();
            let value = match node.name() {
                "input" => match effective_type("input", node.attr("type")).as_str() {
                    "submit" | "image" | "button" | "reset" => {
                        if index != submitter {
                            continue;
                        }
                        node.attr("value").unwrap_or("").to_string()
                    }
                    "checkbox" | "radio" => {
                        if node.attr("checked").is_none() {
                            continue;
                        }
                        node.attr("value").unwrap_or("on").to_string()
                    }
                    _ => typed.unwrap_or_else(|| node.attr("value").unwrap_or("").to_string()),
                },
                "textarea" => typed.unwrap_or_else(|| el.text().collect()),
                "button" => {
                    if index != submitter {
                        continue;
                    }
                    node.attr("value").unwrap_or("").to_string()
                }
                "select" => {
                    let chosen = el
                        .select(&self.options)
                        .find(|o| o.value().attr("selected").is_some())
                        .or_else(|| el.select(&self.options).next());
                    match chosen {
                        Some(option) => option
                            .value()
                            .attr("value")
                            .map(str::to_string)
                            .unwrap_or_else(|| normalize_text(&option.text().collect::<String>())),
                        None => continue,
                    }
                }
                _ => continue,
            };
            fields.push((name.to_string(), value));
        }

        Ok((action, method, fields))
    }

    fn submit_form(&mut self, submitter: usize) -> Result<()> {
        let (action, method, fields) = self.form_submission(submitter)?;
        let fetched = if method == "post" {
            debug!("POST {} ({} fields)", action, fields.len());
            self.transport.post_form(&action, &self.current_url, &fields)?
        } else {
            let mut target = action;
            target.set_query(None);
            if !fields.is_empty() {
                target.query_pairs_mut().extend_pairs(fields.iter());
            }
            debug!("GET {} (form)", target);
            self.transport.get(&target)?
        };
        self.load(fetched);
        Ok(())
    }
}

impl<T: Transport> Browser for HtmlBrowser<T> {
    fn navigate(&mut self, url: &str) -> Result<()> {
        let target = self.resolve(url)?;
        debug!("GET {}", target);
        let fetched = self.transport.get(&target)?;
        self.load(fetched);
        Ok(())
    }

    fn current_url(&self) -> &str {
        &self.current_url
    }

    fn find_elements(&self, locator: &Locator) -> Result<Vec<Element>> {
        self.collect(locator, |_| true)
    }

    fn find_elements_in(&self, scope: &Element, locator: &Locator) -> Result<Vec<Element>> {
        let scope_id = self.live(scope)?.id();
        self.collect(locator, |el| el.ancestors().any(|node| node.id() == scope_id))
    }

    fn click(&mut self, element: &Element) -> Result<()> {
        self.live(element)?;
        let not_interactable = || ScreenerError::NotInteractable {
            tag: element.tag().to_string(),
        };
        match element.tag() {
            "a" => {
                let href = element.attr("href").ok_or_else(not_interactable)?.to_string();
                debug!("Following link to {}", href);
                self.navigate(&href)
            }
            "button" => match element.input_type().as_str() {
                "button" | "reset" => Err(not_interactable()),
                _ => self.submit_form(element.index()),
            },
            "input" => match element.input_type().as_str() {
                "submit" | "image" => self.submit_form(element.index()),
                _ => Err(not_interactable()),
            },
            _ => Err(not_interactable()),
        }
    }

    fn type_text(&mut self, element: &Element, text: &str) -> Result<()> {
        self.live(element)?;
        match element.tag() {
            "input" | "textarea" => {
                self.typed.insert(element.index(), text.to_string());
                Ok(())
            }
            _ => Err(ScreenerError::NotInteractable {
                tag: element.tag().to_string(),
            }),
        }
    }
}

fn is_hidden(node: &scraper::node::Element) -> bool {
    if node.attr("hidden").is_some() || node.name() == "head" {
        return true;
    }
    if node.name() == "input" && node.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")) {
        return true;
    }
    node.attr("style").is_some_and(|style| {
        let style = style.replace(' ', "").to_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn is_displayed(element: &ElementRef<'_>) -> bool {
    !is_hidden(element.value())
        && !element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_hidden(ancestor.value()))
}
