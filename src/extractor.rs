use crate::browser::{Browser, Element, Locator};
use crate::config::StrategyKind;
use crate::error::{Result, ScreenerError};
use log::{debug, error, info, warn};
use regex::Regex;
use url::Url;

pub const RESULTS_TABLE: &str = "table.data-table.text-nowrap.striped.mark-visited.no-scroll-right";
pub const COMPANY_ROW: &str = "tr[data-row-company-id]";
pub const COMPANY_LINK: &str = "td a[href*='/company/']";
pub const MAX_CODE_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRef {
    pub name: String,
    pub detail_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerRecord {
    company: String,
    nse_code: String,
    source_url: String,
}

impl TickerRecord {
    pub fn new(
        company: impl Into<String>,
        nse_code: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Option<Self> {
        let nse_code = nse_code.into();
        if !accept_candidate(&nse_code) {
            return None;
        }
        Some(TickerRecord {
            company: company.into(),
            nse_code,
            source_url: source_url.into(),
        })
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    pub fn nse_code(&self) -> &str {
        &self.nse_code
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

// Purely numeric segments are BSE scrip codes, never NSE symbols.
pub fn accept_candidate(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.chars().count() <= MAX_CODE_LEN && !is_integer_literal(candidate)
}

// Signed digits with single underscores between them, surrounding whitespace allowed.
fn is_integer_literal(text: &str) -> bool {
    let text = text.trim();
    let digits = text.strip_prefix(&['+', '-'][..]).unwrap_or(text);
    !digits.is_empty()
        && digits.split('_').all(|group| !group.is_empty() && group.chars().all(|c| c.is_ascii_digit()))
}

// Last path segment, or the one before it when the last names the consolidated view.
pub fn derive_candidate(url: &str) -> Result<String> {
    if !url.contains("/company/") {
        return Err(ScreenerError::MalformedUrl(url.to_string()));
    }
    let parsed = Url::parse(url).map_err(|_| ScreenerError::MalformedUrl(url.to_string()))?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.filter(|s| !s.trim().is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [.., previous, last] if last.contains("consolidated") => Ok(previous.to_string()),
        [.., last] => Ok(last.to_string()),
        [] => Err(ScreenerError::MalformedUrl(url.to_string())),
    }
}

pub fn resolve_from_url(company: &CompanyRef) -> Option<TickerRecord> {
    match derive_candidate(&company.detail_url) {
        Ok(candidate) => {
            let record = TickerRecord::new(&company.name, &candidate, &company.detail_url);
            match &record {
                Some(_) => debug!("  Extracted NSE code from URL: {}", candidate),
                None => debug!("  No NSE code found for {} (candidate '{}')", company.name, candidate),
            }
            record
        }
        Err(e) => {
            warn!("  Skipping {}: {}", company.name, e);
            None
        }
    }
}

pub fn collect_company_refs(browser: &dyn Browser) -> Result<Vec<CompanyRef>> {
    let table = browser.find_element(&Locator::css(RESULTS_TABLE))?;
    let rows = browser.find_elements_in(&table, &Locator::css(COMPANY_ROW))?;
    info!("Found {} company rows", rows.len());

    let mut companies = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        match company_ref_from_row(browser, row) {
            Ok(company) => {
                debug!("Collected: {} - {}", company.name, company.detail_url);
                companies.push(company);
            }
            Err(e) => warn!("Error collecting data from row {}: {}", i + 1, e),
        }
    }
    info!("Successfully collected {} companies", companies.len());
    Ok(companies)
}

fn company_ref_from_row(browser: &dyn Browser, row: &Element) -> Result<CompanyRef> {
    let link = browser.find_element_in(row, &Locator::css(COMPANY_LINK))?;
    let href = link.attr("href").ok_or_else(|| ScreenerError::ElementNotFound {
        locator: format!("{} [href]", COMPANY_LINK),
    })?;
    let detail_url = Url::parse(browser.current_url())?.join(href)?;
    Ok(CompanyRef {
        name: link.text().trim().to_string(),
        detail_url: detail_url.to_string(),
    })
}

pub trait TickerExtractionStrategy {
    fn name(&self) -> &'static str;

    fn extract(&self, browser: &mut dyn Browser) -> Vec<TickerRecord>;
}

pub fn build_strategy(kind: StrategyKind) -> Box<dyn TickerExtractionStrategy> {
    match kind {
        StrategyKind::UrlPattern => Box::new(UrlNseCodeStrategy),
        StrategyKind::DetailPage => Box::new(DetailPageNseCodeStrategy::new()),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UrlNseCodeStrategy;

impl TickerExtractionStrategy for UrlNseCodeStrategy {
    fn name(&self) -> &'static str {
        "url-pattern"
    }

    fn extract(&self, browser: &mut dyn Browser) -> Vec<TickerRecord> {
        let companies = match collect_company_refs(&*browser) {
            Ok(companies) => companies,
            Err(e) => {
                error!("Error locating the data table: {}", e);
                return Vec::new();
            }
        };
        let records: Vec<TickerRecord> = companies.iter().filter_map(resolve_from_url).collect();
        info!("Found {} NSE codes on this page", records.len());
        records
    }
}

#[derive(Debug, Clone)]
pub struct DetailPageNseCodeStrategy {
    nse_pattern: Regex,
}

impl Default for DetailPageNseCodeStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailPageNseCodeStrategy {
    pub fn new() -> Self {
        DetailPageNseCodeStrategy {
            nse_pattern: Regex::new(r"NSE:\s*([A-Za-z0-9&._-]+)").unwrap(),
        }
    }

    pub fn code_in_text(&self, text: &str) -> Option<String> {
        self.nse_pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|code| accept_candidate(code))
    }

    fn resolve_from_detail_page(&self, browser: &mut dyn Browser, company: &CompanyRef) -> Result<Option<TickerRecord>> {
        browser.navigate(&company.detail_url)?;
        let links = browser.find_elements(&Locator::contains_text("a", "NSE:"))?;
        Ok(links
            .iter()
            .find_map(|link| self.code_in_text(link.text()))
            .and_then(|code| TickerRecord::new(&company.name, code, &company.detail_url)))
    }
}

impl TickerExtractionStrategy for DetailPageNseCodeStrategy {
    fn name(&self) -> &'static str {
        "detail-page"
    }

    fn extract(&self, browser: &mut dyn Browser) -> Vec<TickerRecord> {
        let listing = browser.current_url().to_string();
        let companies = match collect_company_refs(&*browser) {
            Ok(companies) => companies,
            Err(e) => {
                error!("Error locating the data table: {}", e);
                return Vec::new();
            }
        };

        let mut records = Vec::with_capacity(companies.len());
        for (i, company) in companies.iter().enumerate() {
            info!("Processing company {}/{}: {}", i + 1, companies.len(), company.name);
            let resolved = match self.resolve_from_detail_page(browser, company) {
                Ok(Some(record)) => Some(record),
                Ok(None) => {
                    debug!("  No NSE link on {}, trying the url", company.detail_url);
                    resolve_from_url(company)
                }
                Err(e) => {
                    warn!("  Error processing company {}: {}", company.name, e);
                    resolve_from_url(company)
                }
            };
            records.extend(resolved);
        }

        if !companies.is_empty() {
            if let Err(e) = browser.navigate(&listing) {
                error!("Could not return to listing {}: {}", listing, e);
            }
        }
        info!("Found {} NSE codes on this page", records.len());
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::{listing_page, StaticSite, BASE};
    use crate::browser::HtmlBrowser;

    fn screen_url() -> String {
        format!("{}/screens/1/v200/", BASE)
    }

    fn browser_with(site: StaticSite) -> HtmlBrowser<StaticSite> {
        let mut browser = HtmlBrowser::new(site);
        browser.navigate(&screen_url()).unwrap();
        browser
    }

    #[test]
    fn test_derive_candidate() {
        assert_eq!(
            derive_candidate("https://www.screener.in/company/TCS/consolidated/").unwrap(),
            "TCS"
        );
        assert_eq!(derive_candidate("https://www.screener.in/company/INFY/").unwrap(), "INFY");
        assert_eq!(derive_candidate("https://www.screener.in/company/500325/").unwrap(), "500325");
        assert_eq!(
            derive_candidate("https://www.screener.in/company/RELIANCE/consolidated-view").unwrap(),
            "RELIANCE"
        );
    }

    #[test]
    fn test_derive_candidate_malformed() {
        assert!(matches!(
            derive_candidate("https://www.screener.in/screens/1/v200/"),
            Err(ScreenerError::MalformedUrl(_))
        ));
        assert!(matches!(derive_candidate("/company/TCS/"), Err(ScreenerError::MalformedUrl(_))));
    }

    #[test]
    fn test_accept_candidate() {
        assert!(accept_candidate("TCS"));
        assert!(accept_candidate("BAJAJ-AUTO"));
        assert!(!accept_candidate("1234567890123"));
        assert!(!accept_candidate("500325"));
        assert!(!accept_candidate("LONGERTHAN10"));
        assert!(!accept_candidate(""));
    }

    #[test]
    fn test_integer_like_candidates_rejected() {
        assert!(!accept_candidate("1_000"));
        assert!(!accept_candidate("-42"));
        assert!(!accept_candidate(" 7 "));
        assert!(accept_candidate("1__0"));
        assert!(accept_candidate("_10"));
        assert!(accept_candidate("3MINDIA"));
    }

    #[test]
    fn test_ticker_record_enforces_rule() {
        assert!(TickerRecord::new("Tata Consultancy", "TCS", "u").is_some());
        assert!(TickerRecord::new("Reliance", "500325", "u").is_none());
    }

    #[test]
    fn test_url_strategy_extracts_page() {
        let html = listing_page(
            1,
            1,
            &[
                ("Tata Consultancy", "/company/TCS/consolidated/"),
                ("Reliance", "/company/500325/"),
                ("Infosys", "/company/INFY/"),
            ],
        );
        let mut browser = browser_with(StaticSite::new().page(&screen_url(), &html));

        let records = UrlNseCodeStrategy.extract(&mut browser);
        let codes: Vec<&str> = records.iter().map(TickerRecord::nse_code).collect();
        assert_eq!(codes, vec!["TCS", "INFY"]);
        assert_eq!(records[0].company(), "Tata Consultancy");
        assert_eq!(records[0].source_url(), format!("{}/company/TCS/consolidated/", BASE));
    }

    #[test]
    fn test_malformed_row_does_not_hide_others() {
        let mut html = listing_page(1, 1, &[("Infosys", "/company/INFY/"), ("Wipro", "/company/WIPRO/")]);
        html = html.replace(
            "</tbody>",
            r#"<tr data-row-company-id="9"><td>3.</td><td>No link here</td></tr></tbody>"#,
        );
        let mut browser = browser_with(StaticSite::new().page(&screen_url(), &html));

        let companies = collect_company_refs(&browser).unwrap();
        assert_eq!(companies.len(), 2);
        assert_eq!(UrlNseCodeStrategy.extract(&mut browser).len(), 2);
    }

    #[test]
    fn test_missing_table_gives_empty_page() {
        let mut browser = browser_with(StaticSite::new().page(&screen_url(), "<p>No results</p>"));
        assert!(collect_company_refs(&browser).is_err());
        assert!(UrlNseCodeStrategy.extract(&mut browser).is_empty());
    }

    #[test]
    fn test_code_in_text() {
        let strategy = DetailPageNseCodeStrategy::new();
        assert_eq!(strategy.code_in_text("NSE: M&M"), Some("M&M".to_string()));
        assert_eq!(strategy.code_in_text("NSE:TCS"), Some("TCS".to_string()));
        assert_eq!(strategy.code_in_text("BSE: 500325"), None);
        assert_eq!(strategy.code_in_text("NSE: 500325"), None);
    }

    #[test]
    fn test_detail_page_strategy_reads_link_and_returns() {
        let html = listing_page(1, 1, &[("Mahindra", "/company/M&M/"), ("Old Co", "/company/OLDCO/")]);
        let site = StaticSite::new()
            .page(&screen_url(), &html)
            .page(
                &format!("{}/company/M&M/", BASE),
                r#"<a href="https://www.nseindia.com/get-quotes/equity?symbol=M%26M"><span>NSE:</span> M&amp;M</a>"#,
            );
        let mut browser = browser_with(site);

        let records = DetailPageNseCodeStrategy::new().extract(&mut browser);
        let codes: Vec<&str> = records.iter().map(TickerRecord::nse_code).collect();
        // OLDCO has no detail page (404), so its code comes from the url.
        assert_eq!(codes, vec!["M&M", "OLDCO"]);
        assert_eq!(browser.current_url(), screen_url());
        assert_eq!(browser.transport().gets_of(&screen_url()), 2);
    }

    #[test]
    fn test_build_strategy() {
        assert_eq!(build_strategy(StrategyKind::UrlPattern).name(), "url-pattern");
        assert_eq!(build_strategy(StrategyKind::DetailPage).name(), "detail-page");
    }
}
