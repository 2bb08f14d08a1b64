use crate::authenticator::{Session, SessionAuthenticator};
use crate::browser::{Browser, Locator};
use crate::config::{ScreenTarget, Timing};
use crate::delay_manager;
use crate::error::{Result, ScreenerError};
use crate::extractor::{TickerExtractionStrategy, TickerRecord};
use crate::result_writer::ResultWriter;
use log::{info, warn};
use std::path::PathBuf;

pub const TABLE_PRESENT: &str = "table.data-table";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Loading(u32),
    Extracting(u32),
    Done,
}

#[derive(Debug, Clone)]
pub struct PageExtraction {
    page: u32,
    records: Vec<TickerRecord>,
}

pub struct PageCursor<'a> {
    browser: &'a mut dyn Browser,
    strategy: &'a dyn TickerExtractionStrategy,
    timing: Timing,
    state: PageState,
}

impl<'a> PageCursor<'a> {
    pub fn new(browser: &'a mut dyn Browser, strategy: &'a dyn TickerExtractionStrategy, timing: Timing) -> Self {
        PageCursor {
            browser,
            strategy,
            timing,
            state: PageState::Extracting(1),
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    // Page n links to page n+1 by a link labelled exactly "n+1" while more pages exist.
    fn advance(&mut self, page: u32) -> Result<()> {
        let label = (page + 1).to_string();
        let link = self
            .browser
            .find_element(&Locator::exact_text("a", label.as_str()))
            .map_err(|_| ScreenerError::PaginationEnd { page: page + 1 })?;
        info!("Found next page link: {}", label);
        self.browser.click(&link)?;
        delay_manager::settle(self.timing.settle);
        Ok(())
    }
}

impl Iterator for PageCursor<'_> {
    type Item = PageExtraction;

    fn next(&mut self) -> Option<PageExtraction> {
        loop {
            match self.state {
                PageState::Done => return None,
                PageState::Loading(page) => {
                    let table = Locator::css(TABLE_PRESENT);
                    let rendered = delay_manager::wait_until(self.timing.table_wait, self.timing.poll, || {
                        self.browser.find_element(&table).is_ok()
                    });
                    if !rendered {
                        warn!("Results table for page {} did not render", page);
                    }
                    self.state = PageState::Extracting(page);
                }
                PageState::Extracting(page) => {
                    info!("Processing page {}...", page);
                    let records = self.strategy.extract(&mut *self.browser);
                    self.state = match self.advance(page) {
                        Ok(()) => PageState::Loading(page + 1),
                        Err(e) => {
                            info!("No more pages available. Last page was {} ({})", page, e);
                            PageState::Done
                        }
                    };
                    return Some(PageExtraction { page, records });
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScreenReport {
    pub screen: String,
    pub pages_visited: u32,
    pub records_found: usize,
    pub written: usize,
    pub output_path: PathBuf,
    pub reauthenticated: bool,
}

pub struct PaginatedScreenNavigator {
    authenticator: SessionAuthenticator,
    strategy: Box<dyn TickerExtractionStrategy>,
    writer: ResultWriter,
    timing: Timing,
}

impl PaginatedScreenNavigator {
    pub fn new(
        authenticator: SessionAuthenticator,
        strategy: Box<dyn TickerExtractionStrategy>,
        writer: ResultWriter,
        timing: Timing,
    ) -> Self {
        PaginatedScreenNavigator {
            authenticator,
            strategy,
            writer,
            timing,
        }
    }

    pub fn open_screen(&self, browser: &mut dyn Browser, session: &mut Session, screen: &ScreenTarget) -> Result<ScreenReport> {
        info!("Opening screen {} with {} strategy", screen.path(), self.strategy.name());
        let reauthenticated = self.load_first_page(browser, session, screen)?;

        let (pages_visited, records) = self.collect(browser);
        let records_found = records.len();
        info!(
            "Visited {} pages of {}, {} NSE codes in total",
            pages_visited,
            screen.path(),
            records_found
        );

        let file_name = screen.output_file_name();
        let written = self.writer.write(records, &file_name)?;
        Ok(ScreenReport {
            screen: screen.path().to_string(),
            pages_visited,
            records_found,
            written,
            output_path: self.writer.path_for(&file_name),
            reauthenticated,
        })
    }

    pub fn collect(&self, browser: &mut dyn Browser) -> (u32, Vec<TickerRecord>) {
        PageCursor::new(browser, self.strategy.as_ref(), self.timing).fold(
            (0, Vec::new()),
            |(_, mut all), page| {
                all.extend(page.records);
                (page.page, all)
            },
        )
    }

    // Logs in again at most once. Returns whether it did.
    fn load_first_page(&self, browser: &mut dyn Browser, session: &mut Session, screen: &ScreenTarget) -> Result<bool> {
        let url = screen.url().as_str();
        info!("Navigating to screen URL: {}", url);
        browser.navigate(url)?;

        if self.wait_for_table(&*browser) {
            info!("Successfully loaded the screen page: {}", browser.current_url());
            return Ok(false);
        }
        warn!("Error loading screen page, current URL: {}", browser.current_url());
        if !self.authenticator.is_login_location(browser.current_url()) {
            return Ok(false);
        }

        info!("Redirected to login page. Trying to login again...");
        *session = self.authenticator.authenticate(browser)?;
        browser.navigate(url)?;
        delay_manager::settle(self.timing.settle);

        if self.authenticator.is_login_location(browser.current_url()) {
            return Err(ScreenerError::Authentication(format!(
                "still on the login page after logging in again for {}",
                screen.path()
            )));
        }
        Ok(true)
    }

    fn wait_for_table(&self, browser: &dyn Browser) -> bool {
        let table = Locator::css(TABLE_PRESENT);
        delay_manager::wait_until(self.timing.table_wait, self.timing.poll, || {
            browser.find_element(&table).is_ok()
        })
    }
}
