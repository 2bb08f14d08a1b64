use screener_scraper_lib::{build_strategy, logger};
use screener_scraper_lib::{Browser, Config, HtmlBrowser, PaginatedScreenNavigator, ReqwestTransport, ResultWriter, Session, SessionAuthenticator};

use log::{error, info, warn};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    logger::init();
    info!("Starting Screener Scraper...");

    // 1. Load config (credentials come from `username` / `password`)
    let config = Config::from_env()?;

    // 2. Initialize the browser
    let mut browser = HtmlBrowser::new(ReqwestTransport::new()?);

    // 3. Login. A failed login is not fatal: each screen retries once.
    let authenticator = SessionAuthenticator::new(config.login_url()?, config.credentials.clone(), config.timing);
    let mut session = match authenticator.authenticate(&mut browser) {
        Ok(session) => session,
        Err(e) => {
            error!("Error during login: {}", e);
            Session::unauthenticated(browser.current_url())
        }
    };
    if session.is_authenticated() {
        info!("Login successful! Proceeding to screens...");
    } else {
        warn!("Login could not be confirmed, continuing with {}", session.location());
    }

    // 4. Walk every screen
    let navigator = PaginatedScreenNavigator::new(
        authenticator,
        build_strategy(config.strategy),
        ResultWriter::new(&config.output_dir),
        config.timing,
    );

    let mut failed = 0;
    for screen in &config.screens {
        match navigator.open_screen(&mut browser, &mut session, screen) {
            Ok(report) => info!(
                "Screen {}: {} pages, {} codes found, {} written to {}",
                report.screen,
                report.pages_visited,
                report.records_found,
                report.written,
                report.output_path.display()
            ),
            Err(e) => {
                failed += 1;
                error!("Failed to process screen {}: {}", screen.path(), e);
            }
        }
    }

    info!(
        "Scraping Completed. Processed {} screens, {} failed.",
        config.screens.len(),
        failed
    );
    Ok(())
}
