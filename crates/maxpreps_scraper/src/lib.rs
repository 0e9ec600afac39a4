//! MaxPreps high-school football scraper.
//!
//! Listing page per region/date -> detail page per game -> one `EventRecord`.
//!
//! Site layout the selectors are written against:
//! https://www.maxpreps.com/<state>/football/scores/?date=M/D/YYYY
//!
//! Detail page team columns:
//! <div class="team-overview__team"> <div class="team-overview__team-name"><a href="/tx/...">Lincoln (3-1)</a></div> </div>
//!
//! Every field has an ordered list of sources; the first non-empty one wins.
//! Team pages fill gaps and are fetched at most once per run.

pub mod batch;
pub mod config;
pub mod dom;
pub mod enrichment;
pub mod error;
pub mod fetch;
pub mod game;
pub mod kickoff;
pub mod record;
pub mod region;
pub mod render;

pub use batch::{informativeness, is_informative, BatchOutcome, BatchScraper, RegionReport};
pub use config::ScrapeConfig;
pub use enrichment::TeamEnrichmentCache;
pub use error::{FetchError, ScrapeError, ScrapeResult};
pub use fetch::{FetchClient, HttpResponse, HttpTransport, Pacer, PageSource, RetryPolicy, TokioPacer};
pub use game::GameResolver;
pub use kickoff::resolve_kickoff;
pub use record::{EventRecord, Region, RunDate, TeamEnrichment, STATE_CODES};
pub use region::{LinkFailure, RegionOutcome, RegionScraper};
pub use render::{ChromeRenderer, ImageRenderer, NoRenderer};
