pub mod audit;
pub mod pagespeed;
pub mod report;
pub mod session;

pub use audit::{AuditOptions, AuditOutcome, execute_audit};
pub use pagespeed::{PageSpeedClient, PageSpeedConfig, PageSpeedEngine, PageSpeedResult, ScoreSet};
pub use session::{AuditSession, PageSpeedEvent};

pub fn print_banner() {
    println!(
        r#"
          _ __                   __
   _____ (_) /_ ___   ____  __  __/ /____ ___
  / ___// / __// _ \ / __ \/ / / / // ___// _ \
 (__  )/ / /_ /  __// /_/ / /_/ / /(__  )/  __/
/____//_/\__/ \___// .___/\__,_/_//____/ \___/
                  /_/
        sitemap discovery + pagespeed audits
"#
    );
}
